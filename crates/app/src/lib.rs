//! # powerhub-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `DeviceRepository` — device records and atomic state writes
//!   - `ScheduleRepository` — CRUD for schedules plus execution bookkeeping
//!   - `DevicePublisher` — broadcast of written device state
//!   - `Driver` — per-category power on / power off / status query
//! - Provide the **device lifecycle control plane**:
//!   - `LockManager` — time-bounded per-device locks with command generations
//!   - `CommandExecutor` — lock, transition, drive, verify, unlock
//!   - `Reconciler` — per-category polling that corrects drift
//!   - `ScheduleEngine` — minute ticker fanning schedules out to the executor
//!   - `NotificationBus` — snapshot-on-connect plus per-write deltas
//! - Define **driving/inbound** services for device lookup and schedule CRUD
//!
//! ## Dependency rule
//! Depends on `powerhub-domain` only (plus `tokio` for tasks, timers and channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod lock_manager;
pub mod notification_bus;
pub mod ports;
pub mod reconciler;
pub mod schedule_engine;
pub mod services;
pub mod state_writer;

#[cfg(test)]
mod testing;
