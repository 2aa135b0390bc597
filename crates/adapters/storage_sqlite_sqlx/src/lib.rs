//! # powerhub-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the repository port traits defined in `powerhub-app::ports::storage`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain types and database rows
//!
//! ## Dependency rule
//! Depends on `powerhub-app` (for port traits) and `powerhub-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

mod device_repo;
mod error;
mod pool;
mod schedule_repo;

pub use device_repo::SqliteDeviceRepository;
pub use error::StorageError;
pub use pool::{Config, Database};
pub use schedule_repo::SqliteScheduleRepository;
