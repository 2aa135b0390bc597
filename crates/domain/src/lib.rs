//! # powerhub-domain
//!
//! Pure domain model for the powerhub device power controller.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Devices** (remotely powered hardware and their believed state)
//! - Define **Category profiles** (per-category lock, verification and polling timings)
//! - Define **Schedules** (weekly power commands fanned out over devices)
//! - Define **Notifications** (payloads of the live update channel)
//! - Contain all invariant enforcement and domain logic
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod device;
pub mod notification;
pub mod profile;
pub mod schedule;
