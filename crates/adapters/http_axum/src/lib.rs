//! # powerhub-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve the **command API** (`POST /{category}/wake/{name}`,
//!   `POST /{category}/shutdown/{name}`)
//! - Serve a read-only device listing and the schedule CRUD API under `/api`
//! - Stream live device updates as Server-Sent Events (`/api/stream`)
//! - Map application results and errors into HTTP responses
//!
//! ## Dependency rule
//! Depends on `powerhub-app` (for port traits and services) and
//! `powerhub-domain` (for domain types used in request/response mapping).
//! Never leaks axum types into the domain.

pub mod api;
mod error;
pub mod router;
pub mod state;

#[cfg(test)]
mod testing;

pub use error::ApiError;
pub use state::AppState;
