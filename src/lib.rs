//! Praxis - Participation Lifecycle Core
//!
//! This library provides the participation management core of the Praxis
//! educational-exercise platform: creating, advancing, resuming, and
//! tearing down a student's attempt record for an exercise.
//!
//! # Features
//!
//! - Ordered, idempotent provisioning of programming-exercise
//!   participations against external version-control and build servers
//! - Safe resumption after partial provisioning failure
//! - Reconciliation of live quiz submissions with persisted state once a
//!   timed quiz closes
//! - Best-effort external cleanup on deletion
//!
//! # Architecture
//!
//! The crate follows a layered architecture:
//! - **Services**: Business logic (lifecycle state machine, reconciler)
//! - **Stores**: Persistence traits with Postgres and in-memory backends
//! - **Clients**: Traits for the external provisioning systems
//! - **Models**: Domain models

pub mod cache;
pub mod clients;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, AppResult};
pub use services::{ParticipationService, QuizParticipationService};
