//! Database module
//!
//! This module handles database connections. Schema management lives with
//! the platform's deployment tooling, not in this crate.

pub mod connection;

pub use connection::*;
