//! Domain models
//!
//! This module contains all domain models used throughout the application.

pub mod exercise;
pub mod participation;
pub mod quiz;
pub mod result;
pub mod user;

pub use exercise::*;
pub use participation::*;
pub use quiz::*;
pub use result::*;
pub use user::*;
