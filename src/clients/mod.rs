//! External provisioning clients
//!
//! The lifecycle service only depends on these traits. Concrete adapters
//! for the platform's version-control and build servers live in their own
//! crates and are injected at wiring time.

pub mod continuous_integration;
pub mod local_repo;
pub mod version_control;

pub use continuous_integration::ContinuousIntegrationClient;
pub use local_repo::LocalRepositoryCleaner;
pub use version_control::VersionControlClient;

#[cfg(test)]
pub use continuous_integration::MockContinuousIntegrationClient;
#[cfg(test)]
pub use local_repo::MockLocalRepositoryCleaner;
#[cfg(test)]
pub use version_control::MockVersionControlClient;
