//! Version-control client interface

use async_trait::async_trait;

use crate::error::AppResult;

/// Client for the external version-control server
///
/// Every call is a blocking network round trip from the caller's point of
/// view; the lifecycle service persists between calls so a failure never
/// loses completed steps.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VersionControlClient: Send + Sync {
    /// Copy the exercise's base repository under the student's identity
    ///
    /// Returns the URL of the copy. `None` means the server accepted the
    /// request but produced no repository; the caller treats that as
    /// no progress and may retry later.
    async fn copy_repository(
        &self,
        base_repository_url: &str,
        student_login: &str,
    ) -> AppResult<Option<String>>;

    /// Configure the student's copy (permissions, hooks)
    async fn configure_repository(
        &self,
        repository_url: &str,
        student_login: &str,
    ) -> AppResult<()>;

    /// Delete the student's repository copy
    async fn delete_repository(&self, repository_url: &str) -> AppResult<()>;
}
