//! Continuous-integration client interface

use async_trait::async_trait;

use crate::error::AppResult;

/// Client for the external build server
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContinuousIntegrationClient: Send + Sync {
    /// Copy the exercise's base build plan under the student's identity
    async fn copy_build_plan(
        &self,
        base_build_plan_id: &str,
        student_login: &str,
    ) -> AppResult<String>;

    /// Bind the copied plan to the student's repository
    async fn configure_build_plan(
        &self,
        build_plan_id: &str,
        repository_url: &str,
        student_login: &str,
    ) -> AppResult<()>;

    /// Delete the student's build plan
    async fn delete_build_plan(&self, build_plan_id: &str) -> AppResult<()>;
}
