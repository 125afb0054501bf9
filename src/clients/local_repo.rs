//! Local repository cache cleanup interface

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::Participation;

/// Cleaner for working copies checked out on this node
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LocalRepositoryCleaner: Send + Sync {
    /// Delete the locally cached checkout of the participation's repository
    async fn delete_local_repository(&self, participation: &Participation) -> AppResult<()>;
}
