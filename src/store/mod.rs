//! Persistence abstraction for participations, results, and users
//!
//! The services depend only on these traits. The crate ships a Postgres
//! implementation and an in-memory one; the latter backs the service test
//! suites and embedded deployments.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{ExerciseResult, InitializationState, Participation, User};

pub use memory::{
    in_memory_stores, InMemoryParticipationStore, InMemoryResultStore, InMemoryUserDirectory,
};
pub use postgres::{PgParticipationStore, PgResultStore, PgUserDirectory};

/// Persistence operations for participation records
#[async_trait]
pub trait ParticipationStore: Send + Sync {
    /// Persist the participation, assigning an id when absent
    async fn save(&self, participation: Participation) -> AppResult<Participation>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Participation>>;

    /// Find the participation for a (exercise, student) pair in any state
    async fn find_by_exercise_and_student(
        &self,
        exercise_id: Uuid,
        login: &str,
    ) -> AppResult<Option<Participation>>;

    /// Find the participation for a (exercise, student) pair in one state
    async fn find_by_exercise_and_student_in_state(
        &self,
        exercise_id: Uuid,
        login: &str,
        state: InitializationState,
    ) -> AppResult<Option<Participation>>;

    async fn find_all(&self) -> AppResult<Vec<Participation>>;

    async fn find_all_paged(&self, limit: i64, offset: i64) -> AppResult<Vec<Participation>>;

    async fn find_by_exercise_id(&self, exercise_id: Uuid) -> AppResult<Vec<Participation>>;

    /// Like `find_by_exercise_id` but with owned results attached
    async fn find_by_exercise_id_with_results(
        &self,
        exercise_id: Uuid,
    ) -> AppResult<Vec<Participation>>;

    async fn find_by_course_id(&self, course_id: Uuid) -> AppResult<Vec<Participation>>;

    async fn find_by_build_plan_id_and_state(
        &self,
        build_plan_id: &str,
        state: InitializationState,
    ) -> AppResult<Vec<Participation>>;

    /// All participations of one student, with owned results attached
    async fn find_with_results_by_student(&self, login: &str) -> AppResult<Vec<Participation>>;

    async fn delete_by_id(&self, id: Uuid) -> AppResult<()>;
}

/// Persistence operations for result records
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn save(&self, result: ExerciseResult) -> AppResult<ExerciseResult>;

    async fn find_by_participation(
        &self,
        participation_id: Uuid,
    ) -> AppResult<Vec<ExerciseResult>>;

    /// Most recent rated result, by completion date
    async fn find_latest_rated_by_participation(
        &self,
        participation_id: Uuid,
    ) -> AppResult<Option<ExerciseResult>>;

    async fn delete_by_id(&self, id: Uuid) -> AppResult<()>;
}

/// Read-only user resolution
#[async_trait]
pub trait UserLookup: Send + Sync {
    async fn get_user_by_login(&self, login: &str) -> AppResult<Option<User>>;
}
