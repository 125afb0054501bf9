//! Participation lifecycle service
//!
//! Drives a participation through the ordered provisioning sequence for
//! programming exercises: repository copy, repository configuration, build
//! plan copy, build plan configuration. Every step persists on success and
//! skips itself when the participation already reports having completed it,
//! so a failed initialization resumes at the first incomplete step.
//!
//! Concurrent initializations of the same (exercise, student) pair are not
//! serialized here; the surrounding transaction layer must prevent them.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::clients::{ContinuousIntegrationClient, LocalRepositoryCleaner, VersionControlClient};
use crate::constants::MAX_PAGE_SIZE;
use crate::error::{AppError, AppResult};
use crate::models::{
    Exercise, InitializationState, Participation, ProgrammingExercise,
};
use crate::store::{ParticipationStore, ResultStore, UserLookup};

/// Service for managing the participation lifecycle
pub struct ParticipationService {
    participations: Arc<dyn ParticipationStore>,
    results: Arc<dyn ResultStore>,
    users: Arc<dyn UserLookup>,
    version_control: Arc<dyn VersionControlClient>,
    continuous_integration: Arc<dyn ContinuousIntegrationClient>,
    local_repositories: Arc<dyn LocalRepositoryCleaner>,
}

impl ParticipationService {
    pub fn new(
        participations: Arc<dyn ParticipationStore>,
        results: Arc<dyn ResultStore>,
        users: Arc<dyn UserLookup>,
        version_control: Arc<dyn VersionControlClient>,
        continuous_integration: Arc<dyn ContinuousIntegrationClient>,
        local_repositories: Arc<dyn LocalRepositoryCleaner>,
    ) -> Self {
        Self {
            participations,
            results,
            users,
            version_control,
            continuous_integration,
            local_repositories,
        }
    }

    /// Persist a participation
    pub async fn save(&self, participation: Participation) -> AppResult<Participation> {
        tracing::debug!("Request to save participation");
        self.participations.save(participation).await
    }

    /// Create or resume the participation of a student for an exercise
    ///
    /// A fresh record is created when none exists, or when the previous one
    /// finished and the exercise allows another attempt (quizzes do not).
    /// For programming exercises the four provisioning steps run in order;
    /// an existing in-flight state is preserved so re-entry picks up at the
    /// first incomplete step. Client failures propagate and leave the
    /// participation persisted at its last completed state.
    pub async fn init(&self, exercise: &Exercise, student_login: &str) -> AppResult<Participation> {
        let existing = self
            .participations
            .find_by_exercise_and_student(exercise.id(), student_login)
            .await?;

        let mut participation = match existing {
            Some(existing)
                if existing.initialization_state != Some(InitializationState::Finished)
                    || exercise.is_quiz() =>
            {
                existing
            }
            _ => {
                tracing::info!(
                    exercise_id = %exercise.id(),
                    student = student_login,
                    "Creating new participation"
                );
                let mut fresh = Participation::new(exercise.clone());
                fresh.student = self.users.get_user_by_login(student_login).await?;
                self.participations.save(fresh).await?
            }
        };

        match exercise {
            Exercise::Programming(programming) => {
                if participation.initialization_state.is_none() {
                    participation.initialization_state =
                        Some(InitializationState::Uninitialized);
                }
                participation = self.copy_repository(participation, programming).await?;
                participation = self.configure_repository(participation).await?;
                participation = self.copy_build_plan(participation, programming).await?;
                participation = self.configure_build_plan(participation).await?;
                participation.initialization_state = Some(InitializationState::Initialized);
                participation.initialization_date = Some(Utc::now());
            }
            Exercise::Quiz(_) => {
                if participation.initialization_state.is_none() {
                    participation.initialization_state = Some(InitializationState::Initialized);
                }
                if participation.initialization_date.is_none() {
                    participation.initialization_date = Some(Utc::now());
                }
            }
        }

        self.participations.save(participation).await
    }

    /// Resume a participation whose build plan was deprovisioned
    ///
    /// Repository state is assumed intact, so only the build plan steps run
    /// (subject to their completion guards). The initialization date is
    /// stamped only when it was never set.
    pub async fn resume(
        &self,
        exercise: &Exercise,
        mut participation: Participation,
    ) -> AppResult<Participation> {
        let Exercise::Programming(programming) = exercise else {
            return Err(AppError::Validation(
                "only programming participations can be resumed".to_string(),
            ));
        };

        participation = self.copy_build_plan(participation, programming).await?;
        participation = self.configure_build_plan(participation).await?;
        participation.initialization_state = Some(InitializationState::Initialized);
        if participation.initialization_date.is_none() {
            participation.initialization_date = Some(Utc::now());
        }
        self.participations.save(participation).await
    }

    async fn copy_repository(
        &self,
        mut participation: Participation,
        exercise: &ProgrammingExercise,
    ) -> AppResult<Participation> {
        if participation.has_completed(InitializationState::RepoCopied) {
            return Ok(participation);
        }

        let login = self.owning_login(&participation)?;
        let copied = self
            .version_control
            .copy_repository(&exercise.base_repository_url, &login)
            .await?;

        match copied {
            Some(url) => {
                participation.repository_url = Some(url);
                participation.initialization_state = Some(InitializationState::RepoCopied);
            }
            None => {
                // No URL means no progress; the state is left as is for a
                // later init to retry.
                tracing::warn!(
                    student = %login,
                    "Repository copy returned no URL, participation not advanced"
                );
            }
        }
        self.participations.save(participation).await
    }

    async fn configure_repository(
        &self,
        mut participation: Participation,
    ) -> AppResult<Participation> {
        if participation.has_completed(InitializationState::RepoConfigured) {
            return Ok(participation);
        }

        let login = self.owning_login(&participation)?;
        let url = participation.repository_url.clone().ok_or_else(|| {
            AppError::Validation("participation has no repository URL".to_string())
        })?;

        self.version_control
            .configure_repository(&url, &login)
            .await?;
        participation.initialization_state = Some(InitializationState::RepoConfigured);
        self.participations.save(participation).await
    }

    async fn copy_build_plan(
        &self,
        mut participation: Participation,
        exercise: &ProgrammingExercise,
    ) -> AppResult<Participation> {
        if participation.has_completed(InitializationState::BuildPlanCopied) {
            return Ok(participation);
        }

        let login = self.owning_login(&participation)?;
        let build_plan_id = self
            .continuous_integration
            .copy_build_plan(&exercise.base_build_plan_id, &login)
            .await?;

        participation.build_plan_id = Some(build_plan_id);
        participation.initialization_state = Some(InitializationState::BuildPlanCopied);
        self.participations.save(participation).await
    }

    async fn configure_build_plan(
        &self,
        mut participation: Participation,
    ) -> AppResult<Participation> {
        if participation.has_completed(InitializationState::BuildPlanConfigured) {
            return Ok(participation);
        }

        let login = self.owning_login(&participation)?;
        let build_plan_id = participation
            .build_plan_id
            .clone()
            .ok_or_else(|| AppError::Validation("participation has no build plan".to_string()))?;
        let url = participation.repository_url.clone().ok_or_else(|| {
            AppError::Validation("participation has no repository URL".to_string())
        })?;

        self.continuous_integration
            .configure_build_plan(&build_plan_id, &url, &login)
            .await?;
        participation.initialization_state = Some(InitializationState::BuildPlanConfigured);
        self.participations.save(participation).await
    }

    fn owning_login(&self, participation: &Participation) -> AppResult<String> {
        participation
            .student_login()
            .map(str::to_string)
            .ok_or_else(|| AppError::Validation("participation has no student".to_string()))
    }

    /// Delete a participation with best-effort external cleanup
    ///
    /// External delete calls never abort the deletion; each failure is
    /// logged and the remaining steps proceed. Owned results are removed
    /// before the record itself.
    pub async fn delete(
        &self,
        id: Uuid,
        delete_build_plan: bool,
        delete_repository: bool,
    ) -> AppResult<()> {
        tracing::debug!(%id, "Request to delete participation");
        let Some(participation) = self.participations.find_by_id(id).await? else {
            tracing::debug!(%id, "Participation already gone, nothing to delete");
            return Ok(());
        };

        if participation.is_programming() {
            if delete_build_plan {
                if let Some(build_plan_id) = participation.build_plan_id.as_deref() {
                    if let Err(err) = self
                        .continuous_integration
                        .delete_build_plan(build_plan_id)
                        .await
                    {
                        tracing::error!(%id, "Could not delete build plan: {}", err);
                    }
                }
            }
            if delete_repository {
                if let Some(url) = participation.repository_url.as_deref() {
                    if let Err(err) = self.version_control.delete_repository(url).await {
                        tracing::error!(%id, "Could not delete repository: {}", err);
                    }
                }
            }

            // delete local repository cache
            if let Err(err) = self
                .local_repositories
                .delete_local_repository(&participation)
                .await
            {
                tracing::error!(%id, "Error while deleting local repository: {}", err);
            }
        }

        let results = self.results.find_by_participation(id).await?;
        if !results.is_empty() {
            tracing::info!(%id, count = results.len(), "Deleting owned results");
            for result in results {
                if let Some(result_id) = result.id {
                    self.results.delete_by_id(result_id).await?;
                }
            }
        }

        self.participations.delete_by_id(id).await
    }

    /// Delete every participation of an exercise, including external state
    pub async fn delete_all_by_exercise_id(&self, exercise_id: Uuid) -> AppResult<()> {
        let participations = self.participations.find_by_exercise_id(exercise_id).await?;

        for participation in participations {
            if let Some(id) = participation.id {
                self.delete(id, true, true).await?;
            }
        }
        Ok(())
    }

    /// Get all participations
    pub async fn find_all(&self) -> AppResult<Vec<Participation>> {
        tracing::debug!("Request to get all participations");
        self.participations.find_all().await
    }

    /// Get one page of participations
    pub async fn find_all_paged(&self, limit: i64, offset: i64) -> AppResult<Vec<Participation>> {
        tracing::debug!(limit, offset, "Request to get participations page");
        let limit = limit.clamp(1, MAX_PAGE_SIZE as i64);
        self.participations.find_all_paged(limit, offset).await
    }

    /// Get one participation by id
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Participation>> {
        tracing::debug!(%id, "Request to get participation");
        self.participations.find_by_id(id).await
    }

    /// Get the initialized participation of a student for an exercise,
    /// falling back to an inactive one
    pub async fn find_by_exercise_and_student(
        &self,
        exercise_id: Uuid,
        login: &str,
    ) -> AppResult<Option<Participation>> {
        tracing::debug!(%exercise_id, student = login, "Request to get initialized/inactive participation");

        let initialized = self
            .participations
            .find_by_exercise_and_student_in_state(
                exercise_id,
                login,
                InitializationState::Initialized,
            )
            .await?;
        if initialized.is_some() {
            return Ok(initialized);
        }
        self.participations
            .find_by_exercise_and_student_in_state(
                exercise_id,
                login,
                InitializationState::Inactive,
            )
            .await
    }

    /// Get the participation of a student for an exercise in any state
    pub async fn find_by_exercise_and_student_any_state(
        &self,
        exercise_id: Uuid,
        login: &str,
    ) -> AppResult<Option<Participation>> {
        tracing::debug!(%exercise_id, student = login, "Request to get participation");
        self.participations
            .find_by_exercise_and_student(exercise_id, login)
            .await
    }

    /// Get all participations of a student including results
    pub async fn find_with_results_by_student(
        &self,
        login: &str,
    ) -> AppResult<Vec<Participation>> {
        self.participations.find_with_results_by_student(login).await
    }

    pub async fn find_by_build_plan_id_and_state(
        &self,
        build_plan_id: &str,
        state: InitializationState,
    ) -> AppResult<Vec<Participation>> {
        tracing::debug!(build_plan_id, "Request to get participations for build plan");
        self.participations
            .find_by_build_plan_id_and_state(build_plan_id, state)
            .await
    }

    pub async fn find_by_exercise_id(&self, exercise_id: Uuid) -> AppResult<Vec<Participation>> {
        self.participations.find_by_exercise_id(exercise_id).await
    }

    pub async fn find_by_exercise_id_with_results(
        &self,
        exercise_id: Uuid,
    ) -> AppResult<Vec<Participation>> {
        self.participations
            .find_by_exercise_id_with_results(exercise_id)
            .await
    }

    pub async fn find_by_course_id(&self, course_id: Uuid) -> AppResult<Vec<Participation>> {
        self.participations.find_by_course_id(course_id).await
    }
}
