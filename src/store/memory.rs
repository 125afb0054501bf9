//! In-memory stores
//!
//! Map-backed implementations of the persistence traits. They back the
//! service test suites and single-node embedded deployments. Participation
//! and result stores share one result map, mirroring the two tables of the
//! Postgres implementation, so eager-result finders see saved results.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{ExerciseResult, InitializationState, Participation, User};

use super::{ParticipationStore, ResultStore, UserLookup};

type ResultMap = Arc<DashMap<Uuid, ExerciseResult>>;

/// Create a participation/result store pair over one shared result map
pub fn in_memory_stores() -> (Arc<InMemoryParticipationStore>, Arc<InMemoryResultStore>) {
    let results: ResultMap = Arc::new(DashMap::new());
    (
        Arc::new(InMemoryParticipationStore {
            participations: DashMap::new(),
            results: Arc::clone(&results),
        }),
        Arc::new(InMemoryResultStore { results }),
    )
}

/// In-memory participation store
pub struct InMemoryParticipationStore {
    participations: DashMap<Uuid, Participation>,
    results: ResultMap,
}

impl InMemoryParticipationStore {
    fn sorted(&self, mut participations: Vec<Participation>) -> Vec<Participation> {
        participations.sort_by_key(|participation| participation.id);
        participations
    }

    fn collect_where<F>(&self, predicate: F) -> Vec<Participation>
    where
        F: Fn(&Participation) -> bool,
    {
        let matching = self
            .participations
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        self.sorted(matching)
    }

    fn attach_results(&self, mut participation: Participation) -> Participation {
        let mut results: Vec<ExerciseResult> = self
            .results
            .iter()
            .filter(|entry| entry.value().participation_id == participation.id)
            .map(|entry| entry.value().clone())
            .collect();
        results.sort_by_key(|result| result.completion_date);
        participation.results = results;
        participation
    }
}

#[async_trait]
impl ParticipationStore for InMemoryParticipationStore {
    async fn save(&self, mut participation: Participation) -> AppResult<Participation> {
        let id = *participation.id.get_or_insert_with(Uuid::new_v4);
        self.participations.insert(id, participation.clone());
        Ok(participation)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Participation>> {
        Ok(self.participations.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_by_exercise_and_student(
        &self,
        exercise_id: Uuid,
        login: &str,
    ) -> AppResult<Option<Participation>> {
        Ok(self
            .collect_where(|participation| {
                participation.exercise_id() == Some(exercise_id)
                    && participation.student_login() == Some(login)
            })
            .into_iter()
            .next())
    }

    async fn find_by_exercise_and_student_in_state(
        &self,
        exercise_id: Uuid,
        login: &str,
        state: InitializationState,
    ) -> AppResult<Option<Participation>> {
        Ok(self
            .collect_where(|participation| {
                participation.exercise_id() == Some(exercise_id)
                    && participation.student_login() == Some(login)
                    && participation.initialization_state == Some(state)
            })
            .into_iter()
            .next())
    }

    async fn find_all(&self) -> AppResult<Vec<Participation>> {
        Ok(self.collect_where(|_| true))
    }

    async fn find_all_paged(&self, limit: i64, offset: i64) -> AppResult<Vec<Participation>> {
        Ok(self
            .collect_where(|_| true)
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn find_by_exercise_id(&self, exercise_id: Uuid) -> AppResult<Vec<Participation>> {
        Ok(self.collect_where(|participation| participation.exercise_id() == Some(exercise_id)))
    }

    async fn find_by_exercise_id_with_results(
        &self,
        exercise_id: Uuid,
    ) -> AppResult<Vec<Participation>> {
        let participations = self.find_by_exercise_id(exercise_id).await?;
        Ok(participations
            .into_iter()
            .map(|participation| self.attach_results(participation))
            .collect())
    }

    async fn find_by_course_id(&self, course_id: Uuid) -> AppResult<Vec<Participation>> {
        Ok(self.collect_where(|participation| {
            participation
                .exercise
                .as_ref()
                .is_some_and(|exercise| exercise.course_id() == course_id)
        }))
    }

    async fn find_by_build_plan_id_and_state(
        &self,
        build_plan_id: &str,
        state: InitializationState,
    ) -> AppResult<Vec<Participation>> {
        Ok(self.collect_where(|participation| {
            participation.build_plan_id.as_deref() == Some(build_plan_id)
                && participation.initialization_state == Some(state)
        }))
    }

    async fn find_with_results_by_student(&self, login: &str) -> AppResult<Vec<Participation>> {
        let participations =
            self.collect_where(|participation| participation.student_login() == Some(login));
        Ok(participations
            .into_iter()
            .map(|participation| self.attach_results(participation))
            .collect())
    }

    async fn delete_by_id(&self, id: Uuid) -> AppResult<()> {
        self.participations.remove(&id);
        Ok(())
    }
}

/// In-memory result store
pub struct InMemoryResultStore {
    results: ResultMap,
}

#[async_trait]
impl ResultStore for InMemoryResultStore {
    async fn save(&self, mut result: ExerciseResult) -> AppResult<ExerciseResult> {
        let id = *result.id.get_or_insert_with(Uuid::new_v4);
        self.results.insert(id, result.clone());
        Ok(result)
    }

    async fn find_by_participation(
        &self,
        participation_id: Uuid,
    ) -> AppResult<Vec<ExerciseResult>> {
        let mut results: Vec<ExerciseResult> = self
            .results
            .iter()
            .filter(|entry| entry.value().participation_id == Some(participation_id))
            .map(|entry| entry.value().clone())
            .collect();
        results.sort_by_key(|result| result.completion_date);
        Ok(results)
    }

    async fn find_latest_rated_by_participation(
        &self,
        participation_id: Uuid,
    ) -> AppResult<Option<ExerciseResult>> {
        let results = self.find_by_participation(participation_id).await?;
        Ok(results.into_iter().filter(|result| result.rated).next_back())
    }

    async fn delete_by_id(&self, id: Uuid) -> AppResult<()> {
        self.results.remove(&id);
        Ok(())
    }
}

/// In-memory user directory
#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: DashMap<String, User>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: User) {
        self.users.insert(user.login.clone(), user);
    }
}

#[async_trait]
impl UserLookup for InMemoryUserDirectory {
    async fn get_user_by_login(&self, login: &str) -> AppResult<Option<User>> {
        Ok(self.users.get(login).map(|entry| entry.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Exercise, ProgrammingExercise};

    fn programming_exercise() -> Exercise {
        Exercise::Programming(ProgrammingExercise {
            id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            title: "Linked lists".to_string(),
            base_repository_url: "https://vcs.example.org/base/linked-lists.git".to_string(),
            base_build_plan_id: "LINKEDLISTS-BASE".to_string(),
        })
    }

    #[tokio::test]
    async fn test_save_assigns_id_once() {
        let (store, _) = in_memory_stores();
        let saved = store
            .save(Participation::new(programming_exercise()))
            .await
            .unwrap();

        let id = saved.id.expect("id assigned on first save");
        let resaved = store.save(saved).await.unwrap();
        assert_eq!(resaved.id, Some(id));
        assert_eq!(store.find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_find_with_results_sees_saved_results() {
        let (participations, results) = in_memory_stores();
        let exercise = programming_exercise();
        let exercise_id = exercise.id();

        let saved = participations
            .save(Participation::new(exercise))
            .await
            .unwrap();
        results
            .save(ExerciseResult {
                participation_id: saved.id,
                rated: true,
                ..ExerciseResult::default()
            })
            .await
            .unwrap();

        let loaded = participations
            .find_by_exercise_id_with_results(exercise_id)
            .await
            .unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].results.len(), 1);

        let plain = participations.find_by_exercise_id(exercise_id).await.unwrap();
        assert!(plain[0].results.is_empty());
    }

    #[tokio::test]
    async fn test_paged_listing() {
        let (store, _) = in_memory_stores();
        for _ in 0..5 {
            store
                .save(Participation::new(programming_exercise()))
                .await
                .unwrap();
        }

        let page = store.find_all_paged(2, 2).await.unwrap();
        assert_eq!(page.len(), 2);

        let tail = store.find_all_paged(10, 4).await.unwrap();
        assert_eq!(tail.len(), 1);
    }
}
