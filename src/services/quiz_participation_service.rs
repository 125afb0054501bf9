//! Quiz participation reconciliation
//!
//! Once a timed quiz closes, the live in-memory submission cache and the
//! persisted state must merge into a single participation view. Before the
//! close, views are synthesized from the cache alone. Persisting a
//! finalized view stays with the quiz scheduler; this service never writes.

use std::sync::Arc;

use chrono::Utc;

use crate::cache::QuizSubmissionCache;
use crate::error::AppResult;
use crate::models::{
    Exercise, ExerciseResult, InitializationState, Participation, QuizExercise, SubmissionType,
};
use crate::store::{ParticipationStore, ResultStore};

/// Service building participation views for quiz exercises
pub struct QuizParticipationService {
    participations: Arc<dyn ParticipationStore>,
    results: Arc<dyn ResultStore>,
    cache: Arc<dyn QuizSubmissionCache>,
}

impl QuizParticipationService {
    pub fn new(
        participations: Arc<dyn ParticipationStore>,
        results: Arc<dyn ResultStore>,
        cache: Arc<dyn QuizSubmissionCache>,
    ) -> Self {
        Self {
            participations,
            results,
            cache,
        }
    }

    /// Get the participation view for a quiz and student
    ///
    /// After the quiz ends the database is authoritative: a persisted
    /// participation comes back with its latest rated result attached.
    /// Otherwise the view is served from the cache, or synthesized from the
    /// student's live submission. A student without any cached submission
    /// still gets a well-formed view over an empty submission.
    pub async fn participation_for_quiz(
        &self,
        quiz: &QuizExercise,
        login: &str,
    ) -> AppResult<Participation> {
        let ended = quiz.is_ended();

        if ended {
            if let Some(mut participation) = self
                .participations
                .find_by_exercise_and_student(quiz.id, login)
                .await?
            {
                participation.exercise = Some(Exercise::Quiz(quiz.clone()));
                participation.results = Vec::new();

                if let Some(id) = participation.id {
                    if let Some(result) =
                        self.results.find_latest_rated_by_participation(id).await?
                    {
                        participation.results.push(result);
                    }
                }
                return Ok(participation);
            }
        }

        // mid-quiz fast path: the cache may already hold a reconciled view
        if let Some(participation) = self.cache.cached_participation(quiz.id, login) {
            return Ok(participation);
        }

        let mut submission = self.cache.cached_submission(quiz.id, login);
        if ended {
            if submission.submitted {
                submission.submission_type = Some(SubmissionType::Manual);
            } else {
                // never submitted: force-finalize at quiz close
                submission.submitted = true;
                submission.submission_type = Some(SubmissionType::Timeout);
                submission.submission_date = Some(Utc::now());
            }
        }

        let finalize = ended && submission.submission_date.is_some();
        if finalize {
            submission.calculate_scores(quiz);
        }

        let mut result = ExerciseResult::for_submission(submission);
        let mut participation = Participation::new(Exercise::Quiz(quiz.clone()));
        participation.initialization_state = Some(InitializationState::Initialized);

        if finalize {
            result.rated = true;
            result.completion_date = Some(Utc::now());
            result.evaluate_submission(quiz);
            participation.initialization_state = Some(InitializationState::Finished);
        }

        participation.results.push(result);
        Ok(participation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::QuizCache;
    use crate::models::{QuizQuestion, QuizSubmission, SubmittedAnswer, User};
    use crate::store::{in_memory_stores, InMemoryParticipationStore, InMemoryResultStore};
    use chrono::Duration;
    use uuid::Uuid;

    const STUDENT: &str = "ada";

    fn quiz(ended: bool, questions: Vec<QuizQuestion>) -> QuizExercise {
        let offset = if ended {
            -Duration::hours(1)
        } else {
            Duration::hours(1)
        };
        QuizExercise {
            id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            title: "Sorting quiz".to_string(),
            release_date: Some(Utc::now() - Duration::hours(2)),
            end_date: Some(Utc::now() + offset),
            questions,
        }
    }

    fn question(correct: &str, max_score: f64) -> QuizQuestion {
        QuizQuestion {
            id: Uuid::new_v4(),
            text: "?".to_string(),
            correct_answer: correct.to_string(),
            max_score,
        }
    }

    fn reconciler(
        participations: &Arc<InMemoryParticipationStore>,
        results: &Arc<InMemoryResultStore>,
        cache: &Arc<QuizCache>,
    ) -> QuizParticipationService {
        QuizParticipationService::new(
            Arc::clone(participations) as Arc<dyn ParticipationStore>,
            Arc::clone(results) as Arc<dyn ResultStore>,
            Arc::clone(cache) as Arc<dyn QuizSubmissionCache>,
        )
    }

    #[tokio::test]
    async fn test_open_quiz_view_is_idempotent() {
        let (participations, results) = in_memory_stores();
        let cache = Arc::new(QuizCache::new());
        let quiz = quiz(false, vec![question("42", 1.0)]);

        let submission = QuizSubmission {
            submitted_answers: vec![SubmittedAnswer {
                question_id: quiz.questions[0].id,
                answer_text: "41".to_string(),
                score_in_points: None,
            }],
            ..QuizSubmission::default()
        };
        cache.insert_submission(quiz.id, STUDENT, submission);

        let service = reconciler(&participations, &results, &cache);

        for _ in 0..2 {
            let view = service.participation_for_quiz(&quiz, STUDENT).await.unwrap();
            assert_eq!(
                view.initialization_state,
                Some(InitializationState::Initialized)
            );
            let result = &view.results[0];
            assert!(!result.rated);
            assert!(result.completion_date.is_none());
            let submission = result.submission.as_ref().unwrap();
            assert!(!submission.submitted);
            assert!(submission.submission_type.is_none());
        }
    }

    #[tokio::test]
    async fn test_closed_quiz_times_out_unsubmitted_student() {
        let (participations, results) = in_memory_stores();
        let cache = Arc::new(QuizCache::new());
        let quiz = quiz(true, vec![question("42", 1.0)]);

        cache.insert_submission(quiz.id, STUDENT, QuizSubmission::empty());

        let before = Utc::now();
        let service = reconciler(&participations, &results, &cache);
        let view = service.participation_for_quiz(&quiz, STUDENT).await.unwrap();

        assert_eq!(view.initialization_state, Some(InitializationState::Finished));
        let result = &view.results[0];
        assert!(result.rated);
        let submission = result.submission.as_ref().unwrap();
        assert!(submission.submitted);
        assert_eq!(submission.submission_type, Some(SubmissionType::Timeout));
        assert!(submission.submission_date.is_some_and(|date| date >= before));
    }

    #[tokio::test]
    async fn test_closed_quiz_preserves_manual_submission() {
        let (participations, results) = in_memory_stores();
        let cache = Arc::new(QuizCache::new());
        let scored_question = question("42", 4.0);
        let quiz = quiz(true, vec![scored_question.clone()]);
        let submitted_at = Utc::now() - Duration::minutes(30);

        let submission = QuizSubmission {
            submitted: true,
            submission_date: Some(submitted_at),
            submitted_answers: vec![SubmittedAnswer {
                question_id: scored_question.id,
                answer_text: "42".to_string(),
                score_in_points: None,
            }],
            ..QuizSubmission::default()
        };
        cache.insert_submission(quiz.id, STUDENT, submission);

        let service = reconciler(&participations, &results, &cache);
        let view = service.participation_for_quiz(&quiz, STUDENT).await.unwrap();

        assert_eq!(view.initialization_state, Some(InitializationState::Finished));
        let result = &view.results[0];
        assert!(result.rated);
        assert_eq!(result.score, Some(100));
        let submission = result.submission.as_ref().unwrap();
        assert_eq!(submission.submission_type, Some(SubmissionType::Manual));
        assert_eq!(submission.submission_date, Some(submitted_at));
    }

    #[tokio::test]
    async fn test_closed_quiz_without_any_submission_scores_zero() {
        let (participations, results) = in_memory_stores();
        let cache = Arc::new(QuizCache::new());
        let quiz = quiz(true, vec![question("42", 4.0)]);

        let service = reconciler(&participations, &results, &cache);
        let view = service.participation_for_quiz(&quiz, STUDENT).await.unwrap();

        assert_eq!(view.initialization_state, Some(InitializationState::Finished));
        let result = &view.results[0];
        assert!(result.rated);
        assert_eq!(result.score, Some(0));
        let submission = result.submission.as_ref().unwrap();
        assert_eq!(submission.submission_type, Some(SubmissionType::Timeout));
        assert!(submission.submitted_answers.is_empty());
    }

    #[tokio::test]
    async fn test_cached_participation_short_circuits() {
        let (participations, results) = in_memory_stores();
        let cache = Arc::new(QuizCache::new());
        let quiz = quiz(false, Vec::new());

        let mut reconciled = Participation::new(Exercise::Quiz(quiz.clone()));
        reconciled.id = Some(Uuid::new_v4());
        reconciled.initialization_state = Some(InitializationState::Finished);
        cache.insert_participation(quiz.id, STUDENT, reconciled.clone());

        let service = reconciler(&participations, &results, &cache);
        let view = service.participation_for_quiz(&quiz, STUDENT).await.unwrap();

        assert_eq!(view.id, reconciled.id);
        assert_eq!(view.initialization_state, Some(InitializationState::Finished));
    }

    #[tokio::test]
    async fn test_closed_quiz_prefers_database_over_cache() {
        let (participations, results) = in_memory_stores();
        let cache = Arc::new(QuizCache::new());
        let quiz = quiz(true, Vec::new());

        let mut persisted = Participation::new(Exercise::Quiz(quiz.clone()));
        persisted.student = Some(User {
            id: Uuid::new_v4(),
            login: STUDENT.to_string(),
            display_name: None,
            created_at: Utc::now(),
        });
        persisted.initialization_state = Some(InitializationState::Finished);
        let persisted = participations.save(persisted).await.unwrap();

        let rated = ExerciseResult {
            participation_id: persisted.id,
            submission: Some(QuizSubmission {
                submitted: true,
                submission_date: Some(Utc::now() - Duration::hours(2)),
                submission_type: Some(SubmissionType::Manual),
                ..QuizSubmission::default()
            }),
            rated: true,
            completion_date: Some(Utc::now() - Duration::hours(1)),
            score: Some(80),
            ..ExerciseResult::default()
        };
        results.save(rated).await.unwrap();

        // a stale cached view must lose against the database after close
        let mut stale = Participation::new(Exercise::Quiz(quiz.clone()));
        stale.id = Some(Uuid::new_v4());
        cache.insert_participation(quiz.id, STUDENT, stale);

        let service = reconciler(&participations, &results, &cache);
        let view = service.participation_for_quiz(&quiz, STUDENT).await.unwrap();

        assert_eq!(view.id, persisted.id);
        assert_eq!(view.results.len(), 1);
        assert!(view.results[0].rated);
        assert_eq!(view.results[0].score, Some(80));
        assert!(view.results[0].submission.is_some());
        assert!(matches!(view.exercise, Some(Exercise::Quiz(ref attached)) if attached.id == quiz.id));
    }

    #[tokio::test]
    async fn test_open_quiz_ignores_database() {
        let (participations, results) = in_memory_stores();
        let cache = Arc::new(QuizCache::new());
        let quiz = quiz(false, Vec::new());

        let mut persisted = Participation::new(Exercise::Quiz(quiz.clone()));
        persisted.student = Some(User {
            id: Uuid::new_v4(),
            login: STUDENT.to_string(),
            display_name: None,
            created_at: Utc::now(),
        });
        let persisted = participations.save(persisted).await.unwrap();

        let service = reconciler(&participations, &results, &cache);
        let view = service.participation_for_quiz(&quiz, STUDENT).await.unwrap();

        // mid-quiz the view is synthesized, not the persisted record
        assert_ne!(view.id, persisted.id);
        assert_eq!(
            view.initialization_state,
            Some(InitializationState::Initialized)
        );
    }
}
