//! Quiz submission cache
//!
//! Live quiz answers stay in process memory until the quiz closes and the
//! scheduler persists them. The reconciler only reads; the scheduler owns
//! writes and the cache's lifetime, which is tied to the active-quiz
//! window of its exercise.

use dashmap::DashMap;
use uuid::Uuid;

use crate::models::{Participation, QuizSubmission};

/// Lookups the reconciler needs from the live quiz cache
///
/// Point lookups keyed by (exercise, student) are atomic; there are no
/// ordering guarantees across keys.
pub trait QuizSubmissionCache: Send + Sync {
    /// Already-reconciled participation for the pair, if any
    fn cached_participation(&self, exercise_id: Uuid, login: &str) -> Option<Participation>;

    /// The student's live submission; empty when none was cached
    fn cached_submission(&self, exercise_id: Uuid, login: &str) -> QuizSubmission;
}

/// Concurrent in-memory quiz cache
#[derive(Default)]
pub struct QuizCache {
    participations: DashMap<(Uuid, String), Participation>,
    submissions: DashMap<(Uuid, String), QuizSubmission>,
}

impl QuizCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_participation(
        &self,
        exercise_id: Uuid,
        login: &str,
        participation: Participation,
    ) {
        self.participations
            .insert((exercise_id, login.to_string()), participation);
    }

    pub fn insert_submission(&self, exercise_id: Uuid, login: &str, submission: QuizSubmission) {
        self.submissions
            .insert((exercise_id, login.to_string()), submission);
    }

    /// Drop everything cached for one exercise once it has been persisted
    pub fn clear_exercise(&self, exercise_id: Uuid) {
        self.participations.retain(|(cached, _), _| *cached != exercise_id);
        self.submissions.retain(|(cached, _), _| *cached != exercise_id);
    }
}

impl QuizSubmissionCache for QuizCache {
    fn cached_participation(&self, exercise_id: Uuid, login: &str) -> Option<Participation> {
        self.participations
            .get(&(exercise_id, login.to_string()))
            .map(|entry| entry.value().clone())
    }

    fn cached_submission(&self, exercise_id: Uuid, login: &str) -> QuizSubmission {
        self.submissions
            .get(&(exercise_id, login.to_string()))
            .map(|entry| entry.value().clone())
            .unwrap_or_else(QuizSubmission::empty)
    }
}
