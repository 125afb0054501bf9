//! Result model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{QuizExercise, QuizSubmission};

/// Graded outcome owned by exactly one participation
///
/// Quiz results are created transiently while the quiz runs and only
/// persisted after closure and rating.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExerciseResult {
    pub id: Option<Uuid>,
    pub participation_id: Option<Uuid>,
    pub submission: Option<QuizSubmission>,
    pub rated: bool,
    pub completion_date: Option<DateTime<Utc>>,
    /// Relative score in percent (0-100)
    pub score: Option<i64>,
}

impl ExerciseResult {
    /// Create an unrated result wrapping the given submission
    pub fn for_submission(submission: QuizSubmission) -> Self {
        Self {
            submission: Some(submission),
            ..Self::default()
        }
    }

    /// Derive the percent score from the wrapped submission
    ///
    /// A quiz without scorable questions yields zero instead of dividing
    /// by zero, so an empty submission against an empty quiz is well-formed.
    pub fn evaluate_submission(&mut self, quiz: &QuizExercise) {
        let max_score = quiz.max_total_score();
        let achieved = self
            .submission
            .as_ref()
            .map(QuizSubmission::total_score_in_points)
            .unwrap_or(0.0);

        let percent = if max_score > 0.0 {
            (achieved / max_score * 100.0).round() as i64
        } else {
            0
        };
        self.score = Some(percent);
    }
}
