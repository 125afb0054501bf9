//! Exercise models
//!
//! Exercises come in two kinds with different participation lifecycles:
//! programming exercises are provisioned against external version-control
//! and continuous-integration systems, quiz exercises run against the
//! in-memory submission cache until they close.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::quiz::QuizQuestion;

/// A course exercise a student can participate in
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Exercise {
    Programming(ProgrammingExercise),
    Quiz(QuizExercise),
}

impl Exercise {
    pub fn id(&self) -> Uuid {
        match self {
            Self::Programming(exercise) => exercise.id,
            Self::Quiz(exercise) => exercise.id,
        }
    }

    pub fn course_id(&self) -> Uuid {
        match self {
            Self::Programming(exercise) => exercise.course_id,
            Self::Quiz(exercise) => exercise.course_id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Programming(exercise) => &exercise.title,
            Self::Quiz(exercise) => &exercise.title,
        }
    }

    /// Check if this exercise is a single-attempt quiz
    pub fn is_quiz(&self) -> bool {
        matches!(self, Self::Quiz(_))
    }
}

/// Programming exercise with a template repository and build plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgrammingExercise {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    /// Template repository copied once per student
    pub base_repository_url: String,
    /// Template build plan copied once per student
    pub base_build_plan_id: String,
}

/// Timed quiz exercise
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizExercise {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub release_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub questions: Vec<QuizQuestion>,
}

impl QuizExercise {
    /// Check if the quiz has closed for submissions
    pub fn is_ended(&self) -> bool {
        match self.end_date {
            Some(end) => end < Utc::now(),
            None => false,
        }
    }

    /// Maximum achievable score across all questions
    pub fn max_total_score(&self) -> f64 {
        self.questions.iter().map(|question| question.max_score).sum()
    }
}
