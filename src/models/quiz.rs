//! Quiz submission models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::QuizExercise;

/// How a quiz submission reached its final state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionType {
    /// The student submitted explicitly before the deadline
    Manual,
    /// The submission was force-finalized when the quiz closed
    Timeout,
}

impl SubmissionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Timeout => "timeout",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(Self::Manual),
            "timeout" => Some(Self::Timeout),
            _ => None,
        }
    }
}

impl std::fmt::Display for SubmissionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single question of a quiz exercise
///
/// Richer question types live in the quiz authoring modules; the
/// participation core only needs the scoring-relevant fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: Uuid,
    pub text: String,
    pub correct_answer: String,
    pub max_score: f64,
}

/// A student's answer to one quiz question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    pub question_id: Uuid,
    pub answer_text: String,
    /// Achieved points, filled in by score calculation
    pub score_in_points: Option<f64>,
}

/// A student's live or persisted quiz submission
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuizSubmission {
    pub id: Option<Uuid>,
    pub submitted: bool,
    pub submission_date: Option<DateTime<Utc>>,
    pub submission_type: Option<SubmissionType>,
    pub submitted_answers: Vec<SubmittedAnswer>,
}

impl QuizSubmission {
    /// Empty submission for a student who never answered anything
    pub fn empty() -> Self {
        Self::default()
    }

    /// Score every answer against the quiz's questions
    ///
    /// Answers to unknown questions score zero. Calling this again simply
    /// recomputes the scores.
    pub fn calculate_scores(&mut self, quiz: &QuizExercise) {
        for answer in &mut self.submitted_answers {
            let achieved = quiz
                .questions
                .iter()
                .find(|question| question.id == answer.question_id)
                .map(|question| {
                    if answer.answer_text.trim() == question.correct_answer {
                        question.max_score
                    } else {
                        0.0
                    }
                })
                .unwrap_or(0.0);
            answer.score_in_points = Some(achieved);
        }
    }

    /// Total achieved points; unscored answers count as zero
    pub fn total_score_in_points(&self) -> f64 {
        self.submitted_answers
            .iter()
            .filter_map(|answer| answer.score_in_points)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiz_with_questions(questions: Vec<QuizQuestion>) -> QuizExercise {
        QuizExercise {
            id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            title: "Sorting basics".to_string(),
            release_date: None,
            end_date: None,
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

    #[test]
    fn test_calculate_scores() {
        let first = question("42", 2.0);
        let second = question("mergesort", 3.0);
        let quiz = quiz_with_questions(vec![first.clone(), second.clone()]);

        let mut submission = QuizSubmission {
            submitted_answers: vec![
                SubmittedAnswer {
                    question_id: first.id,
                    answer_text: " 42 ".to_string(),
                    score_in_points: None,
                },
                SubmittedAnswer {
                    question_id: second.id,
                    answer_text: "quicksort".to_string(),
                    score_in_points: None,
                },
            ],
            ..QuizSubmission::default()
        };

        submission.calculate_scores(&quiz);

        assert_eq!(submission.submitted_answers[0].score_in_points, Some(2.0));
        assert_eq!(submission.submitted_answers[1].score_in_points, Some(0.0));
        assert_eq!(submission.total_score_in_points(), 2.0);
    }

    #[test]
    fn test_empty_submission_scores_zero() {
        let quiz = quiz_with_questions(vec![question("yes", 1.0)]);
        let mut submission = QuizSubmission::empty();

        submission.calculate_scores(&quiz);

        assert_eq!(submission.total_score_in_points(), 0.0);
    }

    #[test]
    fn test_answer_to_unknown_question_scores_zero() {
        let quiz = quiz_with_questions(vec![question("yes", 1.0)]);
        let mut submission = QuizSubmission {
            submitted_answers: vec![SubmittedAnswer {
                question_id: Uuid::new_v4(),
                answer_text: "yes".to_string(),
                score_in_points: None,
            }],
            ..QuizSubmission::default()
        };

        submission.calculate_scores(&quiz);

        assert_eq!(submission.submitted_answers[0].score_in_points, Some(0.0));
    }
}
