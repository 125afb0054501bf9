//! Participation model and initialization state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Exercise, ExerciseResult, User};

/// Progress marker for the provisioning sequence of a participation
///
/// The first six states form a total order; `Finished` and `Inactive` sit
/// above `Initialized` so that every provisioning guard skips for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitializationState {
    Uninitialized,
    RepoCopied,
    RepoConfigured,
    BuildPlanCopied,
    BuildPlanConfigured,
    Initialized,
    Finished,
    Inactive,
}

impl InitializationState {
    /// Get state as string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::RepoCopied => "repo_copied",
            Self::RepoConfigured => "repo_configured",
            Self::BuildPlanCopied => "build_plan_copied",
            Self::BuildPlanConfigured => "build_plan_configured",
            Self::Initialized => "initialized",
            Self::Finished => "finished",
            Self::Inactive => "inactive",
        }
    }

    /// Parse state from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "uninitialized" => Some(Self::Uninitialized),
            "repo_copied" => Some(Self::RepoCopied),
            "repo_configured" => Some(Self::RepoConfigured),
            "build_plan_copied" => Some(Self::BuildPlanCopied),
            "build_plan_configured" => Some(Self::BuildPlanConfigured),
            "initialized" => Some(Self::Initialized),
            "finished" => Some(Self::Finished),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }

    /// Position in the provisioning order
    pub fn rank(&self) -> u8 {
        match self {
            Self::Uninitialized => 0,
            Self::RepoCopied => 1,
            Self::RepoConfigured => 2,
            Self::BuildPlanCopied => 3,
            Self::BuildPlanConfigured => 4,
            Self::Initialized => 5,
            Self::Finished => 6,
            Self::Inactive => 7,
        }
    }

    /// Check if this state is at or past the given provisioning stage
    pub fn has_completed(&self, stage: InitializationState) -> bool {
        self.rank() >= stage.rank()
    }
}

impl std::fmt::Display for InitializationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A student's attempt record for one exercise
///
/// The id is assigned by the store on first persist. Provisioning fields
/// (`repository_url`, `build_plan_id`) stay unset for quiz exercises.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participation {
    pub id: Option<Uuid>,
    pub exercise: Option<Exercise>,
    pub student: Option<User>,
    pub initialization_state: Option<InitializationState>,
    pub initialization_date: Option<DateTime<Utc>>,
    pub repository_url: Option<String>,
    pub build_plan_id: Option<String>,
    pub results: Vec<ExerciseResult>,
}

impl Participation {
    /// Create an unpersisted participation for the given exercise
    pub fn new(exercise: Exercise) -> Self {
        Self {
            id: None,
            exercise: Some(exercise),
            student: None,
            initialization_state: None,
            initialization_date: None,
            repository_url: None,
            build_plan_id: None,
            results: Vec::new(),
        }
    }

    pub fn exercise_id(&self) -> Option<Uuid> {
        self.exercise.as_ref().map(Exercise::id)
    }

    /// Login of the owning student
    pub fn student_login(&self) -> Option<&str> {
        self.student.as_ref().map(|user| user.login.as_str())
    }

    /// Check if the participation has reached the given provisioning stage
    pub fn has_completed(&self, stage: InitializationState) -> bool {
        self.initialization_state
            .is_some_and(|state| state.has_completed(stage))
    }

    pub fn is_programming(&self) -> bool {
        matches!(self.exercise, Some(Exercise::Programming(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provisioning_order() {
        let order = [
            InitializationState::Uninitialized,
            InitializationState::RepoCopied,
            InitializationState::RepoConfigured,
            InitializationState::BuildPlanCopied,
            InitializationState::BuildPlanConfigured,
            InitializationState::Initialized,
        ];

        for window in order.windows(2) {
            assert!(window[1].rank() > window[0].rank());
            assert!(window[1].has_completed(window[0]));
            assert!(!window[0].has_completed(window[1]));
        }
    }

    #[test]
    fn test_terminal_states_complete_every_stage() {
        for terminal in [InitializationState::Finished, InitializationState::Inactive] {
            assert!(terminal.has_completed(InitializationState::BuildPlanConfigured));
            assert!(terminal.has_completed(InitializationState::Initialized));
        }
    }

    #[test]
    fn test_state_string_round_trip() {
        for state in [
            InitializationState::Uninitialized,
            InitializationState::BuildPlanCopied,
            InitializationState::Inactive,
        ] {
            assert_eq!(InitializationState::from_str(state.as_str()), Some(state));
        }
        assert_eq!(InitializationState::from_str("provisioned"), None);
    }
}
