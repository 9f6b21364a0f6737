//! Workflow states, user actions and transition notifications.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// The lifecycle state of a forecasting session.
///
/// ```text
///            select target          start            success
///   Idle ───────────────────► Configured ──────► Training ──────► Ready ◄──┐
///    ▲                          ▲    ▲              │              │  │     │
///    │ load dataset             │    │ acknowledge  │ failure      │  └─► Predicting
///    │ (from any state)         │    └──────── Failed ◄────────────┘
///    │                          └───────────── retrain ◄─────────── Ready
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    /// No usable dataset/target combination yet.
    #[default]
    Idle,
    /// Dataset and numeric target chosen; ready to start training.
    Configured,
    /// Model search is running.
    Training,
    /// A trained model is cached and predictions may be requested.
    Ready,
    /// A single prediction is in flight.
    Predicting,
    /// The last training attempt failed and has not been acknowledged.
    Failed,
}

impl WorkflowState {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowState::Idle => "idle",
            WorkflowState::Configured => "configured",
            WorkflowState::Training => "training",
            WorkflowState::Ready => "ready",
            WorkflowState::Predicting => "predicting",
            WorkflowState::Failed => "failed",
        }
    }

    /// Training or prediction is in flight; other actions must wait.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(self, WorkflowState::Training | WorkflowState::Predicting)
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an invalid string into a [`WorkflowState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWorkflowStateError {
    invalid_value: String,
}

impl ParseWorkflowStateError {
    #[must_use]
    pub fn invalid_value(&self) -> &str {
        &self.invalid_value
    }
}

impl fmt::Display for ParseWorkflowStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid workflow state: '{}'. Valid values are: idle, configured, training, \
             ready, predicting, failed",
            self.invalid_value
        )
    }
}

impl std::error::Error for ParseWorkflowStateError {}

impl FromStr for WorkflowState {
    type Err = ParseWorkflowStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(WorkflowState::Idle),
            "configured" => Ok(WorkflowState::Configured),
            "training" => Ok(WorkflowState::Training),
            "ready" => Ok(WorkflowState::Ready),
            "predicting" => Ok(WorkflowState::Predicting),
            "failed" => Ok(WorkflowState::Failed),
            _ => Err(ParseWorkflowStateError {
                invalid_value: s.to_string(),
            }),
        }
    }
}

/// A user-initiated action dispatched through the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    LoadDataset,
    SelectTarget,
    ExcludeColumns,
    SetOptions,
    Start,
    FinishTraining,
    Acknowledge,
    Predict,
    Retrain,
}

impl Action {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::LoadDataset => "load dataset",
            Action::SelectTarget => "select target",
            Action::ExcludeColumns => "exclude columns",
            Action::SetOptions => "set options",
            Action::Start => "start training",
            Action::FinishTraining => "finish training",
            Action::Acknowledge => "acknowledge failure",
            Action::Predict => "predict",
            Action::Retrain => "retrain",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A state change, reported to the transition observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub from: WorkflowState,
    pub to: WorkflowState,
    pub action: Action,
}

/// Callback invoked after every state transition.
///
/// Must be `Send + Sync` because the controller may live behind a
/// [`SessionHandle`](crate::SessionHandle) shared across threads.
pub type TransitionCallback = Arc<dyn Fn(&Transition) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_roundtrip_through_str() {
        for state in [
            WorkflowState::Idle,
            WorkflowState::Configured,
            WorkflowState::Training,
            WorkflowState::Ready,
            WorkflowState::Predicting,
            WorkflowState::Failed,
        ] {
            assert_eq!(state.as_str().parse::<WorkflowState>(), Ok(state));
        }
    }

    #[test]
    fn test_parse_invalid_state() {
        let err = "running".parse::<WorkflowState>().unwrap_err();
        assert_eq!(err.invalid_value(), "running");
        assert!(err.to_string().contains("Valid values"));
    }

    #[test]
    fn test_is_busy() {
        assert!(WorkflowState::Training.is_busy());
        assert!(WorkflowState::Predicting.is_busy());
        assert!(!WorkflowState::Ready.is_busy());
        assert!(!WorkflowState::Failed.is_busy());
    }

    #[test]
    fn test_state_serializes_snake_case() {
        let json = serde_json::to_string(&WorkflowState::Configured).unwrap();
        assert_eq!(json, "\"configured\"");
    }
}
