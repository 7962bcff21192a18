use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle of a freelancer engagement: `OPEN -> ACCEPTED -> COMPLETED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "project_state", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectState {
    Open,
    Accepted,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectAction {
    Accept,
    Complete,
    PayAdvance,
}

impl fmt::Display for ProjectAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProjectAction::Accept => "accept",
            ProjectAction::Complete => "complete",
            ProjectAction::PayAdvance => "pay the advance for",
        })
    }
}

impl fmt::Display for ProjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProjectState::Open => "OPEN",
            ProjectState::Accepted => "ACCEPTED",
            ProjectState::Completed => "COMPLETED",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot {action} a project in state {from}")]
pub struct TransitionError {
    pub from: ProjectState,
    pub action: ProjectAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Please enter a valid amount: `{0}` is not a positive number")]
pub struct AmountError(pub String);

impl ProjectState {
    pub fn accept(self) -> Result<Self, TransitionError> {
        match self {
            ProjectState::Open => Ok(ProjectState::Accepted),
            from => Err(TransitionError {
                from,
                action: ProjectAction::Accept,
            }),
        }
    }

    pub fn complete(self) -> Result<Self, TransitionError> {
        match self {
            ProjectState::Accepted => Ok(ProjectState::Completed),
            from => Err(TransitionError {
                from,
                action: ProjectAction::Complete,
            }),
        }
    }

    /// The advance can only be paid once the freelancer accepted the project.
    pub fn ensure_payable(self) -> Result<(), TransitionError> {
        match self {
            ProjectState::Accepted => Ok(()),
            from => Err(TransitionError {
                from,
                action: ProjectAction::PayAdvance,
            }),
        }
    }
}

/// Parse the amount a freelancer quotes when accepting a project.
pub fn parse_amount(raw: &str) -> Result<f64, AmountError> {
    match raw.trim().parse::<f64>() {
        Ok(amount) if amount.is_finite() && amount > 0.0 => Ok(amount),
        _ => Err(AmountError(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions_only() {
        assert_eq!(ProjectState::Open.accept(), Ok(ProjectState::Accepted));
        assert_eq!(ProjectState::Accepted.complete(), Ok(ProjectState::Completed));

        assert!(ProjectState::Open.complete().is_err());
        assert!(ProjectState::Accepted.accept().is_err());
        assert!(ProjectState::Completed.accept().is_err());
        assert!(ProjectState::Completed.complete().is_err());
    }

    #[test]
    fn only_accepted_projects_are_payable() {
        assert!(ProjectState::Accepted.ensure_payable().is_ok());
        assert!(ProjectState::Open.ensure_payable().is_err());
        assert!(ProjectState::Completed.ensure_payable().is_err());
    }

    #[test]
    fn amount_must_be_a_positive_number() {
        assert_eq!(parse_amount("1500"), Ok(1500.0));
        assert_eq!(parse_amount(" 249.50 "), Ok(249.5));

        for bad in ["-5", "0", "abc", "", "NaN", "inf", "12abc"] {
            assert!(parse_amount(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn state_serializes_in_upper_case() {
        assert_eq!(serde_json::to_string(&ProjectState::Accepted).unwrap(), "\"ACCEPTED\"");
        let state: ProjectState = serde_json::from_str("\"COMPLETED\"").unwrap();
        assert_eq!(state, ProjectState::Completed);
    }
}
