//! Per-unit state machine.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::model::{ExecutionUnit, ResultStatus};

/// State of one execution unit inside a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitState {
    /// Waiting for a slot or a session.
    Pending,
    /// Handed to its adapter.
    Running,
    Completed,
    Failed,
    TimedOut,
}

impl UnitState {
    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::TimedOut)
    }

    pub fn can_transition_to(&self, next: UnitState) -> bool {
        match self {
            Self::Pending => next == Self::Running,
            Self::Running => next.is_terminal(),
            Self::Completed | Self::Failed | Self::TimedOut => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
        }
    }

    /// Status recorded on the unit's result. `None` for non-terminal states.
    pub fn result_status(&self) -> Option<ResultStatus> {
        match self {
            Self::Completed => Some(ResultStatus::Ok),
            Self::Failed => Some(ResultStatus::Error),
            Self::TimedOut => Some(ResultStatus::Timeout),
            Self::Pending | Self::Running => None,
        }
    }
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("illegal transition {from} -> {to} for {unit}")]
pub struct TransitionError {
    pub unit: String,
    pub from: UnitState,
    pub to: UnitState,
}

/// Tracks one unit through `Pending -> Running -> terminal`.
#[derive(Debug, Clone)]
pub struct UnitLifecycle {
    unit: ExecutionUnit,
    state: UnitState,
}

impl UnitLifecycle {
    pub fn new(unit: ExecutionUnit) -> Self {
        Self {
            unit,
            state: UnitState::Pending,
        }
    }

    pub fn unit(&self) -> &ExecutionUnit {
        &self.unit
    }

    pub fn state(&self) -> UnitState {
        self.state
    }

    fn transition(&mut self, next: UnitState) -> Result<(), TransitionError> {
        if !self.state.can_transition_to(next) {
            return Err(TransitionError {
                unit: self.unit.to_string(),
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), TransitionError> {
        self.transition(UnitState::Running)
    }

    /// Move to a terminal state. Fails for non-terminal targets.
    pub fn finish(&mut self, terminal: UnitState) -> Result<(), TransitionError> {
        if !terminal.is_terminal() {
            return Err(TransitionError {
                unit: self.unit.to_string(),
                from: self.state,
                to: terminal,
            });
        }
        self.transition(terminal)
    }
}
