//! # procwatch state
//!
//! The supervision state machine owned by one watchdog loop.
//!
//! ```text
//! Starting -> Running -> Unresponsive -> Restarting -> Starting
//!                |                           |
//!                +-> Dead -> Starting        +-> Failed
//!                     |
//!                     +-> Failed
//! ```
//!
//! `Failed` (the executable could not be re-spawned) and `Stopped` (the host
//! cancelled supervision) are terminal. Every non-terminal state may move to
//! `Stopped`.

use chrono::{DateTime, Utc};
use procwatch_common::{WatchdogError, WatchdogResult};
use serde::{Deserialize, Serialize};
use std::fmt;

const MAX_HISTORY: usize = 100;

/// Lifecycle of one supervised process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SupervisedState {
    /// Freshly spawned or bound, not yet observed by the loop
    Starting,
    /// Being monitored
    Running,
    /// The window manager reports the process as not responding
    Unresponsive,
    /// The hung instance is being killed and replaced
    Restarting,
    /// The process exited without the loop asking it to
    Dead,
    /// Re-spawning failed; the target is no longer supervised
    Failed,
    /// Supervision was cancelled by the host
    Stopped,
}

impl fmt::Display for SupervisedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupervisedState::Starting => write!(f, "starting"),
            SupervisedState::Running => write!(f, "running"),
            SupervisedState::Unresponsive => write!(f, "unresponsive"),
            SupervisedState::Restarting => write!(f, "restarting"),
            SupervisedState::Dead => write!(f, "dead"),
            SupervisedState::Failed => write!(f, "failed"),
            SupervisedState::Stopped => write!(f, "stopped"),
        }
    }
}

impl SupervisedState {
    /// No further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SupervisedState::Failed | SupervisedState::Stopped)
    }
}

/// Represents a state transition with timestamp and optional reason
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub from_state: SupervisedState,
    pub to_state: SupervisedState,
    pub timestamp: DateTime<Utc>,
    pub reason: Option<String>,
}

/// Transition-checked state machine with bounded history.
#[derive(Debug, Clone)]
pub struct SupervisionStateMachine {
    target: String,
    current_state: SupervisedState,
    state_history: Vec<StateTransition>,
}

impl SupervisionStateMachine {
    /// Create a machine for `target` in its initial state.
    ///
    /// Adopted processes start in `Running`, spawned ones in `Starting`.
    pub fn new(target: impl Into<String>, initial: SupervisedState) -> Self {
        Self {
            target: target.into(),
            current_state: initial,
            state_history: Vec::new(),
        }
    }

    pub fn current_state(&self) -> SupervisedState {
        self.current_state
    }

    /// Most recent transitions, oldest first
    pub fn state_history(&self) -> &[StateTransition] {
        &self.state_history
    }

    /// Reason recorded with the latest transition
    pub fn last_reason(&self) -> Option<&str> {
        self.state_history
            .last()
            .and_then(|transition| transition.reason.as_deref())
    }

    /// Check if a transition from the current state to `target_state` is valid
    pub fn is_valid_transition(&self, target_state: SupervisedState) -> bool {
        use SupervisedState::*;

        match (self.current_state, target_state) {
            (Starting, Running) => true,

            (Running, Dead) => true,
            (Running, Unresponsive) => true,

            (Unresponsive, Restarting) => true,

            (Restarting, Starting) => true,
            (Restarting, Failed) => true,

            // Recoverable: the process vanished without being asked to
            (Dead, Starting) => true,
            (Dead, Failed) => true,

            // Host shutdown unwinds from any live state
            (from, Stopped) if !from.is_terminal() => true,

            _ => false,
        }
    }

    /// Transition to a new state with optional reason
    pub fn transition_to(
        &mut self,
        target_state: SupervisedState,
        reason: Option<String>,
    ) -> WatchdogResult<()> {
        if !self.is_valid_transition(target_state) {
            return Err(WatchdogError::invalid_transition(
                &self.target,
                self.current_state.to_string(),
                target_state.to_string(),
            ));
        }

        let from_state = self.current_state;
        self.state_history.push(StateTransition {
            from_state,
            to_state: target_state,
            timestamp: Utc::now(),
            reason,
        });
        if self.state_history.len() > MAX_HISTORY {
            self.state_history.remove(0);
        }

        self.current_state = target_state;

        tracing::debug!(
            "{} transitioned from {} to {}",
            self.target,
            from_state,
            target_state
        );

        Ok(())
    }
}
