//! State machine tracking one capability invocation.

use std::time::{Duration, Instant};

use agent_primitives::{ContractId, TraceId};
use thiserror::Error;
use tracing::debug;

/// States an invocation moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationState {
    /// Accepted; no backend chosen yet.
    Pending,
    /// Backend resolved and called.
    Invoking,
    /// Backend returned a result.
    Succeeded,
    /// Resolution or the backend call failed.
    Failed,
}

impl InvocationState {
    /// Returns `true` once the invocation has resolved.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Events that advance an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationEvent {
    /// A backend client was resolved for the contract's model.
    ModelResolved,
    /// The backend produced a result.
    Complete,
    /// Something went wrong.
    Fail,
}

/// Errors emitted by the tracker.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvocationError {
    /// The event is not allowed from the current state.
    #[error("invalid invocation transition from {from:?} via {event:?} for trace {trace_id}")]
    InvalidTransition {
        /// Trace of the invocation.
        trace_id: TraceId,
        /// State before the attempted transition.
        from: InvocationState,
        /// Offending event.
        event: InvocationEvent,
    },
}

/// Result alias for tracker operations.
pub type InvocationResult<T> = Result<T, InvocationError>;

/// Tracks the state of one invocation.
#[derive(Debug, Clone)]
pub struct InvocationTracker {
    trace_id: TraceId,
    contract_id: ContractId,
    state: InvocationState,
    started: Instant,
}

impl InvocationTracker {
    /// Starts tracking in [`InvocationState::Pending`].
    #[must_use]
    pub fn new(trace_id: TraceId, contract_id: ContractId) -> Self {
        Self {
            trace_id,
            contract_id,
            state: InvocationState::Pending,
            started: Instant::now(),
        }
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> InvocationState {
        self.state
    }

    /// Returns the time since the invocation was accepted.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Applies an event, returning the new state.
    ///
    /// # Errors
    ///
    /// Returns [`InvocationError::InvalidTransition`] when the event is not
    /// allowed from the current state.
    pub fn transition(&mut self, event: InvocationEvent) -> InvocationResult<InvocationState> {
        let next = match (self.state, event) {
            (InvocationState::Pending, InvocationEvent::ModelResolved) => InvocationState::Invoking,
            (InvocationState::Invoking, InvocationEvent::Complete) => InvocationState::Succeeded,
            (InvocationState::Pending | InvocationState::Invoking, InvocationEvent::Fail) => {
                InvocationState::Failed
            }
            (from, event) => {
                return Err(InvocationError::InvalidTransition {
                    trace_id: self.trace_id,
                    from,
                    event,
                });
            }
        };

        debug!(
            trace_id = %self.trace_id,
            contract_id = %self.contract_id,
            from = ?self.state,
            to = ?next,
            elapsed_ms = u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX),
            "invocation transition"
        );
        self.state = next;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> InvocationTracker {
        InvocationTracker::new(TraceId::random(), ContractId::new("c-1").unwrap())
    }

    #[test]
    fn happy_path() {
        let mut tracker = tracker();
        assert_eq!(tracker.state(), InvocationState::Pending);
        tracker.transition(InvocationEvent::ModelResolved).unwrap();
        assert_eq!(tracker.state(), InvocationState::Invoking);
        tracker.transition(InvocationEvent::Complete).unwrap();
        assert!(tracker.state().is_terminal());
    }

    #[test]
    fn resolution_failure_skips_invoking() {
        let mut tracker = tracker();
        assert_eq!(tracker.transition(InvocationEvent::Fail).unwrap(), InvocationState::Failed);
    }

    #[test]
    fn terminal_states_are_final() {
        let mut tracker = tracker();
        tracker.transition(InvocationEvent::ModelResolved).unwrap();
        tracker.transition(InvocationEvent::Fail).unwrap();

        let err = tracker.transition(InvocationEvent::Complete).unwrap_err();
        assert!(matches!(
            err,
            InvocationError::InvalidTransition { from: InvocationState::Failed, .. }
        ));
    }

    #[test]
    fn cannot_complete_before_resolution() {
        assert!(tracker().transition(InvocationEvent::Complete).is_err());
    }
}
