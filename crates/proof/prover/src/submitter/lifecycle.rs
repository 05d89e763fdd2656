//! Per-block proof lifecycle tracking.

use std::{collections::HashMap, fmt};

use thiserror::Error;

/// Where a block is in the prove pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProofState {
    /// The block was proposed on L1.
    Proposed,
    /// A proof was requested from the producer.
    ProofRequested,
    /// The producer returned a proof and it was delivered for submission.
    ProofReceived,
    /// The proof transaction was confirmed.
    Submitted,
    /// The request or the submission failed.
    Failed,
}

/// Inputs that move a [`ProofState`] forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofEvent {
    /// `request_proof` started.
    Request,
    /// The proof reached the delivery channel.
    Receive,
    /// `submit_proof` succeeded.
    Submit,
    /// `request_proof` failed, or could not be started.
    RequestFailed,
    /// `submit_proof` failed.
    SubmitFailed,
}

/// Rejected lifecycle transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// `event` is not valid in `from`.
    #[error("invalid proof transition from {from} on {event:?}")]
    InvalidTransition {
        /// State the block was in.
        from: ProofState,
        /// Rejected event.
        event: ProofEvent,
    },
    /// No lifecycle is tracked for the block.
    #[error("no proof lifecycle for block {0}")]
    UnknownBlock(u64),
}

impl fmt::Display for ProofState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Proposed => "proposed",
            Self::ProofRequested => "proof_requested",
            Self::ProofReceived => "proof_received",
            Self::Submitted => "submitted",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

impl ProofState {
    /// Applies `event`, returning the next state.
    pub const fn on(self, event: ProofEvent) -> Result<Self, LifecycleError> {
        match (self, event) {
            (Self::Proposed, ProofEvent::Request) => Ok(Self::ProofRequested),
            (Self::ProofRequested, ProofEvent::Receive) => Ok(Self::ProofReceived),
            (Self::Proposed | Self::ProofRequested, ProofEvent::RequestFailed) => {
                Ok(Self::Failed)
            }
            (Self::ProofReceived, ProofEvent::Submit) => Ok(Self::Submitted),
            (Self::ProofReceived, ProofEvent::SubmitFailed) => Ok(Self::Failed),
            (from, event) => Err(LifecycleError::InvalidTransition { from, event }),
        }
    }

    /// Returns true if no further event is accepted.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Submitted | Self::Failed)
    }
}

/// Tracks the [`ProofState`] of every block the prover has seen.
#[derive(Debug, Default)]
pub struct ProofLifecycle {
    states: HashMap<u64, ProofState>,
}

impl ProofLifecycle {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking `block_id` as [`ProofState::Proposed`].
    ///
    /// Returns false if the block is already in flight or submitted. A failed block
    /// starts over.
    pub fn propose(&mut self, block_id: u64) -> bool {
        match self.states.get(&block_id) {
            None | Some(ProofState::Failed) => {
                self.states.insert(block_id, ProofState::Proposed);
                true
            }
            Some(_) => false,
        }
    }

    /// Applies `event` to `block_id`.
    pub fn apply(
        &mut self,
        block_id: u64,
        event: ProofEvent,
    ) -> Result<ProofState, LifecycleError> {
        let state = self.states.get_mut(&block_id).ok_or(LifecycleError::UnknownBlock(block_id))?;
        *state = state.on(event)?;
        Ok(*state)
    }

    /// Returns the state of `block_id`.
    pub fn state(&self, block_id: u64) -> Option<ProofState> {
        self.states.get(&block_id).copied()
    }

    /// Returns the number of blocks in `state`.
    pub fn count(&self, state: ProofState) -> usize {
        self.states.values().filter(|s| **s == state).count()
    }

    /// Stops tracking submitted and failed blocks below `block_id`.
    pub fn prune_terminal(&mut self, block_id: u64) {
        self.states.retain(|id, state| *id >= block_id || !state.is_terminal());
    }
}
