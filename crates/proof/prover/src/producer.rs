//! Proof producer interface and the proof types handed to submission.

use alloy_primitives::{Address, B256, Bytes};
use alloy_rpc_types_eth::Header;
use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::{
    constants::{OPTIMISTIC_PROOF_LENGTH, TIER_OPTIMISTIC},
    contracts::BlockMetadata,
};

/// Parameters passed to a proof producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofRequestOptions {
    /// L2 block id being proven.
    pub block_id: u64,
    /// Address of the prover that will submit the proof.
    pub prover: Address,
    /// Hash of the L1 block containing the `BlockProposed` event.
    pub event_l1_hash: B256,
    /// Expected state root of the L2 block.
    pub state_root: B256,
}

/// A proof together with everything needed to submit it.
///
/// An empty `proof` is only valid for contests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofWithHeader {
    /// L2 block id.
    pub block_id: u64,
    /// Metadata of the proposed block.
    pub meta: BlockMetadata,
    /// Header of the L2 block being proven.
    pub header: Header,
    /// Opaque proof bytes.
    pub proof: Bytes,
    /// Options the proof was requested with.
    pub opts: ProofRequestOptions,
    /// Tier of the proof.
    pub tier: u16,
}

/// Errors returned by proof producers.
#[derive(Debug, Error)]
pub enum ProducerError {
    /// The backend failed to generate a proof.
    #[error("proof generation failed for block {block_id}: {reason}")]
    Failed {
        /// L2 block id.
        block_id: u64,
        /// Backend error message.
        reason: String,
    },
}

/// A backend that generates proofs for L2 blocks.
#[async_trait]
pub trait ProofProducer: Send + Sync {
    /// Generates a proof for the given block.
    async fn request_proof(
        &self,
        opts: &ProofRequestOptions,
        block_id: u64,
        meta: &BlockMetadata,
        header: &Header,
    ) -> Result<Bytes, ProducerError>;

    /// Returns the tier of the proofs this producer generates.
    fn tier(&self) -> u16;
}

/// Producer for the optimistic tier, which carries no real proof.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptimisticProofProducer;

#[async_trait]
impl ProofProducer for OptimisticProofProducer {
    async fn request_proof(
        &self,
        opts: &ProofRequestOptions,
        block_id: u64,
        meta: &BlockMetadata,
        header: &Header,
    ) -> Result<Bytes, ProducerError> {
        debug!(
            block_id,
            coinbase = %meta.coinbase,
            height = header.inner.number,
            hash = %header.hash,
            state_root = %opts.state_root,
            "Generating optimistic proof"
        );
        Ok(Bytes::from(vec![0xff; OPTIMISTIC_PROOF_LENGTH]))
    }

    fn tier(&self) -> u16 {
        TIER_OPTIMISTIC
    }
}
