//! `TaikoL1.proveBlock` transaction building.

use alloy_primitives::{Address, Bytes};
use alloy_rpc_types_eth::{TransactionInput, TransactionRequest};
use alloy_sol_types::{SolCall, SolValue};

use super::taiko_l1::{BlockMetadata, ITaikoL1, TierProof, Transition};

/// Encodes the `input` argument of `proveBlock`: `abi.encode(meta, transition, tierProof)`.
pub fn encode_prove_block_input(
    meta: &BlockMetadata,
    transition: &Transition,
    tier_proof: &TierProof,
) -> Bytes {
    (meta.clone(), transition.clone(), tier_proof.clone()).abi_encode_params().into()
}

/// Encodes the full `proveBlock(uint64,bytes)` calldata.
pub fn encode_prove_block_calldata(
    block_id: u64,
    meta: &BlockMetadata,
    transition: &Transition,
    tier_proof: &TierProof,
) -> Bytes {
    let input = encode_prove_block_input(meta, transition, tier_proof);
    ITaikoL1::proveBlockCall { blockId: block_id, input }.abi_encode().into()
}

/// Builds unsigned `proveBlock` transactions against a fixed `TaikoL1` deployment.
#[derive(Debug, Clone, Copy)]
pub struct ProveBlockTxBuilder {
    taiko_l1: Address,
    gas_limit: Option<u64>,
}

impl ProveBlockTxBuilder {
    /// Creates a builder targeting `taiko_l1`.
    pub const fn new(taiko_l1: Address) -> Self {
        Self { taiko_l1, gas_limit: None }
    }

    /// Sets a fixed gas limit instead of estimating one at send time.
    pub const fn with_gas_limit(mut self, gas_limit: Option<u64>) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    /// Returns the `TaikoL1` address transactions are sent to.
    pub const fn taiko_l1(&self) -> Address {
        self.taiko_l1
    }

    /// Builds a `proveBlock` transaction.
    ///
    /// The contest variant always carries empty proof data: a contest asserts a
    /// competing transition at the current tier without re-proving it.
    pub fn build(
        &self,
        block_id: u64,
        meta: &BlockMetadata,
        transition: &Transition,
        tier_proof: &TierProof,
        is_contest: bool,
    ) -> TransactionRequest {
        let calldata = if is_contest {
            let contest = TierProof { tier: tier_proof.tier, data: Bytes::new() };
            encode_prove_block_calldata(block_id, meta, transition, &contest)
        } else {
            encode_prove_block_calldata(block_id, meta, transition, tier_proof)
        };

        let tx = TransactionRequest::default()
            .to(self.taiko_l1)
            .input(TransactionInput::new(calldata));

        match self.gas_limit {
            Some(gas_limit) => tx.gas_limit(gas_limit),
            None => tx,
        }
    }
}
