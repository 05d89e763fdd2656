//! Contesting on-chain transitions that disagree with the local L2 chain.

use std::sync::Arc;

use alloy_primitives::{Address, B256, Bytes};
use tracing::{info, warn};

use crate::{
    config::Graffiti,
    context::RequestContext,
    contracts::{
        BlockMetadata, ErrorClass, FeePolicy, ProofSender, ProveBlockTxBuilder, TaikoL1Client,
        TierFeeConfig, TierProof, Transition, classify,
    },
    error::ProverResult,
    metrics,
    producer::{ProofRequestOptions, ProofWithHeader},
    rpc::{L1Client, L2Client},
};

/// Sends contest transactions for transitions this prover disagrees with.
pub struct ProofContester<L1, L2, T> {
    l1: Arc<L1>,
    l2: Arc<L2>,
    taiko_l1: Arc<T>,
    sender: Arc<dyn ProofSender>,
    builder: ProveBlockTxBuilder,
    graffiti: Graffiti,
    tier_fees: Option<TierFeeConfig>,
    prover_address: Address,
}

impl<L1, L2, T> std::fmt::Debug for ProofContester<L1, L2, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProofContester")
            .field("builder", &self.builder)
            .field("graffiti", &self.graffiti)
            .field("tier_fees", &self.tier_fees)
            .field("prover_address", &self.prover_address)
            .finish_non_exhaustive()
    }
}

impl<L1, L2, T> ProofContester<L1, L2, T>
where
    L1: L1Client,
    L2: L2Client,
    T: TaikoL1Client,
{
    /// Creates a contester that sends from `prover_address`.
    pub const fn new(
        l1: Arc<L1>,
        l2: Arc<L2>,
        taiko_l1: Arc<T>,
        sender: Arc<dyn ProofSender>,
        builder: ProveBlockTxBuilder,
        graffiti: Graffiti,
        tier_fees: Option<TierFeeConfig>,
        prover_address: Address,
    ) -> Self {
        Self { l1, l2, taiko_l1, sender, builder, graffiti, tier_fees, prover_address }
    }

    /// Contests the transition recorded for `(block_id, parent_hash)`.
    ///
    /// Does nothing if the transition is already contested, or if it cannot be read
    /// for a reason outside the contract's own error set.
    pub async fn submit_contest(
        &self,
        ctx: &RequestContext,
        block_id: u64,
        proposed_in: u64,
        parent_hash: B256,
        meta: &BlockMetadata,
        tier: u16,
    ) -> ProverResult<()> {
        ctx.check()?;

        let read = ctx.run(self.taiko_l1.get_transition(block_id, parent_hash)).await?;
        let transition = match read {
            Ok(transition) => transition,
            Err(e) => match classify(&e) {
                ErrorClass::Recognized => return Err(e.into()),
                ErrorClass::Transient => {
                    warn!(
                        block_id,
                        %parent_hash,
                        error = %e,
                        "Failed to read transition, skipping contest"
                    );
                    return Ok(());
                }
            },
        };

        if transition.is_contested() {
            info!(block_id, contester = %transition.contester, "Transition already contested");
            return Ok(());
        }

        let header = ctx.run(self.l2.header_by_number(Some(block_id))).await??;
        let l1_header = ctx.run(self.l1.header_by_number(Some(proposed_in))).await??;

        let contest_transition = Transition {
            parentHash: header.inner.parent_hash,
            blockHash: header.hash,
            stateRoot: header.inner.state_root,
            graffiti: self.graffiti.as_b256(),
        };
        let tier_proof = TierProof { tier: transition.tier, data: Bytes::new() };
        let tx = self.builder.build(block_id, meta, &contest_transition, &tier_proof, true);

        let fees = FeePolicy::for_tier(tier, self.tier_fees.as_ref())?;
        let proof = ProofWithHeader {
            block_id,
            meta: meta.clone(),
            opts: ProofRequestOptions {
                block_id,
                prover: self.prover_address,
                event_l1_hash: l1_header.hash,
                state_root: header.inner.state_root,
            },
            header,
            proof: Bytes::new(),
            tier,
        };

        info!(
            block_id,
            onchain_block_hash = %transition.block_hash,
            local_block_hash = %proof.header.hash,
            tier = transition.tier,
            "Contesting transition"
        );

        let tx_hash = match ctx.run(self.sender.send(&proof, tx, fees)).await? {
            Ok(tx_hash) => tx_hash,
            Err(e) => {
                ::metrics::counter!(metrics::SUBMISSION_ERRORS_TOTAL).increment(1);
                return Err(e.into());
            }
        };

        ::metrics::counter!(metrics::CONTESTS_SUBMITTED_TOTAL).increment(1);
        info!(block_id, %tx_hash, "Contest submitted");
        Ok(())
    }
}
