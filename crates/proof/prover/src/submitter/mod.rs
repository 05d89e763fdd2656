//! Proof request and submission.
//!
//! [`ProofSubmitter::request_proof`] turns a `BlockProposed` event into a proof and
//! pushes it onto a bounded channel; [`ProofSubmitter::submit_proof`] takes a delivered
//! proof and sends the `proveBlock` transaction.

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use alloy_primitives::{Address, B256, Bytes};
use alloy_rpc_types_eth::Header;
use backon::{ConstantBuilder, Retryable};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    config::Graffiti,
    context::RequestContext,
    contracts::{
        BlockProposedEvent, ErrorClass, FeePolicy, ProofSender, ProveBlockTxBuilder,
        TaikoL1Client, TierFeeConfig, TierProof, Transition, classify,
    },
    error::{ProverError, ProverResult},
    metrics,
    producer::{ProducerError, ProofProducer, ProofRequestOptions, ProofWithHeader},
    rpc::{L2Client, RpcError},
};

mod contester;
pub use contester::ProofContester;

mod lifecycle;
pub use lifecycle::{LifecycleError, ProofEvent, ProofLifecycle, ProofState};

/// Static configuration of a [`ProofSubmitter`].
#[derive(Debug, Clone)]
pub struct SubmitterConfig {
    /// Address recorded as the prover of every request.
    pub prover_address: Address,
    /// Graffiti attached to submitted transitions.
    pub graffiti: Graffiti,
    /// Interval between L2 header polls while a block is not yet synced.
    pub poll_interval: Duration,
    /// Maximum number of producer retries per request.
    pub producer_max_retries: u32,
    /// Delay between producer retries.
    pub producer_retry_interval: Duration,
    /// Fee bump parameters for standard tier submissions.
    pub tier_fees: Option<TierFeeConfig>,
}

/// Requests proofs for proposed blocks and submits them to `TaikoL1`.
pub struct ProofSubmitter<L2, T> {
    config: SubmitterConfig,
    l2: Arc<L2>,
    taiko_l1: Arc<T>,
    producer: Arc<dyn ProofProducer>,
    sender: Arc<dyn ProofSender>,
    builder: ProveBlockTxBuilder,
    proof_tx: mpsc::Sender<ProofWithHeader>,
}

impl<L2, T> std::fmt::Debug for ProofSubmitter<L2, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProofSubmitter")
            .field("config", &self.config)
            .field("tier", &self.producer.tier())
            .field("builder", &self.builder)
            .finish_non_exhaustive()
    }
}

impl<L2, T> ProofSubmitter<L2, T>
where
    L2: L2Client,
    T: TaikoL1Client,
{
    /// Creates a submitter and the receiving end of its proof delivery channel.
    ///
    /// The channel holds at most `buffer_size` proofs. When it is full,
    /// [`Self::request_proof`] waits for the receiver to make room instead of dropping
    /// the proof; that wait still ends when the request context does.
    ///
    /// # Panics
    ///
    /// Panics if `buffer_size` is zero.
    pub fn new(
        config: SubmitterConfig,
        l2: Arc<L2>,
        taiko_l1: Arc<T>,
        producer: Arc<dyn ProofProducer>,
        sender: Arc<dyn ProofSender>,
        builder: ProveBlockTxBuilder,
        buffer_size: usize,
    ) -> (Self, mpsc::Receiver<ProofWithHeader>) {
        let (proof_tx, proof_rx) = mpsc::channel(buffer_size);
        let submitter = Self { config, l2, taiko_l1, producer, sender, builder, proof_tx };
        (submitter, proof_rx)
    }

    /// Returns the tier of the proofs this submitter produces.
    pub fn tier(&self) -> u16 {
        self.producer.tier()
    }

    /// Returns the number of proofs waiting in the delivery channel.
    pub fn queued_proofs(&self) -> usize {
        self.proof_tx.max_capacity() - self.proof_tx.capacity()
    }

    /// Requests a proof for a proposed block and delivers it to the proof channel.
    pub async fn request_proof(
        &self,
        ctx: &RequestContext,
        event: &BlockProposedEvent,
    ) -> ProverResult<()> {
        ctx.check()?;

        let block_id = event.block_id;
        let header = self.wait_for_l2_header(ctx, block_id).await?;

        let opts = ProofRequestOptions {
            block_id,
            prover: self.config.prover_address,
            event_l1_hash: event.l1_block_hash,
            state_root: header.inner.state_root,
        };

        ::metrics::counter!(metrics::PROOFS_REQUESTED_TOTAL).increment(1);
        info!(
            block_id,
            tier = self.producer.tier(),
            l1_hash = %event.l1_block_hash,
            "Requesting proof"
        );

        let backoff = ConstantBuilder::default()
            .with_delay(self.config.producer_retry_interval)
            .with_max_times(self.config.producer_max_retries as usize);
        let proof = ctx
            .run(Box::pin(
                (|| async {
                    self.producer.request_proof(&opts, block_id, &event.meta, &header).await
                })
                .retry(backoff)
                .notify(|err, dur| {
                    warn!(block_id, error = %err, delay = ?dur, "Retrying proof request");
                }),
            ) as Pin<Box<dyn Future<Output = Result<Bytes, ProducerError>> + Send + '_>>)
            .await??;

        let proof = ProofWithHeader {
            block_id,
            meta: event.meta.clone(),
            header,
            proof,
            opts,
            tier: self.producer.tier(),
        };

        ctx.run(self.proof_tx.send(proof)).await?.map_err(|_| ProverError::ChannelClosed)?;

        ::metrics::counter!(metrics::PROOFS_RECEIVED_TOTAL).increment(1);
        ::metrics::gauge!(metrics::PROOF_CHANNEL_DEPTH).set(self.queued_proofs() as f64);
        info!(block_id, "Proof generated");
        Ok(())
    }

    /// Polls the L2 node until the header of `block_id` is available.
    async fn wait_for_l2_header(
        &self,
        ctx: &RequestContext,
        block_id: u64,
    ) -> ProverResult<Header> {
        loop {
            match ctx.run(self.l2.header_by_number(Some(block_id))).await? {
                Ok(header) => return Ok(header),
                Err(RpcError::HeaderNotFound(_) | RpcError::BlockNotFound(_)) => {
                    debug!(block_id, "L2 block not synced yet, waiting");
                    ctx.sleep(self.config.poll_interval).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Submits a delivered proof to `TaikoL1`.
    pub async fn submit_proof(
        &self,
        ctx: &RequestContext,
        proof: ProofWithHeader,
    ) -> ProverResult<()> {
        ctx.check()?;
        let block_id = proof.block_id;

        let block = match ctx.run(self.taiko_l1.get_block(block_id)).await? {
            Ok(block) => block,
            Err(e) if classify(&e) == ErrorClass::Recognized => {
                warn!(block_id, error = %e, "Block not readable from TaikoL1");
                return Err(ProverError::MetadataNotFound(block_id));
            }
            Err(e) => return Err(e.into()),
        };

        if block.metaHash == B256::ZERO ||
            block.blockId != block_id ||
            block.metaHash != proof.meta.meta_hash()
        {
            warn!(
                block_id,
                onchain_block_id = block.blockId,
                onchain_meta_hash = %block.metaHash,
                "Proof metadata does not match the proposed block"
            );
            return Err(ProverError::MetadataNotFound(block_id));
        }

        let header = &proof.header;
        match ctx.run(self.taiko_l1.get_transition(block_id, header.inner.parent_hash)).await? {
            Ok(existing) if existing.block_hash == header.hash && existing.tier >= proof.tier => {
                info!(block_id, tier = existing.tier, "Block already proven, skipping submission");
                return Ok(());
            }
            Ok(existing) => {
                debug!(
                    block_id,
                    tier = existing.tier,
                    block_hash = %existing.block_hash,
                    "Existing transition"
                );
            }
            Err(e) => debug!(block_id, error = %e, "No existing transition"),
        }

        let fees = FeePolicy::for_tier(proof.tier, self.config.tier_fees.as_ref())?;
        let transition = Transition {
            parentHash: header.inner.parent_hash,
            blockHash: header.hash,
            stateRoot: header.inner.state_root,
            graffiti: self.config.graffiti.as_b256(),
        };
        let tier_proof = TierProof { tier: proof.tier, data: proof.proof.clone() };
        let tx = self.builder.build(block_id, &proof.meta, &transition, &tier_proof, false);

        let tx_hash = match ctx.run(self.sender.send(&proof, tx, fees)).await? {
            Ok(tx_hash) => tx_hash,
            Err(e) => {
                ::metrics::counter!(metrics::SUBMISSION_ERRORS_TOTAL).increment(1);
                return Err(e.into());
            }
        };

        ::metrics::counter!(metrics::PROOFS_SUBMITTED_TOTAL).increment(1);
        ::metrics::gauge!(metrics::LATEST_PROVEN_BLOCK_ID).set(block_id as f64);
        info!(block_id, %tx_hash, tier = proof.tier, "Proof submitted");
        Ok(())
    }
}
