//! Event-driven prove/contest loop.
//!
//! The driver scans `TaikoL1` logs in bounded ranges, spawns a proof request for every
//! proposed block, submits proofs as they arrive on the delivery channel and contests
//! proven transitions that disagree with the local L2 chain. Blocks whose request or
//! submission failed are proposed again once their retry delay has passed, for as long
//! as their proposal is still cached.

use std::{collections::BTreeMap, future::Future, pin::Pin, sync::Arc, time::Duration};

use alloy_primitives::{Address, Bytes};
use backon::{ConstantBuilder, Retryable};
use tokio::{
    sync::mpsc,
    task::JoinSet,
    time::{Instant, MissedTickBehavior, interval},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    constants::{BLOB_FETCH_MAX_RETRIES, MAX_EVENT_RANGE, PROPOSAL_CACHE_SIZE},
    context::RequestContext,
    contracts::{BlockProposedEvent, TaikoEvent, TaikoL1Client, TransitionProvedEvent},
    error::{ProverError, ProverResult},
    metrics,
    producer::ProofWithHeader,
    rpc::{L1Client, L2Client, RpcError},
    submitter::{ProofContester, ProofEvent, ProofLifecycle, ProofState, ProofSubmitter},
    txlist::{TxListError, TxListFetcher},
};

/// Driver configuration.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Interval between L1 event scans.
    pub poll_interval: Duration,
    /// Deadline applied to every proof request.
    pub proof_request_timeout: Duration,
    /// Delay before a failed block is proposed again.
    pub failed_retry_interval: Duration,
    /// First L1 block to scan; the L1 head at the first scan when unset.
    pub start_height: Option<u64>,
    /// Address this prover submits from. Its own transitions are never contested.
    pub prover_address: Address,
}

/// Result of a task spawned by the driver.
#[derive(Debug)]
enum TaskOutcome {
    Request { block_id: u64, result: ProverResult<()> },
    Contest { block_id: u64, result: ProverResult<()> },
}

/// Drives proof requests, submissions and contests from `TaikoL1` events.
pub struct Driver<L1, L2, T> {
    config: DriverConfig,
    l1: Arc<L1>,
    l2: Arc<L2>,
    taiko_l1: Arc<T>,
    submitter: Arc<ProofSubmitter<L2, T>>,
    contester: Arc<ProofContester<L1, L2, T>>,
    /// Checks blob availability before a proof is requested.
    tx_list_fetcher: Option<Arc<dyn TxListFetcher>>,
    proof_rx: mpsc::Receiver<ProofWithHeader>,
    lifecycle: ProofLifecycle,
    /// Recent proposals by block id, used as contest input.
    proposals: BTreeMap<u64, BlockProposedEvent>,
    /// Failed blocks and when they are due to be proposed again.
    retry_at: BTreeMap<u64, Instant>,
    /// Next L1 block to scan.
    next_l1_block: Option<u64>,
    tasks: JoinSet<TaskOutcome>,
    cancel: CancellationToken,
}

impl<L1, L2, T> std::fmt::Debug for Driver<L1, L2, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("config", &self.config)
            .field("lifecycle", &self.lifecycle)
            .field("next_l1_block", &self.next_l1_block)
            .field("tasks", &self.tasks.len())
            .finish_non_exhaustive()
    }
}

impl<L1, L2, T> Driver<L1, L2, T>
where
    L1: L1Client + 'static,
    L2: L2Client + 'static,
    T: TaikoL1Client + 'static,
{
    /// Creates a new driver.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: DriverConfig,
        l1: Arc<L1>,
        l2: Arc<L2>,
        taiko_l1: Arc<T>,
        submitter: Arc<ProofSubmitter<L2, T>>,
        contester: Arc<ProofContester<L1, L2, T>>,
        proof_rx: mpsc::Receiver<ProofWithHeader>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            l1,
            l2,
            taiko_l1,
            submitter,
            contester,
            tx_list_fetcher: None,
            proof_rx,
            lifecycle: ProofLifecycle::new(),
            proposals: BTreeMap::new(),
            retry_at: BTreeMap::new(),
            next_l1_block: None,
            tasks: JoinSet::new(),
            cancel,
        }
    }

    /// Requires the blob of every blob-backed proposal to be retrievable before its proof
    /// is requested.
    pub fn with_tx_list_fetcher(mut self, fetcher: Arc<dyn TxListFetcher>) -> Self {
        self.tx_list_fetcher = Some(fetcher);
        self
    }

    /// Returns the per-block proof lifecycle.
    pub const fn lifecycle(&self) -> &ProofLifecycle {
        &self.lifecycle
    }

    /// Runs until the cancellation token fires, then aborts in-flight tasks.
    pub async fn run(&mut self) {
        let mut ticker = interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(poll_interval = ?self.config.poll_interval, "Driver started");
        loop {
            tokio::select! {
                () = self.cancel.cancelled() => break,
                Some(proof) = self.proof_rx.recv() => self.handle_proof(proof).await,
                Some(joined) = self.tasks.join_next() => match joined {
                    Ok(outcome) => self.handle_outcome(outcome),
                    Err(e) => warn!(error = %e, "Driver task failed"),
                },
                _ = ticker.tick() => {
                    if let Err(e) = self.step().await {
                        warn!("Driver step failed: {e}");
                    }
                    self.retry_failed();
                }
            }
        }

        self.tasks.shutdown().await;
        info!("Driver stopped");
    }

    /// Scans new `TaikoL1` events up to the L1 head.
    async fn step(&mut self) -> ProverResult<()> {
        let head = self.l1.block_number().await?;
        let mut from = *self.next_l1_block.get_or_insert(self.config.start_height.unwrap_or(head));

        while from <= head {
            let to = head.min(from + MAX_EVENT_RANGE - 1);
            let events = self.taiko_l1.events(from, to).await?;
            debug!(from, to, count = events.len(), "Scanned TaikoL1 events");

            for event in events {
                match event {
                    TaikoEvent::BlockProposed(event) => self.on_block_proposed(event),
                    TaikoEvent::TransitionProved(event) => self.on_transition_proved(event).await?,
                }
            }

            from = to + 1;
            self.next_l1_block = Some(from);
        }
        Ok(())
    }

    fn on_block_proposed(&mut self, event: BlockProposedEvent) {
        let block_id = event.block_id;
        self.proposals.insert(block_id, event.clone());
        let evicted = self.proposals.len() > PROPOSAL_CACHE_SIZE;
        while self.proposals.len() > PROPOSAL_CACHE_SIZE {
            self.proposals.pop_first();
        }
        if evicted {
            self.prune_below_cache();
        }

        if !self.lifecycle.propose(block_id) {
            debug!(block_id, "Proof already in flight");
            return;
        }
        if self.advance(block_id, ProofEvent::Request).is_none() {
            return;
        }

        let ctx = RequestContext::with_token(self.cancel.child_token())
            .with_timeout(self.config.proof_request_timeout);
        let submitter = Arc::clone(&self.submitter);
        let fetcher = self.tx_list_fetcher.clone().filter(|_| event.meta.blobUsed);
        let retry_interval = self.config.poll_interval;
        self.tasks.spawn(async move {
            let result = async {
                if let Some(fetcher) = fetcher {
                    ensure_tx_list(&ctx, fetcher.as_ref(), &event, retry_interval).await?;
                }
                submitter.request_proof(&ctx, &event).await
            }
            .await;
            TaskOutcome::Request { block_id, result }
        });
    }

    async fn on_transition_proved(&mut self, event: TransitionProvedEvent) -> ProverResult<()> {
        let block_id = event.block_id;
        if event.prover == self.config.prover_address {
            return Ok(());
        }

        let header = match self.l2.header_by_number(Some(block_id)).await {
            Ok(header) => header,
            Err(RpcError::HeaderNotFound(_) | RpcError::BlockNotFound(_)) => {
                debug!(block_id, "L2 block not synced, cannot check transition");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let transition = &event.transition;
        if transition.parentHash != header.inner.parent_hash {
            debug!(block_id, parent_hash = %transition.parentHash, "Transition on another parent");
            return Ok(());
        }
        if transition.blockHash == header.hash && transition.stateRoot == header.inner.state_root {
            return Ok(());
        }

        let Some(proposal) = self.proposals.get(&block_id).cloned() else {
            warn!(block_id, "No cached proposal for conflicting transition, cannot contest");
            return Ok(());
        };

        info!(
            block_id,
            prover = %event.prover,
            onchain_block_hash = %transition.blockHash,
            local_block_hash = %header.hash,
            "Conflicting transition proved"
        );

        let ctx = RequestContext::with_token(self.cancel.child_token());
        let contester = Arc::clone(&self.contester);
        let parent_hash = transition.parentHash;
        let tier = event.tier;
        self.tasks.spawn(async move {
            let result = contester
                .submit_contest(
                    &ctx,
                    block_id,
                    proposal.l1_block_number,
                    parent_hash,
                    &proposal.meta,
                    tier,
                )
                .await;
            TaskOutcome::Contest { block_id, result }
        });
        Ok(())
    }

    /// Re-proposes failed blocks whose retry delay has passed.
    fn retry_failed(&mut self) {
        let now = Instant::now();
        let due: Vec<u64> =
            self.retry_at.iter().filter(|(_, at)| **at <= now).map(|(id, _)| *id).collect();

        for block_id in due {
            self.retry_at.remove(&block_id);
            if self.lifecycle.state(block_id) != Some(ProofState::Failed) {
                continue;
            }
            let Some(proposal) = self.proposals.get(&block_id).cloned() else {
                debug!(block_id, "Proposal no longer cached, not retrying");
                continue;
            };
            info!(block_id, "Retrying failed proof");
            self.on_block_proposed(proposal);
        }
    }

    /// Forgets finished blocks that fell out of the proposal cache.
    fn prune_below_cache(&mut self) {
        let Some(&oldest) = self.proposals.keys().next() else {
            return;
        };
        self.lifecycle.prune_terminal(oldest);
        self.retry_at = self.retry_at.split_off(&oldest);
    }

    /// Applies `event` to `block_id`, scheduling a retry if the block failed.
    fn advance(&mut self, block_id: u64, event: ProofEvent) -> Option<ProofState> {
        match self.lifecycle.apply(block_id, event) {
            Ok(ProofState::Failed) => {
                self.retry_at.insert(block_id, Instant::now() + self.config.failed_retry_interval);
                Some(ProofState::Failed)
            }
            Ok(state) => Some(state),
            Err(e) => {
                warn!(block_id, ?event, error = %e, "Unexpected proof lifecycle state");
                None
            }
        }
    }

    async fn handle_proof(&mut self, proof: ProofWithHeader) {
        let block_id = proof.block_id;
        ::metrics::gauge!(metrics::PROOF_CHANNEL_DEPTH).set(self.submitter.queued_proofs() as f64);
        self.advance(block_id, ProofEvent::Receive);

        let ctx = RequestContext::with_token(self.cancel.child_token());
        match self.submitter.submit_proof(&ctx, proof).await {
            Ok(()) => {
                self.advance(block_id, ProofEvent::Submit);
            }
            Err(e) => {
                self.advance(block_id, ProofEvent::SubmitFailed);
                ::metrics::counter!(metrics::PROOFS_FAILED_TOTAL, metrics::LABEL_STAGE => "submit")
                    .increment(1);
                warn!(block_id, error = %e, "Failed to submit proof");
            }
        }
    }

    fn handle_outcome(&mut self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::Request { result: Ok(()), .. } |
            TaskOutcome::Contest { result: Ok(()), .. } => {}
            TaskOutcome::Request { block_id, result: Err(e) } => {
                self.advance(block_id, ProofEvent::RequestFailed);
                ::metrics::counter!(metrics::PROOFS_FAILED_TOTAL, metrics::LABEL_STAGE => "request")
                    .increment(1);
                warn!(block_id, error = %e, "Proof request failed");
            }
            TaskOutcome::Contest { block_id, result: Err(e) } => {
                warn!(block_id, error = %e, "Contest failed");
            }
        }
    }
}

/// Fetches the transaction list of a proposed block, retrying while its blob is not
/// served yet.
async fn ensure_tx_list(
    ctx: &RequestContext,
    fetcher: &dyn TxListFetcher,
    event: &BlockProposedEvent,
    retry_interval: Duration,
) -> ProverResult<()> {
    let block_id = event.block_id;
    let backoff = ConstantBuilder::default()
        .with_delay(retry_interval)
        .with_max_times(BLOB_FETCH_MAX_RETRIES);
    let tx_list = ctx
        .run(Box::pin(
            (|| async { fetcher.fetch(&[], &event.meta).await })
                .retry(backoff)
                .when(TxListError::is_retryable)
                .notify(|err, dur| {
                    debug!(block_id, error = %err, delay = ?dur, "Tx list not available yet");
                }),
        ) as Pin<Box<dyn Future<Output = Result<Bytes, TxListError>> + Send + '_>>)
        .await?
        .map_err(ProverError::TxList)?;

    debug!(block_id, len = tx_list.len(), "Tx list available");
    Ok(())
}
