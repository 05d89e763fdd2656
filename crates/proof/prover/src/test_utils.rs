//! Shared test utilities: mock clients, a mock `TaikoL1` chain and block fixtures.

use std::{
    collections::{BTreeSet, HashMap},
    ops::RangeInclusive,
    sync::{
        Mutex,
        atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering},
    },
    time::Duration,
};

use alloy_primitives::{Address, B256, Bytes, address, hex, keccak256};
use alloy_rpc_types_eth::{Header, TransactionRequest};
use alloy_sol_types::{SolCall, SolValue};
use async_trait::async_trait;

use crate::{
    blob::encode_blob,
    constants::TIER_OPTIMISTIC,
    contracts::{
        BlockInfo, BlockMetadata, BlockProposedEvent, ContractError, FeePolicy, ITaikoL1,
        OnchainTransition, ProofSender, SenderError, TaikoEvent, TaikoL1Client, TierProof,
        Transition,
    },
    producer::{ProducerError, ProofProducer, ProofRequestOptions, ProofWithHeader},
    rpc::{BeaconClient, BeaconSidecar, L1Client, L2Client, RpcError, RpcResult},
};

/// Address of the mocked `TaikoL1` deployment.
pub(crate) const TAIKO_L1: Address = address!("0x0000000000000000000000000000000000007777");

/// Address recorded as the contester of transitions contested through [`MockTaikoL1`].
pub(crate) const CONTESTER: Address = address!("0x00000000000000000000000000000000000c0c0c");

fn l2_block_hash(number: u64) -> B256 {
    keccak256(format!("l2-{number}"))
}

fn l1_block_hash(number: u64) -> B256 {
    keccak256(format!("l1-{number}"))
}

/// Builds an RPC header with the given fields.
fn header(number: u64, hash: B256, parent_hash: B256, state_root: B256) -> Header {
    Header {
        hash,
        inner: alloy_consensus::Header {
            number,
            parent_hash,
            state_root,
            ..Default::default()
        },
        total_difficulty: None,
        size: None,
    }
}

/// Deterministic L2 header for block `number`.
pub(crate) fn test_header(number: u64) -> Header {
    header(
        number,
        l2_block_hash(number),
        l2_block_hash(number.saturating_sub(1)),
        keccak256(format!("state-{number}")),
    )
}

/// Deterministic metadata for L2 block `block_id`.
pub(crate) fn test_meta(block_id: u64) -> BlockMetadata {
    BlockMetadata {
        l1Hash: l1_block_hash(100 + block_id),
        blobHash: keccak256(format!("blob-{block_id}")),
        coinbase: Address::repeat_byte(0xc0),
        id: block_id,
        gasLimit: 240_000_000,
        timestamp: 1_700_000_000 + block_id * 12,
        l1Height: 100 + block_id,
        minTier: TIER_OPTIMISTIC,
        blobUsed: true,
        ..Default::default()
    }
}

/// `BlockProposed` event for L2 block `block_id`, proposed in L1 block `101 + block_id`.
pub(crate) fn proposed_event(block_id: u64) -> BlockProposedEvent {
    let l1_block_number = 101 + block_id;
    BlockProposedEvent {
        block_id,
        assigned_prover: Address::repeat_byte(0xaa),
        meta: test_meta(block_id),
        l1_block_number,
        l1_block_hash: l1_block_hash(l1_block_number),
        tx_hash: keccak256(format!("tx-{block_id}")),
    }
}

/// Builds a beacon sidecar carrying `data` under the given commitment.
pub(crate) fn blob_sidecar(index: u64, commitment: &[u8], data: &[u8]) -> BeaconSidecar {
    let blob = encode_blob(data).expect("test data fits in a blob");
    BeaconSidecar {
        index: index.to_string(),
        kzg_commitment: hex::encode_prefixed(commitment),
        blob: hex::encode_prefixed(blob),
    }
}

/// Mock L1 client serving deterministic headers up to a fixed head.
#[derive(Default)]
pub(crate) struct MockL1 {
    latest: AtomicU64,
}

impl MockL1 {
    pub(crate) fn with_head(head: u64) -> Self {
        Self { latest: AtomicU64::new(head) }
    }
}

#[async_trait]
impl L1Client for MockL1 {
    async fn block_number(&self) -> RpcResult<u64> {
        Ok(self.latest.load(Ordering::SeqCst))
    }

    async fn header_by_number(&self, number: Option<u64>) -> RpcResult<Header> {
        let number = number.unwrap_or_else(|| self.latest.load(Ordering::SeqCst));
        let parent = l1_block_hash(number.saturating_sub(1));
        Ok(header(number, l1_block_hash(number), parent, B256::ZERO))
    }
}

/// Mock L2 client serving [`test_header`] for the blocks it knows.
#[derive(Default)]
pub(crate) struct MockL2 {
    blocks: Mutex<BTreeSet<u64>>,
}

impl MockL2 {
    pub(crate) fn with_blocks(blocks: RangeInclusive<u64>) -> Self {
        Self { blocks: Mutex::new(blocks.collect()) }
    }

    pub(crate) fn add_block(&self, number: u64) {
        self.blocks.lock().unwrap().insert(number);
    }
}

#[async_trait]
impl L2Client for MockL2 {
    async fn block_number(&self) -> RpcResult<u64> {
        Ok(self.blocks.lock().unwrap().last().copied().unwrap_or_default())
    }

    async fn header_by_number(&self, number: Option<u64>) -> RpcResult<Header> {
        let blocks = self.blocks.lock().unwrap();
        let number = match number {
            Some(number) => number,
            None => blocks.last().copied().unwrap_or_default(),
        };
        if blocks.contains(&number) {
            Ok(test_header(number))
        } else {
            Err(RpcError::HeaderNotFound(format!("mock: block {number}")))
        }
    }
}

/// Mock beacon client serving fixed sidecars per slot.
#[derive(Default)]
pub(crate) struct MockBeacon {
    sidecars: HashMap<u64, Vec<BeaconSidecar>>,
    error: Mutex<Option<RpcError>>,
    requested: Mutex<Vec<u64>>,
}

impl MockBeacon {
    pub(crate) fn with_sidecars(mut self, slot: u64, sidecars: Vec<BeaconSidecar>) -> Self {
        self.sidecars.insert(slot, sidecars);
        self
    }

    /// Fails the next request with `error`.
    pub(crate) fn with_error(self, error: RpcError) -> Self {
        *self.error.lock().unwrap() = Some(error);
        self
    }

    pub(crate) fn requested_slots(&self) -> Vec<u64> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl BeaconClient for MockBeacon {
    async fn blob_sidecars(&self, slot: u64) -> RpcResult<Vec<BeaconSidecar>> {
        self.requested.lock().unwrap().push(slot);
        if let Some(error) = self.error.lock().unwrap().take() {
            return Err(error);
        }
        Ok(self.sidecars.get(&slot).cloned().unwrap_or_default())
    }
}

/// Mock proof producer with an optional delay and a number of initial failures.
#[derive(Default)]
pub(crate) struct MockProducer {
    delay: Option<Duration>,
    failures: AtomicU32,
    calls: AtomicUsize,
}

impl MockProducer {
    pub(crate) fn with_delay(delay: Duration) -> Self {
        Self { delay: Some(delay), ..Default::default() }
    }

    pub(crate) fn failing_first(failures: u32) -> Self {
        Self { failures: AtomicU32::new(failures), ..Default::default() }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProofProducer for MockProducer {
    async fn request_proof(
        &self,
        _opts: &ProofRequestOptions,
        block_id: u64,
        _meta: &BlockMetadata,
        _header: &Header,
    ) -> Result<Bytes, ProducerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let failed =
            self.failures.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failed.is_ok() {
            return Err(ProducerError::Failed { block_id, reason: "mock failure".to_string() });
        }
        Ok(Bytes::from(vec![0xab; 32]))
    }

    fn tier(&self) -> u16 {
        TIER_OPTIMISTIC
    }
}

/// A `proveBlock` transaction received by [`MockTaikoL1`].
#[derive(Debug, Clone)]
pub(crate) struct SentTx {
    pub block_id: u64,
    pub tier: u16,
    pub prover: Address,
    pub is_contest: bool,
    pub transition: Transition,
    pub tier_proof: TierProof,
    pub fees: FeePolicy,
}

/// In-memory `TaikoL1` that also acts as the proof sender.
///
/// Sent `proveBlock` transactions are decoded and applied immediately: proofs record
/// a transition, contests mark the existing one as contested by [`CONTESTER`].
#[derive(Default)]
pub(crate) struct MockTaikoL1 {
    blocks: Mutex<HashMap<u64, BlockInfo>>,
    transitions: Mutex<HashMap<(u64, B256), OnchainTransition>>,
    events: Mutex<Vec<TaikoEvent>>,
    read_error: Mutex<Option<ContractError>>,
    sends: Mutex<Vec<SentTx>>,
}

impl MockTaikoL1 {
    /// Records block `block_id` as proposed and returns its event.
    pub(crate) fn propose(&self, block_id: u64) -> BlockProposedEvent {
        self.propose_with(proposed_event(block_id))
    }

    /// Records the proposal described by `event`.
    pub(crate) fn propose_with(&self, event: BlockProposedEvent) -> BlockProposedEvent {
        let block_id = event.block_id;
        self.blocks.lock().unwrap().insert(
            block_id,
            BlockInfo {
                metaHash: event.meta.meta_hash(),
                assignedProver: event.assigned_prover,
                blockId: block_id,
                proposedIn: event.l1_block_number,
                ..Default::default()
            },
        );
        self.events.lock().unwrap().push(TaikoEvent::BlockProposed(event.clone()));
        event
    }

    /// Appends an event to the log.
    pub(crate) fn push_event(&self, event: TaikoEvent) {
        self.events.lock().unwrap().push(event);
    }

    /// Builds the proof the local chain would produce for `event`.
    pub(crate) fn proof_for(&self, event: &BlockProposedEvent, tier: u16) -> ProofWithHeader {
        let header = test_header(event.block_id);
        ProofWithHeader {
            block_id: event.block_id,
            meta: event.meta.clone(),
            opts: ProofRequestOptions {
                block_id: event.block_id,
                prover: event.assigned_prover,
                event_l1_hash: event.l1_block_hash,
                state_root: header.inner.state_root,
            },
            header,
            proof: Bytes::from(vec![0xff; 100]),
            tier,
        }
    }

    pub(crate) fn set_transition(&self, block_id: u64, transition: OnchainTransition) {
        self.transitions.lock().unwrap().insert((block_id, transition.parent_hash), transition);
    }

    pub(crate) fn contest(&self, block_id: u64, parent_hash: B256) {
        if let Some(t) = self.transitions.lock().unwrap().get_mut(&(block_id, parent_hash)) {
            t.contester = CONTESTER;
        }
    }

    /// Fails every subsequent read with `error`.
    pub(crate) fn fail_reads(&self, error: ContractError) {
        *self.read_error.lock().unwrap() = Some(error);
    }

    pub(crate) fn sends(&self) -> Vec<SentTx> {
        self.sends.lock().unwrap().clone()
    }

    fn read_error(&self) -> Result<(), ContractError> {
        self.read_error.lock().unwrap().clone().map_or(Ok(()), Err)
    }
}

#[async_trait]
impl TaikoL1Client for MockTaikoL1 {
    fn address(&self) -> Address {
        TAIKO_L1
    }

    async fn get_block(&self, block_id: u64) -> Result<BlockInfo, ContractError> {
        self.read_error()?;
        self.blocks
            .lock()
            .unwrap()
            .get(&block_id)
            .cloned()
            .ok_or(ContractError::Custom { name: "L1_INVALID_BLOCK_ID" })
    }

    async fn get_transition(
        &self,
        block_id: u64,
        parent_hash: B256,
    ) -> Result<OnchainTransition, ContractError> {
        self.read_error()?;
        self.transitions
            .lock()
            .unwrap()
            .get(&(block_id, parent_hash))
            .copied()
            .ok_or(ContractError::Custom { name: "L1_TRANSITION_NOT_FOUND" })
    }

    async fn events(&self, from: u64, to: u64) -> Result<Vec<TaikoEvent>, ContractError> {
        self.read_error()?;
        let events = self.events.lock().unwrap();
        Ok(events
            .iter()
            .filter(|event| {
                let number = match event {
                    TaikoEvent::BlockProposed(e) => e.l1_block_number,
                    TaikoEvent::TransitionProved(e) => e.l1_block_number,
                };
                (from..=to).contains(&number)
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ProofSender for MockTaikoL1 {
    async fn send(
        &self,
        proof: &ProofWithHeader,
        tx: TransactionRequest,
        fees: FeePolicy,
    ) -> Result<B256, SenderError> {
        let input = tx.input.input().cloned().unwrap_or_default();
        let call = ITaikoL1::proveBlockCall::abi_decode(&input)
            .map_err(|e| SenderError::Rpc(format!("mock: {e}")))?;
        let (_, transition, tier_proof) =
            <(BlockMetadata, Transition, TierProof)>::abi_decode_params(&call.input)
                .map_err(|e| SenderError::Rpc(format!("mock: {e}")))?;

        let is_contest = tier_proof.data.is_empty();
        let key = (call.blockId, transition.parentHash);
        {
            let mut transitions = self.transitions.lock().unwrap();
            if is_contest {
                if let Some(existing) = transitions.get_mut(&key) {
                    existing.contester = CONTESTER;
                }
            } else {
                transitions.insert(
                    key,
                    OnchainTransition {
                        parent_hash: transition.parentHash,
                        block_hash: transition.blockHash,
                        state_root: transition.stateRoot,
                        tier: tier_proof.tier,
                        contester: Address::ZERO,
                    },
                );
            }
        }

        let mut sends = self.sends.lock().unwrap();
        sends.push(SentTx {
            block_id: call.blockId,
            tier: proof.tier,
            prover: proof.opts.prover,
            is_contest,
            transition,
            tier_proof,
            fees,
        });
        Ok(keccak256(format!("sent-{}", sends.len())))
    }
}
