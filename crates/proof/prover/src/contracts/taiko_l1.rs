//! `TaikoL1` contract bindings.
//!
//! Reads proposed blocks and recorded transitions, and decodes the
//! `BlockProposed` / `TransitionProved` logs that drive the prover.

use alloy_primitives::{Address, B256, U256, keccak256};
use alloy_provider::{Provider, RootProvider};
use alloy_rpc_types_eth::{Filter, Log};
use alloy_sol_types::{SolEvent, SolValue, sol};
use async_trait::async_trait;

use super::errors::ContractError;

sol! {
    /// Metadata of a proposed L2 block.
    #[derive(Debug, Default, PartialEq, Eq)]
    struct BlockMetadata {
        bytes32 l1Hash;
        bytes32 difficulty;
        bytes32 blobHash;
        bytes32 extraData;
        bytes32 depositsHash;
        address coinbase;
        uint64 id;
        uint32 gasLimit;
        uint64 timestamp;
        uint64 l1Height;
        uint24 txListByteOffset;
        uint24 txListByteSize;
        uint16 minTier;
        bool blobUsed;
        bytes32 parentMetaHash;
    }

    /// Transition submitted alongside a proof.
    #[derive(Debug, Default, PartialEq, Eq)]
    struct Transition {
        bytes32 parentHash;
        bytes32 blockHash;
        bytes32 stateRoot;
        bytes32 graffiti;
    }

    /// Transition as recorded by the contract.
    #[derive(Debug, Default, PartialEq, Eq)]
    struct TransitionState {
        bytes32 key;
        bytes32 blockHash;
        bytes32 stateRoot;
        address prover;
        uint96 validityBond;
        address contester;
        uint96 contestBond;
        uint64 timestamp;
        uint16 tier;
        uint8 contestations;
    }

    /// Proof payload tagged with its tier.
    #[derive(Debug, Default, PartialEq, Eq)]
    struct TierProof {
        uint16 tier;
        bytes data;
    }

    /// Block record stored by the contract.
    #[derive(Debug, Default, PartialEq, Eq)]
    struct BlockInfo {
        bytes32 metaHash;
        address assignedProver;
        uint96 livenessBond;
        uint64 blockId;
        uint64 proposedAt;
        uint64 proposedIn;
        uint32 nextTransitionId;
        uint32 verifiedTransitionId;
    }

    /// Ether deposit processed by a proposal.
    #[derive(Debug, Default, PartialEq, Eq)]
    struct EthDeposit {
        address recipient;
        uint96 amount;
        uint64 id;
    }

    /// `TaikoL1` contract interface.
    #[sol(rpc)]
    interface ITaikoL1 {
        error L1_ALREADY_CONTESTED();
        error L1_ALREADY_PROVED();
        error L1_BLOB_NOT_AVAILABLE();
        error L1_BLOB_NOT_FOUND();
        error L1_BLOCK_MISMATCH();
        error L1_INVALID_BLOCK_ID();
        error L1_INVALID_PARAM();
        error L1_INVALID_PAUSE_STATUS();
        error L1_INVALID_TIER();
        error L1_INVALID_TRANSITION();
        error L1_NOT_ASSIGNED_PROVER();
        error L1_TRANSITION_ID_ZERO();
        error L1_TRANSITION_NOT_FOUND();
        error L1_UNEXPECTED_PARENT();
        error L1_UNEXPECTED_TRANSITION_ID();
        error L1_UNEXPECTED_TRANSITION_TIER();

        #[derive(Debug)]
        event BlockProposed(
            uint256 indexed blockId,
            address indexed assignedProver,
            uint96 livenessBond,
            BlockMetadata meta,
            EthDeposit[] depositsProcessed
        );

        #[derive(Debug)]
        event TransitionProved(
            uint256 indexed blockId,
            Transition tran,
            address prover,
            uint96 validityBond,
            uint16 tier
        );

        function proposeBlock(bytes calldata params, bytes calldata txList)
            external
            payable
            returns (BlockMetadata memory meta, EthDeposit[] memory deposits);

        function proveBlock(uint64 blockId, bytes calldata input) external;

        function getBlock(uint64 blockId) external view returns (BlockInfo memory blk);

        function getTransition(uint64 blockId, bytes32 parentHash)
            external
            view
            returns (TransitionState memory);
    }
}

impl BlockMetadata {
    /// Returns the hash the contract stores for this metadata, `keccak256(abi.encode(meta))`.
    pub fn meta_hash(&self) -> B256 {
        keccak256(self.abi_encode())
    }
}

/// A transition read back from the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OnchainTransition {
    /// Parent block hash the transition was looked up by.
    pub parent_hash: B256,
    /// Resulting block hash.
    pub block_hash: B256,
    /// Resulting state root.
    pub state_root: B256,
    /// Tier of the proof currently backing the transition.
    pub tier: u16,
    /// Contester address, zero when uncontested.
    pub contester: Address,
}

impl OnchainTransition {
    fn from_state(parent_hash: B256, state: TransitionState) -> Self {
        Self {
            parent_hash,
            block_hash: state.blockHash,
            state_root: state.stateRoot,
            tier: state.tier,
            contester: state.contester,
        }
    }

    /// Returns true if a contest has already been recorded.
    pub fn is_contested(&self) -> bool {
        self.contester != Address::ZERO
    }
}

/// A decoded `BlockProposed` log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockProposedEvent {
    /// L2 block id.
    pub block_id: u64,
    /// Prover assigned to the block.
    pub assigned_prover: Address,
    /// Block metadata.
    pub meta: BlockMetadata,
    /// L1 block the proposal was included in.
    pub l1_block_number: u64,
    /// Hash of that L1 block.
    pub l1_block_hash: B256,
    /// Hash of the proposing transaction.
    pub tx_hash: B256,
}

/// A decoded `TransitionProved` log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionProvedEvent {
    /// L2 block id.
    pub block_id: u64,
    /// The proven transition.
    pub transition: Transition,
    /// Address that submitted the proof.
    pub prover: Address,
    /// Tier of the proof.
    pub tier: u16,
    /// L1 block the proof was included in.
    pub l1_block_number: u64,
}

/// Events emitted by `TaikoL1` that the prover reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaikoEvent {
    /// A new block was proposed.
    BlockProposed(BlockProposedEvent),
    /// A transition was proven.
    TransitionProved(TransitionProvedEvent),
}

/// Async trait for reading `TaikoL1` state.
#[async_trait]
pub trait TaikoL1Client: Send + Sync {
    /// Returns the address of the contract.
    fn address(&self) -> Address;

    /// Returns the stored block record for `block_id`.
    async fn get_block(&self, block_id: u64) -> Result<BlockInfo, ContractError>;

    /// Returns the transition recorded for `(block_id, parent_hash)`.
    async fn get_transition(
        &self,
        block_id: u64,
        parent_hash: B256,
    ) -> Result<OnchainTransition, ContractError>;

    /// Returns `BlockProposed` and `TransitionProved` events in `[from, to]`, in log order.
    async fn events(&self, from: u64, to: u64) -> Result<Vec<TaikoEvent>, ContractError>;
}

/// Concrete implementation backed by Alloy's sol-generated contract bindings.
#[derive(Debug)]
pub struct TaikoL1ContractClient {
    contract: ITaikoL1::ITaikoL1Instance<RootProvider>,
}

impl TaikoL1ContractClient {
    /// Creates a new client for the given contract address and L1 RPC URL.
    pub fn new(address: Address, l1_rpc_url: url::Url) -> Self {
        let provider = RootProvider::new_http(l1_rpc_url);
        let contract = ITaikoL1::ITaikoL1Instance::new(address, provider);
        Self { contract }
    }
}

#[async_trait]
impl TaikoL1Client for TaikoL1ContractClient {
    fn address(&self) -> Address {
        *self.contract.address()
    }

    async fn get_block(&self, block_id: u64) -> Result<BlockInfo, ContractError> {
        self.contract.getBlock(block_id).call().await.map_err(|e| ContractError::from_call(&e))
    }

    async fn get_transition(
        &self,
        block_id: u64,
        parent_hash: B256,
    ) -> Result<OnchainTransition, ContractError> {
        let state = self
            .contract
            .getTransition(block_id, parent_hash)
            .call()
            .await
            .map_err(|e| ContractError::from_call(&e))?;

        Ok(OnchainTransition::from_state(parent_hash, state))
    }

    async fn events(&self, from: u64, to: u64) -> Result<Vec<TaikoEvent>, ContractError> {
        let filter = Filter::new()
            .address(*self.contract.address())
            .event_signature(vec![
                ITaikoL1::BlockProposed::SIGNATURE_HASH,
                ITaikoL1::TransitionProved::SIGNATURE_HASH,
            ])
            .from_block(from)
            .to_block(to);

        let mut logs = self
            .contract
            .provider()
            .get_logs(&filter)
            .await
            .map_err(|e| ContractError::from_transport(&e))?;
        logs.sort_by_key(|log| (log.block_number, log.log_index));

        logs.iter().map(decode_event).collect()
    }
}

/// Decodes a single `TaikoL1` log into a [`TaikoEvent`].
pub fn decode_event(log: &Log) -> Result<TaikoEvent, ContractError> {
    let l1_block_number = log.block_number.unwrap_or_default();
    let topic = log.topics().first().copied().unwrap_or_default();

    if topic == ITaikoL1::BlockProposed::SIGNATURE_HASH {
        let event = ITaikoL1::BlockProposed::decode_log(&log.inner)
            .map_err(|e| ContractError::Decode(format!("BlockProposed: {e}")))?;
        return Ok(TaikoEvent::BlockProposed(BlockProposedEvent {
            block_id: u256_to_block_id(event.data.blockId)?,
            assigned_prover: event.data.assignedProver,
            meta: event.data.meta,
            l1_block_number,
            l1_block_hash: log.block_hash.unwrap_or_default(),
            tx_hash: log.transaction_hash.unwrap_or_default(),
        }));
    }

    if topic == ITaikoL1::TransitionProved::SIGNATURE_HASH {
        let event = ITaikoL1::TransitionProved::decode_log(&log.inner)
            .map_err(|e| ContractError::Decode(format!("TransitionProved: {e}")))?;
        return Ok(TaikoEvent::TransitionProved(TransitionProvedEvent {
            block_id: u256_to_block_id(event.data.blockId)?,
            transition: event.data.tran,
            prover: event.data.prover,
            tier: event.data.tier,
            l1_block_number,
        }));
    }

    Err(ContractError::Decode(format!("unexpected TaikoL1 log topic {topic}")))
}

fn u256_to_block_id(value: U256) -> Result<u64, ContractError> {
    value.try_into().map_err(|_| ContractError::Decode(format!("block id {value} overflows u64")))
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{Bytes, LogData, address, b256};

    use super::*;

    fn rpc_log(data: LogData, block_number: u64, log_index: u64) -> Log {
        Log {
            inner: alloy_primitives::Log {
                address: address!("0x0000000000000000000000000000000000001234"),
                data,
            },
            block_hash: Some(B256::repeat_byte(0xbb)),
            block_number: Some(block_number),
            block_timestamp: None,
            transaction_hash: Some(B256::repeat_byte(0xcc)),
            transaction_index: Some(0),
            log_index: Some(log_index),
            removed: false,
        }
    }

    #[test]
    fn test_meta_hash_changes_with_fields() {
        let meta = BlockMetadata { id: 7, l1Height: 100, ..Default::default() };
        let other = BlockMetadata { id: 8, l1Height: 100, ..Default::default() };
        let same = BlockMetadata { id: 7, l1Height: 100, ..Default::default() };
        assert_ne!(meta.meta_hash(), other.meta_hash());
        assert_eq!(meta.meta_hash(), same.meta_hash());
    }

    #[test]
    fn test_transition_is_contested() {
        let mut transition = OnchainTransition {
            parent_hash: B256::ZERO,
            block_hash: B256::repeat_byte(1),
            state_root: B256::repeat_byte(2),
            tier: 100,
            contester: Address::ZERO,
        };
        assert!(!transition.is_contested());
        transition.contester = address!("0x00000000000000000000000000000000000000aa");
        assert!(transition.is_contested());
    }

    #[test]
    fn test_decode_block_proposed_event() {
        let meta = BlockMetadata {
            id: 42,
            l1Height: 1000,
            blobUsed: true,
            blobHash: b256!("0x0100000000000000000000000000000000000000000000000000000000000001"),
            ..Default::default()
        };
        let event = ITaikoL1::BlockProposed {
            blockId: U256::from(42),
            assignedProver: address!("0x00000000000000000000000000000000000000aa"),
            livenessBond: Default::default(),
            meta: meta.clone(),
            depositsProcessed: vec![],
        };
        let log = rpc_log(event.encode_log_data(), 1001, 3);

        let TaikoEvent::BlockProposed(decoded) = decode_event(&log).unwrap() else {
            panic!("expected BlockProposed");
        };
        assert_eq!(decoded.block_id, 42);
        assert_eq!(decoded.meta, meta);
        assert_eq!(decoded.l1_block_number, 1001);
        assert_eq!(decoded.l1_block_hash, B256::repeat_byte(0xbb));
        assert_eq!(decoded.tx_hash, B256::repeat_byte(0xcc));
    }

    #[test]
    fn test_decode_transition_proved_event() {
        let event = ITaikoL1::TransitionProved {
            blockId: U256::from(9),
            tran: Transition {
                parentHash: B256::repeat_byte(1),
                blockHash: B256::repeat_byte(2),
                stateRoot: B256::repeat_byte(3),
                graffiti: B256::ZERO,
            },
            prover: address!("0x00000000000000000000000000000000000000bb"),
            validityBond: Default::default(),
            tier: 200,
        };
        let log = rpc_log(event.encode_log_data(), 50, 0);

        let TaikoEvent::TransitionProved(decoded) = decode_event(&log).unwrap() else {
            panic!("expected TransitionProved");
        };
        assert_eq!(decoded.block_id, 9);
        assert_eq!(decoded.tier, 200);
        assert_eq!(decoded.transition.blockHash, B256::repeat_byte(2));
    }

    #[test]
    fn test_decode_unknown_topic_fails() {
        let data = LogData::new_unchecked(vec![B256::repeat_byte(0x11)], Bytes::new());
        assert!(matches!(decode_event(&rpc_log(data, 1, 0)), Err(ContractError::Decode(_))));
    }
}
