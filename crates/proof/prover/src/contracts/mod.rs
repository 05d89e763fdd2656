//! `TaikoL1` contract bindings, proof transaction building and submission.

mod errors;
pub use errors::{ContractError, ErrorClass, classify};

mod proof_sender;
pub use proof_sender::{
    AlloyProofSender, FeePolicy, ProofSender, SenderConfig, SenderError, TierFeeConfig,
};

mod prove_block;
pub use prove_block::{ProveBlockTxBuilder, encode_prove_block_calldata, encode_prove_block_input};

mod taiko_l1;
pub use taiko_l1::{
    BlockInfo, BlockMetadata, BlockProposedEvent, EthDeposit, ITaikoL1, OnchainTransition,
    TaikoEvent, TaikoL1Client, TaikoL1ContractClient, TierProof, Transition, TransitionProvedEvent,
    TransitionState, decode_event,
};
