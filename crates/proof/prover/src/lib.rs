#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod blob;
pub use blob::{BLOB_ENCODING_VERSION, BlobError, MAX_BLOB_DATA_SIZE, decode_blob, encode_blob};

mod cli;
pub use cli::{Cli, LogArgs, MetricsArgs, ProverArgs};

mod config;
pub use config::{
    ConfigError, Graffiti, MetricsConfig, ProverConfig, RetryConfig, SigningConfig,
    build_signing_config, validate_url,
};

mod constants;
pub use constants::*;

mod context;
pub use context::{ContextError, RequestContext};

mod contracts;
pub use contracts::{
    AlloyProofSender, BlockInfo, BlockMetadata, BlockProposedEvent, ContractError, ErrorClass,
    EthDeposit, FeePolicy, ITaikoL1, OnchainTransition, ProofSender, ProveBlockTxBuilder,
    SenderConfig, SenderError, TaikoEvent, TaikoL1Client, TaikoL1ContractClient, TierFeeConfig,
    TierProof, Transition, TransitionProvedEvent, TransitionState, classify, decode_event,
    encode_prove_block_calldata, encode_prove_block_input,
};

mod driver;
pub use driver::{Driver, DriverConfig};

mod error;
pub use error::{ProverError, ProverResult};

mod logging;
pub use logging::{
    LogConfig, LogFormat, StdoutLogConfig, init_test_tracing, verbosity_to_level_filter,
};

mod metrics;
pub use metrics::{
    CONTESTS_SUBMITTED_TOTAL, INFO, LABEL_STAGE, LABEL_VERSION, LATEST_PROVEN_BLOCK_ID,
    PROOF_CHANNEL_DEPTH, PROOFS_FAILED_TOTAL, PROOFS_RECEIVED_TOTAL, PROOFS_REQUESTED_TOTAL,
    PROOFS_SUBMITTED_TOTAL, SUBMISSION_ERRORS_TOTAL, UP, record_startup_metrics,
};

mod producer;
pub use producer::{
    OptimisticProofProducer, ProducerError, ProofProducer, ProofRequestOptions, ProofWithHeader,
};

mod rpc;
pub use rpc::{
    BeaconClient, BeaconSidecar, ChainClient, ChainClientConfig, HttpBeaconClient, HttpProvider,
    L1Client, L2Client, RpcError, RpcResult,
};

mod service;
pub use service::run;

mod signal;
pub use signal::setup_signal_handler;

mod submitter;
pub use submitter::{
    LifecycleError, ProofContester, ProofEvent, ProofLifecycle, ProofState, ProofSubmitter,
    SubmitterConfig,
};

mod txlist;
pub use txlist::{
    BlobTxListFetcher, CalldataTxListFetcher, TxListError, TxListFetcher, kzg_to_versioned_hash,
};

#[cfg(test)]
pub mod test_utils;
