//! Error types for the prover.

use thiserror::Error;

use crate::{
    config::ConfigError,
    context::ContextError,
    contracts::{ContractError, SenderError},
    producer::ProducerError,
    rpc::RpcError,
    txlist::TxListError,
};

/// Main error type for the prover.
#[derive(Debug, Error)]
pub enum ProverError {
    /// RPC connection error.
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    /// Contract read error, carrying the decoded custom error name when known.
    #[error(transparent)]
    Contract(#[from] ContractError),

    /// Proof transaction submission error.
    #[error(transparent)]
    Sender(#[from] SenderError),

    /// Transaction list retrieval error.
    #[error(transparent)]
    TxList(#[from] TxListError),

    /// The request context was cancelled or its deadline elapsed.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// The proof backend failed.
    #[error(transparent)]
    Producer(#[from] ProducerError),

    /// The block stored on L1 does not match the proof's metadata.
    #[error("metadata not found for block {0}")]
    MetadataNotFound(u64),

    /// The proof delivery channel was closed.
    #[error("proof channel closed")]
    ChannelClosed,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<eyre::Error> for ProverError {
    fn from(err: eyre::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Result type alias for prover operations.
pub type ProverResult<T> = Result<T, ProverError>;
