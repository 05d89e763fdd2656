//! Retrieval of L2 transaction lists from L1 data availability.

use alloy_primitives::{B256, Bytes};
use async_trait::async_trait;
use thiserror::Error;

use crate::{blob::BlobError, contracts::BlockMetadata, rpc::RpcError};

mod blob;
pub use blob::{BlobTxListFetcher, kzg_to_versioned_hash};

mod calldata;
pub use calldata::CalldataTxListFetcher;

/// Errors returned while fetching a transaction list.
#[derive(Debug, Error)]
pub enum TxListError {
    /// The block carries its transaction list in calldata.
    #[error("blob not used")]
    BlobUnused,

    /// The block carries its transaction list in a blob.
    #[error("blob used")]
    BlobUsed,

    /// No sidecar served at `slot` matches the block's blob hash.
    #[error("blob sidecar not found at slot {slot} for blob hash {blob_hash}")]
    SidecarNotFound {
        /// Beacon slot that was queried.
        slot: u64,
        /// Versioned hash the block commits to.
        blob_hash: B256,
    },

    /// The beacon or execution node could not be queried.
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// The matching blob is not a valid encoding.
    #[error("invalid blob: {0}")]
    Blob(#[from] BlobError),

    /// A sidecar field could not be parsed.
    #[error("invalid sidecar: {0}")]
    InvalidSidecar(String),

    /// The proposing transaction input is not a `proposeBlock` call.
    #[error("invalid proposeBlock calldata: {0}")]
    InvalidCalldata(String),
}

impl TxListError {
    /// Returns true if the fetch may succeed when retried later.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::SidecarNotFound { .. } => true,
            Self::Rpc(err) => err.is_retryable(),
            _ => false,
        }
    }
}

/// Retrieves the raw transaction list of a proposed L2 block.
#[async_trait]
pub trait TxListFetcher: Send + Sync {
    /// Returns the transaction list bytes for the block described by `meta`.
    ///
    /// `tx_input` is the input of the L1 transaction that proposed the block.
    async fn fetch(&self, tx_input: &[u8], meta: &BlockMetadata) -> Result<Bytes, TxListError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryability() {
        assert!(TxListError::SidecarNotFound { slot: 1, blob_hash: B256::ZERO }.is_retryable());
        assert!(TxListError::Rpc(RpcError::Timeout("slow".into())).is_retryable());
        assert!(!TxListError::Rpc(RpcError::InvalidResponse("bad".into())).is_retryable());
        assert!(!TxListError::BlobUnused.is_retryable());
        assert!(!TxListError::BlobUsed.is_retryable());
        assert!(!TxListError::Blob(BlobError::InvalidVersion(1)).is_retryable());
    }
}
