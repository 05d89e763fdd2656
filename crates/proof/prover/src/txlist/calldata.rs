//! Calldata-backed transaction list fetcher.

use alloy_primitives::Bytes;
use alloy_sol_types::SolCall;
use async_trait::async_trait;

use super::{TxListError, TxListFetcher};
use crate::contracts::{BlockMetadata, ITaikoL1};

/// Fetches transaction lists from the `txList` argument of `proposeBlock`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalldataTxListFetcher;

#[async_trait]
impl TxListFetcher for CalldataTxListFetcher {
    async fn fetch(&self, tx_input: &[u8], meta: &BlockMetadata) -> Result<Bytes, TxListError> {
        if meta.blobUsed {
            return Err(TxListError::BlobUsed);
        }

        let call = ITaikoL1::proposeBlockCall::abi_decode(tx_input)
            .map_err(|e| TxListError::InvalidCalldata(e.to_string()))?;
        Ok(call.txList)
    }
}
