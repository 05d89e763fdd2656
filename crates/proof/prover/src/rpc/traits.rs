//! Client traits consumed by the prover.

use alloy_rpc_types_eth::Header;
use async_trait::async_trait;

use super::{BeaconSidecar, RpcResult};

/// Read access to the L1 execution chain.
#[async_trait]
pub trait L1Client: Send + Sync {
    /// Returns the latest block number.
    async fn block_number(&self) -> RpcResult<u64>;

    /// Returns the header at `number`, or the latest header when `None`.
    async fn header_by_number(&self, number: Option<u64>) -> RpcResult<Header>;
}

/// Read access to the L2 execution chain.
#[async_trait]
pub trait L2Client: Send + Sync {
    /// Returns the latest block number.
    async fn block_number(&self) -> RpcResult<u64>;

    /// Returns the header at `number`, or the latest header when `None`.
    ///
    /// A block that does not exist yet yields [`super::RpcError::HeaderNotFound`].
    async fn header_by_number(&self, number: Option<u64>) -> RpcResult<Header>;
}

/// Source of blob sidecars from the L1 beacon chain.
#[async_trait]
pub trait BeaconClient: Send + Sync {
    /// Returns every blob sidecar served for `slot`, in the order the node returns them.
    ///
    /// A slot without a block yields an empty list.
    async fn blob_sidecars(&self, slot: u64) -> RpcResult<Vec<BeaconSidecar>>;
}
