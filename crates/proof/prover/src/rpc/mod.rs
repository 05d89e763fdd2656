//! RPC clients for the L1 and L2 execution chains and the L1 beacon chain.

use alloy_network::Ethereum;
use alloy_provider::RootProvider;

/// Shared type alias for the HTTP providers.
/// Uses `RootProvider` directly since these clients only perform read operations.
pub type HttpProvider = RootProvider<Ethereum>;

mod beacon_client;
mod client;
mod error;
mod traits;

pub use beacon_client::{BeaconSidecar, HttpBeaconClient};
pub use client::{ChainClient, ChainClientConfig};
pub use error::{RpcError, RpcResult};
pub use traits::{BeaconClient, L1Client, L2Client};
