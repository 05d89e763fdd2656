//! Execution-layer RPC client shared by the L1 and L2 readers.

use std::time::Duration;

use alloy_eips::BlockNumberOrTag;
use alloy_provider::{Provider, RootProvider};
use alloy_rpc_client::RpcClient;
use alloy_rpc_types_eth::{BlockId, Header};
use alloy_transport_http::{Http, reqwest::Client};
use async_trait::async_trait;
use backon::Retryable;
use url::Url;

use super::{
    HttpProvider,
    error::{RpcError, RpcResult},
    traits::{L1Client, L2Client},
};
use crate::config::RetryConfig;

/// Configuration for a [`ChainClient`].
#[derive(Debug, Clone)]
pub struct ChainClientConfig {
    /// RPC endpoint URL.
    pub endpoint: Url,
    /// Request timeout.
    pub timeout: Duration,
    /// Retry configuration.
    pub retry_config: RetryConfig,
}

impl ChainClientConfig {
    /// Creates a new client configuration with defaults.
    pub fn new(endpoint: Url) -> Self {
        Self { endpoint, timeout: Duration::from_secs(30), retry_config: RetryConfig::default() }
    }

    /// Sets the request timeout.
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the retry configuration.
    pub const fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }
}

/// Read-only execution chain client using Alloy.
///
/// The same type serves L1 and L2; the chain is chosen by the endpoint.
#[derive(Debug, Clone)]
pub struct ChainClient {
    /// Label used in logs ("l1" or "l2").
    name: &'static str,
    /// The underlying HTTP provider.
    provider: HttpProvider,
    /// Retry configuration.
    retry_config: RetryConfig,
}

impl ChainClient {
    /// Creates a new client from the given configuration.
    pub fn new(name: &'static str, config: ChainClientConfig) -> RpcResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RpcError::Connection(format!("Failed to build HTTP client: {e}")))?;

        let http = Http::with_client(client, config.endpoint);
        let rpc_client = RpcClient::new(http, false);
        let provider = RootProvider::new(rpc_client);

        Ok(Self { name, provider, retry_config: config.retry_config })
    }

    async fn fetch_block_number(&self) -> RpcResult<u64> {
        let backoff = self.retry_config.to_backoff_builder();

        (|| async { self.provider.get_block_number().await.map_err(RpcError::from) })
            .retry(backoff)
            .when(|e| e.is_retryable())
            .notify(|err, dur| {
                tracing::debug!(
                    client = self.name,
                    error = %err,
                    delay = ?dur,
                    "Retrying block_number"
                );
            })
            .await
    }

    async fn fetch_header(&self, number: Option<u64>) -> RpcResult<Header> {
        let block_id: BlockId =
            number.map_or(BlockNumberOrTag::Latest, BlockNumberOrTag::Number).into();

        let backoff = self.retry_config.to_backoff_builder();

        let block = (|| async { self.provider.get_block(block_id).await.map_err(RpcError::from) })
            .retry(backoff)
            .when(|e| e.is_retryable())
            .notify(|err, dur| {
                tracing::debug!(
                    client = self.name,
                    error = %err,
                    delay = ?dur,
                    "Retrying header_by_number"
                );
            })
            .await?
            .ok_or_else(|| {
                RpcError::HeaderNotFound(format!("{} header not found for {block_id:?}", self.name))
            })?;

        Ok(block.header)
    }
}

#[async_trait]
impl L1Client for ChainClient {
    async fn block_number(&self) -> RpcResult<u64> {
        self.fetch_block_number().await
    }

    async fn header_by_number(&self, number: Option<u64>) -> RpcResult<Header> {
        self.fetch_header(number).await
    }
}

#[async_trait]
impl L2Client for ChainClient {
    async fn block_number(&self) -> RpcResult<u64> {
        self.fetch_block_number().await
    }

    async fn header_by_number(&self, number: Option<u64>) -> RpcResult<Header> {
        self.fetch_header(number).await
    }
}
