//! Beacon API client for blob sidecars.

use std::time::Duration;

use async_trait::async_trait;
use backon::Retryable;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{
    error::{RpcError, RpcResult},
    traits::BeaconClient,
};
use crate::config::RetryConfig;

/// The blob sidecars beacon API method prefix.
const SIDECARS_METHOD_PREFIX: &str = "eth/v1/beacon/blob_sidecars";

/// A blob sidecar as served by the beacon API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconSidecar {
    /// Index of the blob within its beacon block.
    pub index: String,
    /// Hex-encoded KZG commitment.
    pub kzg_commitment: String,
    /// Hex-encoded blob payload.
    pub blob: String,
}

/// Response body of `eth/v1/beacon/blob_sidecars/{slot}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct BlobSidecarsResponse {
    data: Vec<BeaconSidecar>,
}

/// Beacon API client backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpBeaconClient {
    /// Base URL of the beacon API, without a trailing slash.
    base: String,
    inner: Client,
    retry_config: RetryConfig,
}

impl HttpBeaconClient {
    /// Creates a new beacon client for the given endpoint.
    pub fn new(endpoint: &Url, timeout: Duration, retry_config: RetryConfig) -> RpcResult<Self> {
        let inner = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Connection(format!("Failed to build beacon client: {e}")))?;
        let base = endpoint.as_str().trim_end_matches('/').to_string();
        Ok(Self { base, inner, retry_config })
    }

    /// Returns the URL queried for `slot`.
    pub fn sidecars_url(&self, slot: u64) -> String {
        format!("{}/{}/{}", self.base, SIDECARS_METHOD_PREFIX, slot)
    }

    async fn fetch_sidecars(&self, slot: u64) -> RpcResult<Vec<BeaconSidecar>> {
        let response = self.inner.get(self.sidecars_url(slot)).send().await?;

        match response.status() {
            // Missed slots have no block and therefore no sidecars.
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            status if status.is_success() => {
                Ok(response.json::<BlobSidecarsResponse>().await?.data)
            }
            status if status.is_server_error() => {
                Err(RpcError::Transport(format!("beacon node returned {status} for slot {slot}")))
            }
            status => Err(RpcError::InvalidResponse(format!(
                "beacon node returned {status} for slot {slot}"
            ))),
        }
    }
}

#[async_trait]
impl BeaconClient for HttpBeaconClient {
    async fn blob_sidecars(&self, slot: u64) -> RpcResult<Vec<BeaconSidecar>> {
        let backoff = self.retry_config.to_backoff_builder();

        (|| async { self.fetch_sidecars(slot).await })
            .retry(backoff)
            .when(|e| e.is_retryable())
            .notify(|err, dur| {
                tracing::debug!(
                    slot,
                    error = %err,
                    delay = ?dur,
                    "Retrying BeaconClient::blob_sidecars"
                );
            })
            .await
    }
}
