//! Blob-backed transaction list fetcher.

use std::sync::Arc;

use alloy_primitives::{B256, Bytes, hex};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::{debug, trace, warn};

use super::{TxListError, TxListFetcher};
use crate::{
    blob::decode_blob, constants::BLOB_SLOT_OFFSET, contracts::BlockMetadata, rpc::BeaconClient,
};

/// Version byte of KZG versioned hashes.
const VERSIONED_HASH_VERSION_KZG: u8 = 0x01;

/// Computes the EIP-4844 versioned hash of a KZG commitment.
pub fn kzg_to_versioned_hash(commitment: &[u8]) -> B256 {
    let mut hash: [u8; 32] = Sha256::digest(commitment).into();
    hash[0] = VERSIONED_HASH_VERSION_KZG;
    B256::from(hash)
}

/// Fetches transaction lists from the blob sidecars of the proposing L1 block.
#[derive(Debug)]
pub struct BlobTxListFetcher<B> {
    beacon: Arc<B>,
}

impl<B: BeaconClient> BlobTxListFetcher<B> {
    /// Creates a fetcher reading sidecars from `beacon`.
    pub const fn new(beacon: Arc<B>) -> Self {
        Self { beacon }
    }
}

#[async_trait]
impl<B: BeaconClient> TxListFetcher for BlobTxListFetcher<B> {
    async fn fetch(&self, _tx_input: &[u8], meta: &BlockMetadata) -> Result<Bytes, TxListError> {
        if !meta.blobUsed {
            return Err(TxListError::BlobUnused);
        }

        let slot = meta.l1Height + BLOB_SLOT_OFFSET;
        let sidecars = self.beacon.blob_sidecars(slot).await?;
        debug!(block_id = meta.id, slot, count = sidecars.len(), "Fetched blob sidecars");

        for sidecar in &sidecars {
            let commitment = match hex::decode(&sidecar.kzg_commitment) {
                Ok(commitment) => commitment,
                Err(e) => {
                    warn!(
                        slot,
                        index = %sidecar.index,
                        error = %e,
                        "Skipping sidecar with malformed commitment"
                    );
                    continue;
                }
            };

            let versioned_hash = kzg_to_versioned_hash(&commitment);
            trace!(
                slot,
                index = %sidecar.index,
                commitment_hash = %versioned_hash,
                "Checking blob sidecar"
            );
            if versioned_hash != meta.blobHash {
                continue;
            }

            let blob = hex::decode(&sidecar.blob).map_err(|e| {
                TxListError::InvalidSidecar(format!("blob at index {}: {e}", sidecar.index))
            })?;
            return Ok(decode_blob(&blob)?);
        }

        Err(TxListError::SidecarNotFound { slot, blob_hash: meta.blobHash })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        blob::BlobError,
        rpc::RpcError,
        test_utils::{MockBeacon, blob_sidecar},
    };

    const COMMITMENT: [u8; 48] = [0xc0; 48];

    fn blob_meta(l1_height: u64, blob_hash: B256) -> BlockMetadata {
        BlockMetadata {
            id: 9,
            l1Height: l1_height,
            blobUsed: true,
            blobHash: blob_hash,
            ..Default::default()
        }
    }

    #[test]
    fn test_versioned_hash_prefix() {
        let hash = kzg_to_versioned_hash(&COMMITMENT);
        assert_eq!(hash[0], VERSIONED_HASH_VERSION_KZG);
        let digest: [u8; 32] = Sha256::digest(COMMITMENT).into();
        assert_eq!(hash[1..], digest[1..]);
    }

    #[tokio::test]
    async fn test_fetch_matching_sidecar() {
        let data = b"rlp encoded tx list".to_vec();
        let beacon = Arc::new(
            MockBeacon::default().with_sidecars(
                101,
                vec![
                    blob_sidecar(0, &[0x11; 48], b"other block"),
                    blob_sidecar(1, &COMMITMENT, &data),
                ],
            ),
        );
        let fetcher = BlobTxListFetcher::new(Arc::clone(&beacon));

        let meta = blob_meta(100, kzg_to_versioned_hash(&COMMITMENT));
        let tx_list = fetcher.fetch(&[], &meta).await.unwrap();

        assert_eq!(tx_list.as_ref(), data.as_slice());
        assert_eq!(beacon.requested_slots(), vec![101]);
    }

    #[tokio::test]
    async fn test_fetch_blob_unused() {
        let beacon = Arc::new(MockBeacon::default());
        let fetcher = BlobTxListFetcher::new(Arc::clone(&beacon));
        let meta = BlockMetadata { blobUsed: false, ..Default::default() };

        let err = fetcher.fetch(&[], &meta).await.unwrap_err();
        assert!(matches!(err, TxListError::BlobUnused));
        assert!(!err.is_retryable());
        assert!(beacon.requested_slots().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_no_matching_sidecar() {
        let beacon = Arc::new(MockBeacon::default().with_sidecars(
            51,
            vec![blob_sidecar(0, &[0x22; 48], b"a"), blob_sidecar(1, &[0x33; 48], b"b")],
        ));
        let fetcher = BlobTxListFetcher::new(beacon);
        let blob_hash = kzg_to_versioned_hash(&COMMITMENT);

        let err = fetcher.fetch(&[], &blob_meta(50, blob_hash)).await.unwrap_err();
        assert!(matches!(
            err,
            TxListError::SidecarNotFound { slot: 51, blob_hash: h } if h == blob_hash
        ));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_fetch_empty_slot() {
        let fetcher = BlobTxListFetcher::new(Arc::new(MockBeacon::default()));
        let err = fetcher
            .fetch(&[], &blob_meta(7, kzg_to_versioned_hash(&COMMITMENT)))
            .await
            .unwrap_err();
        assert!(matches!(err, TxListError::SidecarNotFound { slot: 8, .. }));
    }

    #[tokio::test]
    async fn test_fetch_skips_malformed_commitment() {
        let mut malformed = blob_sidecar(0, &[0x44; 48], b"x");
        malformed.kzg_commitment = "0xnothex".to_string();
        let beacon = Arc::new(MockBeacon::default().with_sidecars(
            11,
            vec![malformed, blob_sidecar(1, &COMMITMENT, b"payload")],
        ));
        let fetcher = BlobTxListFetcher::new(beacon);

        let tx_list =
            fetcher.fetch(&[], &blob_meta(10, kzg_to_versioned_hash(&COMMITMENT))).await.unwrap();
        assert_eq!(tx_list.as_ref(), b"payload");
    }

    #[tokio::test]
    async fn test_fetch_invalid_blob() {
        let mut sidecar = blob_sidecar(0, &COMMITMENT, b"payload");
        sidecar.blob = hex::encode_prefixed([0u8; 64]);
        let beacon = Arc::new(MockBeacon::default().with_sidecars(3, vec![sidecar]));
        let fetcher = BlobTxListFetcher::new(beacon);

        let meta = blob_meta(2, kzg_to_versioned_hash(&COMMITMENT));
        let err = fetcher.fetch(&[], &meta).await.unwrap_err();
        assert!(matches!(err, TxListError::Blob(BlobError::InvalidSize(64))));
    }

    #[tokio::test]
    async fn test_fetch_propagates_beacon_errors() {
        let beacon = Arc::new(
            MockBeacon::default().with_error(RpcError::Connection("refused".to_string())),
        );
        let fetcher = BlobTxListFetcher::new(beacon);

        let meta = blob_meta(2, kzg_to_versioned_hash(&COMMITMENT));
        let err = fetcher.fetch(&[], &meta).await.unwrap_err();
        assert!(matches!(err, TxListError::Rpc(RpcError::Connection(_))));
        assert!(err.is_retryable());
    }
}
