//! `ProofSender` trait and its Alloy implementation.
//!
//! Sends built `proveBlock` transactions to L1. Supports two signing modes:
//! - **Local**: Signs with an in-process private key via [`EthereumWallet`].
//! - **Remote**: Calls a signer sidecar's `eth_signTransaction` JSON-RPC method.
//!
//! Standard tier submissions are re-sent with bumped fees (same nonce) when no
//! receipt arrives within the receipt timeout. Guardian submissions are sent once.
//! Earlier attempts are looked up on chain before every re-send and before giving up,
//! so a late confirmation is never followed by a second proof.

use std::time::Duration;

use alloy_eips::{BlockId, Encodable2718};
use alloy_network::{Ethereum, EthereumWallet, NetworkWallet, TransactionBuilder};
use alloy_primitives::{Address, B256, Bytes};
use alloy_provider::{Provider, RootProvider};
use alloy_rpc_types_eth::{TransactionReceipt, TransactionRequest};
use alloy_transport::TransportError;
use async_trait::async_trait;
use backon::Retryable;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use url::Url;

use super::errors::ContractError;
use crate::{
    config::{RetryConfig, SigningConfig},
    constants::{
        DEFAULT_MAX_PRICE_BUMPS, DEFAULT_PRICE_BUMP_PERCENT, DEFAULT_RECEIPT_TIMEOUT,
        GAS_LIMIT_MULTIPLIER_DENOMINATOR, GAS_LIMIT_MULTIPLIER_NUMERATOR, TIER_GUARDIAN,
    },
    producer::ProofWithHeader,
};

/// Applies a 120% safety margin to a gas estimate using integer arithmetic.
const fn apply_gas_margin(estimated: u64) -> u64 {
    estimated.saturating_mul(GAS_LIMIT_MULTIPLIER_NUMERATOR) / GAS_LIMIT_MULTIPLIER_DENOMINATOR
}

/// Errors returned when sending a proof transaction.
#[derive(Debug, Error)]
pub enum SenderError {
    /// A standard tier submission was attempted without fee bump parameters.
    #[error("tier {tier} submissions require a tier fee config")]
    MissingTierFeeConfig {
        /// Tier of the rejected proof.
        tier: u16,
    },

    /// The contract rejected the transaction.
    #[error(transparent)]
    Contract(ContractError),

    /// No receipt arrived after every fee bump.
    #[error("transaction {tx_hash} not confirmed after {attempts} attempts")]
    NotConfirmed {
        /// Hash of the last attempt.
        tx_hash: B256,
        /// Number of attempts made.
        attempts: u32,
    },

    /// An RPC call failed before the contract was reached.
    #[error("transaction submission failed: {0}")]
    Rpc(String),

    /// The transaction could not be signed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// A re-send was rejected because its nonce was used, and no earlier attempt was found
    /// on chain.
    #[error("nonce {nonce} already used by another transaction: {reason}")]
    NonceConsumed {
        /// Nonce shared by every attempt.
        nonce: u64,
        /// Rejection reported by the node.
        reason: String,
    },
}

impl SenderError {
    /// Returns true if the whole submission may be retried from scratch.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Rpc(_))
    }

    fn from_transport(operation: &str, err: &TransportError) -> Self {
        match ContractError::from_transport(err) {
            ContractError::Call(msg) => Self::Rpc(format!("{operation} failed: {msg}")),
            decoded => Self::Contract(decoded),
        }
    }

    /// Converts a failed re-send into a terminal error when the node reports the nonce as
    /// used. Restarting with a fresh nonce could land a second proof.
    fn into_resend_error(self, nonce: u64, attempt: u32) -> Self {
        match self {
            Self::Rpc(reason) if attempt > 0 && is_nonce_error(&reason) => {
                Self::NonceConsumed { nonce, reason }
            }
            other => other,
        }
    }
}

/// Node rejections meaning the nonce is already taken by a pending or mined transaction.
const NONCE_ERRORS: &[&str] = &["nonce too low", "already known", "nonce has already been used"];

fn is_nonce_error(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    NONCE_ERRORS.iter().any(|needle| message.contains(needle))
}

/// Fee bump parameters for standard tier submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierFeeConfig {
    /// Percentage added to both fee caps on each bump.
    pub price_bump_percent: u64,
    /// Maximum number of bumps after the first attempt.
    pub max_price_bumps: u32,
}

impl Default for TierFeeConfig {
    fn default() -> Self {
        Self {
            price_bump_percent: DEFAULT_PRICE_BUMP_PERCENT,
            max_price_bumps: DEFAULT_MAX_PRICE_BUMPS,
        }
    }
}

/// How fees evolve across the attempts of one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeePolicy {
    /// A single attempt at the estimated fees.
    Fixed,
    /// Re-send with fees raised by `percent` on each attempt, `max_bumps` times at most.
    Bump {
        /// Percentage added per bump.
        percent: u64,
        /// Maximum number of bumps.
        max_bumps: u32,
    },
}

impl FeePolicy {
    /// Resolves the policy for a proof of the given tier.
    ///
    /// Guardian proofs always use [`FeePolicy::Fixed`]; every other tier needs
    /// `tier_fees` to be configured.
    pub fn for_tier(tier: u16, tier_fees: Option<&TierFeeConfig>) -> Result<Self, SenderError> {
        if tier == TIER_GUARDIAN {
            return Ok(Self::Fixed);
        }
        let fees = tier_fees.ok_or(SenderError::MissingTierFeeConfig { tier })?;
        Ok(Self::Bump { percent: fees.price_bump_percent, max_bumps: fees.max_price_bumps })
    }

    /// Total number of send attempts.
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Fixed => 1,
            Self::Bump { max_bumps, .. } => max_bumps.saturating_add(1),
        }
    }

    /// Scales `fee` for the given zero-based attempt.
    pub fn bumped(&self, fee: u128, attempt: u32) -> u128 {
        match self {
            Self::Fixed => fee,
            Self::Bump { percent, .. } => (0..attempt).fold(fee, |acc, _| {
                acc.saturating_mul(100 + u128::from(*percent)) / 100
            }),
        }
    }
}

/// Static configuration of a [`ProofSender`].
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Fixed gas limit; estimated with a 20% margin when unset.
    pub gas_limit: Option<u64>,
    /// Time to wait for a receipt before bumping fees.
    pub receipt_timeout: Duration,
    /// Fee bump parameters for standard tiers.
    pub tier_fees: Option<TierFeeConfig>,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            gas_limit: None,
            receipt_timeout: DEFAULT_RECEIPT_TIMEOUT,
            tier_fees: Some(TierFeeConfig::default()),
        }
    }
}

/// Sends proof transactions to L1.
#[async_trait]
pub trait ProofSender: Send + Sync {
    /// Signs, sends and confirms `tx` for `proof`, returning the confirmed hash.
    async fn send(
        &self,
        proof: &ProofWithHeader,
        tx: TransactionRequest,
        fees: FeePolicy,
    ) -> Result<B256, SenderError>;
}

/// Transaction signer used by [`AlloyProofSender`].
enum TxSigner {
    Local(EthereumWallet),
    Remote { client: jsonrpsee::http_client::HttpClient, address: Address },
}

impl TxSigner {
    fn address(&self) -> Address {
        match self {
            Self::Local(wallet) => NetworkWallet::<Ethereum>::default_signer_address(wallet),
            Self::Remote { address, .. } => *address,
        }
    }

    async fn sign(&self, tx: TransactionRequest) -> Result<Bytes, SenderError> {
        match self {
            Self::Local(wallet) => {
                let envelope = <TransactionRequest as TransactionBuilder<Ethereum>>::build(
                    tx, wallet,
                )
                .await
                .map_err(|e| SenderError::Signing(format!("sign_transaction failed: {e}")))?;
                Ok(Bytes::from(Encodable2718::encoded_2718(&envelope)))
            }
            Self::Remote { client, .. } => {
                use jsonrpsee::core::{client::ClientT, params::ArrayParams};

                let mut params = ArrayParams::new();
                params
                    .insert(&tx)
                    .map_err(|e| SenderError::Signing(format!("failed to serialize tx: {e}")))?;
                client
                    .request("eth_signTransaction", params)
                    .await
                    .map_err(|e| SenderError::Signing(format!("eth_signTransaction failed: {e}")))
            }
        }
    }
}

/// Proof sender backed by an Alloy provider.
pub struct AlloyProofSender {
    provider: RootProvider,
    signer: TxSigner,
    config: SenderConfig,
    retry_config: RetryConfig,
    chain_id: OnceCell<u64>,
}

impl std::fmt::Debug for AlloyProofSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlloyProofSender")
            .field("from", &self.signer.address())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AlloyProofSender {
    /// Creates a sender for the given L1 endpoint and signing mode.
    pub fn new(
        l1_rpc_url: Url,
        signing: SigningConfig,
        config: SenderConfig,
        retry_config: RetryConfig,
    ) -> Result<Self, SenderError> {
        let signer = match signing {
            SigningConfig::Local { signer } => TxSigner::Local(EthereumWallet::from(signer)),
            SigningConfig::Remote { endpoint, address } => {
                let client = jsonrpsee::http_client::HttpClientBuilder::default()
                    .build(endpoint.as_str())
                    .map_err(|e| {
                        SenderError::Signing(format!("failed to build signer client: {e}"))
                    })?;
                TxSigner::Remote { client, address }
            }
        };

        Ok(Self {
            provider: RootProvider::new_http(l1_rpc_url),
            signer,
            config,
            retry_config,
            chain_id: OnceCell::new(),
        })
    }

    /// Returns the address transactions are sent from.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    async fn submit(
        &self,
        proof: &ProofWithHeader,
        tx: TransactionRequest,
        fees: FeePolicy,
    ) -> Result<B256, SenderError> {
        let from = self.signer.address();
        let block_id = proof.block_id;

        let nonce = self
            .provider
            .get_transaction_count(from)
            .await
            .map_err(|e| SenderError::Rpc(format!("get_transaction_count failed: {e}")))?;

        let chain_id = *self
            .chain_id
            .get_or_try_init(|| async {
                self.provider
                    .get_chain_id()
                    .await
                    .map_err(|e| SenderError::Rpc(format!("get_chain_id failed: {e}")))
            })
            .await?;

        let estimate = self
            .provider
            .estimate_eip1559_fees()
            .await
            .map_err(|e| SenderError::Rpc(format!("estimate_eip1559_fees failed: {e}")))?;

        let mut tx = tx
            .from(from)
            .nonce(nonce)
            .max_fee_per_gas(estimate.max_fee_per_gas)
            .max_priority_fee_per_gas(estimate.max_priority_fee_per_gas);
        tx.set_chain_id(chain_id);

        if tx.gas.is_none() {
            let gas = self
                .provider
                .estimate_gas(tx.clone())
                .await
                .map_err(|e| SenderError::from_transport("estimate_gas", &e))?;
            tx.set_gas_limit(apply_gas_margin(gas));
        }

        let attempts = fees.attempts();
        let mut sent = Vec::with_capacity(attempts as usize);
        for attempt in 0..attempts {
            let max_fee = fees.bumped(estimate.max_fee_per_gas, attempt);
            let tip = fees.bumped(estimate.max_priority_fee_per_gas, attempt);
            tx.set_max_fee_per_gas(max_fee);
            tx.set_max_priority_fee_per_gas(tip);

            let raw = self.signer.sign(tx.clone()).await?;
            let pending = match self.provider.send_raw_transaction(&raw).await {
                Ok(pending) => pending,
                Err(e) => {
                    if let Some((tx_hash, receipt)) = self.landed(&sent).await {
                        return self.confirmed(&tx, tx_hash, &receipt, block_id).await;
                    }
                    return Err(SenderError::from_transport("send_raw_transaction", &e)
                        .into_resend_error(nonce, attempt));
                }
            };

            let tx_hash = *pending.tx_hash();
            sent.push(tx_hash);
            info!(
                %tx_hash,
                block_id,
                tier = proof.tier,
                attempt,
                max_fee,
                "Proof transaction sent, waiting for receipt"
            );

            match tokio::time::timeout(self.config.receipt_timeout, pending.get_receipt()).await {
                Ok(receipt) => {
                    let receipt =
                        receipt.map_err(|e| SenderError::Rpc(format!("get_receipt failed: {e}")))?;
                    return self.confirmed(&tx, tx_hash, &receipt, block_id).await;
                }
                Err(_) => {
                    warn!(%tx_hash, block_id, attempt, "Proof transaction not confirmed in time");
                    if let Some((tx_hash, receipt)) = self.landed(&sent).await {
                        return self.confirmed(&tx, tx_hash, &receipt, block_id).await;
                    }
                }
            }
        }

        let tx_hash = sent.last().copied().unwrap_or_default();
        Err(SenderError::NotConfirmed { tx_hash, attempts })
    }

    /// Returns the first attempt in `sent` that has been mined.
    async fn landed(&self, sent: &[B256]) -> Option<(B256, TransactionReceipt)> {
        for tx_hash in sent {
            match self.provider.get_transaction_receipt(*tx_hash).await {
                Ok(Some(receipt)) => return Some((*tx_hash, receipt)),
                Ok(None) => {}
                Err(e) => {
                    debug!(%tx_hash, error = %e, "Failed to fetch receipt of earlier attempt");
                }
            }
        }
        None
    }

    /// Turns the receipt of a mined attempt into the submission result.
    async fn confirmed(
        &self,
        tx: &TransactionRequest,
        tx_hash: B256,
        receipt: &TransactionReceipt,
        block_id: u64,
    ) -> Result<B256, SenderError> {
        if !receipt.status() {
            return Err(self.revert_reason(tx, tx_hash, receipt.block_number).await);
        }

        info!(
            %tx_hash,
            block_id,
            block_number = receipt.block_number,
            "Proof transaction confirmed"
        );
        Ok(tx_hash)
    }

    /// Replays a reverted transaction at its inclusion block to recover the revert data.
    async fn revert_reason(
        &self,
        tx: &TransactionRequest,
        tx_hash: B256,
        block_number: Option<u64>,
    ) -> SenderError {
        let block = block_number.map_or_else(BlockId::latest, BlockId::number);
        match self.provider.call(tx.clone()).block(block).await {
            Err(e) => SenderError::Contract(ContractError::from_transport(&e)),
            Ok(_) => SenderError::Contract(ContractError::Revert(format!(
                "transaction {tx_hash} reverted"
            ))),
        }
    }
}

#[async_trait]
impl ProofSender for AlloyProofSender {
    async fn send(
        &self,
        proof: &ProofWithHeader,
        tx: TransactionRequest,
        fees: FeePolicy,
    ) -> Result<B256, SenderError> {
        (|| async { self.submit(proof, tx.clone(), fees).await })
            .retry(self.retry_config.to_backoff_builder())
            .when(SenderError::is_retryable)
            .notify(|err, dur| {
                warn!(
                    block_id = proof.block_id,
                    error = %err,
                    delay = ?dur,
                    "Retrying proof submission"
                );
            })
            .await
    }
}
