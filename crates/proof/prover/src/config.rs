//! Configuration types and validation for the prover.

use std::{
    net::{IpAddr, Ipv4Addr},
    time::Duration,
};

use alloy_primitives::{Address, B256};
use alloy_signer::k256::ecdsa::SigningKey;
use alloy_signer_local::PrivateKeySigner;
use backon::ExponentialBuilder;
use thiserror::Error;
use url::Url;

use crate::{
    cli::{Cli, MetricsArgs},
    constants::{DEFAULT_RETRY_INITIAL_DELAY, DEFAULT_RETRY_MAX_DELAY, DEFAULT_RPC_MAX_RETRIES},
    contracts::{SenderConfig, TierFeeConfig},
    logging::LogConfig,
};

/// Errors that can occur during configuration validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid URL format.
    #[error("invalid {field} URL: {reason}")]
    InvalidUrl {
        /// The field name that contains the invalid URL.
        field: &'static str,
        /// The reason the URL is invalid.
        reason: String,
    },
    /// A field value is out of the allowed range.
    #[error("{field} must be {constraint}, got {value}")]
    OutOfRange {
        /// The field name that is out of range.
        field: &'static str,
        /// The constraint description.
        constraint: &'static str,
        /// The actual value.
        value: String,
    },
    /// Invalid metrics configuration.
    #[error("invalid metrics config: {0}")]
    Metrics(String),
    /// Invalid signing configuration.
    #[error("invalid signing config: {0}")]
    Signing(String),
}

/// Signing configuration for L1 transaction submission.
#[derive(Clone)]
pub enum SigningConfig {
    /// Local signing with an in-process private key (development).
    Local {
        /// The private key signer.
        signer: PrivateKeySigner,
    },
    /// Remote signing via a signer sidecar JSON-RPC endpoint (production).
    Remote {
        /// URL of the signer sidecar.
        endpoint: Url,
        /// Address of the signer account.
        address: Address,
    },
}

impl SigningConfig {
    /// Returns the address proofs are submitted from.
    pub fn address(&self) -> Address {
        match self {
            Self::Local { signer } => signer.address(),
            Self::Remote { address, .. } => *address,
        }
    }
}

impl std::fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local { signer } => {
                f.debug_struct("Local").field("address", &signer.address()).finish()
            }
            Self::Remote { endpoint, address } => f
                .debug_struct("Remote")
                .field("endpoint", endpoint)
                .field("address", address)
                .finish(),
        }
    }
}

/// A 32-byte tag attached to every transition this prover submits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Graffiti(B256);

impl Graffiti {
    /// Builds a graffiti from a string, left-aligned and zero-padded.
    ///
    /// Strings longer than 32 bytes are truncated.
    pub fn new(tag: &str) -> Self {
        let mut bytes = [0u8; 32];
        let len = tag.len().min(32);
        bytes[..len].copy_from_slice(&tag.as_bytes()[..len]);
        Self(B256::from(bytes))
    }

    /// Returns the raw 32-byte value.
    pub const fn as_b256(&self) -> B256 {
        self.0
    }
}

/// Validated RPC retry configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_attempts: u32,
    /// Initial delay for exponential backoff.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RPC_MAX_RETRIES,
            initial_delay: DEFAULT_RETRY_INITIAL_DELAY,
            max_delay: DEFAULT_RETRY_MAX_DELAY,
        }
    }
}

impl RetryConfig {
    /// Creates a `backon` [`ExponentialBuilder`] from this configuration.
    pub fn to_backoff_builder(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.initial_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_attempts as usize)
            .with_jitter()
    }
}

/// Validated metrics server configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,
    /// Metrics server bind address.
    pub addr: IpAddr,
    /// Metrics server port.
    pub port: u16,
}

impl From<MetricsArgs> for MetricsConfig {
    fn from(args: MetricsArgs) -> Self {
        Self { enabled: args.enabled, addr: args.addr, port: args.port }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: false, addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED), port: 7300 }
    }
}

/// Validated prover configuration.
#[derive(Debug, Clone)]
pub struct ProverConfig {
    /// URL of the L1 execution RPC endpoint.
    pub l1_http: Url,
    /// URL of the L2 execution RPC endpoint.
    pub l2_http: Url,
    /// URL of the L1 beacon API.
    pub beacon_http: Url,
    /// Address of the `TaikoL1` contract.
    pub taiko_l1_address: Address,
    /// Graffiti attached to submitted transitions.
    pub graffiti: Graffiti,
    /// Capacity of the proof delivery channel.
    pub proof_buffer_size: usize,
    /// Polling interval for L1 events and L2 headers.
    pub poll_interval: Duration,
    /// RPC request timeout.
    pub rpc_timeout: Duration,
    /// Timeout of a single proof request.
    pub proof_request_timeout: Duration,
    /// Delay before a failed block is tried again.
    pub failed_proof_retry_interval: Duration,
    /// First L1 block scanned for events; the current head when unset.
    pub start_height: Option<u64>,
    /// RPC retry configuration.
    pub retry: RetryConfig,
    /// Signing configuration for L1 transaction submission.
    pub signing: SigningConfig,
    /// Proof transaction sender configuration.
    pub sender: SenderConfig,
    /// Logging configuration.
    pub log: LogConfig,
    /// Metrics server configuration.
    pub metrics: MetricsConfig,
}

impl ProverConfig {
    /// Create a validated configuration from CLI arguments.
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let args = cli.prover;

        validate_url(&args.l1_http, "l1-http")?;
        validate_url(&args.l2_http, "l2-http")?;
        validate_url(&args.beacon_http, "beacon-http")?;

        for (field, value) in [
            ("poll-interval", args.poll_interval),
            ("rpc-timeout", args.rpc_timeout),
            ("proof-request-timeout", args.proof_request_timeout),
            ("failed-proof-retry-interval", args.failed_proof_retry_interval),
            ("receipt-timeout", args.receipt_timeout),
        ] {
            if value.is_zero() {
                return Err(ConfigError::OutOfRange {
                    field,
                    constraint: "greater than 0",
                    value: "0".to_string(),
                });
            }
        }

        if args.proof_buffer_size == 0 {
            return Err(ConfigError::OutOfRange {
                field: "proof-buffer-size",
                constraint: "greater than 0",
                value: "0".to_string(),
            });
        }

        if args.graffiti.len() > 32 {
            return Err(ConfigError::OutOfRange {
                field: "graffiti",
                constraint: "at most 32 bytes",
                value: args.graffiti.len().to_string(),
            });
        }

        if cli.metrics.enabled && cli.metrics.port == 0 {
            return Err(ConfigError::Metrics(
                "metrics port must be non-zero when metrics are enabled".to_string(),
            ));
        }

        let signing = build_signing_config(
            args.private_key.as_deref(),
            args.signer_endpoint.as_ref(),
            args.signer_address.as_ref(),
        )?;

        let tier_fees = (!args.disable_tier_fees).then_some(TierFeeConfig {
            price_bump_percent: args.price_bump_percent,
            max_price_bumps: args.max_price_bumps,
        });

        Ok(Self {
            l1_http: args.l1_http,
            l2_http: args.l2_http,
            beacon_http: args.beacon_http,
            taiko_l1_address: args.taiko_l1_address,
            graffiti: Graffiti::new(&args.graffiti),
            proof_buffer_size: args.proof_buffer_size,
            poll_interval: args.poll_interval,
            rpc_timeout: args.rpc_timeout,
            proof_request_timeout: args.proof_request_timeout,
            failed_proof_retry_interval: args.failed_proof_retry_interval,
            start_height: args.start_height,
            retry: RetryConfig {
                max_attempts: args.rpc_max_retries,
                initial_delay: args.rpc_retry_initial_delay,
                max_delay: args.rpc_retry_max_delay,
            },
            signing,
            sender: SenderConfig {
                gas_limit: args.gas_limit,
                receipt_timeout: args.receipt_timeout,
                tier_fees,
            },
            log: LogConfig::from(cli.logging),
            metrics: MetricsConfig::from(cli.metrics),
        })
    }
}

impl TryFrom<Cli> for ProverConfig {
    type Error = ConfigError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        Self::from_cli(cli)
    }
}

/// Validate that a URL has a scheme and host.
pub fn validate_url(url: &Url, field: &'static str) -> Result<(), ConfigError> {
    if url.scheme().is_empty() {
        return Err(ConfigError::InvalidUrl { field, reason: "missing scheme".to_string() });
    }

    if url.host().is_none() {
        return Err(ConfigError::InvalidUrl { field, reason: "missing host".to_string() });
    }

    Ok(())
}

/// Validate and build [`SigningConfig`] from raw arguments.
///
/// Exactly one of `private_key` or (`signer_endpoint` + `signer_address`) must be provided.
pub fn build_signing_config(
    private_key: Option<&str>,
    signer_endpoint: Option<&Url>,
    signer_address: Option<&Address>,
) -> Result<SigningConfig, ConfigError> {
    match (private_key, signer_endpoint, signer_address) {
        (Some(pk), None, None) => {
            let hex_str = pk.strip_prefix("0x").unwrap_or(pk);
            let key_bytes = hex::decode(hex_str)
                .map_err(|e| ConfigError::Signing(format!("invalid private key hex: {e}")))?;
            let signing_key = SigningKey::from_slice(&key_bytes)
                .map_err(|e| ConfigError::Signing(format!("invalid private key: {e}")))?;
            Ok(SigningConfig::Local { signer: PrivateKeySigner::from_signing_key(signing_key) })
        }
        (None, Some(endpoint), Some(address)) => {
            validate_url(endpoint, "signer-endpoint")?;
            Ok(SigningConfig::Remote { endpoint: endpoint.clone(), address: *address })
        }
        (None, None, None) => Err(ConfigError::Signing(
            "one of --private-key or (--signer-endpoint + --signer-address) must be provided"
                .to_string(),
        )),
        (Some(_), Some(_), _) | (Some(_), _, Some(_)) => Err(ConfigError::Signing(
            "--private-key is mutually exclusive with --signer-endpoint/--signer-address"
                .to_string(),
        )),
        (None, Some(_), None) => {
            Err(ConfigError::Signing("--signer-endpoint requires --signer-address".to_string()))
        }
        (None, None, Some(_)) => {
            Err(ConfigError::Signing("--signer-address requires --signer-endpoint".to_string()))
        }
    }
}
