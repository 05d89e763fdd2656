//! CLI argument definitions for the prover.

use std::{net::IpAddr, time::Duration};

use alloy_primitives::Address;
use clap::{ArgAction, Parser};
use url::Url;

use crate::logging::LogFormat;

/// Prover - proves and contests blocks of a Taiko-based rollup on its L1 settlement contract.
#[derive(Debug, Clone, Parser)]
#[command(name = "prover")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Prover configuration arguments.
    #[command(flatten)]
    pub prover: ProverArgs,

    /// Logging configuration arguments.
    #[command(flatten)]
    pub logging: LogArgs,

    /// Metrics configuration arguments.
    #[command(flatten)]
    pub metrics: MetricsArgs,
}

/// Core prover configuration arguments.
#[derive(Debug, Clone, Parser)]
#[command(next_help_heading = "Prover")]
pub struct ProverArgs {
    /// URL of the L1 execution RPC endpoint.
    #[arg(long = "l1-http", env = "TAIKO_PROVER_L1_HTTP", value_parser = parse_url)]
    pub l1_http: Url,

    /// URL of the L2 execution RPC endpoint.
    #[arg(long = "l2-http", env = "TAIKO_PROVER_L2_HTTP", value_parser = parse_url)]
    pub l2_http: Url,

    /// URL of the L1 beacon API, used to fetch blob sidecars.
    #[arg(long = "beacon-http", env = "TAIKO_PROVER_BEACON_HTTP", value_parser = parse_url)]
    pub beacon_http: Url,

    /// Address of the `TaikoL1` contract.
    #[arg(
        long = "taiko-l1-address",
        env = "TAIKO_PROVER_TAIKO_L1_ADDRESS",
        value_parser = parse_address
    )]
    pub taiko_l1_address: Address,

    /// Graffiti attached to submitted transitions (at most 32 bytes).
    #[arg(long = "graffiti", env = "TAIKO_PROVER_GRAFFITI", default_value = "")]
    pub graffiti: String,

    /// Capacity of the proof delivery channel.
    #[arg(
        long = "proof-buffer-size",
        env = "TAIKO_PROVER_PROOF_BUFFER_SIZE",
        default_value = "1024"
    )]
    pub proof_buffer_size: usize,

    /// Polling interval for L1 events and L2 headers (e.g., "12s", "1m").
    #[arg(
        long = "poll-interval",
        env = "TAIKO_PROVER_POLL_INTERVAL",
        default_value = "12s",
        value_parser = parse_duration
    )]
    pub poll_interval: Duration,

    /// RPC request timeout (e.g., "30s", "1m").
    #[arg(
        long = "rpc-timeout",
        env = "TAIKO_PROVER_RPC_TIMEOUT",
        default_value = "30s",
        value_parser = parse_duration
    )]
    pub rpc_timeout: Duration,

    /// Timeout of a single proof request, including waiting for the L2 block.
    #[arg(
        long = "proof-request-timeout",
        env = "TAIKO_PROVER_PROOF_REQUEST_TIMEOUT",
        default_value = "10m",
        value_parser = parse_duration
    )]
    pub proof_request_timeout: Duration,

    /// Delay before a block whose proof request or submission failed is tried again.
    #[arg(
        long = "failed-proof-retry-interval",
        env = "TAIKO_PROVER_FAILED_PROOF_RETRY_INTERVAL",
        default_value = "5m",
        value_parser = parse_duration
    )]
    pub failed_proof_retry_interval: Duration,

    /// How long to wait for a proof transaction receipt before bumping fees.
    #[arg(
        long = "receipt-timeout",
        env = "TAIKO_PROVER_RECEIPT_TIMEOUT",
        default_value = "60s",
        value_parser = parse_duration
    )]
    pub receipt_timeout: Duration,

    /// First L1 block to scan for `TaikoL1` events; defaults to the current head.
    #[arg(long = "start-height", env = "TAIKO_PROVER_START_HEIGHT")]
    pub start_height: Option<u64>,

    /// Maximum number of retry attempts for RPC operations.
    #[arg(long = "rpc-max-retries", env = "TAIKO_PROVER_RPC_MAX_RETRIES", default_value = "5")]
    pub rpc_max_retries: u32,

    /// Initial delay for exponential backoff (e.g., "100ms", "1s").
    #[arg(
        long = "rpc-retry-initial-delay",
        env = "TAIKO_PROVER_RPC_RETRY_INITIAL_DELAY",
        default_value = "100ms",
        value_parser = parse_duration
    )]
    pub rpc_retry_initial_delay: Duration,

    /// Maximum delay between retry attempts (e.g., "10s", "1m").
    #[arg(
        long = "rpc-retry-max-delay",
        env = "TAIKO_PROVER_RPC_RETRY_MAX_DELAY",
        default_value = "10s",
        value_parser = parse_duration
    )]
    pub rpc_retry_max_delay: Duration,

    /// Private key for local transaction signing (hex-encoded, for development).
    /// Mutually exclusive with --signer-endpoint/--signer-address.
    #[arg(long = "private-key", env = "TAIKO_PROVER_PRIVATE_KEY")]
    pub private_key: Option<String>,

    /// URL of the signer sidecar JSON-RPC endpoint (for production).
    /// Must be used together with --signer-address.
    #[arg(
        long = "signer-endpoint",
        env = "TAIKO_PROVER_SIGNER_ENDPOINT",
        value_parser = parse_url
    )]
    pub signer_endpoint: Option<Url>,

    /// Address of the signer account on the signer sidecar.
    /// Must be used together with --signer-endpoint.
    #[arg(
        long = "signer-address",
        env = "TAIKO_PROVER_SIGNER_ADDRESS",
        value_parser = parse_address
    )]
    pub signer_address: Option<Address>,

    /// Fixed gas limit for proof transactions; estimated when unset.
    #[arg(long = "gas-limit", env = "TAIKO_PROVER_GAS_LIMIT")]
    pub gas_limit: Option<u64>,

    /// Percentage added to the fees on every resubmission.
    #[arg(
        long = "tx.price-bump-percent",
        env = "TAIKO_PROVER_TX_PRICE_BUMP_PERCENT",
        default_value = "10"
    )]
    pub price_bump_percent: u64,

    /// Number of fee bumps before a submission is abandoned.
    #[arg(
        long = "tx.max-price-bumps",
        env = "TAIKO_PROVER_TX_MAX_PRICE_BUMPS",
        default_value = "3"
    )]
    pub max_price_bumps: u32,

    /// Run without a tier fee configuration. Only guardian proofs can then be submitted.
    #[arg(long = "disable-tier-fees", env = "TAIKO_PROVER_DISABLE_TIER_FEES")]
    pub disable_tier_fees: bool,
}

/// Logging configuration arguments.
#[derive(Debug, Clone, Parser)]
#[command(next_help_heading = "Logging")]
pub struct LogArgs {
    /// Increase logging verbosity (1=ERROR, 2=WARN, 3=INFO, 4=DEBUG, 5=TRACE).
    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        default_value = "3",
        env = "TAIKO_PROVER_LOG_LEVEL",
        global = true
    )]
    pub level: u8,

    /// Suppress stdout logging.
    #[arg(long = "quiet", short = 'q', global = true)]
    pub stdout_quiet: bool,

    /// Stdout log format.
    #[arg(
        long = "log-format",
        default_value = "full",
        env = "TAIKO_PROVER_LOG_FORMAT",
        global = true
    )]
    pub stdout_format: LogFormat,
}

/// Metrics server configuration arguments.
#[derive(Debug, Clone, Parser)]
#[command(next_help_heading = "Metrics")]
pub struct MetricsArgs {
    /// Enable metrics server.
    #[arg(
        id = "metrics_enabled",
        long = "metrics.enabled",
        env = "TAIKO_PROVER_METRICS_ENABLED",
        default_value = "false"
    )]
    pub enabled: bool,

    /// Metrics server bind address.
    #[arg(
        id = "metrics_addr",
        long = "metrics.addr",
        env = "TAIKO_PROVER_METRICS_ADDR",
        default_value = "0.0.0.0"
    )]
    pub addr: IpAddr,

    /// Metrics server port.
    #[arg(
        id = "metrics_port",
        long = "metrics.port",
        env = "TAIKO_PROVER_METRICS_PORT",
        default_value = "7300"
    )]
    pub port: u16,
}

/// Parse a duration string like "12s", "5m", "1h".
fn parse_duration(s: &str) -> Result<Duration, humantime::DurationError> {
    humantime::parse_duration(s)
}

/// Parse a URL string.
fn parse_url(s: &str) -> Result<Url, url::ParseError> {
    Url::parse(s)
}

/// Parse an Ethereum address from hex string.
fn parse_address(s: &str) -> Result<Address, alloy_primitives::hex::FromHexError> {
    s.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: [&str; 9] = [
        "prover",
        "--l1-http",
        "http://localhost:8545",
        "--l2-http",
        "http://localhost:9545",
        "--beacon-http",
        "http://localhost:5052",
        "--taiko-l1-address",
        "0x1234567890123456789012345678901234567890",
    ];

    #[test]
    fn test_parse_duration_valid() {
        assert_eq!(parse_duration("12s").unwrap(), Duration::from_secs(12));
        assert_eq!(parse_duration("10m").unwrap(), Duration::from_secs(600));
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn test_parse_url() {
        let url = parse_url("https://example.com").unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
        assert!(parse_url("not-a-url").is_err());
    }

    #[test]
    fn test_parse_address() {
        assert!(parse_address("0x1234567890123456789012345678901234567890").is_ok());
        assert!(parse_address("0xnotanaddress").is_err());
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(REQUIRED).unwrap();

        assert_eq!(cli.prover.beacon_http.as_str(), "http://localhost:5052/");
        assert_eq!(cli.prover.graffiti, "");
        assert_eq!(cli.prover.proof_buffer_size, 1024);
        assert_eq!(cli.prover.poll_interval, Duration::from_secs(12));
        assert_eq!(cli.prover.rpc_timeout, Duration::from_secs(30));
        assert_eq!(cli.prover.proof_request_timeout, Duration::from_secs(600));
        assert_eq!(cli.prover.failed_proof_retry_interval, Duration::from_secs(300));
        assert_eq!(cli.prover.receipt_timeout, Duration::from_secs(60));
        assert!(cli.prover.start_height.is_none());
        assert!(cli.prover.gas_limit.is_none());
        assert_eq!(cli.prover.price_bump_percent, 10);
        assert_eq!(cli.prover.max_price_bumps, 3);
        assert!(!cli.prover.disable_tier_fees);

        assert_eq!(cli.prover.rpc_max_retries, 5);
        assert_eq!(cli.prover.rpc_retry_initial_delay, Duration::from_millis(100));
        assert_eq!(cli.prover.rpc_retry_max_delay, Duration::from_secs(10));

        assert!(cli.prover.private_key.is_none());
        assert!(cli.prover.signer_endpoint.is_none());
        assert!(cli.prover.signer_address.is_none());

        assert_eq!(cli.logging.level, 3);
        assert_eq!(cli.logging.stdout_format, LogFormat::Full);
        assert!(!cli.logging.stdout_quiet);

        assert!(!cli.metrics.enabled);
        assert_eq!(cli.metrics.addr, "0.0.0.0".parse::<IpAddr>().unwrap());
        assert_eq!(cli.metrics.port, 7300);
    }

    #[test]
    fn test_cli_overrides() {
        let mut args = REQUIRED.to_vec();
        args.extend_from_slice(&[
            "--start-height",
            "1200",
            "--tx.price-bump-percent",
            "25",
            "--disable-tier-fees",
            "--gas-limit",
            "3000000",
        ]);
        let cli = Cli::try_parse_from(args).unwrap();

        assert_eq!(cli.prover.start_height, Some(1200));
        assert_eq!(cli.prover.price_bump_percent, 25);
        assert!(cli.prover.disable_tier_fees);
        assert_eq!(cli.prover.gas_limit, Some(3_000_000));
    }

    #[test]
    fn test_cli_missing_required() {
        assert!(Cli::try_parse_from(["prover"]).is_err());
        assert!(Cli::try_parse_from(&REQUIRED[..7]).is_err());
    }
}
