//! Full prover service lifecycle.

use std::{net::SocketAddr, sync::Arc};

use eyre::Result;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    AlloyProofSender, BlobTxListFetcher, ChainClient, ChainClientConfig, Driver, DriverConfig,
    HttpBeaconClient, OptimisticProofProducer, ProofContester, ProofProducer, ProofSender,
    ProofSubmitter, ProveBlockTxBuilder, ProverConfig, SubmitterConfig, TaikoL1ContractClient,
};

/// Runs the full prover service lifecycle.
///
/// Steps:
/// 1. Initialise logging and metrics
/// 2. Install the signal handler
/// 3. Create RPC clients (L1, L2, beacon, `TaikoL1`)
/// 4. Create the proof sender and producer
/// 5. Create the submitter and contester
/// 6. Start the driver loop
/// 7. Wait for SIGTERM or SIGINT
/// 8. Graceful shutdown
pub async fn run(config: ProverConfig) -> Result<()> {
    config.log.init_tracing_subscriber()?;

    info!(version = env!("CARGO_PKG_VERSION"), "Prover starting");

    // ── 1. Metrics recorder and HTTP server (if enabled) ─────────────────
    if config.metrics.enabled {
        let addr = SocketAddr::new(config.metrics.addr, config.metrics.port);
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .map_err(|e| eyre::eyre!("failed to install Prometheus recorder: {e}"))?;
        info!(%addr, "Metrics server started");
    }

    // Record startup metrics (no-ops if no recorder installed).
    crate::record_startup_metrics(env!("CARGO_PKG_VERSION"));

    // ── 2. Global cancellation token and signal handler ──────────────────
    let cancel = CancellationToken::new();
    crate::setup_signal_handler(cancel.clone());

    // ── 3. Create RPC clients ────────────────────────────────────────────
    let l1_config = ChainClientConfig::new(config.l1_http.clone())
        .with_timeout(config.rpc_timeout)
        .with_retry_config(config.retry.clone());
    let l1_client = Arc::new(ChainClient::new("l1", l1_config)?);
    info!(endpoint = %config.l1_http, "L1 client initialized");

    let l2_config = ChainClientConfig::new(config.l2_http.clone())
        .with_timeout(config.rpc_timeout)
        .with_retry_config(config.retry.clone());
    let l2_client = Arc::new(ChainClient::new("l2", l2_config)?);
    info!(endpoint = %config.l2_http, "L2 client initialized");

    let beacon_client = Arc::new(HttpBeaconClient::new(
        &config.beacon_http,
        config.rpc_timeout,
        config.retry.clone(),
    )?);
    info!(endpoint = %config.beacon_http, "Beacon client initialized");

    let taiko_l1 =
        Arc::new(TaikoL1ContractClient::new(config.taiko_l1_address, config.l1_http.clone()));
    info!(address = %config.taiko_l1_address, "TaikoL1 client initialized");

    // ── 4. Create proof sender and producer ──────────────────────────────
    let prover_address = config.signing.address();
    let sender: Arc<dyn ProofSender> = Arc::new(AlloyProofSender::new(
        config.l1_http.clone(),
        config.signing.clone(),
        config.sender.clone(),
        config.retry.clone(),
    )?);
    info!(%prover_address, "Proof sender initialized");

    let producer: Arc<dyn ProofProducer> = Arc::new(OptimisticProofProducer);
    info!(tier = producer.tier(), "Proof producer initialized");

    if config.sender.tier_fees.is_none() {
        warn!("Tier fees disabled, only guardian proofs can be submitted");
    }

    // ── 5. Create submitter and contester ────────────────────────────────
    let builder = ProveBlockTxBuilder::new(config.taiko_l1_address)
        .with_gas_limit(config.sender.gas_limit);
    let (submitter, proof_rx) = ProofSubmitter::new(
        SubmitterConfig {
            prover_address,
            graffiti: config.graffiti,
            poll_interval: config.poll_interval,
            producer_max_retries: config.retry.max_attempts,
            producer_retry_interval: config.retry.initial_delay,
            tier_fees: config.sender.tier_fees,
        },
        Arc::clone(&l2_client),
        Arc::clone(&taiko_l1),
        producer,
        Arc::clone(&sender),
        builder,
        config.proof_buffer_size,
    );
    let contester = ProofContester::new(
        Arc::clone(&l1_client),
        Arc::clone(&l2_client),
        Arc::clone(&taiko_l1),
        sender,
        builder,
        config.graffiti,
        config.sender.tier_fees,
        prover_address,
    );

    // ── 6. Start the driver loop ─────────────────────────────────────────
    let driver_config = DriverConfig {
        poll_interval: config.poll_interval,
        proof_request_timeout: config.proof_request_timeout,
        failed_retry_interval: config.failed_proof_retry_interval,
        start_height: config.start_height,
        prover_address,
    };
    let mut driver = Driver::new(
        driver_config,
        l1_client,
        l2_client,
        taiko_l1,
        Arc::new(submitter),
        Arc::new(contester),
        proof_rx,
        cancel.child_token(),
    )
    .with_tx_list_fetcher(Arc::new(BlobTxListFetcher::new(beacon_client)));
    let driver_handle = tokio::spawn(async move { driver.run().await });

    info!(
        poll_interval = ?config.poll_interval,
        start_height = ?config.start_height,
        proof_buffer_size = config.proof_buffer_size,
        "Service is ready"
    );

    // ── 7. Wait for shutdown signal ──────────────────────────────────────
    cancel.cancelled().await;
    info!("Shutdown signal received, stopping service...");

    // ── 8. Graceful shutdown ─────────────────────────────────────────────
    if let Err(e) = driver_handle.await {
        warn!(error = %e, "Driver task panicked");
    }

    info!("Service stopped");
    Ok(())
}
