//! Metric names and startup recording.

/// Gauge: prover build info, labelled with `version`.
pub const INFO: &str = "taiko_prover_info";

/// Gauge: prover is running (set to 1 at startup).
pub const UP: &str = "taiko_prover_up";

/// Counter: proofs requested from the producer.
pub const PROOFS_REQUESTED_TOTAL: &str = "taiko_prover_proofs_requested_total";

/// Counter: proofs delivered to the submission channel.
pub const PROOFS_RECEIVED_TOTAL: &str = "taiko_prover_proofs_received_total";

/// Counter: proof transactions confirmed on L1.
pub const PROOFS_SUBMITTED_TOTAL: &str = "taiko_prover_proofs_submitted_total";

/// Counter: proof requests that failed, labelled with `stage`.
pub const PROOFS_FAILED_TOTAL: &str = "taiko_prover_proofs_failed_total";

/// Counter: contest transactions confirmed on L1.
pub const CONTESTS_SUBMITTED_TOTAL: &str = "taiko_prover_contests_submitted_total";

/// Counter: proof or contest transactions that failed to send.
pub const SUBMISSION_ERRORS_TOTAL: &str = "taiko_prover_submission_errors_total";

/// Gauge: highest block id this prover has submitted a proof for.
pub const LATEST_PROVEN_BLOCK_ID: &str = "taiko_prover_latest_proven_block_id";

/// Gauge: number of proofs waiting in the delivery channel.
pub const PROOF_CHANNEL_DEPTH: &str = "taiko_prover_proof_channel_depth";

/// Label key for version.
pub const LABEL_VERSION: &str = "version";

/// Label key for the pipeline stage that failed.
pub const LABEL_STAGE: &str = "stage";

/// Records startup metrics (INFO gauge with version label, UP gauge set to 1).
pub fn record_startup_metrics(version: &str) {
    metrics::gauge!(INFO, LABEL_VERSION => version.to_string()).set(1.0);
    metrics::gauge!(UP).set(1.0);
}
