//! Constants used throughout the prover.

use std::time::Duration;

// ============================================================================
// Proof Tiers
// ============================================================================

/// Tier ID of optimistic proofs.
pub const TIER_OPTIMISTIC: u16 = 100;

/// Tier ID of SGX-attested proofs.
pub const TIER_SGX: u16 = 200;

/// Tier ID of guardian proofs.
///
/// Guardian submissions are sent once at estimated fees and never go through the
/// tier fee bump policy.
pub const TIER_GUARDIAN: u16 = 1000;

/// Prefix shared by every custom error the `TaikoL1` contract defines.
pub const RESERVED_ERROR_PREFIX: &str = "L1_";

// ============================================================================
// Beacon / Blob Constants
// ============================================================================

/// Offset between a block's `l1Height` and the beacon slot serving its blob sidecars.
pub const BLOB_SLOT_OFFSET: u64 = 1;

/// Number of times a missing blob sidecar is re-fetched before a proof request fails.
pub const BLOB_FETCH_MAX_RETRIES: usize = 10;

// ============================================================================
// Pipeline Defaults
// ============================================================================

/// Default capacity of the proof delivery channel.
pub const DEFAULT_PROOF_BUFFER_SIZE: usize = 1024;

/// Default poll interval for new L1 events and for waiting on L2 headers.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(12);

/// Default timeout for a single proof request, including waiting for the L2 block.
pub const DEFAULT_PROOF_REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// Maximum number of L1 blocks scanned per event query.
pub const MAX_EVENT_RANGE: u64 = 1000;

/// Number of proposed blocks whose metadata the driver remembers for contests.
pub const PROPOSAL_CACHE_SIZE: usize = 8192;

/// Length of the dummy proof returned by the optimistic producer.
pub const OPTIMISTIC_PROOF_LENGTH: usize = 100;

// ============================================================================
// Retry Configuration Constants
// ============================================================================

/// Default maximum number of retry attempts for RPC operations.
pub const DEFAULT_RPC_MAX_RETRIES: u32 = 5;

/// Default initial delay for exponential backoff.
pub const DEFAULT_RETRY_INITIAL_DELAY: Duration = Duration::from_millis(100);

/// Default maximum delay between retry attempts.
pub const DEFAULT_RETRY_MAX_DELAY: Duration = Duration::from_secs(10);

// ============================================================================
// Transaction Submission Constants
// ============================================================================

/// Gas limit multiplier numerator (120% = 6/5).
pub const GAS_LIMIT_MULTIPLIER_NUMERATOR: u64 = 6;

/// Gas limit multiplier denominator (120% = 6/5).
pub const GAS_LIMIT_MULTIPLIER_DENOMINATOR: u64 = 5;

/// Default time to wait for a receipt before bumping fees.
pub const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default percentage added to the fees on each bump.
pub const DEFAULT_PRICE_BUMP_PERCENT: u64 = 10;

/// Default maximum number of fee bumps for a standard tier submission.
pub const DEFAULT_MAX_PRICE_BUMPS: u32 = 3;
