//! Contract error decoding and classification.

use alloy_primitives::hex;
use alloy_sol_types::{SolError, decode_revert_reason};
use alloy_transport::TransportError;
use thiserror::Error;

use super::taiko_l1::ITaikoL1;
use crate::constants::RESERVED_ERROR_PREFIX;

/// Selectors of the custom errors `TaikoL1` can revert with.
const TAIKO_L1_ERRORS: &[([u8; 4], &str)] = &[
    (ITaikoL1::L1_ALREADY_CONTESTED::SELECTOR, "L1_ALREADY_CONTESTED"),
    (ITaikoL1::L1_ALREADY_PROVED::SELECTOR, "L1_ALREADY_PROVED"),
    (ITaikoL1::L1_BLOB_NOT_AVAILABLE::SELECTOR, "L1_BLOB_NOT_AVAILABLE"),
    (ITaikoL1::L1_BLOB_NOT_FOUND::SELECTOR, "L1_BLOB_NOT_FOUND"),
    (ITaikoL1::L1_BLOCK_MISMATCH::SELECTOR, "L1_BLOCK_MISMATCH"),
    (ITaikoL1::L1_INVALID_BLOCK_ID::SELECTOR, "L1_INVALID_BLOCK_ID"),
    (ITaikoL1::L1_INVALID_PARAM::SELECTOR, "L1_INVALID_PARAM"),
    (ITaikoL1::L1_INVALID_PAUSE_STATUS::SELECTOR, "L1_INVALID_PAUSE_STATUS"),
    (ITaikoL1::L1_INVALID_TIER::SELECTOR, "L1_INVALID_TIER"),
    (ITaikoL1::L1_INVALID_TRANSITION::SELECTOR, "L1_INVALID_TRANSITION"),
    (ITaikoL1::L1_NOT_ASSIGNED_PROVER::SELECTOR, "L1_NOT_ASSIGNED_PROVER"),
    (ITaikoL1::L1_TRANSITION_ID_ZERO::SELECTOR, "L1_TRANSITION_ID_ZERO"),
    (ITaikoL1::L1_TRANSITION_NOT_FOUND::SELECTOR, "L1_TRANSITION_NOT_FOUND"),
    (ITaikoL1::L1_UNEXPECTED_PARENT::SELECTOR, "L1_UNEXPECTED_PARENT"),
    (ITaikoL1::L1_UNEXPECTED_TRANSITION_ID::SELECTOR, "L1_UNEXPECTED_TRANSITION_ID"),
    (ITaikoL1::L1_UNEXPECTED_TRANSITION_TIER::SELECTOR, "L1_UNEXPECTED_TRANSITION_TIER"),
];

/// Error returned by a contract read or write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    /// The contract reverted with one of its custom errors.
    #[error("{name}")]
    Custom {
        /// Name of the custom error.
        name: &'static str,
    },

    /// The contract reverted with data that is not a known custom error.
    #[error("execution reverted: {0}")]
    Revert(String),

    /// The call failed before reaching the contract.
    #[error("contract call failed: {0}")]
    Call(String),

    /// A log or return value could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}

impl ContractError {
    /// Decodes revert data into a custom error when the selector is known.
    pub fn from_revert_data(data: &[u8]) -> Self {
        if let Some(selector) = data.get(..4)
            && let Some((_, name)) = TAIKO_L1_ERRORS.iter().find(|(s, _)| s == selector)
        {
            return Self::Custom { name: *name };
        }

        Self::Revert(decode_revert_reason(data).unwrap_or_else(|| hex::encode_prefixed(data)))
    }

    /// Extracts and decodes revert data from a transport error, if it carries any.
    pub fn from_transport(err: &TransportError) -> Self {
        match err.as_error_resp() {
            Some(payload) => match payload.as_revert_data() {
                Some(data) => Self::from_revert_data(&data),
                None if payload.message.contains("revert") => {
                    Self::Revert(payload.message.to_string())
                }
                None => Self::Call(payload.message.to_string()),
            },
            None => Self::Call(err.to_string()),
        }
    }

    /// Converts an error raised by a sol-generated contract call.
    pub fn from_call(err: &alloy_contract::Error) -> Self {
        match err {
            alloy_contract::Error::TransportError(e) => Self::from_transport(e),
            other => Self::Decode(other.to_string()),
        }
    }

    /// Returns the custom error name, if the revert was decoded into one.
    pub const fn custom_name(&self) -> Option<&'static str> {
        match self {
            Self::Custom { name } => Some(*name),
            _ => None,
        }
    }
}

/// How a contract error should be treated by best-effort checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// A contract-level rejection in the reserved `L1_` namespace.
    Recognized,
    /// Anything else, such as RPC noise or an undecodable revert.
    Transient,
}

/// Classifies a contract error by the reserved custom error namespace.
///
/// Nodes and proxies do not always tag rejections as reverts, so any error whose message
/// names an `L1_` error is recognized, whatever variant it was parsed into.
pub fn classify(err: &ContractError) -> ErrorClass {
    match err {
        ContractError::Custom { .. } => ErrorClass::Recognized,
        other if other.to_string().contains(RESERVED_ERROR_PREFIX) => ErrorClass::Recognized,
        _ => ErrorClass::Transient,
    }
}
