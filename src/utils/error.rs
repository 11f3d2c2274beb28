// src/utils/error.rs
use thiserror::Error;

use crate::blockchain::metadata::EnrollmentRecord;
use crate::core::biometric::types::FingerPosition;
use crate::storage::backend::StorageError;

/// Reason a fuzzy-extractor reproduction was rejected.
///
/// Carries no biometric material, only the failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionFailure {
    /// The noisy template differs from the enrolled one by more bit errors
    /// than the code can correct.
    TooManyErrors,
    /// Decoding converged, but the helper auth tag did not match the
    /// re-derived key. Wrong finger or corrupted helper data.
    TagMismatch,
    /// The helper data carries a format version this build does not read.
    UnsupportedVersion(u16),
    /// The helper data was produced under different quantization or
    /// error-correction parameters than the reproducing extractor's.
    ParameterMismatch,
}

impl std::fmt::Display for ExtractionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooManyErrors => write!(f, "bit errors exceed correction capacity"),
            Self::TagMismatch => write!(f, "authentication tag mismatch"),
            Self::UnsupportedVersion(v) => write!(f, "unsupported helper data version {}", v),
            Self::ParameterMismatch => write!(f, "helper data parameter mismatch"),
        }
    }
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Insufficient minutiae: {found} found, {required} required")]
    InsufficientMinutiae { found: usize, required: usize },

    #[error("Malformed template: {0}")]
    MalformedTemplate(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Insufficient fingers: {provided} provided, no fallback rung satisfied")]
    InsufficientFingers { provided: usize },

    #[error("Duplicate finger position: {0}")]
    DuplicateFinger(FingerPosition),

    #[error("Fuzzy extraction failed: {0}")]
    ExtractionFailed(ExtractionFailure),

    #[error("Invalid DID: {0}")]
    InvalidDid(String),

    #[error("DID already registered")]
    DidAlreadyExists(Box<EnrollmentRecord>),

    #[error("Duplicate check unavailable after {attempts} attempts")]
    DuplicateCheckUnavailable { attempts: u32 },

    #[error("Duplicate check timed out")]
    DuplicateCheckTimeout,

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl IdentityError {
    /// Whether the caller may reasonably retry the failed operation.
    ///
    /// Only availability failures qualify; validation and cryptographic
    /// failures are fatal for the given input.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            IdentityError::DuplicateCheckUnavailable { .. }
                | IdentityError::DuplicateCheckTimeout
                | IdentityError::Ledger(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, IdentityError>;
