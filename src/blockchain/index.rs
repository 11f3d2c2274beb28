// src/blockchain/index.rs
//! Read-only boundary to the ledger's metadata index.
//!
//! The index is queryable by registered metadata label, not by DID, so
//! the duplicate detector scans paginated results and inspects each
//! transaction's attached payload. Transaction construction, signing and
//! submission are someone else's job entirely.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Registered transaction-metadata label under which enrollment records
/// are attached on-chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetadataLabel(pub u64);

/// Default label for enrollment records.
pub const ENROLLMENT_LABEL: MetadataLabel = MetadataLabel(7341);

/// One transaction's labeled metadata, as returned by the index.
#[derive(Debug, Clone)]
pub struct LabeledMetadata {
    pub tx_hash: String,
    pub block_time: Option<DateTime<Utc>>,
    pub payload: serde_json::Value,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Rate limited by the index")]
    RateLimited,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl LedgerError {
    /// Transient failures are worth a bounded retry; a malformed response
    /// will be malformed again.
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Transport(_) | LedgerError::RateLimited)
    }
}

/// Paginated metadata-by-label read API of an external ledger indexer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerIndex: Send + Sync {
    /// Returns one page of transactions carrying `label`, oldest first,
    /// zero-based `page`. A short or empty page means the scan is
    /// exhausted.
    async fn metadata_page(
        &self,
        label: MetadataLabel,
        page: u32,
        page_size: u32,
    ) -> std::result::Result<Vec<LabeledMetadata>, LedgerError>;
}
