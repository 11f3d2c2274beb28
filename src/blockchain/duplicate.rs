// src/blockchain/duplicate.rs
//! Pre-enrollment duplicate detection against the ledger.
//!
//! Scans the registered metadata label page by page and pattern-matches
//! the embedded DID. Read-only and idempotent: concurrent checks never
//! interfere, and dropping the future mid-pagination leaves no state
//! behind. The ledger itself, not this scan, remains the final arbiter
//! of uniqueness when two enrollments race.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::index::{LedgerIndex, MetadataLabel, ENROLLMENT_LABEL};
use super::metadata::{normalize, EnrollmentRecord, MetadataRecord};
use crate::core::identity::did::Did;
use crate::utils::error::{IdentityError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Metadata label the scan is bounded to.
    pub label: u64,
    /// Hard page bound; the index is not queryable by DID, so the scan
    /// must stop somewhere.
    pub max_pages: u32,
    pub page_size: u32,
    /// Attempts per page fetch before giving up.
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_cap_ms: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            label: ENROLLMENT_LABEL.0,
            max_pages: 10,
            page_size: 100,
            max_attempts: 3,
            backoff_base_ms: 250,
            backoff_cap_ms: 5_000,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_pages == 0 || self.page_size == 0 || self.max_attempts == 0 {
            return Err(IdentityError::InvalidParameters(
                "detector bounds must be non-zero".into(),
            ));
        }
        Ok(())
    }

    fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    fn backoff_cap(&self) -> Duration {
        Duration::from_millis(self.backoff_cap_ms)
    }
}

pub struct DuplicateDetector {
    index: Arc<dyn LedgerIndex>,
    config: DetectorConfig,
}

impl DuplicateDetector {
    pub fn new(index: Arc<dyn LedgerIndex>, config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { index, config })
    }

    /// Looks for an existing registration of `did` under the enrollment
    /// label. Returns the first matching record, or `None` once the scan
    /// is exhausted or the page bound is reached.
    pub async fn check_exists(&self, did: &Did) -> Result<Option<EnrollmentRecord>> {
        let label = MetadataLabel(self.config.label);

        for page in 0..self.config.max_pages {
            let entries = self.fetch_page(label, page).await?;
            let exhausted = (entries.len() as u32) < self.config.page_size;

            for entry in &entries {
                let record: MetadataRecord = match serde_json::from_value(entry.payload.clone()) {
                    Ok(record) => record,
                    Err(_) => {
                        // The label namespace is shared; foreign payloads
                        // are expected, not an error.
                        debug!(tx = %entry.tx_hash, "skipping unreadable metadata payload");
                        continue;
                    }
                };
                if record.did() == did {
                    info!(tx = %entry.tx_hash, page, "found existing enrollment");
                    return Ok(Some(normalize(record)));
                }
            }

            if exhausted {
                return Ok(None);
            }
        }

        warn!(
            max_pages = self.config.max_pages,
            "page bound reached without exhausting the index"
        );
        Ok(None)
    }

    /// `check_exists` under a caller-supplied deadline. Cancellation is
    /// the usual one: drop the future.
    pub async fn check_exists_with_timeout(
        &self,
        did: &Did,
        deadline: Duration,
    ) -> Result<Option<EnrollmentRecord>> {
        tokio::time::timeout(deadline, self.check_exists(did))
            .await
            .map_err(|_| IdentityError::DuplicateCheckTimeout)?
    }

    /// Enrollment-path wrapper: a hit becomes `DidAlreadyExists` carrying
    /// the existing record, so callers can offer adding the new wallet as
    /// a controller instead of failing outright.
    pub async fn ensure_absent(&self, did: &Did) -> Result<()> {
        match self.check_exists(did).await? {
            Some(record) => Err(IdentityError::DidAlreadyExists(Box::new(record))),
            None => Ok(()),
        }
    }

    async fn fetch_page(
        &self,
        label: MetadataLabel,
        page: u32,
    ) -> Result<Vec<super::index::LabeledMetadata>> {
        let mut delay = self.config.backoff_base();

        for attempt in 1..=self.config.max_attempts {
            match self
                .index
                .metadata_page(label, page, self.config.page_size)
                .await
            {
                Ok(entries) => return Ok(entries),
                Err(e) if e.is_transient() => {
                    if attempt == self.config.max_attempts {
                        warn!(page, attempts = attempt, "duplicate check gave up: {}", e);
                        return Err(IdentityError::DuplicateCheckUnavailable {
                            attempts: attempt,
                        });
                    }
                    debug!(page, attempt, "transient index failure, backing off: {}", e);
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(self.config.backoff_cap());
                }
                Err(e) => return Err(IdentityError::Ledger(e.to_string())),
            }
        }
        unreachable!("retry loop returns on the final attempt")
    }
}
