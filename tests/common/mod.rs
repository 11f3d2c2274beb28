// tests/common/mod.rs
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use bioanchor::blockchain::index::{LabeledMetadata, LedgerError, LedgerIndex, MetadataLabel};
use bioanchor::blockchain::metadata::MetadataRecord;
use bioanchor::core::biometric::types::{FingerPosition, FingerTemplate, Minutia};
use bioanchor::core::services::{EnrollmentService, VerificationService};
use bioanchor::storage::MemoryStore;
use bioanchor::utils::config::Config;

/// In-memory stand-in for the external ledger indexer: transactions are
/// appended, then served back label-filtered and paginated.
#[derive(Default)]
pub struct FakeLedgerIndex {
    transactions: RwLock<Vec<(u64, LabeledMetadata)>>,
}

impl FakeLedgerIndex {
    pub fn submit(&self, label: u64, record: &MetadataRecord) {
        let mut transactions = self.transactions.write();
        let entry = LabeledMetadata {
            tx_hash: format!("tx-{:04}", transactions.len()),
            block_time: Some(chrono::Utc::now()),
            payload: serde_json::to_value(record).expect("record serializes"),
        };
        transactions.push((label, entry));
    }

    pub fn submit_raw(&self, label: u64, payload: serde_json::Value) {
        let mut transactions = self.transactions.write();
        let entry = LabeledMetadata {
            tx_hash: format!("tx-{:04}", transactions.len()),
            block_time: None,
            payload,
        };
        transactions.push((label, entry));
    }
}

#[async_trait]
impl LedgerIndex for FakeLedgerIndex {
    async fn metadata_page(
        &self,
        label: MetadataLabel,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<LabeledMetadata>, LedgerError> {
        let transactions = self.transactions.read();
        Ok(transactions
            .iter()
            .filter(|(l, _)| *l == label.0)
            .skip((page * page_size) as usize)
            .take(page_size as usize)
            .map(|(_, entry)| entry.clone())
            .collect())
    }
}

pub struct TestContext {
    pub config: Config,
    pub ledger: Arc<FakeLedgerIndex>,
    pub store: Arc<MemoryStore>,
    pub enrollment: EnrollmentService,
    pub verification: VerificationService,
}

impl TestContext {
    pub fn new() -> Self {
        let config = test_config();
        let ledger = Arc::new(FakeLedgerIndex::default());
        let store = Arc::new(MemoryStore::new());

        let enrollment = EnrollmentService::new(
            config.clone(),
            ledger.clone(),
            store.clone(),
        )
        .expect("enrollment service");
        let verification =
            VerificationService::new(config.clone(), store.clone()).expect("verification service");

        Self {
            config,
            ledger,
            store,
            enrollment,
            verification,
        }
    }
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.detector.backoff_base_ms = 1;
    config.detector.backoff_cap_ms = 4;
    config
}

/// Deterministic pseudo-random four-finger capture set for one person.
/// The same seed always yields the same minutiae.
pub fn person_captures(seed: u64) -> Vec<FingerTemplate> {
    let positions = [
        FingerPosition::RightThumb,
        FingerPosition::RightIndex,
        FingerPosition::RightMiddle,
        FingerPosition::RightRing,
    ];
    let mut rng = StdRng::seed_from_u64(seed);

    positions
        .iter()
        .map(|&position| {
            let minutiae: Vec<Minutia> = (0..20)
                .map(|_| {
                    Minutia::new(
                        rng.gen_range(0.0..512.0),
                        rng.gen_range(0.0..512.0),
                        rng.gen_range(0.0..std::f32::consts::TAU),
                    )
                })
                .collect();
            FingerTemplate::new(position, minutiae, 80.0)
        })
        .collect()
}

/// Simulates re-capture noise: small positional and angular jitter that
/// stays well inside the quantizer's tolerance for most minutiae.
pub fn recapture(captures: &[FingerTemplate], seed: u64) -> Vec<FingerTemplate> {
    let mut rng = StdRng::seed_from_u64(seed);
    captures
        .iter()
        .map(|capture| {
            let minutiae = capture
                .minutiae
                .iter()
                .map(|m| {
                    Minutia::new(
                        m.x + rng.gen_range(-1.0..1.0),
                        m.y + rng.gen_range(-1.0..1.0),
                        m.angle + rng.gen_range(-0.02..0.02),
                    )
                })
                .collect();
            FingerTemplate::new(capture.position, minutiae, capture.quality)
        })
        .collect()
}
