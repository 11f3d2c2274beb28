// src/core/services/enrollment.rs
use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    blockchain::{
        duplicate::DuplicateDetector,
        index::LedgerIndex,
        metadata::{EnrollmentRecord, HelperLocation, MetadataRecord, RecordBuilder},
    },
    core::{
        biometric::{quantizer::quantize, types::FingerTemplate},
        crypto::extractor::{FuzzyExtractor, HelperData},
        identity::{
            aggregator::{aggregate, EnrolledFinger},
            did::generate_did,
        },
    },
    storage::backend::HelperStore,
    utils::{
        config::Config,
        error::{IdentityError, Result},
    },
};

/// Everything the external submission collaborator needs: the canonical
/// record for local bookkeeping and the wire payload to attach on-chain.
#[derive(Debug, Clone)]
pub struct EnrollmentOutcome {
    pub record: EnrollmentRecord,
    pub metadata: MetadataRecord,
}

/// Drives the full enrollment pipeline: quantize each finger, derive
/// per-finger keys and helper data, aggregate, mint the DID, check the
/// ledger for an existing registration, and assemble the record.
///
/// Holds no mutable state; safe to share behind an `Arc` across
/// concurrent enrollments.
pub struct EnrollmentService {
    config: Config,
    extractor: FuzzyExtractor,
    detector: DuplicateDetector,
    helper_store: Arc<dyn HelperStore>,
}

impl EnrollmentService {
    pub fn new(
        config: Config,
        index: Arc<dyn LedgerIndex>,
        helper_store: Arc<dyn HelperStore>,
    ) -> Result<Self> {
        config.validate()?;
        let extractor =
            FuzzyExtractor::new(config.quantizer.clone(), config.extractor.error_capacity)?;
        let detector = DuplicateDetector::new(index, config.detector.clone())?;

        Ok(Self {
            config,
            extractor,
            detector,
            helper_store,
        })
    }

    /// Enrolls one person from their finger captures, controlled by
    /// `wallet`.
    ///
    /// Fails with `DidAlreadyExists` (carrying the existing record) when
    /// the identifier is already registered, so the caller can offer
    /// adding `wallet` as a controller instead. A duplicate-check outage
    /// blocks enrollment; callers wanting to proceed with a warning can
    /// run the detector themselves and decide.
    pub async fn enroll(
        &self,
        captures: &[FingerTemplate],
        wallet: &str,
    ) -> Result<EnrollmentOutcome> {
        if wallet.is_empty() {
            return Err(IdentityError::InvalidParameters(
                "controller wallet must be non-empty".into(),
            ));
        }
        info!(fingers = captures.len(), "starting enrollment");

        let mut fingers = Vec::with_capacity(captures.len());
        let mut helpers = Vec::with_capacity(captures.len());
        for capture in captures {
            let quantized = quantize(capture, &self.config.quantizer)?;
            let (key, helper) = self.extractor.generate(&quantized)?;
            fingers.push(EnrolledFinger {
                position: capture.position,
                key,
                quality: capture.quality,
            });
            helpers.push((capture.position, helper));
        }

        let commitment = aggregate(&fingers, &self.config.aggregation)?;
        let did = generate_did(&commitment, self.config.network);

        self.detector.ensure_absent(&did).await.map_err(|e| {
            if let IdentityError::DidAlreadyExists(ref record) = e {
                warn!(did = %record.did, "enrollment matches an existing registration");
            }
            e
        })?;

        let mut builder = RecordBuilder::new(did).controller(wallet);
        for (position, helper) in helpers {
            builder = builder.helper(position, self.place_helper(&helper).await?);
        }
        let (record, metadata) = builder.build()?;

        info!(did = %record.did, "enrollment record assembled");
        Ok(EnrollmentOutcome { record, metadata })
    }

    /// Small payloads ride inline in the record; larger ones go through
    /// the configured backend and are referenced by URI.
    async fn place_helper(&self, helper: &HelperData) -> Result<HelperLocation> {
        let encoded = serde_json::to_vec(helper)
            .map_err(|e| IdentityError::Metadata(e.to_string()))?;
        if encoded.len() <= self.config.storage.inline_max_bytes {
            Ok(HelperLocation::Inline(helper.clone()))
        } else {
            let reference = self.helper_store.store(helper).await?;
            Ok(HelperLocation::External(reference.uri()))
        }
    }
}
