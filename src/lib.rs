//! Biometric template-protection and deterministic-identity core.
//!
//! Derives a stable, privacy-preserving decentralized identifier from a
//! person's fingerprint captures and guards it against duplicate
//! registration on a public ledger. The pipeline:
//!
//! raw minutiae → [`crate::core::biometric::quantize`] → per-finger
//! [`crate::core::crypto::FuzzyExtractor`] →
//! [`crate::core::identity::aggregate`] →
//! [`crate::core::identity::generate_did`] →
//! [`crate::blockchain::RecordBuilder`] → external ledger submission,
//! gated by [`crate::blockchain::DuplicateDetector`].
//!
//! The crypto core is pure and synchronous; only the duplicate detector
//! and the helper-data storage boundary are asynchronous. All
//! configuration travels through [`utils::config::Config`]; there is no
//! global state anywhere.

pub mod blockchain;
pub mod core;
pub mod storage;
pub mod utils;

pub use crate::blockchain::{DuplicateDetector, EnrollmentRecord, LedgerIndex, RecordBuilder};
pub use crate::core::biometric::{FingerPosition, FingerTemplate, Minutia};
pub use crate::core::crypto::{FuzzyExtractor, HelperData};
pub use crate::core::identity::{generate_did, Did, Network};
pub use crate::core::services::{EnrollmentService, VerificationService};
pub use crate::utils::config::Config;
pub use crate::utils::error::{IdentityError, Result};
