//! Ledger-facing components: the read-only metadata index boundary,
//! duplicate detection, and on-chain record assembly.

pub mod duplicate;
pub mod index;
pub mod metadata;

pub use duplicate::{DetectorConfig, DuplicateDetector};
pub use index::{LabeledMetadata, LedgerError, LedgerIndex, MetadataLabel, ENROLLMENT_LABEL};
pub use metadata::{
    normalize, EnrollmentRecord, HelperLocation, MetadataRecord, RecordBuilder, SchemaVersion,
};
