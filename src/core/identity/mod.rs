//! Identity derivation: multi-finger aggregation and DID generation.

pub mod aggregator;
pub mod did;

pub use aggregator::{aggregate, AggregationPolicy, EnrolledFinger, LadderRung};
pub use did::{generate_did, Did, Network};
