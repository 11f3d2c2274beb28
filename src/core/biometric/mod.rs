//! Capture-side data model and the feature quantizer.

pub mod quantizer;
pub mod types;

pub use quantizer::{quantize, QuantizerParams};
pub use types::{FingerPosition, FingerTemplate, Minutia, QuantizedTemplate};
