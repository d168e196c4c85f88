//! Fragment-level text processing: noise classification and healing.

pub mod classifier;
pub mod healer;
pub mod patterns;

pub use classifier::{ClassificationVerdict, FragmentClassifier, NoiseReason};
pub use healer::{format_citations, heal};
pub use patterns::{is_all_caps, is_heading};
