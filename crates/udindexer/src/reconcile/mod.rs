//! Reconciliation of descriptors against the content mount.

pub mod engine;
pub mod layout;
pub mod publish;
pub mod search;

pub use engine::{DescriptorObserver, JobState, ReconcileEngine, ReconciliationJob};
pub use layout::{SourceLayout, COMPLETED_DIR, PROCESSING_DIR};
pub use publish::Publisher;
pub use search::{within_tolerance, ContentSearch, SIZE_TOLERANCE_PERCENT};
