//! Collection, filtering and batching of page text

pub mod batch;
pub mod collector;
pub mod filters;

pub use batch::{BatchOrchestrator, BatchOutcome, BatchSettings};
pub use collector::{CollectionStats, CollectorConfig, Rejection, TextCollector, TextItem};
pub use filters::{FilterReason, TextFilter};
