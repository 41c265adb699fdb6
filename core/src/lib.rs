//! RFM-A patient scoring and segmentation.
//!
//! Recency, frequency, monetary and adherence metrics are binned into
//! ordinal scores, combined into a weighted composite, and classified into
//! segments by an ordered rule list. See engine.rs for the stage order.

pub mod aggregator;
pub mod binning;
pub mod config;
pub mod engine;
pub mod error;
pub mod record;
pub mod scorer;
pub mod segmenter;
pub mod store;
pub mod types;

pub use config::RfmaConfig;
pub use engine::{AnalysisResult, RfmaEngine};
pub use error::{RfmaError, RfmaResult, Stage};
pub use segmenter::Segment;
pub use store::{FlatFileStore, PatientTables};
