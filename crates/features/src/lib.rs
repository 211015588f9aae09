//! Feature construction: bucket aggregation and forward-return labeling.

pub mod aggregate;
pub mod label;

pub use aggregate::BucketAggregator;
pub use label::Labeler;
