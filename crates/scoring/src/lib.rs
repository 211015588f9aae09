//! Sentiment scoring and entity normalization.
//!
//! This crate provides:
//! - The [`SentimentModel`] seam plus lexicon and remote backends
//! - [`BatchScorer`], which enforces the batch scoring contract
//! - [`EntityNormalizer`], which maps articles onto configured tickers

pub mod lexicon;
pub mod normalize;
pub mod remote;
pub mod scorer;

pub use lexicon::LexiconScorer;
pub use normalize::{EntityNormalizer, TickerAliasSet};
pub use remote::RemoteScorer;
pub use scorer::{build_model, BatchScorer, SentimentModel};
