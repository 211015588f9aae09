pub mod article;
pub mod bar;
pub mod price;
pub mod sentiment;
pub mod training;

pub use article::{content_id, Article};
pub use bar::SentimentBar;
pub use price::PriceObservation;
pub use sentiment::{ScoredMention, SentimentScore};
pub use training::TrainingRow;
