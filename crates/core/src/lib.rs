pub mod config;
pub mod config_loader;
pub mod error;
pub mod signal;
pub mod stats;
pub mod window;

pub use config::{
    AggregationConfig, AliasEntry, AlertsConfig, AppConfig, DatabaseConfig, IngestConfig,
    ModelConfig, PriceConfig, SchedulerConfig, SentimentConfig, ServerConfig, SignalConfig,
    StorageConfig, WalkForwardSettings,
};
pub use config_loader::ConfigLoader;
pub use error::{PipelineError, Result};
pub use signal::Decision;
pub use window::BucketWindow;
