//! CLI commands for the sentiment pipeline.

pub mod backtest;
pub mod demo_data;
pub mod run;
pub mod schedule;
pub mod serve;
pub mod train;
pub mod walk_forward;

pub use backtest::{run_backtest, BacktestArgs};
pub use demo_data::{run_demo_data, DemoDataArgs};
pub use run::{run_pipeline, RunArgs};
pub use schedule::{run_schedule, ScheduleArgs};
pub use serve::{run_serve, ServeArgs};
pub use train::{run_train, TrainArgs};
pub use walk_forward::{run_walk_forward, WalkForwardArgs};
