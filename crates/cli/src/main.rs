use clap::{Parser, Subcommand};

mod commands;

use commands::{
    BacktestArgs, DemoDataArgs, RunArgs, ScheduleArgs, ServeArgs, TrainArgs, WalkForwardArgs,
};

#[derive(Parser)]
#[command(name = "sentibar")]
#[command(about = "News sentiment trading signal pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline from stored articles to a backtest report
    Run(RunArgs),
    /// Evaluate the saved model over a labeled training set
    Backtest(BacktestArgs),
    /// Walk-forward evaluation with periodic retrains
    WalkForward(WalkForwardArgs),
    /// Start the REST API server
    Serve(ServeArgs),
    /// Run the recurring jobs on their cron schedules
    Schedule(ScheduleArgs),
    /// Generate deterministic demo articles and prices
    DemoData(DemoDataArgs),
    /// Train the probability model and save the artifact
    Train(TrainArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Run(args) => commands::run_pipeline(args).await?,
        Commands::Backtest(args) => commands::run_backtest(args).await?,
        Commands::WalkForward(args) => commands::run_walk_forward(args).await?,
        Commands::Serve(args) => commands::run_serve(args).await?,
        Commands::Schedule(args) => commands::run_schedule(args).await?,
        Commands::DemoData(args) => commands::run_demo_data(args).await?,
        Commands::Train(args) => commands::run_train(args).await?,
    }

    Ok(())
}
