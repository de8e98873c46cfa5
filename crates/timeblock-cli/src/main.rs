use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "timeblock", version, about = "Zone-aware task time-blocking")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch and validate tasks and events without changing anything
    Sync(commands::run::RunArgs),
    /// Remove every managed event in the horizon
    Clean(commands::run::RunArgs),
    /// Place tasks around the current calendar
    Schedule(commands::run::RunArgs),
    /// Clean, then schedule from scratch
    Reschedule(commands::run::RunArgs),
    /// Task management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Calendar event management
    Event {
        #[command(subcommand)]
        action: commands::event::EventAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("TIMEBLOCK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Sync(args) => commands::run::run(commands::run::Op::Sync, args),
        Commands::Clean(args) => commands::run::run(commands::run::Op::Clean, args),
        Commands::Schedule(args) => commands::run::run(commands::run::Op::Schedule, args),
        Commands::Reschedule(args) => commands::run::run(commands::run::Op::Reschedule, args),
        Commands::Task { action } => commands::task::run(action),
        Commands::Event { action } => commands::event::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
