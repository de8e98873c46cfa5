//! Planning operations over the configured store.
//!
//! Each operation prints its `RunReport` as JSON on stdout.

use chrono::{NaiveDate, Utc};
use clap::Args;
use timeblock_core::{Config, JsonFileStore, Planner, Scheduler, StrategyKind};

#[derive(Args)]
pub struct RunArgs {
    /// First day of the horizon (YYYY-MM-DD, default: today)
    #[arg(long)]
    start: Option<NaiveDate>,
    /// Horizon length in days (21-28, default from config)
    #[arg(long)]
    days: Option<u32>,
    /// Placement strategy (greedy_sequential or latest_fit)
    #[arg(long)]
    strategy: Option<StrategyKind>,
}

#[derive(Clone, Copy)]
pub enum Op {
    Sync,
    Clean,
    Schedule,
    Reschedule,
}

pub fn run(op: Op, args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let catalog = config.validate()?;
    let start = args.start.unwrap_or_else(|| Utc::now().date_naive());
    let horizon = config.horizon(start, args.days)?;
    let strategy = args.strategy.unwrap_or(config.planning.strategy);

    let path = config.store_path()?;
    let mut planner = Planner::new(
        JsonFileStore::open(&path)?,
        JsonFileStore::open(&path)?,
        Scheduler::new(catalog).with_strategy_kind(strategy),
    );
    tracing::debug!(store = %path.display(), %strategy, "opened planner");

    let report = match op {
        Op::Sync => planner.sync(&horizon)?,
        Op::Clean => planner.clean(&horizon)?,
        Op::Schedule => planner.schedule(&horizon)?,
        Op::Reschedule => planner.reschedule(&horizon)?,
    };
    if report.is_partial() {
        eprintln!(
            "{} of {} tasks could not be placed",
            report.counts.failed, report.tasks_seen
        );
    }
    if !report.already_scheduled.is_empty() {
        eprintln!(
            "already scheduled: {} (run reschedule to replace)",
            report.already_scheduled.join(", ")
        );
    }
    super::print_json(&report)
}
