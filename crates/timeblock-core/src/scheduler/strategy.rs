//! Pluggable placement strategies.
//!
//! A strategy decides which candidate window is tried first and where a
//! block sits inside the window it gets. Everything else (validation,
//! buffers, splitting) is shared by the engine.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::matcher::Window;
use crate::error::ValidationError;
use crate::event::Interval;

/// Which end of a window a block is pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Flush with the window start.
    Start,
    /// Flush with the window end.
    End,
}

impl Anchor {
    /// A block of `length` inside `window`.
    pub fn place(&self, window: &Interval, length: Duration) -> Interval {
        match self {
            Anchor::Start => Interval::span(window.start, window.start + length),
            Anchor::End => Interval::span(window.end - length, window.end),
        }
    }
}

pub trait SchedulingStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Reorder chronologically sorted windows into trial order.
    fn arrange(&self, windows: &mut Vec<Window>);

    fn anchor(&self) -> Anchor;
}

/// Earliest feasible window first, block at its start.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedySequential;

impl SchedulingStrategy for GreedySequential {
    fn name(&self) -> &'static str {
        "greedy_sequential"
    }

    fn arrange(&self, _windows: &mut Vec<Window>) {}

    fn anchor(&self) -> Anchor {
        Anchor::Start
    }
}

/// Latest feasible window first, block flush with its end. Keeps the near
/// term free at the cost of working closer to deadlines.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatestFit;

impl SchedulingStrategy for LatestFit {
    fn name(&self) -> &'static str {
        "latest_fit"
    }

    fn arrange(&self, windows: &mut Vec<Window>) {
        windows.reverse();
    }

    fn anchor(&self) -> Anchor {
        Anchor::End
    }
}

/// Strategy selector used in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    GreedySequential,
    LatestFit,
}

impl StrategyKind {
    pub fn build(&self) -> Box<dyn SchedulingStrategy> {
        match self {
            StrategyKind::GreedySequential => Box::new(GreedySequential),
            StrategyKind::LatestFit => Box::new(LatestFit),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.build().name())
    }
}

impl FromStr for StrategyKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "greedy_sequential" | "greedy" => Ok(StrategyKind::GreedySequential),
            "latest_fit" | "latest" => Ok(StrategyKind::LatestFit),
            other => Err(ValidationError::invalid(
                "strategy",
                format!("unknown strategy '{other}' (expected greedy_sequential or latest_fit)"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn window() -> Interval {
        Interval::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn anchors_pin_to_window_edges() {
        let start = Anchor::Start.place(&window(), Duration::minutes(90));
        assert_eq!(start.start, window().start);
        assert_eq!(start.duration_minutes(), 90);

        let end = Anchor::End.place(&window(), Duration::minutes(90));
        assert_eq!(end.end, window().end);
        assert_eq!(end.duration_minutes(), 90);
    }

    #[test]
    fn kind_round_trips_through_name() {
        for kind in [StrategyKind::GreedySequential, StrategyKind::LatestFit] {
            assert_eq!(kind.to_string().parse::<StrategyKind>().unwrap(), kind);
        }
        assert!("random".parse::<StrategyKind>().is_err());
    }
}
