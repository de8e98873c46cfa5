//! Zone-aware scheduler.
//!
//! This module places tasks into a multi-week planning horizon:
//! - Resolves one deterministic order over the task set
//! - Finds free windows inside eligible work zones
//! - Enforces buffers and zone interruption policies
//! - Splits tasks across windows when a single block does not fit
//! - Reports a typed outcome for every task

pub mod buffer;
pub mod conflict;
pub mod coordinator;
pub mod engine;
pub mod matcher;
pub mod sequence;
pub mod splitter;
pub mod strategy;

use serde::Serialize;
use std::fmt;

use crate::event::{Event, EventId};
use crate::task::TaskId;

pub use buffer::BufferManager;
pub use conflict::{Conflict, ConflictDetector};
pub use coordinator::{clean, CleanPlan, RescheduleCoordinator, RescheduleReport};
pub use engine::Scheduler;
pub use matcher::{Window, ZoneMatcher};
pub use splitter::{PlannedChunk, SplitDecision, SplitPlan, TaskSplitter};
pub use strategy::{Anchor, GreedySequential, LatestFit, SchedulingStrategy, StrategyKind};

/// Why a task could not be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// No free window is long enough for the task.
    NoWindow,
    /// The task is splittable but no valid chunk plan exists.
    NoFeasibleSplit,
    /// A dependency is missing or was not placed.
    DependencyUnmet,
    /// The due date lies outside the planning horizon.
    OutsideHorizon,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureReason::NoWindow => "no_window",
            FailureReason::NoFeasibleSplit => "no_feasible_split",
            FailureReason::DependencyUnmet => "dependency_unmet",
            FailureReason::OutsideHorizon => "outside_horizon",
        };
        f.write_str(name)
    }
}

/// Diagnostic attached to a failed task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulingFailure {
    pub reason: FailureReason,
    pub message: String,
    /// Events that blocked the placement.
    pub conflicting_events: Vec<EventId>,
    /// Constraints that were violated, when known.
    pub conflicts: Vec<Conflict>,
    /// Dependencies that were not placed.
    pub unmet_dependencies: Vec<TaskId>,
}

impl SchedulingFailure {
    pub fn new(reason: FailureReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
            conflicting_events: Vec::new(),
            conflicts: Vec::new(),
            unmet_dependencies: Vec::new(),
        }
    }

    pub fn with_events(self, conflicting_events: Vec<EventId>) -> Self {
        Self {
            conflicting_events,
            ..self
        }
    }

    pub fn with_conflicts(self, conflicts: Vec<Conflict>) -> Self {
        Self { conflicts, ..self }
    }

    pub fn with_unmet(self, unmet_dependencies: Vec<TaskId>) -> Self {
        Self {
            unmet_dependencies,
            ..self
        }
    }
}

impl fmt::Display for SchedulingFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.reason, self.message)
    }
}

/// Result of scheduling one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScheduleOutcome {
    /// Placed as a single block.
    Placed { events: Vec<Event> },
    /// Placed as several chunks.
    Split { events: Vec<Event>, chunk_count: u32 },
    Failed(SchedulingFailure),
}

impl ScheduleOutcome {
    pub fn events(&self) -> &[Event] {
        match self {
            ScheduleOutcome::Placed { events } | ScheduleOutcome::Split { events, .. } => events,
            ScheduleOutcome::Failed(_) => &[],
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ScheduleOutcome::Failed(_))
    }

    pub fn failure(&self) -> Option<&SchedulingFailure> {
        match self {
            ScheduleOutcome::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskReport {
    pub task_id: TaskId,
    pub outcome: ScheduleOutcome,
}

/// Outcome tallies for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub placed: usize,
    pub split: usize,
    pub failed: usize,
}

/// Per-task outcomes of one scheduling pass, in resolved order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleReport {
    pub strategy: String,
    pub outcomes: Vec<TaskReport>,
}

impl ScheduleReport {
    /// Every managed event created, in resolved task order.
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.outcomes.iter().flat_map(|r| r.outcome.events())
    }

    pub fn counts(&self) -> OutcomeCounts {
        let mut counts = OutcomeCounts::default();
        for report in &self.outcomes {
            match report.outcome {
                ScheduleOutcome::Placed { .. } => counts.placed += 1,
                ScheduleOutcome::Split { .. } => counts.split += 1,
                ScheduleOutcome::Failed(_) => counts.failed += 1,
            }
        }
        counts
    }

    /// True when at least one task failed.
    pub fn is_partial(&self) -> bool {
        self.outcomes.iter().any(|r| r.outcome.is_failed())
    }

    pub fn outcome(&self, task_id: &str) -> Option<&ScheduleOutcome> {
        self.outcomes
            .iter()
            .find(|r| r.task_id == task_id)
            .map(|r| &r.outcome)
    }
}
