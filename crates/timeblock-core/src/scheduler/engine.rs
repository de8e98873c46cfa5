//! The scheduling engine.
//!
//! Tasks are placed one at a time. Each placement becomes part of the
//! calendar seen by every later placement, so a run never produces
//! overlapping or under-buffered events.
//!
//! Start-anchored strategies walk the resolved order forwards and keep each
//! task after its dependencies and project predecessors. End-anchored
//! strategies walk it backwards and keep each task before its dependents
//! and project successors, then drop any task whose dependencies did not
//! make it.

use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeSet, HashMap, HashSet};

use super::conflict::{Conflict, ConflictDetector};
use super::matcher::{Window, ZoneMatcher};
use super::sequence;
use super::splitter::{SplitDecision, TaskSplitter};
use super::strategy::{Anchor, GreedySequential, SchedulingStrategy, StrategyKind};
use super::{FailureReason, ScheduleOutcome, ScheduleReport, SchedulingFailure, TaskReport};
use crate::error::Result;
use crate::event::{Event, EventId, EventKind, Interval, ManagedRef};
use crate::horizon::PlanningHorizon;
use crate::task::{validate_tasks, Task};
use crate::zone::{ZoneCatalog, ZoneOccurrence};

/// Deterministic zone-aware scheduler.
pub struct Scheduler {
    catalog: ZoneCatalog,
    strategy: Box<dyn SchedulingStrategy>,
}

impl Scheduler {
    /// Create a scheduler with the greedy sequential strategy.
    pub fn new(catalog: ZoneCatalog) -> Self {
        Self {
            catalog,
            strategy: Box::new(GreedySequential),
        }
    }

    pub fn with_strategy(self, strategy: Box<dyn SchedulingStrategy>) -> Self {
        Self { strategy, ..self }
    }

    pub fn with_strategy_kind(self, kind: StrategyKind) -> Self {
        self.with_strategy(kind.build())
    }

    pub fn catalog(&self) -> &ZoneCatalog {
        &self.catalog
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Place `tasks` into `horizon` around `existing` events.
    ///
    /// Fails with a validation error for malformed input and a cycle error
    /// when dependencies are circular; both abort before anything is
    /// placed. Per-task failures are reported in the returned report.
    pub fn schedule(
        &self,
        tasks: &[Task],
        horizon: &PlanningHorizon,
        existing: &[Event],
    ) -> Result<ScheduleReport> {
        validate_tasks(tasks)?;
        for event in existing {
            event.validate()?;
        }
        let order = sequence::resolve_tasks(tasks)?;
        Ok(self.schedule_order(&order, horizon, existing))
    }

    /// Place already ordered tasks. Input is assumed valid.
    pub fn schedule_order(
        &self,
        order: &[&Task],
        horizon: &PlanningHorizon,
        existing: &[Event],
    ) -> ScheduleReport {
        let mut run = Run::new(self, horizon, existing);
        let placed: Vec<ScheduleOutcome> = match self.strategy.anchor() {
            Anchor::Start => order.iter().map(|task| run.place(task)).collect(),
            Anchor::End => run.place_backward(order),
        };
        let outcomes = order
            .iter()
            .zip(placed)
            .map(|(task, outcome)| {
                match &outcome {
                    ScheduleOutcome::Failed(failure) => {
                        tracing::warn!(task = %task.id, reason = %failure.reason, "{}", failure.message);
                    }
                    placed => {
                        tracing::debug!(task = %task.id, events = placed.events().len(), "placed");
                    }
                }
                TaskReport {
                    task_id: task.id.clone(),
                    outcome,
                }
            })
            .collect();

        let report = ScheduleReport {
            strategy: self.strategy.name().to_string(),
            outcomes,
        };
        let counts = report.counts();
        tracing::info!(
            strategy = %report.strategy,
            placed = counts.placed,
            split = counts.split,
            failed = counts.failed,
            "schedule pass complete"
        );
        report
    }
}

/// Mutable state of one scheduling pass.
struct Run<'s> {
    scheduler: &'s Scheduler,
    horizon: &'s PlanningHorizon,
    detector: ConflictDetector<'s>,
    matcher: ZoneMatcher<'s>,
    splitter: TaskSplitter<'s>,
    /// Existing events plus everything placed so far.
    events: Vec<Event>,
    /// Last end of each placed task.
    finished: HashMap<String, DateTime<Utc>>,
    /// Last end of any placed task per project.
    project_floor: HashMap<String, DateTime<Utc>>,
    /// First start of each placed task.
    started: HashMap<String, DateTime<Utc>>,
    /// First start of any placed task per project.
    project_ceiling: HashMap<String, DateTime<Utc>>,
}

impl<'s> Run<'s> {
    fn new(scheduler: &'s Scheduler, horizon: &'s PlanningHorizon, existing: &[Event]) -> Self {
        let catalog = &scheduler.catalog;
        Self {
            scheduler,
            horizon,
            detector: ConflictDetector::new(catalog),
            matcher: ZoneMatcher::new(catalog),
            splitter: TaskSplitter::new(catalog),
            events: existing.to_vec(),
            finished: HashMap::new(),
            project_floor: HashMap::new(),
            started: HashMap::new(),
            project_ceiling: HashMap::new(),
        }
    }

    fn place(&mut self, task: &Task) -> ScheduleOutcome {
        // 1. Dependencies must already be placed
        let unmet: Vec<String> = task
            .dependencies
            .iter()
            .filter(|d| !self.finished.contains_key(d.as_str()))
            .cloned()
            .collect();
        if !unmet.is_empty() {
            return ScheduleOutcome::Failed(unmet_failure(unmet));
        }

        // 2. After project predecessors and dependencies
        let not_before = task
            .dependencies
            .iter()
            .filter_map(|d| self.finished.get(d.as_str()))
            .chain(self.project_floor.get(&task.project_id))
            .copied()
            .fold(self.horizon.start_instant(), |a, b| a.max(b));
        self.place_between(task, not_before, self.horizon.end_instant())
    }

    /// Place `order` from its last task to its first.
    ///
    /// Each task must end before its dependents and project successors
    /// start. Outcomes come back in `order`.
    fn place_backward(&mut self, order: &[&Task]) -> Vec<ScheduleOutcome> {
        let known: HashSet<&str> = order.iter().map(|t| t.id.as_str()).collect();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
        for task in order {
            for dep in &task.dependencies {
                dependents.entry(dep.as_str()).or_default().push(task.id.as_str());
            }
        }

        let mut outcomes: Vec<ScheduleOutcome> = order
            .iter()
            .rev()
            .map(|task| {
                let missing: Vec<String> = task
                    .dependencies
                    .iter()
                    .filter(|d| !known.contains(d.as_str()))
                    .cloned()
                    .collect();
                if !missing.is_empty() {
                    return ScheduleOutcome::Failed(unmet_failure(missing));
                }
                let not_after = dependents
                    .get(task.id.as_str())
                    .into_iter()
                    .flatten()
                    .filter_map(|d| self.started.get(*d))
                    .chain(self.project_ceiling.get(&task.project_id))
                    .copied()
                    .fold(self.horizon.end_instant(), |a, b| a.min(b));
                self.place_between(task, self.horizon.start_instant(), not_after)
            })
            .collect();
        outcomes.reverse();

        // A task only stands if everything it depends on was placed.
        let mut placed: HashSet<&str> = HashSet::new();
        for (task, outcome) in order.iter().zip(outcomes.iter_mut()) {
            let unmet: Vec<String> = task
                .dependencies
                .iter()
                .filter(|d| !placed.contains(d.as_str()))
                .cloned()
                .collect();
            if unmet.is_empty() {
                if outcome.failure().is_none() {
                    placed.insert(task.id.as_str());
                }
                continue;
            }
            let withdrawn: HashSet<&str> = outcome.events().iter().map(|e| e.id.as_str()).collect();
            self.events.retain(|e| !withdrawn.contains(e.id.as_str()));
            *outcome = ScheduleOutcome::Failed(unmet_failure(unmet));
        }
        outcomes
    }

    /// Place `task` inside `[not_before, not_after]`, further capped by its
    /// due date.
    fn place_between(
        &mut self,
        task: &Task,
        not_before: DateTime<Utc>,
        not_after: DateTime<Utc>,
    ) -> ScheduleOutcome {
        // 1. Due date must fall inside the horizon
        if let Some(due) = task.due_date {
            if !self.horizon.contains_date(due) {
                return ScheduleOutcome::Failed(SchedulingFailure::new(
                    FailureReason::OutsideHorizon,
                    format!(
                        "due {due} is outside horizon {}..={}",
                        self.horizon.start_date(),
                        self.horizon.end_date()
                    ),
                ));
            }
        }

        // 2. Bounds
        let deadline = task.deadline().map_or(not_after, |d| d.min(not_after));
        if not_before >= deadline {
            return ScheduleOutcome::Failed(SchedulingFailure::new(
                FailureReason::NoWindow,
                "no time left between predecessors and deadline",
            ));
        }
        let bounds = Interval::span(not_before, deadline);

        if self.catalog().eligible(task.zone, task.energy).is_none() {
            return ScheduleOutcome::Failed(self.ineligible(task));
        }

        // 3. Whole placement
        if let Some(events) = self.place_whole(task, bounds) {
            self.record(task, &events);
            return ScheduleOutcome::Placed { events };
        }

        // 4. Split placement
        if task.splittable {
            return match self.place_split(task, bounds) {
                Ok(events) => {
                    let chunk_count = events.len() as u32;
                    self.record(task, &events);
                    ScheduleOutcome::Split {
                        events,
                        chunk_count,
                    }
                }
                Err(failure) => ScheduleOutcome::Failed(failure),
            };
        }

        // 5. Nothing fits
        ScheduleOutcome::Failed(self.no_window(task, bounds))
    }

    fn catalog(&self) -> &'s ZoneCatalog {
        &self.scheduler.catalog
    }

    fn windows(&self, task: &Task, bounds: Interval, min_length: Duration) -> Vec<Window> {
        let mut windows: Vec<Window> = self
            .matcher
            .candidate_windows(task, self.horizon, &self.events, bounds, min_length)
            .collect();
        self.scheduler.strategy.arrange(&mut windows);
        windows
    }

    fn place_whole(&mut self, task: &Task, bounds: Interval) -> Option<Vec<Event>> {
        let anchor = self.scheduler.strategy.anchor();
        let found = self
            .windows(task, bounds, task.duration())
            .into_iter()
            .map(|w| (anchor.place(&w.interval, task.duration()), w.occurrence))
            .find(|(candidate, occurrence)| {
                self.detector
                    .is_placeable(task, candidate, occurrence, &self.events)
            })?;
        let event = self.managed_event(task, found.0, found.1, 1, 1);
        self.events.push(event.clone());
        Some(vec![event])
    }

    fn place_split(&mut self, task: &Task, bounds: Interval) -> Result<Vec<Event>, SchedulingFailure> {
        let windows = self.windows(task, bounds, task.min_chunk());
        let anchor = self.scheduler.strategy.anchor();
        let plan = match self.splitter.plan(task, &windows, anchor) {
            SplitDecision::Plan(plan) => plan,
            SplitDecision::Infeasible {
                allocated_chunks,
                remaining_minutes,
            } => {
                return Err(SchedulingFailure::new(
                    FailureReason::NoFeasibleSplit,
                    format!(
                        "{remaining_minutes} min left after {allocated_chunks} of at most {} chunks",
                        task.max_splits
                    ),
                )
                .with_events(self.blocking_events(task, bounds)));
            }
            SplitDecision::NotSplittable => return Err(self.no_window(task, bounds)),
        };

        // Each chunk is checked against everything placed so far, including
        // the chunks before it; any conflict rolls the whole task back.
        let rollback = self.events.len();
        let count = plan.chunk_count();
        let mut placed = Vec::with_capacity(plan.chunks.len());
        for chunk in &plan.chunks {
            let conflicts = self
                .detector
                .check(task, &chunk.interval, &chunk.occurrence, &self.events);
            if !conflicts.is_empty() {
                self.events.truncate(rollback);
                let ids = collect_ids(&conflicts);
                return Err(SchedulingFailure::new(
                    FailureReason::NoFeasibleSplit,
                    format!("chunk {}/{count} conflicts with the calendar", chunk.index),
                )
                .with_events(ids)
                .with_conflicts(conflicts));
            }
            let event = self.managed_event(task, chunk.interval, chunk.occurrence, chunk.index, count);
            self.events.push(event.clone());
            placed.push(event);
        }
        Ok(placed)
    }

    fn managed_event(
        &self,
        task: &Task,
        interval: Interval,
        occurrence: ZoneOccurrence,
        index: u32,
        count: u32,
    ) -> Event {
        let buffer = self
            .detector
            .buffers()
            .placement_buffer(occurrence.zone, task.buffer());
        Event {
            id: format!("tb-{}-{index}", task.id),
            title: task.chunk_title(index, count),
            start: interval.start,
            end: interval.end,
            kind: EventKind::Managed(ManagedRef {
                task_id: task.id.clone(),
                chunk_index: index,
                chunk_count: count,
                zone: occurrence.zone,
                buffer_minutes: buffer.num_minutes(),
            }),
        }
    }

    fn record(&mut self, task: &Task, events: &[Event]) {
        let (Some(first_start), Some(last_end)) = (
            events.iter().map(|e| e.start).min(),
            events.iter().map(|e| e.end).max(),
        ) else {
            return;
        };
        self.finished.insert(task.id.clone(), last_end);
        self.started.insert(task.id.clone(), first_start);
        self.project_floor
            .entry(task.project_id.clone())
            .and_modify(|floor| *floor = (*floor).max(last_end))
            .or_insert(last_end);
        self.project_ceiling
            .entry(task.project_id.clone())
            .and_modify(|ceiling| *ceiling = (*ceiling).min(first_start))
            .or_insert(first_start);
    }

    /// Events intersecting the eligible occurrences inside `bounds`, each
    /// widened by its own buffer. Sorted by start, then id.
    fn blocking_events(&self, task: &Task, bounds: Interval) -> Vec<EventId> {
        let mut seen = BTreeSet::new();
        let mut blocking: Vec<&Event> = Vec::new();
        for occ in self.matcher.occurrences(task, self.horizon, bounds) {
            let Some(area) = occ.interval.intersection(&bounds) else {
                continue;
            };
            for event in self.detector.conflicts(&area, &self.events) {
                if seen.insert(event.id.as_str()) {
                    blocking.push(event);
                }
            }
        }
        blocking.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
        blocking.into_iter().map(|e| e.id.clone()).collect()
    }

    fn no_window(&self, task: &Task, bounds: Interval) -> SchedulingFailure {
        let interrupted: Vec<Conflict> = self
            .matcher
            .occurrences(task, self.horizon, bounds)
            .iter()
            .filter(|occ| !self.detector.admits(occ, &self.events))
            .filter_map(|occ| {
                let zone = self.catalog().get(occ.zone)?;
                let ids = self
                    .detector
                    .intrusions(&occ.interval, &self.events)
                    .iter()
                    .map(|e| e.id.clone())
                    .collect();
                Some(Conflict::Interrupted {
                    policy: zone.interruption,
                    event_ids: ids,
                })
            })
            .collect();
        SchedulingFailure::new(
            FailureReason::NoWindow,
            format!(
                "no free {} window of {} min before {}",
                task.zone,
                task.minimum_block().num_minutes(),
                bounds.end.format("%Y-%m-%d %H:%M")
            ),
        )
        .with_events(self.blocking_events(task, bounds))
        .with_conflicts(interrupted)
    }

    fn ineligible(&self, task: &Task) -> SchedulingFailure {
        let conflict = match self.catalog().get(task.zone) {
            Some(zone) => Conflict::EnergyMismatch {
                required: task.energy,
                found: zone.energy,
            },
            None => Conflict::OutsideZone,
        };
        SchedulingFailure::new(
            FailureReason::NoWindow,
            format!("no {} zone offers {} energy", task.zone, task.energy),
        )
        .with_conflicts(vec![conflict])
    }
}

fn unmet_failure(unmet: Vec<String>) -> SchedulingFailure {
    SchedulingFailure::new(
        FailureReason::DependencyUnmet,
        format!("dependencies not placed: {}", unmet.join(", ")),
    )
    .with_unmet(unmet)
}

fn collect_ids(conflicts: &[Conflict]) -> Vec<EventId> {
    let ids: BTreeSet<&EventId> = conflicts.iter().flat_map(|c| c.event_ids()).collect();
    ids.into_iter().cloned().collect()
}
