//! Operational surface: Sync, Clean, Schedule and Reschedule against
//! injected collaborators.
//!
//! Collaborators are only called before a run computes anything and after
//! it is done. A collaborator error ends the operation where it happened;
//! changes already applied are not rolled back.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

use crate::error::Result;
use crate::event::{Event, EventId};
use crate::horizon::PlanningHorizon;
use crate::integrations::{CalendarStore, TaskSource};
use crate::scheduler::{
    clean, OutcomeCounts, RescheduleCoordinator, ScheduleOutcome, ScheduleReport, Scheduler,
    TaskReport,
};
use crate::task::{validate_tasks, Task, TaskId, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Sync,
    Clean,
    Schedule,
    Reschedule,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Sync => "sync",
            Operation::Clean => "clean",
            Operation::Schedule => "schedule",
            Operation::Reschedule => "reschedule",
        };
        f.write_str(name)
    }
}

/// Report of one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub operation: Operation,
    pub horizon: PlanningHorizon,
    pub tasks_seen: usize,
    pub events_seen: usize,
    pub counts: OutcomeCounts,
    pub outcomes: Vec<TaskReport>,
    /// Ids assigned by the calendar store to new managed events.
    pub created: Vec<EventId>,
    pub deleted: Vec<EventId>,
    /// Tasks that already owned managed events when a schedule run
    /// started; scheduling them again duplicates their blocks.
    pub already_scheduled: Vec<TaskId>,
}

impl RunReport {
    fn new(operation: Operation, horizon: PlanningHorizon) -> Self {
        Self {
            operation,
            horizon,
            tasks_seen: 0,
            events_seen: 0,
            counts: OutcomeCounts::default(),
            outcomes: Vec::new(),
            created: Vec::new(),
            deleted: Vec::new(),
            already_scheduled: Vec::new(),
        }
    }

    /// True when at least one task failed.
    pub fn is_partial(&self) -> bool {
        self.counts.failed > 0
    }
}

/// Tasks and events fetched for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub tasks: Vec<Task>,
    pub events: Vec<Event>,
}

impl Snapshot {
    /// Ids of snapshot tasks that own at least one managed event, sorted.
    pub fn scheduled_task_ids(&self) -> Vec<TaskId> {
        let owners: BTreeSet<&str> = self
            .events
            .iter()
            .filter_map(|e| e.managed_ref())
            .map(|m| m.task_id.as_str())
            .collect();
        self.tasks
            .iter()
            .filter(|t| owners.contains(t.id.as_str()))
            .map(|t| t.id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

pub struct Planner<T: TaskSource, C: CalendarStore> {
    tasks: T,
    calendar: C,
    scheduler: Scheduler,
}

impl<T: TaskSource, C: CalendarStore> Planner<T, C> {
    pub fn new(tasks: T, calendar: C, scheduler: Scheduler) -> Self {
        Self {
            tasks,
            calendar,
            scheduler,
        }
    }

    pub fn task_source(&self) -> &T {
        &self.tasks
    }

    pub fn calendar(&self) -> &C {
        &self.calendar
    }

    pub fn into_parts(self) -> (T, C) {
        (self.tasks, self.calendar)
    }

    /// Fetch tasks and events for `horizon`, validating the tasks.
    pub fn snapshot(&self, horizon: &PlanningHorizon) -> Result<Snapshot> {
        let tasks = self.tasks.fetch_tasks()?;
        validate_tasks(&tasks)?;
        let events = self.calendar.fetch_events(horizon)?;
        tracing::debug!(
            source = self.tasks.name(),
            calendar = self.calendar.name(),
            tasks = tasks.len(),
            events = events.len(),
            "fetched snapshot"
        );
        Ok(Snapshot { tasks, events })
    }

    /// Fetch and validate everything without changing anything.
    pub fn sync(&self, horizon: &PlanningHorizon) -> Result<RunReport> {
        let snapshot = self.snapshot(horizon)?;
        crate::scheduler::sequence::resolve(&snapshot.tasks)?;
        let mut report = RunReport::new(Operation::Sync, *horizon);
        report.tasks_seen = snapshot.tasks.len();
        report.events_seen = snapshot.events.len();
        tracing::info!(tasks = report.tasks_seen, events = report.events_seen, "sync complete");
        Ok(report)
    }

    /// Delete every managed event in the horizon.
    pub fn clean(&mut self, horizon: &PlanningHorizon) -> Result<RunReport> {
        let events = self.calendar.fetch_events(horizon)?;
        let plan = clean(&events);
        let mut report = RunReport::new(Operation::Clean, *horizon);
        report.events_seen = events.len();
        report.deleted = self.delete_all(&plan.removed_ids())?;
        tracing::info!(deleted = report.deleted.len(), "clean complete");
        Ok(report)
    }

    /// Schedule around whatever the calendar holds, managed events
    /// included.
    pub fn schedule(&mut self, horizon: &PlanningHorizon) -> Result<RunReport> {
        let snapshot = self.snapshot(horizon)?;
        let schedule = self
            .scheduler
            .schedule(&snapshot.tasks, horizon, &snapshot.events)?;

        let mut report = RunReport::new(Operation::Schedule, *horizon);
        report.tasks_seen = snapshot.tasks.len();
        report.events_seen = snapshot.events.len();
        report.already_scheduled = snapshot.scheduled_task_ids();
        for task_id in &report.already_scheduled {
            tracing::warn!(task = %task_id, "task already has managed events; use reschedule to replace them");
        }
        self.apply(&mut report, schedule)?;
        Ok(report)
    }

    /// Clean, then schedule on the cleaned calendar. Nothing is deleted if
    /// the input is invalid.
    pub fn reschedule(&mut self, horizon: &PlanningHorizon) -> Result<RunReport> {
        let snapshot = self.snapshot(horizon)?;
        let outcome = RescheduleCoordinator::new(&self.scheduler).reschedule(
            &snapshot.tasks,
            horizon,
            &snapshot.events,
        )?;

        let mut report = RunReport::new(Operation::Reschedule, *horizon);
        report.tasks_seen = snapshot.tasks.len();
        report.events_seen = snapshot.events.len();
        report.deleted = self.delete_all(&outcome.removed)?;
        self.apply(&mut report, outcome.schedule)?;
        Ok(report)
    }

    fn delete_all(&mut self, ids: &[EventId]) -> Result<Vec<EventId>> {
        let mut deleted = Vec::with_capacity(ids.len());
        for id in ids {
            self.calendar.delete_event(id)?;
            deleted.push(id.clone());
        }
        Ok(deleted)
    }

    /// Write new events and task statuses back to the collaborators.
    fn apply(&mut self, report: &mut RunReport, schedule: ScheduleReport) -> Result<()> {
        for event in schedule.events() {
            report.created.push(self.calendar.create_event(event)?);
        }
        for task in &schedule.outcomes {
            let status = match task.outcome {
                ScheduleOutcome::Failed(_) => TaskStatus::Unscheduled,
                _ => TaskStatus::Scheduled,
            };
            self.tasks.update_status(&task.task_id, status)?;
        }
        report.counts = schedule.counts();
        report.outcomes = schedule.outcomes;
        tracing::info!(
            operation = %report.operation,
            created = report.created.len(),
            deleted = report.deleted.len(),
            partial = report.is_partial(),
            "run complete"
        );
        Ok(())
    }
}
