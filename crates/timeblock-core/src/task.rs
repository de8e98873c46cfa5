//! Schedulable tasks.
//!
//! A [`Task`] is a value: once built it is never mutated in place. The
//! `with_*` builders consume and return a new instance.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

use crate::error::ValidationError;
use crate::horizon::MAX_SPAN_MINUTES;
use crate::zone::{EnergyLevel, ZoneType};

/// Unique identifier for a task.
pub type TaskId = String;

/// Status written back to the task source after a Schedule run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task has managed events in the calendar.
    Scheduled,
    /// Task could not be placed in the last run.
    Unscheduled,
}

fn default_max_splits() -> u32 {
    1
}

/// A unit of work to place into the calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub project_id: String,
    /// Estimated duration
    pub duration_minutes: i64,
    /// Deadline date; the task must finish by the end of this day.
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Position within the project.
    #[serde(default)]
    pub sequence: u32,
    /// Tasks that must be scheduled first.
    #[serde(default)]
    pub dependencies: BTreeSet<TaskId>,
    pub zone: ZoneType,
    pub energy: EnergyLevel,
    #[serde(default)]
    pub splittable: bool,
    #[serde(default)]
    pub min_chunk_minutes: i64,
    #[serde(default = "default_max_splits")]
    pub max_splits: u32,
    #[serde(default)]
    pub buffer_minutes: i64,
}

impl Task {
    /// Create a non-splittable task with no dependencies.
    pub fn new(
        id: impl Into<TaskId>,
        title: impl Into<String>,
        project_id: impl Into<String>,
        duration_minutes: i64,
        zone: ZoneType,
        energy: EnergyLevel,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            project_id: project_id.into(),
            duration_minutes,
            due_date: None,
            sequence: 0,
            dependencies: BTreeSet::new(),
            zone,
            energy,
            splittable: false,
            min_chunk_minutes: duration_minutes,
            max_splits: 1,
            buffer_minutes: 0,
        }
    }

    pub fn with_sequence(self, sequence: u32) -> Self {
        Self { sequence, ..self }
    }

    pub fn with_due_date(self, due_date: NaiveDate) -> Self {
        Self {
            due_date: Some(due_date),
            ..self
        }
    }

    pub fn with_dependency(self, task_id: impl Into<TaskId>) -> Self {
        let mut dependencies = self.dependencies.clone();
        dependencies.insert(task_id.into());
        Self { dependencies, ..self }
    }

    pub fn with_buffer(self, buffer_minutes: i64) -> Self {
        Self { buffer_minutes, ..self }
    }

    /// Allow splitting into at most `max_splits` chunks of at least
    /// `min_chunk_minutes` each.
    pub fn splittable(self, min_chunk_minutes: i64, max_splits: u32) -> Self {
        Self {
            splittable: true,
            min_chunk_minutes,
            max_splits,
            ..self
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::minutes(self.duration_minutes)
    }

    pub fn min_chunk(&self) -> Duration {
        Duration::minutes(self.min_chunk_minutes)
    }

    pub fn buffer(&self) -> Duration {
        Duration::minutes(self.buffer_minutes)
    }

    /// Shortest block this task can be scheduled in.
    pub fn minimum_block(&self) -> Duration {
        if self.splittable {
            self.min_chunk()
        } else {
            self.duration()
        }
    }

    /// End of the due date, if any.
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.due_date
            .map(|d| Utc.from_utc_datetime(&(d + Duration::days(1)).and_time(NaiveTime::MIN)))
    }

    /// Title for chunk `index` of `count`.
    pub fn chunk_title(&self, index: u32, count: u32) -> String {
        if count <= 1 {
            self.title.clone()
        } else {
            format!("{} (Part {index}/{count})", self.title)
        }
    }

    /// Check the per-task invariants. Returns the first violation.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let field = |name: &str| format!("task[{}].{name}", self.id);
        if self.id.trim().is_empty() {
            return Err(ValidationError::invalid("task.id", "must not be empty"));
        }
        if self.duration_minutes <= 0 {
            return Err(ValidationError::invalid(
                field("duration_minutes"),
                format!("must be positive, got {}", self.duration_minutes),
            ));
        }
        if self.max_splits < 1 {
            return Err(ValidationError::invalid(field("max_splits"), "must be at least 1"));
        }
        if self.buffer_minutes < 0 {
            return Err(ValidationError::invalid(field("buffer_minutes"), "cannot be negative"));
        }
        for (name, minutes) in [
            ("duration_minutes", self.duration_minutes),
            ("min_chunk_minutes", self.min_chunk_minutes),
            ("buffer_minutes", self.buffer_minutes),
        ] {
            if minutes > MAX_SPAN_MINUTES {
                return Err(ValidationError::invalid(
                    field(name),
                    format!("{minutes} exceeds the {MAX_SPAN_MINUTES} min limit"),
                ));
            }
        }
        if self.splittable {
            if self.min_chunk_minutes <= 0 {
                return Err(ValidationError::invalid(field("min_chunk_minutes"), "must be positive"));
            }
            if self.min_chunk_minutes > self.duration_minutes {
                return Err(ValidationError::invalid(
                    field("min_chunk_minutes"),
                    format!(
                        "{} exceeds task duration {}",
                        self.min_chunk_minutes, self.duration_minutes
                    ),
                ));
            }
        }
        if self.dependencies.contains(&self.id) {
            return Err(ValidationError::SelfDependency(self.id.clone()));
        }
        Ok(())
    }
}

/// Validate every task and reject duplicate identities.
///
/// Cycle detection is left to the sequence resolver so that it surfaces
/// as a [`crate::error::CycleError`].
pub fn validate_tasks(tasks: &[Task]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for task in tasks {
        task.validate()?;
        if !seen.insert(task.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                kind: "task",
                id: task.id.clone(),
            });
        }
    }
    Ok(())
}
