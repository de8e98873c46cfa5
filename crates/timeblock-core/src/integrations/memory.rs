//! In-memory collaborators for tests and dry runs.

use std::collections::BTreeMap;

use super::codec::{event_to_record, record_to_event, CalendarRecord};
use super::traits::{CalendarStore, TaskSource};
use crate::error::CollaboratorError;
use crate::event::{Event, EventId};
use crate::horizon::PlanningHorizon;
use crate::task::{Task, TaskStatus};

/// Task source backed by a vector.
#[derive(Debug, Clone, Default)]
pub struct MemoryTaskSource {
    tasks: Vec<Task>,
    statuses: BTreeMap<String, TaskStatus>,
}

impl MemoryTaskSource {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            statuses: BTreeMap::new(),
        }
    }

    pub fn status(&self, task_id: &str) -> Option<TaskStatus> {
        self.statuses.get(task_id).copied()
    }
}

impl TaskSource for MemoryTaskSource {
    fn name(&self) -> &str {
        "memory"
    }

    fn fetch_tasks(&self) -> Result<Vec<Task>, CollaboratorError> {
        Ok(self.tasks.clone())
    }

    fn update_status(&mut self, task_id: &str, status: TaskStatus) -> Result<(), CollaboratorError> {
        if !self.tasks.iter().any(|t| t.id == task_id) {
            return Err(CollaboratorError::new(
                self.name(),
                format!("unknown task '{task_id}'"),
            ));
        }
        self.statuses.insert(task_id.to_string(), status);
        Ok(())
    }
}

/// Calendar that stores [`CalendarRecord`]s, like a remote service would,
/// and assigns its own ids on create.
#[derive(Debug, Clone, Default)]
pub struct MemoryCalendar {
    records: Vec<CalendarRecord>,
}

impl MemoryCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calendar pre-populated with `events`, ids kept as given.
    pub fn with_events(events: &[Event]) -> Self {
        Self {
            records: events.iter().map(event_to_record).collect(),
        }
    }

    pub fn records(&self) -> &[CalendarRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl CalendarStore for MemoryCalendar {
    fn name(&self) -> &str {
        "memory"
    }

    fn fetch_events(&self, horizon: &PlanningHorizon) -> Result<Vec<Event>, CollaboratorError> {
        let window = horizon.interval();
        self.records
            .iter()
            .map(|r| record_to_event(r).map_err(|e| CollaboratorError::with_source(self.name(), e)))
            .filter(|e| e.as_ref().map_or(true, |e| e.interval().overlaps(&window)))
            .collect()
    }

    fn create_event(&mut self, event: &Event) -> Result<EventId, CollaboratorError> {
        let id: EventId = uuid::Uuid::new_v4().to_string();
        let mut record = event_to_record(event);
        record.id = id.clone();
        self.records.push(record);
        Ok(id)
    }

    fn delete_event(&mut self, event_id: &str) -> Result<(), CollaboratorError> {
        let before = self.records.len();
        self.records.retain(|r| r.id != event_id);
        if self.records.len() == before {
            return Err(CollaboratorError::new(
                self.name(),
                format!("no event with id '{event_id}'"),
            ));
        }
        Ok(())
    }
}
