use crate::error::CollaboratorError;
use crate::event::{Event, EventId};
use crate::horizon::PlanningHorizon;
use crate::task::{Task, TaskStatus};

/// Where tasks come from (a task tracker, a local file, a test double).
///
/// Implementations own their own retry behaviour. Any error they return is
/// terminal for the operation that made the call.
pub trait TaskSource: Send + Sync {
    /// Unique identifier (e.g. "memory", "file").
    fn name(&self) -> &str;

    fn fetch_tasks(&self) -> Result<Vec<Task>, CollaboratorError>;

    /// Record whether the task is currently scheduled.
    fn update_status(&mut self, task_id: &str, status: TaskStatus) -> Result<(), CollaboratorError>;
}

/// Where events live.
///
/// Managed events must come back from [`CalendarStore::fetch_events`] still
/// recognisable as managed, across process restarts.
pub trait CalendarStore: Send + Sync {
    fn name(&self) -> &str;

    /// Events intersecting the horizon.
    fn fetch_events(&self, horizon: &PlanningHorizon) -> Result<Vec<Event>, CollaboratorError>;

    /// Store `event` and return the id the store assigned.
    fn create_event(&mut self, event: &Event) -> Result<EventId, CollaboratorError>;

    fn delete_event(&mut self, event_id: &str) -> Result<(), CollaboratorError>;
}
