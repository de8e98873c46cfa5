//! Local JSON file holding tasks and calendar records.
//!
//! Stands in for a task tracker and a calendar service at once.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::codec::{event_to_record, record_to_event, CalendarRecord};
use super::traits::{CalendarStore, TaskSource};
use crate::error::{CollaboratorError, CoreError, ValidationError};
use crate::event::{Event, EventId};
use crate::horizon::PlanningHorizon;
use crate::task::{Task, TaskStatus};

const SERVICE: &str = "file";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    tasks: Vec<Task>,
    #[serde(default)]
    statuses: BTreeMap<String, TaskStatus>,
    #[serde(default)]
    events: Vec<CalendarRecord>,
}

/// Handle on a store file. Holds no state beyond the path: every call
/// reads the file, and every mutation writes it back, so several handles
/// on the same path stay consistent within one process.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Open the store at `path`. A missing file is an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CollaboratorError> {
        let store = Self { path: path.into() };
        store.load()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Document, CollaboratorError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                CollaboratorError::new(SERVICE, format!("{}: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Document::default()),
            Err(e) => Err(CollaboratorError::with_source(SERVICE, e)),
        }
    }

    fn save(&self, doc: &Document) -> Result<(), CollaboratorError> {
        let content = serde_json::to_string_pretty(doc)
            .map_err(|e| CollaboratorError::with_source(SERVICE, e))?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CollaboratorError::with_source(SERVICE, e))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content).map_err(|e| CollaboratorError::with_source(SERVICE, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| CollaboratorError::with_source(SERVICE, e))
    }

    /// Read, change and write back the document. Nothing is written when
    /// `change` fails.
    fn modify<R, E>(&self, change: impl FnOnce(&mut Document) -> Result<R, E>) -> Result<R, E>
    where
        E: From<CollaboratorError>,
    {
        let mut doc = self.load()?;
        let out = change(&mut doc)?;
        self.save(&doc)?;
        Ok(out)
    }

    pub fn tasks(&self) -> Result<Vec<Task>, CollaboratorError> {
        Ok(self.load()?.tasks)
    }

    pub fn status(&self, task_id: &str) -> Result<Option<TaskStatus>, CollaboratorError> {
        Ok(self.load()?.statuses.get(task_id).copied())
    }

    /// Add a task after validating it on its own.
    pub fn add_task(&self, task: Task) -> Result<(), CoreError> {
        task.validate()?;
        self.modify(|doc| {
            if doc.tasks.iter().any(|t| t.id == task.id) {
                return Err(ValidationError::DuplicateId {
                    kind: "task",
                    id: task.id.clone(),
                }
                .into());
            }
            doc.tasks.push(task);
            Ok(())
        })
    }

    /// Remove a task. Returns false if no such task existed.
    pub fn remove_task(&self, task_id: &str) -> Result<bool, CollaboratorError> {
        self.modify(|doc| {
            let before = doc.tasks.len();
            doc.tasks.retain(|t| t.id != task_id);
            doc.statuses.remove(task_id);
            Ok(doc.tasks.len() != before)
        })
    }

    /// All stored events, regardless of horizon.
    pub fn events(&self) -> Result<Vec<Event>, CollaboratorError> {
        self.load()?
            .events
            .iter()
            .map(|r| record_to_event(r).map_err(|e| CollaboratorError::with_source(SERVICE, e)))
            .collect()
    }

    /// Insert an event keeping its id, as an external calendar would own it.
    pub fn insert_event(&self, event: &Event) -> Result<(), CoreError> {
        event.validate()?;
        self.modify(|doc| {
            if doc.events.iter().any(|r| r.id == event.id) {
                return Err(ValidationError::DuplicateId {
                    kind: "event",
                    id: event.id.clone(),
                }
                .into());
            }
            doc.events.push(event_to_record(event));
            Ok(())
        })
    }
}

impl TaskSource for JsonFileStore {
    fn name(&self) -> &str {
        SERVICE
    }

    fn fetch_tasks(&self) -> Result<Vec<Task>, CollaboratorError> {
        self.tasks()
    }

    fn update_status(&mut self, task_id: &str, status: TaskStatus) -> Result<(), CollaboratorError> {
        self.modify(|doc| {
            if !doc.tasks.iter().any(|t| t.id == task_id) {
                return Err(CollaboratorError::new(SERVICE, format!("unknown task '{task_id}'")));
            }
            doc.statuses.insert(task_id.to_string(), status);
            Ok(())
        })
    }
}

impl CalendarStore for JsonFileStore {
    fn name(&self) -> &str {
        SERVICE
    }

    fn fetch_events(&self, horizon: &PlanningHorizon) -> Result<Vec<Event>, CollaboratorError> {
        let window = horizon.interval();
        Ok(self
            .events()?
            .into_iter()
            .filter(|e| e.interval().overlaps(&window))
            .collect())
    }

    fn create_event(&mut self, event: &Event) -> Result<EventId, CollaboratorError> {
        let id: EventId = uuid::Uuid::new_v4().to_string();
        let mut record = event_to_record(event);
        record.id = id.clone();
        self.modify(|doc| {
            doc.events.push(record);
            Ok::<_, CollaboratorError>(())
        })?;
        Ok(id)
    }

    fn delete_event(&mut self, event_id: &str) -> Result<(), CollaboratorError> {
        self.modify(|doc| {
            let before = doc.events.len();
            doc.events.retain(|r| r.id != event_id);
            if doc.events.len() == before {
                return Err(CollaboratorError::new(SERVICE, format!("no event with id '{event_id}'")));
            }
            Ok(())
        })
    }
}
