//! Encoding/decoding between calendar records and events.
//!
//! A [`CalendarRecord`] is the shape a calendar service persists: an id, a
//! summary, two instants and free-form string properties. Managed events
//! are recognised by the `timeblock.managed` property; anything without it
//! is a fixed event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ValidationError;
use crate::event::{Event, EventId, EventKind, Interval, ManagedRef};

pub const MANAGED_KEY: &str = "timeblock.managed";
pub const TASK_ID_KEY: &str = "timeblock.task_id";
pub const CHUNK_KEY: &str = "timeblock.chunk";
pub const CHUNK_COUNT_KEY: &str = "timeblock.chunk_count";
pub const ZONE_KEY: &str = "timeblock.zone";
pub const BUFFER_KEY: &str = "timeblock.buffer_minutes";

/// Calendar-side representation of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarRecord {
    pub id: EventId,
    pub summary: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl CalendarRecord {
    pub fn is_managed(&self) -> bool {
        self.properties.get(MANAGED_KEY).map(String::as_str) == Some("true")
    }
}

// ============================================================================
// Event -> Record
// ============================================================================

/// Convert an event to a record, writing the managed marker when needed.
pub fn event_to_record(event: &Event) -> CalendarRecord {
    let mut properties = BTreeMap::new();
    if let Some(m) = event.managed_ref() {
        properties.insert(MANAGED_KEY.to_string(), "true".to_string());
        properties.insert(TASK_ID_KEY.to_string(), m.task_id.clone());
        properties.insert(CHUNK_KEY.to_string(), m.chunk_index.to_string());
        properties.insert(CHUNK_COUNT_KEY.to_string(), m.chunk_count.to_string());
        properties.insert(ZONE_KEY.to_string(), m.zone.to_string());
        properties.insert(BUFFER_KEY.to_string(), m.buffer_minutes.to_string());
    }
    CalendarRecord {
        id: event.id.clone(),
        summary: event.title.clone(),
        start: event.start,
        end: event.end,
        properties,
    }
}

// ============================================================================
// Record -> Event
// ============================================================================

/// Convert a record back to an event.
///
/// # Errors
///
/// Returns a validation error if the record's times are inverted or a
/// managed record is missing or garbles one of its properties.
pub fn record_to_event(record: &CalendarRecord) -> Result<Event, ValidationError> {
    let interval = Interval::new(record.start, record.end)?;
    let kind = if record.is_managed() {
        EventKind::Managed(managed_ref(record)?)
    } else {
        EventKind::Fixed
    };
    let event = Event {
        id: record.id.clone(),
        title: record.summary.clone(),
        start: interval.start,
        end: interval.end,
        kind,
    };
    event.validate()?;
    Ok(event)
}

fn managed_ref(record: &CalendarRecord) -> Result<ManagedRef, ValidationError> {
    let chunk_index: u32 = parse(record, CHUNK_KEY)?;
    let chunk_count: u32 = parse(record, CHUNK_COUNT_KEY)?;
    if chunk_index == 0 || chunk_index > chunk_count {
        return Err(ValidationError::invalid(
            field(record, CHUNK_KEY),
            format!("chunk {chunk_index} of {chunk_count}"),
        ));
    }
    Ok(ManagedRef {
        task_id: property(record, TASK_ID_KEY)?.to_string(),
        chunk_index,
        chunk_count,
        zone: parse(record, ZONE_KEY)?,
        buffer_minutes: match record.properties.get(BUFFER_KEY) {
            Some(_) => parse(record, BUFFER_KEY)?,
            None => 0,
        },
    })
}

fn field(record: &CalendarRecord, key: &str) -> String {
    format!("event[{}].{key}", record.id)
}

fn property<'r>(record: &'r CalendarRecord, key: &str) -> Result<&'r str, ValidationError> {
    record
        .properties
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| ValidationError::invalid(field(record, key), "missing on managed event"))
}

fn parse<T>(record: &CalendarRecord, key: &str) -> Result<T, ValidationError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = property(record, key)?;
    raw.parse()
        .map_err(|e: T::Err| ValidationError::invalid(field(record, key), format!("'{raw}': {e}")))
}
