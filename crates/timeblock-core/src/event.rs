//! Calendar events and time intervals.
//!
//! An [`Event`] is either `Fixed` (owned by the calendar service, read-only
//! to the core) or `Managed` (created by the scheduling engine). Managed
//! events carry a back-reference to the task chunk they realise.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::horizon::MAX_SPAN_MINUTES;
use crate::task::TaskId;
use crate::zone::ZoneType;

/// Unique identifier for an event.
pub type EventId = String;

/// Half-open time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    /// Create a non-empty interval.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ValidationError> {
        if end <= start {
            return Err(ValidationError::InvalidTimeRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Create an interval without checking ordering; may be empty.
    pub(crate) fn span(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn duration_minutes(&self) -> i64 {
        self.duration().num_minutes()
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Check if this interval overlaps another.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn contains(&self, other: &Interval) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Grow the interval by `by` on both ends.
    pub fn expanded(&self, by: Duration) -> Interval {
        Interval::span(self.start - by, self.end + by)
    }

    pub fn intersection(&self, other: &Interval) -> Option<Interval> {
        let clipped = Interval::span(self.start.max(other.start), self.end.min(other.end));
        (!clipped.is_empty()).then_some(clipped)
    }
}

/// Back-reference from a managed event to the task chunk it realises.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedRef {
    pub task_id: TaskId,
    /// 1-based position of this chunk.
    pub chunk_index: u32,
    pub chunk_count: u32,
    pub zone: ZoneType,
    /// Buffer this placement demands from its neighbours.
    pub buffer_minutes: i64,
}

/// Ownership of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    /// Pre-existing commitment; never created, altered or removed by the core.
    Fixed,
    /// Created by the scheduling engine and removed only by Clean.
    Managed(ManagedRef),
}

/// A calendar event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl Event {
    /// Create a fixed event.
    pub fn fixed(
        id: impl Into<EventId>,
        title: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        Self::new(id.into(), title.into(), Interval::new(start, end)?, EventKind::Fixed)
    }

    /// Create a managed event for a task chunk.
    pub fn managed(
        id: impl Into<EventId>,
        title: impl Into<String>,
        interval: Interval,
        managed: ManagedRef,
    ) -> Result<Self, ValidationError> {
        Self::new(id.into(), title.into(), interval, EventKind::Managed(managed))
    }

    fn new(
        id: EventId,
        title: String,
        interval: Interval,
        kind: EventKind,
    ) -> Result<Self, ValidationError> {
        if id.trim().is_empty() {
            return Err(ValidationError::invalid("event.id", "must not be empty"));
        }
        if interval.is_empty() {
            return Err(ValidationError::InvalidTimeRange {
                start: interval.start,
                end: interval.end,
            });
        }
        Ok(Self {
            id,
            title,
            start: interval.start,
            end: interval.end,
            kind,
        })
    }

    /// Check the `end > start` invariant on an event built elsewhere
    /// (deserialized or handed over by a collaborator).
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.end <= self.start {
            return Err(ValidationError::InvalidTimeRange {
                start: self.start,
                end: self.end,
            });
        }
        if let EventKind::Managed(m) = &self.kind {
            if m.task_id.trim().is_empty() {
                return Err(ValidationError::invalid(
                    "event.task_id",
                    format!("managed event '{}' has no task reference", self.id),
                ));
            }
            if !(0..=MAX_SPAN_MINUTES).contains(&m.buffer_minutes) {
                return Err(ValidationError::invalid(
                    "event.buffer_minutes",
                    format!("{} out of range on event '{}'", m.buffer_minutes, self.id),
                ));
            }
            if m.chunk_index == 0 || m.chunk_index > m.chunk_count {
                return Err(ValidationError::invalid(
                    "event.chunk_index",
                    format!(
                        "chunk {}/{} out of range on event '{}'",
                        m.chunk_index, m.chunk_count, self.id
                    ),
                ));
            }
        }
        Ok(())
    }

    pub fn interval(&self) -> Interval {
        Interval::span(self.start, self.end)
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    pub fn is_managed(&self) -> bool {
        matches!(self.kind, EventKind::Managed(_))
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self.kind, EventKind::Fixed)
    }

    pub fn managed_ref(&self) -> Option<&ManagedRef> {
        match &self.kind {
            EventKind::Managed(m) => Some(m),
            EventKind::Fixed => None,
        }
    }

    /// Returns a copy carrying a different id; used when a store assigns
    /// its own identity on creation.
    pub fn with_id(&self, id: impl Into<EventId>) -> Self {
        Self {
            id: id.into(),
            ..self.clone()
        }
    }
}
