//! Conflict detection for candidate placements.
//!
//! Time conflicts (overlap, buffer) and zone conflicts (type, energy,
//! minimum duration, interruption policy) are reported as distinct
//! [`Conflict`] values so a failed placement can be explained.

use serde::Serialize;
use std::fmt;

use super::buffer::BufferManager;
use crate::event::{Event, EventId, Interval};
use crate::task::Task;
use crate::zone::{EnergyLevel, InterruptionPolicy, ZoneCatalog, ZoneOccurrence, ZoneType};

/// Why a candidate interval cannot host a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Conflict {
    /// The candidate intersects existing events.
    Overlap { event_ids: Vec<EventId> },
    /// The candidate sits too close to existing events.
    BufferViolation {
        event_ids: Vec<EventId>,
        required_minutes: i64,
    },
    ZoneMismatch { required: ZoneType, found: ZoneType },
    EnergyMismatch {
        required: EnergyLevel,
        found: EnergyLevel,
    },
    BelowZoneMinimum {
        minimum_minutes: i64,
        actual_minutes: i64,
    },
    /// The candidate is not contained in the zone occurrence, or the zone
    /// is not configured.
    OutsideZone,
    /// The zone occurrence holds more fixed events than its policy allows.
    Interrupted {
        policy: InterruptionPolicy,
        event_ids: Vec<EventId>,
    },
}

impl Conflict {
    /// Event ids implicated by this conflict.
    pub fn event_ids(&self) -> &[EventId] {
        match self {
            Conflict::Overlap { event_ids }
            | Conflict::BufferViolation { event_ids, .. }
            | Conflict::Interrupted { event_ids, .. } => event_ids,
            _ => &[],
        }
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conflict::Overlap { event_ids } => {
                write!(f, "overlaps {}", event_ids.join(", "))
            }
            Conflict::BufferViolation {
                event_ids,
                required_minutes,
            } => write!(
                f,
                "within {required_minutes} min buffer of {}",
                event_ids.join(", ")
            ),
            Conflict::ZoneMismatch { required, found } => {
                write!(f, "task requires {required} zone, found {found}")
            }
            Conflict::EnergyMismatch { required, found } => {
                write!(f, "task requires {required} energy, zone offers {found}")
            }
            Conflict::BelowZoneMinimum {
                minimum_minutes,
                actual_minutes,
            } => write!(
                f,
                "{actual_minutes} min is below zone minimum of {minimum_minutes} min"
            ),
            Conflict::OutsideZone => write!(f, "outside of any matching zone"),
            Conflict::Interrupted { policy, event_ids } => write!(
                f,
                "zone interruption policy {policy:?} exceeded by {}",
                event_ids.join(", ")
            ),
        }
    }
}

/// Decides whether a candidate interval is placeable.
#[derive(Debug, Clone, Copy)]
pub struct ConflictDetector<'a> {
    catalog: &'a ZoneCatalog,
    buffers: BufferManager<'a>,
}

impl<'a> ConflictDetector<'a> {
    pub fn new(catalog: &'a ZoneCatalog) -> Self {
        Self {
            catalog,
            buffers: BufferManager::new(catalog),
        }
    }

    pub fn buffers(&self) -> &BufferManager<'a> {
        &self.buffers
    }

    /// Events that intersect `candidate` once each is expanded by its own
    /// buffer on both ends.
    pub fn conflicts<'e>(&self, candidate: &Interval, events: &'e [Event]) -> Vec<&'e Event> {
        events
            .iter()
            .filter(|e| {
                e.interval()
                    .expanded(self.buffers.own_buffer(e))
                    .overlaps(candidate)
            })
            .collect()
    }

    /// Fixed events intersecting a zone occurrence.
    pub fn intrusions<'e>(&self, occurrence: &Interval, events: &'e [Event]) -> Vec<&'e Event> {
        events
            .iter()
            .filter(|e| e.is_fixed() && e.interval().overlaps(occurrence))
            .collect()
    }

    /// Whether the occurrence's interruption policy still admits placements.
    pub fn admits(&self, occurrence: &ZoneOccurrence, events: &[Event]) -> bool {
        match self.catalog.get(occurrence.zone) {
            Some(zone) => zone
                .interruption
                .admits(self.intrusions(&occurrence.interval, events).len()),
            None => false,
        }
    }

    /// Every reason `task` cannot occupy `candidate` inside `occurrence`.
    /// Empty when the placement is valid.
    pub fn check(
        &self,
        task: &Task,
        candidate: &Interval,
        occurrence: &ZoneOccurrence,
        events: &[Event],
    ) -> Vec<Conflict> {
        let mut found = Vec::new();

        let Some(zone) = self.catalog.get(occurrence.zone) else {
            found.push(Conflict::OutsideZone);
            return found;
        };
        if task.zone != zone.zone_type {
            found.push(Conflict::ZoneMismatch {
                required: task.zone,
                found: zone.zone_type,
            });
        }
        if task.energy != zone.energy {
            found.push(Conflict::EnergyMismatch {
                required: task.energy,
                found: zone.energy,
            });
        }
        if candidate.is_empty() || !occurrence.interval.contains(candidate) {
            found.push(Conflict::OutsideZone);
        }
        if candidate.duration() < zone.min_duration() {
            found.push(Conflict::BelowZoneMinimum {
                minimum_minutes: zone.min_duration_minutes,
                actual_minutes: candidate.duration_minutes(),
            });
        }

        let intrusions = self.intrusions(&occurrence.interval, events);
        if !zone.interruption.admits(intrusions.len()) {
            found.push(Conflict::Interrupted {
                policy: zone.interruption,
                event_ids: intrusions.iter().map(|e| e.id.clone()).collect(),
            });
        }

        let overlapping: Vec<EventId> = events
            .iter()
            .filter(|e| e.interval().overlaps(candidate))
            .map(|e| e.id.clone())
            .collect();
        if !overlapping.is_empty() {
            found.push(Conflict::Overlap {
                event_ids: overlapping,
            });
        }

        let mut required = chrono::Duration::zero();
        let too_close: Vec<EventId> = events
            .iter()
            .filter(|e| !e.interval().overlaps(candidate))
            .filter_map(|e| {
                let gap = self.buffers.gap_around(e, zone.zone_type, task.buffer());
                e.interval().expanded(gap).overlaps(candidate).then(|| {
                    required = required.max(gap);
                    e.id.clone()
                })
            })
            .collect();
        if !too_close.is_empty() {
            found.push(Conflict::BufferViolation {
                event_ids: too_close,
                required_minutes: required.num_minutes(),
            });
        }

        found
    }

    pub fn is_placeable(
        &self,
        task: &Task,
        candidate: &Interval,
        occurrence: &ZoneOccurrence,
        events: &[Event],
    ) -> bool {
        self.check(task, candidate, occurrence, events).is_empty()
    }
}
