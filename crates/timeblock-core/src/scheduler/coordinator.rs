//! Clean and Reschedule over an in-memory event list.

use serde::Serialize;

use super::engine::Scheduler;
use super::ScheduleReport;
use crate::error::Result;
use crate::event::{Event, EventId};
use crate::horizon::PlanningHorizon;
use crate::task::Task;

/// Partition of a calendar into what Clean keeps and what it removes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CleanPlan {
    /// Fixed events, untouched and in input order.
    pub retained: Vec<Event>,
    /// Managed events to delete.
    pub removed: Vec<Event>,
}

impl CleanPlan {
    pub fn removed_ids(&self) -> Vec<EventId> {
        self.removed.iter().map(|e| e.id.clone()).collect()
    }
}

/// Split `events` into fixed events to keep and managed events to remove.
/// Running it on its own output removes nothing.
pub fn clean(events: &[Event]) -> CleanPlan {
    let (removed, retained) = events.iter().cloned().partition(Event::is_managed);
    CleanPlan { retained, removed }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RescheduleReport {
    /// Managed events removed before scheduling.
    pub removed: Vec<EventId>,
    pub schedule: ScheduleReport,
}

/// Clean followed by Schedule on the cleaned calendar.
pub struct RescheduleCoordinator<'a> {
    scheduler: &'a Scheduler,
}

impl<'a> RescheduleCoordinator<'a> {
    pub fn new(scheduler: &'a Scheduler) -> Self {
        Self { scheduler }
    }

    /// Validation and cycle errors surface before anything is removed.
    pub fn reschedule(
        &self,
        tasks: &[Task],
        horizon: &PlanningHorizon,
        events: &[Event],
    ) -> Result<RescheduleReport> {
        let plan = clean(events);
        let schedule = self.scheduler.schedule(tasks, horizon, &plan.retained)?;
        tracing::debug!(removed = plan.removed.len(), "rescheduled over cleaned calendar");
        Ok(RescheduleReport {
            removed: plan.removed_ids(),
            schedule,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Interval;
    use crate::event::ManagedRef;
    use crate::zone::{EnergyLevel, ZoneCatalog, ZoneType};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn fixed(id: &str, h: u32) -> Event {
        Event::fixed(
            id,
            "Meeting",
            Utc.with_ymd_and_hms(2024, 1, 2, h, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 2, h + 1, 0, 0).unwrap(),
        )
        .unwrap()
    }

    fn managed(id: &str, h: u32) -> Event {
        let interval = Interval::new(
            Utc.with_ymd_and_hms(2024, 1, 3, h, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 3, h + 1, 0, 0).unwrap(),
        )
        .unwrap();
        Event::managed(
            id,
            "Old block",
            interval,
            ManagedRef {
                task_id: "old".into(),
                chunk_index: 1,
                chunk_count: 1,
                zone: ZoneType::Deep,
                buffer_minutes: 15,
            },
        )
        .unwrap()
    }

    #[test]
    fn clean_keeps_fixed_and_drops_managed() {
        let events = vec![fixed("f1", 9), managed("m1", 9), fixed("f2", 14)];
        let plan = clean(&events);
        assert_eq!(plan.retained, vec![fixed("f1", 9), fixed("f2", 14)]);
        assert_eq!(plan.removed_ids(), vec!["m1"]);
    }

    #[test]
    fn clean_is_idempotent() {
        let events = vec![fixed("f1", 9), managed("m1", 9)];
        let once = clean(&events);
        let twice = clean(&once.retained);
        assert!(twice.removed.is_empty());
        assert_eq!(twice.retained, once.retained);
    }

    #[test]
    fn reschedule_ignores_previous_placements() {
        let scheduler = Scheduler::new(ZoneCatalog::default());
        let coordinator = RescheduleCoordinator::new(&scheduler);
        let horizon =
            PlanningHorizon::starting(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 21).unwrap();
        let tasks = vec![Task::new("t", "Essay", "p", 60, ZoneType::Deep, EnergyLevel::High)];

        let first = scheduler.schedule(&tasks, &horizon, &[]).unwrap();
        let calendar: Vec<Event> = first.events().cloned().collect();
        let again = coordinator.reschedule(&tasks, &horizon, &calendar).unwrap();

        assert_eq!(again.removed, vec!["tb-t-1"]);
        assert_eq!(again.schedule, first);
    }
}
