//! Zone matching: free windows inside eligible zone occurrences.

use chrono::Duration;

use super::buffer::BufferManager;
use super::conflict::ConflictDetector;
use crate::event::{Event, Interval};
use crate::horizon::PlanningHorizon;
use crate::task::Task;
use crate::zone::{ZoneCatalog, ZoneOccurrence, ZoneType};

/// A free interval inside one zone occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub interval: Interval,
    pub occurrence: ZoneOccurrence,
}

impl Window {
    pub fn zone(&self) -> ZoneType {
        self.occurrence.zone
    }

    pub fn duration(&self) -> Duration {
        self.interval.duration()
    }

    pub fn duration_minutes(&self) -> i64 {
        self.interval.duration_minutes()
    }

    /// The same occurrence with a narrower interval.
    pub(crate) fn narrowed(&self, interval: Interval) -> Window {
        Window {
            interval,
            occurrence: self.occurrence,
        }
    }
}

/// Finds candidate windows for a task.
#[derive(Debug, Clone, Copy)]
pub struct ZoneMatcher<'a> {
    catalog: &'a ZoneCatalog,
    detector: ConflictDetector<'a>,
    buffers: BufferManager<'a>,
}

impl<'a> ZoneMatcher<'a> {
    pub fn new(catalog: &'a ZoneCatalog) -> Self {
        Self {
            catalog,
            detector: ConflictDetector::new(catalog),
            buffers: BufferManager::new(catalog),
        }
    }

    /// Eligible occurrences of the task's zone that intersect `bounds`.
    pub fn occurrences(
        &self,
        task: &Task,
        horizon: &PlanningHorizon,
        bounds: Interval,
    ) -> Vec<ZoneOccurrence> {
        match self.catalog.eligible(task.zone, task.energy) {
            Some(zone) => self
                .catalog
                .occurrences(zone.zone_type, horizon)
                .into_iter()
                .filter(|occ| occ.interval.overlaps(&bounds))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Free windows for `task` in chronological order, each at least
    /// `min_length` and the zone's minimum duration long.
    ///
    /// Windows are computed one occurrence at a time, so callers that stop
    /// at the first usable window never look at the rest of the horizon.
    /// Windows never start within the required buffer of an existing event
    /// and never extend past `bounds`.
    pub fn candidate_windows<'s>(
        &'s self,
        task: &'s Task,
        horizon: &PlanningHorizon,
        events: &'s [Event],
        bounds: Interval,
        min_length: Duration,
    ) -> impl Iterator<Item = Window> + 's {
        let floor = self
            .catalog
            .get(task.zone)
            .map(|z| z.min_duration())
            .unwrap_or_else(Duration::zero)
            .max(min_length);
        let catalog: &'s ZoneCatalog = self.catalog;
        let matcher = ZoneMatcher::new(catalog);
        self.occurrences(task, horizon, bounds)
            .into_iter()
            .flat_map(move |occ| matcher.free_windows(task, occ, events, bounds))
            .filter(move |w| w.duration() >= floor)
    }

    /// Free sub-intervals of one occurrence. An occurrence whose
    /// interruption policy is exceeded yields nothing.
    pub fn free_windows(
        &self,
        task: &Task,
        occurrence: ZoneOccurrence,
        events: &[Event],
        bounds: Interval,
    ) -> Vec<Window> {
        let Some(area) = occurrence.interval.intersection(&bounds) else {
            return Vec::new();
        };
        if !self.detector.admits(&occurrence, events) {
            return Vec::new();
        }

        let mut blocked: Vec<Interval> = events
            .iter()
            .map(|e| {
                e.interval()
                    .expanded(self.buffers.gap_around(e, occurrence.zone, task.buffer()))
            })
            .filter(|b| b.overlaps(&area))
            .collect();
        blocked.sort();

        let mut windows = Vec::new();
        let mut cursor = area.start;
        for block in blocked {
            if block.start > cursor {
                windows.push(Interval::span(cursor, block.start));
            }
            cursor = cursor.max(block.end);
            if cursor >= area.end {
                break;
            }
        }
        if cursor < area.end {
            windows.push(Interval::span(cursor, area.end));
        }

        windows
            .into_iter()
            .map(|interval| Window {
                interval,
                occurrence,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zone::EnergyLevel;
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, h, m, 0).unwrap()
    }

    fn horizon() -> PlanningHorizon {
        PlanningHorizon::starting(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 21).unwrap()
    }

    fn light_task(minutes: i64) -> Task {
        Task::new("t", "Review", "p", minutes, ZoneType::Light, EnergyLevel::Medium)
    }

    #[test]
    fn empty_calendar_yields_whole_occurrences() {
        let catalog = ZoneCatalog::default();
        let matcher = ZoneMatcher::new(&catalog);
        let task = light_task(60);
        let h = horizon();
        let windows: Vec<Window> = matcher
            .candidate_windows(&task, &h, &[], h.interval(), task.duration())
            .collect();
        assert_eq!(windows.len(), 21);
        assert_eq!(windows[0].interval, Interval::span(at(1, 13, 0), at(1, 16, 0)));
        assert_eq!(windows[20].interval.start, at(21, 13, 0));
    }

    #[test]
    fn subtracts_events_with_buffers() {
        let catalog = ZoneCatalog::default();
        let matcher = ZoneMatcher::new(&catalog);
        let task = light_task(30);
        let h = horizon();
        let events = vec![Event::fixed("m", "Standup", at(1, 14, 0), at(1, 14, 30)).unwrap()];
        let windows: Vec<Interval> = matcher
            .candidate_windows(&task, &h, &events, h.interval(), task.duration())
            .take(2)
            .map(|w| w.interval)
            .collect();
        assert_eq!(
            windows,
            vec![
                Interval::span(at(1, 13, 0), at(1, 13, 50)),
                Interval::span(at(1, 14, 40), at(1, 16, 0)),
            ]
        );
    }

    #[test]
    fn drops_windows_shorter_than_requested() {
        let catalog = ZoneCatalog::default();
        let matcher = ZoneMatcher::new(&catalog);
        let task = light_task(60);
        let h = horizon();
        let events = vec![Event::fixed("m", "Standup", at(1, 14, 0), at(1, 14, 30)).unwrap()];
        let first = matcher
            .candidate_windows(&task, &h, &events, h.interval(), task.duration())
            .next()
            .unwrap();
        assert_eq!(first.interval, Interval::span(at(1, 14, 40), at(1, 16, 0)));
    }

    #[test]
    fn skips_interrupted_occurrences() {
        let catalog = ZoneCatalog::default();
        let matcher = ZoneMatcher::new(&catalog);
        let task = Task::new("t", "Essay", "p", 60, ZoneType::Deep, EnergyLevel::High);
        let h = horizon();
        let events = vec![Event::fixed("c", "Call", at(1, 11, 30), at(1, 12, 0)).unwrap()];
        let first = matcher
            .candidate_windows(&task, &h, &events, h.interval(), task.duration())
            .next()
            .unwrap();
        assert_eq!(first.interval.start, at(2, 8, 0));
    }

    #[test]
    fn respects_bounds() {
        let catalog = ZoneCatalog::default();
        let matcher = ZoneMatcher::new(&catalog);
        let task = light_task(60);
        let h = horizon();
        let bounds = Interval::span(at(3, 14, 0), at(5, 0, 0));
        let windows: Vec<Interval> = matcher
            .candidate_windows(&task, &h, &[], bounds, task.duration())
            .map(|w| w.interval)
            .collect();
        assert_eq!(
            windows,
            vec![
                Interval::span(at(3, 14, 0), at(3, 16, 0)),
                Interval::span(at(4, 13, 0), at(4, 16, 0)),
            ]
        );
    }

    #[test]
    fn energy_mismatch_yields_nothing() {
        let catalog = ZoneCatalog::default();
        let matcher = ZoneMatcher::new(&catalog);
        let task = Task::new("t", "Essay", "p", 60, ZoneType::Deep, EnergyLevel::Low);
        let h = horizon();
        assert_eq!(
            matcher
                .candidate_windows(&task, &h, &[], h.interval(), task.duration())
                .count(),
            0
        );
    }
}
