//! Buffer requirements between adjacent placements.

use chrono::Duration;

use crate::event::Event;
use crate::zone::{ZoneCatalog, ZoneType};

/// Computes idle gaps required around placements.
#[derive(Debug, Clone, Copy)]
pub struct BufferManager<'a> {
    catalog: &'a ZoneCatalog,
}

impl<'a> BufferManager<'a> {
    pub fn new(catalog: &'a ZoneCatalog) -> Self {
        Self { catalog }
    }

    fn zone_buffer(&self, zone: ZoneType) -> Duration {
        self.catalog
            .get(zone)
            .map(|z| z.buffer())
            .unwrap_or_else(Duration::zero)
    }

    /// Gap required between something in `prev` and a placement in `next`.
    ///
    /// Same zone uses that zone's buffer; a transition between two zone
    /// types uses the larger of both. When `prev` sits outside every zone
    /// the buffer of `next` applies.
    pub fn required_buffer(&self, prev: Option<ZoneType>, next: ZoneType) -> Duration {
        match prev {
            Some(prev) if prev == next => self.zone_buffer(next),
            Some(prev) => self.zone_buffer(prev).max(self.zone_buffer(next)),
            None => self.zone_buffer(next),
        }
    }

    /// The zone an existing event belongs to: its own for managed events,
    /// the zone covering its start for fixed ones.
    pub fn zone_of(&self, event: &Event) -> Option<ZoneType> {
        event
            .managed_ref()
            .map(|m| m.zone)
            .or_else(|| self.catalog.zone_at(event.start).map(|z| z.zone_type))
    }

    /// Buffer an existing event demands on both of its ends, regardless of
    /// what is placed next to it.
    pub fn own_buffer(&self, event: &Event) -> Duration {
        match event.managed_ref() {
            Some(m) => Duration::minutes(m.buffer_minutes),
            None => self
                .zone_of(event)
                .map(|z| self.zone_buffer(z))
                .unwrap_or_else(Duration::zero),
        }
    }

    /// Gap that must separate `event` from a new placement in `zone` for a
    /// task that itself demands `task_buffer`.
    pub fn gap_around(&self, event: &Event, zone: ZoneType, task_buffer: Duration) -> Duration {
        self.required_buffer(self.zone_of(event), zone)
            .max(self.own_buffer(event))
            .max(task_buffer)
    }

    /// Buffer a managed placement of a task in `zone` records on itself.
    pub fn placement_buffer(&self, zone: ZoneType, task_buffer: Duration) -> Duration {
        self.zone_buffer(zone).max(task_buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn same_zone_uses_zone_buffer() {
        let catalog = ZoneCatalog::default();
        let buffers = BufferManager::new(&catalog);
        assert_eq!(
            buffers.required_buffer(Some(ZoneType::Deep), ZoneType::Deep),
            Duration::minutes(15)
        );
        assert_eq!(
            buffers.required_buffer(Some(ZoneType::Admin), ZoneType::Admin),
            Duration::minutes(5)
        );
    }

    #[test]
    fn transition_uses_larger_buffer() {
        let catalog = ZoneCatalog::default();
        let buffers = BufferManager::new(&catalog);
        assert_eq!(
            buffers.required_buffer(Some(ZoneType::Admin), ZoneType::Deep),
            Duration::minutes(15)
        );
        assert_eq!(
            buffers.required_buffer(Some(ZoneType::Deep), ZoneType::Admin),
            Duration::minutes(15)
        );
        assert_eq!(
            buffers.required_buffer(Some(ZoneType::Light), ZoneType::Admin),
            Duration::minutes(10)
        );
    }

    #[test]
    fn outside_any_zone_uses_next_zone() {
        let catalog = ZoneCatalog::default();
        let buffers = BufferManager::new(&catalog);
        assert_eq!(buffers.required_buffer(None, ZoneType::Light), Duration::minutes(10));
    }

    #[test]
    fn fixed_event_inherits_zone_at_start() {
        let catalog = ZoneCatalog::default();
        let buffers = BufferManager::new(&catalog);
        let in_deep = Event::fixed(
            "f1",
            "Sync",
            Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap(),
        )
        .unwrap();
        let evening = Event::fixed(
            "f2",
            "Dinner",
            Utc.with_ymd_and_hms(2024, 1, 1, 19, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 1, 20, 0, 0).unwrap(),
        )
        .unwrap();
        assert_eq!(buffers.own_buffer(&in_deep), Duration::minutes(15));
        assert_eq!(buffers.own_buffer(&evening), Duration::zero());
        assert_eq!(
            buffers.gap_around(&evening, ZoneType::Admin, Duration::minutes(20)),
            Duration::minutes(20)
        );
    }
}
