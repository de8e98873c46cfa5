//! Time-of-day work zones.
//!
//! A zone is a named daily time range (Deep/Light/Admin) with an energy
//! level, a minimum placement duration, an interruption policy and a
//! buffer requirement. Zones are configuration: the [`ZoneCatalog`] is
//! built once, validated, and never mutated during a run.
//!
//! Zone times of day are interpreted in UTC.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::event::Interval;
use crate::horizon::{PlanningHorizon, MAX_SPAN_MINUTES};

/// Kind of work a zone is reserved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneType {
    /// Focused, uninterrupted work
    Deep,
    /// Shallow work that tolerates context switches
    Light,
    /// Email, paperwork, errands
    Admin,
}

impl fmt::Display for ZoneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoneType::Deep => write!(f, "deep"),
            ZoneType::Light => write!(f, "light"),
            ZoneType::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for ZoneType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "deep" => Ok(ZoneType::Deep),
            "light" => Ok(ZoneType::Light),
            "admin" => Ok(ZoneType::Admin),
            other => Err(ValidationError::invalid(
                "zone",
                format!("unknown zone type '{other}' (expected deep, light or admin)"),
            )),
        }
    }
}

/// Energy level a zone offers and a task requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyLevel {
    /// Low energy (e.g., end of day)
    Low,
    /// Medium energy
    Medium,
    /// High energy (e.g., morning)
    High,
}

impl fmt::Display for EnergyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnergyLevel::Low => write!(f, "low"),
            EnergyLevel::Medium => write!(f, "medium"),
            EnergyLevel::High => write!(f, "high"),
        }
    }
}

impl FromStr for EnergyLevel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(EnergyLevel::Low),
            "medium" => Ok(EnergyLevel::Medium),
            "high" => Ok(EnergyLevel::High),
            other => Err(ValidationError::invalid(
                "energy",
                format!("unknown energy level '{other}' (expected low, medium or high)"),
            )),
        }
    }
}

/// How many fixed commitments a zone occurrence tolerates before it is
/// considered interrupted and stops accepting placements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterruptionPolicy {
    /// No fixed event may intersect the occurrence.
    None,
    /// At most one fixed event may intersect the occurrence.
    Limited,
    /// Any number of fixed events.
    Flexible,
}

impl InterruptionPolicy {
    /// Maximum fixed intrusions per occurrence; `None` means unlimited.
    pub fn max_intrusions(&self) -> Option<usize> {
        match self {
            InterruptionPolicy::None => Some(0),
            InterruptionPolicy::Limited => Some(1),
            InterruptionPolicy::Flexible => None,
        }
    }

    pub fn admits(&self, intrusions: usize) -> bool {
        self.max_intrusions().map_or(true, |max| intrusions <= max)
    }
}

mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveTime::parse_from_str(&raw, "%H:%M").map_err(serde::de::Error::custom)
    }
}

/// Daily time range `[start, end)`, both as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

impl TimeRange {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, ValidationError> {
        if end <= start {
            return Err(ValidationError::invalid(
                "zone.range",
                format!("range {} must end after it starts", Self { start, end }),
            ));
        }
        Ok(Self { start, end })
    }

    /// Parse `"08:00-12:00"`.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let (start, end) = raw
            .split_once('-')
            .ok_or_else(|| ValidationError::invalid("zone.range", format!("expected HH:MM-HH:MM, got '{raw}'")))?;
        Self::new(parse_hhmm(start.trim())?, parse_hhmm(end.trim())?)
    }

    /// The concrete interval this range covers on `date`.
    pub fn on(&self, date: NaiveDate) -> Interval {
        Interval::span(at(date, self.start), at(date, self.end))
    }

    pub fn contains_time(&self, time: NaiveTime) -> bool {
        self.start <= time && time < self.end
    }

    fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && self.end > other.start
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

fn parse_hhmm(raw: &str) -> Result<NaiveTime, ValidationError> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .map_err(|e| ValidationError::invalid("zone.range", format!("'{raw}': {e}")))
}

fn at(date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(time))
}

/// A named work zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBlockZone {
    pub zone_type: ZoneType,
    pub ranges: Vec<TimeRange>,
    pub energy: EnergyLevel,
    /// Shortest placement the zone accepts.
    pub min_duration_minutes: i64,
    pub interruption: InterruptionPolicy,
    /// Idle gap required around placements in this zone.
    pub buffer_minutes: i64,
}

impl TimeBlockZone {
    pub fn min_duration(&self) -> Duration {
        Duration::minutes(self.min_duration_minutes)
    }

    pub fn buffer(&self) -> Duration {
        Duration::minutes(self.buffer_minutes)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let field = |name: &str| format!("zones.{}.{name}", self.zone_type);
        if self.ranges.is_empty() {
            return Err(ValidationError::invalid(field("ranges"), "at least one daily range is required"));
        }
        for range in &self.ranges {
            if range.end <= range.start {
                return Err(ValidationError::invalid(field("ranges"), format!("range {range} must end after it starts")));
            }
        }
        if self.min_duration_minutes <= 0 {
            return Err(ValidationError::invalid(field("min_duration_minutes"), "must be positive"));
        }
        if self.buffer_minutes < 0 {
            return Err(ValidationError::invalid(field("buffer_minutes"), "cannot be negative"));
        }
        for (name, minutes) in [
            ("min_duration_minutes", self.min_duration_minutes),
            ("buffer_minutes", self.buffer_minutes),
        ] {
            if minutes > MAX_SPAN_MINUTES {
                return Err(ValidationError::invalid(
                    field(name),
                    format!("{minutes} exceeds the {MAX_SPAN_MINUTES} min limit"),
                ));
            }
        }
        Ok(())
    }
}

/// One concrete occurrence of a zone on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneOccurrence {
    pub zone: ZoneType,
    pub interval: Interval,
}

/// Validated, immutable set of zones. At most one zone per [`ZoneType`];
/// no two daily ranges overlap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneCatalog {
    zones: Vec<TimeBlockZone>,
}

impl ZoneCatalog {
    pub fn new(zones: Vec<TimeBlockZone>) -> Result<Self, ValidationError> {
        let mut ranges: Vec<(TimeRange, ZoneType)> = Vec::new();
        for (i, zone) in zones.iter().enumerate() {
            zone.validate()?;
            if zones[..i].iter().any(|z| z.zone_type == zone.zone_type) {
                return Err(ValidationError::DuplicateId {
                    kind: "zone",
                    id: zone.zone_type.to_string(),
                });
            }
            for range in &zone.ranges {
                if let Some((other, other_zone)) = ranges.iter().find(|(r, _)| r.overlaps(range)) {
                    return Err(ValidationError::invalid(
                        "zones",
                        format!("{} range {range} overlaps {other_zone} range {other}", zone.zone_type),
                    ));
                }
                ranges.push((*range, zone.zone_type));
            }
        }
        Ok(Self { zones })
    }

    /// Deep mornings, Light early afternoon, Admin late afternoon.
    pub fn default_zones() -> Vec<TimeBlockZone> {
        let hm = |h: u32, m: u32| NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN);
        vec![
            TimeBlockZone {
                zone_type: ZoneType::Deep,
                ranges: vec![TimeRange { start: hm(8, 0), end: hm(12, 0) }],
                energy: EnergyLevel::High,
                min_duration_minutes: 60,
                interruption: InterruptionPolicy::None,
                buffer_minutes: 15,
            },
            TimeBlockZone {
                zone_type: ZoneType::Light,
                ranges: vec![TimeRange { start: hm(13, 0), end: hm(16, 0) }],
                energy: EnergyLevel::Medium,
                min_duration_minutes: 30,
                interruption: InterruptionPolicy::Limited,
                buffer_minutes: 10,
            },
            TimeBlockZone {
                zone_type: ZoneType::Admin,
                ranges: vec![TimeRange { start: hm(16, 0), end: hm(18, 0) }],
                energy: EnergyLevel::Low,
                min_duration_minutes: 15,
                interruption: InterruptionPolicy::Flexible,
                buffer_minutes: 5,
            },
        ]
    }

    pub fn zones(&self) -> &[TimeBlockZone] {
        &self.zones
    }

    pub fn get(&self, zone_type: ZoneType) -> Option<&TimeBlockZone> {
        self.zones.iter().find(|z| z.zone_type == zone_type)
    }

    /// Zones a task with these requirements may be placed in.
    pub fn eligible(&self, zone_type: ZoneType, energy: EnergyLevel) -> Option<&TimeBlockZone> {
        self.get(zone_type).filter(|z| z.energy == energy)
    }

    /// The zone whose daily range covers `instant`, if any.
    pub fn zone_at(&self, instant: DateTime<Utc>) -> Option<&TimeBlockZone> {
        let time = instant.time();
        self.zones
            .iter()
            .find(|z| z.ranges.iter().any(|r| r.contains_time(time)))
    }

    /// Every occurrence of `zone_type` within the horizon, in time order.
    pub fn occurrences(&self, zone_type: ZoneType, horizon: &PlanningHorizon) -> Vec<ZoneOccurrence> {
        let Some(zone) = self.get(zone_type) else {
            return Vec::new();
        };
        let mut ranges = zone.ranges.clone();
        ranges.sort_by_key(|r| r.start);
        horizon
            .days()
            .flat_map(|day| {
                ranges.iter().map(move |r| ZoneOccurrence {
                    zone: zone_type,
                    interval: r.on(day),
                })
            })
            .collect()
    }
}

impl Default for ZoneCatalog {
    fn default() -> Self {
        Self {
            zones: Self::default_zones(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn default_catalog_is_valid() {
        let catalog = ZoneCatalog::new(ZoneCatalog::default_zones()).unwrap();
        assert_eq!(catalog.zones().len(), 3);
        assert_eq!(catalog.get(ZoneType::Deep).unwrap().energy, EnergyLevel::High);
    }

    #[test]
    fn rejects_duplicate_zone_types() {
        let mut zones = ZoneCatalog::default_zones();
        let mut extra = zones[0].clone();
        extra.ranges = vec![TimeRange::new(hm(19, 0), hm(20, 0)).unwrap()];
        zones.push(extra);
        let err = ZoneCatalog::new(zones).unwrap_err();
        assert!(matches!(err, ValidationError::DuplicateId { kind: "zone", .. }));
    }

    #[test]
    fn rejects_overlapping_ranges_across_zones() {
        let mut zones = ZoneCatalog::default_zones();
        zones[1].ranges = vec![TimeRange::new(hm(11, 0), hm(14, 0)).unwrap()];
        assert!(ZoneCatalog::new(zones).is_err());
    }

    #[test]
    fn rejects_non_positive_minimum() {
        let mut zones = ZoneCatalog::default_zones();
        zones[2].min_duration_minutes = 0;
        assert!(ZoneCatalog::new(zones).is_err());
    }

    #[test]
    fn rejects_oversized_buffer() {
        let mut zones = ZoneCatalog::default_zones();
        zones[0].buffer_minutes = 1_000_000_000_000;
        assert!(ZoneCatalog::new(zones).is_err());
    }

    #[test]
    fn time_range_parse() {
        let range = TimeRange::parse("08:00-12:30").unwrap();
        assert_eq!(range.start, hm(8, 0));
        assert_eq!(range.end, hm(12, 30));
        assert!(TimeRange::parse("12:00-08:00").is_err());
        assert!(TimeRange::parse("noon").is_err());
    }

    #[test]
    fn zone_at_uses_half_open_ranges() {
        let catalog = ZoneCatalog::default();
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(catalog.zone_at(at(day, hm(8, 0))).map(|z| z.zone_type), Some(ZoneType::Deep));
        assert_eq!(catalog.zone_at(at(day, hm(12, 0))).map(|z| z.zone_type), None);
        assert_eq!(catalog.zone_at(at(day, hm(16, 0))).map(|z| z.zone_type), Some(ZoneType::Admin));
    }

    #[test]
    fn eligibility_requires_matching_energy() {
        let catalog = ZoneCatalog::default();
        assert!(catalog.eligible(ZoneType::Deep, EnergyLevel::High).is_some());
        assert!(catalog.eligible(ZoneType::Deep, EnergyLevel::Low).is_none());
    }

    #[test]
    fn occurrences_cover_every_horizon_day() {
        let catalog = ZoneCatalog::default();
        let horizon = PlanningHorizon::starting(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 21).unwrap();
        let occurrences = catalog.occurrences(ZoneType::Deep, &horizon);
        assert_eq!(occurrences.len(), 21);
        assert!(occurrences.windows(2).all(|w| w[0].interval.end < w[1].interval.start));
        assert_eq!(occurrences[0].interval.duration_minutes(), 240);
    }

    #[test]
    fn zone_serializes_ranges_as_hhmm() {
        let zone = &ZoneCatalog::default_zones()[0];
        let toml_str = toml::to_string(zone).unwrap();
        assert!(toml_str.contains("\"08:00\""));
        let parsed: TimeBlockZone = toml::from_str(&toml_str).unwrap();
        assert_eq!(&parsed, zone);
    }

    #[test]
    fn interruption_policy_limits() {
        assert!(InterruptionPolicy::None.admits(0));
        assert!(!InterruptionPolicy::None.admits(1));
        assert!(InterruptionPolicy::Limited.admits(1));
        assert!(!InterruptionPolicy::Limited.admits(2));
        assert!(InterruptionPolicy::Flexible.admits(40));
    }
}
