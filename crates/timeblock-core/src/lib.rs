//! # Timeblock Core Library
//!
//! This library provides the scheduling engine behind the `timeblock` CLI.
//! It places tasks into a calendar that already holds fixed commitments,
//! producing managed events that respect work zones, energy levels,
//! buffers and splitting rules over a three-to-four-week horizon.
//!
//! ## Architecture
//!
//! - **Zones**: Static Deep/Light/Admin time-of-day definitions
//! - **Scheduler**: Sequence resolution, zone matching, conflict detection,
//!   task splitting and pluggable placement strategies
//! - **Integrations**: Task source and calendar store traits, with
//!   in-memory and JSON-file implementations
//! - **Planner**: Sync/Clean/Schedule/Reschedule over injected collaborators
//! - **Storage**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`Scheduler`]: Deterministic placement engine
//! - [`ZoneCatalog`]: Validated zone definitions
//! - [`Planner`]: Operational entry points
//! - [`Config`]: Application configuration management

pub mod error;
pub mod event;
pub mod horizon;
pub mod integrations;
pub mod planner;
pub mod scheduler;
pub mod storage;
pub mod task;
pub mod zone;

pub use error::{CollaboratorError, ConfigError, CoreError, CycleError, ValidationError};
pub use event::{Event, EventId, EventKind, Interval, ManagedRef};
pub use horizon::PlanningHorizon;
pub use integrations::{CalendarRecord, CalendarStore, JsonFileStore, MemoryCalendar, MemoryTaskSource, TaskSource};
pub use planner::{Operation, Planner, RunReport, Snapshot};
pub use scheduler::{
    Conflict, FailureReason, ScheduleOutcome, ScheduleReport, Scheduler, SchedulingFailure,
    SchedulingStrategy, StrategyKind,
};
pub use storage::Config;
pub use task::{Task, TaskId, TaskStatus};
pub use zone::{EnergyLevel, InterruptionPolicy, TimeBlockZone, TimeRange, ZoneCatalog, ZoneType};
