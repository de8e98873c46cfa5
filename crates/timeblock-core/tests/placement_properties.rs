//! Property tests for placement invariants over random workloads.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use timeblock_core::{
    EnergyLevel, Event, PlanningHorizon, ScheduleOutcome, ScheduleReport, Scheduler,
    StrategyKind, Task, ZoneCatalog, ZoneType,
};

fn horizon() -> PlanningHorizon {
    PlanningHorizon::starting(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 21).unwrap()
}

fn at(day: u32, quarter: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap() + Duration::minutes(i64::from(quarter) * 15)
}

fn zone_for(pick: u8) -> (ZoneType, EnergyLevel) {
    match pick % 3 {
        0 => (ZoneType::Deep, EnergyLevel::High),
        1 => (ZoneType::Light, EnergyLevel::Medium),
        _ => (ZoneType::Admin, EnergyLevel::Low),
    }
}

prop_compose! {
    fn arb_task(index: usize)(
        zone in 0u8..3,
        quarters in 1i64..=24,
        split in proptest::option::of((1i64..=4, 1u32..=4)),
        buffer in prop_oneof![Just(0i64), Just(10), Just(30)],
        sequence in 0u32..3,
        project in 0u8..2
    ) -> Task {
        let (zone, energy) = zone_for(zone);
        let minutes = quarters * 15;
        let task = Task::new(
            format!("t{index}"),
            format!("Task {index}"),
            format!("p{project}"),
            minutes,
            zone,
            energy,
        )
        .with_sequence(sequence)
        .with_buffer(buffer);
        match split {
            Some((min_quarters, max_splits)) => {
                task.splittable((min_quarters * 15).min(minutes), max_splits)
            }
            None => task,
        }
    }
}

fn arb_tasks() -> impl Strategy<Value = Vec<Task>> {
    (1usize..8).prop_flat_map(|n| (0..n).map(arb_task).collect::<Vec<_>>())
}

fn arb_events() -> impl Strategy<Value = Vec<Event>> {
    proptest::collection::vec((1u32..=21, 28u32..76, 1u32..=8), 0..12).prop_map(|slots| {
        slots
            .into_iter()
            .enumerate()
            .map(|(i, (day, start, len))| {
                Event::fixed(format!("f{i}"), "Busy", at(day, start), at(day, start + len)).unwrap()
            })
            .collect()
    })
}

fn arb_strategy() -> impl Strategy<Value = StrategyKind> {
    prop_oneof![Just(StrategyKind::GreedySequential), Just(StrategyKind::LatestFit)]
}

fn run(tasks: &[Task], events: &[Event], kind: StrategyKind) -> ScheduleReport {
    Scheduler::new(ZoneCatalog::default())
        .with_strategy_kind(kind)
        .schedule(tasks, &horizon(), events)
        .unwrap()
}

proptest! {
    #[test]
    fn managed_events_keep_their_buffers(
        tasks in arb_tasks(),
        events in arb_events(),
        kind in arb_strategy()
    ) {
        let report = run(&tasks, &events, kind);
        let placed: Vec<&Event> = report.events().collect();
        let all: Vec<&Event> = events.iter().chain(placed.iter().copied()).collect();

        for managed in &placed {
            let buffer = Duration::minutes(managed.managed_ref().unwrap().buffer_minutes);
            let guarded = managed.interval().expanded(buffer);
            for other in &all {
                if other.id == managed.id {
                    continue;
                }
                prop_assert!(
                    !guarded.overlaps(&other.interval()),
                    "{} {:?} crowds {} {:?}",
                    managed.id, managed.interval(), other.id, other.interval()
                );
            }
        }
    }

    #[test]
    fn outcomes_respect_task_shape(
        tasks in arb_tasks(),
        events in arb_events(),
        kind in arb_strategy()
    ) {
        let report = run(&tasks, &events, kind);
        prop_assert_eq!(report.outcomes.len(), tasks.len());

        for task in &tasks {
            let catalog = ZoneCatalog::default();
            let zone = catalog.get(task.zone).unwrap();
            match report.outcome(&task.id).unwrap() {
                ScheduleOutcome::Placed { events } => {
                    prop_assert_eq!(events.len(), 1);
                    prop_assert_eq!(events[0].duration_minutes(), task.duration_minutes);
                }
                ScheduleOutcome::Split { events, chunk_count } => {
                    prop_assert!(task.splittable);
                    prop_assert_eq!(*chunk_count as usize, events.len());
                    prop_assert!(*chunk_count <= task.max_splits);
                    let total: i64 = events.iter().map(|e| e.duration_minutes()).sum();
                    prop_assert_eq!(total, task.duration_minutes);
                    for (i, event) in events.iter().enumerate() {
                        prop_assert!(event.duration_minutes() >= task.min_chunk_minutes);
                        prop_assert!(event.duration_minutes() >= zone.min_duration_minutes);
                        let m = event.managed_ref().unwrap();
                        prop_assert_eq!(m.chunk_index as usize, i + 1);
                        prop_assert_eq!(m.chunk_count, *chunk_count);
                    }
                    prop_assert!(events.windows(2).all(|w| w[0].end <= w[1].start));
                }
                ScheduleOutcome::Failed(_) => {}
            }
            for event in report.outcome(&task.id).unwrap().events() {
                let date = event.start.date_naive();
                let inside = zone.ranges.iter().any(|r| r.on(date).contains(&event.interval()));
                prop_assert!(inside, "{} escapes its zone", event.id);
            }
        }
    }

    #[test]
    fn project_sequence_orders_placements(
        tasks in arb_tasks(),
        events in arb_events(),
        kind in arb_strategy()
    ) {
        let report = run(&tasks, &events, kind);
        for before in &tasks {
            for after in &tasks {
                if before.project_id != after.project_id || before.sequence >= after.sequence {
                    continue;
                }
                let earlier = report.outcome(&before.id).unwrap().events();
                let later = report.outcome(&after.id).unwrap().events();
                let (Some(end), Some(start)) = (
                    earlier.iter().map(|e| e.end).max(),
                    later.iter().map(|e| e.start).min(),
                ) else {
                    continue;
                };
                prop_assert!(
                    end <= start,
                    "{} (seq {}) ends {} after {} (seq {}) starts {}",
                    before.id, before.sequence, end, after.id, after.sequence, start
                );
            }
        }
    }

    #[test]
    fn scheduling_is_deterministic(
        tasks in arb_tasks(),
        events in arb_events(),
        kind in arb_strategy()
    ) {
        let first = serde_json::to_string(&run(&tasks, &events, kind)).unwrap();
        let second = serde_json::to_string(&run(&tasks, &events, kind)).unwrap();
        prop_assert_eq!(first, second);
    }
}
