//! Splitting a task into chunks across several windows.
//!
//! Chunk size aims at an even spread: `ceil(duration / max_splits)`, never
//! below the task's minimum chunk. The largest windows are used first. A
//! chunk never leaves a remainder smaller than the minimum chunk, and the
//! last permitted chunk must absorb everything that is left.

use chrono::Duration;

use super::buffer::BufferManager;
use super::matcher::Window;
use super::strategy::Anchor;
use crate::event::Interval;
use crate::task::Task;
use crate::zone::{ZoneCatalog, ZoneOccurrence};

/// One planned chunk, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedChunk {
    pub index: u32,
    pub interval: Interval,
    pub occurrence: ZoneOccurrence,
}

/// Chunks covering the full task duration, in chronological order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPlan {
    pub chunks: Vec<PlannedChunk>,
}

impl SplitPlan {
    pub fn chunk_count(&self) -> u32 {
        self.chunks.len() as u32
    }

    pub fn total_minutes(&self) -> i64 {
        self.chunks.iter().map(|c| c.interval.duration_minutes()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitDecision {
    Plan(SplitPlan),
    NotSplittable,
    /// Windows ran out (or the chunk limit was reached) with work left.
    Infeasible {
        allocated_chunks: u32,
        remaining_minutes: i64,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct TaskSplitter<'a> {
    catalog: &'a ZoneCatalog,
    buffers: BufferManager<'a>,
}

impl<'a> TaskSplitter<'a> {
    pub fn new(catalog: &'a ZoneCatalog) -> Self {
        Self {
            catalog,
            buffers: BufferManager::new(catalog),
        }
    }

    /// Plan chunks for `task` over free `windows`.
    pub fn plan(&self, task: &Task, windows: &[Window], anchor: Anchor) -> SplitDecision {
        if !task.splittable {
            return SplitDecision::NotSplittable;
        }

        let max_splits = i64::from(task.max_splits.max(1));
        let min_chunk = task.min_chunk_minutes;
        let target = min_chunk.max((task.duration_minutes + max_splits - 1) / max_splits);

        let mut pool: Vec<Window> = windows.to_vec();
        let mut chunks: Vec<(Interval, ZoneOccurrence)> = Vec::new();
        let mut remaining = task.duration_minutes;

        while remaining > 0 && (chunks.len() as i64) < max_splits {
            let Some(pos) = pick(&pool, anchor) else { break };
            let window = pool.swap_remove(pos);

            let zone_min = self
                .catalog
                .get(window.zone())
                .map(|z| z.min_duration_minutes)
                .unwrap_or(0);
            let floor = min_chunk.max(zone_min);
            let last_slot = chunks.len() as i64 + 1 == max_splits;

            let Some(size) = chunk_size(
                remaining,
                window.duration_minutes(),
                target,
                floor,
                min_chunk,
                last_slot,
            ) else {
                continue;
            };

            let interval = anchor.place(&window.interval, Duration::minutes(size));
            chunks.push((interval, window.occurrence));
            remaining -= size;

            let gap = self.buffers.placement_buffer(window.zone(), task.buffer());
            let before = Interval::span(window.interval.start, interval.start - gap);
            let after = Interval::span(interval.end + gap, window.interval.end);
            for rest in [before, after] {
                if rest.duration_minutes() >= floor {
                    pool.push(window.narrowed(rest));
                }
            }
        }

        if remaining > 0 {
            return SplitDecision::Infeasible {
                allocated_chunks: chunks.len() as u32,
                remaining_minutes: remaining,
            };
        }

        chunks.sort_by_key(|(interval, _)| *interval);
        SplitDecision::Plan(SplitPlan {
            chunks: chunks
                .into_iter()
                .enumerate()
                .map(|(i, (interval, occurrence))| PlannedChunk {
                    index: i as u32 + 1,
                    interval,
                    occurrence,
                })
                .collect(),
        })
    }
}

/// Largest window; ties go to the earliest start when anchoring at the
/// start and to the latest when anchoring at the end.
fn pick(pool: &[Window], anchor: Anchor) -> Option<usize> {
    pool.iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| {
            a.duration().cmp(&b.duration()).then_with(|| match anchor {
                Anchor::Start => b.interval.start.cmp(&a.interval.start),
                Anchor::End => a.interval.start.cmp(&b.interval.start),
            })
        })
        .map(|(i, _)| i)
}

/// Minutes to allocate from a window of `available` minutes, or `None` if
/// the window cannot host a valid chunk.
fn chunk_size(
    remaining: i64,
    available: i64,
    target: i64,
    floor: i64,
    min_chunk: i64,
    last_slot: bool,
) -> Option<i64> {
    if available < floor {
        return None;
    }
    if last_slot {
        return (remaining <= available && remaining >= floor).then_some(remaining);
    }

    let mut size = remaining.min(available).min(target);
    let leftover = remaining - size;
    if leftover > 0 && leftover < min_chunk {
        size = if remaining <= available {
            remaining
        } else {
            remaining - min_chunk
        };
    }
    (size >= floor).then_some(size)
}
