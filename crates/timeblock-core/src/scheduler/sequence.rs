//! Sequence resolution: one deterministic scheduling order for a task set.
//!
//! Kahn's topological sort over the dependency graph. Inside a project,
//! tasks rank by `(sequence, due date, id)`. Across projects, the ready
//! task whose project is most urgent goes first: each task carries the
//! earliest due date among itself and the tasks ranked after it in its
//! project, so a dated task pulls its undated predecessors forward with
//! it. Remaining ties fall to project id, then rank. Tasks without a due
//! date sort after those with one.
//!
//! Dependencies on ids outside the task set do not constrain the order.
//! The engine reports such tasks as `DependencyUnmet` when it reaches them.

use chrono::NaiveDate;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use crate::error::CycleError;
use crate::task::{Task, TaskId};

/// `(urgency, project, rank in project, id)`
type OrderKey<'a> = (NaiveDate, &'a str, usize, &'a str);

fn due(task: &Task) -> NaiveDate {
    task.due_date.unwrap_or(NaiveDate::MAX)
}

fn rank_key(task: &Task) -> (u32, NaiveDate, &str) {
    (task.sequence, due(task), task.id.as_str())
}

/// Urgency and in-project rank of every task, keyed by id.
fn project_ranks(tasks: &[Task]) -> HashMap<&str, (NaiveDate, usize)> {
    let mut projects: HashMap<&str, Vec<&Task>> = HashMap::new();
    for task in tasks {
        projects.entry(task.project_id.as_str()).or_default().push(task);
    }

    let mut ranks = HashMap::with_capacity(tasks.len());
    for members in projects.values_mut() {
        members.sort_by(|a, b| rank_key(a).cmp(&rank_key(b)));
        let mut urgency = NaiveDate::MAX;
        for (rank, task) in members.iter().enumerate().rev() {
            urgency = urgency.min(due(task));
            ranks.insert(task.id.as_str(), (urgency, rank));
        }
    }
    ranks
}

fn order_key<'a>(task: &'a Task, ranks: &HashMap<&str, (NaiveDate, usize)>) -> OrderKey<'a> {
    let (urgency, rank) = ranks
        .get(task.id.as_str())
        .copied()
        .unwrap_or((due(task), 0));
    (urgency, task.project_id.as_str(), rank, task.id.as_str())
}

/// Resolve the scheduling order of `tasks`, returning their ids.
pub fn resolve(tasks: &[Task]) -> Result<Vec<TaskId>, CycleError> {
    Ok(resolve_tasks(tasks)?
        .into_iter()
        .map(|t| t.id.clone())
        .collect())
}

/// Like [`resolve`], but returns references into `tasks`.
pub fn resolve_tasks(tasks: &[Task]) -> Result<Vec<&Task>, CycleError> {
    let by_id: HashMap<&str, &Task> = tasks.iter().map(|t| (t.id.as_str(), t)).collect();

    let mut indegree: HashMap<&str, usize> = by_id.keys().map(|id| (*id, 0)).collect();
    let mut dependents: HashMap<&str, Vec<&Task>> = HashMap::new();
    for task in tasks {
        for dep in task.dependencies.iter().filter(|d| by_id.contains_key(d.as_str())) {
            *indegree.entry(task.id.as_str()).or_default() += 1;
            dependents.entry(dep.as_str()).or_default().push(task);
        }
    }

    let ranks = project_ranks(tasks);
    let mut ready: BinaryHeap<Reverse<OrderKey<'_>>> = tasks
        .iter()
        .filter(|t| indegree.get(t.id.as_str()) == Some(&0))
        .map(|t| Reverse(order_key(t, &ranks)))
        .collect();

    let mut order = Vec::with_capacity(tasks.len());
    while let Some(Reverse((_, _, _, id))) = ready.pop() {
        let Some(task) = by_id.get(id) else { continue };
        order.push(*task);
        for dependent in dependents.get(id).into_iter().flatten() {
            if let Some(count) = indegree.get_mut(dependent.id.as_str()) {
                *count -= 1;
                if *count == 0 {
                    ready.push(Reverse(order_key(*dependent, &ranks)));
                }
            }
        }
    }

    if order.len() < tasks.len() {
        let mut task_ids: Vec<String> = indegree
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(id, _)| id.to_string())
            .collect();
        task_ids.sort();
        return Err(CycleError { task_ids });
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zone::{EnergyLevel, ZoneType};

    fn task(id: &str, project: &str, sequence: u32) -> Task {
        Task::new(id, id, project, 60, ZoneType::Light, EnergyLevel::Medium).with_sequence(sequence)
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn orders_by_sequence_within_project() {
        let tasks = vec![task("c", "p", 3), task("a", "p", 1), task("b", "p", 2)];
        assert_eq!(resolve(&tasks).unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn breaks_sequence_ties_by_due_date() {
        let tasks = vec![
            task("late", "p1", 1).with_due_date(date(20)),
            task("undated", "p3", 1),
            task("soon", "p2", 1).with_due_date(date(5)),
        ];
        assert_eq!(resolve(&tasks).unwrap(), vec!["soon", "late", "undated"]);
    }

    #[test]
    fn breaks_remaining_ties_by_project() {
        let tasks = vec![task("a", "p2", 1), task("b", "p1", 1), task("c", "p1", 2)];
        assert_eq!(resolve(&tasks).unwrap(), vec!["b", "c", "a"]);
    }

    #[test]
    fn earlier_due_date_wins_across_projects() {
        let tasks = vec![
            task("relaxed", "thesis", 1),
            task("urgent", "client", 3).with_due_date(date(1)),
        ];
        assert_eq!(resolve(&tasks).unwrap(), vec!["urgent", "relaxed"]);
    }

    #[test]
    fn due_date_pulls_project_predecessors_forward() {
        let tasks = vec![
            task("other", "p2", 1).with_due_date(date(10)),
            task("draft", "p1", 1),
            task("submit", "p1", 2).with_due_date(date(4)),
        ];
        assert_eq!(resolve(&tasks).unwrap(), vec!["draft", "submit", "other"]);
    }

    #[test]
    fn sequence_holds_within_project_despite_due_dates() {
        let tasks = vec![
            task("second", "p", 2).with_due_date(date(2)),
            task("first", "p", 1).with_due_date(date(9)),
        ];
        assert_eq!(resolve(&tasks).unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn dependencies_override_sequence() {
        let tasks = vec![
            task("first", "p", 1).with_dependency("setup"),
            task("setup", "q", 9),
        ];
        assert_eq!(resolve(&tasks).unwrap(), vec!["setup", "first"]);
    }

    #[test]
    fn unknown_dependencies_do_not_block_order() {
        let tasks = vec![task("a", "p", 1).with_dependency("gone")];
        assert_eq!(resolve(&tasks).unwrap(), vec!["a"]);
    }

    #[test]
    fn reports_cycle_members() {
        let tasks = vec![
            task("a", "p", 1).with_dependency("c"),
            task("b", "p", 2).with_dependency("a"),
            task("c", "p", 3).with_dependency("b"),
            task("free", "p", 4),
        ];
        let err = resolve(&tasks).unwrap_err();
        assert_eq!(err.task_ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn order_is_independent_of_input_order() {
        let mut tasks = vec![
            task("x", "p1", 2).with_due_date(date(9)),
            task("y", "p2", 1).with_due_date(date(3)),
            task("z", "p1", 1).with_dependency("y"),
        ];
        let first = resolve(&tasks).unwrap();
        tasks.reverse();
        assert_eq!(resolve(&tasks).unwrap(), first);
    }
}
