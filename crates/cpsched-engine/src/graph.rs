//! Topological ordering and cycle detection over the task-instance
//! predecessor graph.
//!
//! The generator and the CPM analyzer both need a topological order; this
//! module is the one place Kahn's algorithm is implemented, so both callers
//! observe identical cycle-detection behaviour.

use cpsched_core::{ScheduleError, TaskId, TaskInstance};
use std::collections::{HashMap, VecDeque};

/// Forward adjacency (`predecessor -> successors`) built once and reused by
/// both the topological sort and the CPM passes.
pub struct AdjacencyLists {
    pub successors: HashMap<TaskId, Vec<TaskId>>,
    pub in_degree: HashMap<TaskId, usize>,
}

pub fn build_adjacency(tasks: &[TaskInstance]) -> AdjacencyLists {
    let mut successors: HashMap<TaskId, Vec<TaskId>> =
        tasks.iter().map(|t| (t.id.clone(), Vec::new())).collect();
    let mut in_degree: HashMap<TaskId, usize> =
        tasks.iter().map(|t| (t.id.clone(), 0)).collect();

    for task in tasks {
        for pred in &task.predecessors {
            successors.entry(pred.clone()).or_default().push(task.id.clone());
            *in_degree.get_mut(&task.id).unwrap() += 1;
        }
    }

    AdjacencyLists { successors, in_degree }
}

/// Kahn's algorithm. Returns the topological order, or `GraphCycle` naming
/// every task that never reached in-degree zero.
pub fn topological_sort(tasks: &[TaskInstance]) -> Result<Vec<TaskId>, ScheduleError> {
    let adjacency = build_adjacency(tasks);
    topological_sort_with_adjacency(tasks, &adjacency)
}

pub fn topological_sort_with_adjacency(
    tasks: &[TaskInstance],
    adjacency: &AdjacencyLists,
) -> Result<Vec<TaskId>, ScheduleError> {
    let mut in_degree = adjacency.in_degree.clone();
    let mut queue: VecDeque<TaskId> = tasks
        .iter()
        .filter(|t| in_degree[&t.id] == 0)
        .map(|t| t.id.clone())
        .collect();
    // Deterministic order even among simultaneously-ready nodes.
    let mut queue: Vec<TaskId> = queue.drain(..).collect();
    queue.sort();
    let mut queue: VecDeque<TaskId> = queue.into();

    let mut order = Vec::with_capacity(tasks.len());
    while let Some(id) = queue.pop_front() {
        order.push(id.clone());
        if let Some(successors) = adjacency.successors.get(&id) {
            let mut newly_ready = Vec::new();
            for succ in successors {
                let deg = in_degree.get_mut(succ).unwrap();
                *deg -= 1;
                if *deg == 0 {
                    newly_ready.push(succ.clone());
                }
            }
            newly_ready.sort();
            for id in newly_ready {
                queue.push_back(id);
            }
        }
    }

    if order.len() != tasks.len() {
        let mut remaining: Vec<TaskId> =
            tasks.iter().map(|t| &t.id).filter(|id| !order.contains(id)).cloned().collect();
        remaining.sort();
        return Err(ScheduleError::GraphCycle(remaining));
    }

    Ok(order)
}

/// Verify every predecessor id referenced by a task instance exists in the
/// instance set. Run before the topological sort so a dangling reference is
/// reported as `MissingDependency`, not folded into a spurious cycle.
pub fn check_missing_dependencies(tasks: &[TaskInstance]) -> Result<(), ScheduleError> {
    let ids: std::collections::HashSet<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
    for task in tasks {
        for pred in &task.predecessors {
            if !ids.contains(pred.as_str()) {
                return Err(ScheduleError::MissingDependency {
                    task_id: task.id.clone(),
                    predecessor_id: pred.clone(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpsched_core::BaseTask;

    fn instance(id: &str, preds: &[&str]) -> TaskInstance {
        let base = BaseTask::new(id);
        let mut inst = TaskInstance::new(&base, "Z", 0);
        inst.id = id.to_string();
        inst.predecessors = preds.iter().map(|s| s.to_string()).collect();
        inst
    }

    #[test]
    fn sorts_a_simple_chain() {
        let tasks = vec![instance("a", &[]), instance("b", &["a"]), instance("c", &["b"])];
        let order = topological_sort(&tasks).unwrap();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn detects_a_cycle() {
        let tasks = vec![instance("a", &["b"]), instance("b", &["a"])];
        let err = topological_sort(&tasks).unwrap_err();
        assert!(matches!(err, ScheduleError::GraphCycle(ids) if ids.len() == 2));
    }

    #[test]
    fn reports_missing_dependency() {
        let tasks = vec![instance("a", &["ghost"])];
        let err = check_missing_dependencies(&tasks).unwrap_err();
        assert!(matches!(err, ScheduleError::MissingDependency { .. }));
    }

    #[test]
    fn diamond_dependency_orders_correctly() {
        let tasks = vec![
            instance("a", &[]),
            instance("b", &["a"]),
            instance("c", &["a"]),
            instance("d", &["b", "c"]),
        ];
        let order = topological_sort(&tasks).unwrap();
        let pos = |id: &str| order.iter().position(|x| x == id).unwrap();
        assert!(pos("a") < pos("b"));
        assert!(pos("a") < pos("c"));
        assert!(pos("b") < pos("d"));
        assert!(pos("c") < pos("d"));
    }
}
