//! Critical path analysis (component C3).
//!
//! A pure, re-entrant pass over a set of [`TaskInstance`]s: forward pass for
//! earliest start/finish, backward pass for latest start/finish, then float
//! as `latest_start - earliest_start`. Unlike the source this was adapted
//! from, every dependency here is plain finish-to-start with zero lag — the
//! construction scheduler's `delay` field is a calendar-day gap the
//! scheduler applies when it places a task, not a CPM-edge property, so
//! there is no dependency-type matrix to evaluate here.

use crate::graph::{build_adjacency, topological_sort_with_adjacency};
use cpsched_core::{ScheduleError, TaskId, TaskInstance};
use std::collections::HashMap;

/// One task's position in project-day coordinates (day 0 = project start).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CpmTiming {
    pub earliest_start: i64,
    pub earliest_finish: i64,
    pub latest_start: i64,
    pub latest_finish: i64,
    pub float: i64,
}

impl CpmTiming {
    pub fn is_critical(&self) -> bool {
        self.float == 0
    }
}

/// Durations in workdays, keyed by task id. The analyzer is duration-agnostic:
/// the caller supplies whatever the duration calculator produced.
pub type DurationMap = HashMap<TaskId, i64>;

/// Timings for every task, keyed by task id, plus the ids making up the
/// (longest, tie-broken by task id) critical path from a source to a sink.
#[derive(Debug)]
pub struct CpmResult {
    pub timings: HashMap<TaskId, CpmTiming>,
    pub critical_path: Vec<TaskId>,
}

/// Run the forward/backward pass only, without walking the critical chain.
/// The scheduler's priority pass runs this once per `schedule()` call and
/// only ever consumes `timings`, so it skips the chain walk `analyze` does
/// for its `critical_path` field.
fn compute_timings(
    tasks: &[TaskInstance],
    durations: &DurationMap,
) -> Result<(crate::graph::AdjacencyLists, HashMap<TaskId, CpmTiming>), ScheduleError> {
    let adjacency = build_adjacency(tasks);
    let order = topological_sort_with_adjacency(tasks, &adjacency)?;

    let by_id: HashMap<&TaskId, &TaskInstance> = tasks.iter().map(|t| (&t.id, t)).collect();
    let duration_of = |id: &str| durations.get(id).copied().unwrap_or(0);

    let mut earliest_start: HashMap<TaskId, i64> = HashMap::new();
    let mut earliest_finish: HashMap<TaskId, i64> = HashMap::new();

    for id in &order {
        let task = by_id[id];
        let es = task
            .predecessors
            .iter()
            .filter_map(|p| earliest_finish.get(p).copied())
            .max()
            .unwrap_or(0);
        let ef = es + duration_of(id);
        earliest_start.insert(id.clone(), es);
        earliest_finish.insert(id.clone(), ef);
    }

    let project_finish = earliest_finish.values().copied().max().unwrap_or(0);

    let mut latest_finish: HashMap<TaskId, i64> = HashMap::new();
    let mut latest_start: HashMap<TaskId, i64> = HashMap::new();

    for id in order.iter().rev() {
        let successors = adjacency.successors.get(id).cloned().unwrap_or_default();
        let lf = if successors.is_empty() {
            project_finish
        } else {
            successors.iter().filter_map(|s| latest_start.get(s).copied()).min().unwrap_or(project_finish)
        };
        let ls = lf - duration_of(id);
        latest_finish.insert(id.clone(), lf);
        latest_start.insert(id.clone(), ls);
    }

    let mut timings = HashMap::with_capacity(tasks.len());
    for id in &order {
        let es = earliest_start[id];
        let ef = earliest_finish[id];
        let ls = latest_start[id];
        let lf = latest_finish[id];
        let float = ls - es;
        // A negative float means the forward and backward passes disagree,
        // which can only happen if the graph or duration map is internally
        // inconsistent with what produced `order` — a bug, not a user error.
        debug_assert!(float >= 0, "negative float for task {id}: ls={ls} es={es}");
        timings.insert(id.clone(), CpmTiming { earliest_start: es, earliest_finish: ef, latest_start: ls, latest_finish: lf, float });
    }

    Ok((adjacency, timings))
}

/// Forward/backward pass plus timings only — what the scheduler's priority
/// pass actually needs. Rebuilds everything from scratch each call; callers
/// that need to re-analyze after a duration changes should simply call this
/// again rather than trying to patch stale timings.
pub fn timings_only(tasks: &[TaskInstance], durations: &DurationMap) -> Result<HashMap<TaskId, CpmTiming>, ScheduleError> {
    if tasks.is_empty() {
        return Ok(HashMap::new());
    }
    let (_, timings) = compute_timings(tasks, durations)?;
    Ok(timings)
}

/// Full analysis: timings plus the (longest, tie-broken) critical path from
/// a source to a sink. See [`timings_only`] for the cheaper variant.
pub fn analyze(tasks: &[TaskInstance], durations: &DurationMap) -> Result<CpmResult, ScheduleError> {
    if tasks.is_empty() {
        return Ok(CpmResult { timings: HashMap::new(), critical_path: Vec::new() });
    }

    let (adjacency, timings) = compute_timings(tasks, durations)?;
    let critical_path = longest_critical_chain(tasks, &adjacency, &timings);

    Ok(CpmResult { timings, critical_path })
}

/// Walk from every zero-float source to every zero-float sink, keeping the
/// chain with the latest finish; ties broken by lexicographically-smallest
/// task id at each step so the result is deterministic.
fn longest_critical_chain(
    tasks: &[TaskInstance],
    adjacency: &crate::graph::AdjacencyLists,
    timings: &HashMap<TaskId, CpmTiming>,
) -> Vec<TaskId> {
    let by_id: HashMap<&TaskId, &TaskInstance> = tasks.iter().map(|t| (&t.id, t)).collect();

    let mut sources: Vec<&TaskId> = tasks
        .iter()
        .map(|t| &t.id)
        .filter(|id| timings[*id].is_critical() && by_id[*id].predecessors.iter().all(|p| !timings[p].is_critical()))
        .collect();
    sources.sort();

    let mut best: Vec<TaskId> = Vec::new();
    let mut best_finish = i64::MIN;

    for source in sources {
        let mut chain = vec![source.clone()];
        let mut current = source;
        loop {
            let mut next_candidates: Vec<&TaskId> = adjacency
                .successors
                .get(current)
                .into_iter()
                .flatten()
                .filter(|s| timings[*s].is_critical())
                .collect();
            next_candidates.sort();
            match next_candidates.first() {
                Some(next) => {
                    chain.push((*next).clone());
                    current = next;
                }
                None => break,
            }
        }
        let finish = timings[chain.last().unwrap()].earliest_finish;
        if finish > best_finish {
            best_finish = finish;
            best = chain;
        }
    }

    best
}
