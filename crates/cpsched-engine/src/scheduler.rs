//! Priority list-scheduling main loop (component C6).
//!
//! Computes a priority order once via a minimum-resource CPM pass, then
//! places tasks one at a time in that order, retrying day-by-day on
//! resource contention up to a per-task attempt cap.

use crate::cpm::{self, CpmTiming};
use crate::duration;
use crate::resources::{self, AllocationOutcome, ResourceLedger};
use chrono::NaiveDate;
use cpsched_core::{PoolName, Schedule, ScheduleError, ScheduledTask, TaskId, TaskInstance};
use std::collections::{HashMap, HashSet};

/// The source uses 10,000 total scheduling attempts and 3,000 forward-search
/// attempts per task; this implementation keeps a single per-task cap.
pub const DEFAULT_ATTEMPT_CAP: u32 = 3000;

fn next_workday(calendar: &cpsched_core::Calendar, mut date: NaiveDate) -> NaiveDate {
    while !calendar.is_workday(date) {
        date = date.succ_opt().expect("date arithmetic does not overflow within a scheduling horizon");
    }
    date
}

fn min_equipment_allocation(task: &TaskInstance) -> HashMap<PoolName, u32> {
    task.min_equipment_needed
        .iter()
        .filter_map(|(choice, units)| choice.first().map(|name| (name.to_string(), *units)))
        .collect()
}

fn priority_durations(
    ctx: &cpsched_core::SchedulingContext,
    tasks: &[TaskInstance],
) -> Result<HashMap<TaskId, i64>, ScheduleError> {
    let mut durations = HashMap::with_capacity(tasks.len());
    for task in tasks {
        let equipment = min_equipment_allocation(task);
        let d = duration::compute_duration(ctx, task, task.min_crews_needed.max(1), &equipment)?;
        durations.insert(task.id.clone(), d);
    }
    Ok(durations)
}

struct PriorityTable {
    timings: HashMap<TaskId, CpmTiming>,
}

impl PriorityTable {
    /// `(float, earliest_start, id)` ascending — critical first, earlier
    /// first, id as the final deterministic tie-break.
    fn key<'a>(&self, id: &'a str) -> (i64, i64, &'a str) {
        let t = &self.timings[id];
        (t.float, t.earliest_start, id)
    }
}

fn pick_best(ready: &HashSet<TaskId>, table: &PriorityTable) -> TaskId {
    ready.iter().min_by_key(|id| table.key(id)).cloned().expect("ready set is non-empty")
}

/// Run the full placement loop. `tasks` must already be validated (no
/// missing predecessors, no cycle) and carry resolved instance-level
/// predecessor ids.
pub fn schedule(
    ctx: &cpsched_core::SchedulingContext,
    mut tasks: Vec<TaskInstance>,
    attempt_cap: u32,
) -> Result<Schedule, ScheduleError> {
    let calendar = ctx.calendar();

    let priority_duration_map = priority_durations(ctx, &tasks)?;
    let timings = cpm::timings_only(&tasks, &priority_duration_map)?;
    let table = PriorityTable { timings };

    let by_index: HashMap<TaskId, usize> = tasks.iter().enumerate().map(|(i, t)| (t.id.clone(), i)).collect();
    let mut successors: HashMap<TaskId, Vec<TaskId>> = tasks.iter().map(|t| (t.id.clone(), Vec::new())).collect();
    for task in &tasks {
        for pred in &task.predecessors {
            successors.entry(pred.clone()).or_default().push(task.id.clone());
        }
    }

    let mut scheduled: HashSet<TaskId> = HashSet::new();
    let mut ready: HashSet<TaskId> = tasks.iter().filter(|t| t.predecessors.is_empty()).map(|t| t.id.clone()).collect();
    let mut ledger = ResourceLedger::new();

    while scheduled.len() < tasks.len() {
        let chosen_id = pick_best(&ready, &table);
        ready.remove(&chosen_id);

        let idx = by_index[&chosen_id];
        let earliest = {
            let task = &tasks[idx];
            let from_preds = task
                .predecessors
                .iter()
                .map(|p| {
                    let pred = &tasks[by_index[p]];
                    let end = pred.end_date.expect("predecessor already scheduled");
                    calendar.add_calendar_days(end, task.delay)
                })
                .max();
            from_preds.unwrap_or(ctx.start_date)
        };

        let mut start = next_workday(&calendar, earliest);
        let mut attempt = 0u32;
        let (final_start, final_end, crews, equipment) = loop {
            if attempt >= attempt_cap {
                let task = &tasks[idx];
                return Err(ScheduleError::AllocationStarved {
                    task_id: task.id.clone(),
                    last_start: start,
                    last_end: start,
                });
            }

            let task = &tasks[idx];
            let min_equipment = min_equipment_allocation(task);
            let d_min = duration::compute_duration(ctx, task, task.min_crews_needed.max(1), &min_equipment)?;
            let tentative_end = calendar.add_workdays(start, d_min as u32);

            let worker_outcome = resources::compute_worker_allocation(ctx, &ledger, task, start, tentative_end);
            let equipment_outcome = resources::compute_equipment_allocation(ctx, &ledger, task, start, tentative_end);

            let (crews, equipment) = match (worker_outcome, equipment_outcome) {
                (AllocationOutcome::Ok(c), AllocationOutcome::Ok(e)) => (c, e),
                _ => {
                    attempt += 1;
                    start = next_workday(&calendar, start.succ_opt().unwrap());
                    continue;
                }
            };

            let d_actual = duration::compute_duration(ctx, task, crews.max(1), &equipment)?;
            let actual_end = calendar.add_workdays(start, d_actual as u32);

            if actual_end > tentative_end {
                let worker_recheck = resources::compute_worker_allocation(ctx, &ledger, task, start, actual_end);
                let equipment_recheck = resources::compute_equipment_allocation(ctx, &ledger, task, start, actual_end);
                match (worker_recheck, equipment_recheck) {
                    (AllocationOutcome::Ok(c2), AllocationOutcome::Ok(e2)) => {
                        break (start, actual_end, c2, e2);
                    }
                    _ => {
                        attempt += 1;
                        start = next_workday(&calendar, start.succ_opt().unwrap());
                        continue;
                    }
                }
            }

            break (start, actual_end, crews, equipment);
        };

        {
            let task = &mut tasks[idx];
            resources::allocate_worker(&mut ledger, task, crews, final_start, final_end);
            resources::allocate_equipment(&mut ledger, task, &equipment, final_start, final_end);
            task.start_date = Some(final_start);
            task.end_date = Some(final_end);
            task.allocated_crews = Some(crews);
            task.allocated_equipments = Some(equipment);
        }

        scheduled.insert(chosen_id.clone());
        for succ in &successors[&chosen_id] {
            let succ_task = &tasks[by_index[succ]];
            if succ_task.predecessors.iter().all(|p| scheduled.contains(p)) {
                ready.insert(succ.clone());
            }
        }
    }

    let mut scheduled_tasks: Vec<ScheduledTask> = tasks
        .iter()
        .map(|t| {
            let timing = &table.timings[&t.id];
            ScheduledTask {
                id: t.id.clone(),
                base_id: t.base_id.clone(),
                name: t.name.clone(),
                discipline: t.discipline.clone(),
                sub_discipline: t.sub_discipline.clone(),
                zone: t.zone.clone(),
                floor: t.floor,
                start_date: t.start_date.expect("every task was placed"),
                end_date: t.end_date.expect("every task was placed"),
                allocated_crews: t.allocated_crews.unwrap_or(0),
                allocated_equipments: t.allocated_equipments.clone().unwrap_or_default(),
                earliest_start: timing.earliest_start,
                earliest_finish: timing.earliest_finish,
                latest_start: timing.latest_start,
                latest_finish: timing.latest_finish,
                float: timing.float,
            }
        })
        .collect();

    scheduled_tasks.sort_by(|a, b| a.id.cmp(&b.id));

    Ok(Schedule { tasks: scheduled_tasks })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpsched_core::{AccelerationPolicy, BaseTask, WorkerPool};
    use std::collections::HashSet as StdHashSet;

    fn base_ctx(start: NaiveDate) -> cpsched_core::SchedulingContext {
        cpsched_core::SchedulingContext {
            base_tasks: HashMap::new(),
            zone_floors: HashMap::new(),
            quantity_matrix: HashMap::new(),
            workers: HashMap::new(),
            equipment: HashMap::new(),
            start_date: start,
            holidays: Vec::new(),
            workweek: vec![0, 1, 2, 3, 4],
            cross_floor_links: HashMap::new(),
            acceleration: HashMap::from([("default".to_string(), AccelerationPolicy::default())]),
            shift_config: HashMap::from([("default".to_string(), 1.0)]),
            discipline_zone_cfg: HashMap::new(),
            ground_disciplines: StdHashSet::new(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn single_fixed_duration_task_starts_on_project_start() {
        let mut ctx = base_ctx(date(2024, 1, 1));
        ctx.workers.insert("crew".into(), WorkerPool::new("crew", 1));
        let base = BaseTask::new("T").resource_type("crew").base_duration(3.0).min_crews_needed(1);
        let task = TaskInstance::new(&base, "Z", 0);
        let schedule = schedule(&ctx, vec![task], DEFAULT_ATTEMPT_CAP).unwrap();
        let t = schedule.get("T-F0-Z").unwrap();
        assert_eq!(t.start_date, date(2024, 1, 1));
        assert_eq!(t.end_date, date(2024, 1, 4));
        assert_eq!(t.allocated_crews, 1);
    }

    #[test]
    fn sequential_tasks_respect_calendar_delay() {
        let mut ctx = base_ctx(date(2024, 1, 1));
        ctx.workers.insert("crew".into(), WorkerPool::new("crew", 1));
        let base_a = BaseTask::new("A").resource_type("crew").base_duration(2.0).min_crews_needed(1);
        let mut a = TaskInstance::new(&base_a, "Z", 0);
        a.id = "A-F0-Z".into();

        let base_b = BaseTask::new("B").resource_type("crew").base_duration(2.0).min_crews_needed(1).delay(3);
        let mut b = TaskInstance::new(&base_b, "Z", 0);
        b.id = "B-F0-Z".into();
        b.predecessors = vec!["A-F0-Z".into()];

        let schedule = schedule(&ctx, vec![a, b], DEFAULT_ATTEMPT_CAP).unwrap();
        let a_out = schedule.get("A-F0-Z").unwrap();
        let b_out = schedule.get("B-F0-Z").unwrap();
        assert_eq!(a_out.end_date, date(2024, 1, 3));
        // end(A) + 3 calendar days = Jan 6 (Sat), next workday Mon Jan 8.
        assert_eq!(b_out.start_date, date(2024, 1, 8));
        assert_eq!(b_out.end_date, date(2024, 1, 10));
    }

    #[test]
    fn resource_contention_serialises_three_tasks() {
        let mut ctx = base_ctx(date(2024, 1, 1));
        ctx.workers.insert("crew".into(), WorkerPool::new("crew", 1));
        let mut tasks = Vec::new();
        for name in ["A", "B", "C"] {
            let base = BaseTask::new(name).resource_type("crew").base_duration(1.0).min_crews_needed(1);
            let mut inst = TaskInstance::new(&base, "Z", 0);
            inst.id = format!("{name}-F0-Z");
            tasks.push(inst);
        }
        let schedule = schedule(&ctx, tasks, DEFAULT_ATTEMPT_CAP).unwrap();
        let mut starts: Vec<NaiveDate> = schedule.tasks.iter().map(|t| t.start_date).collect();
        starts.sort();
        assert_eq!(starts, vec![date(2024, 1, 1), date(2024, 1, 2), date(2024, 1, 3)]);
    }
}
