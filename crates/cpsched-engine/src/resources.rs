//! Worker and equipment resource managers (components C5, C6).
//!
//! Both managers hold nothing but a flat list of [`AllocationRecord`]s per
//! pool and answer `used`/`compute_allocation`/`allocate`/`release` against
//! that list — adapted from the interval-tracking style of the teacher's
//! resource-leveling pass, but restructured around reservation *during*
//! placement rather than post-hoc leveling.

use cpsched_core::{AllocationRecord, PoolName, SchedulingContext, TaskInstance, TaskType};
use chrono::NaiveDate;
use std::collections::HashMap;

/// Crew cap applied when neither a per-task nor a pool-wide maximum is
/// configured. Matches the source's legacy fallback exactly.
pub const DEFAULT_LEGACY_CREW_CAP: u32 = 25;

/// Holds every committed reservation, grouped by pool name.
#[derive(Default)]
pub struct ResourceLedger {
    records: HashMap<PoolName, Vec<AllocationRecord>>,
}

impl ResourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn used(&self, pool: &str, start: NaiveDate, end: NaiveDate) -> u32 {
        self.records
            .get(pool)
            .into_iter()
            .flatten()
            .filter(|r| r.overlaps(start, end))
            .map(|r| r.units)
            .sum()
    }

    pub fn allocate(&mut self, task_id: &str, pool: &str, units: u32, start: NaiveDate, end: NaiveDate) {
        self.records.entry(pool.to_string()).or_default().push(AllocationRecord {
            task_id: task_id.to_string(),
            pool_name: pool.to_string(),
            units,
            start,
            end,
        });
    }

    pub fn release(&mut self, task_id: &str) {
        for records in self.records.values_mut() {
            records.retain(|r| r.task_id != task_id);
        }
    }

    pub fn records_for(&self, pool: &str) -> &[AllocationRecord] {
        self.records.get(pool).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Result of a `compute_allocation` call: either a committable plan, or a
/// named failure. Mirrors the spec's "result-kind return" guidance — we
/// never throw for an ordinary allocation shortfall.
pub enum AllocationOutcome<T> {
    Ok(T),
    Fail,
}

/// `compute_allocation` for the worker manager. Returns 0 (via `Ok`) only
/// when the task isn't worker-driven at all; an unsatisfiable request is a
/// `Fail`, not a zero `Ok`, so callers can distinguish "not applicable" from
/// "couldn't fit".
pub fn compute_worker_allocation(
    ctx: &SchedulingContext,
    ledger: &ResourceLedger,
    task: &TaskInstance,
    start: NaiveDate,
    end: NaiveDate,
) -> AllocationOutcome<u32> {
    if task.task_type == TaskType::Equipment {
        return AllocationOutcome::Ok(0);
    }
    let Some(pool) = ctx.workers.get(&task.resource_type) else {
        return AllocationOutcome::Fail;
    };

    let available = pool.count.saturating_sub(ledger.used(&pool.name, start, end));
    let min_needed = task.min_crews_needed.max(1);
    let factor = ctx.acceleration_for(&task.discipline).factor;
    let candidate = (min_needed as f64 * factor).ceil() as u32;
    let cap = pool.max_crews.get(&task.base_id).copied().unwrap_or(DEFAULT_LEGACY_CREW_CAP);
    let candidate = candidate.min(cap);
    let allocated = candidate.min(available);

    if allocated < min_needed {
        AllocationOutcome::Fail
    } else {
        AllocationOutcome::Ok(allocated)
    }
}

struct EquipmentCandidate {
    pool_name: PoolName,
    allocatable: u32,
    hourly_rate: f64,
}

/// `compute_allocation` for the equipment manager: a two-stage min-cost then
/// balanced fill, run independently per requirement entry and unioned.
pub fn compute_equipment_allocation(
    ctx: &SchedulingContext,
    ledger: &ResourceLedger,
    task: &TaskInstance,
    start: NaiveDate,
    end: NaiveDate,
) -> AllocationOutcome<HashMap<PoolName, u32>> {
    if task.min_equipment_needed.is_empty() {
        return AllocationOutcome::Ok(HashMap::new());
    }

    let accel = ctx.acceleration_for(&task.discipline);
    let mut total: HashMap<PoolName, u32> = HashMap::new();

    for (choice, units) in &task.min_equipment_needed {
        let target = ((*units as f64 * accel.factor).ceil() as u32).min((*units as f64 * accel.max_multiplier) as u32);
        let min_required = *units;

        let mut candidates: Vec<EquipmentCandidate> = Vec::new();
        for member in &choice.members {
            let Some(pool) = ctx.equipment.get(member) else { continue };
            let used = ledger.used(member, start, end);
            let pool_cap = pool.count.saturating_sub(used);
            let task_cap = pool.max_equipment.get(&task.base_id).copied().unwrap_or(pool.count);
            let allocatable = pool_cap.min(task_cap);
            candidates.push(EquipmentCandidate { pool_name: member.clone(), allocatable, hourly_rate: pool.hourly_rate });
        }

        let total_allocatable: u32 = candidates.iter().map(|c| c.allocatable).sum();
        if total_allocatable == 0 && min_required >= 1 {
            return AllocationOutcome::Fail;
        }

        let mut remaining: HashMap<PoolName, u32> =
            candidates.iter().map(|c| (c.pool_name.clone(), c.allocatable)).collect();
        let mut drawn: HashMap<PoolName, u32> = HashMap::new();

        // Stage 1: meet the minimum, cheapest alternative first.
        let mut by_cost: Vec<&EquipmentCandidate> = candidates.iter().collect();
        by_cost.sort_by(|a, b| a.hourly_rate.partial_cmp(&b.hourly_rate).unwrap().then_with(|| a.pool_name.cmp(&b.pool_name)));

        let mut still_needed = min_required;
        for candidate in &by_cost {
            if still_needed == 0 {
                break;
            }
            let avail = remaining[&candidate.pool_name];
            let take = avail.min(still_needed);
            if take > 0 {
                *drawn.entry(candidate.pool_name.clone()).or_insert(0) += take;
                *remaining.get_mut(&candidate.pool_name).unwrap() -= take;
                still_needed -= take;
            }
        }
        if still_needed > 0 {
            return AllocationOutcome::Fail;
        }

        // Stage 2: pursue the accelerated target with a balanced composite key.
        let already_drawn: u32 = drawn.values().sum();
        let mut still_wanted = target.saturating_sub(already_drawn);
        if still_wanted > 0 {
            let mut by_balance: Vec<&EquipmentCandidate> = candidates.iter().collect();
            by_balance.sort_by(|a, b| {
                let key_a = 0.7 * a.hourly_rate - 0.3 * remaining[&a.pool_name] as f64;
                let key_b = 0.7 * b.hourly_rate - 0.3 * remaining[&b.pool_name] as f64;
                key_a.partial_cmp(&key_b).unwrap().then_with(|| a.pool_name.cmp(&b.pool_name))
            });
            for candidate in &by_balance {
                if still_wanted == 0 {
                    break;
                }
                let avail = remaining[&candidate.pool_name];
                let take = avail.min(still_wanted);
                if take > 0 {
                    *drawn.entry(candidate.pool_name.clone()).or_insert(0) += take;
                    *remaining.get_mut(&candidate.pool_name).unwrap() -= take;
                    still_wanted -= take;
                }
            }
        }

        for (pool, units) in drawn {
            *total.entry(pool).or_insert(0) += units;
        }
    }

    AllocationOutcome::Ok(total)
}

pub fn allocate_worker(ledger: &mut ResourceLedger, task: &TaskInstance, units: u32, start: NaiveDate, end: NaiveDate) {
    if units > 0 {
        ledger.allocate(&task.id, &task.resource_type, units, start, end);
    }
}

pub fn allocate_equipment(
    ledger: &mut ResourceLedger,
    task: &TaskInstance,
    allocation: &HashMap<PoolName, u32>,
    start: NaiveDate,
    end: NaiveDate,
) {
    for (pool, units) in allocation {
        if *units > 0 {
            ledger.allocate(&task.id, pool, *units, start, end);
        }
    }
}
