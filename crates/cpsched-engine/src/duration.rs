//! Duration calculator (component C4).
//!
//! Turns a task plus an allocation (crew count, equipment units) into an
//! integer workday count. Missing quantities and missing productivity rates
//! are patched to `1.0` with a `tracing::warn!`, mirroring the source's
//! `logger.warning` calls in its duration helpers; a non-positive
//! productivity rate, by contrast, is the source's `raise ValueError` case
//! and becomes the hard [`ScheduleError::ProductivityZero`] here.

use cpsched_core::{PoolName, ScheduleError, SchedulingContext, TaskInstance, TaskType};
use std::collections::HashMap;

/// `0.98^(floor-1)`, applied for every floor above the ground floor.
const FLOOR_EXPERIENCE_BASE: f64 = 0.98;

fn resolve_quantity(ctx: &SchedulingContext, task: &TaskInstance) -> f64 {
    let raw = ctx
        .quantity_matrix
        .get(&task.base_id)
        .and_then(|by_floor| by_floor.get(&task.floor))
        .and_then(|by_zone| by_zone.get(&task.zone))
        .copied();

    let qty = match raw {
        Some(q) if q > 0.0 => q,
        Some(_) => {
            tracing::warn!(task_id = %task.id, "quantity is non-positive, defaulting to 1");
            1.0
        }
        None => {
            tracing::warn!(task_id = %task.id, base_id = %task.base_id, floor = task.floor, zone = %task.zone, "quantity missing, defaulting to 1");
            1.0
        }
    };
    qty
}

fn worker_productivity(ctx: &SchedulingContext, task: &TaskInstance) -> Result<f64, ScheduleError> {
    let pool = ctx.workers.get(&task.resource_type);
    let rate = pool.and_then(|p| p.productivity_rates.get(&task.base_id)).copied();
    match rate {
        Some(r) if r > 0.0 => Ok(r),
        Some(r) if r <= 0.0 => {
            let _ = r;
            Err(ScheduleError::ProductivityZero { task_id: task.id.clone() })
        }
        _ => {
            tracing::warn!(task_id = %task.id, pool = %task.resource_type, "worker productivity rate missing, defaulting to 1");
            Ok(1.0)
        }
    }
}

/// Productivity for the representative ("first") alternative of an equipment
/// choice. Efficiency is deliberately *not* folded in here: the pure-equipment
/// formula (`_calculate_equipment_duration` in the source) never applies it,
/// only the hybrid formula (`_calculate_hybrid_duration`) does.
fn equipment_productivity(
    ctx: &SchedulingContext,
    task: &TaskInstance,
    pool_name: &str,
) -> Result<f64, ScheduleError> {
    let pool = ctx.equipment.get(pool_name);
    let rate = pool.and_then(|p| p.productivity_rates.get(&task.base_id)).copied();
    match rate {
        Some(r) if r > 0.0 => Ok(r),
        Some(_) => Err(ScheduleError::ProductivityZero { task_id: task.id.clone() }),
        None => {
            tracing::warn!(task_id = %task.id, pool = %pool_name, "equipment productivity rate missing, defaulting to 1");
            Ok(1.0)
        }
    }
}

fn worker_raw_duration(ctx: &SchedulingContext, task: &TaskInstance, qty: f64, crews: u32) -> Result<f64, ScheduleError> {
    let rate = worker_productivity(ctx, task)?;
    Ok(qty / (crews as f64 * rate))
}

/// `apply_efficiency` is true only for the hybrid caller — see
/// [`equipment_productivity`].
fn equipment_raw_duration(
    ctx: &SchedulingContext,
    task: &TaskInstance,
    qty: f64,
    allocated: &HashMap<PoolName, u32>,
    apply_efficiency: bool,
) -> Result<f64, ScheduleError> {
    let Some((choice, _)) = task.min_equipment_needed.first() else {
        return Ok(f64::INFINITY);
    };
    let Some(representative) = choice.first() else {
        return Ok(f64::INFINITY);
    };
    let total_units: u32 = choice.members.iter().filter_map(|m| allocated.get(m)).sum();
    if total_units == 0 {
        return Ok(f64::INFINITY);
    }
    let mut rate = equipment_productivity(ctx, task, representative)?;
    if apply_efficiency {
        rate *= ctx.equipment.get(representative).map(|p| p.efficiency).unwrap_or(1.0);
    }
    Ok(qty / (total_units as f64 * rate))
}

/// Compute the integer workday duration for `task` under the given
/// allocation. `equipment` maps pool name to allocated units; pass an empty
/// map for purely-worker tasks.
pub fn compute_duration(
    ctx: &SchedulingContext,
    task: &TaskInstance,
    crews: u32,
    equipment: &HashMap<PoolName, u32>,
) -> Result<i64, ScheduleError> {
    if let Some(fixed) = task.base_duration {
        return Ok(fixed.ceil().max(1.0) as i64);
    }

    let qty = resolve_quantity(ctx, task);

    let mut d = match task.task_type {
        TaskType::Worker => worker_raw_duration(ctx, task, qty, crews.max(1))?,
        TaskType::Equipment => equipment_raw_duration(ctx, task, qty, equipment, false)?,
        TaskType::Hybrid => {
            let d_w = worker_raw_duration(ctx, task, qty, crews.max(1))?;
            let d_e = equipment_raw_duration(ctx, task, qty, equipment, true)?;
            d_w.max(d_e)
        }
    };

    let shift = ctx.shift_factor_for(&task.discipline);
    if shift > 0.0 {
        d /= shift;
    }

    if task.floor > 1 {
        d *= FLOOR_EXPERIENCE_BASE.powi(task.floor as i32 - 1);
    }

    if d.is_nan() || d.is_infinite() {
        return Err(ScheduleError::NonFiniteDuration { task_id: task.id.clone() });
    }

    if d <= 0.0 {
        tracing::warn!(task_id = %task.id, computed = d, "non-positive duration, defaulting to 1");
        d = 1.0;
    }

    Ok(d.ceil().max(1.0) as i64)
}
