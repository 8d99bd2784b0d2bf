//! # cpsched-engine
//!
//! Scheduling algorithms for the cpsched construction scheduling engine:
//! task generation, critical path analysis, duration calculation, worker and
//! equipment resource management, and the priority list-scheduling loop.
//!
//! All domain types live in `cpsched-core`; this crate is algorithms only.
//!
//! ## Example
//!
//! ```rust,no_run
//! use cpsched_core::SchedulingContext;
//! use cpsched_engine::run_schedule;
//!
//! # fn build_context() -> SchedulingContext { unimplemented!() }
//! let ctx = build_context();
//! let schedule = run_schedule(&ctx).unwrap();
//! for task in &schedule.tasks {
//!     println!("{}: {} .. {}", task.id, task.start_date, task.end_date);
//! }
//! ```

pub mod cpm;
pub mod duration;
pub mod generator;
pub mod graph;
pub mod resources;
pub mod scheduler;

use cpsched_core::{Schedule, ScheduleError, SchedulingContext};

/// Run a complete scheduling pass: validate the context, generate task
/// instances, patch default quantities/productivities, check for cycles and
/// dangling predecessors, then place every task via the priority
/// list-scheduling loop.
pub fn run_schedule(ctx: &SchedulingContext) -> Result<Schedule, ScheduleError> {
    ctx.validate()?;

    let instances = generator::generate(ctx)?;

    let mut patched_ctx = ctx.clone();
    generator::patch_defaults(&mut patched_ctx, &instances);

    generator::validate(&instances)?;

    scheduler::schedule(&patched_ctx, instances, scheduler::DEFAULT_ATTEMPT_CAP)
}
