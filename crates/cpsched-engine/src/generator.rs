//! Task instance generator (component C2).
//!
//! Expands the base-task catalogue across the zone/floor grid into concrete
//! [`TaskInstance`]s and resolves every instance's predecessor list from the
//! five sources named in the design: same-floor, predefined cross-floor
//! links, user-configured cross-floor offsets, the vertical self-chain, and
//! cross-zone group sequencing.

use cpsched_core::{
    AppliesToFloors, BaseTask, ScheduleError, SchedulingContext, TaskId, TaskInstance, Zone,
    ZoneGroupStrategy,
};
use std::collections::{HashMap, HashSet};

fn floor_range(ctx: &SchedulingContext, base: &BaseTask, max_floor: u32) -> Vec<u32> {
    match base.applies_to_floors {
        AppliesToFloors::GroundOnly => vec![0],
        AppliesToFloors::AboveGround => (1..=max_floor).collect(),
        AppliesToFloors::AllFloors => (0..=max_floor).collect(),
        AppliesToFloors::Auto => {
            if ctx.ground_disciplines.contains(&base.discipline) {
                vec![0]
            } else if base.repeat_on_floor {
                (1..=max_floor).collect()
            } else {
                vec![1.min(max_floor)]
            }
        }
    }
}

fn instance_id(base_id: &str, floor: u32, zone: &str) -> TaskId {
    format!("{base_id}-F{floor}-{zone}")
}

struct Catalogue<'a> {
    by_id: HashMap<&'a str, &'a BaseTask>,
}

impl<'a> Catalogue<'a> {
    fn build(ctx: &'a SchedulingContext) -> Self {
        let by_id = ctx
            .base_tasks
            .values()
            .flatten()
            .filter(|t| t.included)
            .map(|t| (t.id.as_str(), t))
            .collect();
        Self { by_id }
    }

    fn get(&self, id: &str) -> Option<&'a BaseTask> {
        self.by_id.get(id).copied()
    }
}

/// Generate every task instance and resolve its predecessor list. Validation
/// (missing predecessors, cycles, quantity/productivity patching) is the
/// caller's responsibility — see [`validate`].
pub fn generate(ctx: &SchedulingContext) -> Result<Vec<TaskInstance>, ScheduleError> {
    let catalogue = Catalogue::build(ctx);

    // Pass 1: materialise every valid (base, zone, floor) instance.
    let mut instances: Vec<TaskInstance> = Vec::new();
    let mut ids: HashSet<TaskId> = HashSet::new();

    let mut sorted_bases: Vec<&BaseTask> = catalogue.by_id.values().copied().collect();
    sorted_bases.sort_by(|a, b| a.id.cmp(&b.id));

    let mut sorted_zones: Vec<(&Zone, &u32)> = ctx.zone_floors.iter().collect();
    sorted_zones.sort_by(|a, b| a.0.cmp(b.0));

    for base in &sorted_bases {
        for (zone, max_floor) in &sorted_zones {
            for floor in floor_range(ctx, base, **max_floor) {
                let id = instance_id(&base.id, floor, zone);
                if ids.insert(id.clone()) {
                    let mut inst = TaskInstance::new(base, (*zone).clone(), floor);
                    inst.id = id;
                    instances.push(inst);
                }
            }
        }
    }

    // Pass 2: resolve predecessors now that every valid id is known.
    for inst in &mut instances {
        let Some(base) = catalogue.get(&inst.base_id) else { continue };
        let mut preds: HashSet<TaskId> = HashSet::new();

        // Same-floor predecessors.
        for pred_id in &base.predecessors {
            let Some(pred_base) = catalogue.get(pred_id) else { continue };
            let floor = if ctx.ground_disciplines.contains(&pred_base.discipline) { 0 } else { inst.floor };
            preds.insert(instance_id(pred_id, floor, &inst.zone));
        }

        // Predefined cross-floor links.
        if inst.floor > 0 {
            if let Some(linked) = ctx.cross_floor_links.get(&inst.base_id) {
                for pred_id in linked {
                    preds.insert(instance_id(pred_id, inst.floor - 1, &inst.zone));
                }
            }
        }

        // User-configured cross-floor dependencies.
        let max_floor = ctx.zone_floors.get(&inst.zone).copied().unwrap_or(0);
        for dep in &base.cross_floor_dependencies {
            let target = inst.floor as i64 + dep.floor_offset as i64;
            if target < 0 || target > max_floor as i64 {
                continue;
            }
            preds.insert(instance_id(&dep.task_id, target as u32, &inst.zone));
        }

        // Vertical self-chain.
        if inst.floor > 0 && base.cross_floor_repetition {
            preds.insert(instance_id(&inst.base_id, inst.floor - 1, &inst.zone));
        }

        // Cross-zone sequencing under group_sequential.
        if let Some(policy) = ctx.discipline_zone_cfg.get(&inst.discipline) {
            if policy.strategy == ZoneGroupStrategy::GroupSequential {
                if let Some(group_idx) = policy.group_of(&inst.zone) {
                    if group_idx > 0 {
                        for other_zone in &policy.zone_groups[group_idx - 1] {
                            preds.insert(instance_id(&inst.base_id, inst.floor, other_zone));
                        }
                    }
                }
            }
        }

        // Drop self-references and anything not in the generated instance set.
        preds.remove(&inst.id);
        preds.retain(|p| ids.contains(p));

        let mut preds: Vec<TaskId> = preds.into_iter().collect();
        preds.sort();
        inst.predecessors = preds;
    }

    instances.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(instances)
}

/// Materialise default quantity (1) and productivity (1) entries for any
/// `(base_id, floor, zone)` / `(pool, base_id)` pair the task set requires
/// but the input left unpopulated. Pure patching: never removes a task.
pub fn patch_defaults(ctx: &mut SchedulingContext, tasks: &[TaskInstance]) {
    for task in tasks {
        let floor_map = ctx.quantity_matrix.entry(task.base_id.clone()).or_default();
        let zone_map = floor_map.entry(task.floor).or_default();
        zone_map.entry(task.zone.clone()).or_insert_with(|| {
            tracing::warn!(task_id = %task.id, "quantity absent from matrix, defaulting to 1");
            1.0
        });

        if let Some(pool) = ctx.workers.get_mut(&task.resource_type) {
            pool.productivity_rates.entry(task.base_id.clone()).or_insert_with(|| {
                tracing::warn!(task_id = %task.id, pool = %pool.name, "worker productivity rate absent, defaulting to 1");
                1.0
            });
        }

        for (choice, _) in &task.min_equipment_needed {
            for member in &choice.members {
                if let Some(pool) = ctx.equipment.get_mut(member) {
                    pool.productivity_rates.entry(task.base_id.clone()).or_insert_with(|| {
                        tracing::warn!(task_id = %task.id, pool = %pool.name, "equipment productivity rate absent, defaulting to 1");
                        1.0
                    });
                }
            }
        }
    }
}

/// Every predecessor id named by a generated instance must itself be a
/// generated instance. Checked separately from the topological sort so a
/// dangling reference is reported precisely rather than folded into a cycle.
pub fn validate(tasks: &[TaskInstance]) -> Result<(), ScheduleError> {
    crate::graph::check_missing_dependencies(tasks)?;
    crate::graph::topological_sort(tasks)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpsched_core::{CrossFloorDependency, DisciplineZonePolicy, TaskType};
    use std::collections::HashSet as StdHashSet;

    fn minimal_ctx() -> SchedulingContext {
        SchedulingContext {
            base_tasks: HashMap::new(),
            zone_floors: HashMap::new(),
            quantity_matrix: HashMap::new(),
            workers: HashMap::new(),
            equipment: HashMap::new(),
            start_date: chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            holidays: Vec::new(),
            workweek: vec![0, 1, 2, 3, 4],
            cross_floor_links: HashMap::new(),
            acceleration: HashMap::new(),
            shift_config: HashMap::new(),
            discipline_zone_cfg: HashMap::new(),
            ground_disciplines: StdHashSet::new(),
        }
    }

    #[test]
    fn single_task_single_zone_single_floor() {
        let mut ctx = minimal_ctx();
        ctx.zone_floors.insert("Z".into(), 0);
        let task = BaseTask::new("T").discipline("Gros Oeuvre").resource_type("crew").task_type(TaskType::Worker);
        ctx.base_tasks.insert("Gros Oeuvre".into(), vec![task]);

        let instances = generate(&ctx).unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].id, "T-F0-Z");
        assert!(instances[0].predecessors.is_empty());
    }

    #[test]
    fn ground_discipline_is_floor_zero_only() {
        let mut ctx = minimal_ctx();
        ctx.zone_floors.insert("Z".into(), 2);
        ctx.ground_disciplines.insert("Terrassement".into());
        let task = BaseTask::new("dig").discipline("Terrassement");
        ctx.base_tasks.insert("Terrassement".into(), vec![task]);

        let instances = generate(&ctx).unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].floor, 0);
    }

    #[test]
    fn all_floors_override_beats_ground_discipline() {
        let mut ctx = minimal_ctx();
        ctx.zone_floors.insert("Z".into(), 2);
        ctx.ground_disciplines.insert("Terrassement".into());
        let task = BaseTask::new("dig").discipline("Terrassement").applies_to_floors(AppliesToFloors::AllFloors);
        ctx.base_tasks.insert("Terrassement".into(), vec![task]);

        let instances = generate(&ctx).unwrap();
        assert_eq!(instances.len(), 3);
    }

    #[test]
    fn auto_repeat_on_floor_excludes_ground_floor() {
        let mut ctx = minimal_ctx();
        ctx.zone_floors.insert("Z".into(), 2);
        let task = BaseTask::new("X").discipline("Structure").repeat_on_floor(true);
        ctx.base_tasks.insert("Structure".into(), vec![task]);

        let instances = generate(&ctx).unwrap();
        let mut floors: Vec<u32> = instances.iter().map(|t| t.floor).collect();
        floors.sort_unstable();
        assert_eq!(floors, vec![1, 2]);
    }

    #[test]
    fn vertical_chain_links_consecutive_floors() {
        let mut ctx = minimal_ctx();
        ctx.zone_floors.insert("Z".into(), 2);
        let task = BaseTask::new("X")
            .discipline("Structure")
            .repeat_on_floor(true)
            .cross_floor_repetition(true)
            .applies_to_floors(AppliesToFloors::AllFloors);
        ctx.base_tasks.insert("Structure".into(), vec![task]);

        let instances = generate(&ctx).unwrap();
        let find = |f: u32| instances.iter().find(|t| t.floor == f).unwrap();
        assert!(find(1).predecessors.contains(&"X-F0-Z".to_string()));
        assert!(find(2).predecessors.contains(&"X-F1-Z".to_string()));
    }

    #[test]
    fn negative_cross_floor_offset_is_dropped() {
        let mut ctx = minimal_ctx();
        ctx.zone_floors.insert("Z".into(), 1);
        let task = BaseTask::new("Y")
            .discipline("Structure")
            .applies_to_floors(AppliesToFloors::AllFloors)
            .cross_floor_dependency(CrossFloorDependency::new("Y", -1));
        ctx.base_tasks.insert("Structure".into(), vec![task]);

        let instances = generate(&ctx).unwrap();
        let floor0 = instances.iter().find(|t| t.floor == 0).unwrap();
        assert!(floor0.predecessors.is_empty());
    }

    #[test]
    fn cross_zone_group_sequential_links_previous_group() {
        let mut ctx = minimal_ctx();
        ctx.zone_floors.insert("Z1".into(), 0);
        ctx.zone_floors.insert("Z2".into(), 0);
        ctx.discipline_zone_cfg.insert(
            "Structure".into(),
            DisciplineZonePolicy {
                zone_groups: vec![vec!["Z1".to_string()], vec!["Z2".to_string()]],
                strategy: ZoneGroupStrategy::GroupSequential,
            },
        );
        let task = BaseTask::new("P").discipline("Structure");
        ctx.base_tasks.insert("Structure".into(), vec![task]);

        let instances = generate(&ctx).unwrap();
        let z2 = instances.iter().find(|t| t.zone == "Z2").unwrap();
        assert!(z2.predecessors.contains(&"P-F0-Z1".to_string()));
    }

    #[test]
    fn patch_defaults_fills_missing_quantity() {
        let mut ctx = minimal_ctx();
        ctx.zone_floors.insert("Z".into(), 0);
        let task = BaseTask::new("T").discipline("X");
        ctx.base_tasks.insert("X".into(), vec![task]);
        let instances = generate(&ctx).unwrap();
        patch_defaults(&mut ctx, &instances);
        assert_eq!(ctx.quantity_matrix["T"][&0]["Z"], 1.0);
    }
}
