//! # cpsched-core
//!
//! Domain model and error taxonomy for the cpsched construction scheduling
//! engine.
//!
//! This crate provides:
//! - Catalogue types: [`BaseTask`], [`WorkerPool`], [`EquipmentPool`]
//! - The placed scheduling unit: [`TaskInstance`]
//! - The immutable run configuration: [`SchedulingContext`]
//! - Calendar arithmetic: [`Calendar`]
//! - The output shape: [`Schedule`] / [`ScheduledTask`]
//! - The error taxonomy: [`ScheduleError`]
//!
//! This crate contains no scheduling algorithms. Task generation, critical
//! path analysis, duration derivation, resource allocation, and the
//! list-scheduling loop all live in `cpsched-engine`, which depends on the
//! types defined here.
//!
//! ## Example
//!
//! ```rust
//! use cpsched_core::{BaseTask, TaskType, WorkerPool};
//!
//! let task = BaseTask::new("excavate")
//!     .name("Excavate foundation")
//!     .discipline("Terrassement")
//!     .resource_type("excavation_crew")
//!     .task_type(TaskType::Worker)
//!     .min_crews_needed(2);
//!
//! let pool = WorkerPool::new("excavation_crew", 4).productivity("excavate", 10.0);
//! assert_eq!(pool.count, 4);
//! assert_eq!(task.min_crews_needed, 2);
//! ```

use chrono::{Datelike, Duration as ChronoDuration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

// ============================================================================
// Type aliases
// ============================================================================

/// Stable opaque id of a catalogue entry, e.g. `"excavate"`.
pub type BaseTaskId = String;

/// Id of a placed task instance, `"{base_id}-F{floor}-{zone}"`.
pub type TaskId = String;

/// Name of a worker or equipment pool.
pub type PoolName = String;

/// Discipline name, e.g. `"Terrassement"`.
pub type Discipline = String;

/// Zone name within the project grid.
pub type Zone = String;

/// Mapping `zone name -> max floor` (inclusive, 0-based).
pub type ZoneFloorGrid = HashMap<Zone, u32>;

/// Nested `base_id -> floor -> zone -> quantity` lookup.
pub type QuantityMatrix = HashMap<BaseTaskId, HashMap<u32, HashMap<Zone, f64>>>;

fn task_instance_id(base_id: &str, floor: u32, zone: &str) -> TaskId {
    format!("{base_id}-F{floor}-{zone}")
}

// ============================================================================
// Task type / floor applicability
// ============================================================================

/// Which resources a task requires, and therefore which resource manager is
/// consulted during placement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Worker,
    Equipment,
    Hybrid,
}

/// Which floors a base task may be instantiated on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppliesToFloors {
    /// Ground disciplines get floor 0 only; everyone else gets every floor.
    #[default]
    Auto,
    GroundOnly,
    AboveGround,
    AllFloors,
}

/// A predecessor on a different floor, expressed relative to the dependent
/// task's own floor (`floor_offset` is typically negative).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CrossFloorDependency {
    pub task_id: BaseTaskId,
    pub floor_offset: i32,
}

impl CrossFloorDependency {
    pub fn new(task_id: impl Into<BaseTaskId>, floor_offset: i32) -> Self {
        Self { task_id: task_id.into(), floor_offset }
    }
}

// ============================================================================
// Equipment choice (tagged union replacing heterogeneous dict keys)
// ============================================================================

/// An equipment requirement is satisfied by a single named piece of
/// equipment, or by any combination of a fixed set of interchangeable
/// alternatives. Iteration order of `members` is preserved: the duration
/// calculator depends on "the first equipment choice".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EquipmentChoice {
    pub members: Vec<PoolName>,
}

impl EquipmentChoice {
    pub fn single(name: impl Into<PoolName>) -> Self {
        Self { members: vec![name.into()] }
    }

    pub fn any_of<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<PoolName>,
    {
        Self { members: names.into_iter().map(Into::into).collect() }
    }

    /// The alternative the duration calculator treats as representative.
    pub fn first(&self) -> Option<&str> {
        self.members.first().map(String::as_str)
    }
}

/// An ordered list of `(choice, units)` requirements. A `Vec` rather than a
/// map: the source's "first equipment choice" rule requires a stable
/// iteration order that a hash map cannot promise.
pub type EquipmentRequirements = Vec<(EquipmentChoice, u32)>;

// ============================================================================
// Base task (catalogue entry)
// ============================================================================

/// A parameterised catalogue entry, not yet placed in time or space.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BaseTask {
    pub id: BaseTaskId,
    pub name: String,
    pub discipline: Discipline,
    pub sub_discipline: Option<String>,
    pub resource_type: PoolName,
    pub task_type: TaskType,
    /// Fixed workday count; overrides the duration calculator when set.
    pub base_duration: Option<f64>,
    pub min_crews_needed: u32,
    pub min_equipment_needed: EquipmentRequirements,
    pub predecessors: Vec<BaseTaskId>,
    pub cross_floor_dependencies: Vec<CrossFloorDependency>,
    pub applies_to_floors: AppliesToFloors,
    pub repeat_on_floor: bool,
    pub cross_floor_repetition: bool,
    /// Mandatory calendar-day gap after every predecessor finishes.
    pub delay: i64,
    pub included: bool,
}

impl BaseTask {
    pub fn new(id: impl Into<BaseTaskId>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            discipline: String::new(),
            sub_discipline: None,
            resource_type: String::new(),
            task_type: TaskType::Worker,
            base_duration: None,
            min_crews_needed: 1,
            min_equipment_needed: Vec::new(),
            predecessors: Vec::new(),
            cross_floor_dependencies: Vec::new(),
            applies_to_floors: AppliesToFloors::Auto,
            repeat_on_floor: false,
            cross_floor_repetition: false,
            delay: 0,
            included: true,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn discipline(mut self, discipline: impl Into<Discipline>) -> Self {
        self.discipline = discipline.into();
        self
    }

    pub fn sub_discipline(mut self, sub: impl Into<String>) -> Self {
        self.sub_discipline = Some(sub.into());
        self
    }

    pub fn resource_type(mut self, resource_type: impl Into<PoolName>) -> Self {
        self.resource_type = resource_type.into();
        self
    }

    pub fn task_type(mut self, task_type: TaskType) -> Self {
        self.task_type = task_type;
        self
    }

    pub fn base_duration(mut self, days: f64) -> Self {
        self.base_duration = Some(days);
        self
    }

    pub fn min_crews_needed(mut self, n: u32) -> Self {
        self.min_crews_needed = n;
        self
    }

    pub fn equipment_needed(mut self, choice: EquipmentChoice, units: u32) -> Self {
        self.min_equipment_needed.push((choice, units));
        self
    }

    pub fn depends_on(mut self, predecessor: impl Into<BaseTaskId>) -> Self {
        self.predecessors.push(predecessor.into());
        self
    }

    pub fn cross_floor_dependency(mut self, dep: CrossFloorDependency) -> Self {
        self.cross_floor_dependencies.push(dep);
        self
    }

    pub fn applies_to_floors(mut self, rule: AppliesToFloors) -> Self {
        self.applies_to_floors = rule;
        self
    }

    pub fn repeat_on_floor(mut self, yes: bool) -> Self {
        self.repeat_on_floor = yes;
        self
    }

    pub fn cross_floor_repetition(mut self, yes: bool) -> Self {
        self.cross_floor_repetition = yes;
        self
    }

    pub fn delay(mut self, calendar_days: i64) -> Self {
        self.delay = calendar_days;
        self
    }

    pub fn excluded(mut self) -> Self {
        self.included = false;
        self
    }
}

// ============================================================================
// Task instance (the scheduling unit)
// ============================================================================

/// A base task materialised at a `(zone, floor)` coordinate. Created once by
/// the generator; only the scheduler mutates the allocation and date fields
/// after that.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskInstance {
    pub id: TaskId,
    pub base_id: BaseTaskId,
    pub name: String,
    pub discipline: Discipline,
    pub sub_discipline: Option<String>,
    pub zone: Zone,
    pub floor: u32,
    pub resource_type: PoolName,
    pub task_type: TaskType,
    pub base_duration: Option<f64>,
    pub min_crews_needed: u32,
    pub min_equipment_needed: EquipmentRequirements,
    pub delay: i64,
    /// Resolved instance ids, not base-task ids.
    pub predecessors: Vec<TaskId>,

    pub allocated_crews: Option<u32>,
    pub allocated_equipments: Option<HashMap<PoolName, u32>>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,

    pub earliest_start: Option<i64>,
    pub earliest_finish: Option<i64>,
    pub latest_start: Option<i64>,
    pub latest_finish: Option<i64>,
    pub float: Option<i64>,
}

impl TaskInstance {
    pub fn new(base: &BaseTask, zone: impl Into<Zone>, floor: u32) -> Self {
        let zone = zone.into();
        Self {
            id: task_instance_id(&base.id, floor, &zone),
            base_id: base.id.clone(),
            name: base.name.clone(),
            discipline: base.discipline.clone(),
            sub_discipline: base.sub_discipline.clone(),
            zone,
            floor,
            resource_type: base.resource_type.clone(),
            task_type: base.task_type,
            base_duration: base.base_duration,
            min_crews_needed: base.min_crews_needed,
            min_equipment_needed: base.min_equipment_needed.clone(),
            delay: base.delay,
            predecessors: Vec::new(),
            allocated_crews: None,
            allocated_equipments: None,
            start_date: None,
            end_date: None,
            earliest_start: None,
            earliest_finish: None,
            latest_start: None,
            latest_finish: None,
            float: None,
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.start_date.is_some() && self.end_date.is_some()
    }

    pub fn is_critical(&self) -> bool {
        self.float == Some(0)
    }
}

// ============================================================================
// Resource pools
// ============================================================================

/// A pool of interchangeable worker crews.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkerPool {
    pub name: PoolName,
    /// Total concurrently available crew units.
    pub count: u32,
    pub productivity_rates: HashMap<BaseTaskId, f64>,
    pub max_crews: HashMap<BaseTaskId, u32>,
}

impl WorkerPool {
    pub fn new(name: impl Into<PoolName>, count: u32) -> Self {
        Self {
            name: name.into(),
            count,
            productivity_rates: HashMap::new(),
            max_crews: HashMap::new(),
        }
    }

    pub fn productivity(mut self, base_id: impl Into<BaseTaskId>, rate: f64) -> Self {
        self.productivity_rates.insert(base_id.into(), rate);
        self
    }

    pub fn max_crews_for(mut self, base_id: impl Into<BaseTaskId>, max: u32) -> Self {
        self.max_crews.insert(base_id.into(), max);
        self
    }
}

/// A pool of interchangeable equipment units.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EquipmentPool {
    pub name: PoolName,
    pub count: u32,
    pub productivity_rates: HashMap<BaseTaskId, f64>,
    pub max_equipment: HashMap<BaseTaskId, u32>,
    pub efficiency: f64,
    pub hourly_rate: f64,
}

impl EquipmentPool {
    pub fn new(name: impl Into<PoolName>, count: u32) -> Self {
        Self {
            name: name.into(),
            count,
            productivity_rates: HashMap::new(),
            max_equipment: HashMap::new(),
            efficiency: 1.0,
            hourly_rate: 0.0,
        }
    }

    pub fn productivity(mut self, base_id: impl Into<BaseTaskId>, rate: f64) -> Self {
        self.productivity_rates.insert(base_id.into(), rate);
        self
    }

    pub fn max_equipment_for(mut self, base_id: impl Into<BaseTaskId>, max: u32) -> Self {
        self.max_equipment.insert(base_id.into(), max);
        self
    }

    pub fn efficiency(mut self, efficiency: f64) -> Self {
        self.efficiency = efficiency;
        self
    }

    pub fn hourly_rate(mut self, rate: f64) -> Self {
        self.hourly_rate = rate;
        self
    }
}

/// A committed reservation held by a resource manager: `units` of `pool_name`
/// reserved for `task_id` over the half-open interval `[start, end)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AllocationRecord {
    pub task_id: TaskId,
    pub pool_name: PoolName,
    pub units: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl AllocationRecord {
    /// `[a,b)` and `[c,d)` overlap iff `¬(b ≤ c ∨ a ≥ d)`.
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        !(self.end <= start || self.start >= end)
    }
}

// ============================================================================
// Discipline / zone policy
// ============================================================================

/// Ordering policy between zone groups within a discipline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneGroupStrategy {
    Sequential,
    FullyParallel,
    GroupSequential,
}

/// Per-discipline grouping of zones into ordered groups.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DisciplineZonePolicy {
    pub zone_groups: Vec<Vec<Zone>>,
    pub strategy: ZoneGroupStrategy,
}

impl DisciplineZonePolicy {
    /// The index of the group containing `zone`, if any.
    pub fn group_of(&self, zone: &str) -> Option<usize> {
        self.zone_groups.iter().position(|g| g.iter().any(|z| z == zone))
    }
}

/// Per-discipline acceleration policy: inflates the desired crew/equipment
/// count above the minimum, bounded by `max_multiplier`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct AccelerationPolicy {
    pub factor: f64,
    pub max_multiplier: f64,
}

impl Default for AccelerationPolicy {
    fn default() -> Self {
        Self { factor: 1.0, max_multiplier: 3.0 }
    }
}

// ============================================================================
// Calendar
// ============================================================================

/// Workweek + holiday-aware workday arithmetic. Dates are manipulated at day
/// resolution; time-of-day is never considered.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Calendar {
    /// Weekday indices (0 = Monday .. 6 = Sunday) that are workdays.
    pub workweek: HashSet<u8>,
    pub holidays: HashSet<NaiveDate>,
}

impl Calendar {
    pub fn new(workweek: impl IntoIterator<Item = u8>, holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            workweek: workweek.into_iter().collect(),
            holidays: holidays.into_iter().collect(),
        }
    }

    /// Monday through Saturday, matching the original tool's default.
    pub fn default_workweek() -> HashSet<u8> {
        [0, 1, 2, 3, 4, 5].into_iter().collect()
    }

    pub fn is_workday(&self, date: NaiveDate) -> bool {
        let weekday = date.weekday().num_days_from_monday() as u8;
        self.workweek.contains(&weekday) && !self.holidays.contains(&date)
    }

    /// Advance day-by-day from `start`, counting only workdays, and return
    /// the exclusive end (the calendar day after the `n`-th counted
    /// workday). `n = 0` returns `start` unchanged. Streams day-by-day
    /// rather than using a closed-form shortcut, so arbitrarily large `n`
    /// behaves identically regardless of holiday density.
    pub fn add_workdays(&self, start: NaiveDate, n: u32) -> NaiveDate {
        if n == 0 {
            return start;
        }
        let mut counted = 0u32;
        let mut cursor = start;
        let mut last_workday = start;
        while counted < n {
            if self.is_workday(cursor) {
                counted += 1;
                last_workday = cursor;
            }
            cursor += ChronoDuration::days(1);
        }
        last_workday + ChronoDuration::days(1)
    }

    /// `start + n` calendar days, ignoring the workweek and holidays. Used
    /// exclusively for inter-task `delay`.
    pub fn add_calendar_days(&self, start: NaiveDate, n: i64) -> NaiveDate {
        if n <= 0 {
            return start;
        }
        start + ChronoDuration::days(n)
    }
}

// ============================================================================
// Scheduling context (explicit value object, no global state)
// ============================================================================

/// Every input a scheduling run needs, gathered into one explicit value.
/// Replaces the module-level singletons (catalogue, pools, acceleration
/// config, ground-discipline set) that the source kept as global mutable
/// dictionaries.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SchedulingContext {
    pub base_tasks: HashMap<Discipline, Vec<BaseTask>>,
    pub zone_floors: ZoneFloorGrid,
    pub quantity_matrix: QuantityMatrix,
    pub workers: HashMap<PoolName, WorkerPool>,
    pub equipment: HashMap<PoolName, EquipmentPool>,
    pub start_date: NaiveDate,
    pub holidays: Vec<NaiveDate>,
    pub workweek: Vec<u8>,
    pub cross_floor_links: HashMap<BaseTaskId, Vec<BaseTaskId>>,
    pub acceleration: HashMap<Discipline, AccelerationPolicy>,
    pub shift_config: HashMap<Discipline, f64>,
    pub discipline_zone_cfg: HashMap<Discipline, DisciplineZonePolicy>,
    pub ground_disciplines: HashSet<Discipline>,
}

impl SchedulingContext {
    pub fn calendar(&self) -> Calendar {
        Calendar::new(self.workweek.iter().copied(), self.holidays.iter().copied())
    }

    /// Look up the acceleration policy for `discipline`, falling back to the
    /// mandatory `"default"` entry.
    pub fn acceleration_for(&self, discipline: &str) -> AccelerationPolicy {
        self.acceleration
            .get(discipline)
            .or_else(|| self.acceleration.get("default"))
            .copied()
            .unwrap_or_default()
    }

    /// Look up the shift factor for `discipline`, falling back to the
    /// mandatory `"default"` entry.
    pub fn shift_factor_for(&self, discipline: &str) -> f64 {
        self.shift_config
            .get(discipline)
            .or_else(|| self.shift_config.get("default"))
            .copied()
            .unwrap_or(1.0)
    }

    /// Fail fast if the run configuration is missing a mandatory piece.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if !self.acceleration.contains_key("default") {
            return Err(ScheduleError::InvalidInput(
                "acceleration map is missing the mandatory \"default\" entry".into(),
            ));
        }
        if !self.shift_config.contains_key("default") {
            return Err(ScheduleError::InvalidInput(
                "shift_config map is missing the mandatory \"default\" entry".into(),
            ));
        }
        for pool in self.workers.values() {
            if pool.count == 0 {
                return Err(ScheduleError::InvalidInput(format!(
                    "worker pool \"{}\" has non-positive count",
                    pool.name
                )));
            }
        }
        for pool in self.equipment.values() {
            if pool.count == 0 {
                return Err(ScheduleError::InvalidInput(format!(
                    "equipment pool \"{}\" has non-positive count",
                    pool.name
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Output
// ============================================================================

/// A fully time-phased task, as emitted at the end of a scheduling run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub id: TaskId,
    pub base_id: BaseTaskId,
    pub name: String,
    pub discipline: Discipline,
    pub sub_discipline: Option<String>,
    pub zone: Zone,
    pub floor: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub allocated_crews: u32,
    pub allocated_equipments: HashMap<PoolName, u32>,
    pub earliest_start: i64,
    pub earliest_finish: i64,
    pub latest_start: i64,
    pub latest_finish: i64,
    pub float: i64,
}

impl ScheduledTask {
    pub fn is_critical(&self) -> bool {
        self.float == 0
    }
}

/// The complete output of a scheduling run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Schedule {
    pub tasks: Vec<ScheduledTask>,
}

impl Schedule {
    pub fn get(&self, id: &str) -> Option<&ScheduledTask> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn critical_tasks(&self) -> Vec<&ScheduledTask> {
        self.tasks.iter().filter(|t| t.is_critical()).collect()
    }

    /// The last exclusive end date across all tasks, i.e. the project
    /// makespan boundary.
    pub fn makespan_end(&self) -> Option<NaiveDate> {
        self.tasks.iter().map(|t| t.end_date).max()
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Scheduling error taxonomy.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("dependency cycle detected among tasks: {0:?}")]
    GraphCycle(Vec<TaskId>),

    #[error("task {task_id} references missing predecessor {predecessor_id}")]
    MissingDependency { task_id: TaskId, predecessor_id: TaskId },

    #[error("task {task_id} could not be placed within the attempt cap; last window tried was {last_start}..{last_end}")]
    AllocationStarved { task_id: TaskId, last_start: NaiveDate, last_end: NaiveDate },

    #[error("non-positive productivity computing duration for task {task_id}")]
    ProductivityZero { task_id: TaskId },

    #[error("non-finite duration computed for task {task_id}")]
    NonFiniteDuration { task_id: TaskId },
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn task_instance_id_shape() {
        let base = BaseTask::new("excavate").discipline("Terrassement");
        let inst = TaskInstance::new(&base, "Z1", 2);
        assert_eq!(inst.id, "excavate-F2-Z1");
    }

    #[test]
    fn add_workdays_zero_is_identity() {
        let cal = Calendar::new(Calendar::default_workweek(), []);
        let start = date(2024, 1, 1);
        assert_eq!(cal.add_workdays(start, 0), start);
    }

    #[test]
    fn add_workdays_monday_start_friday_workweek() {
        let cal = Calendar::new([0, 1, 2, 3, 4], []);
        // Monday 2024-01-01, 3 workdays -> exclusive end is the day after
        // the 3rd counted workday, Wednesday 01-03.
        let start = date(2024, 1, 1);
        assert_eq!(cal.add_workdays(start, 3), date(2024, 1, 4));
    }

    #[test]
    fn add_workdays_skips_weekend() {
        let cal = Calendar::new([0, 1, 2, 3, 4], []);
        // Friday 2024-01-05, 1 workday -> exclusive end is Monday 01-08.
        let start = date(2024, 1, 5);
        assert_eq!(cal.add_workdays(start, 1), date(2024, 1, 8));
    }

    #[test]
    fn add_workdays_skips_holiday() {
        let cal = Calendar::new([0, 1, 2, 3, 4], [date(2024, 1, 2)]);
        let start = date(2024, 1, 1);
        // Mon counted, Tue is a holiday and skipped, Wed counted -> 2
        // workdays consumed by Wednesday, exclusive end Thursday.
        assert_eq!(cal.add_workdays(start, 2), date(2024, 1, 4));
    }

    #[test]
    fn add_workdays_is_monotonic() {
        let cal = Calendar::new(Calendar::default_workweek(), []);
        let start = date(2024, 3, 1);
        let mut prev = cal.add_workdays(start, 0);
        for n in 1..40 {
            let next = cal.add_workdays(start, n);
            assert!(next > prev);
            prev = next;
        }
    }

    #[test]
    fn add_calendar_days_ignores_workweek() {
        let cal = Calendar::new([0, 1, 2, 3, 4], []);
        let start = date(2024, 1, 5); // Friday
        assert_eq!(cal.add_calendar_days(start, 3), date(2024, 1, 8));
    }

    #[test]
    fn allocation_record_overlap() {
        let rec = AllocationRecord {
            task_id: "t".into(),
            pool_name: "crew".into(),
            units: 2,
            start: date(2024, 1, 1),
            end: date(2024, 1, 5),
        };
        assert!(rec.overlaps(date(2024, 1, 4), date(2024, 1, 10)));
        assert!(!rec.overlaps(date(2024, 1, 5), date(2024, 1, 10)));
        assert!(!rec.overlaps(date(2023, 12, 20), date(2024, 1, 1)));
    }

    #[test]
    fn equipment_choice_preserves_first() {
        let choice = EquipmentChoice::any_of(["Pump", "Crane"]);
        assert_eq!(choice.first(), Some("Pump"));
    }

    #[test]
    fn scheduling_context_requires_default_acceleration() {
        let mut ctx = minimal_context();
        ctx.acceleration.remove("default");
        assert!(matches!(ctx.validate(), Err(ScheduleError::InvalidInput(_))));
    }

    #[test]
    fn scheduling_context_requires_default_shift() {
        let mut ctx = minimal_context();
        ctx.shift_config.remove("default");
        assert!(matches!(ctx.validate(), Err(ScheduleError::InvalidInput(_))));
    }

    #[test]
    fn scheduling_context_rejects_empty_pool() {
        let mut ctx = minimal_context();
        ctx.workers.insert("crew".into(), WorkerPool::new("crew", 0));
        assert!(matches!(ctx.validate(), Err(ScheduleError::InvalidInput(_))));
    }

    fn minimal_context() -> SchedulingContext {
        SchedulingContext {
            base_tasks: HashMap::new(),
            zone_floors: HashMap::new(),
            quantity_matrix: HashMap::new(),
            workers: HashMap::new(),
            equipment: HashMap::new(),
            start_date: date(2024, 1, 1),
            holidays: Vec::new(),
            workweek: vec![0, 1, 2, 3, 4],
            cross_floor_links: HashMap::new(),
            acceleration: HashMap::from([("default".to_string(), AccelerationPolicy::default())]),
            shift_config: HashMap::from([("default".to_string(), 1.0)]),
            discipline_zone_cfg: HashMap::new(),
            ground_disciplines: HashSet::new(),
        }
    }
}
