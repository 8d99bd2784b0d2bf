//! JSON scenario shape and its translation into a `SchedulingContext`.
//!
//! Kept distinct from `cpsched_core::SchedulingContext` even though the
//! field sets largely coincide: dates arrive as `YYYY-MM-DD` strings here
//! and are parsed on the way in, so the core itself never has to know about
//! a textual date format.

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use cpsched_core::{
    AccelerationPolicy, BaseTask, Discipline, DisciplineZonePolicy, EquipmentPool, PoolName,
    QuantityMatrix, SchedulingContext, WorkerPool, Zone, ZoneFloorGrid,
};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

#[derive(Deserialize)]
pub struct ScenarioInput {
    pub base_tasks: HashMap<Discipline, Vec<BaseTask>>,
    pub zone_floors: ZoneFloorGrid,
    #[serde(default)]
    pub quantity_matrix: QuantityMatrix,
    #[serde(default)]
    pub workers: HashMap<PoolName, WorkerPool>,
    #[serde(default)]
    pub equipment: HashMap<PoolName, EquipmentPool>,
    pub start_date: String,
    #[serde(default)]
    pub holidays: Vec<String>,
    pub workweek: Vec<u8>,
    #[serde(default)]
    pub cross_floor_links: HashMap<String, Vec<String>>,
    pub acceleration: HashMap<Discipline, AccelerationPolicy>,
    pub shift_config: HashMap<Discipline, f64>,
    #[serde(default)]
    pub discipline_zone_cfg: HashMap<Discipline, DisciplineZonePolicy>,
    #[serde(default)]
    pub ground_disciplines: HashSet<Discipline>,
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| anyhow!("scenario date {raw:?} is not YYYY-MM-DD: {e}"))
}

impl ScenarioInput {
    pub fn into_context(self) -> Result<SchedulingContext> {
        let zone_floors: HashMap<Zone, u32> = self.zone_floors;
        let holidays = self.holidays.iter().map(|d| parse_date(d)).collect::<Result<Vec<_>>>()?;
        Ok(SchedulingContext {
            base_tasks: self.base_tasks,
            zone_floors,
            quantity_matrix: self.quantity_matrix,
            workers: self.workers,
            equipment: self.equipment,
            start_date: parse_date(&self.start_date)?,
            holidays,
            workweek: self.workweek,
            cross_floor_links: self.cross_floor_links,
            acceleration: self.acceleration,
            shift_config: self.shift_config,
            discipline_zone_cfg: self.discipline_zone_cfg,
            ground_disciplines: self.ground_disciplines,
        })
    }
}
