//! Per-vehicle simulation state.
//!
//! A record is pure data plus derived read-only properties; all behaviour
//! lives in the subsystems that mutate it during the entity's tick. Exactly
//! one record exists per live entity identifier, owned by the registry.

use crate::rng::SubsystemRng;
use crate::types::EntityId;
use crate::world::Host;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Terminal engine condition. `Failed` can only be left through an
/// explicit external repair, which makes "dead with positive health"
/// unrepresentable at the call sites that match on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineCondition {
    Serviceable,
    Failed,
}

/// Mechanical transmission options a vehicle can carry. Assigned exactly
/// once per entity lifetime; `Unassigned` until first considered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransmissionType {
    Unassigned,
    Manual,
    Sequential,
    /// Sequential gearbox that can be toggled into automatic mode.
    SemiAuto,
    /// Automatic gearbox that can be toggled into sequential mode.
    Manumatic,
    Automatic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleRecord {
    /// Current coolant temperature in degrees above the standard
    /// reference point (~300 K). Newly sighted vehicles with a running
    /// engine are assumed to be at operating temperature; with the engine
    /// off, at local ambient.
    pub engine_temperature: f32,

    overheat_damage: f32,

    /// Has the engine ever reached operating temperature?
    pub operating_temperature_reached: bool,
    pub fan_running: bool,
    pub boiling_over: bool,
    pub burning_oil: bool,
    /// Engine switched off deliberately by the operator.
    pub keyed_off: bool,

    condition: EngineCondition,

    pub last_engine_health: f32,
    pub last_body_health: f32,
    pub last_tank_health: f32,
    pub last_position: Vec3,

    fuel_remaining: f32,
    fuel_capacity: f32,

    /// Kilometres the vehicle has ever travelled.
    pub odometer: f32,
    /// Kilometres since the trip odometer was last reset.
    pub trip_odometer: f32,

    transmission: TransmissionType,

    pub has_cruise: bool,
    pub has_braking_cruise: bool,
    pub has_adaptive_cruise: bool,

    temporarily_fireproof: bool,

    pub parking_brake_locked: bool,
}

impl VehicleRecord {
    /// Build a record from the entity's current world state.
    ///
    /// The host occasionally reports engine health above its own nominal
    /// maximum; it is clamped back through the effector so later damage
    /// deltas stay meaningful.
    pub fn new(
        world: &mut dyn Host,
        id: EntityId,
        operating_temperature: f32,
        rng: &mut SubsystemRng,
    ) -> Self {
        let engine_health = world.engine_health(id).min(1000.0);
        world.set_engine_health(id, engine_health);

        let running = world.engine_running(id);
        let (engine_temperature, warm, keyed_off) = if running {
            (operating_temperature, true, false)
        } else {
            (world.environment(id).ambient_offset, false, true)
        };

        let odometer = rng.range_f32(35.0, 80.0);
        let trip_odometer = rng.range_f32(0.0, odometer).min(1000.0);

        Self {
            engine_temperature,
            overheat_damage: 0.0,
            operating_temperature_reached: warm,
            fan_running: false,
            boiling_over: false,
            burning_oil: false,
            keyed_off,
            condition: EngineCondition::Serviceable,
            last_engine_health: engine_health,
            last_body_health: world.body_health(id),
            last_tank_health: world.tank_health(id),
            last_position: world.position(id),
            fuel_remaining: 1.0,
            fuel_capacity: 65.0,
            odometer,
            trip_odometer,
            transmission: TransmissionType::Unassigned,
            has_cruise: false,
            has_braking_cruise: false,
            has_adaptive_cruise: false,
            temporarily_fireproof: false,
            parking_brake_locked: false,
        }
    }

    // ── Overheat damage ────────────────────────────────────────────

    /// Accrued temporary overheat damage. Recovers as the engine cools;
    /// does not include permanent damage from severe overheating.
    pub fn overheat_damage(&self) -> f32 {
        self.overheat_damage
    }

    pub fn set_overheat_damage(&mut self, value: f32) {
        self.overheat_damage = value.max(0.0);
    }

    // ── Terminal condition ─────────────────────────────────────────

    pub fn condition(&self) -> EngineCondition {
        self.condition
    }

    pub fn is_dead(&self) -> bool {
        self.condition == EngineCondition::Failed
    }

    pub fn mark_failed(&mut self) {
        self.condition = EngineCondition::Failed;
    }

    /// Re-entry edge out of the terminal state; only an external repair
    /// event may call this.
    pub fn clear_failed(&mut self) {
        self.condition = EngineCondition::Serviceable;
    }

    // ── Fuel ───────────────────────────────────────────────────────

    /// Fraction of fuel remaining, 0.0 to 1.0.
    pub fn fuel_remaining(&self) -> f32 {
        self.fuel_remaining
    }

    pub fn set_fuel_remaining(&mut self, value: f32) {
        self.fuel_remaining = value.clamp(0.0, 1.0);
    }

    /// Fuel in the tank, litres.
    pub fn fuel_amount(&self) -> f32 {
        self.fuel_remaining * self.fuel_capacity
    }

    pub fn set_fuel_amount(&mut self, litres: f32) {
        if self.fuel_capacity > 0.0 {
            self.fuel_remaining = (litres / self.fuel_capacity).clamp(0.0, 1.0);
        }
    }

    pub fn fuel_capacity(&self) -> f32 {
        self.fuel_capacity
    }

    /// Litres needed to fill the tank from its current level.
    pub fn fuel_required(&self) -> f32 {
        (1.0 - self.fuel_remaining) * self.fuel_capacity
    }

    // ── Odometer ───────────────────────────────────────────────────

    pub fn reset_trip_odometer(&mut self) {
        self.trip_odometer = 0.0;
    }

    // ── Transmission ───────────────────────────────────────────────

    pub fn transmission(&self) -> TransmissionType {
        self.transmission
    }

    pub fn transmission_assigned(&self) -> bool {
        self.transmission != TransmissionType::Unassigned
    }

    /// Assignment happens exactly once; later calls are ignored.
    pub fn assign_transmission(&mut self, transmission: TransmissionType) {
        if !self.transmission_assigned() {
            self.transmission = transmission;
        }
    }

    // ── Cruise capability ──────────────────────────────────────────

    pub fn has_cruise_control(&self) -> bool {
        self.has_adaptive_cruise || self.has_braking_cruise || self.has_cruise
    }

    pub fn has_cruise_automatic_braking(&self) -> bool {
        self.has_adaptive_cruise || self.has_braking_cruise
    }

    // ── Ignition ───────────────────────────────────────────────────

    /// Host-driven ignition: switch the engine on or off and remember
    /// that the operator did it deliberately.
    pub fn key_on_off(&mut self, world: &mut dyn Host, id: EntityId, on: bool) {
        world.set_engine_running(id, on);
        world.set_driveable(id, on);
        self.keyed_off = !on;
    }

    // ── One-tick fireproofing ──────────────────────────────────────

    pub fn temporarily_fireproof(&self) -> bool {
        self.temporarily_fireproof
    }

    /// Set or clear the one-tick fireproof override, mirroring the state
    /// onto the world entity.
    pub fn set_temporary_fireproofing(&mut self, world: &mut dyn Host, id: EntityId, on: bool) {
        world.set_fireproof(id, on);
        self.temporarily_fireproof = on;
    }
}
