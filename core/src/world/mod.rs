//! The seam between the simulation core and the host engine.
//!
//! The core never talks to the host directly; everything it needs from the
//! game world comes through the [`World`] trait, and the narrow set of
//! mutations it is allowed to make goes back through the same trait's
//! effector methods. The per-entity key→integer attribute store used to
//! interoperate with the optional external manual-transmission add-on is a
//! separate [`DecorStore`] trait.

pub mod scripted;

use crate::types::{EntityId, ModelId};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Broad shape of an entity's model. Several subsystems early-exit for
/// kinds they do not simulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Car,
    Motorcycle,
    Bicycle,
    Boat,
    Helicopter,
    Plane,
    Train,
}

impl ModelKind {
    /// Wheeled/tracked surface vehicles carry the engine thermal model.
    pub fn has_engine_thermals(&self) -> bool {
        matches!(self, Self::Car | Self::Motorcycle | Self::Boat)
    }

    /// Aircraft never get cruise control; bicycles only by configuration.
    pub fn cruise_eligible(&self) -> bool {
        matches!(self, Self::Car | Self::Motorcycle | Self::Boat | Self::Bicycle)
    }

    pub fn transmission_eligible(&self) -> bool {
        matches!(self, Self::Car | Self::Motorcycle)
    }
}

/// Host vehicle classification, used for transmission frequency tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleClass {
    Compacts,
    Sedans,
    Suvs,
    Coupes,
    Muscle,
    SportsClassics,
    Sports,
    Super,
    Motorcycles,
    OffRoad,
    Industrial,
    Utility,
    Vans,
    Commercial,
    Emergency,
    Military,
    Service,
    Boats,
    Other,
}

/// Local environment readings for one entity. Zone lookup, altitude and
/// time-of-day blending are host concerns; the core only consumes the
/// blended result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSample {
    /// Ambient temperature offset from the standard reference point.
    pub ambient_offset: f32,
    /// Multiplier applied to engine heat gain.
    pub heating_multiplier: f32,
    /// Multiplier applied to active cooling.
    pub cooling_multiplier: f32,
}

impl Default for EnvironmentSample {
    fn default() -> Self {
        Self {
            ambient_offset: 0.0,
            heating_multiplier: 1.0,
            cooling_multiplier: 1.0,
        }
    }
}

/// Read access to the host world plus the narrow effector surface.
///
/// Per-entity reads for a vanished id must return harmless defaults rather
/// than panicking; the scheduler evicts vanished entities before handing
/// them to subsystems, but a handle can die mid-frame.
pub trait World {
    // ── Frame / global state ───────────────────────────────────────
    fn fps(&self) -> f32;
    fn is_loading(&self) -> bool;
    fn is_paused(&self) -> bool;

    // ── Population ─────────────────────────────────────────────────
    /// Snapshot of every live vehicle entity in the world.
    fn all_vehicles(&self) -> Vec<EntityId>;
    fn exists(&self, id: EntityId) -> bool;

    // ── Operator state ─────────────────────────────────────────────
    /// True when the operator is seated in and controlling a vehicle.
    fn is_player_driving(&self) -> bool;
    /// The vehicle the operator currently controls.
    fn player_vehicle(&self) -> Option<EntityId>;
    /// The vehicle the operator most recently occupied (still tracked
    /// every frame after exiting, until it despawns).
    fn player_last_vehicle(&self) -> Option<EntityId>;
    /// Throttle control position, 0.0 to 1.0.
    fn throttle_input(&self) -> f32;
    /// Brake control position, 0.0 to 1.0.
    fn brake_input(&self) -> f32;
    fn brake_held(&self) -> bool;
    fn handbrake_held(&self) -> bool;
    /// Operator on foot blasting a fire extinguisher at this entity's
    /// engine block.
    fn extinguisher_aimed_at_engine(&self, id: EntityId) -> bool;

    // ── Per-entity reads ───────────────────────────────────────────
    fn model(&self, id: EntityId) -> ModelId;
    fn model_kind(&self, id: EntityId) -> ModelKind;
    fn vehicle_class(&self, id: EntityId) -> VehicleClass;
    /// Scalar speed in m/s.
    fn speed(&self, id: EntityId) -> f32;
    /// Wheel rotation speed in m/s (diverges from speed when sliding).
    fn wheel_speed(&self, id: EntityId) -> f32;
    fn position(&self, id: EntityId) -> Vec3;
    /// Velocity component along the entity's forward vector, m/s.
    fn forward_velocity(&self, id: EntityId) -> f32;
    /// Normalized engine RPM, 0.0 to 1.0 (idle is ~0.2).
    fn rpm(&self, id: EntityId) -> f32;
    fn is_in_air(&self, id: EntityId) -> bool;
    fn is_on_all_wheels(&self, id: EntityId) -> bool;
    /// Submerged fraction, 0.0 (dry) to 1.0 (fully under water).
    fn submerged_level(&self, id: EntityId) -> f32;
    fn has_collided(&self, id: EntityId) -> bool;
    fn is_on_fire(&self, id: EntityId) -> bool;
    fn has_driver(&self, id: EntityId) -> bool;
    fn engine_running(&self, id: EntityId) -> bool;
    fn engine_health(&self, id: EntityId) -> f32;
    fn body_health(&self, id: EntityId) -> f32;
    fn tank_health(&self, id: EntityId) -> f32;
    fn environment(&self, id: EntityId) -> EnvironmentSample;

    // ── Effectors ──────────────────────────────────────────────────
    fn set_engine_health(&mut self, id: EntityId, health: f32);
    fn set_tank_health(&mut self, id: EntityId, health: f32);
    fn set_engine_running(&mut self, id: EntityId, on: bool);
    fn set_driveable(&mut self, id: EntityId, on: bool);
    fn set_fireproof(&mut self, id: EntityId, on: bool);
    fn set_handbrake(&mut self, id: EntityId, on: bool);
    /// Drive the operator's throttle control for this frame.
    fn set_throttle(&mut self, value: f32);
    /// Drive the operator's brake control for this frame.
    fn set_brake(&mut self, value: f32);
}

/// Generic per-entity key→integer attribute store, shared with other
/// add-ons running on the same host. The core reads the current gear and
/// shift mode of the external manual-transmission add-on and writes the
/// desired shift mode back; nothing else.
pub trait DecorStore {
    fn get_int(&self, id: EntityId, key: &str) -> i32;
    fn set_int(&mut self, id: EntityId, key: &str, value: i32);
}

/// What the engine actually requires per frame: world access plus the
/// decorator store, usually implemented by the same host object.
pub trait Host: World + DecorStore {}
impl<T: World + DecorStore> Host for T {}
