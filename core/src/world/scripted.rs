//! An in-memory, fully scriptable [`World`] implementation.
//!
//! Used by the integration tests and the sim-host runner: tests pose a
//! world state, call `SimEngine::advance_frame`, and assert on records and
//! events. Completely headless and deterministic.

use super::{DecorStore, EnvironmentSample, ModelKind, VehicleClass, World};
use crate::types::{EntityId, ModelId};
use glam::Vec3;
use std::collections::{BTreeMap, HashMap};

/// One scripted entity. Public fields: tests mutate these directly
/// between frames.
#[derive(Debug, Clone)]
pub struct ScriptedVehicle {
    pub model: ModelId,
    pub kind: ModelKind,
    pub class: VehicleClass,
    pub position: Vec3,
    pub speed: f32,
    pub wheel_speed: f32,
    pub forward_velocity: f32,
    pub rpm: f32,
    pub engine_running: bool,
    pub engine_health: f32,
    pub body_health: f32,
    pub tank_health: f32,
    pub in_air: bool,
    pub on_all_wheels: bool,
    pub submerged: f32,
    pub collided: bool,
    pub on_fire: bool,
    pub has_driver: bool,
    pub driveable: bool,
    pub fireproof: bool,
    pub handbrake_on: bool,
    pub environment: EnvironmentSample,
}

impl Default for ScriptedVehicle {
    fn default() -> Self {
        Self {
            model: 0,
            kind: ModelKind::Car,
            class: VehicleClass::Sedans,
            position: Vec3::ZERO,
            speed: 0.0,
            wheel_speed: 0.0,
            forward_velocity: 0.0,
            rpm: 0.2,
            engine_running: false,
            engine_health: 1000.0,
            body_health: 1000.0,
            tank_health: 1000.0,
            in_air: false,
            on_all_wheels: true,
            submerged: 0.0,
            collided: false,
            on_fire: false,
            has_driver: false,
            driveable: true,
            fireproof: false,
            handbrake_on: false,
            environment: EnvironmentSample::default(),
        }
    }
}

impl ScriptedVehicle {
    /// A parked sedan with the engine off.
    pub fn parked() -> Self {
        Self::default()
    }

    /// A sedan driving straight ahead at `speed` m/s, engine running.
    pub fn driving(speed: f32) -> Self {
        Self {
            speed,
            wheel_speed: speed,
            forward_velocity: speed,
            rpm: 0.5,
            engine_running: true,
            has_driver: true,
            ..Self::default()
        }
    }
}

/// Operator-side state of the scripted host.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPlayer {
    pub driving: bool,
    pub vehicle: Option<EntityId>,
    pub last_vehicle: Option<EntityId>,
    pub throttle: f32,
    pub brake: f32,
    pub brake_held: bool,
    pub handbrake_held: bool,
    pub extinguisher_target: Option<EntityId>,
}

pub struct ScriptedWorld {
    pub fps: f32,
    pub loading: bool,
    pub paused: bool,
    pub player: ScriptedPlayer,
    /// Last throttle/brake values the core wrote through the effectors.
    pub applied_throttle: f32,
    pub applied_brake: f32,
    vehicles: BTreeMap<EntityId, ScriptedVehicle>,
    decors: HashMap<(EntityId, String), i32>,
}

impl ScriptedWorld {
    pub fn new(fps: f32) -> Self {
        Self {
            fps,
            loading: false,
            paused: false,
            player: ScriptedPlayer::default(),
            applied_throttle: 0.0,
            applied_brake: 0.0,
            vehicles: BTreeMap::new(),
            decors: HashMap::new(),
        }
    }

    pub fn spawn(&mut self, id: EntityId, vehicle: ScriptedVehicle) {
        self.vehicles.insert(id, vehicle);
    }

    /// Remove the entity from the world, as if the host freed it.
    pub fn despawn(&mut self, id: EntityId) {
        self.vehicles.remove(&id);
    }

    /// Seat the operator in `id` as the driver.
    pub fn seat_player(&mut self, id: EntityId) {
        if let Some(v) = self.vehicles.get_mut(&id) {
            v.has_driver = true;
        }
        self.player.driving = true;
        self.player.vehicle = Some(id);
        self.player.last_vehicle = Some(id);
    }

    pub fn unseat_player(&mut self) {
        if let Some(id) = self.player.vehicle {
            if let Some(v) = self.vehicles.get_mut(&id) {
                v.has_driver = false;
            }
        }
        self.player.driving = false;
        self.player.vehicle = None;
    }

    pub fn vehicle(&self, id: EntityId) -> &ScriptedVehicle {
        &self.vehicles[&id]
    }

    pub fn vehicle_mut(&mut self, id: EntityId) -> &mut ScriptedVehicle {
        self.vehicles.get_mut(&id).expect("scripted vehicle")
    }

    pub fn population(&self) -> usize {
        self.vehicles.len()
    }

    /// Snapshot of live ids without needing the World trait in scope.
    pub fn all_vehicle_ids(&self) -> Vec<EntityId> {
        self.vehicles.keys().copied().collect()
    }
}

impl World for ScriptedWorld {
    fn fps(&self) -> f32 {
        self.fps
    }

    fn is_loading(&self) -> bool {
        self.loading
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn all_vehicles(&self) -> Vec<EntityId> {
        self.vehicles.keys().copied().collect()
    }

    fn exists(&self, id: EntityId) -> bool {
        self.vehicles.contains_key(&id)
    }

    fn is_player_driving(&self) -> bool {
        self.player.driving
    }

    fn player_vehicle(&self) -> Option<EntityId> {
        self.player.vehicle
    }

    fn player_last_vehicle(&self) -> Option<EntityId> {
        self.player.last_vehicle
    }

    fn throttle_input(&self) -> f32 {
        self.player.throttle
    }

    fn brake_input(&self) -> f32 {
        self.player.brake
    }

    fn brake_held(&self) -> bool {
        self.player.brake_held
    }

    fn handbrake_held(&self) -> bool {
        self.player.handbrake_held
    }

    fn extinguisher_aimed_at_engine(&self, id: EntityId) -> bool {
        self.player.extinguisher_target == Some(id)
    }

    fn model(&self, id: EntityId) -> ModelId {
        self.vehicles.get(&id).map(|v| v.model).unwrap_or(0)
    }

    fn model_kind(&self, id: EntityId) -> ModelKind {
        self.vehicles.get(&id).map(|v| v.kind).unwrap_or(ModelKind::Car)
    }

    fn vehicle_class(&self, id: EntityId) -> VehicleClass {
        self.vehicles
            .get(&id)
            .map(|v| v.class)
            .unwrap_or(VehicleClass::Other)
    }

    fn speed(&self, id: EntityId) -> f32 {
        self.vehicles.get(&id).map(|v| v.speed).unwrap_or(0.0)
    }

    fn wheel_speed(&self, id: EntityId) -> f32 {
        self.vehicles.get(&id).map(|v| v.wheel_speed).unwrap_or(0.0)
    }

    fn position(&self, id: EntityId) -> Vec3 {
        self.vehicles.get(&id).map(|v| v.position).unwrap_or(Vec3::ZERO)
    }

    fn forward_velocity(&self, id: EntityId) -> f32 {
        self.vehicles
            .get(&id)
            .map(|v| v.forward_velocity)
            .unwrap_or(0.0)
    }

    fn rpm(&self, id: EntityId) -> f32 {
        self.vehicles.get(&id).map(|v| v.rpm).unwrap_or(0.0)
    }

    fn is_in_air(&self, id: EntityId) -> bool {
        self.vehicles.get(&id).map(|v| v.in_air).unwrap_or(false)
    }

    fn is_on_all_wheels(&self, id: EntityId) -> bool {
        self.vehicles
            .get(&id)
            .map(|v| v.on_all_wheels)
            .unwrap_or(false)
    }

    fn submerged_level(&self, id: EntityId) -> f32 {
        self.vehicles.get(&id).map(|v| v.submerged).unwrap_or(0.0)
    }

    fn has_collided(&self, id: EntityId) -> bool {
        self.vehicles.get(&id).map(|v| v.collided).unwrap_or(false)
    }

    fn is_on_fire(&self, id: EntityId) -> bool {
        self.vehicles.get(&id).map(|v| v.on_fire).unwrap_or(false)
    }

    fn has_driver(&self, id: EntityId) -> bool {
        self.vehicles.get(&id).map(|v| v.has_driver).unwrap_or(false)
    }

    fn engine_running(&self, id: EntityId) -> bool {
        self.vehicles
            .get(&id)
            .map(|v| v.engine_running)
            .unwrap_or(false)
    }

    fn engine_health(&self, id: EntityId) -> f32 {
        self.vehicles
            .get(&id)
            .map(|v| v.engine_health)
            .unwrap_or(0.0)
    }

    fn body_health(&self, id: EntityId) -> f32 {
        self.vehicles.get(&id).map(|v| v.body_health).unwrap_or(0.0)
    }

    fn tank_health(&self, id: EntityId) -> f32 {
        self.vehicles.get(&id).map(|v| v.tank_health).unwrap_or(0.0)
    }

    fn environment(&self, id: EntityId) -> EnvironmentSample {
        self.vehicles
            .get(&id)
            .map(|v| v.environment)
            .unwrap_or_default()
    }

    fn set_engine_health(&mut self, id: EntityId, health: f32) {
        if let Some(v) = self.vehicles.get_mut(&id) {
            v.engine_health = health;
        }
    }

    fn set_tank_health(&mut self, id: EntityId, health: f32) {
        if let Some(v) = self.vehicles.get_mut(&id) {
            v.tank_health = health;
        }
    }

    fn set_engine_running(&mut self, id: EntityId, on: bool) {
        if let Some(v) = self.vehicles.get_mut(&id) {
            v.engine_running = on;
        }
    }

    fn set_driveable(&mut self, id: EntityId, on: bool) {
        if let Some(v) = self.vehicles.get_mut(&id) {
            v.driveable = on;
        }
    }

    fn set_fireproof(&mut self, id: EntityId, on: bool) {
        if let Some(v) = self.vehicles.get_mut(&id) {
            v.fireproof = on;
        }
    }

    fn set_handbrake(&mut self, id: EntityId, on: bool) {
        if let Some(v) = self.vehicles.get_mut(&id) {
            v.handbrake_on = on;
        }
    }

    fn set_throttle(&mut self, value: f32) {
        self.applied_throttle = value;
    }

    fn set_brake(&mut self, value: f32) {
        self.applied_brake = value;
    }
}

impl DecorStore for ScriptedWorld {
    fn get_int(&self, id: EntityId, key: &str) -> i32 {
        self.decors
            .get(&(id, key.to_string()))
            .copied()
            .unwrap_or(0)
    }

    fn set_int(&mut self, id: EntityId, key: &str, value: i32) {
        self.decors.insert((id, key.to_string()), value);
    }
}
