//! Notable simulation events.
//!
//! RULE: Subsystems communicate with the host (and with tests) ONLY through
//! events; a subsystem never calls another subsystem's functions directly.
//! Variants are added as features land — never removed or reordered.
//!
//! Events are a best-effort side channel. Nothing in the core depends on a
//! consumer observing them.

use crate::record::TransmissionType;
use crate::types::{EntityId, Frame};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    // ── Scheduler events ───────────────────────────
    VehicleRegistered {
        id: EntityId,
        frame: Frame,
    },
    VehicleEvicted {
        id: EntityId,
        frame: Frame,
    },

    // ── Thermal events ─────────────────────────────
    FanStateChanged {
        id: EntityId,
        running: bool,
    },
    BoilingOver {
        id: EntityId,
        temperature: f32,
    },
    BurningOil {
        id: EntityId,
        temperature: f32,
    },
    EngineDestroyed {
        id: EntityId,
        temperature: f32,
    },
    EngineRepaired {
        id: EntityId,
    },
    BonusDamageApplied {
        id: EntityId,
        base_damage: f32,
        bonus_damage: f32,
    },

    // ── Cruise control events ──────────────────────
    CruiseActivated {
        id: EntityId,
        set_speed: f32,
    },
    CruiseSetSpeedChanged {
        id: EntityId,
        set_speed: f32,
    },
    CruiseResumed {
        id: EntityId,
        set_speed: f32,
    },
    CruiseCancelled {
        id: EntityId,
        reason: String,
    },
    CruiseDeactivated {
        id: EntityId,
        reason: String,
    },

    // ── Transmission events ────────────────────────
    TransmissionAssigned {
        id: EntityId,
        transmission: TransmissionType,
    },

    // ── Parking brake events ───────────────────────
    ParkingBrakeLocked {
        id: EntityId,
    },
    ParkingBrakeReleased {
        id: EntityId,
    },
}

/// Extract a stable string name from a SimEvent variant.
/// Used by the runner's end-of-run tally.
pub fn event_type_name(event: &SimEvent) -> &'static str {
    match event {
        SimEvent::VehicleRegistered { .. } => "vehicle_registered",
        SimEvent::VehicleEvicted { .. } => "vehicle_evicted",
        SimEvent::FanStateChanged { .. } => "fan_state_changed",
        SimEvent::BoilingOver { .. } => "boiling_over",
        SimEvent::BurningOil { .. } => "burning_oil",
        SimEvent::EngineDestroyed { .. } => "engine_destroyed",
        SimEvent::EngineRepaired { .. } => "engine_repaired",
        SimEvent::BonusDamageApplied { .. } => "bonus_damage_applied",
        SimEvent::CruiseActivated { .. } => "cruise_activated",
        SimEvent::CruiseSetSpeedChanged { .. } => "cruise_set_speed_changed",
        SimEvent::CruiseResumed { .. } => "cruise_resumed",
        SimEvent::CruiseCancelled { .. } => "cruise_cancelled",
        SimEvent::CruiseDeactivated { .. } => "cruise_deactivated",
        SimEvent::TransmissionAssigned { .. } => "transmission_assigned",
        SimEvent::ParkingBrakeLocked { .. } => "parking_brake_locked",
        SimEvent::ParkingBrakeReleased { .. } => "parking_brake_released",
    }
}
