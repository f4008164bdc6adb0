//! Parking brake simulation.
//!
//! A difficulty feature: naturally spawned, unoccupied vehicles have a
//! chance of sitting with their parking brake locked, and the operator
//! can lock or release the brake while near-stopped. While locked the
//! handbrake effector is held on every tick, so a stolen getaway car
//! goes nowhere until the brake is released.

use crate::config::ParkingBrakeConfig;
use crate::error::SimResult;
use crate::event::SimEvent;
use crate::rng::SubsystemRng;
use crate::subsystem::{TickContext, VehicleSubsystem};
use crate::types::EntityId;
use crate::command::HostInput;
use std::collections::HashSet;

pub struct ParkingBrakeSubsystem {
    config: ParkingBrakeConfig,
    rng: SubsystemRng,
    /// Vehicles whose spawn-lock roll has already happened.
    seen: HashSet<EntityId>,
}

impl ParkingBrakeSubsystem {
    pub fn new(config: ParkingBrakeConfig, rng: SubsystemRng) -> Self {
        Self {
            config,
            rng,
            seen: HashSet::new(),
        }
    }
}

impl VehicleSubsystem for ParkingBrakeSubsystem {
    fn name(&self) -> &'static str {
        "parking_brake"
    }

    fn on_tick(&mut self, ctx: &mut TickContext<'_>) -> SimResult<()> {
        if !self.config.enabled {
            return Ok(());
        }
        if !ctx.world.model_kind(ctx.id).transmission_eligible() {
            return Ok(());
        }

        // Spawn-lock roll, once per tracked entity.
        if self.seen.insert(ctx.id)
            && !ctx.world.has_driver(ctx.id)
            && ctx.world.speed(ctx.id) < 0.1
            && self.rng.chance(self.config.spawn_lock_probability.clamp(0.0, 1.0))
        {
            ctx.record.parking_brake_locked = true;
            ctx.events.push(SimEvent::ParkingBrakeLocked { id: ctx.id });
        }

        // Operator toggle, only at parking speeds.
        if ctx.world.player_vehicle() == Some(ctx.id)
            && ctx.inputs.contains(&HostInput::ParkingBrakeToggle)
            && ctx.world.speed(ctx.id) <= self.config.speed_limit.max(0.0)
        {
            ctx.record.parking_brake_locked = !ctx.record.parking_brake_locked;
            if ctx.record.parking_brake_locked {
                ctx.events.push(SimEvent::ParkingBrakeLocked { id: ctx.id });
            } else {
                ctx.world.set_handbrake(ctx.id, false);
                ctx.events.push(SimEvent::ParkingBrakeReleased { id: ctx.id });
            }
        }

        if ctx.record.parking_brake_locked {
            ctx.world.set_handbrake(ctx.id, true);
        }
        Ok(())
    }

    fn on_evicted(&mut self, id: EntityId) {
        self.seen.remove(&id);
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
