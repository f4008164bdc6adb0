//! Interop with the optional external manual-transmission add-on, and
//! once-per-lifetime transmission assignment.
//!
//! The add-on is detected dynamically: if the gear attribute in the
//! decorator store ever reads non-zero, it is running. Its absence must
//! not degrade anything else — without it this subsystem only records a
//! transmission type on the vehicle.

use crate::config::TransmissionConfig;
use crate::error::SimResult;
use crate::event::SimEvent;
use crate::record::TransmissionType;
use crate::rng::SubsystemRng;
use crate::subsystem::{TickContext, VehicleSubsystem};
use crate::types::EntityId;
use crate::world::{ModelKind, VehicleClass};

/// Decorator keys owned by the external add-on. Do not edit unless that
/// add-on changes.
pub const MT_GEAR: &str = "mt_gear";
pub const MT_SET_SHIFT_MODE: &str = "mt_set_shiftmode";
pub const MT_GET_SHIFT_MODE: &str = "mt_get_shiftmode";

/// The add-on's shifter interface modes, matched to its wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ShifterMode {
    Sequential = 1,
    HPattern = 2,
    Automatic = 3,
}

pub struct TransmissionSubsystem {
    config: TransmissionConfig,
    rng: SubsystemRng,
    mt_present: bool,
    last_vehicle: Option<EntityId>,
}

impl TransmissionSubsystem {
    pub fn new(config: TransmissionConfig, rng: SubsystemRng) -> Self {
        Self {
            config,
            rng,
            mt_present: false,
            last_vehicle: None,
        }
    }

    /// Percentage chance this vehicle spawned with a manual gearbox.
    fn manual_frequency(&self, class: VehicleClass) -> f32 {
        self.config
            .class_manual_frequencies
            .get(&class)
            .copied()
            .unwrap_or(self.config.generic_manual_frequency)
            .clamp(0.0, 100.0)
    }

    fn assign(&mut self, ctx: &mut TickContext<'_>) {
        if ctx.record.transmission_assigned() {
            return;
        }

        let kind = ctx.world.model_kind(ctx.id);
        let class = ctx.world.vehicle_class(ctx.id);

        let (transmission, mode) = if kind == ModelKind::Motorcycle
            && self.config.motorcycles_sequential
        {
            (TransmissionType::Sequential, ShifterMode::Sequential)
        } else if self.rng.percentage() < self.manual_frequency(class) {
            let mode = if self.config.manual_use_sequential {
                ShifterMode::Sequential
            } else {
                ShifterMode::HPattern
            };
            (TransmissionType::Manual, mode)
        } else {
            (TransmissionType::Automatic, ShifterMode::Automatic)
        };

        ctx.record.assign_transmission(transmission);
        if self.mt_present {
            ctx.world
                .set_int(ctx.id, MT_SET_SHIFT_MODE, mode as i32);
        }
        log::debug!("vehicle {:#x} assigned {transmission:?} gearbox", ctx.id);
        ctx.events.push(SimEvent::TransmissionAssigned {
            id: ctx.id,
            transmission,
        });
    }
}

impl VehicleSubsystem for TransmissionSubsystem {
    fn name(&self) -> &'static str {
        "transmission"
    }

    fn on_tick(&mut self, ctx: &mut TickContext<'_>) -> SimResult<()> {
        if !self.config.enabled {
            return Ok(());
        }
        // Only the operator's vehicle matters: everyone else is presumed
        // competent with whatever gearbox their vehicle has.
        if ctx.world.player_vehicle() != Some(ctx.id) {
            return Ok(());
        }
        if !ctx.world.model_kind(ctx.id).transmission_eligible() {
            return Ok(());
        }

        if !self.mt_present && ctx.world.get_int(ctx.id, MT_GEAR) != 0 {
            self.mt_present = true;
            log::info!("manual transmission add-on detected");
        }

        // Fires once per vehicle entered.
        if self.last_vehicle != Some(ctx.id) {
            self.last_vehicle = Some(ctx.id);
            self.assign(ctx);
        }
        Ok(())
    }

    fn on_evicted(&mut self, id: EntityId) {
        if self.last_vehicle == Some(id) {
            self.last_vehicle = None;
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
