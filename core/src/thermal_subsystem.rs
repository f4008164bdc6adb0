//! Engine thermal and damage model.
//!
//! The simulated quantity is coolant temperature, in degrees above the
//! standard reference point; block internals are not modelled (coolant
//! temperature is already a reasonable measure of engine health). Flow
//! rates are expressed per minute and scaled by the elapsed-time estimate
//! before being applied, which keeps the model frame-rate-independent to
//! first order.
//!
//! Derived states, in rising temperature order:
//!   cold → warming → operating → overheating → boiling over →
//!   burning oil → failed (terminal)
//!
//! Between the overheat and failure thresholds damage is interpolated,
//! not stepped: only the delta between the currently interpolated value
//! and the damage already charged is applied each tick, so health
//! recovers as the engine cools. Failure is irreversible except through
//! an external repair event.

use crate::config::ThermalConfig;
use crate::error::SimResult;
use crate::event::SimEvent;
use crate::record::VehicleRecord;
use crate::rng::SubsystemRng;
use crate::subsystem::{TickContext, VehicleSubsystem};
use crate::types::EntityId;
use crate::world::Host;

/// Throttle samples averaged for the operator's heat gain. Averaging
/// softens the on/off throttle of keyboard driving.
const THROTTLE_HISTORY_LEN: usize = 60;

/// Transient cooling effects cannot pull the engine below ambient minus
/// this offset.
const TRANSIENT_COOLING_FLOOR: f32 = 4.0;

pub struct ThermalSubsystem {
    config: ThermalConfig,
    rng: SubsystemRng,
    throttle_history: [f32; THROTTLE_HISTORY_LEN],
    throttle_index: usize,
}

impl ThermalSubsystem {
    pub fn new(config: ThermalConfig, rng: SubsystemRng) -> Self {
        Self {
            config,
            rng,
            throttle_history: [0.0; THROTTLE_HISTORY_LEN],
            throttle_index: 0,
        }
    }

    /// Seconds of simulated time covered by this tick.
    fn elapsed_seconds(&self, ctx: &TickContext<'_>) -> f32 {
        ctx.frames as f32 / ctx.world.fps().max(1.0)
    }

    /// Record the operator's current throttle position and return the
    /// rolling average. Travelling in reverse faster than 5 cm/s with
    /// the brake control held is presumed to be throttle.
    fn average_player_throttle(&mut self, ctx: &TickContext<'_>) -> f32 {
        let mut throttle = ctx.world.throttle_input();
        if ctx.world.forward_velocity(ctx.id) < -0.05 {
            throttle = ctx.world.brake_input();
        }

        self.throttle_history[self.throttle_index] = throttle;
        self.throttle_index = (self.throttle_index + 1) % THROTTLE_HISTORY_LEN;

        self.throttle_history.iter().sum::<f32>() / THROTTLE_HISTORY_LEN as f32
    }

    fn cooling_multiplier(&self, ctx: &TickContext<'_>) -> f32 {
        self.config
            .cooling_multipliers
            .get(&ctx.world.model(ctx.id))
            .copied()
            .unwrap_or(1.0)
    }

    /// Advance the temperature for a running engine.
    fn heat_running_engine(&mut self, ctx: &mut TickContext<'_>, elapsed_seconds: f32) {
        let gain_rate = self.config.gain_at_redline - self.config.gain_at_idle;
        let env = ctx.world.environment(ctx.id);

        // Heat produced is proportional to the square of load: the
        // operator's load comes from averaged throttle position, anyone
        // else's from a normalized-RPM mapping (idle RPM is 20%, hence
        // the 0.04 / 0.96 constants).
        let load = if ctx.world.player_vehicle() == Some(ctx.id) {
            let avg = self.average_player_throttle(ctx);
            avg * avg
        } else {
            let rpm = ctx.world.rpm(ctx.id);
            ((rpm * rpm - 0.04) / 0.96).clamp(0.0, 1.0)
        };

        let cfg = &self.config;
        let mut gained = load * gain_rate * env.heating_multiplier + cfg.gain_at_idle;

        // Heater recirculation while warming up, in place of a proper
        // thermodynamic equation.
        if ctx.record.engine_temperature < cfg.operating_temperature && !ctx.record.fan_running {
            gained += cfg.low_temperature_heating * env.heating_multiplier;
        }

        if !ctx.record.operating_temperature_reached
            && ctx.record.engine_temperature >= cfg.operating_temperature
        {
            ctx.record.operating_temperature_reached = true;
        }

        // Fan hysteresis: engages above operating + offset, cuts off
        // below operating - offset.
        if ctx.record.fan_running {
            if ctx.record.engine_temperature
                < cfg.operating_temperature - cfg.fan_deactivation_offset
            {
                ctx.record.fan_running = false;
                ctx.events.push(SimEvent::FanStateChanged {
                    id: ctx.id,
                    running: false,
                });
            } else {
                let fan_efficiency = cfg.fan_cooling * self.cooling_multiplier(ctx);
                gained -= fan_efficiency * env.cooling_multiplier;
            }
        } else if ctx.record.engine_temperature
            > cfg.operating_temperature + cfg.fan_activation_offset
        {
            ctx.record.fan_running = true;
            ctx.events.push(SimEvent::FanStateChanged {
                id: ctx.id,
                running: true,
            });
        }

        // Airflow over the radiator. Powersliding reduces the forward
        // component, so linear speed cools better than drifting.
        gained -= ctx.world.forward_velocity(ctx.id) * cfg.air_cooling_per_mps;

        // Rates above are per minute.
        gained = gained / 60.0 * elapsed_seconds;
        ctx.record.engine_temperature += gained;
    }

    /// Passive decay toward ambient while the engine is off.
    fn cool_stopped_engine(&mut self, ctx: &mut TickContext<'_>, elapsed_seconds: f32) {
        let cfg = &self.config;
        let ambient = ctx.world.environment(ctx.id).ambient_offset;

        // The keyed-off flag only means something while the operator is
        // still in the vehicle.
        if ctx.record.keyed_off && ctx.world.player_vehicle() != Some(ctx.id) {
            ctx.record.keyed_off = false;
        }

        if ctx.record.fan_running {
            ctx.record.fan_running = false;
            ctx.events.push(SimEvent::FanStateChanged {
                id: ctx.id,
                running: false,
            });
        }

        let lost = cfg.engine_off_cooling / 60.0 * elapsed_seconds;
        if ctx.record.engine_temperature >= ambient + lost {
            ctx.record.engine_temperature -= lost;
        } else {
            // Floor at ambient, never undershoot.
            ctx.record.engine_temperature = ambient;
        }

        if ctx.record.operating_temperature_reached
            && ctx.record.engine_temperature < cfg.operating_temperature * cfg.reheat_fraction
        {
            ctx.record.operating_temperature_reached = false;
        }
    }

    /// Rapid cooling from an extinguisher blast aimed at the engine
    /// block, and from immersion. Both are clamped so they cannot drive
    /// the engine below ambient minus a fixed offset.
    fn apply_transient_cooling(&mut self, ctx: &mut TickContext<'_>, elapsed_seconds: f32) {
        let cfg = &self.config;
        let ambient = ctx.world.environment(ctx.id).ambient_offset;
        let floor = ambient - TRANSIENT_COOLING_FLOOR;

        if ctx.world.extinguisher_aimed_at_engine(ctx.id) {
            let cooled = cfg.extinguisher_cooling_rate.max(0.0) * elapsed_seconds;
            ctx.record.engine_temperature =
                (ctx.record.engine_temperature - cooled).max(floor.min(ctx.record.engine_temperature));
        }

        // Boats ironically do not qualify: their engines never hit the
        // water line.
        if ctx.world.model_kind(ctx.id) != crate::world::ModelKind::Boat
            && cfg.immersion_cooling_rate > 0.0
        {
            let submerged = ctx.world.submerged_level(ctx.id).clamp(0.0, 1.0);
            if submerged > 0.0 {
                let cooled = submerged * cfg.immersion_cooling_rate * elapsed_seconds;
                ctx.record.engine_temperature =
                    (ctx.record.engine_temperature - cooled).max(floor.min(ctx.record.engine_temperature));
            }
        }
    }

    /// Charge (or refund) interpolated overheat damage, and handle the
    /// failure band.
    fn apply_overheat_damage(&mut self, ctx: &mut TickContext<'_>, elapsed_seconds: f32) {
        let cfg = &self.config;
        let temperature = ctx.record.engine_temperature;
        let health = ctx.world.engine_health(ctx.id);
        if health <= 0.0 {
            return;
        }

        // Boil-over / burning-oil state flags follow the band edges.
        self.update_band_flags(ctx, temperature);

        if temperature > cfg.overheat_threshold && temperature < cfg.failure_threshold {
            let prorated = if temperature < cfg.burn_oil_threshold {
                (temperature - cfg.overheat_threshold)
                    / (cfg.burn_oil_threshold - cfg.overheat_threshold)
                    * cfg.overheat_damage
            } else {
                cfg.overheat_damage
                    + (temperature - cfg.burn_oil_threshold)
                        / (cfg.failure_threshold - cfg.burn_oil_threshold)
                        * cfg.burn_oil_damage
            };

            let delta = prorated - ctx.record.overheat_damage();
            if delta >= health {
                self.destroy_engine(ctx.id, ctx.record, ctx.world, ctx.events);
            } else {
                ctx.world.set_engine_health(ctx.id, health - delta);
                ctx.record.last_engine_health = health - delta;
            }
            ctx.record.set_overheat_damage(prorated);
        } else if temperature >= cfg.failure_threshold && ctx.world.engine_running(ctx.id) {
            if cfg.failure_instantaneous {
                self.destroy_engine(ctx.id, ctx.record, ctx.world, ctx.events);
            } else {
                let bricking = cfg.failure_damage_per_second * elapsed_seconds;
                if bricking >= health {
                    self.destroy_engine(ctx.id, ctx.record, ctx.world, ctx.events);
                } else {
                    ctx.world.set_engine_health(ctx.id, health - bricking);
                    ctx.record.last_engine_health = health - bricking;
                }
            }
        }
    }

    fn update_band_flags(&self, ctx: &mut TickContext<'_>, temperature: f32) {
        let cfg = &self.config;

        if temperature > cfg.overheat_threshold {
            if !ctx.record.boiling_over {
                ctx.record.boiling_over = true;
                log::debug!("vehicle {:#x} boiling over at {temperature:.1}", ctx.id);
                ctx.events.push(SimEvent::BoilingOver {
                    id: ctx.id,
                    temperature,
                });
            }
        } else {
            ctx.record.boiling_over = false;
        }

        if temperature > cfg.burn_oil_threshold {
            if !ctx.record.burning_oil {
                ctx.record.burning_oil = true;
                ctx.events.push(SimEvent::BurningOil {
                    id: ctx.id,
                    temperature,
                });
            }
        } else {
            ctx.record.burning_oil = false;
        }
    }

    /// Large single impacts are disproportionately destructive compared
    /// to the sum of many small ones: positive single-tick damage above
    /// the threshold is exponentiated, minus the base, times a random
    /// factor. Reinforced models are exempt.
    fn apply_bonus_damage(&mut self, ctx: &mut TickContext<'_>, damage: f32) {
        let cfg = &self.config.bonus_damage;
        if self
            .config
            .bonus_damage_immune
            .contains(&ctx.world.model(ctx.id))
        {
            return;
        }

        let damage = damage * cfg.multiplier.max(0.0);
        let factor = self.rng.range_f32(
            cfg.random_min.min(cfg.random_max),
            cfg.random_max.max(cfg.random_min),
        );
        let bonus = (damage.powf(cfg.exponent) - damage) * factor;

        let health = ctx.world.engine_health(ctx.id);
        if health <= 0.0 {
            return;
        }
        // Minuscule bonuses only accumulate rounding error.
        if bonus <= 1.0 {
            return;
        }

        ctx.events.push(SimEvent::BonusDamageApplied {
            id: ctx.id,
            base_damage: damage,
            bonus_damage: bonus,
        });
        if bonus >= health {
            self.destroy_engine(ctx.id, ctx.record, ctx.world, ctx.events);
        } else {
            ctx.world.set_engine_health(ctx.id, health - bonus);
        }
    }

    /// Terminal failure: the engine is bricked until an external repair.
    /// The entity is fireproofed for exactly one subsequent tick so the
    /// mechanical failure does not cascade into an ignition.
    fn destroy_engine(
        &mut self,
        id: EntityId,
        record: &mut VehicleRecord,
        world: &mut dyn Host,
        events: &mut Vec<SimEvent>,
    ) {
        log::info!(
            "vehicle {id:#x} engine destroyed at {:.1}",
            record.engine_temperature
        );
        if !record.temporarily_fireproof() {
            record.set_temporary_fireproofing(world, id, true);
        }
        world.set_engine_health(id, 0.0);
        record.last_engine_health = 0.0;
        world.set_engine_running(id, false);
        world.set_driveable(id, false);
        record.mark_failed();
        record.set_overheat_damage(0.0);
        events.push(SimEvent::EngineDestroyed {
            id,
            temperature: record.engine_temperature,
        });
    }

    /// Housekeeping when any health pool increased between ticks: the
    /// entity was repaired externally.
    fn handle_repair(&mut self, ctx: &mut TickContext<'_>) {
        if ctx.record.is_dead() {
            ctx.record.clear_failed();
            ctx.world.set_driveable(ctx.id, true);
        }
        ctx.record.last_engine_health = ctx.world.engine_health(ctx.id);
        ctx.record.last_body_health = ctx.world.body_health(ctx.id);
        ctx.record.last_tank_health = ctx.world.tank_health(ctx.id);
        ctx.record.set_overheat_damage(0.0);
        ctx.record.boiling_over = false;
        ctx.record.burning_oil = false;
        ctx.record.engine_temperature = ctx
            .record
            .engine_temperature
            .min(self.config.operating_temperature);
        log::debug!("vehicle {:#x} repaired", ctx.id);
        ctx.events.push(SimEvent::EngineRepaired { id: ctx.id });
    }

    /// Keep burning vehicles from exploding by flooring engine and tank
    /// health. Under a small batch size this may not run often enough to
    /// win; best effort.
    fn handle_anti_explosion(&self, ctx: &mut TickContext<'_>) {
        if !self.config.anti_explosion || !ctx.world.is_on_fire(ctx.id) {
            return;
        }
        if ctx.world.engine_health(ctx.id) < -500.0 {
            ctx.world.set_engine_health(ctx.id, -500.0);
            ctx.record.last_engine_health = -500.0;
        }
        if ctx.world.tank_health(ctx.id) < -100.0 {
            ctx.world.set_tank_health(ctx.id, -100.0);
            ctx.record.last_tank_health = -100.0;
        }
    }
}

impl VehicleSubsystem for ThermalSubsystem {
    fn name(&self) -> &'static str {
        "thermal"
    }

    fn on_tick(&mut self, ctx: &mut TickContext<'_>) -> SimResult<()> {
        if !ctx.world.model_kind(ctx.id).has_engine_thermals() {
            return Ok(());
        }

        let elapsed_seconds = self.elapsed_seconds(ctx);

        // React to being repaired before charging anything new.
        let damage = ctx.record.last_engine_health - ctx.world.engine_health(ctx.id);
        if damage < 0.0
            || ctx.record.last_body_health < ctx.world.body_health(ctx.id)
            || ctx.record.last_tank_health < ctx.world.tank_health(ctx.id)
        {
            self.handle_repair(ctx);
        } else if self.config.bonus_damage.enabled
            && damage > 0.0
            && damage > self.config.bonus_damage.threshold
            && ctx.world.engine_health(ctx.id) > 0.0
        {
            self.apply_bonus_damage(ctx, damage);
        }

        self.handle_anti_explosion(ctx);

        self.apply_transient_cooling(ctx, elapsed_seconds);

        if ctx.world.engine_running(ctx.id) {
            self.heat_running_engine(ctx, elapsed_seconds);
        } else {
            self.cool_stopped_engine(ctx, elapsed_seconds);
        }

        self.apply_overheat_damage(ctx, elapsed_seconds);

        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
