//! Closed-loop speed hold for the operator's vehicle.
//!
//! State machine: off → on → {cancelled, off}. `cancelled` is a sub-state
//! of on: the system stays armed and keeps its setpoint but stops driving
//! the throttle until resumed.
//!
//! The correction loop is not a classical PID. Each tick it sums three
//! weighted error terms — speed, expected-vs-actual displacement since the
//! previous tick, and expected-vs-measured rate of speed change — and
//! clamps the sum to [0, 1]. The heavily weighted distance term dominates
//! and damps oscillation.

use crate::config::CruiseConfig;
use crate::error::SimResult;
use crate::event::SimEvent;
use crate::record::VehicleRecord;
use crate::subsystem::{TickContext, VehicleSubsystem};
use crate::transmission_subsystem::{ShifterMode, MT_GEAR, MT_GET_SHIFT_MODE};
use crate::types::EntityId;
use crate::world::ModelKind;
use crate::command::HostInput;
use glam::Vec3;

/// Pressing the set key while holding speed re-sets the setpoint only if
/// current speed has drifted further than this from it; otherwise the
/// press means "switch off".
const SET_SPEED_DEADBAND: f32 = 1.0;

/// Session state, scoped to whichever vehicle the operator currently
/// controls. Reset whenever that changes; never persists across vehicles.
#[derive(Debug, Clone, Default)]
pub struct CruiseSession {
    /// System armed. Use `holding()` for actual operational status.
    pub on: bool,
    /// Armed but not driving the throttle.
    pub cancelled: bool,
    /// Held speed in m/s. Retained through cancellation and deactivation
    /// for a later resume; cleared with the session.
    pub set_speed: f32,
    pub last_measured_speed: f32,
    pub last_output: f32,
    vehicle: Option<EntityId>,
    last_position: Option<Vec3>,
    last_gear: i32,
}

impl CruiseSession {
    pub fn holding(&self) -> bool {
        self.on && !self.cancelled
    }
}

pub struct CruiseSubsystem {
    config: CruiseConfig,
    session: CruiseSession,
    /// External manual-transmission add-on detected on this host. Latched
    /// the first time the gear attribute reads non-zero.
    mt_present: bool,
    should_cancel: Option<&'static str>,
    should_deactivate: Option<&'static str>,
}

impl CruiseSubsystem {
    pub fn new(config: CruiseConfig) -> Self {
        Self {
            config,
            session: CruiseSession::default(),
            mt_present: false,
            should_cancel: None,
            should_deactivate: None,
        }
    }

    pub fn session(&self) -> &CruiseSession {
        &self.session
    }

    fn reset_session(&mut self) {
        self.session = CruiseSession {
            last_output: self.config.default_output,
            ..CruiseSession::default()
        };
        self.should_cancel = None;
        self.should_deactivate = None;
    }

    fn minimum_speed(&self, kind: ModelKind) -> f32 {
        if kind == ModelKind::Bicycle {
            self.config.bicycle_minimum_speed
        } else {
            self.config.minimum_speed
        }
    }

    fn eligible(&self, kind: ModelKind, record: &VehicleRecord) -> bool {
        match kind {
            ModelKind::Bicycle => self.config.allow_bicycles,
            ModelKind::Helicopter | ModelKind::Plane | ModelKind::Train => false,
            _ => kind.cruise_eligible() || record.has_cruise_control(),
        }
    }

    fn arm(&mut self, id: EntityId, speed: f32, events: &mut Vec<SimEvent>) {
        self.session.on = true;
        self.session.cancelled = false;
        self.session.set_speed = speed;
        self.session.last_measured_speed = speed;
        self.session.last_position = None;
        events.push(SimEvent::CruiseActivated { id, set_speed: speed });
    }

    fn handle_inputs(&mut self, ctx: &mut TickContext<'_>, minimum: f32) {
        let speed = ctx.world.speed(ctx.id);
        for input in ctx.inputs {
            match input {
                HostInput::CruiseToggle => {
                    if !self.session.on {
                        if speed >= minimum {
                            self.arm(ctx.id, speed, ctx.events);
                            log::debug!("cruise activated at {speed:.1} m/s");
                        }
                    } else if self.session.cancelled {
                        self.session.cancelled = false;
                        self.session.set_speed = speed;
                        self.session.last_measured_speed = speed;
                        self.session.last_position = None;
                        ctx.events.push(SimEvent::CruiseResumed {
                            id: ctx.id,
                            set_speed: speed,
                        });
                    } else if (speed - self.session.set_speed).abs() > SET_SPEED_DEADBAND {
                        self.session.set_speed = speed;
                        self.session.last_measured_speed = speed;
                        ctx.events.push(SimEvent::CruiseSetSpeedChanged {
                            id: ctx.id,
                            set_speed: speed,
                        });
                    } else {
                        self.should_deactivate = Some("operator");
                    }
                }
                HostInput::CruiseResume => {
                    // Return to the retained setpoint after a cancel or
                    // a full deactivation.
                    if self.session.set_speed >= minimum {
                        if self.session.on && self.session.cancelled {
                            self.session.cancelled = false;
                            self.session.last_measured_speed = speed;
                            self.session.last_position = None;
                            ctx.events.push(SimEvent::CruiseResumed {
                                id: ctx.id,
                                set_speed: self.session.set_speed,
                            });
                        } else if !self.session.on && speed >= minimum {
                            self.session.on = true;
                            self.session.cancelled = false;
                            self.session.last_measured_speed = speed;
                            self.session.last_position = None;
                            ctx.events.push(SimEvent::CruiseResumed {
                                id: ctx.id,
                                set_speed: self.session.set_speed,
                            });
                        }
                    }
                }
                HostInput::CruiseCancel => {
                    if self.session.on && !self.session.cancelled {
                        self.should_cancel = Some("operator");
                    }
                }
                _ => {}
            }
        }
    }

    /// Deactivating conditions, checked every tick in priority order.
    fn check_interrupts(&mut self, ctx: &mut TickContext<'_>, minimum: f32) {
        if ctx.world.has_collided(ctx.id) {
            self.should_deactivate = Some("collision");
            log::debug!("cruise deactivated by collision sensor");
        } else {
            if ctx.world.brake_held() && !self.session.cancelled {
                self.should_cancel = Some("brake");
            } else if ctx.world.handbrake_held() && !self.session.cancelled {
                self.should_cancel = Some("handbrake");
            }
            if ctx.world.speed(ctx.id) < minimum && !self.session.cancelled {
                self.should_deactivate = Some("below_minimum_speed");
            }
            if self.mt_present && !self.session.cancelled {
                let gear = ctx.world.get_int(ctx.id, MT_GEAR);
                let shift_mode = ctx.world.get_int(ctx.id, MT_GET_SHIFT_MODE);
                if gear != self.session.last_gear && shift_mode != ShifterMode::Automatic as i32 {
                    self.should_cancel = Some("shifter");
                }
            }
        }

        if self.mt_present {
            self.session.last_gear = ctx.world.get_int(ctx.id, MT_GEAR);
        }
    }

    /// One step of the correction loop. Writes throttle (and possibly
    /// brake) through the effectors.
    fn hold_speed(&mut self, ctx: &mut TickContext<'_>) {
        let cfg = &self.config;
        let fps = ctx.world.fps().max(1.0);
        let speed = ctx.world.speed(ctx.id);
        let position = ctx.world.position(ctx.id);

        let desired_distance = speed / fps;
        let actual_distance = match self.session.last_position {
            Some(last) => last.distance(position),
            None => desired_distance,
        };

        // Slight upward bias on the target counters the steady-state sag
        // of a pure error sum.
        let corrected_speed = self.session.set_speed.powf(1.01);
        let desired_accel = if speed < self.session.set_speed {
            (1.0 + corrected_speed - speed).min(3.5) / fps
        } else {
            0.0
        };
        let actual_accel = speed - self.session.last_measured_speed;

        let speed_error = (self.session.set_speed - speed) * cfg.speed_error_weight;
        let distance_error = (desired_distance - actual_distance) * cfg.distance_error_weight;
        let accel_error = (desired_accel - actual_accel) * cfg.accel_error_weight;

        self.session.last_measured_speed = speed;
        self.session.last_position = Some(position);

        let correction = speed_error + distance_error + accel_error;
        let output = correction.clamp(0.0, 1.0);
        self.session.last_output = output;
        ctx.world.set_throttle(output);

        // Automatic braking: only for brake-capable vehicles, only once
        // the throttle is already saturated at zero, and only past the
        // overspeed threshold.
        if cfg.braking_enabled
            && ctx.record.has_cruise_automatic_braking()
            && output <= 0.0
            && speed > self.session.set_speed + cfg.braking_threshold
        {
            let braking = (-correction).clamp(0.0, 1.0);
            ctx.world.set_brake(braking);
        }
    }
}

impl VehicleSubsystem for CruiseSubsystem {
    fn name(&self) -> &'static str {
        "cruise"
    }

    fn on_tick(&mut self, ctx: &mut TickContext<'_>) -> SimResult<()> {
        if !self.config.enabled {
            return Ok(());
        }

        // The session follows the operator. Any other vehicle's tick is
        // not our business, except to tear down a session whose vehicle
        // the operator has left.
        if ctx.world.player_vehicle() != Some(ctx.id) {
            if self.session.vehicle == Some(ctx.id) {
                if self.session.on {
                    // Clear any locked accelerations before letting go.
                    ctx.world.set_throttle(0.0);
                    ctx.world.set_brake(0.0);
                    ctx.events.push(SimEvent::CruiseDeactivated {
                        id: ctx.id,
                        reason: "operator_left_vehicle".into(),
                    });
                }
                self.reset_session();
            }
            return Ok(());
        }

        let kind = ctx.world.model_kind(ctx.id);
        if !self.eligible(kind, ctx.record) {
            if self.session.on {
                self.reset_session();
            }
            return Ok(());
        }

        if self.session.vehicle != Some(ctx.id) {
            // Operator switched vehicles; the old session dies with it.
            self.reset_session();
            self.session.vehicle = Some(ctx.id);
        }

        // Capability flags from the override tables, latched onto the
        // record the first time the vehicle is seen here.
        if self.config.braking_models.contains(&ctx.world.model(ctx.id)) {
            ctx.record.has_braking_cruise = true;
        }

        if !self.mt_present && ctx.world.get_int(ctx.id, MT_GEAR) != 0 {
            self.mt_present = true;
            log::debug!("manual transmission add-on detected");
        }
        // Keep the gear baseline current while idle, so arming does not
        // read the operator's ordinary driving as a shift.
        if self.mt_present && !self.session.on {
            self.session.last_gear = ctx.world.get_int(ctx.id, MT_GEAR);
        }

        let minimum = self.minimum_speed(kind);
        self.handle_inputs(ctx, minimum);

        if !self.session.on {
            return Ok(());
        }

        self.check_interrupts(ctx, minimum);

        if let Some(reason) = self.should_deactivate.take() {
            self.session.on = false;
            self.session.cancelled = false;
            self.session.last_output = self.config.default_output;
            self.session.last_measured_speed = 0.0;
            self.session.last_position = None;
            self.should_cancel = None;
            ctx.world.set_throttle(0.0);
            ctx.events.push(SimEvent::CruiseDeactivated {
                id: ctx.id,
                reason: reason.into(),
            });
            return Ok(());
        }
        if let Some(reason) = self.should_cancel.take() {
            self.session.cancelled = true;
            ctx.world.set_throttle(0.0);
            ctx.events.push(SimEvent::CruiseCancelled {
                id: ctx.id,
                reason: reason.into(),
            });
            return Ok(());
        }
        if self.session.cancelled {
            return Ok(());
        }

        // Wheel speed revs up effortlessly off the ground; a real system
        // would cut throttle, but holding it wide open is more fun.
        if ctx.world.is_in_air(ctx.id) && self.config.overrev_in_air {
            ctx.world.set_throttle(1.0);
            return Ok(());
        }

        self.hold_speed(ctx);
        Ok(())
    }

    fn on_evicted(&mut self, id: EntityId) {
        if self.session.vehicle == Some(id) {
            self.reset_session();
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
