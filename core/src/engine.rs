//! The amortized tick scheduler — the heart of the simulation.
//!
//! EXECUTION ORDER per vehicle visit (fixed, documented, never reordered):
//!   1. Expire one-tick overrides (temporary fireproofing)
//!   2. Odometer accumulation
//!   3. Subsystems, in registration order:
//!        transmission → thermal → cruise → parking brake
//!   4. Snapshot last-known health/position for next-tick deltas
//!
//! RULES:
//!   - The operator's vehicle is advanced every frame, unconditionally.
//!   - All other vehicles share a fixed per-frame batch, so frame cost is
//!     O(batch) no matter how many entities are tracked.
//!   - No entity is advanced twice in one frame (per-frame handled set).
//!   - A vanished entity is evicted before anything else touches it, and
//!     never aborts the rest of the batch.

use crate::command::HostInput;
use crate::config::SimConfig;
use crate::cruise_subsystem::{CruiseSession, CruiseSubsystem};
use crate::error::SimResult;
use crate::event::SimEvent;
use crate::parking_brake_subsystem::ParkingBrakeSubsystem;
use crate::record::VehicleRecord;
use crate::registry::Registry;
use crate::rng::{RngBank, SubsystemSlot};
use crate::subsystem::{TickContext, VehicleSubsystem};
use crate::thermal_subsystem::ThermalSubsystem;
use crate::transmission_subsystem::TransmissionSubsystem;
use crate::types::{EntityId, Frame};
use crate::world::Host;
use std::collections::HashSet;

pub struct SimEngine {
    config: SimConfig,
    registry: Registry,
    subsystems: Vec<Box<dyn VehicleSubsystem>>,

    frame: Frame,
    /// Seconds until the next full world scan. Counts down only while
    /// the admission queue is empty.
    scan_timer: f32,
    /// Vehicles discovered by the last scan, not yet admitted. Drained
    /// from the back, batch-per-frame.
    admission_queue: Vec<EntityId>,
    /// Round-robin position in the registry.
    cursor: usize,
    /// Vehicles already advanced this frame. Prevents double advancement
    /// when the tracked population is smaller than the batch size.
    handled: HashSet<EntityId>,
    /// Operator inputs queued since the previous frame.
    inputs: Vec<HostInput>,
}

impl SimEngine {
    /// Engine with no subsystems registered. Tests use this to exercise
    /// the scheduler in isolation.
    pub fn new(config: SimConfig, seed: u64) -> Self {
        let bank = RngBank::new(seed);
        Self {
            registry: Registry::new(bank.for_subsystem(SubsystemSlot::Registry)),
            config,
            subsystems: Vec::new(),
            frame: 0,
            scan_timer: 0.0,
            admission_queue: Vec::new(),
            cursor: 0,
            handled: HashSet::new(),
            inputs: Vec::new(),
        }
    }

    /// Build a fully wired engine with all subsystems registered.
    /// Call this instead of new() + manual register() calls.
    pub fn build(config: SimConfig, seed: u64) -> Self {
        let bank = RngBank::new(seed);
        let mut engine = SimEngine::new(config.clone(), seed);

        // EXECUTION ORDER — fixed, documented, never reordered.
        engine.register(Box::new(TransmissionSubsystem::new(
            config.transmission.clone(),
            bank.for_subsystem(SubsystemSlot::Transmission),
        )));
        engine.register(Box::new(ThermalSubsystem::new(
            config.thermal.clone(),
            bank.for_subsystem(SubsystemSlot::Thermal),
        )));
        engine.register(Box::new(CruiseSubsystem::new(
            config.cruise.clone(),
        )));
        engine.register(Box::new(ParkingBrakeSubsystem::new(
            config.parking_brake.clone(),
            bank.for_subsystem(SubsystemSlot::ParkingBrake),
        )));
        engine
    }

    /// Register a subsystem. Call in the documented execution order,
    /// before the first frame; subscriptions never change mid-run.
    pub fn register(&mut self, subsystem: Box<dyn VehicleSubsystem>) {
        self.subsystems.push(subsystem);
    }

    /// Queue a discrete operator input for the next frame.
    pub fn queue_input(&mut self, input: HostInput) {
        self.inputs.push(input);
    }

    pub fn frame(&self) -> Frame {
        self.frame
    }

    pub fn tracked_count(&self) -> usize {
        self.registry.len()
    }

    pub fn is_tracking(&self, id: EntityId) -> bool {
        self.registry.is_tracking(id)
    }

    pub fn record(&self, id: EntityId) -> Option<&VehicleRecord> {
        self.registry.get(id)
    }

    pub fn record_mut(&mut self, id: EntityId) -> Option<&mut VehicleRecord> {
        self.registry.get_mut(id)
    }

    /// Current cruise control session, if the cruise subsystem is
    /// registered. Used by the runner's status line and by tests.
    pub fn cruise_session(&self) -> Option<&CruiseSession> {
        self.subsystems.iter().find_map(|sub| {
            sub.as_any()
                .downcast_ref::<CruiseSubsystem>()
                .map(|cruise| cruise.session())
        })
    }

    /// Advance one host frame. This is the core scheduling step.
    ///
    /// Returns the notable events of the frame. Never panics for a
    /// malformed or vanished entity; such entities are evicted and the
    /// rest of the batch continues.
    pub fn advance_frame(&mut self, world: &mut dyn Host) -> SimResult<Vec<SimEvent>> {
        let mut events = Vec::new();

        if world.fps() <= 0.0 {
            self.inputs.clear();
            return Ok(events);
        }
        if world.is_loading() {
            // The host is tearing the world down; every handle we knew
            // about is about to be reused.
            if !self.registry.is_empty() {
                self.registry.clear();
                self.cursor = 0;
                self.admission_queue.clear();
            }
            self.inputs.clear();
            return Ok(events);
        }
        if world.is_paused() {
            self.inputs.clear();
            return Ok(events);
        }

        self.frame += 1;
        self.handled.clear();

        self.process_player_vehicle(world, &mut events);

        if self.config.scheduler.track_all_vehicles {
            self.scan_for_new_vehicles(world, &mut events);

            let batch = self.config.scheduler.batch_size();
            for _ in 0..batch {
                self.process_next_vehicle(world, &mut events);
            }
        }

        self.inputs.clear();
        Ok(events)
    }

    /// The operator's vehicle is advanced every frame with frames = 1,
    /// outside the batch accounting. The most recently occupied vehicle
    /// keeps getting the every-frame treatment after the operator steps
    /// out, until it despawns.
    fn process_player_vehicle(&mut self, world: &mut dyn Host, events: &mut Vec<SimEvent>) {
        let Some(id) = world.player_last_vehicle() else {
            return;
        };
        if !world.exists(id) {
            return;
        }
        if self
            .registry
            .ensure(world, id, self.config.thermal.operating_temperature)
        {
            events.push(SimEvent::VehicleRegistered { id, frame: self.frame });
        }
        self.handled.insert(id);
        self.process_vehicle(world, id, 1, events);
    }

    /// Discovery: refill the admission queue when the scan delay elapses,
    /// otherwise admit up to one batch of queued vehicles into the
    /// registry (without advancing them yet).
    fn scan_for_new_vehicles(&mut self, world: &mut dyn Host, events: &mut Vec<SimEvent>) {
        if self.admission_queue.is_empty() {
            self.scan_timer -= 1.0 / world.fps();
            if self.scan_timer > 0.0 {
                return;
            }
            self.scan_timer += self.config.scheduler.scan_delay_seconds.max(0.0);
            self.admission_queue = world.all_vehicles();
        } else {
            let batch = self.config.scheduler.batch_size();
            for _ in 0..batch {
                let Some(id) = self.admission_queue.pop() else {
                    break;
                };
                if world.exists(id) && !self.registry.is_tracking(id) {
                    self.registry
                        .ensure(world, id, self.config.thermal.operating_temperature);
                    events.push(SimEvent::VehicleRegistered { id, frame: self.frame });
                }
            }
        }
    }

    /// Advance the vehicle at the round-robin cursor, if any.
    fn process_next_vehicle(&mut self, world: &mut dyn Host, events: &mut Vec<SimEvent>) {
        let Some(id) = self.registry.nth(self.cursor) else {
            // End of a full pass; wrap for next frame.
            self.cursor = 0;
            return;
        };

        // Vanished entities are evicted before any other processing of
        // the slot. Removal shifts the next entity into this cursor
        // position, so the cursor stays put.
        if !world.exists(id) {
            for subsystem in self.subsystems.iter_mut() {
                subsystem.on_evicted(id);
            }
            self.registry.evict(id);
            events.push(SimEvent::VehicleEvicted { id, frame: self.frame });
            return;
        }

        // The operator's vehicle was already advanced this frame.
        if world.player_last_vehicle() == Some(id) {
            self.cursor += 1;
            return;
        }

        // Wrapped around within one frame: the population is smaller
        // than the batch. Leave the cursor so the pass resumes here.
        if self.handled.contains(&id) {
            return;
        }
        self.handled.insert(id);
        self.cursor += 1;

        let frames = (self.registry.len() / self.config.scheduler.batch_size()).max(1) as u32;
        self.process_vehicle(world, id, frames, events);
    }

    fn process_vehicle(
        &mut self,
        world: &mut dyn Host,
        id: EntityId,
        frames: u32,
        events: &mut Vec<SimEvent>,
    ) {
        let Some(record) = self.registry.get_mut(id) else {
            return;
        };

        // 1. One-tick overrides expire before anything else runs.
        if record.temporarily_fireproof() {
            record.set_temporary_fireproofing(world, id, false);
        }

        // 2. Odometer accumulation from displacement or wheel speed.
        let scale = self.config.odometer.distance_scale.max(0.0);
        let mut distance = 0.0;
        if self.config.odometer.accurate {
            let travelled = (world.position(id) - record.last_position).length();
            // >100 m since the last visit is a teleport, not driving.
            if travelled < 100.0 && world.is_on_all_wheels(id) {
                distance = travelled * scale / 1000.0;
            }
        } else {
            distance = world.wheel_speed(id) * scale / world.fps() / frames as f32 / 1000.0;
        }
        record.odometer += distance;
        record.trip_odometer += distance;

        // 3. Publish the tick. A failing subsystem degrades to a no-op
        // for this entity on this frame; it must not abort the batch.
        let mut ctx = TickContext {
            id,
            record,
            world,
            frames,
            inputs: &self.inputs,
            events,
        };
        for subsystem in self.subsystems.iter_mut() {
            if let Err(e) = subsystem.on_tick(&mut ctx) {
                log::warn!("{} tick failed for {id:#x}: {e}", subsystem.name());
            }
        }

        // 4. Snapshot for next-tick delta comparison.
        ctx.record.last_engine_health = ctx.world.engine_health(id);
        ctx.record.last_body_health = ctx.world.body_health(id);
        ctx.record.last_tank_health = ctx.world.tank_health(id);
        ctx.record.last_position = ctx.world.position(id);
    }
}
