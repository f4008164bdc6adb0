//! Subsystem trait and tick context.
//!
//! RULE: Every consumer of the per-vehicle tick implements
//! VehicleSubsystem. The engine calls on_tick() on each registered
//! subsystem in registration order, once per vehicle visit; the
//! subscription list is fixed at build time and never changes from inside
//! a callback. Execution order is documented in engine.rs.

use crate::command::HostInput;
use crate::error::SimResult;
use crate::event::SimEvent;
use crate::record::VehicleRecord;
use crate::types::EntityId;
use crate::world::Host;
use std::any::Any;

/// Everything a subsystem may touch during one vehicle's tick.
///
/// The record reference is exclusive and must not be retained past the
/// call — the registry may delete the record on a future eviction.
pub struct TickContext<'a> {
    pub id: EntityId,
    pub record: &'a mut VehicleRecord,
    pub world: &'a mut dyn Host,
    /// Estimated frames elapsed since this entity was last advanced.
    /// An amortized estimate (population / batch size), not a measured
    /// delta; always at least 1.
    pub frames: u32,
    /// Discrete operator inputs delivered since the previous frame.
    pub inputs: &'a [HostInput],
    /// Sink for notable state transitions this frame.
    pub events: &'a mut Vec<SimEvent>,
}

/// The contract every tick consumer must fulfill.
pub trait VehicleSubsystem {
    /// Unique stable name for this subsystem.
    fn name(&self) -> &'static str;

    /// Called once per vehicle visit by the engine. No error returned
    /// here may abort the frame; the engine logs and moves on.
    fn on_tick(&mut self, ctx: &mut TickContext<'_>) -> SimResult<()>;

    /// Called when an entity ceased to exist and its record was dropped.
    /// The identifier is all that remains; the entity must not be
    /// touched.
    fn on_evicted(&mut self, _id: EntityId) {}

    /// For downcasting in tests and tooling only.
    fn as_any(&self) -> &dyn Any;
}
