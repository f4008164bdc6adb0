//! The entity registry: stable identifier → vehicle record.
//!
//! RULES:
//!   - Exactly one record per live identifier; created lazily on first
//!     sight, never duplicated.
//!   - The registry owns every record. Subsystems borrow one record for
//!     the duration of a tick and must not retain it.
//!   - Eviction removes the record; a later lookup for a reused handle
//!     builds a fresh record rather than resurrecting stale state.

use crate::record::VehicleRecord;
use crate::rng::SubsystemRng;
use crate::types::EntityId;
use crate::world::Host;
use std::collections::HashMap;

pub struct Registry {
    records: HashMap<EntityId, VehicleRecord>,
    /// Insertion order, giving the scheduler's round-robin cursor a
    /// stable indexable sequence.
    order: Vec<EntityId>,
    rng: SubsystemRng,
}

impl Registry {
    pub fn new(rng: SubsystemRng) -> Self {
        Self {
            records: HashMap::new(),
            order: Vec::new(),
            rng,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_tracking(&self, id: EntityId) -> bool {
        self.records.contains_key(&id)
    }

    /// Identifier at round-robin position `index`, if any.
    pub fn nth(&self, index: usize) -> Option<EntityId> {
        self.order.get(index).copied()
    }

    pub fn get(&self, id: EntityId) -> Option<&VehicleRecord> {
        self.records.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut VehicleRecord> {
        self.records.get_mut(&id)
    }

    /// Ensure a record exists for `id`, creating one from current world
    /// state if needed. Returns true when a record was created.
    pub fn ensure(
        &mut self,
        world: &mut dyn Host,
        id: EntityId,
        operating_temperature: f32,
    ) -> bool {
        if self.records.contains_key(&id) {
            return false;
        }
        log::debug!(
            "tracking new vehicle {id:#x}, currently {} in registry",
            self.records.len()
        );
        let record = VehicleRecord::new(world, id, operating_temperature, &mut self.rng);
        self.records.insert(id, record);
        self.order.push(id);
        true
    }

    /// Drop the record for a vanished entity.
    pub fn evict(&mut self, id: EntityId) -> Option<VehicleRecord> {
        let record = self.records.remove(&id)?;
        self.order.retain(|&other| other != id);
        Some(record)
    }

    /// Forget everything (the host is loading a new session).
    pub fn clear(&mut self) {
        self.records.clear();
        self.order.clear();
    }
}
