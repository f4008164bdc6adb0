//! Shared primitive types used across the entire simulation.

/// Opaque, host-assigned handle of a live entity. Unique for the entity's
/// lifetime; not stable across respawn or recreation.
pub type EntityId = i32;

/// Host model identifier (hash of the model name).
pub type ModelId = u32;

/// A frame counter. One frame = one call into the scheduler from the host.
pub type Frame = u64;
