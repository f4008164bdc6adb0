//! roadsim-core — a vehicle population simulation core.
//!
//! A host engine calls [`engine::SimEngine::advance_frame`] once per
//! rendered frame. The engine keeps one [`record::VehicleRecord`] per live
//! vehicle, advances a bounded batch of them each frame, and publishes
//! each advancement to the registered subsystems: transmission interop,
//! the thermal/damage model, the cruise controller, and the parking
//! brake.
//!
//! RULES:
//!   - Subsystems execute in registration order, every vehicle visit.
//!   - No subsystem calls another subsystem's functions directly.
//!   - All randomness flows through the RngBank.
//!   - Nothing in the core may block, sleep, or abort the host frame.

pub mod command;
pub mod config;
pub mod cruise_subsystem;
pub mod engine;
pub mod error;
pub mod event;
pub mod parking_brake_subsystem;
pub mod record;
pub mod registry;
pub mod rng;
pub mod subsystem;
pub mod thermal_subsystem;
pub mod transmission_subsystem;
pub mod types;
pub mod world;

pub use command::HostInput;
pub use config::SimConfig;
pub use engine::SimEngine;
pub use error::{SimError, SimResult};
pub use event::SimEvent;
pub use record::{EngineCondition, TransmissionType, VehicleRecord};
