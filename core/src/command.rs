//! Discrete operator inputs delivered by the host.
//!
//! The host owns key bindings and gamepad mapping; the core only consumes
//! the resulting edges. Inputs queue on the engine and are handed to
//! subsystems on the operator's next tick, which runs every frame.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostInput {
    /// Cruise set/coast key: activate at current speed, re-set the
    /// setpoint, resume if cancelled, or deactivate when already holding.
    CruiseToggle,
    /// Resume at current speed after a cancellation.
    CruiseResume,
    /// Cancel without clearing the setpoint.
    CruiseCancel,
    /// Toggle the parking brake (host-side bind of the handbrake control
    /// while stopped).
    ParkingBrakeToggle,
}
