//! Simulation configuration.
//!
//! A flat set of named numeric/boolean/list parameters, loaded once at
//! startup and handed to each subsystem at construction. Operators
//! hand-edit these files, so parameters are never renamed or removed
//! without a migration note in DESIGN.md.
//!
//! Out-of-range values are clamped at the point of use, never fatal.

use crate::types::ModelId;
use crate::world::VehicleClass;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Simulate the whole population (true) or only the operator's
    /// vehicle (false)?
    pub track_all_vehicles: bool,
    /// Seconds between full world scans for new vehicles. The delay only
    /// starts counting once the admission queue has drained.
    pub scan_delay_seconds: f32,
    /// Vehicles advanced (and admitted) per frame. Higher makes the full
    /// pass faster at the cost of a couple of frames per second.
    pub vehicles_per_frame: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            track_all_vehicles: true,
            scan_delay_seconds: 4.7,
            vehicles_per_frame: 8,
        }
    }
}

impl SchedulerConfig {
    /// Batch size clamped to the valid range.
    pub fn batch_size(&self) -> usize {
        self.vehicles_per_frame.max(1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OdometerConfig {
    /// Base odometers on wheel speed (false) or actual displacement
    /// (true)? Wheel speed is thrown off by powersliding.
    pub accurate: bool,
    /// Kilometres added to the odometer per in-game kilometre, reflecting
    /// the compressed map scale.
    pub distance_scale: f32,
}

impl Default for OdometerConfig {
    fn default() -> Self {
        Self {
            accurate: false,
            distance_scale: 20.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BonusDamageConfig {
    pub enabled: bool,
    /// Minimum single-tick external damage before amplification applies.
    pub threshold: f32,
    pub multiplier: f32,
    pub exponent: f32,
    pub random_min: f32,
    pub random_max: f32,
}

impl Default for BonusDamageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 5.0,
            multiplier: 1.0,
            exponent: 1.25,
            random_min: 0.5,
            random_max: 1.5,
        }
    }
}

/// Thermal model parameters. Temperatures are degrees above the standard
/// reference point; flow rates are per minute unless noted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThermalConfig {
    pub operating_temperature: f32,
    /// Fraction of operating temperature below which a cooled engine no
    /// longer counts as warmed up.
    pub reheat_fraction: f32,
    /// Degrees above operating temperature at which the fan engages.
    pub fan_activation_offset: f32,
    /// Degrees below operating temperature at which the fan cuts off.
    pub fan_deactivation_offset: f32,
    pub overheat_threshold: f32,
    /// Damage interpolated across the overheat→boil-over band.
    pub overheat_damage: f32,
    pub burn_oil_threshold: f32,
    /// Damage interpolated across the boil-over→failure band.
    pub burn_oil_damage: f32,
    pub failure_threshold: f32,
    /// Destroy the engine the moment it crosses the failure threshold
    /// (true), or keep charging `failure_damage_per_second` while it runs
    /// (false)?
    pub failure_instantaneous: bool,
    pub failure_damage_per_second: f32,
    /// Heat gained at 100% throttle.
    pub gain_at_redline: f32,
    /// Heat gained at idle.
    pub gain_at_idle: f32,
    /// Heater recirculation while below operating temperature.
    pub low_temperature_heating: f32,
    /// Heat dissipated per m/s of forward velocity.
    pub air_cooling_per_mps: f32,
    pub fan_cooling: f32,
    /// Passive loss while the engine is off.
    pub engine_off_cooling: f32,
    /// Degrees per second under a fire-extinguisher blast.
    pub extinguisher_cooling_rate: f32,
    /// Degrees per second at full immersion; partial immersion is
    /// linearly proportional.
    pub immersion_cooling_rate: f32,
    /// Repair negative-health engines and tanks while on fire so burning
    /// vehicles do not explode.
    pub anti_explosion: bool,
    pub bonus_damage: BonusDamageConfig,
    /// Per-model multipliers to active cooling (racing and emergency
    /// models dissipate better).
    pub cooling_multipliers: HashMap<ModelId, f32>,
    /// Reinforced/armoured models exempt from bonus damage.
    pub bonus_damage_immune: Vec<ModelId>,
}

impl Default for ThermalConfig {
    fn default() -> Self {
        Self {
            operating_temperature: 64.0,
            reheat_fraction: 0.8,
            fan_activation_offset: 0.5,
            fan_deactivation_offset: 0.1,
            overheat_threshold: 75.0,
            overheat_damage: 650.0,
            burn_oil_threshold: 85.0,
            burn_oil_damage: 150.0,
            failure_threshold: 95.0,
            failure_instantaneous: false,
            failure_damage_per_second: 2.0,
            gain_at_redline: 25.0,
            gain_at_idle: 1.0,
            low_temperature_heating: 12.8,
            air_cooling_per_mps: 0.35,
            fan_cooling: 5.0,
            engine_off_cooling: 6.15,
            extinguisher_cooling_rate: 3.0,
            immersion_cooling_rate: 5.0,
            anti_explosion: true,
            bonus_damage: BonusDamageConfig::default(),
            cooling_multipliers: HashMap::new(),
            bonus_damage_immune: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CruiseConfig {
    pub enabled: bool,
    /// Below this speed (m/s) cruise cannot activate and will deactivate.
    pub minimum_speed: f32,
    pub bicycle_minimum_speed: f32,
    pub allow_bicycles: bool,
    /// Whether automatic braking is available at all (per-vehicle
    /// capability still required).
    pub braking_enabled: bool,
    /// Speed above the setpoint (m/s) where automatic braking engages.
    pub braking_threshold: f32,
    /// Output the controller resets to when deactivated.
    pub default_output: f32,
    pub speed_error_weight: f32,
    pub distance_error_weight: f32,
    pub accel_error_weight: f32,
    /// Hold full throttle while airborne instead of running the control
    /// loop. Unrealistic, kept for entertainment.
    pub overrev_in_air: bool,
    /// Models with cruise automatic braking fitted.
    pub braking_models: Vec<ModelId>,
}

impl Default for CruiseConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            minimum_speed: 5.0,
            bicycle_minimum_speed: 1.0,
            allow_bicycles: false,
            braking_enabled: true,
            braking_threshold: 1.5,
            default_output: 0.40,
            speed_error_weight: 1.0,
            distance_error_weight: 50.0,
            accel_error_weight: 2.0,
            overrev_in_air: true,
            braking_models: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransmissionConfig {
    pub enabled: bool,
    /// Manual gearboxes present as sequential shifters (gamepad-friendly)
    /// rather than H-pattern.
    pub manual_use_sequential: bool,
    pub motorcycles_sequential: bool,
    /// Percentage (0–100) of each class spawning with a manual gearbox.
    pub class_manual_frequencies: HashMap<VehicleClass, f32>,
    /// Fallback percentage for classes not listed above.
    pub generic_manual_frequency: f32,
}

impl Default for TransmissionConfig {
    fn default() -> Self {
        let class_manual_frequencies = [
            (VehicleClass::Commercial, 0.0),
            (VehicleClass::Compacts, 15.0),
            (VehicleClass::Coupes, 12.0),
            (VehicleClass::Emergency, 0.0),
            (VehicleClass::Industrial, 65.0),
            (VehicleClass::Military, 0.0),
            (VehicleClass::Muscle, 50.0),
            (VehicleClass::OffRoad, 75.0),
            (VehicleClass::Sedans, 7.0),
            (VehicleClass::Sports, 25.0),
            (VehicleClass::SportsClassics, 80.0),
            (VehicleClass::Super, 50.0),
            (VehicleClass::Suvs, 5.0),
            (VehicleClass::Utility, 5.0),
            (VehicleClass::Vans, 8.0),
        ]
        .into();
        Self {
            enabled: true,
            manual_use_sequential: true,
            motorcycles_sequential: false,
            class_manual_frequencies,
            generic_manual_frequency: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParkingBrakeConfig {
    pub enabled: bool,
    /// Probability a naturally spawned, unoccupied, stopped vehicle has
    /// its parking brake locked.
    pub spawn_lock_probability: f64,
    /// Maximum speed (m/s) at which the operator can lock the brake.
    pub speed_limit: f32,
}

impl Default for ParkingBrakeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            spawn_lock_probability: 0.4,
            speed_limit: 1.5,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimConfig {
    pub scheduler: SchedulerConfig,
    pub odometer: OdometerConfig,
    pub thermal: ThermalConfig,
    pub cruise: CruiseConfig,
    pub transmission: TransmissionConfig,
    pub parking_brake: ParkingBrakeConfig,
}

impl SimConfig {
    /// Load from the data/ directory. Each section lives in its own file
    /// and falls back to defaults when the file is absent, so operators
    /// only keep the sections they have actually tuned.
    /// In tests, use SimConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        Ok(Self {
            scheduler: load_section(&format!("{data_dir}/scheduler.json"))?,
            odometer: load_section(&format!("{data_dir}/odometer.json"))?,
            thermal: load_section(&format!("{data_dir}/thermal.json"))?,
            cruise: load_section(&format!("{data_dir}/cruise.json"))?,
            transmission: load_section(&format!("{data_dir}/transmission.json"))?,
            parking_brake: load_section(&format!("{data_dir}/parking_brake.json"))?,
        })
    }

    /// Config with hardcoded values for unit and integration tests:
    /// smaller batches, parking brake opted in, a couple of synthetic
    /// model entries so the override tables are exercised.
    pub fn default_test() -> Self {
        let mut thermal = ThermalConfig::default();
        thermal
            .cooling_multipliers
            .insert(test_models::INTERCEPTOR, 1.2);
        thermal.bonus_damage_immune.push(test_models::ARMOURED_TRUCK);

        let mut cruise = CruiseConfig::default();
        cruise.braking_models.push(test_models::CITY_EV);

        Self {
            scheduler: SchedulerConfig {
                track_all_vehicles: true,
                scan_delay_seconds: 1.0,
                vehicles_per_frame: 4,
            },
            odometer: OdometerConfig::default(),
            thermal,
            cruise,
            transmission: TransmissionConfig::default(),
            parking_brake: ParkingBrakeConfig {
                enabled: true,
                spawn_lock_probability: 0.4,
                speed_limit: 1.5,
            },
        }
    }
}

/// Synthetic model hashes shared by the test config, the integration
/// tests, and the scripted runner fleet.
pub mod test_models {
    use crate::types::ModelId;

    pub const SEDAN: ModelId = 0x0001_11a1;
    pub const INTERCEPTOR: ModelId = 0x0002_22b2;
    pub const ARMOURED_TRUCK: ModelId = 0x0003_33c3;
    pub const CITY_EV: ModelId = 0x0004_44d4;
    pub const SPORTBIKE: ModelId = 0x0005_55e5;
}

fn load_section<T: DeserializeOwned + Default>(path: &str) -> anyhow::Result<T> {
    match std::fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}")),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(anyhow::anyhow!("Cannot read {path}: {e}")),
    }
}
