//! Thermal/damage model tests — heat flow, interpolated damage,
//! terminal failure, repair.

use roadsim_core::config::{test_models, SimConfig};
use roadsim_core::event::SimEvent;
use roadsim_core::world::scripted::{ScriptedVehicle, ScriptedWorld};
use roadsim_core::SimEngine;

/// 1 fps makes one frame one simulated second, which keeps the per-minute
/// rate arithmetic exact in assertions.
const FPS: f32 = 1.0;

const CAR: i32 = 100;

fn run_frames(engine: &mut SimEngine, world: &mut ScriptedWorld, n: u64) -> Vec<SimEvent> {
    let mut events = Vec::new();
    for _ in 0..n {
        events.extend(engine.advance_frame(world).expect("advance_frame"));
    }
    events
}

/// Engine + world with one cold, parked NPC car tracked and ready.
fn cold_car_fixture(config: SimConfig, seed: u64, fps: f32) -> (SimEngine, ScriptedWorld) {
    let mut engine = SimEngine::build(config, seed);
    let mut world = ScriptedWorld::new(fps);
    let mut car = ScriptedVehicle::parked();
    car.model = test_models::SEDAN;
    world.spawn(CAR, car);
    for _ in 0..20 {
        run_frames(&mut engine, &mut world, 1);
        if engine.is_tracking(CAR) {
            break;
        }
    }
    assert!(engine.is_tracking(CAR));
    (engine, world)
}

/// A record created while the engine is running starts at operating
/// temperature; created with the engine off, at local ambient.
#[test]
fn record_seeds_warm_or_cold_from_engine_state() {
    let config = SimConfig::default_test();
    let mut engine = SimEngine::build(config, 10);
    let mut world = ScriptedWorld::new(10.0);
    world.spawn(1, ScriptedVehicle::driving(10.0));
    let mut cold = ScriptedVehicle::parked();
    cold.environment.ambient_offset = -7.5;
    world.spawn(2, cold);
    for _ in 0..20 {
        run_frames(&mut engine, &mut world, 1);
        if engine.tracked_count() == 2 {
            break;
        }
    }

    // A couple of running frames may already have elapsed since
    // admission, so allow a little heating on top of the seed value.
    let warm = engine.record(1).unwrap();
    assert!((warm.engine_temperature - 64.0).abs() < 0.5);
    assert!(warm.operating_temperature_reached);

    let cold = engine.record(2).unwrap();
    assert!((cold.engine_temperature - (-7.5)).abs() < 1e-3);
    assert!(!cold.operating_temperature_reached);
}

/// Redline for one simulated minute while cold gains exactly
/// gain_at_redline (heater and airflow zeroed out for the measurement).
#[test]
fn redline_minute_gains_redline_rate() {
    let mut config = SimConfig::default_test();
    config.thermal.low_temperature_heating = 0.0;
    let (mut engine, mut world) = cold_car_fixture(config, 11, FPS);

    // rpm 1.0 maps to full load through the normalized-RPM curve.
    {
        let car = world.vehicle_mut(CAR);
        car.engine_running = true;
        car.rpm = 1.0;
        car.forward_velocity = 0.0;
    }
    let start = engine.record(CAR).unwrap().engine_temperature;
    run_frames(&mut engine, &mut world, 60);
    let gained = engine.record(CAR).unwrap().engine_temperature - start;

    assert!(
        (gained - 25.0).abs() < 0.05,
        "one redline minute gained {gained} K, expected 25"
    );
}

/// Under constant load with no cooling, temperature never decreases
/// until the failure threshold (fan kept out of play by raising its
/// activation point).
#[test]
fn temperature_monotonic_under_constant_load() {
    let mut config = SimConfig::default_test();
    config.thermal.fan_activation_offset = 1000.0;
    let (mut engine, mut world) = cold_car_fixture(config, 12, FPS);

    {
        let car = world.vehicle_mut(CAR);
        car.engine_running = true;
        car.rpm = 1.0;
    }

    let mut last = engine.record(CAR).unwrap().engine_temperature;
    for _ in 0..200 {
        run_frames(&mut engine, &mut world, 1);
        let record = engine.record(CAR).unwrap();
        if record.engine_temperature >= 95.0 || record.is_dead() {
            break;
        }
        assert!(
            record.engine_temperature >= last,
            "temperature decreased under constant load with no cooling"
        );
        last = record.engine_temperature;
    }
}

/// Fan hysteresis: engages above operating + activation offset, cuts off
/// below operating - deactivation offset.
#[test]
fn fan_engages_and_disengages_with_hysteresis() {
    let config = SimConfig::default_test();
    let (mut engine, mut world) = cold_car_fixture(config, 13, FPS);
    {
        let car = world.vehicle_mut(CAR);
        car.engine_running = true;
        car.rpm = 0.2; // idle
    }

    engine.record_mut(CAR).unwrap().engine_temperature = 66.0;
    let events = run_frames(&mut engine, &mut world, 1);
    assert!(
        events
            .iter()
            .any(|e| matches!(e, SimEvent::FanStateChanged { running: true, .. })),
        "fan did not engage above the activation threshold"
    );
    assert!(engine.record(CAR).unwrap().fan_running);

    engine.record_mut(CAR).unwrap().engine_temperature = 63.5;
    let events = run_frames(&mut engine, &mut world, 1);
    assert!(
        events
            .iter()
            .any(|e| matches!(e, SimEvent::FanStateChanged { running: false, .. })),
        "fan did not cut off below the deactivation threshold"
    );
    assert!(!engine.record(CAR).unwrap().fan_running);
}

/// Overheat damage is interpolated and reversible: ride the band up,
/// cool back below the overheat threshold, and nearly all charged health
/// comes back.
#[test]
fn overheat_damage_reverses_as_engine_cools() {
    let config = SimConfig::default_test();
    let fps = 10.0;
    let (mut engine, mut world) = cold_car_fixture(config, 14, fps);
    {
        let car = world.vehicle_mut(CAR);
        car.engine_running = true;
        car.rpm = 0.2;
        car.forward_velocity = 20.0; // airflow dominates, engine cools
    }
    engine.record_mut(CAR).unwrap().engine_temperature = 84.0;

    // First visit charges the full interpolated value for 84 degrees.
    run_frames(&mut engine, &mut world, 1);
    let record = engine.record(CAR).unwrap();
    assert!(
        record.overheat_damage() > 500.0,
        "expected a large interpolated charge at 84 degrees, got {}",
        record.overheat_damage()
    );
    assert!(world.vehicle(CAR).engine_health < 500.0);
    assert!(record.boiling_over);

    // Cool back through the band.
    for _ in 0..1200 {
        run_frames(&mut engine, &mut world, 1);
        if engine.record(CAR).unwrap().engine_temperature < 74.0 {
            break;
        }
    }
    let record = engine.record(CAR).unwrap();
    assert!(
        record.engine_temperature < 75.0,
        "engine never cooled below the overheat threshold"
    );
    assert!(
        record.overheat_damage() < 2.0,
        "residual overheat damage {} after cooling",
        record.overheat_damage()
    );
    assert!(
        world.vehicle(CAR).engine_health > 995.0,
        "health {} not restored after cooling",
        world.vehicle(CAR).engine_health
    );
    assert!(!engine.record(CAR).unwrap().boiling_over);
    assert!(!engine.record(CAR).unwrap().is_dead());
}

/// Crossing the failure threshold with instantaneous failure configured
/// bricks the engine: health pinned at zero, engine stopped, undriveable,
/// fireproof for exactly one subsequent tick.
#[test]
fn failure_threshold_destroys_engine_terminally() {
    let mut config = SimConfig::default_test();
    config.thermal.failure_instantaneous = true;
    let (mut engine, mut world) = cold_car_fixture(config, 15, FPS);
    {
        let car = world.vehicle_mut(CAR);
        car.engine_running = true;
        car.rpm = 0.5;
    }
    engine.record_mut(CAR).unwrap().engine_temperature = 96.0;

    let events = run_frames(&mut engine, &mut world, 1);
    assert!(
        events
            .iter()
            .any(|e| matches!(e, SimEvent::EngineDestroyed { id: CAR, .. })),
        "no destruction event at the failure threshold"
    );
    let record = engine.record(CAR).unwrap();
    assert!(record.is_dead());
    assert_eq!(world.vehicle(CAR).engine_health, 0.0);
    assert!(!world.vehicle(CAR).engine_running);
    assert!(!world.vehicle(CAR).driveable);
    assert!(world.vehicle(CAR).fireproof, "not fireproofed on destruction");

    // The fireproof override lasts exactly one further tick.
    run_frames(&mut engine, &mut world, 1);
    assert!(!world.vehicle(CAR).fireproof, "fireproofing outlived its one tick");

    // Terminal: no later tick may change the dead state or the health.
    run_frames(&mut engine, &mut world, 30);
    assert!(engine.record(CAR).unwrap().is_dead());
    assert_eq!(world.vehicle(CAR).engine_health, 0.0);
}

/// Without instantaneous failure, staying above the threshold charges
/// damage per second while the engine runs.
#[test]
fn failure_band_charges_damage_per_second() {
    let config = SimConfig::default_test(); // failure_damage_per_second = 2.0
    let (mut engine, mut world) = cold_car_fixture(config, 16, FPS);
    {
        let car = world.vehicle_mut(CAR);
        car.engine_running = true;
        car.rpm = 0.9;
    }
    engine.record_mut(CAR).unwrap().engine_temperature = 120.0;

    run_frames(&mut engine, &mut world, 10);
    let health = world.vehicle(CAR).engine_health;
    assert!(
        (980.0 - health).abs() < 1.0,
        "expected ~20 damage over 10 seconds above failure threshold, health {health}"
    );
    assert!(!engine.record(CAR).unwrap().is_dead());
}

/// An external repair (any health pool rising between ticks) clears the
/// terminal state, zeroes accrued overheat damage, and clamps the stored
/// temperature to the operating threshold.
#[test]
fn external_repair_clears_terminal_state() {
    let mut config = SimConfig::default_test();
    config.thermal.failure_instantaneous = true;
    let (mut engine, mut world) = cold_car_fixture(config, 17, FPS);
    {
        let car = world.vehicle_mut(CAR);
        car.engine_running = true;
        car.rpm = 0.5;
    }
    engine.record_mut(CAR).unwrap().engine_temperature = 96.0;
    run_frames(&mut engine, &mut world, 2);
    assert!(engine.record(CAR).unwrap().is_dead());

    // Mechanic visit.
    world.vehicle_mut(CAR).engine_health = 1000.0;
    let events = run_frames(&mut engine, &mut world, 1);
    assert!(
        events
            .iter()
            .any(|e| matches!(e, SimEvent::EngineRepaired { id: CAR })),
        "no repair event after health was restored"
    );
    let record = engine.record(CAR).unwrap();
    assert!(!record.is_dead());
    assert_eq!(record.overheat_damage(), 0.0);
    assert!(record.engine_temperature <= 64.0);
    assert!(world.vehicle(CAR).driveable);
}

/// Large single impacts are amplified; reinforced models are exempt.
#[test]
fn bonus_damage_amplifies_hard_impacts() {
    let config = SimConfig::default_test();
    let (mut engine, mut world) = cold_car_fixture(config, 18, FPS);

    // 100 points of collision damage since the last visit.
    world.vehicle_mut(CAR).engine_health = 900.0;
    let events = run_frames(&mut engine, &mut world, 1);
    assert!(
        events
            .iter()
            .any(|e| matches!(e, SimEvent::BonusDamageApplied { id: CAR, .. })),
        "no bonus damage for a 100-point impact"
    );
    // bonus = (100^1.25 - 100) * r with r in [0.5, 1.5): 108..325.
    let health = world.vehicle(CAR).engine_health;
    assert!(
        health < 900.0 - 100.0 && health > 900.0 - 330.0,
        "bonus damage out of expected range, health {health}"
    );

    // Armoured model takes the base damage and nothing more.
    let mut truck = ScriptedVehicle::parked();
    truck.model = test_models::ARMOURED_TRUCK;
    world.spawn(200, truck);
    for _ in 0..20 {
        run_frames(&mut engine, &mut world, 1);
        if engine.is_tracking(200) {
            break;
        }
    }
    world.vehicle_mut(200).engine_health = 900.0;
    let events = run_frames(&mut engine, &mut world, 1);
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, SimEvent::BonusDamageApplied { id: 200, .. })),
        "reinforced model received bonus damage"
    );
    assert_eq!(world.vehicle(200).engine_health, 900.0);
}

/// Immersion cooling is proportional to the submerged fraction and
/// cannot drag the engine below ambient minus the fixed offset.
#[test]
fn immersion_cooling_clamps_at_ambient_floor() {
    let config = SimConfig::default_test();
    let (mut engine, mut world) = cold_car_fixture(config, 19, FPS);
    {
        let car = world.vehicle_mut(CAR);
        car.engine_running = true;
        car.rpm = 0.2;
        car.submerged = 1.0;
    }
    engine.record_mut(CAR).unwrap().engine_temperature = 30.0;

    run_frames(&mut engine, &mut world, 60);
    let temperature = engine.record(CAR).unwrap().engine_temperature;
    assert!(
        temperature >= -4.0 - 1e-3,
        "immersion pulled temperature below the ambient floor: {temperature}"
    );
    assert!(
        temperature < 5.0,
        "full immersion failed to cool the engine: {temperature}"
    );
}

/// Burning vehicles get their engine and tank health floored so they do
/// not explode.
#[test]
fn anti_explosion_floors_health_pools() {
    let config = SimConfig::default_test();
    let (mut engine, mut world) = cold_car_fixture(config, 20, FPS);
    {
        let car = world.vehicle_mut(CAR);
        car.on_fire = true;
        car.engine_health = -800.0;
        car.tank_health = -250.0;
    }
    run_frames(&mut engine, &mut world, 1);
    assert_eq!(world.vehicle(CAR).engine_health, -500.0);
    assert_eq!(world.vehicle(CAR).tank_health, -100.0);
}

/// Aircraft and trains are outside the thermal simulation entirely.
#[test]
fn unsupported_kinds_are_ignored() {
    use roadsim_core::world::ModelKind;
    let config = SimConfig::default_test();
    let mut engine = SimEngine::build(config, 21);
    let mut world = ScriptedWorld::new(FPS);
    let mut heli = ScriptedVehicle::driving(50.0);
    heli.kind = ModelKind::Helicopter;
    heli.rpm = 1.0;
    world.spawn(300, heli);
    for _ in 0..20 {
        run_frames(&mut engine, &mut world, 1);
        if engine.is_tracking(300) {
            break;
        }
    }
    let start = engine.record(300).unwrap().engine_temperature;
    run_frames(&mut engine, &mut world, 60);
    assert_eq!(
        engine.record(300).unwrap().engine_temperature,
        start,
        "thermal model touched an aircraft"
    );
}
