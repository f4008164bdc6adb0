//! Cruise controller tests — activation edges, the correction loop,
//! cancellation and resume, automatic braking.

use roadsim_core::config::{test_models, SimConfig};
use roadsim_core::event::SimEvent;
use roadsim_core::world::scripted::{ScriptedVehicle, ScriptedWorld};
use roadsim_core::{HostInput, SimEngine};

const FPS: f32 = 60.0;
const CAR: i32 = 1;

fn run_frame(engine: &mut SimEngine, world: &mut ScriptedWorld) -> Vec<SimEvent> {
    engine.advance_frame(world).expect("advance_frame")
}

/// Move the operator's car exactly one frame's worth of travel at its
/// current speed, so actual displacement matches expectation.
fn roll_forward(world: &mut ScriptedWorld) {
    let car = world.vehicle_mut(CAR);
    car.position.x += car.speed / FPS;
    car.wheel_speed = car.speed;
    car.forward_velocity = car.speed;
}

/// Operator driving at `speed`, tracked from frame one.
fn driving_fixture(config: SimConfig, seed: u64, speed: f32) -> (SimEngine, ScriptedWorld) {
    let mut engine = SimEngine::build(config, seed);
    let mut world = ScriptedWorld::new(FPS);
    world.spawn(CAR, ScriptedVehicle::driving(speed));
    world.seat_player(CAR);
    run_frame(&mut engine, &mut world);
    assert!(engine.is_tracking(CAR));
    (engine, world)
}

fn activate(engine: &mut SimEngine, world: &mut ScriptedWorld) {
    engine.queue_input(HostInput::CruiseToggle);
    roll_forward(world);
    let events = run_frame(engine, world);
    assert!(
        events
            .iter()
            .any(|e| matches!(e, SimEvent::CruiseActivated { .. })),
        "cruise did not activate"
    );
}

/// Activation requires the minimum speed; the current speed becomes the
/// setpoint.
#[test]
fn activation_requires_minimum_speed() {
    let (mut engine, mut world) = driving_fixture(SimConfig::default_test(), 30, 3.0);

    engine.queue_input(HostInput::CruiseToggle);
    roll_forward(&mut world);
    let events = run_frame(&mut engine, &mut world);
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, SimEvent::CruiseActivated { .. })),
        "cruise armed below the minimum speed"
    );
    let session = engine.cruise_session().expect("cruise subsystem");
    assert!(!session.on);

    world.vehicle_mut(CAR).speed = 20.0;
    activate(&mut engine, &mut world);
    let session = engine.cruise_session().unwrap();
    assert!(session.on && !session.cancelled);
    assert!((session.set_speed - 20.0).abs() < 1e-3);
}

/// Setpoint 20, measured 19 with displacement exactly as expected.
/// Speed error dominates and output lands in (0, 1].
#[test]
fn speed_sag_produces_positive_bounded_output() {
    let (mut engine, mut world) = driving_fixture(SimConfig::default_test(), 31, 20.0);
    activate(&mut engine, &mut world);

    world.vehicle_mut(CAR).speed = 19.0;
    roll_forward(&mut world); // actual distance == expected distance
    run_frame(&mut engine, &mut world);

    let output = world.applied_throttle;
    assert!(
        output > 0.0 && output <= 1.0,
        "expected positive clamped output for 1 m/s sag, got {output}"
    );
}

/// Holding exactly the setpoint with ideal displacement produces a
/// stable output: no oscillation between ticks.
#[test]
fn hold_at_setpoint_is_stable() {
    let (mut engine, mut world) = driving_fixture(SimConfig::default_test(), 32, 20.0);
    activate(&mut engine, &mut world);

    let mut last_output: Option<f32> = None;
    for _ in 0..30 {
        roll_forward(&mut world);
        run_frame(&mut engine, &mut world);
        let output = world.applied_throttle;
        assert!((0.0..=1.0).contains(&output));
        if let Some(last) = last_output {
            assert!(
                (output - last).abs() < 1e-3,
                "output oscillated at steady state: {last} -> {output}"
            );
        }
        last_output = Some(output);
    }
}

/// Automatic braking engages only for brake-capable vehicles, only when
/// throttle is already saturated at zero, and only past the overspeed
/// threshold.
#[test]
fn automatic_braking_engages_past_threshold() {
    let (mut engine, mut world) = driving_fixture(SimConfig::default_test(), 33, 20.0);
    world.vehicle_mut(CAR).model = test_models::CITY_EV; // brake-capable
    activate(&mut engine, &mut world);

    // Inside the threshold: no braking even though output clamps to 0.
    world.vehicle_mut(CAR).speed = 21.0;
    roll_forward(&mut world);
    run_frame(&mut engine, &mut world);
    assert_eq!(world.applied_brake, 0.0, "braked inside the threshold band");

    // Well past the threshold, downhill.
    world.applied_brake = 0.0;
    world.vehicle_mut(CAR).speed = 25.0;
    roll_forward(&mut world);
    run_frame(&mut engine, &mut world);
    roll_forward(&mut world);
    run_frame(&mut engine, &mut world);
    assert_eq!(world.applied_throttle, 0.0);
    assert!(
        world.applied_brake > 0.0 && world.applied_brake <= 1.0,
        "no braking at 5 m/s overspeed, applied {}",
        world.applied_brake
    );
}

/// Without the capability flag the same overspeed produces no braking.
#[test]
fn braking_requires_capable_vehicle() {
    let (mut engine, mut world) = driving_fixture(SimConfig::default_test(), 34, 20.0);
    activate(&mut engine, &mut world);

    world.vehicle_mut(CAR).speed = 25.0;
    for _ in 0..3 {
        roll_forward(&mut world);
        run_frame(&mut engine, &mut world);
    }
    assert_eq!(
        world.applied_brake, 0.0,
        "brake applied on a vehicle without automatic braking"
    );
}

/// Brake pedal cancels (setpoint retained, output zeroed); resume picks
/// the held setpoint back up.
#[test]
fn brake_cancels_and_resume_restores() {
    let (mut engine, mut world) = driving_fixture(SimConfig::default_test(), 35, 20.0);
    activate(&mut engine, &mut world);

    world.player.brake_held = true;
    roll_forward(&mut world);
    let events = run_frame(&mut engine, &mut world);
    assert!(
        events
            .iter()
            .any(|e| matches!(e, SimEvent::CruiseCancelled { .. })),
        "brake did not cancel"
    );
    let session = engine.cruise_session().unwrap();
    assert!(session.on && session.cancelled);
    assert!((session.set_speed - 20.0).abs() < 1e-3, "setpoint lost on cancel");
    assert_eq!(world.applied_throttle, 0.0);

    // Cancelled system leaves the pedals alone.
    world.player.brake_held = false;
    world.applied_throttle = 0.5;
    roll_forward(&mut world);
    run_frame(&mut engine, &mut world);
    assert_eq!(world.applied_throttle, 0.5, "cancelled cruise drove the throttle");

    engine.queue_input(HostInput::CruiseResume);
    roll_forward(&mut world);
    let events = run_frame(&mut engine, &mut world);
    assert!(
        events
            .iter()
            .any(|e| matches!(e, SimEvent::CruiseResumed { .. })),
        "resume did not restore the hold"
    );
    assert!(engine.cruise_session().unwrap().holding());
}

/// Collision deactivates immediately, but the setpoint survives for a
/// later resume.
#[test]
fn collision_deactivates_but_keeps_setpoint() {
    let (mut engine, mut world) = driving_fixture(SimConfig::default_test(), 36, 20.0);
    activate(&mut engine, &mut world);

    world.vehicle_mut(CAR).collided = true;
    roll_forward(&mut world);
    let events = run_frame(&mut engine, &mut world);
    assert!(
        events.iter().any(|e| matches!(
            e,
            SimEvent::CruiseDeactivated { .. }
        )),
        "collision did not deactivate"
    );
    let session = engine.cruise_session().unwrap();
    assert!(!session.on);
    assert!(
        (session.set_speed - 20.0).abs() < 1e-3,
        "setpoint discarded on collision"
    );

    world.vehicle_mut(CAR).collided = false;
    engine.queue_input(HostInput::CruiseResume);
    roll_forward(&mut world);
    run_frame(&mut engine, &mut world);
    let session = engine.cruise_session().unwrap();
    assert!(session.holding(), "resume after collision failed");
    assert!((session.set_speed - 20.0).abs() < 1e-3);
}

/// Falling below the minimum speed shuts the system off.
#[test]
fn below_minimum_speed_deactivates() {
    let (mut engine, mut world) = driving_fixture(SimConfig::default_test(), 37, 20.0);
    activate(&mut engine, &mut world);

    world.vehicle_mut(CAR).speed = 3.0;
    roll_forward(&mut world);
    let events = run_frame(&mut engine, &mut world);
    assert!(
        events
            .iter()
            .any(|e| matches!(e, SimEvent::CruiseDeactivated { .. })),
        "no deactivation below minimum speed"
    );
    assert!(!engine.cruise_session().unwrap().on);
}

/// Airborne with the over-rev option: full throttle, control loop
/// skipped.
#[test]
fn airborne_overrev_floors_the_throttle() {
    let (mut engine, mut world) = driving_fixture(SimConfig::default_test(), 38, 20.0);
    activate(&mut engine, &mut world);

    world.vehicle_mut(CAR).in_air = true;
    roll_forward(&mut world);
    run_frame(&mut engine, &mut world);
    assert_eq!(world.applied_throttle, 1.0, "no over-rev while airborne");
}

/// A manual gear change cancels the hold when the external transmission
/// add-on is present and not in automatic mode.
#[test]
fn manual_gear_change_cancels() {
    use roadsim_core::transmission_subsystem::{MT_GEAR, MT_GET_SHIFT_MODE};
    use roadsim_core::world::DecorStore;

    let (mut engine, mut world) = driving_fixture(SimConfig::default_test(), 39, 20.0);
    // The add-on is running: gear attribute is live and in sequential
    // mode.
    world.set_int(CAR, MT_GEAR, 3);
    world.set_int(CAR, MT_GET_SHIFT_MODE, 1);
    roll_forward(&mut world);
    run_frame(&mut engine, &mut world);

    activate(&mut engine, &mut world);

    world.set_int(CAR, MT_GEAR, 4);
    roll_forward(&mut world);
    let events = run_frame(&mut engine, &mut world);
    assert!(
        events
            .iter()
            .any(|e| matches!(e, SimEvent::CruiseCancelled { .. })),
        "gear change did not cancel the hold"
    );
    assert!(engine.cruise_session().unwrap().cancelled);
}

/// The session never survives a vehicle change.
#[test]
fn session_dies_with_a_vehicle_change() {
    let (mut engine, mut world) = driving_fixture(SimConfig::default_test(), 40, 20.0);
    activate(&mut engine, &mut world);

    // Operator jumps into another car.
    world.spawn(2, ScriptedVehicle::driving(15.0));
    world.seat_player(2);
    for _ in 0..3 {
        roll_forward(&mut world);
        run_frame(&mut engine, &mut world);
    }
    let session = engine.cruise_session().unwrap();
    assert!(!session.on, "session carried over to a different vehicle");
    assert_eq!(session.set_speed, 0.0, "stale setpoint survived the swap");
}
