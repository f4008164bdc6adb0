//! sim-host: headless frame-loop host for roadsim-core.
//!
//! Drives the simulation core against a scripted synthetic world — a
//! fleet of vehicles circling at fixed speeds with the operator in the
//! lead car — and prints an end-of-run summary.
//!
//! Usage:
//!   sim-host --seed 12345 --frames 3600 --vehicles 40 --data-dir ./data

use anyhow::Result;
use roadsim_core::config::{test_models, SimConfig};
use roadsim_core::event::event_type_name;
use roadsim_core::world::scripted::{ScriptedVehicle, ScriptedWorld};
use roadsim_core::world::{EnvironmentSample, ModelKind, VehicleClass};
use roadsim_core::{HostInput, SimEngine};
use std::collections::BTreeMap;
use std::env;

const FPS: f32 = 60.0;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let frames = parse_arg(&args, "--frames", 3600u64);
    let vehicles = parse_arg(&args, "--vehicles", 40usize);
    let data_dir = args
        .windows(2)
        .find(|w| w[0] == "--data-dir")
        .map(|w| w[1].as_str());

    println!("roadsim — sim-host");
    println!("  started:  {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
    println!("  seed:     {seed}");
    println!("  frames:   {frames}");
    println!("  vehicles: {vehicles}");
    println!();

    let config = match data_dir {
        Some(dir) => SimConfig::load(dir)?,
        None => SimConfig::default_test(),
    };
    let mut engine = SimEngine::build(config, seed);
    let mut world = build_fleet(vehicles);

    let mut tally: BTreeMap<&'static str, u64> = BTreeMap::new();
    for frame in 0..frames {
        script_traffic(&mut world, frame);

        // The operator sets a steady 22 m/s and engages cruise early on.
        if frame == 120 {
            engine.queue_input(HostInput::CruiseToggle);
        }

        let events = engine
            .advance_frame(&mut world)
            .map_err(|e| anyhow::anyhow!("frame {frame}: {e}"))?;
        for event in &events {
            *tally.entry(event_type_name(event)).or_default() += 1;
            log::debug!("frame {frame}: {}", serde_json::to_string(event)?);
        }
    }

    print_summary(&engine, &world, &tally);
    Ok(())
}

/// Lead car for the operator plus a ring of traffic.
fn build_fleet(count: usize) -> ScriptedWorld {
    let mut world = ScriptedWorld::new(FPS);

    let mut lead = ScriptedVehicle::driving(22.0);
    lead.model = test_models::CITY_EV;
    world.spawn(1, lead);
    world.seat_player(1);

    for i in 0..count.saturating_sub(1) {
        let id = 100 + i as i32;
        // Mix of cruising traffic, a hard-driven interceptor, and a few
        // parked cars for the brake roll.
        let mut v = if i % 7 == 0 {
            ScriptedVehicle::parked()
        } else {
            ScriptedVehicle::driving(12.0 + (i % 5) as f32 * 4.0)
        };
        v.model = match i % 4 {
            0 => test_models::SEDAN,
            1 => test_models::INTERCEPTOR,
            2 => test_models::ARMOURED_TRUCK,
            _ => test_models::SPORTBIKE,
        };
        if v.model == test_models::SPORTBIKE {
            v.kind = ModelKind::Motorcycle;
            v.class = VehicleClass::Motorcycles;
        }
        if v.model == test_models::INTERCEPTOR {
            v.rpm = 0.95;
            v.environment = EnvironmentSample {
                ambient_offset: 10.0,
                heating_multiplier: 1.15,
                cooling_multiplier: 0.85,
            };
        }
        world.spawn(id, v);
    }
    world
}

/// Minimal kinematics so odometers and the cruise loop see motion.
fn script_traffic(world: &mut ScriptedWorld, _frame: u64) {
    for id in world.all_vehicle_ids() {
        let speed = world.vehicle(id).speed;
        world.vehicle_mut(id).position.x += speed / FPS;
    }
    // The operator's car follows whatever throttle the core applied.
    let throttle = world.applied_throttle;
    let lead = world.vehicle_mut(1);
    lead.speed = (lead.speed + (throttle - 0.35) * 0.05).clamp(0.0, 40.0);
    lead.wheel_speed = lead.speed;
    lead.forward_velocity = lead.speed;
}

fn print_summary(
    engine: &SimEngine,
    world: &ScriptedWorld,
    tally: &BTreeMap<&'static str, u64>,
) {
    println!("── run summary ─────────────────────────────");
    println!("  frames simulated: {}", engine.frame());
    println!("  vehicles tracked: {}", engine.tracked_count());
    if let Some(session) = engine.cruise_session() {
        println!(
            "  cruise: on={} cancelled={} set={:.1} m/s output={:.2}",
            session.on, session.cancelled, session.set_speed, session.last_output
        );
    }
    if let Some(record) = engine.record(1) {
        println!(
            "  operator car: temp={:.1} odometer={:.2} km dead={}",
            record.engine_temperature,
            record.odometer,
            record.is_dead()
        );
    }
    println!("  world population: {}", world.population());
    println!();
    println!("  events:");
    for (name, count) in tally {
        println!("    {name:<24} {count}");
    }
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
