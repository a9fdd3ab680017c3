//! Ember runtime
//!
//! Headless driver: loads settings, composes the demo world and runs the
//! fixed-step tick loop.
//!
//! Usage: `ember [settings.json]`

mod demo;
mod systems;

use anyhow::{Context, Result};
use ember_core::app::Runtime;
use ember_core::parallel::ParallelWorker;
use ember_core::time::SimulationTime;
use ember_services::Settings;
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn main() -> Result<()> {
    let settings = match std::env::args().nth(1) {
        Some(path) => Settings::load(&path)
            .with_context(|| format!("failed to load settings from {path}"))?,
        None => Settings::default(),
    };
    settings.validate()?;

    tracing_subscriber::fmt()
        .with_max_level(settings.logging.level()?)
        .init();

    tracing::info!("Ember v{}", ember_core::VERSION);
    tracing::info!(
        worker_threads = settings.runtime.worker_threads,
        tick_rate_hz = settings.runtime.tick_rate_hz,
        max_ticks = settings.runtime.max_ticks,
        metrics = ember_metrics::ENABLED,
        "starting"
    );

    let world = demo::compose(&settings).context("failed to compose the demo world")?;
    let templates = world.templates;
    tracing::info!(scout = %templates.scout, brute = %templates.brute, squad = %world.squad, "world composed");
    let spawned = Arc::clone(&world.spawned);

    let worker = ParallelWorker::new(settings.runtime.worker_threads)?;
    let mut runtime = Runtime::new(
        world.actors,
        Arc::new(world.assets),
        Arc::new(world.dispatch),
        worker,
    );

    let rate = u64::from(settings.runtime.tick_rate_hz);
    runtime.add_system(systems::SpawnSystem::new(templates, rate / 10, 64))?;
    runtime.add_system(systems::MovementSystem)?;
    runtime.add_system(systems::CombatSystem::new(rate / 4, 9, 4))?;
    runtime.add_message_group_systems()?;
    runtime.add_system(systems::ReportSystem::new(rate))?;

    let mut clock = SimulationTime::new(settings.runtime.tick_rate_hz);
    for _ in 0..settings.runtime.max_ticks {
        runtime.tick(&mut clock)?;
    }

    let timer = runtime.timer();
    let (min_ms, max_ms) = timer.tick_time_range_ms();
    tracing::info!(
        ticks = runtime.ticks(),
        simulated = ?clock.total_time(),
        tick_ms = timer.tick_time_ms(),
        min_ms,
        max_ms,
        "loop finished"
    );
    for (name, value) in runtime.counter().iter() {
        tracing::info!(counter = name, value, "counter");
    }

    let actors = runtime.shutdown();
    tracing::info!(
        spawned = spawned.load(Ordering::Relaxed),
        remaining = actors.pool::<demo::Health>()?.len(),
        "shut down"
    );
    Ok(())
}
