//! Systems and the tick entry points.
//!
//! `Runtime` is the result of composition: it owns the actor context, shares
//! the asset context and dispatcher, drives the parallel worker and runs the
//! registered systems once per tick.

mod system;
mod system_error;
mod system_handle;
mod system_registry;

pub use system::{Frame, MessageGroupSystem, System};
pub use system_error::SystemError;
pub use system_handle::SystemHandle;
pub use system_registry::SystemRegistry;

use crate::dispatch::Dispatcher;
use crate::ecs::EntityContext;
use crate::parallel::ParallelWorker;
use crate::time::{SimulationTime, TickTime};
use crate::Error;
use ember_metrics::{Counter, FrameTimer, SystemProfiler};
use std::sync::Arc;
use std::time::Duration;

/// Ticks averaged by the runtime's tick timer.
const TIMER_WINDOW: usize = 120;

pub struct Runtime {
    actors: EntityContext,
    assets: Arc<EntityContext>,
    dispatch: Arc<Dispatcher>,
    worker: ParallelWorker,
    systems: SystemRegistry,
    profiler: SystemProfiler,
    counter: Counter,
    timer: FrameTimer,
    tick: u64,
}

impl Runtime {
    pub fn new(
        actors: EntityContext,
        assets: Arc<EntityContext>,
        dispatch: Arc<Dispatcher>,
        worker: ParallelWorker,
    ) -> Self {
        tracing::info!(
            degree = worker.degree(),
            message_groups = dispatch.groups().count(),
            "runtime composed"
        );
        Self {
            actors,
            assets,
            dispatch,
            worker,
            systems: SystemRegistry::new(),
            profiler: SystemProfiler::new(),
            counter: Counter::new(),
            timer: FrameTimer::new(TIMER_WINDOW),
            tick: 0,
        }
    }

    pub fn add_system(&mut self, system: impl System + 'static) -> Result<SystemHandle, SystemError> {
        self.systems.register(Box::new(system))
    }

    /// Registers a `MessageGroupSystem` for every message group, in group
    /// order.
    pub fn add_message_group_systems(&mut self) -> Result<Vec<SystemHandle>, SystemError> {
        let groups: Vec<&'static str> = self.dispatch.groups().map(|group| group.name()).collect();
        groups
            .into_iter()
            .map(|group| self.add_system(MessageGroupSystem::new(group)))
            .collect()
    }

    pub fn actors(&self) -> &EntityContext {
        &self.actors
    }

    pub fn actors_mut(&mut self) -> &mut EntityContext {
        &mut self.actors
    }

    pub fn assets(&self) -> &Arc<EntityContext> {
        &self.assets
    }

    pub fn dispatch(&self) -> &Arc<Dispatcher> {
        &self.dispatch
    }

    pub fn worker(&self) -> &ParallelWorker {
        &self.worker
    }

    pub fn systems(&self) -> &SystemRegistry {
        &self.systems
    }

    pub fn profiler(&self) -> &SystemProfiler {
        &self.profiler
    }

    pub fn counter(&self) -> &Counter {
        &self.counter
    }

    pub fn timer(&self) -> &FrameTimer {
        &self.timer
    }

    /// Ticks run so far.
    pub fn ticks(&self) -> u64 {
        self.tick
    }

    /// Runs every system's update in registration order.
    pub fn update(&mut self, delta: Duration, total: Duration) -> Result<(), Error> {
        let time = TickTime {
            tick: self.tick + 1,
            delta,
            total,
        };
        self.run_update(time)
    }

    /// Runs every system's draw in registration order.
    pub fn draw(&mut self, delta: Duration, total: Duration) -> Result<(), Error> {
        let time = TickTime {
            tick: self.tick,
            delta,
            total,
        };
        self.run_draw(time)
    }

    /// Advances the clock one step, then updates and draws.
    pub fn tick(&mut self, clock: &mut SimulationTime) -> Result<TickTime, Error> {
        self.timer.begin();
        let time = clock.advance_tick();
        self.run_update(time)?;
        self.run_draw(time)?;
        self.timer.end();
        Ok(time)
    }

    fn run_update(&mut self, time: TickTime) -> Result<(), Error> {
        self.tick = time.tick;
        let waves_before = self.worker.waves();
        let messages_before = self.messages_handled();

        let Self {
            actors,
            assets,
            dispatch,
            worker,
            systems,
            profiler,
            ..
        } = &mut *self;
        for (_, name, system) in systems.entries_mut() {
            let mut frame = Frame {
                actors: &mut *actors,
                assets: &**assets,
                dispatch: &**dispatch,
                worker: &*worker,
            };
            profiler
                .time_system(name, || system.update(&mut frame, time))
                .map_err(|source| SystemError::Failed {
                    system: name.to_owned(),
                    phase: "update",
                    source: Box::new(source),
                })?;
        }

        self.counter.increment("ticks", 1);
        self.counter
            .increment("waves", self.worker.waves() - waves_before);
        let messages = self.messages_handled() - messages_before;
        self.counter.increment("messages", messages);
        Ok(())
    }

    fn messages_handled(&self) -> u64 {
        self.dispatch.groups().map(|group| group.handled()).sum()
    }

    fn run_draw(&mut self, time: TickTime) -> Result<(), Error> {
        let Self {
            actors,
            assets,
            dispatch,
            worker,
            systems,
            profiler,
            ..
        } = &mut *self;
        for (_, name, system) in systems.entries_mut() {
            let frame = Frame {
                actors: &mut *actors,
                assets: &**assets,
                dispatch: &**dispatch,
                worker: &*worker,
            };
            profiler
                .time_system(name, || system.draw(&frame, time))
                .map_err(|source| SystemError::Failed {
                    system: name.to_owned(),
                    phase: "draw",
                    source: Box::new(source),
                })?;
        }
        Ok(())
    }

    /// Disposes the worker and hands back the actor context.
    pub fn shutdown(mut self) -> EntityContext {
        self.worker.dispose();
        for (name, timing) in self.profiler.iter() {
            tracing::debug!(
                system = name,
                calls = timing.calls,
                average_us = timing.average().as_micros() as u64,
                "system timing"
            );
        }
        tracing::info!(ticks = self.tick, "runtime shut down");
        self.actors
    }
}
