use crate::demo::{ActorSpawned, CountAlive, Damage, Heal, Health, Position, Templates, Velocity};
use ember_core::app::{Frame, System};
use ember_core::ecs::BuildArgs;
use ember_core::parallel::{Partitioned, Wave};
use ember_core::time::TickTime;
use ember_core::Error;
use glam::Vec2;

/// Builds a new actor every `every` ticks until `limit` is reached,
/// alternating between the two templates.
pub struct SpawnSystem {
    templates: Templates,
    every: u64,
    limit: usize,
    spawned: usize,
}

impl SpawnSystem {
    pub fn new(templates: Templates, every: u64, limit: usize) -> Self {
        Self {
            templates,
            every: every.max(1),
            limit,
            spawned: 0,
        }
    }
}

impl System for SpawnSystem {
    fn name(&self) -> &str {
        "spawn"
    }

    fn update(&mut self, frame: &mut Frame<'_>, time: TickTime) -> Result<(), Error> {
        if self.spawned >= self.limit || time.tick % self.every != 0 {
            return Ok(());
        }

        let n = self.spawned;
        let template = if n % 3 == 2 {
            self.templates.brute
        } else {
            self.templates.scout
        };
        let args = BuildArgs::new().with(
            "position",
            Vec2::new((n % 8) as f32 * 4.0, (n / 8) as f32 * 4.0),
        );
        let owner = frame.actors.build(frame.assets, template, &args)?;
        frame
            .dispatch
            .publish(frame.actors, &ActorSpawned { owner, template })?;
        self.spawned += 1;
        Ok(())
    }
}

/// Integrates velocity into position, one partition per worker.
pub struct MovementSystem;

impl System for MovementSystem {
    fn name(&self) -> &str {
        "movement"
    }

    fn update(&mut self, frame: &mut Frame<'_>, time: TickTime) -> Result<(), Error> {
        let dt = time.delta_seconds();
        let degree = frame.worker.degree();
        let (positions, velocities) = frame.actors.pool_pair_mut::<Position, Velocity>()?;
        if positions.is_empty() {
            return Ok(());
        }

        let owners = positions.owners().to_vec();
        let velocities = &*velocities;
        let parts = Partitioned::new(positions.values_mut(), degree);
        frame.worker.run_with(|wave: Wave| {
            parts.with(wave, |offset, chunk| {
                for (i, position) in chunk.iter_mut().enumerate() {
                    if let Some(velocity) = velocities.try_get(owners[offset + i]) {
                        position.0 += velocity.0 * dt;
                    }
                }
            });
        })?;
        Ok(())
    }
}

/// Hits every actor on an interval; the wounded get a heal queued for the
/// `Combat` group and the dead are destroyed.
pub struct CombatSystem {
    every: u64,
    damage: i32,
    heal: i32,
}

impl CombatSystem {
    pub fn new(every: u64, damage: i32, heal: i32) -> Self {
        Self {
            every: every.max(1),
            damage,
            heal,
        }
    }
}

impl System for CombatSystem {
    fn name(&self) -> &str {
        "combat"
    }

    fn update(&mut self, frame: &mut Frame<'_>, time: TickTime) -> Result<(), Error> {
        if time.tick % self.every != 0 {
            return Ok(());
        }

        let targets = frame.actors.pool::<Health>()?.owners().to_vec();
        for target in targets {
            let left = frame.dispatch.send(
                frame.actors,
                Damage {
                    target,
                    amount: self.damage,
                },
            )?;
            if left == 0 {
                let removed = frame.actors.destroy(target)?;
                tracing::debug!(%target, removed, tick = time.tick, "actor destroyed");
            } else if left < frame.actors.get::<Health>(target)?.max / 2 {
                frame.dispatch.enqueue(Heal {
                    target,
                    amount: self.heal,
                })?;
            }
        }
        Ok(())
    }
}

/// Logs a population summary on an interval.
pub struct ReportSystem {
    every: u64,
}

impl ReportSystem {
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
        }
    }
}

impl System for ReportSystem {
    fn name(&self) -> &str {
        "report"
    }

    fn draw(&mut self, frame: &Frame<'_>, time: TickTime) -> Result<(), Error> {
        if time.tick % self.every != 0 {
            return Ok(());
        }

        let alive = frame.dispatch.ask(&*frame.actors, CountAlive)?;
        let centroid = {
            let positions = frame.actors.pool::<Position>()?;
            let sum: Vec2 = positions.values().iter().map(|p| p.0).sum();
            sum / positions.len().max(1) as f32
        };
        tracing::info!(
            tick = time.tick,
            total = ?time.total,
            alive,
            centroid = %centroid,
            "population"
        );
        Ok(())
    }
}
