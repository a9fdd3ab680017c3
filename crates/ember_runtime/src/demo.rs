//! Demo world: drifters spawned from templates, worn down by damage and
//! patched up through queued heals.

use ember_core::convert::JsonConverter;
use ember_core::define_component;
use ember_core::dispatch::{
    Command, Dispatcher, HandlerContainer, HandlerFailure, Message, Notification, Outcome, Query,
};
use ember_core::ecs::{
    hierarchy, BuildArgs, BuildError, Builder, EntityContext, FnBuilder, Namespace, OwnerId,
    PoolOptions,
};
use ember_services::Settings;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position(pub Vec2);
define_component!(Position);

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Velocity(pub Vec2);
define_component!(Velocity);

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub current: i32,
    pub max: i32,
}
define_component!(Health);

/// Asset component: how a drifter moves.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct DrifterTemplate {
    pub speed: f32,
    pub heading: Vec2,
}
define_component!(DrifterTemplate);

/// Asset component: starting health.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct VitalsTemplate {
    pub max_health: i32,
}
define_component!(VitalsTemplate);

pub struct Damage {
    pub target: OwnerId,
    pub amount: i32,
}

impl Command for Damage {
    /// Health left after the hit.
    type Output = i32;
}

pub struct CountAlive;

impl Query for CountAlive {
    type Output = usize;
}

pub struct ActorSpawned {
    pub owner: OwnerId,
    pub template: OwnerId,
}

impl Notification for ActorSpawned {}

pub struct Heal {
    pub target: OwnerId,
    pub amount: i32,
}

impl Message for Heal {
    const GROUP: &'static str = "Combat";
}

/// Template assets the spawner cycles through.
#[derive(Clone, Copy, Debug)]
pub struct Templates {
    pub scout: OwnerId,
    pub brute: OwnerId,
}

pub struct World {
    pub actors: EntityContext,
    pub assets: EntityContext,
    pub dispatch: Dispatcher,
    pub templates: Templates,
    /// Every spawned actor is parented here.
    pub squad: OwnerId,
    pub spawned: Arc<AtomicUsize>,
}

struct DrifterAspect;

impl Builder for DrifterAspect {
    type Template = DrifterTemplate;

    fn name(&self) -> &'static str {
        "drifter"
    }

    fn build(
        &self,
        actors: &mut EntityContext,
        owner: OwnerId,
        template: &DrifterTemplate,
        args: &BuildArgs,
    ) -> Result<(), BuildError> {
        let position = args.vec2_or("position", Vec2::ZERO)?;
        let speed = args.float_or("speed", f64::from(template.speed))? as f32;
        actors.set(owner, Position(position))?;
        actors.set(owner, Velocity(template.heading.normalize_or_zero() * speed))?;
        Ok(())
    }
}

pub fn compose(settings: &Settings) -> Result<World, ember_core::Error> {
    let capacity = settings.pools.default_capacity;

    let mut assets = EntityContext::with_default_capacity(Namespace::Assets, capacity);
    assets.register_pool(PoolOptions::<DrifterTemplate>::new().converter(JsonConverter::new()))?;
    assets.register_pool(PoolOptions::<VitalsTemplate>::new().converter(JsonConverter::new()))?;

    let scout = assets.create()?;
    assets.set(
        scout,
        DrifterTemplate {
            speed: 6.0,
            heading: Vec2::new(1.0, 0.5),
        },
    )?;
    assets.set(scout, VitalsTemplate { max_health: 40 })?;

    let brute = assets.create()?;
    assets.set(
        brute,
        DrifterTemplate {
            speed: 1.5,
            heading: Vec2::new(-0.25, 1.0),
        },
    )?;
    assets.set(brute, VitalsTemplate { max_health: 120 })?;

    let mut actors = EntityContext::with_default_capacity(Namespace::Actors, capacity);
    actors.register_pool(PoolOptions::<Position>::new().converter(JsonConverter::new()))?;
    actors.register_pool(PoolOptions::<Velocity>::new())?;
    actors.register_pool(
        PoolOptions::<Health>::new()
            .converter(JsonConverter::new())
            .on_removing(|owner, hp| tracing::debug!(%owner, hp = hp.current, "health removed")),
    )?;
    actors.register_builder(DrifterAspect);
    actors.register_builder(FnBuilder::new(
        "vitals",
        |actors: &mut EntityContext,
         owner: OwnerId,
         template: &VitalsTemplate,
         args: &BuildArgs|
         -> Result<(), BuildError> {
            let max = args.int_or("max_health", i64::from(template.max_health))?;
            let max = i32::try_from(max).map_err(|_| BuildError::ArgumentType {
                key: "max_health".to_owned(),
                expected: "i32",
                found: "int",
            })?;
            actors.set(owner, Health { current: max, max })?;
            Ok(())
        },
    ));
    let squad = actors.create()?;

    let spawned = Arc::new(AtomicUsize::new(0));
    let dispatch = handlers(squad, Arc::clone(&spawned))?;

    Ok(World {
        actors,
        assets,
        dispatch,
        templates: Templates { scout, brute },
        squad,
        spawned,
    })
}

fn handlers(squad: OwnerId, spawned: Arc<AtomicUsize>) -> Result<Dispatcher, ember_core::Error> {
    let mut container = HandlerContainer::new();
    container.register_command::<Damage>(apply_damage)?;
    container.register_query::<CountAlive>(count_alive)?;
    container.register_notification::<ActorSpawned>(
        move |_: &mut EntityContext, event: &ActorSpawned| -> Outcome {
            let total = spawned.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::debug!(owner = %event.owner, template = %event.template, total, "actor spawned");
            Ok(())
        },
    )?;
    container.register_notification::<ActorSpawned>(
        move |actors: &mut EntityContext, event: &ActorSpawned| -> Outcome {
            hierarchy::attach(actors, event.owner, squad).map_err(failure)
        },
    )?;
    container.register_message::<Heal>(apply_heal)?;
    Ok(container.build())
}

fn failure(err: impl std::fmt::Display) -> HandlerFailure {
    HandlerFailure::new(err.to_string())
}

fn apply_damage(actors: &mut EntityContext, damage: Damage) -> Outcome<i32> {
    let health = actors.get_mut::<Health>(damage.target).map_err(failure)?;
    health.current = (health.current - damage.amount).max(0);
    Ok(health.current)
}

fn count_alive(actors: &EntityContext, _: CountAlive) -> Outcome<usize> {
    let pool = actors.pool::<Health>().map_err(failure)?;
    Ok(pool.values().iter().filter(|hp| hp.current > 0).count())
}

fn apply_heal(actors: &mut EntityContext, heal: Heal) -> Outcome {
    // The target may have been destroyed after the heal was queued.
    if let Some(health) = actors.try_get_mut::<Health>(heal.target) {
        health.current = (health.current + heal.amount).min(health.max);
    }
    Ok(())
}
