// context.rs - Entity context: owner allocation, component pools, builders

use crate::ecs::builder::{BuilderAdapter, ErasedBuilder};
use crate::ecs::hierarchy::{self, HierarchyNode};
use crate::ecs::{
    AnyPool, Binding, BuildArgs, BuildError, Builder, Component, ComponentId, ComponentPool,
    OwnerId, PoolError, PoolOptions,
};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Default owner capacity for pools registered without an explicit one.
pub const DEFAULT_POOL_CAPACITY: usize = 1024;

/// Which id space a context serves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Live, mutable entities.
    Actors,
    /// Immutable-after-load templates.
    Assets,
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Namespace::Actors => "actors",
            Namespace::Assets => "assets",
        })
    }
}

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("{component} pool is already registered in the {namespace} context")]
    DuplicatePool {
        component: &'static str,
        namespace: Namespace,
    },
    #[error("no {component} pool registered in the {namespace} context")]
    PoolNotRegistered {
        component: &'static str,
        namespace: Namespace,
    },
    #[error("pool pair names {component} twice")]
    SamePool { component: &'static str },
    #[error("owner {owner} was never allocated in the {namespace} context")]
    UnknownOwner { owner: OwnerId, namespace: Namespace },
    #[error("{namespace} owner id space exhausted")]
    IdSpaceExhausted { namespace: Namespace },
    #[error(transparent)]
    Pool(#[from] PoolError),
}

struct BuilderEntry {
    template: ComponentId,
    builder: Arc<dyn ErasedBuilder>,
}

/// Owns one namespace's component pools and hands out its owner ids.
pub struct EntityContext {
    namespace: Namespace,
    pools: Vec<Option<Box<dyn AnyPool>>>,
    registration_order: Vec<ComponentId>,
    next_owner: u32,
    default_capacity: usize,
    builders: Vec<BuilderEntry>,
}

impl EntityContext {
    pub fn new(namespace: Namespace) -> Self {
        Self::with_default_capacity(namespace, DEFAULT_POOL_CAPACITY)
    }

    /// Actor contexts come with the `Binding` and `HierarchyNode` pools.
    pub fn with_default_capacity(namespace: Namespace, default_capacity: usize) -> Self {
        let mut context = Self {
            namespace,
            pools: Vec::new(),
            registration_order: Vec::new(),
            next_owner: 1,
            default_capacity,
            builders: Vec::new(),
        };
        if namespace == Namespace::Actors {
            context.insert_pool(ComponentPool::<Binding>::with_capacity(default_capacity));
            context.insert_pool(ComponentPool::<HierarchyNode>::with_capacity(default_capacity));
        }
        tracing::debug!(%namespace, default_capacity, "created entity context");
        context
    }

    #[inline]
    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    // ----- pools -----

    fn insert_pool<T: Component>(&mut self, pool: ComponentPool<T>) {
        let index = T::id() as usize;
        if self.pools.len() <= index {
            self.pools.resize_with(index + 1, || None);
        }
        self.pools[index] = Some(Box::new(pool));
        self.registration_order.push(T::id());
    }

    pub fn register_pool<T: Component>(&mut self, options: PoolOptions<T>) -> Result<(), ContextError> {
        if self.is_registered::<T>() {
            return Err(ContextError::DuplicatePool {
                component: T::NAME,
                namespace: self.namespace,
            });
        }

        let capacity = options.capacity.unwrap_or(self.default_capacity);
        self.insert_pool(ComponentPool::from_options(options.capacity(capacity)));
        tracing::debug!(
            namespace = %self.namespace,
            component = T::NAME,
            id = T::id(),
            capacity,
            "registered component pool"
        );
        Ok(())
    }

    pub fn is_registered<T: Component>(&self) -> bool {
        matches!(self.pools.get(T::id() as usize), Some(Some(_)))
    }

    fn not_registered<T: Component>(&self) -> ContextError {
        ContextError::PoolNotRegistered {
            component: T::NAME,
            namespace: self.namespace,
        }
    }

    pub fn pool<T: Component>(&self) -> Result<&ComponentPool<T>, ContextError> {
        self.pools
            .get(T::id() as usize)
            .and_then(Option::as_deref)
            .and_then(|pool| pool.as_any().downcast_ref::<ComponentPool<T>>())
            .ok_or_else(|| self.not_registered::<T>())
    }

    pub fn pool_mut<T: Component>(&mut self) -> Result<&mut ComponentPool<T>, ContextError> {
        let err = self.not_registered::<T>();
        downcast_slot::<T>(self.pools.get_mut(T::id() as usize)).ok_or(err)
    }

    /// Two distinct pools borrowed mutably at once.
    pub fn pool_pair_mut<A: Component, B: Component>(
        &mut self,
    ) -> Result<(&mut ComponentPool<A>, &mut ComponentPool<B>), ContextError> {
        let (a, b) = (A::id() as usize, B::id() as usize);
        if a == b {
            return Err(ContextError::SamePool { component: A::NAME });
        }
        if !self.is_registered::<A>() {
            return Err(self.not_registered::<A>());
        }
        if !self.is_registered::<B>() {
            return Err(self.not_registered::<B>());
        }
        let (err_a, err_b) = (self.not_registered::<A>(), self.not_registered::<B>());

        let (low, high) = (a.min(b), a.max(b));
        let (head, tail) = self.pools.split_at_mut(high);
        let (low_slot, high_slot) = (head.get_mut(low), tail.get_mut(0));
        let (slot_a, slot_b) = if a < b {
            (low_slot, high_slot)
        } else {
            (high_slot, low_slot)
        };

        let pool_a = downcast_slot::<A>(slot_a).ok_or(err_a)?;
        let pool_b = downcast_slot::<B>(slot_b).ok_or(err_b)?;
        Ok((pool_a, pool_b))
    }

    /// Type-erased pools in registration order.
    pub fn pools(&self) -> impl Iterator<Item = &dyn AnyPool> + '_ {
        self.registration_order
            .iter()
            .filter_map(|&id| self.pools.get(id as usize).and_then(Option::as_deref))
    }

    // ----- per-type convenience -----

    pub fn set<T: Component>(&mut self, owner: OwnerId, value: T) -> Result<&mut T, ContextError> {
        self.check_allocated(owner)?;
        Ok(self.pool_mut::<T>()?.set(owner, value)?)
    }

    pub fn get<T: Component>(&self, owner: OwnerId) -> Result<&T, ContextError> {
        Ok(self.pool::<T>()?.get(owner)?)
    }

    pub fn get_mut<T: Component>(&mut self, owner: OwnerId) -> Result<&mut T, ContextError> {
        Ok(self.pool_mut::<T>()?.get_mut(owner)?)
    }

    /// `None` when the pool is missing or the owner has no `T`.
    pub fn try_get<T: Component>(&self, owner: OwnerId) -> Option<&T> {
        self.pool::<T>().ok().and_then(|pool| pool.try_get(owner))
    }

    pub fn try_get_mut<T: Component>(&mut self, owner: OwnerId) -> Option<&mut T> {
        self.pool_mut::<T>().ok().and_then(|pool| pool.try_get_mut(owner))
    }

    /// `false` when the pool is missing.
    pub fn has<T: Component>(&self, owner: OwnerId) -> bool {
        self.pool::<T>().map_or(false, |pool| pool.has(owner))
    }

    pub fn update<T: Component>(&mut self, owner: OwnerId, value: T) -> Result<T, ContextError> {
        Ok(self.pool_mut::<T>()?.update(owner, value)?)
    }

    pub fn remove<T: Component>(&mut self, owner: OwnerId) -> Result<T, ContextError> {
        Ok(self.pool_mut::<T>()?.remove(owner)?)
    }

    // ----- owners -----

    /// Allocates the next owner id. Ids are never reused.
    pub fn create(&mut self) -> Result<OwnerId, ContextError> {
        let raw = self.next_owner;
        if raw == u32::MAX {
            return Err(ContextError::IdSpaceExhausted {
                namespace: self.namespace,
            });
        }
        self.next_owner += 1;
        Ok(OwnerId::new(raw))
    }

    /// Number of ids handed out so far.
    pub fn allocated(&self) -> u32 {
        self.next_owner - 1
    }

    pub fn is_allocated(&self, owner: OwnerId) -> bool {
        !owner.is_none() && owner.raw() < self.next_owner
    }

    fn check_allocated(&self, owner: OwnerId) -> Result<(), ContextError> {
        if self.is_allocated(owner) {
            Ok(())
        } else {
            Err(ContextError::UnknownOwner {
                owner,
                namespace: self.namespace,
            })
        }
    }

    /// Owner holds at least one component.
    pub fn contains(&self, owner: OwnerId) -> bool {
        self.pools().any(|pool| pool.has_owner(owner))
    }

    /// Detaches the owner from the hierarchy, then removes its component from
    /// every pool. Returns how many components were removed.
    pub fn destroy(&mut self, owner: OwnerId) -> Result<usize, ContextError> {
        self.check_allocated(owner)?;

        let mut removed = 0;
        if self.has::<HierarchyNode>(owner) {
            hierarchy::detach_node(self, owner)?;
            removed += 1;
        }

        for index in 0..self.registration_order.len() {
            let id = self.registration_order[index] as usize;
            if let Some(pool) = self.pools.get_mut(id).and_then(Option::as_deref_mut) {
                if pool.has_owner(owner) {
                    pool.remove_owner(owner)?;
                    removed += 1;
                }
            }
        }
        tracing::trace!(namespace = %self.namespace, %owner, removed, "destroyed owner");
        Ok(removed)
    }

    // ----- builders -----

    /// Adds a builder. Several builders may share a template type; they run in
    /// registration order.
    pub fn register_builder<B: Builder>(&mut self, builder: B) {
        let adapter = BuilderAdapter(builder);
        tracing::debug!(
            namespace = %self.namespace,
            builder = adapter.name(),
            template = B::Template::NAME,
            "registered builder"
        );
        self.builders.push(BuilderEntry {
            template: adapter.template_id(),
            builder: Arc::new(adapter),
        });
    }

    pub fn builder_count(&self) -> usize {
        self.builders.len()
    }

    /// Builders keyed by a template component.
    pub fn builders_for<T: Component>(&self) -> usize {
        self.builders
            .iter()
            .filter(|entry| entry.template == T::id())
            .count()
    }

    /// Builds a new actor from a template asset.
    ///
    /// Fails with `NoBuilder` before allocating when no builder applies. A
    /// builder failure destroys the partially built actor.
    pub fn build(
        &mut self,
        assets: &EntityContext,
        template: OwnerId,
        args: &BuildArgs,
    ) -> Result<OwnerId, BuildError> {
        if !assets.is_allocated(template) {
            return Err(BuildError::UnknownTemplate { template });
        }

        let selected: Vec<Arc<dyn ErasedBuilder>> = self
            .builders
            .iter()
            .filter(|entry| entry.builder.applies_to(assets, template))
            .map(|entry| Arc::clone(&entry.builder))
            .collect();
        if selected.is_empty() {
            return Err(BuildError::NoBuilder { template });
        }

        let owner = self.create()?;
        if let Err(err) = self.compose(assets, owner, template, args, &selected) {
            tracing::debug!(%owner, %template, error = %err, "build failed, discarding actor");
            self.destroy(owner)?;
            return Err(err);
        }

        tracing::trace!(%owner, %template, builders = selected.len(), "built actor");
        Ok(owner)
    }

    fn compose(
        &mut self,
        assets: &EntityContext,
        owner: OwnerId,
        template: OwnerId,
        args: &BuildArgs,
        builders: &[Arc<dyn ErasedBuilder>],
    ) -> Result<(), BuildError> {
        self.set(owner, Binding { template })?;
        for builder in builders {
            builder.build_erased(self, assets, owner, template, args)?;
        }
        Ok(())
    }

    /// Template an actor was built from.
    pub fn template_of(&self, owner: OwnerId) -> Option<OwnerId> {
        self.try_get::<Binding>(owner).map(|binding| binding.template)
    }
}

fn downcast_slot<T: Component>(
    slot: Option<&mut Option<Box<dyn AnyPool>>>,
) -> Option<&mut ComponentPool<T>> {
    slot.and_then(Option::as_deref_mut)
        .and_then(|pool| pool.as_any_mut().downcast_mut::<ComponentPool<T>>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::define_component;
    use crate::ecs::hierarchy;
    use crate::parallel::{ParallelWorker, Wave};
    use glam::Vec2;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Position(Vec2);
    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Health {
        current: f32,
        max: f32,
    }
    define_component!(Position, "Position");
    define_component!(Health, "Health");

    // Template components living in the asset context.
    #[derive(Debug, Clone, Copy)]
    struct PositionAspect {
        spawn: Vec2,
    }
    #[derive(Debug, Clone, Copy)]
    struct HealthAspect {
        max: f32,
    }
    define_component!(PositionAspect, "PositionAspect");
    define_component!(HealthAspect, "HealthAspect");

    struct PositionBuilder;
    impl Builder for PositionBuilder {
        type Template = PositionAspect;

        fn build(
            &self,
            actors: &mut EntityContext,
            owner: OwnerId,
            template: &PositionAspect,
            args: &BuildArgs,
        ) -> Result<(), BuildError> {
            let at = args.vec2_or("position", template.spawn)?;
            actors.set(owner, Position(at))?;
            Ok(())
        }
    }

    struct HealthBuilder;
    impl Builder for HealthBuilder {
        type Template = HealthAspect;

        fn build(
            &self,
            actors: &mut EntityContext,
            owner: OwnerId,
            template: &HealthAspect,
            args: &BuildArgs,
        ) -> Result<(), BuildError> {
            let current = args.float_or("health", template.max as f64)? as f32;
            if current > template.max {
                return Err(BuildError::Failed {
                    builder: self.name(),
                    reason: format!("health {current} exceeds max {}", template.max),
                });
            }
            actors.set(owner, Health { current, max: template.max })?;
            Ok(())
        }
    }

    fn assets_with_template() -> (EntityContext, OwnerId) {
        let mut assets = EntityContext::new(Namespace::Assets);
        assets.register_pool(PoolOptions::<PositionAspect>::new()).unwrap();
        assets.register_pool(PoolOptions::<HealthAspect>::new()).unwrap();

        let template = assets.create().unwrap();
        assets
            .set(template, PositionAspect { spawn: Vec2::new(3.0, 4.0) })
            .unwrap();
        assets.set(template, HealthAspect { max: 100.0 }).unwrap();
        (assets, template)
    }

    fn actors() -> EntityContext {
        let mut actors = EntityContext::new(Namespace::Actors);
        actors.register_pool(PoolOptions::<Position>::new()).unwrap();
        actors.register_pool(PoolOptions::<Health>::new()).unwrap();
        actors.register_builder(PositionBuilder);
        actors.register_builder(HealthBuilder);
        actors
    }

    #[test]
    fn owner_ids_start_at_one_and_increase() {
        let mut ctx = EntityContext::new(Namespace::Assets);
        let a = ctx.create().unwrap();
        let b = ctx.create().unwrap();
        assert_eq!(a.raw(), 1);
        assert_eq!(b.raw(), 2);
        assert_eq!(ctx.allocated(), 2);
        assert!(!ctx.is_allocated(OwnerId::NONE));
        assert!(!ctx.is_allocated(OwnerId::new(3)));
    }

    #[test]
    fn id_space_exhaustion_is_reported() {
        let mut ctx = EntityContext::new(Namespace::Actors);
        ctx.next_owner = u32::MAX;
        assert!(matches!(
            ctx.create().unwrap_err(),
            ContextError::IdSpaceExhausted { namespace: Namespace::Actors }
        ));
    }

    #[test]
    fn duplicate_pool_is_rejected() {
        let mut ctx = EntityContext::new(Namespace::Actors);
        ctx.register_pool(PoolOptions::<Position>::new()).unwrap();
        let err = ctx.register_pool(PoolOptions::<Position>::new()).unwrap_err();
        assert!(matches!(err, ContextError::DuplicatePool { component: "Position", .. }));
        assert!(ctx.is_registered::<Binding>());
    }

    #[test]
    fn unregistered_pool_is_reported() {
        let mut ctx = EntityContext::new(Namespace::Assets);
        let owner = ctx.create().unwrap();
        assert!(matches!(
            ctx.set(owner, Health { current: 1.0, max: 1.0 }).unwrap_err(),
            ContextError::PoolNotRegistered { component: "Health", .. }
        ));
        assert!(!ctx.has::<Health>(owner));
    }

    #[test]
    fn set_requires_allocated_owner() {
        let mut ctx = actors();
        let err = ctx.set(OwnerId::new(50), Position(Vec2::ZERO)).unwrap_err();
        assert!(matches!(err, ContextError::UnknownOwner { .. }));
    }

    #[test]
    fn pool_pair_borrows_both() {
        let mut ctx = actors();
        let owner = ctx.create().unwrap();
        ctx.set(owner, Position(Vec2::ZERO)).unwrap();
        ctx.set(owner, Health { current: 5.0, max: 10.0 }).unwrap();

        let (health, positions) = ctx.pool_pair_mut::<Health, Position>().unwrap();
        positions.get_mut(owner).unwrap().0.x = health.get(owner).unwrap().current;
        health.get_mut(owner).unwrap().current = 0.0;

        assert_eq!(ctx.get::<Position>(owner).unwrap().0.x, 5.0);
        assert_eq!(ctx.get::<Health>(owner).unwrap().current, 0.0);
        assert!(matches!(
            ctx.pool_pair_mut::<Health, Health>(),
            Err(ContextError::SamePool { .. })
        ));
    }

    #[test]
    fn destroy_removes_everything_and_disposes() {
        let disposed = std::sync::Arc::new(AtomicUsize::new(0));
        let counter = std::sync::Arc::clone(&disposed);
        let mut ctx = EntityContext::new(Namespace::Actors);
        ctx.register_pool(PoolOptions::<Health>::new().dispose(move |_, _| {
            counter.fetch_add(1, Ordering::Relaxed);
        }))
        .unwrap();
        ctx.register_pool(PoolOptions::<Position>::new()).unwrap();

        let owner = ctx.create().unwrap();
        ctx.set(owner, Health { current: 1.0, max: 1.0 }).unwrap();
        ctx.set(owner, Position(Vec2::ONE)).unwrap();
        assert!(ctx.contains(owner));

        assert_eq!(ctx.destroy(owner).unwrap(), 2);
        assert!(!ctx.contains(owner));
        assert_eq!(disposed.load(Ordering::Relaxed), 1);
        assert!(ctx.destroy(OwnerId::new(99)).is_err());
    }

    #[test]
    fn destroy_detaches_hierarchy() {
        let mut ctx = actors();
        let parent = ctx.create().unwrap();
        let child = ctx.create().unwrap();
        hierarchy::attach(&mut ctx, child, parent).unwrap();

        ctx.destroy(parent).unwrap();
        assert_eq!(hierarchy::parent_of(&ctx, child), None);
        assert!(ctx.has::<HierarchyNode>(child));
    }

    #[test]
    fn build_applies_template_and_overrides() {
        let (assets, template) = assets_with_template();
        let mut actors = actors();

        let args = BuildArgs::new().with("health", 40.0);
        let actor = actors.build(&assets, template, &args).unwrap();

        assert_eq!(actors.get::<Position>(actor).unwrap(), &Position(Vec2::new(3.0, 4.0)));
        assert_eq!(
            actors.get::<Health>(actor).unwrap(),
            &Health { current: 40.0, max: 100.0 }
        );
        assert_eq!(actors.template_of(actor), Some(template));
    }

    #[test]
    fn build_only_runs_matching_builders() {
        let (mut assets, _) = assets_with_template();
        let bare = assets.create().unwrap();
        assets.set(bare, HealthAspect { max: 10.0 }).unwrap();
        let mut actors = actors();

        let actor = actors.build(&assets, bare, &BuildArgs::new()).unwrap();
        assert!(actors.has::<Health>(actor));
        assert!(!actors.has::<Position>(actor));
    }

    #[test]
    fn build_without_builder_allocates_nothing() {
        let mut assets = EntityContext::new(Namespace::Assets);
        let empty = assets.create().unwrap();
        let mut actors = actors();

        let err = actors.build(&assets, empty, &BuildArgs::new()).unwrap_err();
        assert!(matches!(err, BuildError::NoBuilder { .. }));
        assert_eq!(actors.allocated(), 0);

        let err = actors.build(&assets, OwnerId::new(9), &BuildArgs::new()).unwrap_err();
        assert!(matches!(err, BuildError::UnknownTemplate { .. }));
    }

    #[test]
    fn failed_build_discards_partial_actor() {
        let (assets, template) = assets_with_template();
        let mut actors = actors();

        let args = BuildArgs::new().with("health", 500.0);
        let err = actors.build(&assets, template, &args).unwrap_err();
        assert!(matches!(err, BuildError::Failed { .. }));

        let discarded = OwnerId::new(1);
        assert!(!actors.contains(discarded));
        assert!(actors.pool::<Position>().unwrap().is_empty());
        assert!(actors.pool::<Binding>().unwrap().is_empty());
    }

    #[test]
    fn builders_sharing_a_template_run_in_registration_order() {
        let (assets, template) = assets_with_template();
        let mut actors = EntityContext::new(Namespace::Actors);
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        for name in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            actors.register_builder(crate::ecs::FnBuilder::new(
                name,
                move |_: &mut EntityContext,
                      owner: OwnerId,
                      _: &HealthAspect,
                      _: &BuildArgs|
                      -> Result<(), BuildError> {
                    order.lock().push((name, owner));
                    Ok(())
                },
            ));
        }

        let owner = actors.build(&assets, template, &BuildArgs::new()).unwrap();
        assert_eq!(
            *order.lock(),
            vec![("first", owner), ("second", owner), ("third", owner)]
        );
        assert_eq!(actors.template_of(owner), Some(template));
    }

    #[test]
    fn hooks_attach_to_built_in_pools() {
        let (assets, template) = assets_with_template();
        let mut actors = actors();
        let bound = Arc::new(AtomicUsize::new(0));
        let unbound = Arc::new(AtomicUsize::new(0));
        let linked = Arc::new(AtomicUsize::new(0));
        let disposed = Arc::new(AtomicUsize::new(0));

        {
            let bindings = actors.pool_mut::<Binding>().unwrap();
            let counter = Arc::clone(&bound);
            bindings.add_on_added(move |_, _| {
                counter.fetch_add(1, Ordering::Relaxed);
            });
            let counter = Arc::clone(&unbound);
            bindings.add_on_removing(move |_, _| {
                counter.fetch_add(1, Ordering::Relaxed);
            });
        }
        {
            let nodes = actors.pool_mut::<HierarchyNode>().unwrap();
            let counter = Arc::clone(&linked);
            nodes.add_on_added(move |_, _| {
                counter.fetch_add(1, Ordering::Relaxed);
            });
            let counter = Arc::clone(&disposed);
            nodes.set_dispose(move |_, _| {
                counter.fetch_add(1, Ordering::Relaxed);
            });
        }

        let parent = actors.build(&assets, template, &BuildArgs::new()).unwrap();
        let child = actors.build(&assets, template, &BuildArgs::new()).unwrap();
        hierarchy::attach(&mut actors, child, parent).unwrap();
        assert_eq!(bound.load(Ordering::Relaxed), 2);
        assert_eq!(linked.load(Ordering::Relaxed), 2);

        actors.destroy(parent).unwrap();
        assert_eq!(unbound.load(Ordering::Relaxed), 1);
        assert_eq!(disposed.load(Ordering::Relaxed), 1);
        assert_eq!(hierarchy::parent_of(&actors, child), None);
    }

    #[test]
    fn job_reads_one_pool_and_fills_another() {
        let mut ctx = actors();
        let mut owners = Vec::new();
        for n in 0..64 {
            let owner = ctx.create().unwrap();
            ctx.set(owner, Position(Vec2::new(n as f32, 0.0))).unwrap();
            owners.push(owner);
        }
        let worker = ParallelWorker::new(4).unwrap();

        let (positions, health) = ctx.pool_pair_mut::<Position, Health>().unwrap();
        let positions = &*positions;
        let inserter = health.inserter(positions.len());
        worker
            .run_with(|wave: Wave| {
                for slot in wave.stride(positions.len()) {
                    let (owner, at) = (positions.owners()[slot], positions.values()[slot]);
                    inserter
                        .insert(owner, Health { current: at.0.x, max: 64.0 })
                        .unwrap();
                }
            })
            .unwrap();
        assert_eq!(inserter.commit().unwrap(), 64);

        for (n, owner) in owners.into_iter().enumerate() {
            assert_eq!(ctx.get::<Health>(owner).unwrap().current, n as f32);
        }
    }

    #[test]
    fn builders_are_keyed_by_template() {
        let mut ctx = actors();
        ctx.register_builder(crate::ecs::FnBuilder::new(
            "tag",
            |_: &mut EntityContext, _: OwnerId, _: &HealthAspect, _: &BuildArgs| Ok(()),
        ));
        assert_eq!(ctx.builder_count(), 3);
        assert_eq!(ctx.builders_for::<HealthAspect>(), 2);
    }
}
