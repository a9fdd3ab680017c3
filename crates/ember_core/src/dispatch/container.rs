// container.rs - Handler composition and the resulting dispatcher
//
// HandlerContainer collects registrations at startup; `build` freezes them
// into a Dispatcher whose tables are indexed by registry ids.

use super::message::{ErasedQueue, MessageQueue, MessageQueueGroup};
use super::payload::{
    Command, CommandHandler, Message, MessageHandler, Notification, NotificationHandler, Query,
    QueryHandler,
};
use super::pipeline::{CommandPipeline, NotificationPipeline, QueryPipeline};
use super::DispatchError;
use crate::ecs::EntityContext;
use crate::registry::{Category, TypeKey, COMMANDS, MESSAGES, NOTIFICATIONS, QUERIES};
use std::any::{type_name, Any};
use std::sync::Arc;

type Slot = Option<Box<dyn Any + Send + Sync>>;

/// Per-category handler storage indexed by registry id.
#[derive(Default)]
struct HandlerTable {
    slots: Vec<Slot>,
    occupied: usize,
}

impl HandlerTable {
    fn get<V: 'static>(&self, id: TypeKey) -> Option<&V> {
        self.slots
            .get(id as usize)
            .and_then(|slot| slot.as_deref())
            .and_then(|entry| entry.downcast_ref::<V>())
    }

    fn take<V: 'static>(&mut self, id: TypeKey) -> Option<V> {
        let entry = self.slots.get_mut(id as usize)?.take()?;
        self.occupied -= 1;
        entry.downcast::<V>().ok().map(|boxed| *boxed)
    }

    /// `false` when the slot is already taken.
    fn insert<V: Any + Send + Sync>(&mut self, id: TypeKey, value: V) -> bool {
        let index = id as usize;
        if self.slots.len() <= index {
            self.slots.resize_with(index + 1, || None);
        }
        if self.slots[index].is_some() {
            return false;
        }
        self.slots[index] = Some(Box::new(value));
        self.occupied += 1;
        true
    }

    fn len(&self) -> usize {
        self.occupied
    }
}

/// Non-blocking enqueue outcome.
#[derive(Debug)]
pub enum TryEnqueueError<M> {
    /// The queue lock was held; the message is handed back.
    Contended(M),
    Dispatch(DispatchError),
}

impl<M> TryEnqueueError<M> {
    pub fn into_message(self) -> Option<M> {
        match self {
            TryEnqueueError::Contended(message) => Some(message),
            TryEnqueueError::Dispatch(_) => None,
        }
    }
}

/// Collects handlers at composition time.
///
/// ```ignore
/// let mut container = HandlerContainer::new();
/// container.register_command(DamageHandler)?;
/// container.register_notification(|_: &mut EntityContext, e: &Spawned| -> Outcome { Ok(()) })?;
/// let dispatch = container.build();
/// ```
#[derive(Default)]
pub struct HandlerContainer {
    commands: HandlerTable,
    queries: HandlerTable,
    notifications: HandlerTable,
    messages: HandlerTable,
    groups: Vec<MessageQueueGroup>,
}

impl HandlerContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_command<C: Command>(
        &mut self,
        handler: impl CommandHandler<C>,
    ) -> Result<(), DispatchError> {
        let handler: Arc<dyn CommandHandler<C>> = Arc::new(handler);
        if !self.commands.insert(COMMANDS.id_of::<C>(), handler) {
            return Err(duplicate::<C>(Category::Command));
        }
        tracing::debug!(command = type_name::<C>(), "registered command handler");
        Ok(())
    }

    pub fn register_query<Q: Query>(
        &mut self,
        handler: impl QueryHandler<Q>,
    ) -> Result<(), DispatchError> {
        let handler: Arc<dyn QueryHandler<Q>> = Arc::new(handler);
        if !self.queries.insert(QUERIES.id_of::<Q>(), handler) {
            return Err(duplicate::<Q>(Category::Query));
        }
        tracing::debug!(query = type_name::<Q>(), "registered query handler");
        Ok(())
    }

    /// Appends a handler; handlers run in registration order.
    pub fn register_notification<N: Notification>(
        &mut self,
        handler: impl NotificationHandler<N>,
    ) -> Result<(), DispatchError> {
        let id = NOTIFICATIONS.id_of::<N>();
        let pipeline = self
            .notifications
            .take::<NotificationPipeline<N>>(id)
            .unwrap_or(NotificationPipeline::Empty)
            .with(Arc::new(handler));
        let handlers = pipeline.handler_count();
        self.notifications.insert(id, pipeline);
        tracing::debug!(
            notification = type_name::<N>(),
            handlers,
            "registered notification handler"
        );
        Ok(())
    }

    /// Creates the message type's queue and adds it to the `M::GROUP` group.
    pub fn register_message<M: Message>(
        &mut self,
        handler: impl MessageHandler<M>,
    ) -> Result<(), DispatchError> {
        let queue = Arc::new(MessageQueue::<M>::new(handler));
        if !self.messages.insert(MESSAGES.id_of::<M>(), Arc::clone(&queue)) {
            return Err(duplicate::<M>(Category::Message));
        }

        let erased: Arc<dyn ErasedQueue> = queue;
        match self.groups.iter_mut().find(|group| group.name() == M::GROUP) {
            Some(group) => group.push(erased),
            None => {
                let mut group = MessageQueueGroup::new(M::GROUP);
                group.push(erased);
                self.groups.push(group);
            }
        }
        tracing::debug!(message = type_name::<M>(), group = M::GROUP, "registered message queue");
        Ok(())
    }

    pub fn build(self) -> Dispatcher {
        tracing::info!(
            commands = self.commands.len(),
            queries = self.queries.len(),
            notifications = self.notifications.len(),
            messages = self.messages.len(),
            groups = self.groups.len(),
            "dispatcher composed"
        );
        Dispatcher {
            commands: self.commands,
            queries: self.queries,
            notifications: self.notifications,
            messages: self.messages,
            groups: self.groups,
        }
    }
}

fn duplicate<T>(category: Category) -> DispatchError {
    DispatchError::DuplicateHandler {
        category,
        payload: type_name::<T>(),
    }
}

fn unregistered<T>(category: Category) -> DispatchError {
    DispatchError::Unregistered {
        category,
        payload: type_name::<T>(),
    }
}

/// Frozen routing tables. Shared read-only after composition.
pub struct Dispatcher {
    commands: HandlerTable,
    queries: HandlerTable,
    notifications: HandlerTable,
    messages: HandlerTable,
    groups: Vec<MessageQueueGroup>,
}

impl Dispatcher {
    pub fn command<C: Command>(&self) -> Result<CommandPipeline<C>, DispatchError> {
        // lookup() keeps unknown payload types from being assigned ids here.
        COMMANDS
            .lookup::<C>()
            .and_then(|id| self.commands.get::<Arc<dyn CommandHandler<C>>>(id))
            .map(|handler| CommandPipeline::new(Arc::clone(handler)))
            .ok_or_else(|| unregistered::<C>(Category::Command))
    }

    pub fn query<Q: Query>(&self) -> Result<QueryPipeline<Q>, DispatchError> {
        QUERIES
            .lookup::<Q>()
            .and_then(|id| self.queries.get::<Arc<dyn QueryHandler<Q>>>(id))
            .map(|handler| QueryPipeline::new(Arc::clone(handler)))
            .ok_or_else(|| unregistered::<Q>(Category::Query))
    }

    /// Resolves and sends in one step.
    pub fn send<C: Command>(
        &self,
        actors: &mut EntityContext,
        command: C,
    ) -> Result<C::Output, DispatchError> {
        Ok(self.command::<C>()?.send(actors, command)?)
    }

    pub fn ask<Q: Query>(&self, actors: &EntityContext, query: Q) -> Result<Q::Output, DispatchError> {
        Ok(self.query::<Q>()?.ask(actors, query)?)
    }

    /// `Empty` when nobody subscribed.
    pub fn notifications<N: Notification>(&self) -> NotificationPipeline<N> {
        NOTIFICATIONS
            .lookup::<N>()
            .and_then(|id| self.notifications.get::<NotificationPipeline<N>>(id))
            .cloned()
            .unwrap_or(NotificationPipeline::Empty)
    }

    pub fn publish<N: Notification>(
        &self,
        actors: &mut EntityContext,
        notification: &N,
    ) -> Result<usize, DispatchError> {
        self.notifications::<N>().publish(actors, notification)
    }

    pub fn queue<M: Message>(&self) -> Result<Arc<MessageQueue<M>>, DispatchError> {
        MESSAGES
            .lookup::<M>()
            .and_then(|id| self.messages.get::<Arc<MessageQueue<M>>>(id))
            .cloned()
            .ok_or_else(|| unregistered::<M>(Category::Message))
    }

    pub fn enqueue<M: Message>(&self, message: M) -> Result<(), DispatchError> {
        self.queue::<M>()?.enqueue(message);
        Ok(())
    }

    pub fn try_enqueue<M: Message>(&self, message: M) -> Result<(), TryEnqueueError<M>> {
        let queue = self.queue::<M>().map_err(TryEnqueueError::Dispatch)?;
        queue.try_enqueue(message).map_err(TryEnqueueError::Contended)
    }

    pub fn group(&self, name: &str) -> Result<&MessageQueueGroup, DispatchError> {
        self.groups
            .iter()
            .find(|group| group.name() == name)
            .ok_or_else(|| DispatchError::UnknownGroup {
                group: name.to_owned(),
            })
    }

    /// Groups in first-registration order.
    pub fn groups(&self) -> impl Iterator<Item = &MessageQueueGroup> + '_ {
        self.groups.iter()
    }

    pub fn execute_group(&self, name: &str, actors: &mut EntityContext) -> Result<usize, DispatchError> {
        self.group(name)?.execute(actors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::define_component;
    use crate::dispatch::{HandlerFailure, Outcome, DEFAULT_GROUP};
    use crate::ecs::{Namespace, OwnerId, PoolOptions};
    use crate::parallel::{ParallelWorker, Wave};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Hp(i32);
    define_component!(Hp, "Hp");

    struct Damage {
        target: OwnerId,
        amount: i32,
    }
    impl Command for Damage {
        type Output = i32;
    }

    struct DamageHandler;
    impl CommandHandler<Damage> for DamageHandler {
        fn handle(&self, actors: &mut EntityContext, command: Damage) -> Outcome<i32> {
            let hp = actors
                .get_mut::<Hp>(command.target)
                .map_err(|err| HandlerFailure::new(err.to_string()))?;
            hp.0 -= command.amount;
            Ok(hp.0)
        }
    }

    struct TotalHp;
    impl Query for TotalHp {
        type Output = i32;
    }

    struct Unhandled;
    impl Command for Unhandled {
        type Output = ();
    }

    struct Tick;
    impl Notification for Tick {}

    struct Orphaned;
    impl Notification for Orphaned {}

    struct Heal(OwnerId);
    impl Message for Heal {
        const GROUP: &'static str = "Combat";
    }
    struct Shield(OwnerId);
    impl Message for Shield {
        const GROUP: &'static str = "Combat";
    }
    struct Tally(u32);
    impl Message for Tally {}

    fn actors_with(hp: i32) -> (EntityContext, OwnerId) {
        let mut actors = EntityContext::new(Namespace::Actors);
        actors.register_pool(PoolOptions::<Hp>::new()).unwrap();
        let owner = actors.create().unwrap();
        actors.set(owner, Hp(hp)).unwrap();
        (actors, owner)
    }

    #[test]
    fn command_and_query_route_to_single_handler() {
        let mut container = HandlerContainer::new();
        container.register_command(DamageHandler).unwrap();
        container
            .register_query::<TotalHp>(|actors: &EntityContext, _: TotalHp| -> Outcome<i32> {
                Ok(actors.pool::<Hp>().map_or(0, |pool| pool.values().iter().map(|hp| hp.0).sum()))
            })
            .unwrap();
        let dispatch = container.build();
        let (mut actors, owner) = actors_with(10);

        let pipeline = dispatch.command::<Damage>().unwrap();
        assert_eq!(pipeline.send(&mut actors, Damage { target: owner, amount: 3 }), Ok(7));
        assert_eq!(dispatch.send(&mut actors, Damage { target: owner, amount: 2 }).unwrap(), 5);
        assert_eq!(dispatch.ask(&actors, TotalHp).unwrap(), 5);
    }

    #[test]
    fn handler_failure_surfaces_from_send() {
        let mut container = HandlerContainer::new();
        container.register_command(DamageHandler).unwrap();
        let dispatch = container.build();
        let (mut actors, _) = actors_with(1);

        let err = dispatch
            .send(&mut actors, Damage { target: OwnerId::new(42), amount: 1 })
            .unwrap_err();
        assert!(matches!(err, DispatchError::Handler(_)));
    }

    #[test]
    fn duplicate_and_missing_handlers_fail_at_composition() {
        let mut container = HandlerContainer::new();
        container.register_command(DamageHandler).unwrap();
        assert!(matches!(
            container.register_command(DamageHandler).unwrap_err(),
            DispatchError::DuplicateHandler { category: Category::Command, .. }
        ));

        let dispatch = container.build();
        assert!(matches!(
            dispatch.command::<Unhandled>(),
            Err(DispatchError::Unregistered { category: Category::Command, .. })
        ));
        assert!(dispatch.query::<TotalHp>().is_err());
    }

    #[test]
    fn notifications_fan_out_in_order_without_short_circuit() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut container = HandlerContainer::new();
        for name in ["H1", "H2", "H3"] {
            let calls = Arc::clone(&calls);
            container
                .register_notification::<Tick>(move |_: &mut EntityContext, _: &Tick| -> Outcome {
                    calls.lock().push(name);
                    if name == "H2" {
                        Err(HandlerFailure::new("H2 refused"))
                    } else {
                        Ok(())
                    }
                })
                .unwrap();
        }
        let dispatch = container.build();
        let mut actors = EntityContext::new(Namespace::Actors);

        let pipeline = dispatch.notifications::<Tick>();
        assert!(matches!(pipeline, NotificationPipeline::FanOut(_)));
        let err = dispatch.publish(&mut actors, &Tick).unwrap_err();

        assert_eq!(*calls.lock(), vec!["H1", "H2", "H3"]);
        match err {
            DispatchError::HandlerFailures { failures } => {
                assert_eq!(failures, vec![HandlerFailure::new("H2 refused")]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn notification_pipeline_shapes() {
        let mut container = HandlerContainer::new();
        container
            .register_notification::<Tick>(|_: &mut EntityContext, _: &Tick| -> Outcome { Ok(()) })
            .unwrap();
        let dispatch = container.build();
        let mut actors = EntityContext::new(Namespace::Actors);

        assert!(matches!(dispatch.notifications::<Tick>(), NotificationPipeline::Simple(_)));
        assert!(matches!(dispatch.notifications::<Orphaned>(), NotificationPipeline::Empty));
        assert_eq!(dispatch.publish(&mut actors, &Orphaned).unwrap(), 0);
        assert_eq!(dispatch.publish(&mut actors, &Tick).unwrap(), 1);
    }

    #[test]
    fn message_group_drains_every_queue() {
        let mut container = HandlerContainer::new();
        container
            .register_message::<Heal>(|actors: &mut EntityContext, heal: Heal| -> Outcome {
                actors.get_mut::<Hp>(heal.0).map(|hp| hp.0 += 5).map_err(|e| HandlerFailure::new(e.to_string()))
            })
            .unwrap();
        container
            .register_message::<Shield>(|actors: &mut EntityContext, shield: Shield| -> Outcome {
                actors.get_mut::<Hp>(shield.0).map(|hp| hp.0 *= 2).map_err(|e| HandlerFailure::new(e.to_string()))
            })
            .unwrap();
        assert!(matches!(
            container
                .register_message::<Heal>(|_: &mut EntityContext, _: Heal| -> Outcome { Ok(()) })
                .unwrap_err(),
            DispatchError::DuplicateHandler { category: Category::Message, .. }
        ));
        let dispatch = container.build();
        let (mut actors, owner) = actors_with(1);

        dispatch.enqueue(Heal(owner)).unwrap();
        dispatch.try_enqueue(Shield(owner)).ok().unwrap();
        let group = dispatch.group("Combat").unwrap();
        assert_eq!(group.len(), 2);
        assert_eq!(group.pending(), 2);

        assert_eq!(dispatch.execute_group("Combat", &mut actors).unwrap(), 2);
        assert_eq!(actors.get::<Hp>(owner).unwrap(), &Hp(12));
        assert!(matches!(
            dispatch.execute_group("Ui", &mut actors).unwrap_err(),
            DispatchError::UnknownGroup { .. }
        ));
    }

    #[test]
    fn worker_waves_enqueue_for_the_next_drain() {
        let sum = Arc::new(AtomicU64::new(0));
        let mut container = HandlerContainer::new();
        let total = Arc::clone(&sum);
        container
            .register_message::<Tally>(move |_: &mut EntityContext, tally: Tally| -> Outcome {
                total.fetch_add(u64::from(tally.0), Ordering::Relaxed);
                Ok(())
            })
            .unwrap();
        let dispatch = container.build();
        let mut actors = EntityContext::new(Namespace::Actors);
        let worker = ParallelWorker::new(4).unwrap();

        for _ in 0..50 {
            worker
                .run_with(|wave: Wave| {
                    for _ in 0..100 {
                        dispatch.enqueue(Tally(wave.index() as u32 + 1)).unwrap();
                    }
                })
                .unwrap();
        }
        assert_eq!(dispatch.group(DEFAULT_GROUP).unwrap().pending(), 20_000);

        assert_eq!(dispatch.execute_group(DEFAULT_GROUP, &mut actors).unwrap(), 20_000);
        assert_eq!(dispatch.group(DEFAULT_GROUP).unwrap().handled(), 20_000);
        assert_eq!(dispatch.group(DEFAULT_GROUP).unwrap().pending(), 0);
        // Each of 4 waves adds its 1-based index 100 times per run.
        assert_eq!(sum.load(Ordering::Relaxed), 50 * 100 * (1 + 2 + 3 + 4));
    }
}
