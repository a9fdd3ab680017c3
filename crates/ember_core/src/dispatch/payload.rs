//! Payload and handler traits.
//!
//! Commands and queries have exactly one handler, notifications any number,
//! and each message type is consumed by exactly one queue handler.

use crate::ecs::EntityContext;
use thiserror::Error;

/// Group used by messages that do not name one.
pub const DEFAULT_GROUP: &str = "Default";

/// Mutating request with exactly one handler.
pub trait Command: Send + 'static {
    type Output: Send + 'static;
}

/// Read-only request with exactly one handler.
pub trait Query: Send + 'static {
    type Output: Send + 'static;
}

/// Broadcast fact delivered to every registered handler.
pub trait Notification: Send + Sync + 'static {}

/// Deferred payload, queued and drained by its group's update system.
pub trait Message: Send + 'static {
    const GROUP: &'static str = DEFAULT_GROUP;
}

/// Business failure reported by a handler.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HandlerFailure {
    message: String,
}

impl HandlerFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub type Outcome<T = ()> = Result<T, HandlerFailure>;

pub trait CommandHandler<C: Command>: Send + Sync + 'static {
    fn handle(&self, actors: &mut EntityContext, command: C) -> Outcome<C::Output>;
}

impl<C, F> CommandHandler<C> for F
where
    C: Command,
    F: Fn(&mut EntityContext, C) -> Outcome<C::Output> + Send + Sync + 'static,
{
    fn handle(&self, actors: &mut EntityContext, command: C) -> Outcome<C::Output> {
        self(actors, command)
    }
}

pub trait QueryHandler<Q: Query>: Send + Sync + 'static {
    fn handle(&self, actors: &EntityContext, query: Q) -> Outcome<Q::Output>;
}

impl<Q, F> QueryHandler<Q> for F
where
    Q: Query,
    F: Fn(&EntityContext, Q) -> Outcome<Q::Output> + Send + Sync + 'static,
{
    fn handle(&self, actors: &EntityContext, query: Q) -> Outcome<Q::Output> {
        self(actors, query)
    }
}

pub trait NotificationHandler<N: Notification>: Send + Sync + 'static {
    fn handle(&self, actors: &mut EntityContext, notification: &N) -> Outcome;
}

impl<N, F> NotificationHandler<N> for F
where
    N: Notification,
    F: Fn(&mut EntityContext, &N) -> Outcome + Send + Sync + 'static,
{
    fn handle(&self, actors: &mut EntityContext, notification: &N) -> Outcome {
        self(actors, notification)
    }
}

pub trait MessageHandler<M: Message>: Send + Sync + 'static {
    fn handle(&self, actors: &mut EntityContext, message: M) -> Outcome;
}

impl<M, F> MessageHandler<M> for F
where
    M: Message,
    F: Fn(&mut EntityContext, M) -> Outcome + Send + Sync + 'static,
{
    fn handle(&self, actors: &mut EntityContext, message: M) -> Outcome {
        self(actors, message)
    }
}
