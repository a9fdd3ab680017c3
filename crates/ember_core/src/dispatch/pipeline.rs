use super::payload::{
    Command, CommandHandler, Notification, NotificationHandler, Outcome, Query, QueryHandler,
};
use super::DispatchError;
use crate::ecs::EntityContext;
use std::any::type_name;
use std::sync::Arc;

/// Resolved route to a command's handler. Cheap to clone.
pub struct CommandPipeline<C: Command> {
    handler: Arc<dyn CommandHandler<C>>,
}

impl<C: Command> CommandPipeline<C> {
    pub(crate) fn new(handler: Arc<dyn CommandHandler<C>>) -> Self {
        Self { handler }
    }

    #[inline]
    pub fn send(&self, actors: &mut EntityContext, command: C) -> Outcome<C::Output> {
        tracing::trace!(command = type_name::<C>(), "send");
        self.handler.handle(actors, command)
    }
}

impl<C: Command> Clone for CommandPipeline<C> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
        }
    }
}

/// Resolved route to a query's handler. Cheap to clone.
pub struct QueryPipeline<Q: Query> {
    handler: Arc<dyn QueryHandler<Q>>,
}

impl<Q: Query> QueryPipeline<Q> {
    pub(crate) fn new(handler: Arc<dyn QueryHandler<Q>>) -> Self {
        Self { handler }
    }

    #[inline]
    pub fn ask(&self, actors: &EntityContext, query: Q) -> Outcome<Q::Output> {
        tracing::trace!(query = type_name::<Q>(), "ask");
        self.handler.handle(actors, query)
    }
}

impl<Q: Query> Clone for QueryPipeline<Q> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
        }
    }
}

/// Every handler of one notification type, in registration order.
pub enum NotificationPipeline<N: Notification> {
    Empty,
    Simple(Arc<dyn NotificationHandler<N>>),
    FanOut(Arc<[Arc<dyn NotificationHandler<N>>]>),
}

impl<N: Notification> NotificationPipeline<N> {
    pub(crate) fn with(self, handler: Arc<dyn NotificationHandler<N>>) -> Self {
        match self {
            NotificationPipeline::Empty => NotificationPipeline::Simple(handler),
            NotificationPipeline::Simple(first) => {
                NotificationPipeline::FanOut(Arc::from(vec![first, handler]))
            }
            NotificationPipeline::FanOut(existing) => {
                let mut handlers = existing.to_vec();
                handlers.push(handler);
                NotificationPipeline::FanOut(Arc::from(handlers))
            }
        }
    }

    pub fn handler_count(&self) -> usize {
        match self {
            NotificationPipeline::Empty => 0,
            NotificationPipeline::Simple(_) => 1,
            NotificationPipeline::FanOut(handlers) => handlers.len(),
        }
    }

    /// Runs every handler even when some fail. Returns the handler count, or
    /// `HandlerFailures` listing each failure in handler order.
    pub fn publish(&self, actors: &mut EntityContext, notification: &N) -> Result<usize, DispatchError> {
        tracing::trace!(
            notification = type_name::<N>(),
            handlers = self.handler_count(),
            "publish"
        );
        match self {
            NotificationPipeline::Empty => Ok(0),
            NotificationPipeline::Simple(handler) => handler
                .handle(actors, notification)
                .map(|()| 1)
                .map_err(|failure| DispatchError::HandlerFailures {
                    failures: vec![failure],
                }),
            NotificationPipeline::FanOut(handlers) => {
                let failures: Vec<_> = handlers
                    .iter()
                    .filter_map(|handler| handler.handle(actors, notification).err())
                    .collect();
                if failures.is_empty() {
                    Ok(handlers.len())
                } else {
                    Err(DispatchError::HandlerFailures { failures })
                }
            }
        }
    }
}

impl<N: Notification> Clone for NotificationPipeline<N> {
    fn clone(&self) -> Self {
        match self {
            NotificationPipeline::Empty => NotificationPipeline::Empty,
            NotificationPipeline::Simple(handler) => NotificationPipeline::Simple(Arc::clone(handler)),
            NotificationPipeline::FanOut(handlers) => NotificationPipeline::FanOut(Arc::clone(handlers)),
        }
    }
}
