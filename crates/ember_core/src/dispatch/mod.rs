//! Typed dispatch fabric.
//!
//! * commands: one handler, mutate actors, return an output
//! * queries: one handler, read actors
//! * notifications: zero or more handlers, run in registration order
//! * messages: queued, drained per group by an update system
//!
//! Routes resolve at composition time into pipelines that callers keep.

mod container;
mod message;
mod payload;
mod pipeline;

pub use container::{Dispatcher, HandlerContainer, TryEnqueueError};
pub use message::{MessageQueue, MessageQueueGroup};
pub use payload::{
    Command, CommandHandler, HandlerFailure, Message, MessageHandler, Notification,
    NotificationHandler, Outcome, Query, QueryHandler, DEFAULT_GROUP,
};
pub use pipeline::{CommandPipeline, NotificationPipeline, QueryPipeline};

use crate::registry::Category;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no {category} handler registered for {payload}")]
    Unregistered {
        category: Category,
        payload: &'static str,
    },
    #[error("{category} handler for {payload} is already registered")]
    DuplicateHandler {
        category: Category,
        payload: &'static str,
    },
    #[error("no message group named '{group}'")]
    UnknownGroup { group: String },
    #[error("{} handler(s) failed", .failures.len())]
    HandlerFailures { failures: Vec<HandlerFailure> },
    #[error(transparent)]
    Handler(#[from] HandlerFailure),
}
