//! Deferred message queues.
//!
//! Producers push from any thread; the owning group's update system drains
//! the queue on the driver thread. `try_enqueue` never blocks and hands the
//! message back when the queue lock is held elsewhere.

use super::payload::{HandlerFailure, Message, MessageHandler};
use super::DispatchError;
use crate::ecs::EntityContext;
use parking_lot::Mutex;
use std::any::type_name;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub struct MessageQueue<M: Message> {
    pending: Mutex<VecDeque<M>>,
    handler: Arc<dyn MessageHandler<M>>,
    handled: AtomicU64,
}

impl<M: Message> MessageQueue<M> {
    pub fn new(handler: impl MessageHandler<M>) -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
            handler: Arc::new(handler),
            handled: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn group(&self) -> &'static str {
        M::GROUP
    }

    pub fn enqueue(&self, message: M) {
        self.pending.lock().push_back(message);
        tracing::trace!(message = type_name::<M>(), "enqueued");
    }

    /// Non-blocking enqueue. Gives the message back if the lock is held.
    pub fn try_enqueue(&self, message: M) -> Result<(), M> {
        match self.pending.try_lock() {
            Some(mut pending) => {
                pending.push_back(message);
                Ok(())
            }
            None => Err(message),
        }
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Total messages handled over the queue's lifetime.
    pub fn handled(&self) -> u64 {
        self.handled.load(Ordering::Relaxed)
    }

    /// Handles, in FIFO order, the messages queued when the call started.
    /// Messages enqueued by handlers wait for the next call.
    pub fn execute(&self, actors: &mut EntityContext) -> Result<usize, DispatchError> {
        let batch = std::mem::take(&mut *self.pending.lock());
        let count = batch.len();

        let mut failures = Vec::new();
        for message in batch {
            if let Err(failure) = self.handler.handle(actors, message) {
                failures.push(failure);
            }
        }
        self.handled.fetch_add(count as u64, Ordering::Relaxed);
        if count > 0 {
            tracing::trace!(message = type_name::<M>(), count, "drained queue");
        }

        if failures.is_empty() {
            Ok(count)
        } else {
            Err(DispatchError::HandlerFailures { failures })
        }
    }
}

/// Type-erased queue view used by groups.
pub(crate) trait ErasedQueue: Send + Sync {
    fn payload(&self) -> &'static str;
    fn pending(&self) -> usize;
    fn handled(&self) -> u64;
    fn drain(&self, actors: &mut EntityContext) -> Result<usize, DispatchError>;
}

impl<M: Message> ErasedQueue for MessageQueue<M> {
    fn payload(&self) -> &'static str {
        type_name::<M>()
    }

    fn pending(&self) -> usize {
        self.len()
    }

    fn handled(&self) -> u64 {
        MessageQueue::handled(self)
    }

    fn drain(&self, actors: &mut EntityContext) -> Result<usize, DispatchError> {
        self.execute(actors)
    }
}

/// Every queue sharing one group name, in registration order.
pub struct MessageQueueGroup {
    name: &'static str,
    queues: Vec<Arc<dyn ErasedQueue>>,
}

impl MessageQueueGroup {
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            queues: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, queue: Arc<dyn ErasedQueue>) {
        self.queues.push(queue);
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Number of queues in the group.
    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    /// Payload type names in drain order.
    pub fn payloads(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.queues.iter().map(|queue| queue.payload())
    }

    /// Messages waiting across every queue.
    pub fn pending(&self) -> usize {
        self.queues.iter().map(|queue| queue.pending()).sum()
    }

    /// Messages handled across every queue over the group's lifetime.
    pub fn handled(&self) -> u64 {
        self.queues.iter().map(|queue| queue.handled()).sum()
    }

    /// Drains every queue; failures are collected across all of them.
    pub fn execute(&self, actors: &mut EntityContext) -> Result<usize, DispatchError> {
        let mut handled = 0;
        let mut failures: Vec<HandlerFailure> = Vec::new();
        for queue in &self.queues {
            match queue.drain(actors) {
                Ok(count) => handled += count,
                Err(DispatchError::HandlerFailures { failures: mut more }) => {
                    failures.append(&mut more);
                }
                Err(other) => return Err(other),
            }
        }

        if failures.is_empty() {
            Ok(handled)
        } else {
            Err(DispatchError::HandlerFailures { failures })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::payload::Outcome;
    use crate::ecs::Namespace;

    #[derive(Debug, PartialEq)]
    struct Ping(u32);
    impl Message for Ping {}

    fn recording_queue(log: Arc<Mutex<Vec<u32>>>) -> MessageQueue<Ping> {
        MessageQueue::new(move |_: &mut EntityContext, ping: Ping| -> Outcome {
            log.lock().push(ping.0);
            Ok(())
        })
    }

    #[test]
    fn execute_is_fifo() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let queue = recording_queue(Arc::clone(&log));
        let mut actors = EntityContext::new(Namespace::Actors);

        for n in 1..=3 {
            queue.enqueue(Ping(n));
        }
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.execute(&mut actors).unwrap(), 3);

        assert_eq!(*log.lock(), vec![1, 2, 3]);
        assert!(queue.is_empty());
        assert_eq!(queue.handled(), 3);
        assert_eq!(queue.group(), "Default");
    }

    #[test]
    fn try_enqueue_gives_message_back_under_contention() {
        let queue = recording_queue(Arc::new(Mutex::new(Vec::new())));
        queue.enqueue(Ping(1));

        let guard = queue.pending.lock();
        assert_eq!(queue.try_enqueue(Ping(2)), Err(Ping(2)));
        drop(guard);

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.try_enqueue(Ping(3)), Ok(()));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn failures_do_not_stop_the_drain() {
        let queue = MessageQueue::<Ping>::new(|_: &mut EntityContext, ping: Ping| -> Outcome {
            if ping.0 % 2 == 0 {
                Err(HandlerFailure::new(format!("even {}", ping.0)))
            } else {
                Ok(())
            }
        });
        let mut actors = EntityContext::new(Namespace::Actors);
        for n in 1..=4 {
            queue.enqueue(Ping(n));
        }

        let err = queue.execute(&mut actors).unwrap_err();
        match err {
            DispatchError::HandlerFailures { failures } => {
                let messages: Vec<_> = failures.iter().map(HandlerFailure::message).collect();
                assert_eq!(messages, vec!["even 2", "even 4"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(queue.is_empty());
    }
}
