use crate::dispatch::Dispatcher;
use crate::ecs::EntityContext;
use crate::parallel::ParallelWorker;
use crate::time::TickTime;
use crate::Error;

/// Borrowed view of the runtime handed to systems.
pub struct Frame<'a> {
    pub actors: &'a mut EntityContext,
    pub assets: &'a EntityContext,
    pub dispatch: &'a Dispatcher,
    pub worker: &'a ParallelWorker,
}

/// Unit of per-tick work. Systems run in registration order.
pub trait System: Send {
    fn name(&self) -> &str;

    fn update(&mut self, frame: &mut Frame<'_>, time: TickTime) -> Result<(), Error> {
        let _ = (frame, time);
        Ok(())
    }

    fn draw(&mut self, frame: &Frame<'_>, time: TickTime) -> Result<(), Error> {
        let _ = (frame, time);
        Ok(())
    }
}

/// Drains one message group on every update.
pub struct MessageGroupSystem {
    group: &'static str,
    name: String,
    handled: u64,
}

impl MessageGroupSystem {
    pub fn new(group: &'static str) -> Self {
        Self {
            group,
            name: format!("messages:{group}"),
            handled: 0,
        }
    }

    pub fn group(&self) -> &'static str {
        self.group
    }

    /// Messages handled since creation.
    pub fn handled(&self) -> u64 {
        self.handled
    }
}

impl System for MessageGroupSystem {
    fn name(&self) -> &str {
        &self.name
    }

    fn update(&mut self, frame: &mut Frame<'_>, time: TickTime) -> Result<(), Error> {
        let handled = frame.dispatch.execute_group(self.group, frame.actors)?;
        self.handled += handled as u64;
        if handled > 0 {
            tracing::trace!(group = self.group, handled, tick = time.tick, "message group drained");
        }
        Ok(())
    }
}
