use super::{System, SystemError, SystemHandle};
use std::collections::HashMap;

/// Ordered set of uniquely named systems.
#[derive(Default)]
pub struct SystemRegistry {
    systems: Vec<RegisteredSystem>,
    name_lookup: HashMap<String, SystemHandle>,
}

struct RegisteredSystem {
    handle: SystemHandle,
    name: String,
    system: Box<dyn System>,
}

impl SystemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, system: Box<dyn System>) -> Result<SystemHandle, SystemError> {
        let name = system.name().to_owned();
        if self.name_lookup.contains_key(&name) {
            return Err(SystemError::DuplicateName { name });
        }

        let handle = SystemHandle::new(self.systems.len() as u32);
        tracing::debug!(system = %name, %handle, "registered system");
        self.name_lookup.insert(name.clone(), handle);
        self.systems.push(RegisteredSystem {
            handle,
            name,
            system,
        });
        Ok(handle)
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    pub fn handle_of(&self, name: &str) -> Option<SystemHandle> {
        self.name_lookup.get(name).copied()
    }

    pub fn name_of(&self, handle: SystemHandle) -> Option<&str> {
        self.systems
            .get(handle.index() as usize)
            .map(|system| system.name.as_str())
    }

    /// Names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.systems.iter().map(|system| system.name.as_str())
    }

    pub(crate) fn entries_mut(
        &mut self,
    ) -> impl Iterator<Item = (SystemHandle, &str, &mut (dyn System + 'static))> + '_ {
        self.systems
            .iter_mut()
            .map(|entry| (entry.handle, entry.name.as_str(), entry.system.as_mut()))
    }
}
