//! Sparse/dense component storage
//!
//! One pool per component type. `sparse` maps an owner id to a 1-based slot
//! (0 = no component), `dense` keeps live values packed, and `owners` is the
//! reverse map used for iteration and for fixing the sparse entry of the value
//! moved by a swap-remove.

use super::component::{Component, ComponentId};
use super::inserter::PoolInserter;
use super::owner::OwnerId;
use crate::convert::{ComponentConverter, ConvertError};
use std::any::Any;
use std::io::{Read, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("{component} already exists for owner {owner}")]
    AlreadyExists {
        component: &'static str,
        owner: OwnerId,
    },
    #[error("{component} not found for owner {owner}")]
    NotFound {
        component: &'static str,
        owner: OwnerId,
    },
    #[error("owner id 0 is reserved and cannot hold {component}")]
    InvalidOwner { component: &'static str },
    #[error("slot {slot} is out of range for {component} (len {len})")]
    SlotOutOfRange {
        component: &'static str,
        slot: usize,
        len: usize,
    },
    #[error("{component} inserter is full ({reserved} slots reserved)")]
    CapacityExceeded {
        component: &'static str,
        reserved: usize,
    },
    #[error("{component} has no converter installed")]
    NoConverter { component: &'static str },
    #[error("failed to convert {component} for owner {owner}: {source}")]
    Convert {
        component: &'static str,
        owner: OwnerId,
        #[source]
        source: ConvertError,
    },
}

type OwnerHook<T> = Box<dyn Fn(OwnerId, &T) + Send + Sync>;
type UpdateHook<T> = Box<dyn Fn(OwnerId, &T, &T) + Send + Sync>;
type DisposeHook<T> = Box<dyn Fn(OwnerId, &mut T) + Send + Sync>;

struct Hooks<T> {
    added: Vec<OwnerHook<T>>,
    removing: Vec<OwnerHook<T>>,
    updating: Vec<UpdateHook<T>>,
    dispose: Option<DisposeHook<T>>,
}

impl<T> Default for Hooks<T> {
    fn default() -> Self {
        Self {
            added: Vec::new(),
            removing: Vec::new(),
            updating: Vec::new(),
            dispose: None,
        }
    }
}

/// Construction options for a pool, consumed by `EntityContext::register_pool`.
///
/// ```ignore
/// actors.register_pool(
///     PoolOptions::<Health>::new()
///         .capacity(4096)
///         .converter(JsonConverter::new())
///         .on_removing(|owner, hp| tracing::debug!(%owner, hp = hp.current, "health removed")),
/// )?;
/// ```
pub struct PoolOptions<T> {
    pub(crate) capacity: Option<usize>,
    converter: Option<Box<dyn ComponentConverter<T>>>,
    hooks: Hooks<T>,
}

impl<T: Component> PoolOptions<T> {
    pub fn new() -> Self {
        Self {
            capacity: None,
            converter: None,
            hooks: Hooks::default(),
        }
    }

    /// Initial owner capacity. Defaults to the context's default capacity.
    pub fn capacity(mut self, owners: usize) -> Self {
        self.capacity = Some(owners);
        self
    }

    pub fn converter(mut self, converter: impl ComponentConverter<T> + 'static) -> Self {
        self.converter = Some(Box::new(converter));
        self
    }

    /// Called with the value right before it leaves the pool.
    pub fn dispose(mut self, hook: impl Fn(OwnerId, &mut T) + Send + Sync + 'static) -> Self {
        self.hooks.dispose = Some(Box::new(hook));
        self
    }

    pub fn on_added(mut self, hook: impl Fn(OwnerId, &T) + Send + Sync + 'static) -> Self {
        self.hooks.added.push(Box::new(hook));
        self
    }

    pub fn on_removing(mut self, hook: impl Fn(OwnerId, &T) + Send + Sync + 'static) -> Self {
        self.hooks.removing.push(Box::new(hook));
        self
    }

    /// Receives `(owner, current, incoming)`.
    pub fn on_updating(mut self, hook: impl Fn(OwnerId, &T, &T) + Send + Sync + 'static) -> Self {
        self.hooks.updating.push(Box::new(hook));
        self
    }
}

impl<T: Component> Default for PoolOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Storage for every `T` in one entity context.
pub struct ComponentPool<T> {
    dense: Vec<T>,
    owners: Vec<OwnerId>,
    sparse: Vec<u32>,
    hooks: Hooks<T>,
    converter: Option<Box<dyn ComponentConverter<T>>>,
}

impl<T: Component> ComponentPool<T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Pre-sizes the sparse map for `owners` ids.
    pub fn with_capacity(owners: usize) -> Self {
        Self::from_options(PoolOptions::new().capacity(owners))
    }

    pub fn from_options(options: PoolOptions<T>) -> Self {
        let PoolOptions {
            capacity,
            converter,
            hooks,
        } = options;
        let mut pool = Self {
            dense: Vec::new(),
            owners: Vec::new(),
            sparse: Vec::new(),
            hooks,
            converter,
        };
        if let Some(owners) = capacity {
            pool.reserve(owners, 0);
        }
        pool
    }

    #[inline]
    pub fn component_id(&self) -> ComponentId {
        T::id()
    }

    /// Grows the owner map to at least `owners` ids and the dense storage to at
    /// least `slots` values. Never shrinks.
    pub fn reserve(&mut self, owners: usize, slots: usize) {
        if owners > self.sparse.len() {
            self.sparse.resize(owners, 0);
        }
        if slots > self.dense.len() {
            let additional = slots - self.dense.len();
            self.dense.reserve(additional);
            self.owners.reserve(additional);
        }
    }

    /// Number of owner ids the sparse map covers without growing.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.sparse.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    #[inline]
    fn slot_of(&self, owner: OwnerId) -> Option<usize> {
        match self.sparse.get(owner.index()) {
            Some(&slot) if slot != 0 => Some(slot as usize),
            _ => None,
        }
    }

    #[inline]
    fn not_found(owner: OwnerId) -> PoolError {
        PoolError::NotFound {
            component: T::NAME,
            owner,
        }
    }

    #[inline]
    pub fn has(&self, owner: OwnerId) -> bool {
        self.slot_of(owner).is_some()
    }

    /// 1-based slot of the owner's value.
    pub fn slot(&self, owner: OwnerId) -> Option<usize> {
        self.slot_of(owner)
    }

    pub fn set(&mut self, owner: OwnerId, value: T) -> Result<&mut T, PoolError> {
        if owner.is_none() {
            return Err(PoolError::InvalidOwner { component: T::NAME });
        }
        if self.has(owner) {
            return Err(PoolError::AlreadyExists {
                component: T::NAME,
                owner,
            });
        }

        let index = owner.index();
        if index >= self.sparse.len() {
            let grown = (index + 1).next_power_of_two();
            self.sparse.resize(grown, 0);
        }

        self.dense.push(value);
        self.owners.push(owner);
        let slot = self.dense.len();
        self.sparse[index] = slot as u32;

        let value = &self.dense[slot - 1];
        for hook in &self.hooks.added {
            hook(owner, value);
        }
        Ok(&mut self.dense[slot - 1])
    }

    pub fn get(&self, owner: OwnerId) -> Result<&T, PoolError> {
        self.try_get(owner).ok_or_else(|| Self::not_found(owner))
    }

    pub fn get_mut(&mut self, owner: OwnerId) -> Result<&mut T, PoolError> {
        self.try_get_mut(owner).ok_or_else(|| Self::not_found(owner))
    }

    #[inline]
    pub fn try_get(&self, owner: OwnerId) -> Option<&T> {
        self.slot_of(owner).map(|slot| &self.dense[slot - 1])
    }

    #[inline]
    pub fn try_get_mut(&mut self, owner: OwnerId) -> Option<&mut T> {
        self.slot_of(owner).map(|slot| &mut self.dense[slot - 1])
    }

    fn slot_error(&self, slot: usize) -> PoolError {
        PoolError::SlotOutOfRange {
            component: T::NAME,
            slot,
            len: self.dense.len(),
        }
    }

    /// Value at a 1-based slot.
    pub fn get_by_index(&self, slot: usize) -> Result<&T, PoolError> {
        slot.checked_sub(1)
            .and_then(|i| self.dense.get(i))
            .ok_or_else(|| self.slot_error(slot))
    }

    pub fn get_by_index_mut(&mut self, slot: usize) -> Result<&mut T, PoolError> {
        let err = self.slot_error(slot);
        slot.checked_sub(1)
            .and_then(|i| self.dense.get_mut(i))
            .ok_or(err)
    }

    pub fn owner_at(&self, slot: usize) -> Option<OwnerId> {
        slot.checked_sub(1).and_then(|i| self.owners.get(i)).copied()
    }

    /// Value in slot 1, if any.
    pub fn first(&self) -> Option<(OwnerId, &T)> {
        self.owners.first().copied().zip(self.dense.first())
    }

    /// Replaces the owner's value and returns the previous one.
    pub fn update(&mut self, owner: OwnerId, value: T) -> Result<T, PoolError> {
        let slot = self.slot_of(owner).ok_or_else(|| Self::not_found(owner))?;
        let current = &self.dense[slot - 1];
        for hook in &self.hooks.updating {
            hook(owner, current, &value);
        }
        Ok(std::mem::replace(&mut self.dense[slot - 1], value))
    }

    /// Removes the owner's value; the last slot moves into the hole.
    pub fn remove(&mut self, owner: OwnerId) -> Result<T, PoolError> {
        let slot = self.slot_of(owner).ok_or_else(|| Self::not_found(owner))?;
        let pos = slot - 1;

        for hook in &self.hooks.removing {
            hook(owner, &self.dense[pos]);
        }
        if let Some(dispose) = &self.hooks.dispose {
            dispose(owner, &mut self.dense[pos]);
        }

        let value = self.dense.swap_remove(pos);
        self.owners.swap_remove(pos);
        self.sparse[owner.index()] = 0;
        if let Some(&moved) = self.owners.get(pos) {
            self.sparse[moved.index()] = slot as u32;
        }
        Ok(value)
    }

    /// Removes every value, firing removing and dispose hooks in slot order.
    pub fn clear(&mut self) {
        for pos in 0..self.dense.len() {
            let owner = self.owners[pos];
            for hook in &self.hooks.removing {
                hook(owner, &self.dense[pos]);
            }
            if let Some(dispose) = &self.hooks.dispose {
                dispose(owner, &mut self.dense[pos]);
            }
            self.sparse[owner.index()] = 0;
        }
        self.dense.clear();
        self.owners.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (OwnerId, &T)> + '_ {
        self.owners.iter().copied().zip(self.dense.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (OwnerId, &mut T)> + '_ {
        self.owners.iter().copied().zip(self.dense.iter_mut())
    }

    /// Packed values in slot order.
    #[inline]
    pub fn values(&self) -> &[T] {
        &self.dense
    }

    #[inline]
    pub fn values_mut(&mut self) -> &mut [T] {
        &mut self.dense
    }

    /// Owners in slot order, parallel to `values()`.
    #[inline]
    pub fn owners(&self) -> &[OwnerId] {
        &self.owners
    }

    /// Hooks can also be attached after construction, e.g. to the pools an
    /// actor context creates on its own.
    pub fn add_on_added(&mut self, hook: impl Fn(OwnerId, &T) + Send + Sync + 'static) {
        self.hooks.added.push(Box::new(hook));
    }

    pub fn add_on_removing(&mut self, hook: impl Fn(OwnerId, &T) + Send + Sync + 'static) {
        self.hooks.removing.push(Box::new(hook));
    }

    pub fn add_on_updating(&mut self, hook: impl Fn(OwnerId, &T, &T) + Send + Sync + 'static) {
        self.hooks.updating.push(Box::new(hook));
    }

    /// Replaces any previous dispose hook.
    pub fn set_dispose(&mut self, hook: impl Fn(OwnerId, &mut T) + Send + Sync + 'static) {
        self.hooks.dispose = Some(Box::new(hook));
    }

    /// Reserves `slots` more dense slots and returns an inserter that can be
    /// shared across the waves of a parallel job.
    pub fn inserter(&mut self, slots: usize) -> PoolInserter<'_, T> {
        let owners = self.sparse.len();
        self.reserve(owners, self.dense.len() + slots);
        PoolInserter::new(self, slots)
    }

    pub fn set_converter(&mut self, converter: impl ComponentConverter<T> + 'static) {
        self.converter = Some(Box::new(converter));
    }

    pub fn has_converter(&self) -> bool {
        self.converter.is_some()
    }

    fn converter(&self) -> Result<&dyn ComponentConverter<T>, PoolError> {
        self.converter
            .as_deref()
            .ok_or(PoolError::NoConverter { component: T::NAME })
    }

    /// Serializes the owner's value through the installed converter.
    pub fn write_component(&self, owner: OwnerId, writer: &mut dyn Write) -> Result<(), PoolError> {
        let converter = self.converter()?;
        let value = self.get(owner)?;
        converter
            .serialize(writer, value)
            .map_err(|source| PoolError::Convert {
                component: T::NAME,
                owner,
                source,
            })
    }

    /// Deserializes a value and adds it for `owner`.
    pub fn read_component(
        &mut self,
        owner: OwnerId,
        reader: &mut dyn Read,
    ) -> Result<&mut T, PoolError> {
        let value = self
            .converter()?
            .deserialize(reader)
            .map_err(|source| PoolError::Convert {
                component: T::NAME,
                owner,
                source,
            })?;
        self.set(owner, value)
    }
}

impl<T: Component> Default for ComponentPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Type-erased pool view used by `EntityContext`.
pub trait AnyPool: Send + Sync {
    fn component_id(&self) -> ComponentId;
    fn component_name(&self) -> &'static str;
    fn len(&self) -> usize;
    fn has_owner(&self, owner: OwnerId) -> bool;
    fn remove_owner(&mut self, owner: OwnerId) -> Result<(), PoolError>;
    fn write_owner(&self, owner: OwnerId, writer: &mut dyn Write) -> Result<(), PoolError>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> AnyPool for ComponentPool<T> {
    fn component_id(&self) -> ComponentId {
        T::id()
    }

    fn component_name(&self) -> &'static str {
        T::NAME
    }

    fn len(&self) -> usize {
        self.dense.len()
    }

    fn has_owner(&self, owner: OwnerId) -> bool {
        self.has(owner)
    }

    fn remove_owner(&mut self, owner: OwnerId) -> Result<(), PoolError> {
        self.remove(owner).map(drop)
    }

    fn write_owner(&self, owner: OwnerId, writer: &mut dyn Write) -> Result<(), PoolError> {
        self.write_component(owner, writer)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
