// registry.rs - Runtime type registries
//
// Types are identified by small dense u32 ids, one id space per dispatch
// category, so ids can index plain vectors (pools, handler tables, queues).

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Dense per-category type id.
pub type TypeKey = u32;

/// The id space a registry serves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Component,
    Command,
    Query,
    Message,
    Notification,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Component => "component",
            Category::Command => "command",
            Category::Query => "query",
            Category::Message => "message",
            Category::Notification => "notification",
        };
        f.write_str(name)
    }
}

/// Metadata recorded the first time a type is seen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegisteredType {
    pub id: TypeKey,
    pub type_id: TypeId,
    pub name: &'static str,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("{category} type id {id} is not registered")]
    UnknownId { category: Category, id: TypeKey },
}

#[derive(Default)]
struct Entries {
    by_type: HashMap<TypeId, TypeKey>,
    types: Vec<RegisteredType>,
}

/// Assigns and memoizes a stable small id per Rust type.
pub struct TypeRegistry {
    category: Category,
    entries: RwLock<Entries>,
}

impl TypeRegistry {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            entries: RwLock::new(Entries::default()),
        }
    }

    #[inline]
    pub fn category(&self) -> Category {
        self.category
    }

    /// Id of `T`, assigning the next free id on first request.
    #[inline]
    pub fn id_of<T: ?Sized + 'static>(&self) -> TypeKey {
        self.id(TypeId::of::<T>(), type_name::<T>())
    }

    /// Non-generic form of [`TypeRegistry::id_of`].
    pub fn id(&self, type_id: TypeId, name: &'static str) -> TypeKey {
        if let Some(&id) = self.entries.read().by_type.get(&type_id) {
            return id;
        }

        let mut entries = self.entries.write();
        // Another thread may have registered the type between the two locks.
        if let Some(&id) = entries.by_type.get(&type_id) {
            return id;
        }

        let id = entries.types.len() as TypeKey;
        entries.types.push(RegisteredType { id, type_id, name });
        entries.by_type.insert(type_id, id);
        tracing::debug!(category = %self.category, id, name, "registered type");
        id
    }

    /// Id of `T` if it was already registered. Never assigns.
    pub fn lookup<T: ?Sized + 'static>(&self) -> Option<TypeKey> {
        self.entries.read().by_type.get(&TypeId::of::<T>()).copied()
    }

    /// Reverse lookup. Unknown ids are a programmer error.
    pub fn type_of(&self, id: TypeKey) -> Result<RegisteredType, RegistryError> {
        self.entries
            .read()
            .types
            .get(id as usize)
            .copied()
            .ok_or(RegistryError::UnknownId {
                category: self.category,
                id,
            })
    }

    pub fn name_of(&self, id: TypeKey) -> Result<&'static str, RegistryError> {
        self.type_of(id).map(|registered| registered.name)
    }

    pub fn len(&self) -> usize {
        self.entries.read().types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Component type ids (pool indices).
pub static COMPONENTS: Lazy<TypeRegistry> = Lazy::new(|| TypeRegistry::new(Category::Component));
/// Command payload ids.
pub static COMMANDS: Lazy<TypeRegistry> = Lazy::new(|| TypeRegistry::new(Category::Command));
/// Query payload ids.
pub static QUERIES: Lazy<TypeRegistry> = Lazy::new(|| TypeRegistry::new(Category::Query));
/// Message payload ids.
pub static MESSAGES: Lazy<TypeRegistry> = Lazy::new(|| TypeRegistry::new(Category::Message));
/// Notification payload ids.
pub static NOTIFICATIONS: Lazy<TypeRegistry> =
    Lazy::new(|| TypeRegistry::new(Category::Notification));
