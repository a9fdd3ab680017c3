//! Actor/asset component storage.
//!
//! Owners are plain ids; every component type lives in its own sparse/dense
//! pool inside an `EntityContext`. Actor contexts build new owners from
//! template assets through registered builders.

mod binding;
mod builder;
mod component;
mod context;
pub mod hierarchy;
mod inserter;
mod owner;
mod pool;

pub use binding::Binding;
pub use builder::{ArgValue, BuildArgs, BuildError, Builder, FnBuilder};
pub use component::{Component, ComponentId};
pub use context::{ContextError, EntityContext, Namespace, DEFAULT_POOL_CAPACITY};
pub use hierarchy::{HierarchyError, HierarchyNode};
pub use inserter::PoolInserter;
pub use owner::OwnerId;
pub use pool::{AnyPool, ComponentPool, PoolError, PoolOptions};
