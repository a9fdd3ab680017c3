//! Ember core
//!
//! The building blocks of an ember runtime:
//! - per-type registries and component pools keyed by owner id
//! - actor and asset contexts with template builders and hierarchy
//! - a barrier-synchronized parallel worker
//! - typed command/query/notification/message dispatch
//! - systems and the fixed-step tick loop

pub mod app;
pub mod convert;
pub mod dispatch;
pub mod ecs;
pub mod error;
pub mod parallel;
pub mod registry;
pub mod time;

pub use error::{Error, Result};
pub use glam;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
