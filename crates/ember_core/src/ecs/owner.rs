//! Owner ids
//!
//! Actors and assets are purely extensional: an owner id plus the pools in
//! which it holds a slot. Ids are assigned per context, start at 1 and are
//! never recycled.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Owner id (`0` is reserved as "none").
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct OwnerId(u32);

impl OwnerId {
    /// The reserved "no owner" id.
    pub const NONE: Self = Self(0);

    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Position in a sparse array.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
