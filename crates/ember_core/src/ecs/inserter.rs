//! Concurrent insertion into a component pool.
//!
//! `insert` takes `&self`, so one inserter can be captured by every wave of a
//! parallel job. Each insert claims the next dense slot from an atomic cursor
//! and parks the value in that slot's own cell; `commit` moves the values into
//! the pool in slot order once the job has returned. Capacity is reserved up
//! front by `ComponentPool::inserter`, nothing grows while workers insert.

use super::component::Component;
use super::owner::OwnerId;
use super::pool::{ComponentPool, PoolError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

#[must_use = "staged values are dropped unless the inserter is committed"]
pub struct PoolInserter<'a, T: Component> {
    pool: &'a mut ComponentPool<T>,
    base: usize,
    cursor: AtomicUsize,
    staged: Box<[Mutex<Option<(OwnerId, T)>>]>,
}

impl<'a, T: Component> PoolInserter<'a, T> {
    pub(crate) fn new(pool: &'a mut ComponentPool<T>, slots: usize) -> Self {
        let base = pool.len();
        Self {
            pool,
            base,
            cursor: AtomicUsize::new(0),
            staged: (0..slots).map(|_| Mutex::new(None)).collect(),
        }
    }

    /// Slots reserved for this inserter.
    pub fn reserved(&self) -> usize {
        self.staged.len()
    }

    /// Values staged so far.
    pub fn len(&self) -> usize {
        self.cursor.load(Ordering::Acquire).min(self.staged.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stages `value` for `owner` and returns the 1-based slot it will occupy.
    ///
    /// Owners already in the pool are rejected here. Two inserts for the same
    /// owner inside one wave are only caught by `commit`.
    pub fn insert(&self, owner: OwnerId, value: T) -> Result<usize, PoolError> {
        if owner.is_none() {
            return Err(PoolError::InvalidOwner { component: T::NAME });
        }
        if self.pool.has(owner) {
            return Err(PoolError::AlreadyExists {
                component: T::NAME,
                owner,
            });
        }

        let claim = self.cursor.fetch_add(1, Ordering::AcqRel);
        let cell = self.staged.get(claim).ok_or(PoolError::CapacityExceeded {
            component: T::NAME,
            reserved: self.staged.len(),
        })?;
        *cell.lock() = Some((owner, value));
        Ok(self.base + claim + 1)
    }

    /// Moves every staged value into the pool in slot order, firing the
    /// pool's `on_added` hooks. Returns the number committed.
    ///
    /// A duplicate owner is dropped and reported after the rest are applied;
    /// later values then move down one slot.
    pub fn commit(self) -> Result<usize, PoolError> {
        let PoolInserter { pool, staged, .. } = self;
        let mut committed = 0;
        let mut rejected = None;
        for cell in staged.into_vec() {
            let Some((owner, value)) = cell.into_inner() else {
                continue;
            };
            match pool.set(owner, value) {
                Ok(_) => committed += 1,
                Err(err) => {
                    rejected.get_or_insert(err);
                }
            }
        }
        tracing::trace!(component = T::NAME, committed, "committed staged inserts");

        match rejected {
            Some(err) => Err(err),
            None => Ok(committed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::define_component;
    use crate::parallel::{ParallelWorker, Wave};
    use std::sync::atomic::AtomicU32;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Spark(u32);
    define_component!(Spark, "Spark");

    #[test]
    fn slots_follow_the_cursor() {
        let mut pool = ComponentPool::<Spark>::new();
        pool.set(OwnerId::new(1), Spark(1)).unwrap();

        let inserter = pool.inserter(2);
        assert_eq!(inserter.insert(OwnerId::new(5), Spark(5)).unwrap(), 2);
        assert_eq!(inserter.insert(OwnerId::new(3), Spark(3)).unwrap(), 3);
        assert!(matches!(
            inserter.insert(OwnerId::new(4), Spark(4)),
            Err(PoolError::CapacityExceeded { reserved: 2, .. })
        ));
        assert!(matches!(
            inserter.insert(OwnerId::new(1), Spark(9)),
            Err(PoolError::AlreadyExists { .. })
        ));
        assert_eq!(inserter.len(), 2);
        assert_eq!(inserter.commit().unwrap(), 2);

        assert_eq!(pool.slot(OwnerId::new(5)), Some(2));
        assert_eq!(pool.slot(OwnerId::new(3)), Some(3));
        assert!(!pool.has(OwnerId::new(4)));
    }

    #[test]
    fn duplicate_staged_owner_is_reported_on_commit() {
        let mut pool = ComponentPool::<Spark>::new();
        let inserter = pool.inserter(3);
        inserter.insert(OwnerId::new(2), Spark(1)).unwrap();
        inserter.insert(OwnerId::new(2), Spark(2)).unwrap();
        inserter.insert(OwnerId::new(7), Spark(7)).unwrap();

        assert!(matches!(
            inserter.commit(),
            Err(PoolError::AlreadyExists { .. })
        ));
        assert_eq!(pool.get(OwnerId::new(2)).unwrap(), &Spark(1));
        assert_eq!(pool.get(OwnerId::new(7)).unwrap(), &Spark(7));
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn workers_insert_concurrently() {
        let worker = ParallelWorker::new(4).unwrap();
        let mut pool = ComponentPool::<Spark>::new();
        let added = AtomicU32::new(0);

        let inserter = pool.inserter(400);
        worker
            .run_with(|wave: Wave| {
                for n in 0..100u32 {
                    let raw = 1 + wave.index() as u32 * 100 + n;
                    inserter.insert(OwnerId::new(raw), Spark(raw)).unwrap();
                    added.fetch_add(1, Ordering::Relaxed);
                }
            })
            .unwrap();
        assert_eq!(inserter.commit().unwrap(), 400);

        assert_eq!(added.load(Ordering::Relaxed), 400);
        assert_eq!(pool.len(), 400);
        for raw in 1..=400 {
            assert_eq!(pool.get(OwnerId::new(raw)).unwrap(), &Spark(raw));
        }
    }
}
