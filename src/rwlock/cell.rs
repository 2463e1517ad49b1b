//! [`RwCell`] glues a value to an [`RwLock`], so nobody has to pair enter/exit calls by hand.
//!
//! Guards release on drop. They're `!Send`, as the write lock belongs to the thread that took it
//! and `exit_write` from another thread is a bug.

use std::{
    cell::UnsafeCell,
    fmt,
    marker::PhantomData,
    ops::{Deref, DerefMut},
};

use crate::{
    critical_section::{CriticalSection, SpinSection},
    error::LockError,
};

use super::RwLock;

pub struct RwCell<Y, C: CriticalSection = SpinSection> {
    lock: RwLock<C>,
    value: UnsafeCell<Y>,
}

/// readers share &Y between threads => Y has to be Sync on top of Send
unsafe impl<Y, C: CriticalSection> Sync for RwCell<Y, C> where Y: Send + Sync {}

impl<Y> RwCell<Y, SpinSection> {
    pub const fn new(value: Y) -> Self {
        Self::with_section(value, SpinSection::new())
    }
}

impl<Y, C: CriticalSection> RwCell<Y, C> {
    pub const fn with_section(value: Y, section: C) -> Self {
        Self {
            lock: RwLock::with_section(section),
            value: UnsafeCell::new(value),
        }
    }

    pub fn read(&self) -> ReadGuard<'_, Y, C> {
        self.lock.enter_read();
        ReadGuard {
            cell: self,
            _not_send: PhantomData,
        }
    }

    pub fn write(&self) -> Result<WriteGuard<'_, Y, C>, LockError> {
        self.lock.enter_write()?;
        Ok(WriteGuard {
            cell: self,
            _not_send: PhantomData,
        })
    }

    /// The raw lock, e.g. to look at its [`RwLock::state`]
    pub fn lock(&self) -> &RwLock<C> {
        &self.lock
    }

    /// &mut self proves there are no guards around
    pub fn get_mut(&mut self) -> &mut Y {
        self.value.get_mut()
    }

    pub fn into_inner(self) -> Y {
        self.value.into_inner()
    }
}

impl<Y: Default> Default for RwCell<Y, SpinSection> {
    fn default() -> Self {
        Self::new(Y::default())
    }
}

/// Only the lock state, the value may be under a writer right now
impl<Y, C: CriticalSection> fmt::Debug for RwCell<Y, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RwCell")
            .field("state", &self.lock.state())
            .finish_non_exhaustive()
    }
}

pub struct ReadGuard<'a, Y, C: CriticalSection = SpinSection> {
    cell: &'a RwCell<Y, C>,
    _not_send: PhantomData<*const ()>,
}

impl<Y, C: CriticalSection> Deref for ReadGuard<'_, Y, C> {
    type Target = Y;
    fn deref(&self) -> &Self::Target {
        // SAFETY: a read slot is held, writers are out
        unsafe { &*self.cell.value.get() }
    }
}

impl<Y, C: CriticalSection> Drop for ReadGuard<'_, Y, C> {
    fn drop(&mut self) {
        self.cell.lock.exit_read();
    }
}

pub struct WriteGuard<'a, Y, C: CriticalSection = SpinSection> {
    cell: &'a RwCell<Y, C>,
    _not_send: PhantomData<*const ()>,
}

impl<Y, C: CriticalSection> Deref for WriteGuard<'_, Y, C> {
    type Target = Y;
    fn deref(&self) -> &Self::Target {
        // SAFETY: the write lock is held
        unsafe { &*self.cell.value.get() }
    }
}

impl<Y, C: CriticalSection> DerefMut for WriteGuard<'_, Y, C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: the write lock is held
        unsafe { &mut *self.cell.value.get() }
    }
}

impl<Y, C: CriticalSection> Drop for WriteGuard<'_, Y, C> {
    fn drop(&mut self) {
        self.cell.lock.exit_write();
    }
}

#[cfg(test)]
mod test {
    use std::thread::scope;

    use crate::{critical_section::BlockingSection, rwlock::Phase};

    use super::*;

    #[test]
    fn test_guards_release_on_drop() {
        let cell = RwCell::new(vec![1, 2]);
        {
            let a = cell.read();
            let b = cell.read();
            assert_eq!(a.len() + b.len(), 4);
            assert_eq!(cell.lock().state().read_count, 2);
        }
        assert_eq!(cell.lock().state().phase(), Phase::Idle);

        cell.write().unwrap().push(3);
        assert_eq!(cell.lock().state().phase(), Phase::Idle);
        assert_eq!(*cell.read(), [1, 2, 3]);
    }

    #[test]
    fn test_write_twice_on_one_thread() {
        let cell = RwCell::new(0);
        let mut first = cell.write().unwrap();
        *first += 1;
        assert!(matches!(cell.write(), Err(LockError::ReentrantWrite)));
        drop(first);
        assert_eq!(*cell.read(), 1);
    }

    #[test]
    fn test_counter_across_threads() {
        let cell = RwCell::with_section(0u64, BlockingSection::new());
        scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..1_000 {
                        *cell.write().unwrap() += 1;
                        let _ = *cell.read();
                    }
                });
            }
        });
        assert_eq!(cell.into_inner(), 4_000);
    }

    #[test]
    fn test_debug_hides_value() {
        let cell = RwCell::new("secret");
        let guard = cell.write().unwrap();
        let text = format!("{cell:?}");
        assert!(text.starts_with("RwCell { state: LockState { read_count: 0, write_count: 1"));
        assert!(!text.contains("secret"));
        drop(guard);
    }

    #[test]
    fn test_get_mut() {
        let mut cell = RwCell::<String>::default();
        cell.get_mut().push_str("hey");
        assert_eq!(cell.read().as_str(), "hey");
    }
}
