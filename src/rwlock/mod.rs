//! # Read-write lock
//!
//! Many readers or one writer, with writers taking priority over newcomers:
//! a reader is only admitted when nobody writes *and* nobody waits to write.
//! Without the second part a steady stream of readers could keep a writer out forever.
//!
//! The bookkeeping lives in [`Counters`] and is only reachable through [`Bookkeeping`], a guard holding the
//! inner [`CriticalSection`]. Parking always goes like this:
//! 1. drop the guard (release the section)
//! 2. wait on a signal
//! 3. take the guard again and re-check
//!
//! Sleeping with the section held would deadlock the thread that's supposed to wake us,
//! as it needs the section to update the counters.
//!
//! Signals:
//! - readers park on a [`BroadcastSignal`]. Every writer clears it on arrival, the last writer out sets it
//! - writers park on a [`WakeOneSignal`]. The last reader out or a leaving writer hands it to one of them
//!
//! A wake-up isn't an admission, another thread may have barged in in-between => everybody loops.
//!
//! Known gap: writers that keep coming back one after another hold readers off for as long as they do so.
//! There's no bound on how many writers go before a parked reader.

mod cell;

pub use cell::{ReadGuard, RwCell, WriteGuard};

use std::{
    cell::UnsafeCell,
    fmt,
    ops::{Deref, DerefMut},
    thread::{self, ThreadId},
};

use log::{trace, warn};
use strum_macros::Display;

use crate::{
    critical_section::{CriticalSection, SpinSection},
    error::LockError,
    signal::{BroadcastSignal, WakeOneSignal},
};

/// Everything the lock knows about its holders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Counters {
    read_count: usize,
    write_count: usize, // 0 or 1
    write_wait_count: usize,
    write_owner: Option<ThreadId>, // Some iff write_count == 1
}

pub struct RwLock<C: CriticalSection = SpinSection> {
    section: C,
    counters: UnsafeCell<Counters>,
    read_signal: BroadcastSignal,
    write_signal: WakeOneSignal,
}

/// the counters are only touched inside the section
unsafe impl<C: CriticalSection> Sync for RwLock<C> {}

impl RwLock<SpinSection> {
    pub const fn new() -> Self {
        Self::with_section(SpinSection::new())
    }
}

impl<C: CriticalSection + Default> Default for RwLock<C> {
    fn default() -> Self {
        Self::with_section(C::default())
    }
}

impl<C: CriticalSection> RwLock<C> {
    pub const fn with_section(section: C) -> Self {
        Self {
            section,
            counters: UnsafeCell::new(Counters {
                read_count: 0,
                write_count: 0,
                write_wait_count: 0,
                write_owner: None,
            }),
            read_signal: BroadcastSignal::new(false),
            write_signal: WakeOneSignal::new(),
        }
    }

    fn bookkeeping(&self) -> Bookkeeping<'_, C> {
        self.section.enter();
        Bookkeeping { lock: self }
    }

    /// Blocks until there's no writer, neither holding nor waiting, then takes a read slot.
    pub fn enter_read(&self) {
        let mut counters = self.bookkeeping();
        loop {
            if counters.write_count == 0 && counters.write_wait_count == 0 {
                counters.read_count += 1;
                return;
            }
            drop(counters);
            trace!("reader parked behind a writer");
            self.read_signal.wait();
            counters = self.bookkeeping();
        }
    }

    /// Gives the read slot back. The last reader out hands the lock to a waiting writer, if there's one.
    ///
    /// # Panics
    /// If no read slot is held.
    pub fn exit_read(&self) {
        let mut counters = self.bookkeeping();
        // the guard releases the section while unwinding
        assert!(counters.read_count > 0, "exit_read without a matching enter_read");
        counters.read_count -= 1;
        if counters.read_count == 0 && counters.write_wait_count > 0 {
            self.write_signal.set();
        }
    }

    /// Blocks until there are no readers and no writer, then takes the lock exclusively.
    ///
    /// From the moment a writer shows up, new readers are parked.
    ///
    /// # Errors
    /// [`LockError::ReentrantWrite`] if the calling thread already holds the write lock.
    /// Waiting for ourselves would never end.
    pub fn enter_write(&self) -> Result<(), LockError> {
        let me = thread::current().id();
        let mut counters = self.bookkeeping();
        if counters.write_owner == Some(me) {
            drop(counters);
            warn!("{me:?} tried to take the write lock it already holds");
            return Err(LockError::ReentrantWrite);
        }

        // close the door for readers while we're here
        self.read_signal.clear();
        loop {
            if counters.write_count == 0 && counters.read_count == 0 {
                counters.write_count = 1;
                counters.write_owner = Some(me);
                return Ok(());
            }
            counters.write_wait_count += 1;
            drop(counters);
            trace!("writer {me:?} parked");
            self.write_signal.wait();
            counters = self.bookkeeping();
            counters.write_wait_count -= 1;
        }
    }

    /// Releases the write lock: to the next writer if one waits, otherwise to all the parked readers.
    ///
    /// # Panics
    /// If the calling thread doesn't hold the write lock.
    pub fn exit_write(&self) {
        let me = thread::current().id();
        let mut counters = self.bookkeeping();
        assert!(
            counters.write_count == 1 && counters.write_owner == Some(me),
            "exit_write by a thread that doesn't hold the write lock"
        );
        counters.write_count = 0;
        counters.write_owner = None;

        if counters.write_wait_count > 0 {
            // readers stay parked, read_signal is still cleared
            self.write_signal.set();
            return;
        }
        self.read_signal.set();
    }

    /// A consistent copy of the bookkeeping, taken inside the section.
    /// It may be outdated by the time the caller looks at it.
    pub fn state(&self) -> LockState {
        let counters = *self.bookkeeping();
        LockState {
            read_count: counters.read_count,
            write_count: counters.write_count,
            write_wait_count: counters.write_wait_count,
            write_owner: counters.write_owner,
        }
    }
}

/// Shows a [`RwLock::state`] snapshot, so it briefly enters the section
impl<C: CriticalSection> fmt::Debug for RwLock<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RwLock")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Proof of being inside the section, exits it on drop
struct Bookkeeping<'a, C: CriticalSection> {
    lock: &'a RwLock<C>,
}

impl<C: CriticalSection> Deref for Bookkeeping<'_, C> {
    type Target = Counters;
    fn deref(&self) -> &Self::Target {
        // SAFETY: the guard exists only while the section is held
        unsafe { &*self.lock.counters.get() }
    }
}

impl<C: CriticalSection> DerefMut for Bookkeeping<'_, C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: the guard exists only while the section is held
        unsafe { &mut *self.lock.counters.get() }
    }
}

impl<C: CriticalSection> Drop for Bookkeeping<'_, C> {
    fn drop(&mut self) {
        self.lock.section.exit();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockState {
    pub read_count: usize,
    pub write_count: usize,
    pub write_wait_count: usize,
    pub write_owner: Option<ThreadId>,
}

impl LockState {
    pub fn phase(&self) -> Phase {
        match (self.read_count, self.write_count) {
            (0, 0) => Phase::Idle,
            (_, 0) => Phase::Shared,
            _ => Phase::Exclusive,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    Idle,
    Shared,
    Exclusive,
}
