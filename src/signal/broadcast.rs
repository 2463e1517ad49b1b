use std::sync::atomic::{
    AtomicU32,
    Ordering::{Acquire, Relaxed, Release},
};

use atomic_wait::{wait, wake_all};

const CLEARED: u32 = 0;
const SET: u32 = 1;

/// A manual-reset event: [`BroadcastSignal::set`] releases all the waiters, and everyone arriving later,
/// until [`BroadcastSignal::clear`].
pub struct BroadcastSignal {
    state: AtomicU32,
}

impl BroadcastSignal {
    pub const fn new(set: bool) -> Self {
        Self {
            state: AtomicU32::new(if set { SET } else { CLEARED }),
        }
    }

    pub fn set(&self) {
        // only a 0 -> 1 transition can have sleepers behind it,
        // waiters never sleep on SET
        if self.state.swap(SET, Release) == CLEARED {
            wake_all(&self.state);
        }
    }

    pub fn clear(&self) {
        self.state.store(CLEARED, Relaxed);
    }

    pub fn is_set(&self) -> bool {
        self.state.load(Acquire) == SET
    }

    /// Blocks while the signal is cleared. It may come back right away if the signal is set,
    /// the caller is supposed to re-check whatever it waits for anyway.
    pub fn wait(&self) {
        while self.state.load(Acquire) == CLEARED {
            wait(&self.state, CLEARED);
        }
    }
}

#[cfg(test)]
mod test {
    use std::{
        sync::atomic::AtomicUsize,
        thread::{scope, sleep},
        time::Duration,
    };

    use super::*;

    #[test]
    fn test_set_releases_everyone() {
        let signal = BroadcastSignal::new(false);
        let passed = AtomicUsize::new(0);

        scope(|s| {
            for _ in 0..5 {
                s.spawn(|| {
                    signal.wait();
                    passed.fetch_add(1, Relaxed);
                });
            }
            sleep(Duration::from_millis(100));
            assert_eq!(passed.load(Relaxed), 0);
            signal.set();
        });

        assert_eq!(passed.load(Relaxed), 5);
    }

    #[test]
    fn test_stays_set_until_cleared() {
        let signal = BroadcastSignal::new(true);
        assert!(signal.is_set());
        // doesn't block, no matter how many times
        signal.wait();
        signal.wait();
        assert!(signal.is_set());

        signal.clear();
        assert!(!signal.is_set());
    }

    #[test]
    fn test_cleared_blocks_again() {
        let signal = BroadcastSignal::new(true);
        signal.clear();
        let passed = AtomicUsize::new(0);

        scope(|s| {
            s.spawn(|| {
                signal.wait();
                passed.fetch_add(1, Relaxed);
            });
            sleep(Duration::from_millis(100));
            assert_eq!(passed.load(Relaxed), 0);
            signal.set();
            signal.set(); // a repeated set is a no-op
        });
        assert_eq!(passed.load(Relaxed), 1);
    }
}
