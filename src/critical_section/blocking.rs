//! A futex mutex without the data part, the kernel puts contended threads to sleep.
//!
//! The state is a u32 so it works with `atomic_wait`:
//! - 0 - free
//! - 1 - held, nobody is sleeping
//! - 2 - held, someone is (or may be) sleeping
//!
//! Uncontended enter/exit never make a syscall: `wait` only happens on a failed CAS and
//! `wake_one` only when the state says there could be a sleeper.
//!
//! There's no owner tracking here. It's on the caller to exit from the thread that entered.

use std::sync::atomic::{
    AtomicU32,
    Ordering::{Acquire, Relaxed, Release},
};

use atomic_wait::{wait, wake_one};

use super::CriticalSection;

pub struct BlockingSection {
    state: AtomicU32,
}

impl BlockingSection {
    pub const fn new() -> Self {
        Self {
            state: AtomicU32::new(0),
        }
    }

    #[cold]
    fn enter_contended(&self) {
        // store 2 to let the holder know it has to wake somebody.
        // it's left as 2 even if we're the only one, an extra wake_one is cheaper than a lost one
        while self.state.swap(2, Acquire) != 0 {
            wait(&self.state, 2);
        }
    }
}

impl Default for BlockingSection {
    fn default() -> Self {
        Self::new()
    }
}

impl CriticalSection for BlockingSection {
    fn enter(&self) {
        if self.state.compare_exchange(0, 1, Acquire, Relaxed).is_err() {
            self.enter_contended();
        }
    }

    fn exit(&self) {
        match self.state.swap(0, Release) {
            0 => panic!("exiting a blocking section nobody entered"),
            1 => {}
            _ => wake_one(&self.state),
        }
    }
}

#[cfg(test)]
mod test {
    use std::{
        cell::UnsafeCell,
        sync::atomic::{AtomicBool, Ordering::SeqCst},
        thread::{scope, sleep},
        time::Duration,
    };

    use super::*;

    #[test]
    fn test_mutual_exclusion() {
        struct Counter {
            section: BlockingSection,
            value: UnsafeCell<u64>,
        }
        unsafe impl Sync for Counter {}

        let counter = Counter {
            section: BlockingSection::new(),
            value: UnsafeCell::new(0),
        };
        // the threads get the whole &Counter, a bare &UnsafeCell isn't Send
        let shared = &counter;
        scope(|s| {
            for _ in 0..8 {
                s.spawn(move || {
                    for _ in 0..10_000 {
                        shared.section.enter();
                        unsafe { *shared.value.get() += 1 };
                        shared.section.exit();
                    }
                });
            }
        });
        assert_eq!(counter.value.into_inner(), 80_000);
    }

    #[test]
    fn test_contended_enter_sleeps_until_exit() {
        let section = BlockingSection::new();
        let entered = AtomicBool::new(false);

        section.enter();
        scope(|s| {
            s.spawn(|| {
                section.enter();
                entered.store(true, SeqCst);
                section.exit();
            });
            sleep(Duration::from_millis(100));
            // still held by us => the other thread is parked
            assert!(!entered.load(SeqCst));
            section.exit();
        });
        assert!(entered.load(SeqCst));
        assert_eq!(section.state.load(Relaxed), 0);
    }

    #[test]
    #[should_panic(expected = "nobody entered")]
    fn test_exit_without_enter() {
        BlockingSection::default().exit();
    }
}
