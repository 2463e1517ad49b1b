/*
 * The section guards a few integer updates, so the expected wait is short.
 * A kernel mutex would pay for user/kernel transitions every time it's contended.
 * Spinning is cheaper, but unbounded spinning starves whoever holds the flag
 * if it got preempted => give the time slice away after some attempts.
 */

use std::{
    hint,
    sync::atomic::{
        AtomicU32,
        Ordering::{Acquire, Relaxed, Release},
    },
    thread,
};

use super::CriticalSection;

/// How many failed attempts in a row before yielding the processor
pub const DEFAULT_SPIN_BUDGET: u32 = 20;

const FREE: u32 = 0;
const HELD: u32 = 1;

pub struct SpinSection {
    locked: AtomicU32, // FREE or HELD
    spin_budget: u32,
}

impl SpinSection {
    pub const fn new() -> Self {
        Self::with_budget(DEFAULT_SPIN_BUDGET)
    }

    pub const fn with_budget(spin_budget: u32) -> Self {
        Self {
            locked: AtomicU32::new(FREE),
            spin_budget,
        }
    }

    pub fn spin_budget(&self) -> u32 {
        self.spin_budget
    }
}

impl Default for SpinSection {
    fn default() -> Self {
        Self::new()
    }
}

impl CriticalSection for SpinSection {
    fn enter(&self) {
        let mut spin_count = 0;
        // Acquire pairs with the Release in exit => the previous holder's writes are visible
        // weak is fine, we're in a loop anyway
        while self
            .locked
            .compare_exchange_weak(FREE, HELD, Acquire, Relaxed)
            .is_err()
        {
            spin_count += 1;
            if spin_count > self.spin_budget {
                // a hint to the scheduler, not a sleep
                thread::yield_now();
                spin_count = 0;
            } else {
                hint::spin_loop();
            }
        }
    }

    fn exit(&self) {
        // swap rather than fetch_sub, so a bogus exit doesn't wrap the flag around
        let was = self.locked.swap(FREE, Release);
        assert_eq!(was, HELD, "exiting a spin section nobody entered");
    }
}
