use std::sync::atomic::{
    AtomicU32,
    Ordering::{Acquire, Release},
};

use atomic_wait::{wait, wake_one};

/// An auto-reset event with one permit.
///
/// [`WakeOneSignal::set`] puts the permit in and wakes one sleeper, the first waiter to swap it out goes
/// through and the signal is cleared again. Setting it twice before anybody takes it still leaves one permit.
///
/// If nobody waits yet the permit stays until the next [`WakeOneSignal::wait`]. Waiters register themselves
/// before they release their lock and go to sleep, so the permit is always meant for one of them.
pub struct WakeOneSignal {
    permit: AtomicU32,
}

impl WakeOneSignal {
    pub const fn new() -> Self {
        Self {
            permit: AtomicU32::new(0),
        }
    }

    pub fn set(&self) {
        self.permit.store(1, Release);
        wake_one(&self.permit);
    }

    pub fn is_set(&self) -> bool {
        self.permit.load(Acquire) == 1
    }

    pub fn wait(&self) {
        // only the one who flips 1 -> 0 passes, everyone else goes (back) to sleep
        while self.permit.swap(0, Acquire) == 0 {
            wait(&self.permit, 0);
        }
    }
}

impl Default for WakeOneSignal {
    fn default() -> Self {
        Self::new()
    }
}
