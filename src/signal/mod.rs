//! # Signals
//!
//! The rwlock parks threads on 2 kinds of events:
//! - [`BroadcastSignal`] - sticky, level-triggered. Once set, every waiter goes through and it stays set
//!   until somebody clears it. Readers wait on it.
//! - [`WakeOneSignal`] - a single permit. A set lets exactly one waiter through and the permit is gone.
//!   Writers wait on it.
//!
//! Both are a single `AtomicU32` and [atomic-wait](https://crates.io/crates/atomic-wait) calls, same as the
//! condvar in the locks chapter: the futex compares the value before sleeping, so a set that lands between
//! "I saw it cleared" and "I went to sleep" isn't lost.
//!
//! Neither of them promises anything about the protected state. Returning from `wait` means "go and look
//! again", the caller re-checks its condition under its own lock.

mod broadcast;
mod wake_one;

pub use broadcast::BroadcastSignal;
pub use wake_one::WakeOneSignal;
