//! # Critical sections
//!
//! The rwlock keeps a handful of counters and an owner field. Updating those takes a few instructions,
//! so all it needs is a tiny gate: [`CriticalSection::enter`] and [`CriticalSection::exit`], nothing more.
//!
//! There are 2 interchangeable strategies:
//! - [`SpinSection`] - CAS on a flag, yields the time slice once the spin budget is burnt
//! - [`BlockingSection`] - a futex mutex, contended threads sleep in the kernel
//!
//! Spinning wins when the section is short, which is exactly our case.
//! The blocking one is slower, but it never burns cycles, so it's kept as the safe fallback.
//!
//! There's no guard on this level on purpose: the rwlock has to release the section in the middle of its
//! loops (before parking on a signal), see [`crate::rwlock`].

mod blocking;
mod spin;

pub use blocking::BlockingSection;
pub use spin::{SpinSection, DEFAULT_SPIN_BUDGET};

use strum_macros::{Display, EnumIter, EnumString};

/// A minimal mutual exclusion gate.
///
/// Calling [`CriticalSection::exit`] without a prior [`CriticalSection::enter`] is a bug in the caller,
/// implementations panic on it.
pub trait CriticalSection: Send + Sync {
    /// Blocks until the calling thread holds the section.
    fn enter(&self);

    /// Releases the section held by the calling thread.
    fn exit(&self);
}

/// Which [`CriticalSection`] to build a lock on, picked at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumIter, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Strategy {
    /// [`SpinSection`]
    #[default]
    Spin,
    /// [`BlockingSection`]
    Blocking,
}

#[cfg(test)]
mod test {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_strategy_names() {
        let names = Strategy::iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(names, ["spin", "blocking"]);

        assert_eq!(Strategy::from_str("blocking").unwrap(), Strategy::Blocking);
        assert!(Strategy::from_str("mutex").is_err());
        assert_eq!(Strategy::default(), Strategy::Spin);
    }
}
