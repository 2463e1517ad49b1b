//! A reader/writer lock that doesn't let readers starve writers, built on a tiny critical section and
//! 2 futex signals. See [`rwlock`] for the protocol.

pub mod bench;
pub mod cache;
pub mod critical_section;
pub mod error;
pub mod logging;
pub mod rwlock;
pub mod signal;

pub use critical_section::{BlockingSection, CriticalSection, SpinSection, Strategy};
pub use error::{BenchError, CacheError, LockError};
pub use rwlock::{LockState, Phase, ReadGuard, RwCell, RwLock, WriteGuard};
