//! Recoverable errors only. Breaking the lock discipline (exit without enter, exit from a foreign thread)
//! is a bug in the caller and panics instead.

use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum LockError {
    /// [`crate::RwLock::enter_write`] called by the thread that already holds the write lock
    #[strum(to_string = "the write lock is not reentrant: the calling thread already holds it")]
    ReentrantWrite,
}

impl std::error::Error for LockError {}

#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum CacheError {
    #[strum(to_string = "{source}")]
    Lock { source: LockError },
    #[strum(to_string = "key {key} is already cached")]
    DuplicateKey { key: String },
    /// a lookup came back with somebody else's value
    #[strum(to_string = "key {key} holds unexpected value {value}")]
    WrongValue { key: String, value: String },
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::Lock { source } => Some(source),
            CacheError::DuplicateKey { .. } | CacheError::WrongValue { .. } => None,
        }
    }
}

impl From<LockError> for CacheError {
    fn from(source: LockError) -> Self {
        CacheError::Lock { source }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum BenchError {
    #[strum(to_string = "{source}")]
    Lock { source: LockError },
    /// readers alone never move the counter, they'd spin forever
    #[strum(to_string = "the counter can't reach {target} without writers")]
    NoWriters { target: u64 },
}

impl std::error::Error for BenchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BenchError::Lock { source } => Some(source),
            BenchError::NoWriters { .. } => None,
        }
    }
}

impl From<LockError> for BenchError {
    fn from(source: LockError) -> Self {
        BenchError::Lock { source }
    }
}

#[cfg(test)]
mod test {
    use std::error::Error;

    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            LockError::ReentrantWrite.to_string(),
            "the write lock is not reentrant: the calling thread already holds it"
        );

        let e = CacheError::DuplicateKey {
            key: "42".to_string(),
        };
        assert_eq!(e.to_string(), "key 42 is already cached");
        assert!(e.source().is_none());

        let e = CacheError::WrongValue {
            key: "1".to_string(),
            value: "value-10".to_string(),
        };
        assert_eq!(e.to_string(), "key 1 holds unexpected value value-10");

        let e = BenchError::NoWriters { target: 5 };
        assert_eq!(e.to_string(), "the counter can't reach 5 without writers");
        assert!(e.source().is_none());
        assert!(BenchError::from(LockError::ReentrantWrite).source().is_some());

        let e = CacheError::from(LockError::ReentrantWrite);
        assert_eq!(e.to_string(), LockError::ReentrantWrite.to_string());
        assert!(e.source().is_some());
    }
}
