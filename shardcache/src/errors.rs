use std::{error, fmt};

use redis::RedisError;

/// Result type returned by every fallible operation in this crate.
pub type CacheResult<T> = Result<T, CacheError>;

/// The classes of failure a cache operation can surface.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[non_exhaustive]
pub enum CacheErrorKind {
    /// The key-space configuration is missing, malformed, or does not
    /// contain the requested `(node, item)` pair.  Raised at construction
    /// time, never mid-operation.
    Config,
    /// An argument was rejected before any command was sent to the server.
    Validation,
    /// The payload mapper failed to encode or decode a value.
    Codec,
    /// An error reported by the underlying Redis client, passed through
    /// unmodified.
    Redis,
}

/// Error type for all cache operations.
///
/// Remote failures from the `redis` crate are wrapped without translation
/// or retry; whether such a failure is transient is not knowable at this
/// layer.  Absence of a key or member is never an error.
pub struct CacheError {
    repr: ErrorRepr,
}

#[derive(Debug)]
enum ErrorRepr {
    Config(String),
    Validation(String),
    Codec(String),
    Redis(RedisError),
}

impl CacheError {
    pub(crate) fn config(detail: impl Into<String>) -> CacheError {
        CacheError {
            repr: ErrorRepr::Config(detail.into()),
        }
    }

    pub(crate) fn validation(detail: impl Into<String>) -> CacheError {
        CacheError {
            repr: ErrorRepr::Validation(detail.into()),
        }
    }

    pub(crate) fn codec(detail: impl Into<String>) -> CacheError {
        CacheError {
            repr: ErrorRepr::Codec(detail.into()),
        }
    }

    /// Returns the kind of the error.
    pub fn kind(&self) -> CacheErrorKind {
        match self.repr {
            ErrorRepr::Config(_) => CacheErrorKind::Config,
            ErrorRepr::Validation(_) => CacheErrorKind::Validation,
            ErrorRepr::Codec(_) => CacheErrorKind::Codec,
            ErrorRepr::Redis(_) => CacheErrorKind::Redis,
        }
    }

    /// The wrapped client error, if this error originated in the `redis`
    /// crate.
    pub fn as_redis_error(&self) -> Option<&RedisError> {
        match self.repr {
            ErrorRepr::Redis(ref e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.repr {
            ErrorRepr::Config(ref detail) => write!(f, "configuration error: {detail}"),
            ErrorRepr::Validation(ref detail) => write!(f, "invalid argument: {detail}"),
            ErrorRepr::Codec(ref detail) => write!(f, "payload codec error: {detail}"),
            ErrorRepr::Redis(ref e) => e.fmt(f),
        }
    }
}

impl fmt::Debug for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.repr, f)
    }
}

impl error::Error for CacheError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self.repr {
            ErrorRepr::Redis(ref e) => Some(e),
            _ => None,
        }
    }
}

impl From<RedisError> for CacheError {
    fn from(err: RedisError) -> CacheError {
        CacheError {
            repr: ErrorRepr::Redis(err),
        }
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> CacheError {
        CacheError::codec(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_reported() {
        assert_eq!(CacheError::config("x").kind(), CacheErrorKind::Config);
        assert_eq!(CacheError::validation("x").kind(), CacheErrorKind::Validation);
        assert_eq!(CacheError::codec("x").kind(), CacheErrorKind::Codec);
    }

    #[test]
    fn redis_errors_pass_through() {
        let inner = RedisError::from((redis::ErrorKind::TypeError, "boom"));
        let err = CacheError::from(inner);
        assert_eq!(err.kind(), CacheErrorKind::Redis);
        assert!(err.as_redis_error().is_some());
    }
}
