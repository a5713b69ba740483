//! Error taxonomy.
//!
//! Configuration errors surface at construction time. Store errors are
//! transient values resolved by the gate's failure policy; they never
//! escape a request as an unhandled fault.

use std::fmt;
use std::time::Duration;

/// Construction-time configuration error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required environment variable is missing or empty
    MissingEnv(&'static str),
    /// The backend port is not a valid port number
    InvalidPort(String),
    /// The backend address could not be parsed into a connection target
    InvalidAddress(String),
    /// Claim TTL must be greater than zero
    ZeroTtl,
    /// Store timeout must be greater than zero
    ZeroTimeout,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingEnv(var) => {
                write!(f, "environment variable {} is missing or empty", var)
            }
            ConfigError::InvalidPort(port) => write!(f, "invalid backend port: {:?}", port),
            ConfigError::InvalidAddress(reason) => {
                write!(f, "invalid backend address: {}", reason)
            }
            ConfigError::ZeroTtl => write!(f, "claim_ttl must be greater than 0"),
            ConfigError::ZeroTimeout => write!(f, "store_timeout must be greater than 0"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Transient key store failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backend rejected the command or the connection failed
    Backend(String),
    /// The store call did not finish within the configured timeout
    Timeout(Duration),
}

impl StoreError {
    /// Whether this error came from the timeout bound rather than the backend.
    pub fn is_timeout(&self) -> bool {
        matches!(self, StoreError::Timeout(_))
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Backend(reason) => write!(f, "key store backend error: {}", reason),
            StoreError::Timeout(after) => {
                write!(f, "key store call timed out after {:?}", after)
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Failure to open a connection-backed key store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    /// The configuration was rejected before any I/O
    Config(ConfigError),
    /// The backend could not be reached
    Store(StoreError),
}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectError::Config(e) => write!(f, "configuration error: {}", e),
            ConnectError::Store(e) => write!(f, "connection error: {}", e),
        }
    }
}

impl std::error::Error for ConnectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConnectError::Config(e) => Some(e),
            ConnectError::Store(e) => Some(e),
        }
    }
}

impl From<ConfigError> for ConnectError {
    fn from(e: ConfigError) -> Self {
        ConnectError::Config(e)
    }
}

impl From<StoreError> for ConnectError {
    fn from(e: StoreError) -> Self {
        ConnectError::Store(e)
    }
}

#[cfg(feature = "redis-store")]
impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        StoreError::Backend(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        assert_eq!(
            ConfigError::MissingEnv("IDEMPOTENCE_REDIS_HOST").to_string(),
            "environment variable IDEMPOTENCE_REDIS_HOST is missing or empty"
        );
        assert_eq!(
            ConfigError::ZeroTtl.to_string(),
            "claim_ttl must be greater than 0"
        );
    }

    #[test]
    fn test_store_error_timeout() {
        let err = StoreError::Timeout(Duration::from_millis(250));
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "key store call timed out after 250ms");
        assert!(!StoreError::Backend("refused".into()).is_timeout());
    }

    #[test]
    fn test_connect_error_from() {
        let err: ConnectError = ConfigError::MissingEnv("IDEMPOTENCE_REDIS_PORT").into();
        assert!(matches!(err, ConnectError::Config(ConfigError::MissingEnv(_))));
        assert!(std::error::Error::source(&err).is_some());

        let err: ConnectError = StoreError::Backend("refused".into()).into();
        assert_eq!(err.to_string(), "connection error: key store backend error: refused");
    }
}
