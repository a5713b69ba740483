//! Redis-backed key store.
//!
//! Shares claims across every application instance pointed at the same Redis.
//!
//! ## Data Model
//!
//! - Keys: `<key_prefix><token>` (default prefix `req:`), token bytes kept as sent
//! - Values: the sentinel `1`; no payload is ever stored
//! - TTL: set atomically with the claim, in milliseconds
//!
//! ## Atomicity
//!
//! A claim is one command: `SET <key> 1 NX PX <ttl_ms>`. Redis replies `OK`
//! when the key was absent and is now set, and nil when it already existed.
//! Concurrent claims on the same key are totally ordered by Redis, so exactly
//! one of them observes `OK`.
//!
//! ## Connections
//!
//! Uses `redis::aio::ConnectionManager`, which multiplexes commands over one
//! connection and reconnects on failure. Each call clones the manager; no
//! lock is held while a command is in flight.
//!
//! ## Example
//!
//! ```rust,ignore
//! use idempotency_gate::{IdempotencyLayer, RedisKeyStore, RedisKeyStoreConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads IDEMPOTENCE_REDIS_HOST and IDEMPOTENCE_REDIS_PORT
//!     let config = RedisKeyStoreConfig::from_env()?;
//!     let store = RedisKeyStore::connect(config).await?;
//!     let layer = IdempotencyLayer::builder(store).build()?;
//!     Ok(())
//! }
//! ```

use crate::application::error::{ConfigError, ConnectError, StoreError};
use crate::application::ports::KeyStore;
use crate::domain::claim::ClaimOutcome;
use crate::domain::token::IdempotencyToken;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Default namespace for claim keys.
pub const DEFAULT_KEY_PREFIX: &str = "req:";

/// Environment variable holding the Redis host.
pub const REDIS_HOST_ENV: &str = "IDEMPOTENCE_REDIS_HOST";

/// Environment variable holding the Redis port.
pub const REDIS_PORT_ENV: &str = "IDEMPOTENCE_REDIS_PORT";

const CLAIM_SENTINEL: &str = "1";

/// Connection settings for [`RedisKeyStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisKeyStoreConfig {
    /// Redis host name or IP address
    pub host: String,
    /// Redis port
    pub port: u16,
    /// Prefix for claim keys (default: "req:")
    pub key_prefix: String,
}

impl RedisKeyStoreConfig {
    /// Create a config for `host:port` with the default key prefix.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }

    /// Read the backend address from `IDEMPOTENCE_REDIS_HOST` and
    /// `IDEMPOTENCE_REDIS_PORT`.
    ///
    /// # Errors
    /// Returns `ConfigError::MissingEnv` if either variable is unset or empty,
    /// and `ConfigError::InvalidPort` if the port does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = required(&lookup, REDIS_HOST_ENV)?;
        let raw_port = required(&lookup, REDIS_PORT_ENV)?;

        let port = match raw_port.parse::<u16>() {
            Ok(port) if port != 0 => port,
            _ => return Err(ConfigError::InvalidPort(raw_port)),
        };

        Ok(Self::new(host, port))
    }

    /// Replace the key prefix.
    pub fn with_key_prefix(mut self, key_prefix: impl Into<String>) -> Self {
        self.key_prefix = key_prefix.into();
        self
    }

    /// Connection URL for the configured address.
    pub fn url(&self) -> String {
        if self.host.contains(':') {
            format!("redis://[{}]:{}/", self.host, self.port)
        } else {
            format!("redis://{}:{}/", self.host, self.port)
        }
    }

    /// Redis key holding the claim for `token`.
    ///
    /// Binary-safe: the token bytes are appended to the prefix as sent.
    pub fn claim_key(&self, token: &IdempotencyToken) -> Vec<u8> {
        let mut key = Vec::with_capacity(self.key_prefix.len() + token.as_bytes().len());
        key.extend_from_slice(self.key_prefix.as_bytes());
        key.extend_from_slice(token.as_bytes());
        key
    }
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::MissingEnv(name))
}

/// Claim TTL in whole milliseconds, rounded up and never zero.
fn ttl_millis(ttl: Duration) -> u64 {
    let mut millis = ttl.as_millis();
    if ttl.subsec_nanos() % 1_000_000 != 0 {
        millis += 1;
    }
    u64::try_from(millis).unwrap_or(u64::MAX).max(1)
}

/// Key store shared through Redis.
#[derive(Clone)]
pub struct RedisKeyStore {
    connection: ConnectionManager,
    config: RedisKeyStoreConfig,
}

impl fmt::Debug for RedisKeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisKeyStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RedisKeyStore {
    /// Connect using the address in `IDEMPOTENCE_REDIS_HOST`/`IDEMPOTENCE_REDIS_PORT`.
    ///
    /// # Errors
    /// Fails if the variables are missing or the connection cannot be opened.
    pub async fn connect_from_env() -> Result<Self, ConnectError> {
        let config = RedisKeyStoreConfig::from_env()?;
        Self::connect(config).await
    }

    /// Connect to Redis.
    ///
    /// # Errors
    /// Returns `ConnectError::Config` if the address is malformed and
    /// `ConnectError::Store` if the initial connection fails.
    pub async fn connect(config: RedisKeyStoreConfig) -> Result<Self, ConnectError> {
        let client = Client::open(config.url())
            .map_err(|e| ConfigError::InvalidAddress(e.to_string()))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(StoreError::from)?;

        tracing::debug!(host = %config.host, port = config.port, "Connected idempotency key store");

        Ok(Self { connection, config })
    }

    /// Get the store configuration.
    pub fn config(&self) -> &RedisKeyStoreConfig {
        &self.config
    }
}

impl KeyStore for RedisKeyStore {
    fn try_claim(
        &self,
        token: &IdempotencyToken,
        ttl: Duration,
    ) -> impl Future<Output = Result<ClaimOutcome, StoreError>> + Send {
        let key = self.config.claim_key(token);
        let mut conn = self.connection.clone();
        let ttl_ms = ttl_millis(ttl);

        async move {
            let reply: Option<String> = redis::cmd("SET")
                .arg(&key)
                .arg(CLAIM_SENTINEL)
                .arg("NX")
                .arg("PX")
                .arg(ttl_ms)
                .query_async(&mut conn)
                .await?;

            Ok::<_, StoreError>(match reply {
                Some(_) => ClaimOutcome::Claimed,
                None => ClaimOutcome::AlreadyClaimed,
            })
        }
    }

    fn is_claimed(
        &self,
        token: &IdempotencyToken,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send {
        let key = self.config.claim_key(token);
        let mut conn = self.connection.clone();

        async move {
            let count: u64 = conn.exists(&key).await?;
            Ok::<_, StoreError>(count > 0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_from_lookup() {
        let config = RedisKeyStoreConfig::from_lookup(lookup_from(&[
            (REDIS_HOST_ENV, "cache.internal"),
            (REDIS_PORT_ENV, "6380"),
        ]))
        .unwrap();

        assert_eq!(config.host, "cache.internal");
        assert_eq!(config.port, 6380);
        assert_eq!(config.key_prefix, DEFAULT_KEY_PREFIX);
        assert_eq!(config.url(), "redis://cache.internal:6380/");
    }

    #[test]
    fn test_from_lookup_missing_host() {
        let result = RedisKeyStoreConfig::from_lookup(lookup_from(&[(REDIS_PORT_ENV, "6379")]));
        assert_eq!(result, Err(ConfigError::MissingEnv(REDIS_HOST_ENV)));
    }

    #[test]
    fn test_from_lookup_empty_port() {
        let result = RedisKeyStoreConfig::from_lookup(lookup_from(&[
            (REDIS_HOST_ENV, "localhost"),
            (REDIS_PORT_ENV, "  "),
        ]));
        assert_eq!(result, Err(ConfigError::MissingEnv(REDIS_PORT_ENV)));
    }

    #[test]
    fn test_from_lookup_invalid_port() {
        for bad in ["redis", "70000", "0", "-1"] {
            let result = RedisKeyStoreConfig::from_lookup(lookup_from(&[
                (REDIS_HOST_ENV, "localhost"),
                (REDIS_PORT_ENV, bad),
            ]));
            assert_eq!(result, Err(ConfigError::InvalidPort(bad.to_string())));
        }
    }

    #[test]
    fn test_url_brackets_ipv6() {
        let config = RedisKeyStoreConfig::new("::1", 6379);
        assert_eq!(config.url(), "redis://[::1]:6379/");
    }

    #[test]
    fn test_claim_key_uses_prefix() {
        let token = IdempotencyToken::parse("abc").unwrap();

        let config = RedisKeyStoreConfig::new("localhost", 6379);
        assert_eq!(config.claim_key(&token), b"req:abc");

        let config = config.with_key_prefix("orders:idem:");
        assert_eq!(config.claim_key(&token), b"orders:idem:abc");
    }

    #[test]
    fn test_claim_key_keeps_raw_token_bytes() {
        let config = RedisKeyStoreConfig::new("localhost", 6379);

        let utf8 = IdempotencyToken::parse("заказ-1").unwrap();
        assert_eq!(config.claim_key(&utf8), "req:заказ-1".as_bytes());

        let opaque = IdempotencyToken::from_bytes(&[0xfa, 0xfb]).unwrap();
        assert_eq!(config.claim_key(&opaque), [b'r', b'e', b'q', b':', 0xfa, 0xfb]);
    }

    #[test]
    fn test_ttl_millis_rounds_up() {
        assert_eq!(ttl_millis(Duration::from_secs(180)), 180_000);
        assert_eq!(ttl_millis(Duration::from_micros(1_500)), 2);
        assert_eq!(ttl_millis(Duration::from_nanos(1)), 1);
        assert_eq!(ttl_millis(Duration::ZERO), 1);
    }
}
