//! Idempotency tokens and their log-safe fingerprints.
//!
//! A token is the opaque value a client sends in the `Idempotency-Key` header.
//! The gate never interprets it beyond requiring it to be non-empty.

use ahash::RandomState;
use std::fmt;

// Fixed seeds so fingerprints are stable across processes and restarts.
const FINGERPRINT_SEEDS: (u64, u64, u64, u64) = (
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
);

/// A client-supplied idempotency token.
///
/// Always non-empty. The token is an opaque byte string: header values
/// outside visible ASCII (UTF-8 keys, obs-text) are kept as sent. The raw
/// value is only exposed through [`as_bytes`](Self::as_bytes) and
/// [`to_str`](Self::to_str); `Debug` prints the fingerprint so tokens do not
/// leak into logs by accident.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct IdempotencyToken(Box<[u8]>);

impl IdempotencyToken {
    /// Parse a raw header value into a token.
    ///
    /// Returns `None` for empty or whitespace-only values. Surrounding
    /// whitespace is trimmed; the rest is kept verbatim.
    pub fn parse(raw: &str) -> Option<Self> {
        Self::from_bytes(raw.as_bytes())
    }

    /// Build a token from raw header bytes.
    ///
    /// Same rules as [`parse`](Self::parse); no encoding is required.
    pub fn from_bytes(raw: &[u8]) -> Option<Self> {
        let trimmed = trim_ascii_whitespace(raw);
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.into()))
        }
    }

    /// The raw token bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The token as text, if it is valid UTF-8.
    pub fn to_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    /// Stable digest of the token for logs and spans.
    pub fn fingerprint(&self) -> TokenFingerprint {
        let (k0, k1, k2, k3) = FINGERPRINT_SEEDS;
        let state = RandomState::with_seeds(k0, k1, k2, k3);
        TokenFingerprint(state.hash_one(&self.0[..]))
    }
}

fn trim_ascii_whitespace(mut bytes: &[u8]) -> &[u8] {
    while let [first, rest @ ..] = bytes {
        if first.is_ascii_whitespace() {
            bytes = rest;
        } else {
            break;
        }
    }
    while let [rest @ .., last] = bytes {
        if last.is_ascii_whitespace() {
            bytes = rest;
        } else {
            break;
        }
    }
    bytes
}

impl fmt::Debug for IdempotencyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IdempotencyToken")
            .field(&self.fingerprint())
            .finish()
    }
}

/// Scrubbed representation of a token, safe to record in telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenFingerprint(u64);

impl TokenFingerprint {
    /// Get the raw digest.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TokenFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
