//! Claim records and outcomes.
//!
//! A claim is the atomic absent→present transition for a token. Records are
//! never updated after creation; they disappear when their TTL elapses.

use std::time::{Duration, Instant};

/// Default lifetime of a claim record.
pub const DEFAULT_CLAIM_TTL: Duration = Duration::from_secs(3 * 60);

/// Result of an atomic claim attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// This caller created the record
    Claimed,
    /// A live record already existed
    AlreadyClaimed,
}

impl ClaimOutcome {
    /// Whether this caller won the claim.
    pub fn is_claimed(&self) -> bool {
        matches!(self, ClaimOutcome::Claimed)
    }

    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            ClaimOutcome::Claimed => "claimed",
            ClaimOutcome::AlreadyClaimed => "already_claimed",
        }
    }
}

/// In-process representation of a stored claim.
///
/// Carries no payload; only its expiry matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimRecord {
    expires_at: Instant,
}

impl ClaimRecord {
    /// Create a record claimed at `now` that lives for `ttl`.
    pub fn new(now: Instant, ttl: Duration) -> Self {
        Self {
            expires_at: now + ttl,
        }
    }

    /// Instant at which the record becomes logically absent.
    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Whether the record has expired at `now`.
    ///
    /// A record is live strictly before its expiry instant.
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}
