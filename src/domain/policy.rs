//! Policy for store failures.

use std::fmt;

/// What the gate does when the key store errors or times out.
///
/// The choice is made once, at construction. Both variants log the failure
/// and count it; neither pretends the store answered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Forward the request as if idempotency protection were absent.
    #[default]
    FailOpen,
    /// Reject the request with `503 Service Unavailable`.
    FailClosed,
}

impl FailurePolicy {
    /// Whether a request should still reach the downstream handler.
    pub fn forwards(&self) -> bool {
        matches!(self, FailurePolicy::FailOpen)
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::FailOpen => write!(f, "fail-open"),
            FailurePolicy::FailClosed => write!(f, "fail-closed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_fail_open() {
        assert_eq!(FailurePolicy::default(), FailurePolicy::FailOpen);
        assert!(FailurePolicy::default().forwards());
        assert!(!FailurePolicy::FailClosed.forwards());
    }

    #[test]
    fn test_display() {
        assert_eq!(FailurePolicy::FailOpen.to_string(), "fail-open");
        assert_eq!(FailurePolicy::FailClosed.to_string(), "fail-closed");
    }
}
