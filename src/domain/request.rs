//! Request classification: which methods are protected and where the token lives.

use crate::domain::token::IdempotencyToken;
use http::{HeaderMap, Method};

/// Header carrying the client's idempotency token.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Whether a method mutates server state and therefore needs protection.
///
/// POST, PUT, PATCH and DELETE are mutating. Everything else, including
/// extension methods, is treated as read-only.
pub fn is_mutating(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

/// Extract the idempotency token from request headers.
///
/// Returns `None` when the header is missing, empty, or whitespace-only.
/// Any other byte string is a token, including non-ASCII values. When the
/// header repeats, the first value wins.
pub fn extract_token(headers: &HeaderMap) -> Option<IdempotencyToken> {
    headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|value| IdempotencyToken::from_bytes(value.as_bytes()))
}
