//! Domain layer - pure types with no I/O.
//!
//! This layer contains the core concepts of idempotency protection:
//! - Tokens and their scrubbed fingerprints
//! - Claim records and claim outcomes
//! - Request classification (mutating methods, header extraction)
//! - The store failure policy

pub mod claim;
pub mod policy;
pub mod request;
pub mod token;
