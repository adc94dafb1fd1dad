//! Token handling
//!
//! Claims decoding and validity checks, plus the store that owns the
//! credential pair.

pub mod claims;
pub mod store;

pub use claims::{decode_claims, expiry_millis, is_valid, JwtClaims};
pub use store::{CredentialPair, TokenStore};
