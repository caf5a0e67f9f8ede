//! Authentication and authorization library for the drinks services.
//!
//! Verifies RS256 bearer tokens issued by an external identity provider
//! against its published signing keys and enforces per-operation permissions.

mod claims;
mod guard;
mod jwt;
mod keys;

#[cfg(test)]
mod test_server;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use claims::{Audience, Claims, Permission};
pub use error::AuthFailure;
pub use guard::{authorize_with, bearer_token, check_permission, AuthGuard};
pub use jsonwebtoken::Algorithm;
pub use jwt::{decode_token, key_id, JwtConfig};
#[cfg(any(test, feature = "testing"))]
pub use jwt::encode_token;
pub use keys::{JwksFetcher, KeySet, KeySourceError, KeyStore};
