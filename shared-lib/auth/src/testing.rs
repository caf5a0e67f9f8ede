//! Fixture keys and token helpers for tests.
//!
//! The signing key matches the single entry of `fixtures/jwks.json`; the
//! foreign key is unrelated to it and stands in for an attacker's key.

use jsonwebtoken::{Algorithm, EncodingKey};

use crate::claims::Claims;
use crate::jwt::{encode_token, JwtConfig};
use crate::keys::KeySet;

pub const TEST_KEY_ID: &str = "drinks-test-key";
pub const TEST_AUDIENCE: &str = "drinks";
pub const TEST_ISSUER: &str = "https://drinks-test.auth0.com/";

/// JWKS document publishing the fixture signing key.
pub const JWKS_JSON: &str = include_str!("../fixtures/jwks.json");

const SIGNING_KEY_PEM: &[u8] = include_bytes!("../fixtures/signing_key.pem");
const FOREIGN_KEY_PEM: &[u8] = include_bytes!("../fixtures/foreign_key.pem");

/// Key set containing the fixture signing key.
pub fn key_set() -> KeySet {
    KeySet::from_jwks_json(JWKS_JSON).expect("fixture JWKS parses")
}

/// Validation settings matching the fixture tokens.
pub fn jwt_config() -> JwtConfig {
    JwtConfig::new(TEST_AUDIENCE).with_issuer(TEST_ISSUER)
}

/// Claims valid for an hour with the given permissions.
pub fn claims(permissions: &[&str]) -> Claims {
    Claims::new("auth0|barista", TEST_ISSUER, TEST_AUDIENCE, 3600)
        .with_permissions(permissions.iter().copied())
}

/// Sign with the fixture key under its published kid.
pub fn sign(claims: &Claims) -> String {
    sign_with_kid(claims, TEST_KEY_ID)
}

/// Sign with the fixture key under an arbitrary kid.
pub fn sign_with_kid(claims: &Claims, kid: &str) -> String {
    let key = EncodingKey::from_rsa_pem(SIGNING_KEY_PEM).expect("fixture signing key");
    encode_token(claims, kid, &key, Algorithm::RS256).expect("token encodes")
}

/// Sign with a key that is not in the published set.
pub fn sign_with_foreign_key(claims: &Claims, kid: &str) -> String {
    let key = EncodingKey::from_rsa_pem(FOREIGN_KEY_PEM).expect("fixture foreign key");
    encode_token(claims, kid, &key, Algorithm::RS256).expect("token encodes")
}

/// `Authorization` header value for a token.
pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}
