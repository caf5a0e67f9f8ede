//! JWT encoding and decoding utilities.

use error::AuthFailure;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
#[cfg(any(test, feature = "testing"))]
use jsonwebtoken::{EncodingKey, Header};

use crate::claims::Claims;

/// Token validation settings.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// API identifier expected in the `aud` claim
    pub audience: String,
    /// Expected `iss` claim, when pinned
    pub issuer: Option<String>,
    /// Only algorithm accepted for signatures
    pub algorithm: Algorithm,
    /// Allowed clock skew in seconds
    pub leeway_secs: u64,
}

impl JwtConfig {
    /// Create a configuration accepting RS256 tokens for `audience`.
    pub fn new(audience: impl Into<String>) -> Self {
        Self {
            audience: audience.into(),
            issuer: None,
            algorithm: Algorithm::RS256,
            leeway_secs: 30,
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_leeway(mut self, secs: u64) -> Self {
        self.leeway_secs = secs;
        self
    }

    /// Validation rules derived from this configuration.
    pub fn validation(&self) -> Validation {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = self.leeway_secs;
        validation.validate_exp = true;
        validation.set_audience(&[self.audience.as_str()]);
        match &self.issuer {
            Some(issuer) => {
                validation.set_issuer(&[issuer.as_str()]);
                validation.set_required_spec_claims(&["exp", "aud", "iss"]);
            }
            None => validation.set_required_spec_claims(&["exp", "aud"]),
        }
        validation
    }
}

/// Read the key identifier from a token's header without verifying it.
pub fn key_id(token: &str) -> Result<String, AuthFailure> {
    let header = jsonwebtoken::decode_header(token).map_err(|e| {
        tracing::warn!("Failed to parse token header: {}", e);
        AuthFailure::MalformedToken
    })?;

    header.kid.ok_or_else(|| {
        tracing::warn!("Token header carries no kid");
        AuthFailure::MalformedToken
    })
}

/// Encode claims into a signed JWT carrying `kid` in its header.
#[cfg(any(test, feature = "testing"))]
pub fn encode_token(
    claims: &Claims,
    kid: &str,
    key: &EncodingKey,
    algorithm: Algorithm,
) -> Result<String, jsonwebtoken::errors::Error> {
    let mut header = Header::new(algorithm);
    header.kid = Some(kid.to_string());
    jsonwebtoken::encode(&header, claims, key)
}

/// Verify a JWT's signature, expiry and audience, then return its claims.
///
/// Every verification failure collapses into [`AuthFailure::InvalidToken`];
/// the precise cause is only logged.
pub fn decode_token(
    token: &str,
    key: &DecodingKey,
    config: &JwtConfig,
) -> Result<Claims, AuthFailure> {
    let data = jsonwebtoken::decode::<Claims>(token, key, &config.validation()).map_err(|e| {
        match e.kind() {
            ErrorKind::ExpiredSignature => tracing::warn!("Rejected expired token"),
            ErrorKind::InvalidAudience => {
                tracing::warn!("Rejected token for another audience")
            }
            ErrorKind::InvalidIssuer => tracing::warn!("Rejected token from unexpected issuer"),
            ErrorKind::InvalidSignature => tracing::warn!("Rejected token with bad signature"),
            ErrorKind::InvalidAlgorithm => {
                tracing::warn!("Rejected token signed with unexpected algorithm")
            }
            _ => tracing::warn!("Failed to decode JWT: {}", e),
        }
        AuthFailure::InvalidToken
    })?;

    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    fn verification_key() -> DecodingKey {
        testing::key_set()
            .get(testing::TEST_KEY_ID)
            .cloned()
            .expect("fixture key")
    }

    #[test]
    fn test_encode_decode_token() {
        let claims = testing::claims(&["get:drinks-detail"]);
        let token = testing::sign(&claims);

        let decoded = decode_token(&token, &verification_key(), &testing::jwt_config())
            .expect("Failed to decode");

        assert_eq!(decoded.sub.as_deref(), Some("auth0|barista"));
        assert_eq!(decoded.iss, testing::TEST_ISSUER);
        assert!(decoded.has_permission("get:drinks-detail"));
    }

    #[test]
    fn test_key_id_is_read_from_header() {
        let token = testing::sign_with_kid(&testing::claims(&[]), "rotated-key");
        assert_eq!(key_id(&token).unwrap(), "rotated-key");
    }

    #[test]
    fn test_garbage_token_is_malformed() {
        assert_eq!(key_id("not-a-jwt"), Err(AuthFailure::MalformedToken));
        assert_eq!(key_id("a.b.c"), Err(AuthFailure::MalformedToken));
    }

    #[test]
    fn test_header_without_kid_is_malformed() {
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &testing::claims(&[]),
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert_eq!(key_id(&token), Err(AuthFailure::MalformedToken));
    }

    #[test]
    fn test_expired_token_is_invalid() {
        let mut claims = testing::claims(&["get:drinks-detail"]);
        claims.exp = chrono::Utc::now().timestamp() - 3600;
        let token = testing::sign(&claims);

        let result = decode_token(&token, &verification_key(), &testing::jwt_config());
        assert_eq!(result.unwrap_err(), AuthFailure::InvalidToken);
    }

    #[test]
    fn test_wrong_audience_is_invalid() {
        let mut claims = testing::claims(&["get:drinks-detail"]);
        claims.aud = crate::Audience::Single("billing".to_string());
        let token = testing::sign(&claims);

        let result = decode_token(&token, &verification_key(), &testing::jwt_config());
        assert_eq!(result.unwrap_err(), AuthFailure::InvalidToken);
    }

    #[test]
    fn test_audience_list_containing_api_is_accepted() {
        let mut claims = testing::claims(&["get:drinks-detail"]);
        claims.aud = crate::Audience::Multiple(vec![
            testing::TEST_AUDIENCE.to_string(),
            "https://drinks-test.auth0.com/userinfo".to_string(),
        ]);
        let token = testing::sign(&claims);

        assert!(decode_token(&token, &verification_key(), &testing::jwt_config()).is_ok());
    }

    #[test]
    fn test_wrong_issuer_is_invalid() {
        let mut claims = testing::claims(&["get:drinks-detail"]);
        claims.iss = "https://evil.example/".to_string();
        let token = testing::sign(&claims);

        let result = decode_token(&token, &verification_key(), &testing::jwt_config());
        assert_eq!(result.unwrap_err(), AuthFailure::InvalidToken);
    }

    #[test]
    fn test_foreign_signature_is_invalid() {
        let token =
            testing::sign_with_foreign_key(&testing::claims(&["get:drinks-detail"]), testing::TEST_KEY_ID);

        let result = decode_token(&token, &verification_key(), &testing::jwt_config());
        assert_eq!(result.unwrap_err(), AuthFailure::InvalidToken);
    }

    #[test]
    fn test_symmetric_algorithm_is_rejected() {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(testing::TEST_KEY_ID.to_string());
        let token = jsonwebtoken::encode(
            &header,
            &testing::claims(&["get:drinks-detail"]),
            &EncodingKey::from_secret(b"shared-secret"),
        )
        .unwrap();

        let result = decode_token(&token, &verification_key(), &testing::jwt_config());
        assert_eq!(result.unwrap_err(), AuthFailure::InvalidToken);
    }
}
