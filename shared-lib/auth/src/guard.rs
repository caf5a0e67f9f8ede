//! Authorization guard.
//!
//! Turns an `Authorization` header and a required permission into either
//! verified [`Claims`] or an [`AuthFailure`].

use std::sync::Arc;

use error::AuthFailure;

use crate::claims::Claims;
use crate::jwt::{decode_token, key_id, JwtConfig};
use crate::keys::{KeySet, KeyStore};

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthFailure> {
    let header = header.ok_or(AuthFailure::MissingHeader)?;

    let parts: Vec<&str> = header.split(' ').collect();
    match parts.as_slice() {
        ["Bearer", token] if !token.is_empty() => Ok(*token),
        _ => Err(AuthFailure::MalformedHeader),
    }
}

/// Require `scope` to be among the granted permissions.
pub fn check_permission(claims: &Claims, scope: &str) -> Result<(), AuthFailure> {
    let granted = claims
        .permissions
        .as_ref()
        .ok_or(AuthFailure::MissingPermissionsClaim)?;

    if granted.iter().any(|p| p == scope) {
        Ok(())
    } else {
        tracing::warn!(
            "Token for {:?} lacks permission {}",
            claims.sub.as_deref().unwrap_or("<unknown>"),
            scope
        );
        Err(AuthFailure::InsufficientScope)
    }
}

/// Authorize a request against a fixed key set.
///
/// Pure function of its inputs: the same header, scope, keys and config
/// always produce the same outcome (until the token expires).
pub fn authorize_with(
    header: Option<&str>,
    required_scope: &str,
    keys: &KeySet,
    config: &JwtConfig,
) -> Result<Claims, AuthFailure> {
    let token = bearer_token(header)?;
    let kid = key_id(token)?;
    let key = keys.get(&kid).ok_or_else(|| {
        tracing::warn!("No signing key with kid {}", kid);
        AuthFailure::UnknownKey
    })?;

    let claims = decode_token(token, key, config)?;
    check_permission(&claims, required_scope)?;
    Ok(claims)
}

/// Guard shared by all request handlers.
#[derive(Debug, Clone)]
pub struct AuthGuard {
    store: Arc<KeyStore>,
    config: JwtConfig,
}

impl AuthGuard {
    pub fn new(store: Arc<KeyStore>, config: JwtConfig) -> Self {
        Self { store, config }
    }

    /// Authorize a request, loading or rotating signing keys when needed.
    pub async fn authorize(
        &self,
        header: Option<&str>,
        required_scope: &str,
    ) -> Result<Claims, AuthFailure> {
        let token = bearer_token(header)?;
        let kid = key_id(token)?;
        let keys = self.keys_for(&kid).await?;

        authorize_with(header, required_scope, &keys, &self.config)
    }

    /// Key set to verify a token signed with `kid`.
    ///
    /// Loads keys on first use and refreshes once (rate limited) when `kid`
    /// is unknown, which is how key rotation at the provider is picked up.
    async fn keys_for(&self, kid: &str) -> Result<Arc<KeySet>, AuthFailure> {
        if !self.store.is_loaded() {
            if let Err(e) = self.store.refresh_if_stale().await {
                tracing::error!("Signing keys unavailable: {}", e);
            }
            if !self.store.is_loaded() {
                return Err(AuthFailure::KeySourceUnavailable);
            }
            return Ok(self.store.snapshot());
        }

        let keys = self.store.snapshot();
        if keys.contains(kid) {
            return Ok(keys);
        }

        tracing::debug!("Unknown kid {}, refreshing signing keys", kid);
        match self.store.refresh_if_stale().await {
            Ok(Some(fresh)) => Ok(fresh),
            Ok(None) | Err(_) => Ok(self.store.snapshot()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::JwksFetcher;
    use crate::test_server::serve_jwks;
    use crate::testing;
    use std::time::Duration;

    fn fixed_guard() -> AuthGuard {
        AuthGuard::new(
            Arc::new(KeyStore::fixed(testing::key_set())),
            testing::jwt_config(),
        )
    }

    fn authorize(header: Option<&str>, scope: &str) -> Result<Claims, AuthFailure> {
        authorize_with(header, scope, &testing::key_set(), &testing::jwt_config())
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc")), Ok("abc"));
        assert_eq!(bearer_token(None), Err(AuthFailure::MissingHeader));
        assert_eq!(bearer_token(Some("Bearer")), Err(AuthFailure::MalformedHeader));
        assert_eq!(bearer_token(Some("Bearer ")), Err(AuthFailure::MalformedHeader));
        assert_eq!(bearer_token(Some("Basic xyz")), Err(AuthFailure::MalformedHeader));
        assert_eq!(bearer_token(Some("bearer abc")), Err(AuthFailure::MalformedHeader));
        assert_eq!(
            bearer_token(Some("Bearer abc def")),
            Err(AuthFailure::MalformedHeader)
        );
    }

    #[test]
    fn test_valid_token_with_scope_is_authorized() {
        let token = testing::sign(&testing::claims(&["get:drinks-detail"]));
        let header = testing::bearer(&token);

        let claims = authorize(Some(&header), "get:drinks-detail").unwrap();
        assert!(claims.has_permission("get:drinks-detail"));
    }

    #[test]
    fn test_same_token_without_required_scope_is_refused() {
        let token = testing::sign(&testing::claims(&["get:drinks-detail"]));
        let header = testing::bearer(&token);

        assert_eq!(
            authorize(Some(&header), "delete:drinks").unwrap_err(),
            AuthFailure::InsufficientScope
        );
    }

    #[test]
    fn test_missing_header() {
        assert_eq!(
            authorize(None, "get:drinks-detail").unwrap_err(),
            AuthFailure::MissingHeader
        );
    }

    #[test]
    fn test_malformed_token() {
        assert_eq!(
            authorize(Some("Bearer not-a-jwt"), "get:drinks-detail").unwrap_err(),
            AuthFailure::MalformedToken
        );
    }

    #[test]
    fn test_unknown_key() {
        let token = testing::sign_with_kid(&testing::claims(&["get:drinks-detail"]), "retired-key");
        let header = testing::bearer(&token);

        assert_eq!(
            authorize(Some(&header), "get:drinks-detail").unwrap_err(),
            AuthFailure::UnknownKey
        );
    }

    #[test]
    fn test_expired_token() {
        let mut claims = testing::claims(&["get:drinks-detail"]);
        claims.exp = chrono::Utc::now().timestamp() - 600;
        let header = testing::bearer(&testing::sign(&claims));

        assert_eq!(
            authorize(Some(&header), "get:drinks-detail").unwrap_err(),
            AuthFailure::InvalidToken
        );
    }

    #[test]
    fn test_missing_permissions_claim() {
        let claims = testing::claims(&[]).without_permissions();
        let header = testing::bearer(&testing::sign(&claims));

        assert_eq!(
            authorize(Some(&header), "get:drinks-detail").unwrap_err(),
            AuthFailure::MissingPermissionsClaim
        );
    }

    #[test]
    fn test_authorization_is_idempotent() {
        let header = testing::bearer(&testing::sign(&testing::claims(&["post:drinks"])));

        let first = authorize(Some(&header), "post:drinks").map(|c| c.sub);
        let second = authorize(Some(&header), "post:drinks").map(|c| c.sub);
        assert_eq!(first, second);

        let first = authorize(Some(&header), "patch:drinks").map(|c| c.sub);
        let second = authorize(Some(&header), "patch:drinks").map(|c| c.sub);
        assert_eq!(first, second);
        assert_eq!(first, Err(AuthFailure::InsufficientScope));
    }

    #[tokio::test]
    async fn test_guard_uses_loaded_store() {
        let guard = fixed_guard();
        let header = testing::bearer(&testing::sign(&testing::claims(&["delete:drinks"])));

        assert!(guard.authorize(Some(&header), "delete:drinks").await.is_ok());
        assert_eq!(
            guard.authorize(Some(&header), "post:drinks").await.unwrap_err(),
            AuthFailure::InsufficientScope
        );
    }

    #[tokio::test]
    async fn test_guard_reports_unknown_key_without_remote_source() {
        let guard = fixed_guard();
        let token = testing::sign_with_kid(&testing::claims(&["delete:drinks"]), "other");

        assert_eq!(
            guard
                .authorize(Some(&testing::bearer(&token)), "delete:drinks")
                .await
                .unwrap_err(),
            AuthFailure::UnknownKey
        );
    }

    #[tokio::test]
    async fn test_guard_without_reachable_key_source_is_unavailable() {
        // Port 9 (discard) on localhost refuses connections.
        let fetcher = JwksFetcher::new(
            "http://127.0.0.1:9/.well-known/jwks.json",
            Duration::from_millis(500),
        )
        .unwrap();
        let guard = AuthGuard::new(
            Arc::new(KeyStore::remote(fetcher, Duration::from_secs(30))),
            testing::jwt_config(),
        );
        let header = testing::bearer(&testing::sign(&testing::claims(&["delete:drinks"])));

        assert_eq!(
            guard.authorize(Some(&header), "delete:drinks").await.unwrap_err(),
            AuthFailure::KeySourceUnavailable
        );
        // Header problems are still reported before any key lookup.
        assert_eq!(
            guard.authorize(None, "delete:drinks").await.unwrap_err(),
            AuthFailure::MissingHeader
        );
    }

    fn remote_guard(url: &str, min_refresh_interval: Duration) -> AuthGuard {
        let fetcher = JwksFetcher::new(url, Duration::from_secs(2)).unwrap();
        AuthGuard::new(
            Arc::new(KeyStore::remote(fetcher, min_refresh_interval)),
            testing::jwt_config(),
        )
    }

    #[tokio::test]
    async fn test_guard_loads_keys_on_first_use() {
        let server = serve_jwks().await;
        let guard = remote_guard(&server.url, Duration::from_secs(60));
        let header = testing::bearer(&testing::sign(&testing::claims(&["post:drinks"])));

        let claims = guard.authorize(Some(&header), "post:drinks").await.unwrap();
        assert_eq!(claims.sub.as_deref(), Some("auth0|barista"));
        assert_eq!(server.hits(), 1);

        guard.authorize(Some(&header), "post:drinks").await.unwrap();
        assert_eq!(server.hits(), 1);
    }

    #[tokio::test]
    async fn test_guard_refreshes_on_unknown_kid() {
        let server = serve_jwks().await;
        let guard = remote_guard(&server.url, Duration::ZERO);
        let header = testing::bearer(&testing::sign(&testing::claims(&["patch:drinks"])));
        guard.authorize(Some(&header), "patch:drinks").await.unwrap();

        // Provider rotated its keys since the last fetch.
        guard.store.replace(KeySet::new());

        let claims = guard.authorize(Some(&header), "patch:drinks").await.unwrap();
        assert!(claims.has_permission("patch:drinks"));
        assert_eq!(server.hits(), 2);
        assert!(guard.store.snapshot().contains(testing::TEST_KEY_ID));
    }

    #[tokio::test]
    async fn test_guard_unknown_kid_refresh_is_rate_limited() {
        let server = serve_jwks().await;
        let guard = remote_guard(&server.url, Duration::from_secs(60));
        let header = testing::bearer(&testing::sign(&testing::claims(&["patch:drinks"])));
        guard.authorize(Some(&header), "patch:drinks").await.unwrap();

        guard.store.replace(KeySet::new());

        assert_eq!(
            guard.authorize(Some(&header), "patch:drinks").await.unwrap_err(),
            AuthFailure::UnknownKey
        );
        assert_eq!(server.hits(), 1);
    }
}
