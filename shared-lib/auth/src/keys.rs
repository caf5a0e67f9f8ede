//! Signing key set and its refreshable store.
//!
//! The identity provider publishes its public keys as a JWKS document. The
//! [`KeyStore`] keeps the last-known-good [`KeySet`] behind an atomic pointer
//! swap so verifications never wait on a refresh.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use jsonwebtoken::jwk::{JwkSet, PublicKeyUse};
use jsonwebtoken::DecodingKey;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

const MIN_REFRESH_PERIOD: Duration = Duration::from_secs(1);

/// Errors that can occur while loading signing keys.
#[derive(Debug, Error)]
pub enum KeySourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Key endpoint returned status {0}")]
    Status(u16),

    #[error("Invalid key document: {0}")]
    InvalidDocument(String),

    #[error("No remote key source configured")]
    NotConfigured,
}

/// Public keys indexed by key identifier (`kid`).
#[derive(Clone, Default)]
pub struct KeySet {
    keys: HashMap<String, DecodingKey>,
}

impl KeySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a key set from a parsed JWKS document.
    ///
    /// Keys without a `kid`, encryption keys and keys that cannot be turned
    /// into a verification key are skipped.
    pub fn from_jwks(jwks: &JwkSet) -> Self {
        let mut set = Self::new();
        for jwk in &jwks.keys {
            let Some(kid) = jwk.common.key_id.clone() else {
                tracing::debug!("Skipping JWK without kid");
                continue;
            };
            if matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)) {
                tracing::debug!("Skipping encryption key {}", kid);
                continue;
            }
            match DecodingKey::from_jwk(jwk) {
                Ok(key) => set.insert(kid, key),
                Err(e) => tracing::warn!("Skipping unusable JWK {}: {}", kid, e),
            }
        }
        set
    }

    /// Parse a JWKS JSON document.
    pub fn from_jwks_json(json: &str) -> Result<Self, KeySourceError> {
        let jwks: JwkSet = serde_json::from_str(json)
            .map_err(|e| KeySourceError::InvalidDocument(e.to_string()))?;
        Ok(Self::from_jwks(&jwks))
    }

    pub fn insert(&mut self, kid: impl Into<String>, key: DecodingKey) {
        self.keys.insert(kid.into(), key);
    }

    pub fn get(&self, kid: &str) -> Option<&DecodingKey> {
        self.keys.get(kid)
    }

    pub fn contains(&self, kid: &str) -> bool {
        self.keys.contains_key(kid)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn key_ids(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }
}

impl fmt::Debug for KeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&str> = self.key_ids().collect();
        ids.sort_unstable();
        f.debug_struct("KeySet").field("kids", &ids).finish()
    }
}

/// Fetches the published JWKS document over HTTP.
#[derive(Debug, Clone)]
pub struct JwksFetcher {
    url: String,
    client: reqwest::Client,
}

impl JwksFetcher {
    /// Create a fetcher whose requests give up after `timeout`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, KeySourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(format!("drinks-auth/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Download and parse the key document.
    pub async fn fetch(&self) -> Result<KeySet, KeySourceError> {
        tracing::debug!("Fetching signing keys from {}", self.url);

        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(KeySourceError::Status(response.status().as_u16()));
        }

        let jwks: JwkSet = response
            .json()
            .await
            .map_err(|e| KeySourceError::InvalidDocument(e.to_string()))?;

        let keys = KeySet::from_jwks(&jwks);
        if keys.is_empty() {
            return Err(KeySourceError::InvalidDocument(
                "document contains no usable signing keys".to_string(),
            ));
        }
        Ok(keys)
    }
}

/// Shared, read-mostly holder of the current signing key set.
pub struct KeyStore {
    current: ArcSwap<KeySet>,
    loaded: AtomicBool,
    source: Option<JwksFetcher>,
    last_refresh: Mutex<Option<Instant>>,
    min_refresh_interval: Duration,
}

impl KeyStore {
    /// A store with a fixed key set and no remote source.
    pub fn fixed(keys: KeySet) -> Self {
        Self {
            current: ArcSwap::from_pointee(keys),
            loaded: AtomicBool::new(true),
            source: None,
            last_refresh: Mutex::new(None),
            min_refresh_interval: Duration::ZERO,
        }
    }

    /// An initially empty store that loads keys from `source`.
    ///
    /// On-demand refreshes are spaced at least `min_refresh_interval` apart.
    pub fn remote(source: JwksFetcher, min_refresh_interval: Duration) -> Self {
        Self {
            current: ArcSwap::from_pointee(KeySet::new()),
            loaded: AtomicBool::new(false),
            source: Some(source),
            last_refresh: Mutex::new(None),
            min_refresh_interval,
        }
    }

    /// Snapshot of the current key set. Holding it keeps it alive across a swap.
    pub fn snapshot(&self) -> Arc<KeySet> {
        self.current.load_full()
    }

    /// Whether a key set has ever been installed.
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    /// Install a new key set.
    pub fn replace(&self, keys: KeySet) {
        tracing::info!("Installed signing key set with {} key(s)", keys.len());
        self.current.store(Arc::new(keys));
        self.loaded.store(true, Ordering::Release);
    }

    /// Fetch the key set now, regardless of when it was last fetched.
    ///
    /// On failure the previous key set stays in place.
    pub async fn refresh(&self) -> Result<Arc<KeySet>, KeySourceError> {
        let mut last = self.last_refresh.lock().await;
        self.fetch_and_swap(&mut last).await
    }

    /// Fetch the key set unless a fetch happened within the minimum interval.
    ///
    /// Returns `Ok(None)` when the refresh was skipped.
    pub async fn refresh_if_stale(&self) -> Result<Option<Arc<KeySet>>, KeySourceError> {
        let mut last = self.last_refresh.lock().await;
        if let Some(at) = *last {
            if at.elapsed() < self.min_refresh_interval {
                return Ok(None);
            }
        }
        self.fetch_and_swap(&mut last).await.map(Some)
    }

    async fn fetch_and_swap(
        &self,
        last: &mut Option<Instant>,
    ) -> Result<Arc<KeySet>, KeySourceError> {
        let source = self.source.as_ref().ok_or(KeySourceError::NotConfigured)?;
        *last = Some(Instant::now());

        match source.fetch().await {
            Ok(keys) => {
                self.replace(keys);
                Ok(self.snapshot())
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to refresh signing keys from {}: {}; keeping {} cached key(s)",
                    source.url(),
                    e,
                    self.snapshot().len()
                );
                Err(e)
            }
        }
    }

    /// Refresh the key set every `every` in the background.
    ///
    /// A zero period is raised to one second.
    pub fn spawn_refresh_task(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        let every = every.max(MIN_REFRESH_PERIOD);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = self.refresh().await {
                    tracing::debug!("Periodic key refresh failed: {}", e);
                }
            }
        })
    }
}

impl fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyStore")
            .field("current", &self.snapshot())
            .field("loaded", &self.is_loaded())
            .field("source", &self.source.as_ref().map(JwksFetcher::url))
            .finish()
    }
}
