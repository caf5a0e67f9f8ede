//! Local JWKS endpoint for tests that exercise the HTTP fetch path.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{http::StatusCode, routing::get, Router};

use crate::testing;

pub struct JwksServer {
    pub url: String,
    /// Number of requests served so far
    pub hits: Arc<AtomicUsize>,
    /// When false the endpoint answers 503
    pub healthy: Arc<AtomicBool>,
}

impl JwksServer {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Serve the fixture JWKS from a local listener.
pub async fn serve_jwks() -> JwksServer {
    let hits = Arc::new(AtomicUsize::new(0));
    let healthy = Arc::new(AtomicBool::new(true));

    let app = Router::new().route(
        "/.well-known/jwks.json",
        get({
            let hits = hits.clone();
            let healthy = healthy.clone();
            move || async move {
                hits.fetch_add(1, Ordering::SeqCst);
                if healthy.load(Ordering::SeqCst) {
                    (StatusCode::OK, testing::JWKS_JSON)
                } else {
                    (StatusCode::SERVICE_UNAVAILABLE, "")
                }
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    JwksServer {
        url: format!("http://{addr}/.well-known/jwks.json"),
        hits,
        healthy,
    }
}
