//! Application context shared by all request handlers.

use std::sync::Arc;

use auth::AuthGuard;
use drinks_service::DrinkService;

use crate::config::GatewayConfig;

/// Everything a handler needs, constructed once at startup.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<GatewayConfig>,
    pub guard: Arc<AuthGuard>,
    pub drinks: DrinkService,
}

impl AppContext {
    pub fn new(config: GatewayConfig, guard: AuthGuard, drinks: DrinkService) -> Self {
        Self {
            config: Arc::new(config),
            guard: Arc::new(guard),
            drinks,
        }
    }
}
