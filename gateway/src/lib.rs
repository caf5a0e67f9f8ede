//! Gateway library
//!
//! Exposes the HTTP router and its building blocks so tests and other
//! binaries can assemble the gateway in-process.

pub mod config;
pub mod error;
pub mod router;
pub mod state;

pub use config::{ConfigError, GatewayConfig};
pub use error::ApiError;
pub use router::router;
pub use state::AppContext;
