//! # TaxiHub Gateway
//!
//! Edge gateway in front of the TaxiHub driver and passenger services.
//!
//! This crate provides:
//! - **Rate Limiting**: Per-client token buckets keyed by source address
//! - **Authentication**: HS256 bearer tokens plus a shared API key
//! - **Forwarding**: Transparent relay of method, path, query, headers and body
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   HTTP Clients                      │
//! └─────────────────────────┬───────────────────────────┘
//!                           │
//! ┌─────────────────────────▼───────────────────────────┐
//! │                  TaxiHub Gateway                    │
//! ├─────────────────────────────────────────────────────┤
//! │  Rate Limiter  →  Credential Gate  →  Proxy         │
//! ├──────────────────────────┬──────────────────────────┤
//! │     /drivers*            │      /passengers*        │
//! └────────────┬─────────────┴─────────────┬────────────┘
//!              │                           │
//!      ┌───────▼────────┐         ┌────────▼────────┐
//!      │ driver-service │         │passenger-service│
//!      └────────────────┘         └─────────────────┘
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod limiter;
pub mod middleware;
pub mod proxy;
pub mod routes;
pub mod server;
pub mod state;

pub use config::{ConfigError, GatewayConfig};
pub use error::{ErrorCode, GatewayError};
pub use limiter::ClientLimiter;
pub use server::{run_server, run_server_with_shutdown};
pub use state::AppState;
