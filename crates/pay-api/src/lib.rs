//! # pay-api
//!
//! HTTP API layer for alipay-checkout-rs.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - Payment entry points for the QR code and mobile flows
//! - Gateway notification and return handlers
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/` | Start a payment with the configured flow |
//! | GET | `/pay/precreate` | Desktop QR code payment |
//! | GET | `/pay/wap` | Mobile browser payment |
//! | POST | `/notify` | Async gateway notification |
//! | GET | `/callback` | Browser return page |
//! | GET | `/health` | Health check |

pub mod handlers;
pub mod receipt;
pub mod routes;
pub mod state;

pub use receipt::ReceiptStore;
pub use routes::create_router;
pub use state::{AppConfig, AppState};
