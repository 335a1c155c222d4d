//! # pay-alipay
//!
//! Alipay open-platform payment strategy for alipay-checkout-rs.
//!
//! Two ways of starting a payment are supported, selected by the order's
//! `TradeMethod`:
//!
//! 1. **Precreate** (`alipay.trade.precreate`) - QR code / desktop flow
//!    - Signed form POSTed server-side to the gateway
//!    - Gateway response relayed to the browser as-is
//!
//! 2. **WapPay** (`alipay.trade.wap.pay`) - mobile browser flow
//!    - Signed envelope rendered as a self-submitting HTML form
//!    - The browser carries it to the gateway
//!
//! Every request is signed with SHA256withRSA (`RSA2`) using the merchant
//! private key. Callbacks are verified against the gateway public key.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pay_alipay::AlipayGateway;
//! use pay_core::{Amount, PaymentOrder, PaymentStrategy, TradeMethod};
//!
//! let gateway = AlipayGateway::from_env()?;
//!
//! let order = PaymentOrder::generated(Amount::from_yuan(0.01)?, "Test order", TradeMethod::WapPay)?;
//! let response = gateway.create_payment(&order).await?;
//!
//! // Serve response.body() to the browser
//! ```
//!
//! ## Notification Handling
//!
//! ```rust,ignore
//! use pay_alipay::{dispatch_notification, NotificationHandler, NOTIFY_ACK};
//!
//! struct Fulfilment;
//!
//! impl NotificationHandler for Fulfilment {
//!     fn on_trade_success(&self, n: &TradeNotification) -> PaymentResult<()> {
//!         // Mark the order paid (idempotently)
//!         Ok(())
//!     }
//! }
//!
//! // In the notify endpoint:
//! let notification = gateway.verify_callback(&params)?;
//! dispatch_notification(&Fulfilment, &notification)?;
//! // reply with NOTIFY_ACK
//! ```

pub mod callback;
pub mod config;
pub mod gateway;
pub mod keys;
pub mod request;
pub mod sign;

// Re-exports
pub use callback::{
    dispatch_notification, CallbackVerifier, LoggingNotificationHandler, NotificationHandler,
    NOTIFY_ACK, NOTIFY_REJECT,
};
pub use config::{AlipayConfig, SignType, DEFAULT_GATEWAY_URL};
pub use gateway::AlipayGateway;
pub use keys::{wrap_as_pem, KeyKind, KeyMaterial};
pub use request::{escape_html, GatewayRequestBuilder, SignedRequest, GATEWAY_REQUEST_FAILED};
