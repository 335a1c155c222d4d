//! # Payment Strategy Trait
//!
//! Strategy pattern trait for payment gateways. The HTTP layer only talks to
//! `PaymentStrategy`; the Alipay gateway is the implementation shipped in
//! `pay-alipay`.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    PaymentStrategy (trait)                  │
//! │  ├── create_payment()                                       │
//! │  ├── verify_callback()                                      │
//! │  └── provider_name()                                        │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                    ┌───────┴───────┐
//!                    │ AlipayGateway │
//!                    └───────────────┘
//! ```

use crate::error::PaymentResult;
use crate::order::{PaymentOrder, TradeNotification};
use crate::params::ParameterSet;
use async_trait::async_trait;
use std::sync::Arc;

/// What the browser receives after a payment was initiated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentResponse {
    /// Textual gateway response relayed as-is (QR code flow).
    /// Holds a fixed failure message if the gateway call failed.
    GatewayResponse(String),

    /// Self-submitting HTML form that redirects to the gateway
    RedirectForm(String),
}

impl PaymentResponse {
    pub fn body(&self) -> &str {
        match self {
            PaymentResponse::GatewayResponse(body) => body,
            PaymentResponse::RedirectForm(html) => html,
        }
    }

    pub fn is_html(&self) -> bool {
        matches!(self, PaymentResponse::RedirectForm(_))
    }
}

/// Core trait for payment gateway implementations.
#[async_trait]
pub trait PaymentStrategy: Send + Sync {
    /// Sign and dispatch a payment request for `order`.
    ///
    /// # Returns
    /// The page content for the browser. Transport failures are folded into
    /// `PaymentResponse::GatewayResponse`; only signing and serialization
    /// failures are returned as errors.
    async fn create_payment(&self, order: &PaymentOrder) -> PaymentResult<PaymentResponse>;

    /// Verify a callback's signature and parse it.
    ///
    /// # Returns
    /// The parsed notification if the signature is valid. A rejected callback
    /// yields `PaymentError::SignatureInvalid` and must cause no side effects.
    fn verify_callback(&self, params: &ParameterSet) -> PaymentResult<TradeNotification>;

    /// Get the provider name (for logging).
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a boxed payment strategy (dynamic dispatch)
pub type BoxedPaymentStrategy = Arc<dyn PaymentStrategy>;
