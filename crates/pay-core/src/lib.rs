//! # pay-core
//!
//! Core types and traits for the alipay-checkout payment engine.
//!
//! This crate provides:
//! - `PaymentStrategy` trait for implementing payment gateways
//! - `ParameterSet` for flat, key-sorted gateway parameters
//! - `PaymentOrder`, `Amount` and `TradeMethod` for payment attempts
//! - `TradeNotification` and `TradeStatus` for verified callbacks
//! - `PaymentError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use pay_core::{Amount, PaymentOrder, PaymentStrategy, TradeMethod};
//!
//! let order = PaymentOrder::new("ORDER123", "0.01".parse::<Amount>()?, "test", TradeMethod::WapPay)?;
//!
//! // Redirect form or relayed gateway response
//! let response = strategy.create_payment(&order).await?;
//! ```

pub mod error;
pub mod order;
pub mod params;
pub mod strategy;

// Re-exports for convenience
pub use error::{PaymentError, PaymentResult};
pub use order::{
    generate_order_id, Amount, PaymentOrder, TradeMethod, TradeNotification, TradeStatus,
};
pub use params::ParameterSet;
pub use strategy::{BoxedPaymentStrategy, PaymentResponse, PaymentStrategy};
