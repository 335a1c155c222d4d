//! # Order Types
//!
//! Payment orders, amounts and trade notifications for alipay-checkout.

use crate::error::{PaymentError, PaymentResult};
use crate::params::ParameterSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Largest single payment the gateway accepts, in fen.
const MAX_AMOUNT_FEN: i64 = 100_000_000 * 100;

/// Amount in fen (1/100 yuan).
///
/// Always rendered with exactly two decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    /// Create an amount from a decimal yuan value, rounded to the nearest fen
    pub fn from_yuan(yuan: f64) -> PaymentResult<Self> {
        if !yuan.is_finite() {
            return Err(PaymentError::InvalidAmount {
                message: format!("{} is not a finite number", yuan),
            });
        }
        Self::from_fen((yuan * 100.0).round() as i64)
    }

    /// Create an amount from fen
    pub fn from_fen(fen: i64) -> PaymentResult<Self> {
        if fen <= 0 {
            return Err(PaymentError::InvalidAmount {
                message: "amount must be at least 0.01".to_string(),
            });
        }
        if fen > MAX_AMOUNT_FEN {
            return Err(PaymentError::InvalidAmount {
                message: "amount exceeds 100000000.00".to_string(),
            });
        }
        Ok(Self(fen))
    }

    pub fn fen(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl FromStr for Amount {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let yuan: f64 = s.trim().parse().map_err(|_| PaymentError::InvalidAmount {
            message: format!("'{}' is not a number", s),
        })?;
        Self::from_yuan(yuan)
    }
}

/// Gateway operation used to pay for an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeMethod {
    /// Desktop checkout: the gateway returns a QR code payload
    Precreate,
    /// Mobile web checkout: the browser is redirected to the gateway
    WapPay,
}

impl TradeMethod {
    /// Gateway API method name
    pub fn method_name(&self) -> &'static str {
        match self {
            TradeMethod::Precreate => "alipay.trade.precreate",
            TradeMethod::WapPay => "alipay.trade.wap.pay",
        }
    }

    /// Product code sent inside the business payload
    pub fn product_code(&self) -> &'static str {
        match self {
            TradeMethod::Precreate => "FAST_INSTANT_TRADE_PAY",
            TradeMethod::WapPay => "QUICK_WAP_WAY",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TradeMethod::Precreate => "precreate",
            TradeMethod::WapPay => "wap",
        }
    }
}

impl Default for TradeMethod {
    fn default() -> Self {
        TradeMethod::WapPay
    }
}

impl fmt::Display for TradeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeMethod {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "precreate" | "qrcode" | "pc" => Ok(TradeMethod::Precreate),
            "wap" | "wap_pay" | "mobile" => Ok(TradeMethod::WapPay),
            other => Err(PaymentError::InvalidRequest(format!(
                "Unknown payment flow: {}",
                other
            ))),
        }
    }
}

/// A single payment attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOrder {
    /// Merchant order number, unique per attempt
    pub out_trade_no: String,

    /// Amount to charge
    pub total_amount: Amount,

    /// Order title shown to the payer
    pub subject: String,

    /// Which gateway operation pays this order
    pub method: TradeMethod,
}

impl PaymentOrder {
    /// Create an order with an explicit order number
    pub fn new(
        out_trade_no: impl Into<String>,
        total_amount: Amount,
        subject: impl Into<String>,
        method: TradeMethod,
    ) -> PaymentResult<Self> {
        let out_trade_no = out_trade_no.into();
        let subject = subject.into();

        if out_trade_no.is_empty() || out_trade_no.len() > 64 {
            return Err(PaymentError::InvalidRequest(
                "out_trade_no must be 1 to 64 characters".to_string(),
            ));
        }
        if subject.is_empty() {
            return Err(PaymentError::InvalidRequest(
                "subject must not be empty".to_string(),
            ));
        }

        Ok(Self {
            out_trade_no,
            total_amount,
            subject,
            method,
        })
    }

    /// Create an order with a generated order number
    pub fn generated(
        total_amount: Amount,
        subject: impl Into<String>,
        method: TradeMethod,
    ) -> PaymentResult<Self> {
        Self::new(generate_order_id(), total_amount, subject, method)
    }
}

/// Generate a fresh merchant order number (32 hex chars)
pub fn generate_order_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Trade status reported in gateway notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeStatus {
    /// Trade created, waiting for the buyer to pay
    WaitBuyerPay,
    /// Paid, refunds still possible
    TradeSuccess,
    /// Paid, trade closed for refunds
    TradeFinished,
    /// Unpaid trade closed, or fully refunded
    TradeClosed,
    /// Unknown status (passthrough)
    Unknown(String),
}

impl TradeStatus {
    pub fn parse(value: &str) -> Self {
        match value {
            "WAIT_BUYER_PAY" => TradeStatus::WaitBuyerPay,
            "TRADE_SUCCESS" => TradeStatus::TradeSuccess,
            "TRADE_FINISHED" => TradeStatus::TradeFinished,
            "TRADE_CLOSED" => TradeStatus::TradeClosed,
            other => TradeStatus::Unknown(other.to_string()),
        }
    }

    /// Returns true if the buyer has paid
    pub fn is_paid(&self) -> bool {
        matches!(self, TradeStatus::TradeSuccess | TradeStatus::TradeFinished)
    }
}

/// A verified callback from the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeNotification {
    /// Merchant order number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_trade_no: Option<String>,

    /// Gateway trade number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_no: Option<String>,

    /// Trade status (absent on sync return callbacks)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_status: Option<TradeStatus>,

    /// Amount as sent by the gateway
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify_id: Option<String>,

    /// All received parameters, including `sign`
    pub params: ParameterSet,
}

impl TradeNotification {
    /// Extract the well-known fields from a callback parameter set
    pub fn from_params(params: ParameterSet) -> Self {
        let field = |name: &str| {
            params
                .get(name)
                .filter(|v| !v.is_empty())
                .map(String::from)
        };

        Self {
            out_trade_no: field("out_trade_no"),
            trade_no: field("trade_no"),
            trade_status: params
                .get("trade_status")
                .filter(|v| !v.is_empty())
                .map(TradeStatus::parse),
            total_amount: field("total_amount"),
            app_id: field("app_id"),
            notify_id: field("notify_id"),
            params,
        }
    }

    /// Returns true if the notification reports a completed payment
    pub fn is_paid(&self) -> bool {
        self.trade_status
            .as_ref()
            .map(TradeStatus::is_paid)
            .unwrap_or(false)
    }
}
