//! # Request Handlers
//!
//! Axum request handlers for the checkout demo: payment entry points, the
//! async notification endpoint and the browser return page.

use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use pay_alipay::{dispatch_notification, escape_html, NOTIFY_ACK, NOTIFY_REJECT};
use pay_core::{
    generate_order_id, Amount, ParameterSet, PaymentError, PaymentOrder, PaymentResponse,
    TradeMethod,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{error, info, instrument, warn};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Optional overrides accepted by the payment routes
#[derive(Debug, Default, Deserialize)]
pub struct PayQuery {
    /// Amount in yuan, e.g. `0.01`
    #[serde(default)]
    pub total_fee: Option<String>,
    /// Merchant order number (generated when absent)
    #[serde(default)]
    pub out_trade_no: Option<String>,
    /// Order title
    #[serde(default)]
    pub order_name: Option<String>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

fn payment_error_to_response(err: PaymentError) -> (StatusCode, Json<ErrorResponse>) {
    let code = err.status_code();
    let response = ErrorResponse::new(err.to_string(), code);
    (StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR), Json(response))
}

/// Build the order for a payment request, filling gaps from configuration
fn build_order(state: &AppState, query: &PayQuery, method: TradeMethod) -> Result<PaymentOrder, PaymentError> {
    let non_empty = |value: &Option<String>| value.as_deref().filter(|v| !v.trim().is_empty()).map(String::from);

    let amount = match non_empty(&query.total_fee) {
        Some(fee) => fee.parse::<Amount>()?,
        None => state.config.pay_amount,
    };
    let out_trade_no = non_empty(&query.out_trade_no).unwrap_or_else(generate_order_id);
    let subject = non_empty(&query.order_name).unwrap_or_else(|| state.config.order_subject.clone());

    PaymentOrder::new(out_trade_no, amount, subject, method)
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "alipay-checkout",
        "provider": state.strategy.provider_name(),
        "flow": state.config.pay_flow.as_str(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Start a payment with the configured default flow
pub async fn pay_default(State(state): State<AppState>, Query(query): Query<PayQuery>) -> Response {
    let method = state.config.pay_flow;
    start_payment(&state, &query, method).await
}

/// Start a desktop QR code payment
pub async fn precreate(State(state): State<AppState>, Query(query): Query<PayQuery>) -> Response {
    start_payment(&state, &query, TradeMethod::Precreate).await
}

/// Start a mobile browser payment
pub async fn wap_pay(State(state): State<AppState>, Query(query): Query<PayQuery>) -> Response {
    start_payment(&state, &query, TradeMethod::WapPay).await
}

#[instrument(skip(state, query))]
async fn start_payment(state: &AppState, query: &PayQuery, method: TradeMethod) -> Response {
    let order = match build_order(state, query, method) {
        Ok(order) => order,
        Err(e) => {
            warn!("Rejected payment request: {}", e);
            return payment_error_to_response(e).into_response();
        }
    };

    info!(
        "Creating payment: order={}, amount={}, flow={}",
        order.out_trade_no, order.total_amount, method
    );

    match state.strategy.create_payment(&order).await {
        Ok(PaymentResponse::RedirectForm(html)) => Html(html).into_response(),
        Ok(PaymentResponse::GatewayResponse(body)) => body.into_response(),
        Err(e) => {
            error!("Failed to create payment: {}", e);
            payment_error_to_response(e).into_response()
        }
    }
}

/// Async notification from the gateway.
///
/// Replies `success` only after the notification verified and its receipt
/// was written. Anything else makes the gateway redeliver.
#[instrument(skip(state, body))]
pub async fn notify(State(state): State<AppState>, body: Bytes) -> (StatusCode, &'static str) {
    let params: ParameterSet = url::form_urlencoded::parse(&body).into_owned().collect();

    let notification = match state.strategy.verify_callback(&params) {
        Ok(notification) => notification,
        Err(PaymentError::SignatureInvalid(reason)) => {
            warn!("Rejected notification: {}", reason);
            return (StatusCode::BAD_REQUEST, NOTIFY_REJECT);
        }
        Err(e) => {
            error!("Cannot verify notification: {}", e);
            let status = StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            return (status, NOTIFY_REJECT);
        }
    };

    if let Err(e) = state.receipts.append(&notification.params).await {
        error!("Failed to record notification: {}", e);
        return (StatusCode::INTERNAL_SERVER_ERROR, NOTIFY_REJECT);
    }

    if let Err(e) = dispatch_notification(state.handler.as_ref(), &notification) {
        error!("Notification handler error: {}", e);
        return (StatusCode::INTERNAL_SERVER_ERROR, NOTIFY_REJECT);
    }

    info!(
        "Acknowledged notification: order={:?}, status={:?}",
        notification.out_trade_no, notification.trade_status
    );
    (StatusCode::OK, NOTIFY_ACK)
}

/// Page the browser returns to after paying
#[instrument(skip(state, query))]
pub async fn return_callback(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> (StatusCode, Html<String>) {
    let params = ParameterSet::from(query);

    match state.strategy.verify_callback(&params) {
        Ok(notification) => {
            let order_id = notification.out_trade_no.as_deref().unwrap_or("unknown");
            info!("Buyer returned for order {}", order_id);
            (StatusCode::OK, Html(return_page(order_id)))
        }
        Err(e) => {
            warn!("Rejected return callback: {}", e);
            (StatusCode::BAD_REQUEST, Html(return_error_page()))
        }
    }
}

fn return_page(order_id: &str) -> String {
    format!(
        r#"
<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Payment Received</title></head>
<body style="font-family: system-ui; display: flex; justify-content: center; align-items: center; height: 100vh; margin: 0;">
    <div style="padding: 60px; text-align: center;">
        <h1>Payment Received</h1>
        <p>Order: <code>{}</code></p>
    </div>
</body>
</html>
"#,
        escape_html(order_id)
    )
}

fn return_error_page() -> String {
    r#"
<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Verification Failed</title></head>
<body style="font-family: system-ui; display: flex; justify-content: center; align-items: center; height: 100vh; margin: 0;">
    <div style="padding: 60px; text-align: center;">
        <h1>Verification Failed</h1>
        <p style="color: #666;">The payment result could not be verified.</p>
    </div>
</body>
</html>
"#
    .to_string()
}
