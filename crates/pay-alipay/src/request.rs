//! # Gateway Requests
//!
//! Builds, signs and serializes "create payment" calls.
//!
//! A request goes through BUILD → SIGN → SERIALIZE exactly once. The business
//! payload is JSON-encoded into the `biz_content` field of the outer envelope,
//! the envelope is signed, and the result is either POSTed to the gateway
//! (QR flow) or rendered as an auto-submitting HTML form (mobile flow).

use crate::config::AlipayConfig;
use crate::sign::{self, SIGN_FIELD};
use chrono::{Local, NaiveDateTime};
use pay_core::{ParameterSet, PaymentError, PaymentOrder, PaymentResult};
use reqwest::Client;
use rsa::pkcs1v15::SigningKey;
use serde::Serialize;
use sha2::Sha256;
use tracing::{debug, error, info, instrument};

/// Body relayed to the browser when the gateway call fails
pub const GATEWAY_REQUEST_FAILED: &str = "Gateway request failed";

/// Envelope timestamp layout (local time)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const API_VERSION: &str = "1.0";
const RESPONSE_FORMAT: &str = "JSON";

/// Business payload carried in `biz_content`.
///
/// Fields are declared in alphabetical order so the JSON matches the
/// gateway's reference client byte for byte.
#[derive(Debug, Serialize)]
pub struct BizContent<'a> {
    pub out_trade_no: &'a str,
    pub product_code: &'static str,
    pub subject: &'a str,
    pub total_amount: String,
}

impl<'a> BizContent<'a> {
    pub fn from_order(order: &'a PaymentOrder) -> Self {
        Self {
            out_trade_no: &order.out_trade_no,
            product_code: order.method.product_code(),
            subject: &order.subject,
            total_amount: order.total_amount.to_string(),
        }
    }

    /// Compact JSON encoding
    pub fn to_json(&self) -> PaymentResult<String> {
        serde_json::to_string(self)
            .map_err(|e| PaymentError::Serialization(format!("biz_content: {}", e)))
    }
}

/// A signed envelope, ready to be sent once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    params: ParameterSet,
}

impl SignedRequest {
    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn signature(&self) -> &str {
        self.params.get(SIGN_FIELD).unwrap_or_default()
    }

    pub fn into_params(self) -> ParameterSet {
        self.params
    }
}

/// Assembles and signs the envelope for a `PaymentOrder`
pub struct GatewayRequestBuilder<'a> {
    config: &'a AlipayConfig,
    signing_key: &'a SigningKey<Sha256>,
}

impl<'a> GatewayRequestBuilder<'a> {
    pub fn new(config: &'a AlipayConfig, signing_key: &'a SigningKey<Sha256>) -> Self {
        Self {
            config,
            signing_key,
        }
    }

    /// Unsigned envelope for `order` at `timestamp`
    pub fn envelope(&self, order: &PaymentOrder, timestamp: NaiveDateTime) -> PaymentResult<ParameterSet> {
        let biz_content = BizContent::from_order(order).to_json()?;

        let mut params = ParameterSet::new()
            .with("app_id", self.config.app_id.as_str())
            .with("method", order.method.method_name())
            .with("format", RESPONSE_FORMAT)
            .with("charset", self.config.charset.as_str())
            .with("sign_type", self.config.sign_type.as_str())
            .with("timestamp", timestamp.format(TIMESTAMP_FORMAT).to_string())
            .with("version", API_VERSION)
            .with("notify_url", self.config.notify_url.as_str())
            .with("biz_content", biz_content);

        if let Some(ref return_url) = self.config.return_url {
            params.insert("return_url", return_url.as_str());
        }

        Ok(params)
    }

    /// Build and sign at an explicit timestamp
    pub fn build_at(&self, order: &PaymentOrder, timestamp: NaiveDateTime) -> PaymentResult<SignedRequest> {
        let mut params = self.envelope(order, timestamp)?;
        let signature = sign::sign(&params, self.signing_key)?;
        params.insert(SIGN_FIELD, signature);

        debug!(
            "Signed {} request for order {}",
            order.method.method_name(),
            order.out_trade_no
        );

        Ok(SignedRequest { params })
    }

    /// Build and sign at the current local time
    pub fn build(&self, order: &PaymentOrder) -> PaymentResult<SignedRequest> {
        self.build_at(order, Local::now().naive_local())
    }
}

/// POST the request as a url-encoded form and return the response body.
///
/// Non-2xx statuses are reported as `PaymentError::Transport`.
pub async fn post_form(client: &Client, endpoint: &str, request: SignedRequest) -> PaymentResult<String> {
    let response = client
        .post(endpoint)
        .form(request.params())
        .send()
        .await
        .map_err(|e| PaymentError::Transport(e.to_string()))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| PaymentError::Transport(e.to_string()))?;

    if !status.is_success() {
        return Err(PaymentError::Transport(format!("HTTP {}: {}", status, body)));
    }

    Ok(body)
}

/// POST the request once. Failures are logged and replaced by
/// `GATEWAY_REQUEST_FAILED`; there is no retry.
#[instrument(skip(client, request))]
pub async fn post(client: &Client, endpoint: &str, request: SignedRequest) -> String {
    match post_form(client, endpoint, request).await {
        Ok(body) => {
            info!("Gateway responded: {} bytes", body.len());
            body
        }
        Err(e) => {
            error!("Gateway request failed: {}", e);
            GATEWAY_REQUEST_FAILED.to_string()
        }
    }
}

/// Render the request as a self-submitting HTML form
pub fn render_form(endpoint: &str, request: SignedRequest) -> String {
    let mut html = String::from("<!DOCTYPE html><html><head><meta charset='utf-8'></head><body>");
    html.push_str("Redirecting to the payment page...");
    html.push_str(&format!(
        "<form id='alipaysubmit' name='alipaysubmit' action='{}' method='POST'>",
        escape_html(endpoint)
    ));
    for (name, value) in request.params().iter() {
        html.push_str(&format!(
            "<input type='hidden' name='{}' value='{}'/>",
            escape_html(name),
            escape_html(value)
        ));
    }
    html.push_str("<input type='submit' value='ok' style='display:none;'></form>");
    html.push_str("<script>document.forms['alipaysubmit'].submit();</script>");
    html.push_str("</body></html>");
    html
}

/// Escape text for use in HTML content and single- or double-quoted attributes
pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
