//! Router tests driven through `tower::ServiceExt::oneshot`.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use pay_alipay::{sign, AlipayConfig, AlipayGateway, NotificationHandler};
use pay_api::{create_router, AppConfig, AppState};
use pay_core::{
    Amount, ParameterSet, PaymentError, PaymentOrder, PaymentResponse, PaymentResult,
    PaymentStrategy, TradeMethod, TradeNotification,
};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::RsaPrivateKey;
use sha2::Sha256;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const MERCHANT_PRIVATE_KEY: &str = include_str!("../../pay-alipay/tests/fixtures/merchant_private.key");
const GATEWAY_PRIVATE_PEM: &str = include_str!("../../pay-alipay/tests/fixtures/gateway_private.pem");
const GATEWAY_PUBLIC_KEY: &str = include_str!("../../pay-alipay/tests/fixtures/gateway_public.key");

// =============================================================================
// Helpers
// =============================================================================

/// Strategy that echoes the order instead of calling a gateway
struct EchoStrategy;

#[async_trait]
impl PaymentStrategy for EchoStrategy {
    async fn create_payment(&self, order: &PaymentOrder) -> PaymentResult<PaymentResponse> {
        Ok(PaymentResponse::GatewayResponse(format!(
            "{}:{}:{}:{}",
            order.method, order.out_trade_no, order.total_amount, order.subject
        )))
    }

    fn verify_callback(&self, _params: &ParameterSet) -> PaymentResult<TradeNotification> {
        Err(PaymentError::SignatureInvalid("echo".to_string()))
    }

    fn provider_name(&self) -> &'static str {
        "echo"
    }
}

#[derive(Default)]
struct CountingHandler {
    paid: AtomicUsize,
}

impl NotificationHandler for CountingHandler {
    fn on_trade_success(&self, _notification: &TradeNotification) -> PaymentResult<()> {
        self.paid.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn app_config(receipt_path: PathBuf) -> AppConfig {
    AppConfig {
        host: "127.0.0.1".to_string(),
        port: 8080,
        environment: "test".to_string(),
        pay_amount: Amount::from_fen(1).unwrap(),
        order_subject: "demo".to_string(),
        pay_flow: TradeMethod::WapPay,
        receipt_path,
    }
}

fn echo_router(dir: &TempDir) -> Router {
    let state = AppState::with_strategy(app_config(dir.path().join("notify.txt")), Arc::new(EchoStrategy));
    create_router(state)
}

fn alipay_state(receipt_path: PathBuf) -> AppState {
    let config = AlipayConfig::new(
        "2021001157638209",
        MERCHANT_PRIVATE_KEY,
        "https://merchant.example.com/notify",
    )
    .with_alipay_public_key(GATEWAY_PUBLIC_KEY);

    AppState::with_strategy(app_config(receipt_path), Arc::new(AlipayGateway::new(config).unwrap()))
}

/// Sign a callback the way the gateway does
fn gateway_signed(params: ParameterSet) -> ParameterSet {
    let key = RsaPrivateKey::from_pkcs1_pem(GATEWAY_PRIVATE_PEM).unwrap();
    let signature = sign::sign(&params, &SigningKey::<Sha256>::new(key)).unwrap();
    params.with("sign", signature).with("sign_type", "RSA2")
}

fn notification() -> ParameterSet {
    ParameterSet::new()
        .with("app_id", "2021001157638209")
        .with("notify_id", "ac05099524730693a8b330c5ecf72da9786")
        .with("out_trade_no", "ORDER123")
        .with("subject", "demo order")
        .with("total_amount", "0.01")
        .with("trade_no", "2024050122001400000000000001")
        .with("trade_status", "TRADE_SUCCESS")
}

async fn get(router: Router, uri: &str) -> (StatusCode, String) {
    let response = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

async fn post_notify(router: Router, params: &ParameterSet) -> (StatusCode, String) {
    let request = Request::builder()
        .method("POST")
        .uri("/notify")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(params.to_form_encoded()))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

fn receipt_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .map(|content| content.lines().map(String::from).collect())
        .unwrap_or_default()
}

// =============================================================================
// Payment routes
// =============================================================================

#[tokio::test]
async fn test_health() {
    let dir = TempDir::new().unwrap();
    let (status, body) = get(echo_router(&dir), "/health").await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["provider"], "echo");
    assert_eq!(json["flow"], "wap");
}

#[tokio::test]
async fn test_precreate_uses_query_overrides() {
    let dir = TempDir::new().unwrap();
    let (status, body) = get(
        echo_router(&dir),
        "/pay/precreate?total_fee=0.5&out_trade_no=A100&order_name=coffee",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "precreate:A100:0.50:coffee");
}

#[tokio::test]
async fn test_defaults_fill_missing_overrides() {
    let dir = TempDir::new().unwrap();
    let (status, body) = get(echo_router(&dir), "/").await;

    assert_eq!(status, StatusCode::OK);
    let parts: Vec<&str> = body.split(':').collect();
    assert_eq!(parts[0], "wap");
    assert_eq!(parts[1].len(), 32);
    assert_eq!(parts[2], "0.01");
    assert_eq!(parts[3], "demo");
}

#[tokio::test]
async fn test_invalid_total_fee_is_rejected() {
    let dir = TempDir::new().unwrap();

    let (status, _) = get(echo_router(&dir), "/pay/wap?total_fee=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(echo_router(&dir), "/pay/wap?total_fee=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_wap_pay_serves_redirect_form() {
    let dir = TempDir::new().unwrap();
    let router = create_router(alipay_state(dir.path().join("notify.txt")));

    let response = router
        .oneshot(Request::builder().uri("/pay/wap?out_trade_no=ORDER9").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"));

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8(body.to_vec()).unwrap();
    assert!(html.contains("document.forms['alipaysubmit'].submit();"));
    assert!(html.contains("ORDER9"));
}

// =============================================================================
// Notifications
// =============================================================================

#[tokio::test]
async fn test_notify_acknowledges_verified_notification() {
    let dir = TempDir::new().unwrap();
    let receipts = dir.path().join("notify.txt");
    let handler = Arc::new(CountingHandler::default());
    let state = alipay_state(receipts.clone()).with_handler(handler.clone());

    let (status, body) = post_notify(create_router(state), &gateway_signed(notification())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "success");
    assert_eq!(handler.paid.load(Ordering::SeqCst), 1);

    let lines = receipt_lines(&receipts);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("out_trade_no=ORDER123"));
    assert!(lines[0].contains("subject=demo+order"));
}

#[tokio::test]
async fn test_notify_rejects_tampered_notification() {
    let dir = TempDir::new().unwrap();
    let receipts = dir.path().join("notify.txt");
    let handler = Arc::new(CountingHandler::default());
    let state = alipay_state(receipts.clone()).with_handler(handler.clone());

    let mut params = gateway_signed(notification());
    params.insert("total_amount", "999.00");

    let (status, body) = post_notify(create_router(state), &params).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "fail");
    assert_eq!(handler.paid.load(Ordering::SeqCst), 0);
    assert!(!receipts.exists());
}

#[tokio::test]
async fn test_notify_rejects_unsigned_notification() {
    let dir = TempDir::new().unwrap();
    let receipts = dir.path().join("notify.txt");

    let (status, body) = post_notify(create_router(alipay_state(receipts.clone())), &notification()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_ne!(body, "success");
    assert!(!receipts.exists());
}

#[tokio::test]
async fn test_notify_withholds_ack_when_receipt_fails() {
    let dir = TempDir::new().unwrap();
    let receipts = dir.path().join("missing").join("notify.txt");

    let (status, body) = post_notify(
        create_router(alipay_state(receipts)),
        &gateway_signed(notification()),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "fail");
}

// =============================================================================
// Return page
// =============================================================================

#[tokio::test]
async fn test_callback_shows_order_id() {
    let dir = TempDir::new().unwrap();
    let params = gateway_signed(
        ParameterSet::new()
            .with("method", "alipay.trade.wap.pay.return")
            .with("out_trade_no", "ORDER123")
            .with("total_amount", "0.01"),
    );
    let uri = format!("/callback?{}", params.to_form_encoded());

    let (status, body) = get(create_router(alipay_state(dir.path().join("notify.txt"))), &uri).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<code>ORDER123</code>"));
}

#[tokio::test]
async fn test_callback_rejects_unsigned_return() {
    let dir = TempDir::new().unwrap();
    let (status, body) = get(
        create_router(alipay_state(dir.path().join("notify.txt"))),
        "/callback?out_trade_no=ORDER123",
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!body.contains("ORDER123"));
}
