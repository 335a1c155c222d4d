//! # Application State
//!
//! Shared state for the Axum application.
//! Contains the payment strategy, the notification handler, the receipt log
//! and configuration.

use crate::receipt::{ReceiptStore, DEFAULT_RECEIPT_PATH};
use anyhow::Context;
use pay_alipay::{AlipayConfig, AlipayGateway, LoggingNotificationHandler, NotificationHandler};
use pay_core::{Amount, BoxedPaymentStrategy, TradeMethod};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

/// Order title used when the request does not name one
pub const DEFAULT_ORDER_SUBJECT: &str = "alipay-checkout test order";

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Amount charged when the request does not name one
    pub pay_amount: Amount,
    pub order_subject: String,
    /// Flow served at `/`
    pub pay_flow: TradeMethod,
    /// Where accepted notifications are recorded
    pub receipt_path: PathBuf,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        let pay_amount = match var("PAY_AMOUNT") {
            Some(value) => value.parse::<Amount>().context("Invalid PAY_AMOUNT")?,
            None => Amount::from_fen(1)?,
        };

        let pay_flow = match var("PAY_FLOW") {
            Some(value) => value.parse::<TradeMethod>().context("Invalid PAY_FLOW")?,
            None => TradeMethod::default(),
        };

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: var("PORT").and_then(|p| p.parse().ok()).unwrap_or(8080),
            environment: var("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            pay_amount,
            order_subject: var("ORDER_SUBJECT").unwrap_or_else(|| DEFAULT_ORDER_SUBJECT.to_string()),
            pay_flow,
            receipt_path: var("RECEIPT_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_RECEIPT_PATH)),
        })
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid socket address {}:{}", self.host, self.port))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Payment gateway
    pub strategy: BoxedPaymentStrategy,
    /// Receives verified notifications
    pub handler: Arc<dyn NotificationHandler>,
    pub receipts: ReceiptStore,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Create a new AppState backed by the Alipay gateway
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        let alipay_config = load_alipay_config()?;

        let gateway = AlipayGateway::new(alipay_config)
            .map_err(|e| anyhow::anyhow!("Failed to initialize Alipay: {}", e))?;

        Ok(Self::with_strategy(config, Arc::new(gateway)))
    }

    /// Assemble state around an existing strategy
    pub fn with_strategy(config: AppConfig, strategy: BoxedPaymentStrategy) -> Self {
        Self {
            strategy,
            handler: Arc::new(LoggingNotificationHandler),
            receipts: ReceiptStore::new(config.receipt_path.clone()),
            config,
        }
    }

    /// Builder: replace the notification handler
    pub fn with_handler(mut self, handler: Arc<dyn NotificationHandler>) -> Self {
        self.handler = handler;
        self
    }
}

/// Load gateway config from `config/alipay.toml`, falling back to `ALIPAY_*`
/// environment variables
fn load_alipay_config() -> anyhow::Result<AlipayConfig> {
    let config_paths = [
        "config/alipay.toml",
        "../config/alipay.toml",
        "../../config/alipay.toml",
    ];

    for path in config_paths {
        if std::path::Path::new(path).exists() {
            let config = AlipayConfig::from_file(path)
                .map_err(|e| anyhow::anyhow!("Failed to load {}: {}", path, e))?;
            tracing::info!("Loaded Alipay config from {}", path);
            return Ok(config);
        }
    }

    tracing::info!("No config/alipay.toml found, reading ALIPAY_* environment");
    AlipayConfig::from_env().map_err(|e| anyhow::anyhow!("Failed to load Alipay config: {}", e))
}
