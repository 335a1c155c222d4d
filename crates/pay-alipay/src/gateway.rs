//! # Alipay Gateway Strategy
//!
//! `PaymentStrategy` implementation for the Alipay open platform.
//! Orders paid by QR code are POSTed to the gateway; mobile orders are
//! rendered as a self-submitting form.

use crate::callback::CallbackVerifier;
use crate::config::AlipayConfig;
use crate::keys::KeyMaterial;
use crate::request::{self, GatewayRequestBuilder};
use async_trait::async_trait;
use pay_core::{
    ParameterSet, PaymentError, PaymentOrder, PaymentResponse, PaymentResult, PaymentStrategy,
    TradeMethod, TradeNotification,
};
use reqwest::Client;
use std::time::Duration;
use tracing::{info, instrument, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Alipay gateway strategy
///
/// Holds the parsed key material for the lifetime of the process. Keys are
/// parsed once in `new`, so a bad key fails at startup rather than per
/// request.
pub struct AlipayGateway {
    config: AlipayConfig,
    keys: KeyMaterial,
    client: Client,
}

impl AlipayGateway {
    /// Create a gateway from validated configuration
    pub fn new(config: AlipayConfig) -> PaymentResult<Self> {
        config.validate()?;

        let keys = KeyMaterial::load(&config.private_key, config.alipay_public_key.as_deref())?;

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PaymentError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        if keys.verifying_key().is_none() {
            warn!("No Alipay public key configured; callbacks will be rejected");
        }

        Ok(Self {
            config,
            keys,
            client,
        })
    }

    /// Create from environment variables
    pub fn from_env() -> PaymentResult<Self> {
        Self::new(AlipayConfig::from_env()?)
    }

    pub fn config(&self) -> &AlipayConfig {
        &self.config
    }

    /// Verifier for callbacks, if a gateway public key is configured
    pub fn callback_verifier(&self) -> Option<CallbackVerifier> {
        self.keys.verifying_key().cloned().map(CallbackVerifier::new)
    }

    fn request_builder(&self) -> GatewayRequestBuilder<'_> {
        GatewayRequestBuilder::new(&self.config, self.keys.signing_key())
    }
}

#[async_trait]
impl PaymentStrategy for AlipayGateway {
    #[instrument(skip(self, order), fields(order_id = %order.out_trade_no, method = %order.method))]
    async fn create_payment(&self, order: &PaymentOrder) -> PaymentResult<PaymentResponse> {
        let signed = self.request_builder().build(order)?;
        let endpoint = self.config.gateway_endpoint();

        info!("Created {} request for {}", order.method, order.total_amount);

        let response = match order.method {
            TradeMethod::Precreate => {
                PaymentResponse::GatewayResponse(request::post(&self.client, &endpoint, signed).await)
            }
            TradeMethod::WapPay => PaymentResponse::RedirectForm(request::render_form(&endpoint, signed)),
        };

        Ok(response)
    }

    fn verify_callback(&self, params: &ParameterSet) -> PaymentResult<TradeNotification> {
        let verifier = self.callback_verifier().ok_or_else(|| {
            PaymentError::Configuration("Alipay public key not configured".to_string())
        })?;
        verifier.verify(params)
    }

    fn provider_name(&self) -> &'static str {
        "alipay"
    }
}
