//! # Alipay Configuration
//!
//! Gateway credentials and callback URLs. Loaded once at startup from a TOML
//! file or from environment variables and never reloaded.

use pay_core::PaymentError;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::Path;

/// Production gateway endpoint
pub const DEFAULT_GATEWAY_URL: &str = "https://openapi.alipay.com/gateway.do";

/// Signature algorithm identifier sent as `sign_type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignType {
    /// SHA256withRSA
    #[serde(rename = "RSA2")]
    Rsa2,
    /// SHA1withRSA (accepted in config, not implemented)
    #[serde(rename = "RSA")]
    Rsa,
}

impl SignType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignType::Rsa2 => "RSA2",
            SignType::Rsa => "RSA",
        }
    }

    pub fn parse(value: &str) -> Result<Self, PaymentError> {
        match value.trim() {
            "RSA2" => Ok(SignType::Rsa2),
            "RSA" => Ok(SignType::Rsa),
            other => Err(PaymentError::Configuration(format!(
                "Unknown sign type: {}",
                other
            ))),
        }
    }
}

impl Default for SignType {
    fn default() -> Self {
        SignType::Rsa2
    }
}

/// Alipay open-platform configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct AlipayConfig {
    /// Application id from the open-platform console
    pub app_id: String,

    /// Merchant RSA private key (PKCS#1), bare base64 or PEM
    pub private_key: String,

    /// Gateway public key used to verify callbacks, bare base64 or PEM
    #[serde(default)]
    pub alipay_public_key: Option<String>,

    /// Async notification URL
    pub notify_url: String,

    /// Sync return URL the browser lands on after paying
    #[serde(default)]
    pub return_url: Option<String>,

    #[serde(default = "default_charset")]
    pub charset: String,

    /// Gateway base URL (for testing/mocking)
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,

    #[serde(default)]
    pub sign_type: SignType,
}

fn default_charset() -> String {
    "utf-8".to_string()
}

fn default_gateway_url() -> String {
    DEFAULT_GATEWAY_URL.to_string()
}

impl AlipayConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `ALIPAY_APP_ID`
    /// - `ALIPAY_PRIVATE_KEY`
    /// - `ALIPAY_NOTIFY_URL`
    ///
    /// Optional: `ALIPAY_PUBLIC_KEY`, `ALIPAY_RETURN_URL`, `ALIPAY_CHARSET`,
    /// `ALIPAY_GATEWAY_URL`, `ALIPAY_SIGN_TYPE`.
    pub fn from_env() -> Result<Self, PaymentError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let required = |name: &str| {
            env::var(name).map_err(|_| PaymentError::Configuration(format!("{} not set", name)))
        };
        let optional = |name: &str| env::var(name).ok().filter(|v| !v.trim().is_empty());

        let sign_type = match optional("ALIPAY_SIGN_TYPE") {
            Some(value) => SignType::parse(&value)?,
            None => SignType::default(),
        };

        let config = Self {
            app_id: required("ALIPAY_APP_ID")?,
            private_key: required("ALIPAY_PRIVATE_KEY")?,
            alipay_public_key: optional("ALIPAY_PUBLIC_KEY"),
            notify_url: required("ALIPAY_NOTIFY_URL")?,
            return_url: optional("ALIPAY_RETURN_URL"),
            charset: optional("ALIPAY_CHARSET").unwrap_or_else(default_charset),
            gateway_url: optional("ALIPAY_GATEWAY_URL").unwrap_or_else(default_gateway_url),
            sign_type,
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, PaymentError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| PaymentError::Configuration(format!("Invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PaymentError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PaymentError::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Create config with explicit values (for testing)
    pub fn new(
        app_id: impl Into<String>,
        private_key: impl Into<String>,
        notify_url: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            private_key: private_key.into(),
            alipay_public_key: None,
            notify_url: notify_url.into(),
            return_url: None,
            charset: default_charset(),
            gateway_url: default_gateway_url(),
            sign_type: SignType::default(),
        }
    }

    /// Check required fields and the signature algorithm
    pub fn validate(&self) -> Result<(), PaymentError> {
        if self.app_id.trim().is_empty() {
            return Err(PaymentError::Configuration("app_id is empty".to_string()));
        }
        if self.private_key.trim().is_empty() {
            return Err(PaymentError::Configuration(
                "private_key is empty".to_string(),
            ));
        }
        if self.notify_url.trim().is_empty() {
            return Err(PaymentError::Configuration(
                "notify_url is empty".to_string(),
            ));
        }
        if self.sign_type != SignType::Rsa2 {
            return Err(PaymentError::Configuration(format!(
                "sign_type {} is not supported, use RSA2",
                self.sign_type.as_str()
            )));
        }
        Ok(())
    }

    /// Endpoint requests are sent to, with the charset query parameter
    pub fn gateway_endpoint(&self) -> String {
        format!("{}?charset={}", self.gateway_url, self.charset)
    }

    /// Builder: set the gateway public key
    pub fn with_alipay_public_key(mut self, key: impl Into<String>) -> Self {
        self.alipay_public_key = Some(key.into());
        self
    }

    /// Builder: set the sync return URL
    pub fn with_return_url(mut self, url: impl Into<String>) -> Self {
        self.return_url = Some(url.into());
        self
    }

    /// Builder: set custom gateway URL (for testing)
    pub fn with_gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = url.into();
        self
    }
}

// Keys stay out of logs.
impl fmt::Debug for AlipayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlipayConfig")
            .field("app_id", &self.app_id)
            .field("private_key", &"<redacted>")
            .field("alipay_public_key", &self.alipay_public_key.is_some())
            .field("notify_url", &self.notify_url)
            .field("return_url", &self.return_url)
            .field("charset", &self.charset)
            .field("gateway_url", &self.gateway_url)
            .field("sign_type", &self.sign_type)
            .finish()
    }
}
