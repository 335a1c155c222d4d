//! # Key Codec
//!
//! The open-platform console hands out RSA keys as bare base64 blobs with no
//! PEM envelope. This module re-wraps them into PEM and parses them:
//! private keys as PKCS#1, gateway public keys as SPKI.

use pay_core::{PaymentError, PaymentResult};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::{SigningKey, VerifyingKey};
use rsa::pkcs8::DecodePublicKey;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use std::fmt;

const LINE_WIDTH: usize = 64;

/// PEM labels stripped from raw input before re-wrapping
const KNOWN_LABELS: &[&str] = &["RSA PRIVATE KEY", "PRIVATE KEY", "RSA PUBLIC KEY", "PUBLIC KEY"];

/// Which side of the key pair a blob holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// Merchant private key (PKCS#1)
    Private,
    /// Gateway public key (SubjectPublicKeyInfo)
    Public,
}

impl KeyKind {
    fn label(&self) -> &'static str {
        match self {
            KeyKind::Private => "RSA PRIVATE KEY",
            KeyKind::Public => "PUBLIC KEY",
        }
    }
}

/// A parsed key
#[derive(Clone)]
pub enum KeyHandle {
    Private(RsaPrivateKey),
    Public(RsaPublicKey),
}

/// Re-wrap a base64 key blob as PEM.
///
/// Any known PEM header/footer and all whitespace are removed first, so both
/// bare console output and already-wrapped PEM text are accepted.
pub fn wrap_as_pem(raw: &str, kind: KeyKind) -> PaymentResult<String> {
    let mut body = raw.to_string();
    for label in KNOWN_LABELS {
        body = body
            .replace(&format!("-----BEGIN {}-----", label), "")
            .replace(&format!("-----END {}-----", label), "");
    }

    let payload: String = body.chars().filter(|c| !c.is_whitespace()).collect();

    if payload.is_empty() {
        return Err(PaymentError::KeyFormat("key is empty".to_string()));
    }
    if !payload
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'='))
    {
        return Err(PaymentError::KeyFormat(
            "key contains non-base64 characters".to_string(),
        ));
    }

    let label = kind.label();
    let mut pem = String::with_capacity(payload.len() + payload.len() / LINE_WIDTH + 64);
    pem.push_str(&format!("-----BEGIN {}-----\n", label));
    // payload is ASCII, byte chunks are valid str slices
    let mut start = 0;
    while start < payload.len() {
        let end = (start + LINE_WIDTH).min(payload.len());
        pem.push_str(&payload[start..end]);
        pem.push('\n');
        start = end;
    }
    pem.push_str(&format!("-----END {}-----\n", label));

    Ok(pem)
}

/// Decode a PEM envelope and parse the DER payload as `kind`
pub fn parse_pem(pem: &str, kind: KeyKind) -> PaymentResult<KeyHandle> {
    match kind {
        KeyKind::Private => parse_private_pem(pem).map(KeyHandle::Private),
        KeyKind::Public => parse_public_pem(pem).map(KeyHandle::Public),
    }
}

fn parse_private_pem(pem: &str) -> PaymentResult<RsaPrivateKey> {
    RsaPrivateKey::from_pkcs1_pem(pem)
        .map_err(|e| PaymentError::KeyParse(format!("private key: {}", e)))
}

fn parse_public_pem(pem: &str) -> PaymentResult<RsaPublicKey> {
    RsaPublicKey::from_public_key_pem(pem)
        .map_err(|e| PaymentError::KeyParse(format!("public key: {}", e)))
}

/// Wrap and parse a merchant private key
pub fn load_private_key(raw: &str) -> PaymentResult<RsaPrivateKey> {
    parse_private_pem(&wrap_as_pem(raw, KeyKind::Private)?)
}

/// Wrap and parse a gateway public key
pub fn load_public_key(raw: &str) -> PaymentResult<RsaPublicKey> {
    parse_public_pem(&wrap_as_pem(raw, KeyKind::Public)?)
}

/// Key material held by one gateway instance.
///
/// Exactly one signing key; the verifying key is only needed by instances
/// that accept callbacks.
#[derive(Clone)]
pub struct KeyMaterial {
    signing_key: SigningKey<Sha256>,
    verifying_key: Option<VerifyingKey<Sha256>>,
}

impl KeyMaterial {
    /// Load from raw key text as found in configuration
    pub fn load(private_raw: &str, public_raw: Option<&str>) -> PaymentResult<Self> {
        let private_key = load_private_key(private_raw)?;
        let public_key = public_raw.map(load_public_key).transpose()?;
        Ok(Self::from_keys(private_key, public_key))
    }

    pub fn from_keys(private_key: RsaPrivateKey, public_key: Option<RsaPublicKey>) -> Self {
        Self {
            signing_key: SigningKey::<Sha256>::new(private_key),
            verifying_key: public_key.map(VerifyingKey::<Sha256>::new),
        }
    }

    pub fn signing_key(&self) -> &SigningKey<Sha256> {
        &self.signing_key
    }

    pub fn verifying_key(&self) -> Option<&VerifyingKey<Sha256>> {
        self.verifying_key.as_ref()
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("signing_key", &"<redacted>")
            .field("verifying_key", &self.verifying_key.is_some())
            .finish()
    }
}
