//! # Signature Engine
//!
//! RSA2 signing of outgoing requests and verification of callbacks.
//!
//! The signed content is the canonical string of a parameter set: entries
//! with empty values and the `sign` entry are dropped, the rest are sorted by
//! key and joined as `key=value` pairs with `&`. Values are not URL-encoded.
//!
//! Empty values never reach the signature base. A field whose empty value
//! carried meaning would therefore not be covered by the signature; the
//! gateway computes the same string, so this must not change.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use pay_core::{ParameterSet, PaymentError, PaymentResult};
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use sha2::Sha256;

/// Field carrying the base64 signature
pub const SIGN_FIELD: &str = "sign";

/// Field carrying the algorithm identifier; excluded when verifying callbacks
pub const SIGN_TYPE_FIELD: &str = "sign_type";

fn canonical_string(params: &ParameterSet, excluded: &[&str]) -> String {
    params
        .iter()
        .filter(|(key, value)| !value.is_empty() && !excluded.contains(key))
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&")
}

/// Canonical string for outgoing requests
pub fn canonicalize(params: &ParameterSet) -> String {
    canonical_string(params, &[SIGN_FIELD])
}

/// Canonical string for callbacks (`sign_type` is not part of the payload)
pub fn canonicalize_callback(params: &ParameterSet) -> String {
    canonical_string(params, &[SIGN_FIELD, SIGN_TYPE_FIELD])
}

/// Sign `params` with SHA256withRSA (PKCS#1 v1.5), returning standard base64.
pub fn sign(params: &ParameterSet, key: &SigningKey<Sha256>) -> PaymentResult<String> {
    let content = canonicalize(params);
    let signature: Signature = key
        .try_sign(content.as_bytes())
        .map_err(|e| PaymentError::Signing(e.to_string()))?;

    Ok(STANDARD.encode(signature.to_bytes()))
}

/// Verify a callback signature against the gateway public key.
///
/// Every failure, including a malformed signature, is reported as
/// `SignatureInvalid`.
pub fn verify(
    params: &ParameterSet,
    signature_b64: &str,
    key: &VerifyingKey<Sha256>,
) -> PaymentResult<()> {
    verify_content(&canonicalize_callback(params), signature_b64, key)
}

/// Verify an outgoing request the way the gateway does: the embedded `sign`
/// field over the request canonical string, `sign_type` included.
pub fn verify_request(params: &ParameterSet, key: &VerifyingKey<Sha256>) -> PaymentResult<()> {
    let signature = params
        .get(SIGN_FIELD)
        .ok_or_else(|| PaymentError::SignatureInvalid("missing sign".to_string()))?;
    verify_content(&canonicalize(params), signature, key)
}

fn verify_content(
    content: &str,
    signature_b64: &str,
    key: &VerifyingKey<Sha256>,
) -> PaymentResult<()> {
    let bytes = STANDARD
        .decode(signature_b64.trim())
        .map_err(|e| PaymentError::SignatureInvalid(format!("signature is not base64: {}", e)))?;

    let signature = Signature::try_from(bytes.as_slice())
        .map_err(|e| PaymentError::SignatureInvalid(format!("malformed signature: {}", e)))?;

    key.verify(content.as_bytes(), &signature)
        .map_err(|_| PaymentError::SignatureInvalid("signature mismatch".to_string()))
}

pub fn is_valid(params: &ParameterSet, signature_b64: &str, key: &VerifyingKey<Sha256>) -> bool {
    verify(params, signature_b64, key).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::keys::{load_private_key, load_public_key};

    fn merchant_signing_key() -> SigningKey<Sha256> {
        SigningKey::<Sha256>::new(load_private_key(fixtures::MERCHANT_PRIVATE_KEY).unwrap())
    }

    fn merchant_verifying_key() -> VerifyingKey<Sha256> {
        let public = load_private_key(fixtures::MERCHANT_PRIVATE_KEY)
            .unwrap()
            .to_public_key();
        VerifyingKey::<Sha256>::new(public)
    }

    fn sample_params() -> ParameterSet {
        ParameterSet::new()
            .with("app_id", "2021001157638209")
            .with("method", "alipay.trade.precreate")
            .with("charset", "utf-8")
            .with("timestamp", "2024-05-01 12:00:00")
            .with("biz_content", r#"{"out_trade_no":"ORDER123","total_amount":"0.01"}"#)
    }

    #[test]
    fn test_canonicalize_drops_empty_and_sign() {
        let params = ParameterSet::new()
            .with("a", "1")
            .with("b", "")
            .with("sign", "X");

        assert_eq!(canonicalize(&params), "a=1");
    }

    #[test]
    fn test_canonicalize_sign_type() {
        let params = ParameterSet::new()
            .with("b", "2")
            .with("a", "1")
            .with("sign_type", "RSA2")
            .with("sign", "X");

        assert_eq!(canonicalize(&params), "a=1&b=2&sign_type=RSA2");
        assert_eq!(canonicalize_callback(&params), "a=1&b=2");
    }

    #[test]
    fn test_canonicalize_is_order_independent() {
        let forward: ParameterSet = vec![("c", "3"), ("a", "1"), ("b", "2")].into_iter().collect();
        let backward: ParameterSet = vec![("b", "2"), ("a", "1"), ("c", "3")].into_iter().collect();

        assert_eq!(canonicalize(&forward), canonicalize(&backward));
        assert_eq!(canonicalize(&forward), "a=1&b=2&c=3");
    }

    #[test]
    fn test_canonicalize_values_are_raw() {
        let params = ParameterSet::new().with("subject", "a b&c=d");
        assert_eq!(canonicalize(&params), "subject=a b&c=d");
    }

    #[test]
    fn test_sign_known_answer() {
        let key = merchant_signing_key();

        let params = ParameterSet::new().with("c", "3").with("a", "1").with("b", "2");
        assert_eq!(sign(&params, &key).unwrap(), fixtures::KAT_SIMPLE_SIGNATURE.trim());

        let envelope = ParameterSet::new()
            .with("charset", "utf-8")
            .with("biz_content", r#"{"out_trade_no":"ORDER123"}"#)
            .with("app_id", "2021001157638209")
            .with("return_url", "")
            .with("sign", "stale");
        assert_eq!(sign(&envelope, &key).unwrap(), fixtures::KAT_ENVELOPE_SIGNATURE.trim());
    }

    #[test]
    fn test_sign_verify_round_trip() {
        let params = sample_params();
        let signature = sign(&params, &merchant_signing_key()).unwrap();

        assert!(verify(&params, &signature, &merchant_verifying_key()).is_ok());
        assert!(is_valid(&params, &signature, &merchant_verifying_key()));
    }

    #[test]
    fn test_callback_fields_do_not_affect_verification() {
        let params = sample_params();
        let signature = sign(&params, &merchant_signing_key()).unwrap();

        let received = params
            .clone()
            .with("sign", signature.clone())
            .with("sign_type", "RSA2");
        assert!(is_valid(&received, &signature, &merchant_verifying_key()));
    }

    #[test]
    fn test_verify_request_includes_sign_type() {
        let params = sample_params().with("sign_type", "RSA2");
        let signature = sign(&params, &merchant_signing_key()).unwrap();
        let signed = params.with("sign", signature);

        assert!(verify_request(&signed, &merchant_verifying_key()).is_ok());
        assert!(verify_request(&ParameterSet::new(), &merchant_verifying_key()).is_err());
    }

    #[test]
    fn test_mismatched_key_rejected() {
        let params = sample_params();
        let signature = sign(&params, &merchant_signing_key()).unwrap();
        let other = VerifyingKey::<Sha256>::new(load_public_key(fixtures::GATEWAY_PUBLIC_KEY).unwrap());

        assert!(matches!(
            verify(&params, &signature, &other),
            Err(PaymentError::SignatureInvalid(_))
        ));
    }

    #[test]
    fn test_mutated_signature_rejected() {
        let params = sample_params();
        let signature = sign(&params, &merchant_signing_key()).unwrap();
        let bytes = STANDARD.decode(&signature).unwrap();

        for index in [0, bytes.len() / 2, bytes.len() - 1] {
            let mut mutated = bytes.clone();
            mutated[index] ^= 0x01;
            let mutated = STANDARD.encode(&mutated);
            assert!(!is_valid(&params, &mutated, &merchant_verifying_key()));
        }
    }

    #[test]
    fn test_tampered_params_rejected() {
        let params = sample_params();
        let signature = sign(&params, &merchant_signing_key()).unwrap();

        let tampered = params.with("total_amount", "1000.00");
        assert!(!is_valid(&tampered, &signature, &merchant_verifying_key()));
    }

    #[test]
    fn test_malformed_signature_rejected() {
        let params = sample_params();
        let key = merchant_verifying_key();

        assert!(matches!(
            verify(&params, "not base64!!", &key),
            Err(PaymentError::SignatureInvalid(_))
        ));
        assert!(matches!(
            verify(&params, "", &key),
            Err(PaymentError::SignatureInvalid(_))
        ));
        assert!(matches!(
            verify(&params, "AAAA", &key),
            Err(PaymentError::SignatureInvalid(_))
        ));
    }
}
