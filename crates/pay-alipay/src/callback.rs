//! # Callback Verification
//!
//! Verifies async notifications and sync return callbacks from the gateway,
//! and dispatches accepted notifications to a `NotificationHandler`.
//!
//! The gateway redelivers a notification (up to 8 times over ~25 hours)
//! until it receives the literal body `success`. Handlers must therefore be
//! idempotent per `out_trade_no`.

use crate::sign::{self, SIGN_FIELD, SIGN_TYPE_FIELD};
use crate::config::SignType;
use pay_core::{ParameterSet, PaymentError, PaymentResult, TradeNotification, TradeStatus};
use rsa::pkcs1v15::VerifyingKey;
use sha2::Sha256;
use tracing::{debug, info, warn};

/// Body acknowledging a notification. Anything else triggers redelivery.
pub const NOTIFY_ACK: &str = "success";

/// Body returned for a rejected notification
pub const NOTIFY_REJECT: &str = "fail";

/// Verifies callback parameter sets against the gateway public key
#[derive(Clone)]
pub struct CallbackVerifier {
    verifying_key: VerifyingKey<Sha256>,
}

impl CallbackVerifier {
    pub fn new(verifying_key: VerifyingKey<Sha256>) -> Self {
        Self { verifying_key }
    }

    /// Accept (`Ok`) or reject (`Err(SignatureInvalid)`) a callback.
    ///
    /// A rejected callback must not change any order state.
    pub fn verify(&self, params: &ParameterSet) -> PaymentResult<TradeNotification> {
        let signature = params
            .get(SIGN_FIELD)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| PaymentError::SignatureInvalid("missing sign".to_string()))?;

        if let Some(sign_type) = params.get(SIGN_TYPE_FIELD) {
            if !sign_type.is_empty() && sign_type != SignType::Rsa2.as_str() {
                return Err(PaymentError::SignatureInvalid(format!(
                    "unsupported sign_type: {}",
                    sign_type
                )));
            }
        }

        sign::verify(params, signature, &self.verifying_key)?;

        let notification = TradeNotification::from_params(params.clone());
        debug!(
            "Verified callback: out_trade_no={:?}, status={:?}",
            notification.out_trade_no, notification.trade_status
        );
        Ok(notification)
    }
}

/// Notification handler trait
///
/// Implement this trait to fulfil orders. Only verified notifications reach
/// it.
#[allow(unused_variables)]
pub trait NotificationHandler: Send + Sync {
    /// Called when the buyer has paid (refunds still possible)
    fn on_trade_success(&self, notification: &TradeNotification) -> PaymentResult<()> {
        info!(
            "Trade success: order={:?}, trade={:?}, amount={:?}",
            notification.out_trade_no, notification.trade_no, notification.total_amount
        );
        Ok(())
    }

    /// Called when a paid trade is finished (no more refunds)
    fn on_trade_finished(&self, notification: &TradeNotification) -> PaymentResult<()> {
        info!("Trade finished: order={:?}", notification.out_trade_no);
        Ok(())
    }

    /// Called when a trade was created but not yet paid
    fn on_wait_buyer_pay(&self, notification: &TradeNotification) -> PaymentResult<()> {
        debug!("Waiting for buyer: order={:?}", notification.out_trade_no);
        Ok(())
    }

    /// Called when a trade is closed unpaid or fully refunded
    fn on_trade_closed(&self, notification: &TradeNotification) -> PaymentResult<()> {
        warn!("Trade closed: order={:?}", notification.out_trade_no);
        Ok(())
    }

    /// Called for notifications without a known status
    fn on_unknown(&self, notification: &TradeNotification) -> PaymentResult<()> {
        debug!("Unhandled notification: {:?}", notification.trade_status);
        Ok(())
    }
}

/// Default handler (just logs notifications)
pub struct LoggingNotificationHandler;

impl NotificationHandler for LoggingNotificationHandler {}

/// Dispatch a verified notification to the matching handler method
pub fn dispatch_notification(
    handler: &dyn NotificationHandler,
    notification: &TradeNotification,
) -> PaymentResult<()> {
    match &notification.trade_status {
        Some(TradeStatus::TradeSuccess) => handler.on_trade_success(notification),
        Some(TradeStatus::TradeFinished) => handler.on_trade_finished(notification),
        Some(TradeStatus::WaitBuyerPay) => handler.on_wait_buyer_pay(notification),
        Some(TradeStatus::TradeClosed) => handler.on_trade_closed(notification),
        Some(TradeStatus::Unknown(_)) | None => handler.on_unknown(notification),
    }
}
