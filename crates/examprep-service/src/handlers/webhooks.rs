//! Razorpay payment webhook.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use examprep_core::{PaymentDetails, TransactionType, UserId};

use super::{ok, ApiResponse};
use crate::credits::AddCredits;
use crate::crypto::verify_webhook_signature;
use crate::error::ApiError;
use crate::state::AppState;

/// Razorpay webhook envelope (the parts we read).
#[derive(Debug, Deserialize)]
pub struct RazorpayWebhook {
    /// Event name, e.g. `payment.captured`.
    pub event: String,
    /// Event payload.
    #[serde(default)]
    pub payload: Value,
}

/// Payment entity inside `payload.payment.entity`.
#[derive(Debug, Deserialize)]
pub struct RazorpayPayment {
    /// Razorpay payment ID (`pay_...`).
    pub id: String,
    /// Amount in paise.
    pub amount: i64,
    /// Payment status.
    #[serde(default)]
    pub status: Option<String>,
    /// Order the payment belongs to.
    #[serde(default)]
    pub order_id: Option<String>,
    /// Merchant notes set when the order was created.
    #[serde(default)]
    pub notes: Value,
}

/// Webhook response.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// Whether the webhook was accepted.
    pub received: bool,
    /// Whether this payment had already been credited.
    pub duplicate: bool,
}

/// Handle Razorpay webhooks.
pub async fn razorpay_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<ApiResponse<WebhookResponse>>, ApiError> {
    if let Some(secret) = &state.config.razorpay_webhook_secret {
        let signature = headers
            .get("x-razorpay-signature")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::BadRequest("Missing Razorpay signature".into()))?;

        if !verify_webhook_signature(secret, body.as_bytes(), signature) {
            tracing::warn!("Invalid Razorpay webhook signature");
            return Err(ApiError::BadRequest("Invalid webhook signature".into()));
        }
    }

    let webhook: RazorpayWebhook =
        serde_json::from_str(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    tracing::info!(event = %webhook.event, "Received Razorpay webhook");

    let duplicate = match webhook.event.as_str() {
        "payment.captured" => handle_payment_captured(&state, &webhook.payload).await?,
        _ => {
            tracing::debug!(event = %webhook.event, "Unhandled Razorpay event");
            false
        }
    };

    Ok(ok(WebhookResponse {
        received: true,
        duplicate,
    }))
}

/// Credit the purchase described by a captured payment.
/// Returns `true` when the payment had already been credited.
async fn handle_payment_captured(state: &AppState, payload: &Value) -> Result<bool, ApiError> {
    let entity = payload
        .pointer("/payment/entity")
        .cloned()
        .ok_or_else(|| ApiError::BadRequest("Missing payment entity".into()))?;
    let payment: RazorpayPayment =
        serde_json::from_value(entity).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let user_id: UserId = note_str(&payment.notes, "user_id")
        .ok_or_else(|| ApiError::BadRequest("Missing user_id in payment notes".into()))?
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid user_id in payment notes".into()))?;
    let credits = note_i64(&payment.notes, "credits")
        .ok_or_else(|| ApiError::BadRequest("Missing credits in payment notes".into()))?;

    if state
        .store
        .find_transaction_by_payment_id(&payment.id)
        .await?
        .is_some()
    {
        tracing::info!(payment_id = %payment.id, "Payment already credited");
        return Ok(true);
    }

    let input = AddCredits {
        user_id,
        amount: credits,
        transaction_type: TransactionType::Purchase,
        payment: PaymentDetails {
            gateway_id: payment.order_id.clone(),
            amount_paise: Some(payment.amount),
            status: payment.status.clone(),
            razorpay_payment_id: Some(payment.id.clone()),
        },
        related_paper_id: None,
        notes: Some(format!("Razorpay payment {}", payment.id)),
    };

    match state.credits.add_credits(input).await {
        Ok(outcome) => {
            tracing::info!(
                user_id = %user_id,
                payment_id = %payment.id,
                credits,
                new_balance = outcome.new_balance,
                "Purchase credited"
            );
            Ok(false)
        }
        // A concurrent delivery of the same event won the race.
        Err(ApiError::DuplicateEvent(_)) => Ok(true),
        Err(e) => Err(e),
    }
}

/// Razorpay notes are string-valued, but accept numbers too.
fn note_str(notes: &Value, key: &str) -> Option<String> {
    match notes.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn note_i64(notes: &Value, key: &str) -> Option<i64> {
    note_str(notes, key)?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn notes_accept_strings_and_numbers() {
        let notes = json!({ "credits": "50", "bonus": 5, "flag": true });
        assert_eq!(note_i64(&notes, "credits"), Some(50));
        assert_eq!(note_i64(&notes, "bonus"), Some(5));
        assert_eq!(note_i64(&notes, "flag"), None);
        assert_eq!(note_i64(&notes, "missing"), None);
    }
}
