use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl PaymentStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Correlation pair handed back by the gateway when it accepts a push.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationIds {
    pub merchant_request_id: String,
    pub checkout_request_id: String,
}

/// One push-payment attempt as recorded in the ledger.
///
/// Created `pending` after the gateway accepts the push; the callback moves it to a
/// terminal status exactly once. Attempts are never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAttempt {
    pub id: Uuid,
    pub payer_id: String,
    pub item_id: String,
    pub amount: u64,
    pub phone: String,
    pub provider_merchant_request_id: Option<String>,
    pub provider_checkout_request_id: Option<String>,
    pub provider_receipt_number: Option<String>,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_callback: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentAttempt {
    pub fn pending(
        payer_id: String,
        item_id: String,
        amount: u64,
        phone: String,
        correlation: CorrelationIds,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            payer_id,
            item_id,
            amount,
            phone,
            provider_merchant_request_id: Some(correlation.merchant_request_id),
            provider_checkout_request_id: Some(correlation.checkout_request_id),
            provider_receipt_number: None,
            status: PaymentStatus::Pending,
            raw_callback: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn correlation(&self) -> Option<CorrelationIds> {
        match (
            &self.provider_merchant_request_id,
            &self.provider_checkout_request_id,
        ) {
            (Some(merchant), Some(checkout)) => Some(CorrelationIds {
                merchant_request_id: merchant.clone(),
                checkout_request_id: checkout.clone(),
            }),
            _ => None,
        }
    }
}

/// Terminal outcome decided from a callback, applied by the ledger only while pending.
#[derive(Debug, Clone, PartialEq)]
pub struct TerminalTransition {
    pub status: PaymentStatus,
    pub receipt_number: Option<String>,
    pub raw_callback: serde_json::Value,
}

/// Amount as sent by clients: the legacy web client posts it as a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Number(u64),
    Text(String),
}

impl AmountInput {
    pub fn to_amount(&self) -> Option<u64> {
        match self {
            AmountInput::Number(value) => Some(*value),
            AmountInput::Text(text) => text.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushPaymentRequest {
    #[serde(alias = "classId")]
    pub item_id: Option<String>,
    pub amount: Option<AmountInput>,
    #[serde(alias = "phoneNumber")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushPaymentResponse {
    pub success: bool,
    pub checkout_accepted: bool,
    pub message: String,
    pub payment_id: Uuid,
    pub provider_data: serde_json::Value,
}
