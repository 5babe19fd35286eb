use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{PaymentError, Result};
use crate::models::callback::{CallbackAck, ParsedCallback, StkCallback};
use crate::models::catalog::ClassItem;
use crate::models::payment::{
    CorrelationIds, PaymentAttempt, PaymentStatus, PushPaymentRequest, TerminalTransition,
};
use crate::models::principal::{Capability, Principal};
use crate::services::atomic_metrics::{AtomicMetrics, MetricsSnapshot};
use crate::services::catalog::ClassCatalog;
use crate::services::gateway_client::{GatewayError, PaymentGateway, PushOutcome, PushRequest};
use crate::services::payment_ledger::{PaymentLedgerBox, TransitionOutcome};
use crate::services::phone::normalize_phone;

const ACCOUNT_REFERENCE_MAX: usize = 12;
const DESCRIPTION_NAME_MAX: usize = 25;

#[derive(Debug, Clone)]
pub struct InitiatedPayment {
    pub attempt: PaymentAttempt,
    pub message: String,
    pub provider_data: Value,
}

/// What the callback handler did with one delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackDisposition {
    Malformed,
    Unmatched,
    Duplicate(PaymentStatus),
    Applied(PaymentAttempt),
    PersistenceFailure,
}

impl CallbackDisposition {
    /// Everything past structural validation is acknowledged as received.
    pub fn ack(&self) -> CallbackAck {
        match self {
            CallbackDisposition::Malformed => CallbackAck::rejected(
                "Rejected due to invalid callback data structure from client side.",
            ),
            CallbackDisposition::Unmatched => CallbackAck::accepted(
                "Accepted. (Payment record not found by App - potentially a duplicate callback or test)",
            ),
            CallbackDisposition::Duplicate(_) => {
                CallbackAck::accepted("Accepted. (Transaction already processed)")
            }
            CallbackDisposition::Applied(_) => CallbackAck::accepted("Accepted"),
            CallbackDisposition::PersistenceFailure => CallbackAck::accepted(
                "Accepted with an internal server error during processing.",
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SummaryResult {
    pub count: u64,
    pub count_pending: u64,
    pub count_completed: u64,
    pub count_failed: u64,
    pub count_cancelled: u64,
    pub total_completed_amount: u64,
}

pub struct PaymentService {
    ledger: PaymentLedgerBox,
    catalog: Arc<dyn ClassCatalog>,
    gateway: Arc<dyn PaymentGateway>,
    metrics: Arc<AtomicMetrics>,
}

impl PaymentService {
    pub fn new(
        ledger: PaymentLedgerBox,
        catalog: Arc<dyn ClassCatalog>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            ledger,
            catalog,
            gateway,
            metrics: Arc::new(AtomicMetrics::new()),
        }
    }

    /// Validates the purchase, pushes it to the payer's phone and records a pending
    /// attempt once the gateway has accepted the push.
    pub async fn initiate_push(
        &self,
        payer: Option<&Principal>,
        request: PushPaymentRequest,
    ) -> Result<InitiatedPayment> {
        let payer = payer.ok_or(PaymentError::Unauthenticated)?;
        payer.require(Capability::InitiatePayment)?;

        let item_id = request
            .item_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(PaymentError::MissingField("itemId"))?;
        let amount_input = request.amount.ok_or(PaymentError::MissingField("amount"))?;
        let phone = request
            .phone
            .filter(|phone| !phone.trim().is_empty())
            .ok_or(PaymentError::MissingField("phone"))?;

        let amount = match amount_input.to_amount() {
            Some(0) => return Err(PaymentError::MissingField("amount")),
            Some(amount) => amount,
            None => {
                return Err(PaymentError::InvalidField {
                    field: "amount",
                    reason: "must be a whole number".to_string(),
                })
            }
        };

        info!(payer_id = %payer.id, item_id = %item_id, amount, "STK push requested");
        self.metrics.increment_push_requested();

        let item = self
            .catalog
            .find(&item_id)
            .await?
            .ok_or_else(|| {
                warn!(item_id = %item_id, "Class not found for payment");
                PaymentError::ItemNotFound
            })?;

        if item.price != amount {
            warn!(item_id = %item.id, price = item.price, supplied = amount, "Amount does not match class price");
            return Err(PaymentError::AmountMismatch {
                expected: item.price,
                supplied: amount,
            });
        }

        let phone = normalize_phone(&phone).map_err(|e| {
            warn!(error = %e, "Rejected phone number");
            PaymentError::InvalidPhoneFormat
        })?;

        let token = self.gateway.authenticate().await.map_err(|e| {
            error!(error = %e, "Could not authenticate with M-Pesa");
            PaymentError::Auth(e)
        })?;

        let push = PushRequest {
            amount: item.price,
            phone: phone.clone(),
            account_reference: account_reference(&item.id, &payer.id),
            description: transaction_description(&item),
        };

        let accepted = match self.gateway.initiate_push(&token, &push).await {
            Ok(PushOutcome::Accepted(accepted)) => accepted,
            Ok(PushOutcome::Rejected { reason }) => {
                self.metrics.increment_push_rejected();
                warn!(item_id = %item.id, reason = %reason, "STK push rejected by M-Pesa");
                return Err(PaymentError::UpstreamRejected(reason));
            }
            Err(GatewayError::MissingConfig(setting)) => {
                error!(setting, "M-Pesa push settings missing");
                return Err(PaymentError::Configuration(format!("{setting} is not configured")));
            }
            Err(e) => {
                self.metrics.increment_push_rejected();
                error!(error = %e, "STK push failed");
                return Err(PaymentError::UpstreamRejected(e.to_string()));
            }
        };
        self.metrics.increment_push_accepted();

        let correlation = accepted.correlation.clone();
        let attempt = PaymentAttempt::pending(
            payer.id.clone(),
            item.id.clone(),
            item.price,
            phone,
            correlation.clone(),
        );

        // The push is already on the payer's phone; a failed write here leaves the
        // callback with nothing to match, so keep the ids in the log.
        let attempt = self.ledger.create(attempt).await.map_err(|e| {
            self.metrics.increment_persistence_failure();
            error!(
                error = %e,
                merchant_request_id = %correlation.merchant_request_id,
                checkout_request_id = %correlation.checkout_request_id,
                "Failed to record accepted STK push"
            );
            PaymentError::Persistence(e)
        })?;

        info!(
            attempt_id = %attempt.id,
            checkout_request_id = %correlation.checkout_request_id,
            gateway_response = accepted.response_description.as_deref().unwrap_or(""),
            "Payment attempt created as pending"
        );

        Ok(InitiatedPayment {
            attempt,
            message: "STK Push initiated. Please check your phone for M-Pesa PIN prompt."
                .to_string(),
            provider_data: accepted.raw,
        })
    }

    /// Applies the gateway's asynchronous result. Never fails: the returned
    /// disposition always maps to an acknowledgement for the gateway.
    pub async fn handle_callback(&self, body: &[u8]) -> CallbackDisposition {
        self.metrics.increment_callback_received();

        let Some(parsed) = ParsedCallback::from_slice(body) else {
            self.metrics.increment_callback_malformed();
            error!("Invalid callback structure received from M-Pesa");
            return CallbackDisposition::Malformed;
        };
        self.apply_callback(parsed).await
    }

    async fn apply_callback(&self, parsed: ParsedCallback) -> CallbackDisposition {
        let ParsedCallback { callback, raw } = parsed;
        let correlation = CorrelationIds {
            merchant_request_id: callback.merchant_request_id.clone(),
            checkout_request_id: callback.checkout_request_id.clone(),
        };
        let result_code = callback.result_code();

        info!(
            merchant_request_id = %correlation.merchant_request_id,
            checkout_request_id = %correlation.checkout_request_id,
            result_code = %result_code,
            result_desc = callback.result_desc.as_deref().unwrap_or(""),
            "M-Pesa callback received"
        );

        let attempt = match self.ledger.find_by_correlation(&correlation).await {
            Ok(Some(attempt)) => attempt,
            Ok(None) => return self.unmatched(&correlation),
            Err(e) => return self.swallow_persistence_error(&correlation, e),
        };

        if attempt.status.is_terminal() {
            return self.duplicate(&attempt.id, attempt.status);
        }

        let transition = decide_transition(&callback, raw);
        if transition.status == PaymentStatus::Completed && transition.receipt_number.is_none() {
            warn!(attempt_id = %attempt.id, "Completed callback without MpesaReceiptNumber");
        }

        match self.ledger.transition_if_pending(attempt.id, transition).await {
            Ok(TransitionOutcome::Applied(updated)) => {
                self.metrics.increment_callback_applied();
                info!(
                    attempt_id = %updated.id,
                    status = %updated.status,
                    receipt = updated.provider_receipt_number.as_deref().unwrap_or(""),
                    "Payment attempt updated from callback"
                );
                CallbackDisposition::Applied(updated)
            }
            // Lost the race against a concurrent delivery
            Ok(TransitionOutcome::AlreadyTerminal(status)) => self.duplicate(&attempt.id, status),
            Ok(TransitionOutcome::NotFound) => self.unmatched(&correlation),
            Err(e) => self.swallow_persistence_error(&correlation, e),
        }
    }

    fn unmatched(&self, correlation: &CorrelationIds) -> CallbackDisposition {
        self.metrics.increment_callback_unmatched();
        warn!(
            merchant_request_id = %correlation.merchant_request_id,
            checkout_request_id = %correlation.checkout_request_id,
            "Payment record not found for callback, acknowledging"
        );
        CallbackDisposition::Unmatched
    }

    fn duplicate(&self, attempt_id: &Uuid, status: PaymentStatus) -> CallbackDisposition {
        self.metrics.increment_callback_duplicate();
        warn!(attempt_id = %attempt_id, status = %status, "Payment already processed, acknowledging");
        CallbackDisposition::Duplicate(status)
    }

    fn swallow_persistence_error(
        &self,
        correlation: &CorrelationIds,
        e: crate::services::payment_ledger::StorageError,
    ) -> CallbackDisposition {
        self.metrics.increment_persistence_failure();
        error!(
            error = %e,
            merchant_request_id = %correlation.merchant_request_id,
            checkout_request_id = %correlation.checkout_request_id,
            "Failed to persist callback; needs manual reconciliation"
        );
        CallbackDisposition::PersistenceFailure
    }

    pub async fn get_attempt(&self, principal: &Principal, id: Uuid) -> Result<PaymentAttempt> {
        principal.require(Capability::ViewOwnPayment)?;

        let attempt = self
            .ledger
            .get(id)
            .await?
            .ok_or(PaymentError::AttemptNotFound)?;

        if principal.can(Capability::ViewAnyPayment) {
            return Ok(attempt);
        }
        // Other payers' attempts are reported as missing
        if attempt.payer_id != principal.id {
            return Err(PaymentError::AttemptNotFound);
        }
        Ok(PaymentAttempt {
            raw_callback: None,
            ..attempt
        })
    }

    pub async fn get_summary(&self, principal: &Principal) -> Result<SummaryResult> {
        principal.require(Capability::ViewPaymentSummary)?;

        let mut summary = SummaryResult::default();
        for attempt in self.ledger.list().await? {
            summary.count += 1;
            match attempt.status {
                PaymentStatus::Pending => summary.count_pending += 1,
                PaymentStatus::Completed => {
                    summary.count_completed += 1;
                    summary.total_completed_amount += attempt.amount;
                }
                PaymentStatus::Failed => summary.count_failed += 1,
                PaymentStatus::Cancelled => summary.count_cancelled += 1,
            }
        }
        Ok(summary)
    }

    pub fn get_metrics(&self, principal: &Principal) -> Result<MetricsSnapshot> {
        principal.require(Capability::ViewMetrics)?;
        Ok(self.metrics.snapshot())
    }
}

fn decide_transition(callback: &StkCallback, raw: Value) -> TerminalTransition {
    let (status, receipt_number) = if callback.is_success() {
        (PaymentStatus::Completed, callback.receipt_number())
    } else if callback.is_cancellation() {
        (PaymentStatus::Cancelled, None)
    } else {
        (PaymentStatus::Failed, None)
    };

    TerminalTransition {
        status,
        receipt_number,
        raw_callback: raw,
    }
}

fn last_chars(value: &str, n: usize) -> String {
    let count = value.chars().count();
    value.chars().skip(count.saturating_sub(n)).collect()
}

/// `BOX-<item tail 4>-<payer tail 3>`. The gateway caps the field at 12 bytes,
/// which leaves room for exactly three payer characters after the item tail.
pub fn account_reference(item_id: &str, payer_id: &str) -> String {
    let reference = format!("BOX-{}-{}", last_chars(item_id, 4), last_chars(payer_id, 3));
    truncate_bytes(&reference, ACCOUNT_REFERENCE_MAX)
}

// corta no limite de bytes sem partir um caractere
fn truncate_bytes(value: &str, max: usize) -> String {
    let end = value
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .take_while(|&end| end <= max)
        .last()
        .unwrap_or(0);
    value[..end].to_string()
}

pub fn transaction_description(item: &ClassItem) -> String {
    let name: String = item.name.chars().take(DESCRIPTION_NAME_MAX).collect();
    format!("Class: {name}")
}
