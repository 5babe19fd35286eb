use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::payment::{CorrelationIds, PaymentAttempt, PaymentStatus, TerminalTransition};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("an attempt already exists for checkout request {0}")]
    DuplicateCorrelation(String),
    #[error("attempt has no correlation identifiers")]
    MissingCorrelation,
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    Applied(PaymentAttempt),
    AlreadyTerminal(PaymentStatus),
    NotFound,
}

/// Persistence port for payment attempts.
#[async_trait]
pub trait PaymentLedger: Send + Sync {
    /// Fails with [`StorageError::DuplicateCorrelation`] if the pair is already recorded.
    async fn create(&self, attempt: PaymentAttempt) -> Result<PaymentAttempt, StorageError>;

    async fn get(&self, id: Uuid) -> Result<Option<PaymentAttempt>, StorageError>;

    async fn find_by_correlation(
        &self,
        correlation: &CorrelationIds,
    ) -> Result<Option<PaymentAttempt>, StorageError>;

    /// Applies `transition` only if the attempt is still `pending`, as one atomic step.
    async fn transition_if_pending(
        &self,
        id: Uuid,
        transition: TerminalTransition,
    ) -> Result<TransitionOutcome, StorageError>;

    async fn list(&self) -> Result<Vec<PaymentAttempt>, StorageError>;
}

pub type PaymentLedgerBox = Arc<dyn PaymentLedger>;

/// In-memory ledger on `DashMap`.
///
/// The conditional transition runs under the shard write lock of the attempt's
/// entry, so two callbacks racing on one attempt cannot both see `pending`.
#[derive(Default, Clone)]
pub struct InMemoryPaymentLedger {
    attempts: Arc<DashMap<Uuid, PaymentAttempt>>,
    by_correlation: Arc<DashMap<CorrelationIds, Uuid>>,
}

impl InMemoryPaymentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }
}

#[async_trait]
impl PaymentLedger for InMemoryPaymentLedger {
    async fn create(&self, attempt: PaymentAttempt) -> Result<PaymentAttempt, StorageError> {
        let correlation = attempt.correlation().ok_or(StorageError::MissingCorrelation)?;

        // Reserve the pair first; the index entry guards uniqueness
        match self.by_correlation.entry(correlation) {
            Entry::Occupied(entry) => Err(StorageError::DuplicateCorrelation(
                entry.key().checkout_request_id.clone(),
            )),
            Entry::Vacant(entry) => {
                self.attempts.insert(attempt.id, attempt.clone());
                entry.insert(attempt.id);
                Ok(attempt)
            }
        }
    }

    async fn get(&self, id: Uuid) -> Result<Option<PaymentAttempt>, StorageError> {
        Ok(self.attempts.get(&id).map(|entry| entry.clone()))
    }

    async fn find_by_correlation(
        &self,
        correlation: &CorrelationIds,
    ) -> Result<Option<PaymentAttempt>, StorageError> {
        let id = match self.by_correlation.get(correlation) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self.attempts.get(&id).map(|entry| entry.clone()))
    }

    async fn transition_if_pending(
        &self,
        id: Uuid,
        transition: TerminalTransition,
    ) -> Result<TransitionOutcome, StorageError> {
        let mut attempt = match self.attempts.get_mut(&id) {
            Some(attempt) => attempt,
            None => return Ok(TransitionOutcome::NotFound),
        };

        if attempt.status.is_terminal() {
            return Ok(TransitionOutcome::AlreadyTerminal(attempt.status));
        }

        attempt.status = transition.status;
        if transition.receipt_number.is_some() {
            attempt.provider_receipt_number = transition.receipt_number;
        }
        attempt.raw_callback = Some(transition.raw_callback);
        attempt.updated_at = Utc::now();

        Ok(TransitionOutcome::Applied(attempt.clone()))
    }

    async fn list(&self) -> Result<Vec<PaymentAttempt>, StorageError> {
        let mut attempts: Vec<_> = self.attempts.iter().map(|entry| entry.clone()).collect();
        attempts.sort_by_key(|attempt| attempt.created_at);
        Ok(attempts)
    }
}
