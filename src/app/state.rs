use std::sync::Arc;

use crate::services::{PaymentService, SessionStore};

#[derive(Clone)]
pub struct AppState {
    pub payments: Arc<PaymentService>,
    pub sessions: Arc<dyn SessionStore>,
}

impl AppState {
    pub fn new(payments: Arc<PaymentService>, sessions: Arc<dyn SessionStore>) -> Self {
        Self { payments, sessions }
    }
}
