pub mod atomic_metrics;
pub mod catalog;
pub mod gateway_client;
pub mod payment_ledger;
pub mod payment_service;
pub mod phone;
pub mod sessions;

pub use catalog::{ClassCatalog, InMemoryClassCatalog};
pub use gateway_client::{MpesaClient, PaymentGateway};
pub use payment_ledger::{InMemoryPaymentLedger, PaymentLedger};
pub use payment_service::{CallbackDisposition, PaymentService, SummaryResult};
pub use sessions::{SessionStore, StaticSessionStore};
