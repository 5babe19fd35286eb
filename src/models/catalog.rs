use serde::{Deserialize, Serialize};

/// A purchasable class as seen by the payment flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassItem {
    pub id: String,
    pub name: String,
    pub price: u64,
}
