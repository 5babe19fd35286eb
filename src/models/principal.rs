use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Instructor,
    Staff,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    InitiatePayment,
    ViewOwnPayment,
    ViewAnyPayment,
    ViewPaymentSummary,
    ViewMetrics,
}

impl Role {
    pub fn capabilities(self) -> &'static [Capability] {
        use Capability::*;
        match self {
            Role::User | Role::Instructor => &[InitiatePayment, ViewOwnPayment],
            Role::Staff | Role::Admin => &[
                InitiatePayment,
                ViewOwnPayment,
                ViewAnyPayment,
                ViewPaymentSummary,
                ViewMetrics,
            ],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Instructor => "instructor",
            Role::Staff => "staff",
            Role::Admin => "admin",
        }
    }
}

/// Authenticated caller, produced by the session collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub role: Role,
}

impl Principal {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self { id: id.into(), role }
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.role.capabilities().contains(&capability)
    }

    pub fn require(&self, capability: Capability) -> crate::error::Result<()> {
        if self.can(capability) {
            Ok(())
        } else {
            Err(crate::error::PaymentError::Forbidden(self.role.as_str().to_string()))
        }
    }
}
