//! Checkout descriptors for the hosted payment gateway.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::config::PaymentConfig;

/// Everything the gateway's checkout widget needs to open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutOrder {
    pub key: String,
    /// Amount in minor currency units (paise for INR).
    pub amount: i64,
    pub currency: String,
    pub name: String,
    pub description: String,
    pub notes: CheckoutNotes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutNotes {
    pub project_id: Uuid,
}

/// Checkout for a freelancer's advance, given in whole currency units.
pub fn advance_checkout(config: &PaymentConfig, project_id: Uuid, advance: i64) -> CheckoutOrder {
    CheckoutOrder {
        key: config.key_id.clone(),
        amount: advance.saturating_mul(100),
        currency: config.currency.clone(),
        name: config.merchant_name.clone(),
        description: format!("Advance Payment for Project {project_id}"),
        notes: CheckoutNotes { project_id },
    }
}

/// Sent by the client once the gateway reports a successful payment.
#[derive(Debug, Deserialize, Validate)]
pub struct PaymentConfirmation {
    #[validate(length(min = 1, max = 128, message = "payment_id is required"))]
    pub payment_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_is_charged_in_minor_units() {
        let config = PaymentConfig {
            key_id: "rzp_test_key".to_string(),
            currency: "INR".to_string(),
            merchant_name: "AI Mentor".to_string(),
        };
        let project_id = Uuid::now_v7();
        let order = advance_checkout(&config, project_id, 2500);

        assert_eq!(order.amount, 250_000);
        assert_eq!(order.currency, "INR");
        assert_eq!(order.description, format!("Advance Payment for Project {project_id}"));
        assert_eq!(order.notes.project_id, project_id);
    }
}
