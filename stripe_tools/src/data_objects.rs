use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sf_common::{Cents, CURRENCY_CODE_LOWER};

use crate::StripeApiError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutLineItem {
    pub name: String,
    pub unit_amount: Cents,
    pub quantity: i64,
}

/// Everything needed to open a hosted checkout page for one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCheckoutSession {
    pub order_number: String,
    pub customer_email: Option<String>,
    pub line_items: Vec<CheckoutLineItem>,
    /// Added as its own line item when non-zero.
    pub shipping: Cents,
    pub success_url: String,
    pub cancel_url: String,
}

impl NewCheckoutSession {
    /// Encodes the session as the bracketed form fields the Stripe API expects.
    pub fn to_form(&self) -> Result<Vec<(String, String)>, StripeApiError> {
        if self.line_items.is_empty() {
            return Err(StripeApiError::InvalidSession("A checkout session needs at least one line item".into()));
        }
        let mut form = vec![
            ("mode".to_string(), "payment".to_string()),
            ("success_url".to_string(), self.success_url.clone()),
            ("cancel_url".to_string(), self.cancel_url.clone()),
            ("client_reference_id".to_string(), self.order_number.clone()),
            ("metadata[order_number]".to_string(), self.order_number.clone()),
            ("payment_intent_data[metadata][order_number]".to_string(), self.order_number.clone()),
        ];
        if let Some(email) = self.customer_email.as_ref().filter(|e| !e.is_empty()) {
            form.push(("customer_email".to_string(), email.clone()));
        }
        let shipping = CheckoutLineItem { name: "Shipping".into(), unit_amount: self.shipping, quantity: 1 };
        let shipping_line = self.shipping.is_positive().then_some(&shipping);
        for (i, item) in self.line_items.iter().chain(shipping_line).enumerate() {
            if item.quantity < 1 || !item.unit_amount.is_positive() {
                return Err(StripeApiError::InvalidSession(format!("Line item '{}' has no value", item.name)));
            }
            let key = |field: &str| format!("line_items[{i}]{field}");
            form.push((key("[price_data][currency]"), CURRENCY_CODE_LOWER.to_string()));
            form.push((key("[price_data][product_data][name]"), item.name.clone()));
            form.push((key("[price_data][unit_amount]"), item.unit_amount.value().to_string()));
            form.push((key("[quantity]"), item.quantity.to_string()));
        }
        Ok(form)
    }
}

/// The fields of a Stripe Checkout Session object that the storefront reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    /// `open`, `complete` or `expired`
    #[serde(default)]
    pub status: Option<String>,
    /// `paid`, `unpaid` or `no_payment_required`
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub client_reference_id: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl CheckoutSession {
    /// The storefront order this session pays for, from the metadata or the client reference id.
    pub fn order_number(&self) -> Option<&str> {
        self.metadata
            .get("order_number")
            .map(String::as_str)
            .or(self.client_reference_id.as_deref())
            .filter(|s| !s.is_empty())
    }

    pub fn is_paid(&self) -> bool {
        matches!(self.payment_status.as_deref(), Some("paid") | Some("no_payment_required"))
    }
}
