use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{OrderNumber, PaymentMethod, PaymentStatus, ShippingStatus};

/// Criteria for the admin order search. Empty fields do not constrain the search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderQueryFilter {
    pub order_number: Option<OrderNumber>,
    pub user_id: Option<String>,
    /// Partial, case-insensitive match on the contact email
    pub email: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub payment_status: Vec<PaymentStatus>,
    pub shipping_status: Vec<ShippingStatus>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl OrderQueryFilter {
    pub fn with_order_number(mut self, order_number: OrderNumber) -> Self {
        self.order_number = Some(order_number);
        self
    }

    pub fn with_user_id(mut self, user_id: String) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_email(mut self, email: String) -> Self {
        self.email = Some(email);
        self
    }

    pub fn with_payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = Some(method);
        self
    }

    pub fn with_payment_status(mut self, status: PaymentStatus) -> Self {
        self.payment_status.push(status);
        self
    }

    pub fn with_shipping_status(mut self, status: ShippingStatus) -> Self {
        self.shipping_status.push(status);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.order_number.is_none() &&
            self.user_id.is_none() &&
            self.email.is_none() &&
            self.payment_method.is_none() &&
            self.payment_status.is_empty() &&
            self.shipping_status.is_empty() &&
            self.since.is_none() &&
            self.until.is_none()
    }
}

impl Display for OrderQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "No filters.");
        }
        if let Some(n) = &self.order_number {
            write!(f, "order_number: {n}. ")?;
        }
        if let Some(user_id) = &self.user_id {
            write!(f, "user_id: {user_id}. ")?;
        }
        if let Some(email) = &self.email {
            write!(f, "email: {email}. ")?;
        }
        if let Some(method) = &self.payment_method {
            write!(f, "payment_method: {method}. ")?;
        }
        if !self.payment_status.is_empty() {
            let s = self.payment_status.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(",");
            write!(f, "payment_status: [{s}]. ")?;
        }
        if !self.shipping_status.is_empty() {
            let s = self.shipping_status.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(",");
            write!(f, "shipping_status: [{s}]. ")?;
        }
        if let Some(since) = &self.since {
            write!(f, "since {since}. ")?;
        }
        if let Some(until) = &self.until {
            write!(f, "until {until}. ")?;
        }
        Ok(())
    }
}

/// Catalog listing options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
    /// Case-insensitive match against the product name or description
    pub search: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

impl ProductQuery {
    pub fn in_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn matching(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn include_inactive(mut self) -> Self {
        self.include_inactive = true;
        self
    }
}
