//! Product catalog and subscription domain model.
//!
//! # Responsibility
//! - Define product definitions with their version-chain back-reference.
//! - Define customer subscriptions and their status lifecycle.
//!
//! # Invariants
//! - `version` starts at 1 and grows only through revisions.
//! - The parent back-reference is a lookup relation, never an owning pointer;
//!   chains must stay acyclic.
//! - `end_date` is set if and only if the subscription status is terminal.

use crate::model::contact::ContactId;
use crate::model::ValidationError;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for products.
pub type ProductId = Uuid;
/// Stable identifier for customer subscriptions.
pub type SubscriptionId = Uuid;

/// Catalog availability of a product definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Active,
    Inactive,
    Archived,
}

impl ProductStatus {
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Archived => "archived",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

/// Billing currency for priced products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "GBP")]
    Gbp,
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "EUR")]
    Eur,
}

impl Currency {
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Gbp => "GBP",
            Self::Usd => "USD",
            Self::Eur => "EUR",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "GBP" => Some(Self::Gbp),
            "USD" => Some(Self::Usd),
            "EUR" => Some(Self::Eur),
            _ => None,
        }
    }
}

/// How often a subscribed product bills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BillingFrequency {
    OneTime,
    Monthly,
    Quarterly,
    Annual,
}

impl BillingFrequency {
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::OneTime => "one-time",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Annual => "annual",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "one-time" => Some(Self::OneTime),
            "monthly" => Some(Self::Monthly),
            "quarterly" => Some(Self::Quarterly),
            "annual" => Some(Self::Annual),
            _ => None,
        }
    }
}

/// Product or service definition offered to contacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "id")]
    pub uuid: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub status: ProductStatus,
    pub product_type: Option<String>,
    /// Monotonic revision number within one logical product lineage.
    pub version: i64,
    /// Back-reference to the revision this one supersedes.
    #[serde(rename = "parent_product_id")]
    pub parent_product: Option<ProductId>,
    pub effective_date: NaiveDate,
    pub base_price: Option<Decimal>,
    pub currency: Option<Currency>,
    pub billing_frequency: Option<BillingFrequency>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Creates a first-version product definition.
    pub fn new(name: impl Into<String>, effective_date: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            description: None,
            status: ProductStatus::Active,
            product_type: None,
            version: 1,
            parent_product: None,
            effective_date,
            base_price: None,
            currency: None,
            billing_frequency: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Checks field-level invariants before persistence.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        Ok(())
    }
}

/// Subscription lifecycle state.
///
/// `pending -> active -> {ended, cancelled}`; terminal states accept no
/// further transitions. Removal is record deletion, not a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Pending,
    Active,
    Ended,
    Cancelled,
}

impl SubscriptionStatus {
    /// Whether the subscription has reached a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ended | Self::Cancelled)
    }

    /// Whether an end/cancel transition is allowed from this state.
    pub fn can_close(self) -> bool {
        self == Self::Active
    }

    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Ended => "ended",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "active" => Some(Self::Active),
            "ended" => Some(Self::Ended),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl Display for SubscriptionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db_str())
    }
}

/// A contact's time-bounded assignment to a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerProduct {
    #[serde(rename = "customer_product_id")]
    pub uuid: SubscriptionId,
    #[serde(rename = "contact_id")]
    pub contact: ContactId,
    #[serde(rename = "product_id")]
    pub product: ProductId,
    pub status: SubscriptionStatus,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    /// Negotiated override of the product base price.
    pub actual_price: Option<Decimal>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CustomerProduct {
    /// Creates an active subscription starting on the given date.
    pub fn new(contact: ContactId, product: ProductId, start_date: NaiveDate) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            contact,
            product,
            status: SubscriptionStatus::Active,
            start_date,
            end_date: None,
            actual_price: None,
            notes: None,
            created_at: Utc::now(),
        }
    }

    /// Checks the end-date/status coupling and date ordering.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match (self.status.is_terminal(), self.end_date) {
            (true, None) => return Err(ValidationError::TerminalStatusWithoutEndDate),
            (false, Some(_)) => return Err(ValidationError::EndDateWithoutTerminalStatus),
            _ => {}
        }
        if let Some(end_date) = self.end_date {
            if end_date < self.start_date {
                return Err(ValidationError::EndDateBeforeStartDate);
            }
        }
        Ok(())
    }
}
