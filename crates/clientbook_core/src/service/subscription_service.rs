//! Subscription use-case service.
//!
//! # Responsibility
//! - Provide the "add product to customer" flow with its defaults.
//! - Delegate lifecycle transitions to the subscription ledger.
//!
//! # Invariants
//! - New subscriptions default to active status, starting today.
//! - End/cancel default the end date to today when the caller omits one.

use crate::model::contact::ContactId;
use crate::model::product::{CustomerProduct, Product, ProductId, SubscriptionId};
use crate::repo::product_repo::{SubscriptionRecord, SubscriptionRepository};
use crate::repo::RepoResult;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;

/// Use-case service wrapper for the subscription ledger.
pub struct SubscriptionService<R: SubscriptionRepository> {
    repo: R,
}

impl<R: SubscriptionRepository> SubscriptionService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Starts an active subscription for a contact/product pair.
    ///
    /// # Contract
    /// - `start_date` defaults to today.
    /// - `price` overrides the product base price when present.
    /// - Fails with a conflict when an active subscription already exists.
    pub fn start_subscription(
        &self,
        contact: ContactId,
        product: ProductId,
        start_date: Option<NaiveDate>,
        price: Option<Decimal>,
        notes: Option<String>,
    ) -> RepoResult<SubscriptionId> {
        let mut subscription =
            CustomerProduct::new(contact, product, start_date.unwrap_or_else(today));
        subscription.actual_price = price;
        subscription.notes = notes;
        self.repo.add_subscription(&subscription)
    }

    /// Activates a pending subscription.
    pub fn activate_subscription(&self, id: SubscriptionId) -> RepoResult<()> {
        self.repo.activate_subscription(id)
    }

    /// Ends an active subscription, defaulting the end date to today.
    pub fn end_subscription(
        &self,
        id: SubscriptionId,
        end_date: Option<NaiveDate>,
    ) -> RepoResult<()> {
        self.repo.end_subscription(id, end_date.unwrap_or_else(today))
    }

    /// Cancels an active subscription, defaulting the end date to today.
    pub fn cancel_subscription(
        &self,
        id: SubscriptionId,
        end_date: Option<NaiveDate>,
    ) -> RepoResult<()> {
        self.repo.cancel_subscription(id, end_date.unwrap_or_else(today))
    }

    /// Removes a subscription record regardless of its status.
    pub fn remove_subscription(&self, id: SubscriptionId) -> RepoResult<()> {
        self.repo.remove_subscription(id)
    }

    /// Lists a contact's subscriptions joined with product fields.
    pub fn list_for_contact(&self, contact: ContactId) -> RepoResult<Vec<SubscriptionRecord>> {
        self.repo.list_for_contact(contact)
    }

    /// Products the contact could subscribe to right now.
    pub fn available_products_for(&self, contact: ContactId) -> RepoResult<Vec<Product>> {
        self.repo.available_products_for(contact)
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}
