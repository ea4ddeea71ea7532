//! Product catalog and subscription ledger: contracts and SQLite
//! implementation.
//!
//! # Responsibility
//! - Provide product CRUD plus the revision (version-chain) operation.
//! - Provide the subscription lifecycle over `customer_products`.
//!
//! # Invariants
//! - Version chains are extended only through `create_revision`, so they stay
//!   acyclic by construction; `version_chain` still guards against corrupted
//!   storage instead of looping.
//! - At most one active subscription per (contact, product); the partial
//!   unique index backs the check atomically.
//! - Terminal subscription states accept no further transitions; removal is
//!   record deletion and is allowed from any state.

use crate::model::contact::ContactId;
use crate::model::product::{
    CustomerProduct, Product, ProductId, ProductStatus, SubscriptionId, SubscriptionStatus,
};
use crate::model::ValidationError;
use crate::repo::contact_repo::contact_kind;
use crate::repo::{
    ensure_connection_ready, is_foreign_key_violation, is_unique_violation, parse_uuid, RepoError,
    RepoResult,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::collections::HashSet;
use std::str::FromStr;
use uuid::Uuid;

const PRODUCT_SELECT_SQL: &str = "SELECT
    product_uuid,
    name,
    description,
    status,
    product_type,
    version,
    parent_product_uuid,
    effective_date,
    base_price,
    currency,
    billing_frequency,
    created_at,
    updated_at
FROM products";

const PRODUCT_COLUMNS: &[&str] = &[
    "product_uuid",
    "name",
    "status",
    "version",
    "parent_product_uuid",
    "effective_date",
    "created_at",
    "updated_at",
];

const SUBSCRIPTION_COLUMNS: &[&str] = &[
    "customer_product_uuid",
    "contact_uuid",
    "product_uuid",
    "status",
    "start_date",
    "end_date",
    "actual_price",
    "notes",
    "created_at",
];

/// Query options for product listings.
#[derive(Debug, Clone, Default)]
pub struct ProductListQuery {
    pub status: Option<ProductStatus>,
}

/// Subscription row joined with product fields, as listed on a contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionRecord {
    pub customer_product_id: SubscriptionId,
    pub product_id: ProductId,
    pub product_name: String,
    pub product_type: Option<String>,
    pub status: SubscriptionStatus,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub actual_price: Option<Decimal>,
    pub notes: Option<String>,
}

/// Repository interface for the product catalog.
pub trait ProductRepository {
    fn create_product(&self, product: &Product) -> RepoResult<ProductId>;
    /// Creates the next revision of an existing product lineage.
    fn create_revision(&self, parent: ProductId, draft: &Product) -> RepoResult<Product>;
    /// Updates catalog fields; `version` and the parent back-reference are
    /// immutable after creation.
    fn update_product(&self, product: &Product) -> RepoResult<()>;
    fn get_product(&self, id: ProductId) -> RepoResult<Option<Product>>;
    fn list_products(&self, query: &ProductListQuery) -> RepoResult<Vec<Product>>;
    /// Hard delete; rejected while subscriptions reference the product.
    fn delete_product(&self, id: ProductId) -> RepoResult<()>;
    /// Walks the parent back-references from the given product to the root.
    fn version_chain(&self, id: ProductId) -> RepoResult<Vec<Product>>;
}

/// Repository interface for the subscription ledger.
pub trait SubscriptionRepository {
    fn add_subscription(&self, subscription: &CustomerProduct) -> RepoResult<SubscriptionId>;
    fn get_subscription(&self, id: SubscriptionId) -> RepoResult<Option<CustomerProduct>>;
    /// `pending -> active`.
    fn activate_subscription(&self, id: SubscriptionId) -> RepoResult<()>;
    /// `active -> ended`; stamps the end date.
    fn end_subscription(&self, id: SubscriptionId, end_date: NaiveDate) -> RepoResult<()>;
    /// `active -> cancelled`; stamps the end date.
    fn cancel_subscription(&self, id: SubscriptionId, end_date: NaiveDate) -> RepoResult<()>;
    /// Hard delete, permitted regardless of status.
    fn remove_subscription(&self, id: SubscriptionId) -> RepoResult<()>;
    /// Subscription rows for one contact joined with product fields.
    fn list_for_contact(&self, contact: ContactId) -> RepoResult<Vec<SubscriptionRecord>>;
    /// Active-status products the contact holds no active subscription for.
    fn available_products_for(&self, contact: ContactId) -> RepoResult<Vec<Product>>;
}

/// SQLite-backed product catalog and subscription ledger.
pub struct SqliteProductRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProductRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "products", PRODUCT_COLUMNS)?;
        ensure_connection_ready(conn, "customer_products", SUBSCRIPTION_COLUMNS)?;
        Ok(Self { conn })
    }

    fn insert_product(&self, product: &Product) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO products (
                product_uuid,
                name,
                description,
                status,
                product_type,
                version,
                parent_product_uuid,
                effective_date,
                base_price,
                currency,
                billing_frequency,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13);",
            params![
                product.uuid.to_string(),
                product.name.as_str(),
                product.description.as_deref(),
                product.status.as_db_str(),
                product.product_type.as_deref(),
                product.version,
                product.parent_product.map(|value| value.to_string()),
                product.effective_date,
                product.base_price.map(|value| value.to_string()),
                product.currency.map(|value| value.as_db_str()),
                product.billing_frequency.map(|value| value.as_db_str()),
                product.created_at,
                product.updated_at,
            ],
        )?;
        Ok(())
    }

    fn subscription_status(&self, id: SubscriptionId) -> RepoResult<Option<SubscriptionStatus>> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT status FROM customer_products WHERE customer_product_uuid = ?1;",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        match value {
            None => Ok(None),
            Some(text) => Ok(Some(parse_subscription_status(&text)?)),
        }
    }

    fn close_subscription(
        &self,
        id: SubscriptionId,
        target: SubscriptionStatus,
        end_date: NaiveDate,
    ) -> RepoResult<()> {
        let status = self
            .subscription_status(id)?
            .ok_or(RepoError::SubscriptionNotFound(id))?;
        if !status.can_close() {
            return Err(RepoError::SubscriptionNotActive { id, status });
        }

        let start_date: NaiveDate = self.conn.query_row(
            "SELECT start_date FROM customer_products WHERE customer_product_uuid = ?1;",
            [id.to_string()],
            |row| row.get(0),
        )?;
        if end_date < start_date {
            return Err(RepoError::Validation(ValidationError::EndDateBeforeStartDate));
        }

        self.conn.execute(
            "UPDATE customer_products
             SET status = ?1, end_date = ?2
             WHERE customer_product_uuid = ?3;",
            params![target.as_db_str(), end_date, id.to_string()],
        )?;

        Ok(())
    }
}

impl ProductRepository for SqliteProductRepository<'_> {
    fn create_product(&self, product: &Product) -> RepoResult<ProductId> {
        product.validate()?;
        self.insert_product(product)?;
        Ok(product.uuid)
    }

    fn create_revision(&self, parent: ProductId, draft: &Product) -> RepoResult<Product> {
        draft.validate()?;

        let parent_version: i64 = self
            .conn
            .query_row(
                "SELECT version FROM products WHERE product_uuid = ?1;",
                [parent.to_string()],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(RepoError::ProductNotFound(parent))?;

        let mut revision = draft.clone();
        revision.uuid = Uuid::new_v4();
        revision.version = parent_version + 1;
        revision.parent_product = Some(parent);
        let now = Utc::now();
        revision.created_at = now;
        revision.updated_at = now;

        self.insert_product(&revision)?;
        Ok(revision)
    }

    fn update_product(&self, product: &Product) -> RepoResult<()> {
        product.validate()?;

        let changed = self.conn.execute(
            "UPDATE products
             SET
                name = ?1,
                description = ?2,
                status = ?3,
                product_type = ?4,
                effective_date = ?5,
                base_price = ?6,
                currency = ?7,
                billing_frequency = ?8,
                updated_at = ?9
             WHERE product_uuid = ?10;",
            params![
                product.name.as_str(),
                product.description.as_deref(),
                product.status.as_db_str(),
                product.product_type.as_deref(),
                product.effective_date,
                product.base_price.map(|value| value.to_string()),
                product.currency.map(|value| value.as_db_str()),
                product.billing_frequency.map(|value| value.as_db_str()),
                Utc::now(),
                product.uuid.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::ProductNotFound(product.uuid));
        }

        Ok(())
    }

    fn get_product(&self, id: ProductId) -> RepoResult<Option<Product>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PRODUCT_SELECT_SQL} WHERE product_uuid = ?1;"))?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_product_row(row)?));
        }

        Ok(None)
    }

    fn list_products(&self, query: &ProductListQuery) -> RepoResult<Vec<Product>> {
        let mut sql = format!("{PRODUCT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(status) = query.status {
            sql.push_str(" AND status = ?");
            bind_values.push(Value::Text(status.as_db_str().to_string()));
        }

        sql.push_str(" ORDER BY name ASC, product_uuid ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut products = Vec::new();

        while let Some(row) = rows.next()? {
            products.push(parse_product_row(row)?);
        }

        Ok(products)
    }

    fn delete_product(&self, id: ProductId) -> RepoResult<()> {
        let deleted = self.conn.execute(
            "DELETE FROM products WHERE product_uuid = ?1;",
            [id.to_string()],
        );

        match deleted {
            Ok(0) => Err(RepoError::ProductNotFound(id)),
            Ok(_) => Ok(()),
            Err(err) if is_foreign_key_violation(&err) => Err(RepoError::ProductInUse(id)),
            Err(err) => Err(err.into()),
        }
    }

    fn version_chain(&self, id: ProductId) -> RepoResult<Vec<Product>> {
        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut cursor = Some(id);

        while let Some(current) = cursor {
            if !visited.insert(current) {
                return Err(RepoError::InvalidData(format!(
                    "product version chain contains a cycle at {current}"
                )));
            }

            let product = match self.get_product(current)? {
                Some(product) => product,
                None if chain.is_empty() => return Err(RepoError::ProductNotFound(id)),
                None => {
                    return Err(RepoError::InvalidData(format!(
                        "product version chain references missing product {current}"
                    )));
                }
            };

            cursor = product.parent_product;
            chain.push(product);
        }

        Ok(chain)
    }
}

impl SubscriptionRepository for SqliteProductRepository<'_> {
    fn add_subscription(&self, subscription: &CustomerProduct) -> RepoResult<SubscriptionId> {
        subscription.validate()?;

        if contact_kind(self.conn, subscription.contact)?.is_none() {
            return Err(RepoError::ContactNotFound(subscription.contact));
        }
        if self.get_product(subscription.product)?.is_none() {
            return Err(RepoError::ProductNotFound(subscription.product));
        }

        let inserted = self.conn.execute(
            "INSERT INTO customer_products (
                customer_product_uuid,
                contact_uuid,
                product_uuid,
                status,
                start_date,
                end_date,
                actual_price,
                notes,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                subscription.uuid.to_string(),
                subscription.contact.to_string(),
                subscription.product.to_string(),
                subscription.status.as_db_str(),
                subscription.start_date,
                subscription.end_date,
                subscription.actual_price.map(|value| value.to_string()),
                subscription.notes.as_deref(),
                subscription.created_at,
            ],
        );

        match inserted {
            Ok(_) => Ok(subscription.uuid),
            Err(err) if is_unique_violation(&err) => Err(RepoError::DuplicateActiveSubscription {
                contact: subscription.contact,
                product: subscription.product,
            }),
            Err(err) => Err(err.into()),
        }
    }

    fn get_subscription(&self, id: SubscriptionId) -> RepoResult<Option<CustomerProduct>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                customer_product_uuid,
                contact_uuid,
                product_uuid,
                status,
                start_date,
                end_date,
                actual_price,
                notes,
                created_at
             FROM customer_products
             WHERE customer_product_uuid = ?1;",
        )?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_subscription_row(row)?));
        }

        Ok(None)
    }

    fn activate_subscription(&self, id: SubscriptionId) -> RepoResult<()> {
        let status = self
            .subscription_status(id)?
            .ok_or(RepoError::SubscriptionNotFound(id))?;
        if status != SubscriptionStatus::Pending {
            return Err(RepoError::SubscriptionNotPending { id, status });
        }

        let updated = self.conn.execute(
            "UPDATE customer_products
             SET status = 'active'
             WHERE customer_product_uuid = ?1;",
            [id.to_string()],
        );

        match updated {
            Ok(_) => Ok(()),
            // The partial unique index also guards activation: a second
            // active row for the same pair must not appear through this path.
            Err(err) if is_unique_violation(&err) => {
                let subscription = self
                    .get_subscription(id)?
                    .ok_or(RepoError::SubscriptionNotFound(id))?;
                Err(RepoError::DuplicateActiveSubscription {
                    contact: subscription.contact,
                    product: subscription.product,
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    fn end_subscription(&self, id: SubscriptionId, end_date: NaiveDate) -> RepoResult<()> {
        self.close_subscription(id, SubscriptionStatus::Ended, end_date)
    }

    fn cancel_subscription(&self, id: SubscriptionId, end_date: NaiveDate) -> RepoResult<()> {
        self.close_subscription(id, SubscriptionStatus::Cancelled, end_date)
    }

    fn remove_subscription(&self, id: SubscriptionId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM customer_products WHERE customer_product_uuid = ?1;",
            [id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::SubscriptionNotFound(id));
        }

        Ok(())
    }

    fn list_for_contact(&self, contact: ContactId) -> RepoResult<Vec<SubscriptionRecord>> {
        if contact_kind(self.conn, contact)?.is_none() {
            return Err(RepoError::ContactNotFound(contact));
        }

        let mut stmt = self.conn.prepare(
            "SELECT
                cp.customer_product_uuid,
                cp.product_uuid,
                p.name AS product_name,
                p.product_type,
                cp.status,
                cp.start_date,
                cp.end_date,
                cp.actual_price,
                cp.notes
             FROM customer_products cp
             INNER JOIN products p ON p.product_uuid = cp.product_uuid
             WHERE cp.contact_uuid = ?1
             ORDER BY cp.start_date ASC, cp.customer_product_uuid ASC;",
        )?;

        let mut rows = stmt.query([contact.to_string()])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let uuid_text: String = row.get("customer_product_uuid")?;
            let product_text: String = row.get("product_uuid")?;
            let status_text: String = row.get("status")?;
            records.push(SubscriptionRecord {
                customer_product_id: parse_uuid(
                    &uuid_text,
                    "customer_products.customer_product_uuid",
                )?,
                product_id: parse_uuid(&product_text, "customer_products.product_uuid")?,
                product_name: row.get("product_name")?,
                product_type: row.get("product_type")?,
                status: parse_subscription_status(&status_text)?,
                start_date: row.get("start_date")?,
                end_date: row.get("end_date")?,
                actual_price: parse_optional_price(row.get("actual_price")?)?,
                notes: row.get("notes")?,
            });
        }

        Ok(records)
    }

    fn available_products_for(&self, contact: ContactId) -> RepoResult<Vec<Product>> {
        if contact_kind(self.conn, contact)?.is_none() {
            return Err(RepoError::ContactNotFound(contact));
        }

        let mut stmt = self.conn.prepare(&format!(
            "{PRODUCT_SELECT_SQL}
             WHERE status = 'active'
               AND product_uuid NOT IN (
                   SELECT product_uuid
                   FROM customer_products
                   WHERE contact_uuid = ?1
                     AND status = 'active'
               )
             ORDER BY name ASC, product_uuid ASC;"
        ))?;

        let mut rows = stmt.query([contact.to_string()])?;
        let mut products = Vec::new();
        while let Some(row) = rows.next()? {
            products.push(parse_product_row(row)?);
        }

        Ok(products)
    }
}

fn parse_product_row(row: &Row<'_>) -> RepoResult<Product> {
    let uuid_text: String = row.get("product_uuid")?;
    let status_text: String = row.get("status")?;

    let parent_product = row
        .get::<_, Option<String>>("parent_product_uuid")?
        .map(|value| parse_uuid(&value, "products.parent_product_uuid"))
        .transpose()?;

    let currency = match row.get::<_, Option<String>>("currency")? {
        Some(value) => Some(
            crate::model::product::Currency::from_db_str(&value).ok_or_else(|| {
                RepoError::InvalidData(format!("invalid currency `{value}` in products.currency"))
            })?,
        ),
        None => None,
    };

    let billing_frequency = match row.get::<_, Option<String>>("billing_frequency")? {
        Some(value) => Some(
            crate::model::product::BillingFrequency::from_db_str(&value).ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "invalid billing frequency `{value}` in products.billing_frequency"
                ))
            })?,
        ),
        None => None,
    };

    Ok(Product {
        uuid: parse_uuid(&uuid_text, "products.product_uuid")?,
        name: row.get("name")?,
        description: row.get("description")?,
        status: ProductStatus::from_db_str(&status_text).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid status `{status_text}` in products.status"))
        })?,
        product_type: row.get("product_type")?,
        version: row.get("version")?,
        parent_product,
        effective_date: row.get("effective_date")?,
        base_price: parse_optional_price(row.get("base_price")?)?,
        currency,
        billing_frequency,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_subscription_row(row: &Row<'_>) -> RepoResult<CustomerProduct> {
    let uuid_text: String = row.get("customer_product_uuid")?;
    let contact_text: String = row.get("contact_uuid")?;
    let product_text: String = row.get("product_uuid")?;
    let status_text: String = row.get("status")?;

    let subscription = CustomerProduct {
        uuid: parse_uuid(&uuid_text, "customer_products.customer_product_uuid")?,
        contact: parse_uuid(&contact_text, "customer_products.contact_uuid")?,
        product: parse_uuid(&product_text, "customer_products.product_uuid")?,
        status: parse_subscription_status(&status_text)?,
        start_date: row.get("start_date")?,
        end_date: row.get("end_date")?,
        actual_price: parse_optional_price(row.get("actual_price")?)?,
        notes: row.get("notes")?,
        created_at: row.get("created_at")?,
    };
    subscription.validate()?;
    Ok(subscription)
}

fn parse_subscription_status(value: &str) -> RepoResult<SubscriptionStatus> {
    SubscriptionStatus::from_db_str(value).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid subscription status `{value}` in customer_products.status"
        ))
    })
}

fn parse_optional_price(value: Option<String>) -> RepoResult<Option<Decimal>> {
    match value {
        None => Ok(None),
        Some(text) => Decimal::from_str(&text)
            .map(Some)
            .map_err(|_| RepoError::InvalidData(format!("invalid price value `{text}`"))),
    }
}
