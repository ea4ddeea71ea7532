//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts per aggregate.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Repository writes enforce model validation before SQL mutations.
//! - Uniqueness rules (duplicate edge, duplicate active subscription) are
//!   backed by storage constraints; constraint races surface as the same
//!   typed conflict as the pre-checks.
//! - Repositories refuse un-migrated connections.

use crate::db::DbError;
use crate::db::migrations::latest_version;
use crate::model::campaign::CampaignId;
use crate::model::contact::ContactId;
use crate::model::product::{ProductId, SubscriptionId, SubscriptionStatus};
use crate::model::relationship::{RelationshipId, RelationshipType};
use crate::model::ValidationError;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod campaign_repo;
pub mod contact_repo;
pub mod product_repo;
pub mod relationship_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Error surface shared by all repository operations.
#[derive(Debug)]
pub enum RepoError {
    /// Field-level or role-rule validation failed before any mutation.
    Validation(ValidationError),
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    ContactNotFound(ContactId),
    RelationshipNotFound(RelationshipId),
    ProductNotFound(ProductId),
    SubscriptionNotFound(SubscriptionId),
    CampaignNotFound(CampaignId),
    /// No response row exists for the (campaign, contact) pair.
    ResponseNotFound {
        campaign: CampaignId,
        contact: ContactId,
    },
    /// The exact (from, to, type) edge already exists.
    DuplicateRelationship {
        from: ContactId,
        to: ContactId,
        relationship_type: RelationshipType,
    },
    /// The contact already holds an active subscription for this product.
    DuplicateActiveSubscription {
        contact: ContactId,
        product: ProductId,
    },
    /// The contact is already enrolled in this campaign.
    DuplicateEnrollment {
        campaign: CampaignId,
        contact: ContactId,
    },
    /// Product deletion rejected while subscriptions still reference it.
    ProductInUse(ProductId),
    /// Contact kind change rejected while relationship edges assume a role.
    ContactTypeInUse(ContactId),
    /// Activation requires a pending subscription.
    SubscriptionNotPending {
        id: SubscriptionId,
        status: SubscriptionStatus,
    },
    /// End/cancel requires an active subscription.
    SubscriptionNotActive {
        id: SubscriptionId,
        status: SubscriptionStatus,
    },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::ContactNotFound(id) => write!(f, "contact not found: {id}"),
            Self::RelationshipNotFound(id) => write!(f, "relationship not found: {id}"),
            Self::ProductNotFound(id) => write!(f, "product not found: {id}"),
            Self::SubscriptionNotFound(id) => write!(f, "subscription not found: {id}"),
            Self::CampaignNotFound(id) => write!(f, "campaign not found: {id}"),
            Self::ResponseNotFound { campaign, contact } => write!(
                f,
                "no response row for contact {contact} in campaign {campaign}"
            ),
            Self::DuplicateRelationship {
                from,
                to,
                relationship_type,
            } => write!(
                f,
                "relationship {relationship_type} from {from} to {to} already exists"
            ),
            Self::DuplicateActiveSubscription { contact, product } => write!(
                f,
                "contact {contact} already holds an active subscription for product {product}"
            ),
            Self::DuplicateEnrollment { campaign, contact } => write!(
                f,
                "contact {contact} is already enrolled in campaign {campaign}"
            ),
            Self::ProductInUse(id) => write!(
                f,
                "product {id} still has subscriptions and cannot be deleted"
            ),
            Self::ContactTypeInUse(id) => write!(
                f,
                "contact {id} has relationships and cannot change its contact type"
            ),
            Self::SubscriptionNotPending { id, status } => write!(
                f,
                "subscription {id} cannot be activated from status {status}"
            ),
            Self::SubscriptionNotActive { id, status } => write!(
                f,
                "subscription {id} cannot be closed from status {status}"
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "repository requires column `{column}` in table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Whether the error is a UNIQUE / PRIMARY KEY constraint violation.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

/// Whether the error is a FOREIGN KEY constraint violation.
pub(crate) fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
                || failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_TRIGGER
    )
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

/// Verifies the connection is migrated and exposes the required table shape.
pub(crate) fn ensure_connection_ready(
    conn: &Connection,
    table: &'static str,
    columns: &[&'static str],
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, table)? {
        return Err(RepoError::MissingRequiredTable(table));
    }

    for &column in columns {
        if !table_has_column(conn, table, column)? {
            return Err(RepoError::MissingRequiredColumn { table, column });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
