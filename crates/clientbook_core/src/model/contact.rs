//! Contact domain model.
//!
//! # Responsibility
//! - Define the single polymorphic contact record (person or organisation).
//! - Provide field validation applied by repositories before writes.
//!
//! # Invariants
//! - `uuid` is stable and never reused for another contact.
//! - `contact_type` distinguishes people from organisations; businesses and
//!   estates are both organisations.

use crate::model::ValidationError;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for contacts.
pub type ContactId = Uuid;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern must compile")
});

/// Discriminant for the single-table contact shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactType {
    /// A person; the only valid source of relationship edges.
    Individual,
    /// A company; organisation-side of edges like `works_for`.
    Business,
    /// An estate or trust; organisation-side of edges like `trustee_of`.
    Estate,
}

impl ContactType {
    /// Whether this kind sits on the organisation side of the graph.
    pub fn is_organisation(self) -> bool {
        matches!(self, Self::Business | Self::Estate)
    }

    /// Storage token for this kind.
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Business => "business",
            Self::Estate => "estate",
        }
    }

    /// Parses a storage token back into a kind.
    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "individual" => Some(Self::Individual),
            "business" => Some(Self::Business),
            "estate" => Some(Self::Estate),
            _ => None,
        }
    }
}

impl Display for ContactType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db_str())
    }
}

/// Canonical contact record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Stable global ID used for edges, subscriptions and responses.
    #[serde(rename = "id")]
    pub uuid: ContactId,
    pub full_name: String,
    pub contact_type: ContactType,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company_name: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Contact {
    /// Creates a contact with a generated stable ID and current timestamp.
    pub fn new(contact_type: ContactType, full_name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), contact_type, full_name)
    }

    /// Creates a contact with a caller-provided stable ID.
    ///
    /// Used by import paths and deterministic tests.
    pub fn with_id(
        uuid: ContactId,
        contact_type: ContactType,
        full_name: impl Into<String>,
    ) -> Self {
        Self {
            uuid,
            full_name: full_name.into(),
            contact_type,
            email: None,
            phone: None,
            company_name: None,
            notes: None,
            created_at: Utc::now(),
        }
    }

    /// Whether this contact may be the source of relationship edges.
    pub fn is_person(&self) -> bool {
        self.contact_type == ContactType::Individual
    }

    /// Whether this contact may be the target of relationship edges.
    pub fn is_organisation(&self) -> bool {
        self.contact_type.is_organisation()
    }

    /// Checks field-level invariants before persistence.
    ///
    /// # Errors
    /// - `EmptyName` when `full_name` is blank.
    /// - `InvalidEmail` when `email` is present but malformed.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.full_name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if let Some(email) = self.email.as_deref() {
            if !EMAIL_RE.is_match(email) {
                return Err(ValidationError::InvalidEmail(email.to_string()));
            }
        }
        Ok(())
    }
}
