//! Typed relationship edges between people and organisations.
//!
//! # Responsibility
//! - Define the directed edge record and its type vocabulary.
//! - Own the allowed-type table per organisation kind.
//!
//! # Invariants
//! - Edges always run person -> organisation; the reverse is rejected at the
//!   repository boundary.
//! - The valid type set depends on the *target* contact kind only.

use crate::model::contact::{ContactId, ContactType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for relationship edges.
pub type RelationshipId = Uuid;

/// Edge label; which labels are valid depends on the target organisation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    WorksFor,
    DirectorOf,
    PartnerOf,
    OwnerOf,
    Manages,
    MemberOf,
    TrusteeOf,
    BeneficiaryOf,
    ExecutorOf,
}

const BUSINESS_TYPES: &[RelationshipType] = &[
    RelationshipType::WorksFor,
    RelationshipType::DirectorOf,
    RelationshipType::PartnerOf,
    RelationshipType::OwnerOf,
    RelationshipType::Manages,
];

const ESTATE_TYPES: &[RelationshipType] = &[
    RelationshipType::MemberOf,
    RelationshipType::TrusteeOf,
    RelationshipType::BeneficiaryOf,
    RelationshipType::ExecutorOf,
];

impl RelationshipType {
    /// Allowed labels for edges pointing at the given organisation kind.
    ///
    /// Individuals are never a valid target, so their set is empty.
    pub fn allowed_for(target_kind: ContactType) -> &'static [RelationshipType] {
        match target_kind {
            ContactType::Business => BUSINESS_TYPES,
            ContactType::Estate => ESTATE_TYPES,
            ContactType::Individual => &[],
        }
    }

    /// Whether this label may be used against the given target kind.
    pub fn is_allowed_for(self, target_kind: ContactType) -> bool {
        Self::allowed_for(target_kind).contains(&self)
    }

    /// Storage token for this label.
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::WorksFor => "works_for",
            Self::DirectorOf => "director_of",
            Self::PartnerOf => "partner_of",
            Self::OwnerOf => "owner_of",
            Self::Manages => "manages",
            Self::MemberOf => "member_of",
            Self::TrusteeOf => "trustee_of",
            Self::BeneficiaryOf => "beneficiary_of",
            Self::ExecutorOf => "executor_of",
        }
    }

    /// Parses a storage token back into a label.
    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "works_for" => Some(Self::WorksFor),
            "director_of" => Some(Self::DirectorOf),
            "partner_of" => Some(Self::PartnerOf),
            "owner_of" => Some(Self::OwnerOf),
            "manages" => Some(Self::Manages),
            "member_of" => Some(Self::MemberOf),
            "trustee_of" => Some(Self::TrusteeOf),
            "beneficiary_of" => Some(Self::BeneficiaryOf),
            "executor_of" => Some(Self::ExecutorOf),
            _ => None,
        }
    }
}

impl Display for RelationshipType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db_str())
    }
}

/// Directed edge from a person to an organisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(rename = "id")]
    pub uuid: RelationshipId,
    pub from_contact: ContactId,
    pub to_contact: ContactId,
    pub relationship_type: RelationshipType,
    pub created_at: DateTime<Utc>,
}

impl Relationship {
    /// Creates a new edge with a generated stable ID and current timestamp.
    pub fn new(
        from_contact: ContactId,
        to_contact: ContactId,
        relationship_type: RelationshipType,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            from_contact,
            to_contact,
            relationship_type,
            created_at: Utc::now(),
        }
    }
}

/// Compact edge annotation attached to contact listings (organisation name
/// plus the label a person holds there).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationshipSummary {
    #[serde(rename = "type")]
    pub relationship_type: RelationshipType,
    pub organisation: String,
}
