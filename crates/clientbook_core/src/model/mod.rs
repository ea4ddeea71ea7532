//! Domain model for the CRM core.
//!
//! # Responsibility
//! - Define canonical record shapes shared by repositories and services.
//! - Own field-level validation applied before any persistence.
//!
//! # Invariants
//! - Every record is identified by a stable UUID.
//! - `contact_type` is a plain discriminant on one contact shape; role rules
//!   (who may appear on which end of an edge) are checked at the relationship
//!   boundary, not baked into storage.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod campaign;
pub mod contact;
pub mod product;
pub mod relationship;

use campaign::ResponseStatus;
use contact::{ContactId, ContactType};
use relationship::RelationshipType;

/// Field-level validation failure raised before any mutation is attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// `full_name` (or a product/campaign name) is empty or whitespace.
    EmptyName,
    /// Provided email does not look like an address.
    InvalidEmail(String),
    /// Relationship source contact is not an individual.
    SourceNotIndividual {
        contact: ContactId,
        kind: ContactType,
    },
    /// Relationship target contact is not a business or estate.
    TargetNotOrganisation {
        contact: ContactId,
        kind: ContactType,
    },
    /// Relationship type is outside the allowed set for the target kind.
    RelationshipTypeNotAllowed {
        relationship_type: RelationshipType,
        target_kind: ContactType,
    },
    /// Subscription end date precedes its start date.
    EndDateBeforeStartDate,
    /// Subscription carries an end date without a terminal status.
    EndDateWithoutTerminalStatus,
    /// Subscription reached a terminal status without an end date.
    TerminalStatusWithoutEndDate,
    /// A response date was supplied together with the pending status.
    ResponseDateOnPending,
    /// A persisted non-pending response row is missing its date.
    ResponseDateMissing(ResponseStatus),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "name must not be empty"),
            Self::InvalidEmail(value) => write!(f, "`{value}` is not a valid email address"),
            Self::SourceNotIndividual { contact, kind } => write!(
                f,
                "relationship source {contact} must be an individual, got {kind}"
            ),
            Self::TargetNotOrganisation { contact, kind } => write!(
                f,
                "relationship target {contact} must be a business or estate, got {kind}"
            ),
            Self::RelationshipTypeNotAllowed {
                relationship_type,
                target_kind,
            } => write!(
                f,
                "relationship type {relationship_type} is not allowed for {target_kind} targets"
            ),
            Self::EndDateBeforeStartDate => {
                write!(f, "subscription end date must not precede its start date")
            }
            Self::EndDateWithoutTerminalStatus => write!(
                f,
                "subscription end date is only allowed with ended/cancelled status"
            ),
            Self::TerminalStatusWithoutEndDate => {
                write!(f, "ended/cancelled subscription requires an end date")
            }
            Self::ResponseDateOnPending => {
                write!(f, "a pending response must not carry a response date")
            }
            Self::ResponseDateMissing(status) => {
                write!(f, "response status {status} requires a response date")
            }
        }
    }
}

impl Error for ValidationError {}
