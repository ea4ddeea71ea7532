//! Relationship graph repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide edge creation/removal and organisation-centric listings.
//! - Own role-rule validation: edges run person -> organisation with a type
//!   drawn from the target kind's allowed set.
//!
//! # Invariants
//! - The (from, to, type) triple is unique; the storage constraint backs the
//!   check so concurrent writers cannot slip a duplicate through.
//! - `list_for_organisation` preserves insertion order exactly:
//!   `created_at ASC, relationship_uuid ASC`.

use crate::model::contact::{ContactId, ContactType};
use crate::model::relationship::{RelationshipId, RelationshipType};
use crate::model::ValidationError;
use crate::repo::contact_repo::{contact_kind, parse_contact_type};
use crate::repo::{ensure_connection_ready, is_unique_violation, parse_uuid, RepoError, RepoResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::Serialize;
use uuid::Uuid;

const RELATIONSHIP_COLUMNS: &[&str] = &[
    "relationship_uuid",
    "from_contact_uuid",
    "to_contact_uuid",
    "relationship_type",
    "created_at",
];

/// Edge joined with the person's contact fields, as shown on organisation
/// detail views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkedPerson {
    pub relationship_id: RelationshipId,
    pub person_id: ContactId,
    pub full_name: String,
    pub contact_type: ContactType,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub relationship_type: RelationshipType,
    pub created_at: DateTime<Utc>,
}

/// Edge joined with the organisation's contact fields, as shown on a
/// person's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrganisationLink {
    pub relationship_id: RelationshipId,
    pub organisation_id: ContactId,
    pub full_name: String,
    pub contact_type: ContactType,
    pub relationship_type: RelationshipType,
}

/// Repository interface for the relationship graph.
pub trait RelationshipRepository {
    /// Creates a typed edge after role-rule validation.
    fn add_relationship(
        &self,
        from: ContactId,
        to: ContactId,
        relationship_type: RelationshipType,
    ) -> RepoResult<RelationshipId>;
    /// Hard delete by edge id.
    fn remove_relationship(&self, id: RelationshipId) -> RepoResult<()>;
    /// People linked to the organisation, oldest link first.
    fn list_for_organisation(&self, org: ContactId) -> RepoResult<Vec<LinkedPerson>>;
    /// Organisations a person is linked to.
    fn list_for_person(&self, person: ContactId) -> RepoResult<Vec<OrganisationLink>>;
    /// Individuals not yet linked to the organisation.
    fn candidate_people(&self, org: ContactId) -> RepoResult<Vec<(ContactId, String)>>;
}

/// SQLite-backed relationship graph repository.
pub struct SqliteRelationshipRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRelationshipRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "relationships", RELATIONSHIP_COLUMNS)?;
        Ok(Self { conn })
    }

    fn require_organisation(&self, org: ContactId) -> RepoResult<ContactType> {
        let kind = contact_kind(self.conn, org)?.ok_or(RepoError::ContactNotFound(org))?;
        if !kind.is_organisation() {
            return Err(RepoError::Validation(
                ValidationError::TargetNotOrganisation { contact: org, kind },
            ));
        }
        Ok(kind)
    }
}

impl RelationshipRepository for SqliteRelationshipRepository<'_> {
    fn add_relationship(
        &self,
        from: ContactId,
        to: ContactId,
        relationship_type: RelationshipType,
    ) -> RepoResult<RelationshipId> {
        let from_kind = contact_kind(self.conn, from)?.ok_or(RepoError::ContactNotFound(from))?;
        if from_kind != ContactType::Individual {
            return Err(RepoError::Validation(ValidationError::SourceNotIndividual {
                contact: from,
                kind: from_kind,
            }));
        }

        let to_kind = self.require_organisation(to)?;
        if !relationship_type.is_allowed_for(to_kind) {
            return Err(RepoError::Validation(
                ValidationError::RelationshipTypeNotAllowed {
                    relationship_type,
                    target_kind: to_kind,
                },
            ));
        }

        let id = Uuid::new_v4();
        let inserted = self.conn.execute(
            "INSERT INTO relationships (
                relationship_uuid,
                from_contact_uuid,
                to_contact_uuid,
                relationship_type,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                id.to_string(),
                from.to_string(),
                to.to_string(),
                relationship_type.as_db_str(),
                Utc::now(),
            ],
        );

        match inserted {
            Ok(_) => Ok(id),
            Err(err) if is_unique_violation(&err) => Err(RepoError::DuplicateRelationship {
                from,
                to,
                relationship_type,
            }),
            Err(err) => Err(err.into()),
        }
    }

    fn remove_relationship(&self, id: RelationshipId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM relationships WHERE relationship_uuid = ?1;",
            [id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::RelationshipNotFound(id));
        }

        Ok(())
    }

    fn list_for_organisation(&self, org: ContactId) -> RepoResult<Vec<LinkedPerson>> {
        self.require_organisation(org)?;

        let mut stmt = self.conn.prepare(
            "SELECT
                r.relationship_uuid,
                r.relationship_type,
                r.created_at,
                p.contact_uuid AS person_uuid,
                p.full_name,
                p.contact_type,
                p.email,
                p.phone
             FROM relationships r
             INNER JOIN contacts p ON p.contact_uuid = r.from_contact_uuid
             WHERE r.to_contact_uuid = ?1
             ORDER BY r.created_at ASC, r.relationship_uuid ASC;",
        )?;

        let mut rows = stmt.query([org.to_string()])?;
        let mut people = Vec::new();
        while let Some(row) = rows.next()? {
            people.push(parse_linked_person_row(row)?);
        }

        Ok(people)
    }

    fn list_for_person(&self, person: ContactId) -> RepoResult<Vec<OrganisationLink>> {
        if contact_kind(self.conn, person)?.is_none() {
            return Err(RepoError::ContactNotFound(person));
        }

        let mut stmt = self.conn.prepare(
            "SELECT
                r.relationship_uuid,
                r.relationship_type,
                o.contact_uuid AS organisation_uuid,
                o.full_name,
                o.contact_type
             FROM relationships r
             INNER JOIN contacts o ON o.contact_uuid = r.to_contact_uuid
             WHERE r.from_contact_uuid = ?1
             ORDER BY r.created_at ASC, r.relationship_uuid ASC;",
        )?;

        let mut rows = stmt.query([person.to_string()])?;
        let mut links = Vec::new();
        while let Some(row) = rows.next()? {
            let relationship_uuid: String = row.get("relationship_uuid")?;
            let organisation_uuid: String = row.get("organisation_uuid")?;
            let type_text: String = row.get("relationship_type")?;
            let kind_text: String = row.get("contact_type")?;
            links.push(OrganisationLink {
                relationship_id: parse_uuid(&relationship_uuid, "relationships.relationship_uuid")?,
                organisation_id: parse_uuid(&organisation_uuid, "contacts.contact_uuid")?,
                full_name: row.get("full_name")?,
                contact_type: parse_contact_type(&kind_text)?,
                relationship_type: parse_relationship_type(&type_text)?,
            });
        }

        Ok(links)
    }

    fn candidate_people(&self, org: ContactId) -> RepoResult<Vec<(ContactId, String)>> {
        self.require_organisation(org)?;

        // The id inequality is redundant while contact kinds hold, but ids
        // share one table, so the organisation itself is excluded explicitly.
        let mut stmt = self.conn.prepare(
            "SELECT contact_uuid, full_name
             FROM contacts
             WHERE contact_type = 'individual'
               AND contact_uuid != ?1
               AND contact_uuid NOT IN (
                   SELECT from_contact_uuid
                   FROM relationships
                   WHERE to_contact_uuid = ?1
               )
             ORDER BY full_name ASC, contact_uuid ASC;",
        )?;

        let mut rows = stmt.query([org.to_string()])?;
        let mut candidates = Vec::new();
        while let Some(row) = rows.next()? {
            let uuid_text: String = row.get(0)?;
            candidates.push((
                parse_uuid(&uuid_text, "contacts.contact_uuid")?,
                row.get(1)?,
            ));
        }

        Ok(candidates)
    }
}

fn parse_linked_person_row(row: &Row<'_>) -> RepoResult<LinkedPerson> {
    let relationship_uuid: String = row.get("relationship_uuid")?;
    let person_uuid: String = row.get("person_uuid")?;
    let type_text: String = row.get("relationship_type")?;
    let kind_text: String = row.get("contact_type")?;

    Ok(LinkedPerson {
        relationship_id: parse_uuid(&relationship_uuid, "relationships.relationship_uuid")?,
        person_id: parse_uuid(&person_uuid, "contacts.contact_uuid")?,
        full_name: row.get("full_name")?,
        contact_type: parse_contact_type(&kind_text)?,
        email: row.get("email")?,
        phone: row.get("phone")?,
        relationship_type: parse_relationship_type(&type_text)?,
        created_at: row.get("created_at")?,
    })
}

pub(crate) fn parse_relationship_type(value: &str) -> RepoResult<RelationshipType> {
    RelationshipType::from_db_str(value).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid relationship type `{value}` in relationships.relationship_type"
        ))
    })
}
