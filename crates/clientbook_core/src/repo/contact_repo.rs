//! Contact repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over the single polymorphic `contacts` table.
//! - Own the cascade semantics of contact deletion.
//!
//! # Invariants
//! - Write paths call `Contact::validate()` before SQL mutations.
//! - Deleting a contact removes its relationship edges, subscriptions and
//!   campaign responses in the same statement via FK cascades.
//! - Listings are deterministic: `full_name ASC, contact_uuid ASC`.

use crate::model::contact::{Contact, ContactId, ContactType};
use crate::repo::{ensure_connection_ready, parse_uuid, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use serde::Serialize;

const CONTACT_SELECT_SQL: &str = "SELECT
    contact_uuid,
    full_name,
    contact_type,
    email,
    phone,
    company_name,
    notes,
    created_at
FROM contacts";

const CONTACT_COLUMNS: &[&str] = &[
    "contact_uuid",
    "full_name",
    "contact_type",
    "email",
    "phone",
    "company_name",
    "notes",
    "created_at",
];

/// Query options for contact listings.
#[derive(Debug, Clone, Default)]
pub struct ContactListQuery {
    /// Optional kind filter (e.g. only organisations of one kind).
    pub kind: Option<ContactType>,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Organisation row annotated with how many people link to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrganisationSummary {
    #[serde(rename = "id")]
    pub uuid: ContactId,
    pub full_name: String,
    pub contact_type: ContactType,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub linked_people_count: i64,
}

/// Repository interface for contact CRUD operations.
pub trait ContactRepository {
    fn create_contact(&self, contact: &Contact) -> RepoResult<ContactId>;
    fn update_contact(&self, contact: &Contact) -> RepoResult<()>;
    fn get_contact(&self, id: ContactId) -> RepoResult<Option<Contact>>;
    fn list_contacts(&self, query: &ContactListQuery) -> RepoResult<Vec<Contact>>;
    /// Hard delete; cascades edges, subscriptions and response rows.
    fn delete_contact(&self, id: ContactId) -> RepoResult<()>;
    /// All business/estate contacts with their linked-people counts.
    fn list_organisations(&self) -> RepoResult<Vec<OrganisationSummary>>;
}

/// SQLite-backed contact repository.
pub struct SqliteContactRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteContactRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "contacts", CONTACT_COLUMNS)?;
        Ok(Self { conn })
    }
}

impl ContactRepository for SqliteContactRepository<'_> {
    fn create_contact(&self, contact: &Contact) -> RepoResult<ContactId> {
        contact.validate()?;

        self.conn.execute(
            "INSERT INTO contacts (
                contact_uuid,
                full_name,
                contact_type,
                email,
                phone,
                company_name,
                notes,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                contact.uuid.to_string(),
                contact.full_name.as_str(),
                contact.contact_type.as_db_str(),
                contact.email.as_deref(),
                contact.phone.as_deref(),
                contact.company_name.as_deref(),
                contact.notes.as_deref(),
                contact.created_at,
            ],
        )?;

        Ok(contact.uuid)
    }

    fn update_contact(&self, contact: &Contact) -> RepoResult<()> {
        contact.validate()?;

        // The kind is frozen once edges assume a role: re-typing an
        // organisation with linked people would invalidate every edge.
        if let Some(stored_kind) = contact_kind(self.conn, contact.uuid)? {
            if stored_kind != contact.contact_type && has_relationships(self.conn, contact.uuid)? {
                return Err(RepoError::ContactTypeInUse(contact.uuid));
            }
        }

        let changed = self.conn.execute(
            "UPDATE contacts
             SET
                full_name = ?1,
                contact_type = ?2,
                email = ?3,
                phone = ?4,
                company_name = ?5,
                notes = ?6
             WHERE contact_uuid = ?7;",
            params![
                contact.full_name.as_str(),
                contact.contact_type.as_db_str(),
                contact.email.as_deref(),
                contact.phone.as_deref(),
                contact.company_name.as_deref(),
                contact.notes.as_deref(),
                contact.uuid.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::ContactNotFound(contact.uuid));
        }

        Ok(())
    }

    fn get_contact(&self, id: ContactId) -> RepoResult<Option<Contact>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CONTACT_SELECT_SQL} WHERE contact_uuid = ?1;"))?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_contact_row(row)?));
        }

        Ok(None)
    }

    fn list_contacts(&self, query: &ContactListQuery) -> RepoResult<Vec<Contact>> {
        let mut sql = format!("{CONTACT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(kind) = query.kind {
            sql.push_str(" AND contact_type = ?");
            bind_values.push(Value::Text(kind.as_db_str().to_string()));
        }

        sql.push_str(" ORDER BY full_name ASC, contact_uuid ASC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut contacts = Vec::new();

        while let Some(row) = rows.next()? {
            contacts.push(parse_contact_row(row)?);
        }

        Ok(contacts)
    }

    fn delete_contact(&self, id: ContactId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM contacts WHERE contact_uuid = ?1;",
            [id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::ContactNotFound(id));
        }

        Ok(())
    }

    fn list_organisations(&self) -> RepoResult<Vec<OrganisationSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                c.contact_uuid,
                c.full_name,
                c.contact_type,
                c.email,
                c.phone,
                c.notes,
                (SELECT COUNT(*)
                 FROM relationships r
                 WHERE r.to_contact_uuid = c.contact_uuid) AS linked_people_count
             FROM contacts c
             WHERE c.contact_type IN ('business', 'estate')
             ORDER BY c.full_name ASC, c.contact_uuid ASC;",
        )?;

        let mut rows = stmt.query([])?;
        let mut organisations = Vec::new();

        while let Some(row) = rows.next()? {
            let uuid_text: String = row.get("contact_uuid")?;
            let type_text: String = row.get("contact_type")?;
            organisations.push(OrganisationSummary {
                uuid: parse_uuid(&uuid_text, "contacts.contact_uuid")?,
                full_name: row.get("full_name")?,
                contact_type: parse_contact_type(&type_text)?,
                email: row.get("email")?,
                phone: row.get("phone")?,
                notes: row.get("notes")?,
                linked_people_count: row.get("linked_people_count")?,
            });
        }

        Ok(organisations)
    }
}

pub(crate) fn parse_contact_row(row: &Row<'_>) -> RepoResult<Contact> {
    let uuid_text: String = row.get("contact_uuid")?;
    let type_text: String = row.get("contact_type")?;

    Ok(Contact {
        uuid: parse_uuid(&uuid_text, "contacts.contact_uuid")?,
        full_name: row.get("full_name")?,
        contact_type: parse_contact_type(&type_text)?,
        email: row.get("email")?,
        phone: row.get("phone")?,
        company_name: row.get("company_name")?,
        notes: row.get("notes")?,
        created_at: row.get("created_at")?,
    })
}

pub(crate) fn parse_contact_type(value: &str) -> RepoResult<ContactType> {
    ContactType::from_db_str(value).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid contact type `{value}` in contacts.contact_type"))
    })
}

fn has_relationships(conn: &Connection, id: ContactId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM relationships
            WHERE from_contact_uuid = ?1 OR to_contact_uuid = ?1
        );",
        [id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// Loads just the kind of a contact, if the contact exists.
pub(crate) fn contact_kind(conn: &Connection, id: ContactId) -> RepoResult<Option<ContactType>> {
    use rusqlite::OptionalExtension;

    let value: Option<String> = conn
        .query_row(
            "SELECT contact_type FROM contacts WHERE contact_uuid = ?1;",
            [id.to_string()],
            |row| row.get(0),
        )
        .optional()?;

    match value {
        None => Ok(None),
        Some(text) => Ok(Some(parse_contact_type(&text)?)),
    }
}
