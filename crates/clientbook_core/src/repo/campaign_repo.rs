//! Campaign response tracker: contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide campaign records and per-contact response rows.
//! - Own the response-status transition including the date-stamp policy.
//!
//! # Invariants
//! - `(campaign, contact)` response rows are unique (primary key).
//! - A transition to a non-pending status always leaves a response date
//!   behind: the caller's date wins, otherwise the current date is stamped.
//! - Transitioning back to pending clears the date.

use crate::model::campaign::{Campaign, CampaignId, CampaignStatus, Channel, ResponseStatus};
use crate::model::contact::{ContactId, ContactType};
use crate::model::relationship::RelationshipSummary;
use crate::model::ValidationError;
use crate::repo::contact_repo::{contact_kind, parse_contact_type};
use crate::repo::relationship_repo::parse_relationship_type;
use crate::repo::{ensure_connection_ready, is_unique_violation, parse_uuid, RepoError, RepoResult};
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, Row};
use serde::Serialize;
use std::collections::HashMap;

const CAMPAIGN_SELECT_SQL: &str = "SELECT
    campaign_uuid,
    name,
    description,
    channel,
    send_date,
    status,
    created_at
FROM campaigns";

const CAMPAIGN_COLUMNS: &[&str] = &[
    "campaign_uuid",
    "name",
    "channel",
    "send_date",
    "status",
    "created_at",
];

const CAMPAIGN_CONTACT_COLUMNS: &[&str] = &[
    "campaign_uuid",
    "contact_uuid",
    "response_status",
    "response_date",
    "created_at",
];

/// Response row joined with the contact and its organisation links, as
/// listed on the campaign detail view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampaignContactRecord {
    #[serde(rename = "id")]
    pub contact_id: ContactId,
    pub full_name: String,
    pub contact_type: ContactType,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub response_status: ResponseStatus,
    pub response_date: Option<NaiveDate>,
    pub relationships: Vec<RelationshipSummary>,
}

/// Repository interface for campaigns and response tracking.
pub trait CampaignRepository {
    fn create_campaign(&self, campaign: &Campaign) -> RepoResult<CampaignId>;
    fn get_campaign(&self, id: CampaignId) -> RepoResult<Option<Campaign>>;
    fn list_campaigns(&self) -> RepoResult<Vec<Campaign>>;
    /// Creates a pending response row for the contact.
    fn enroll_contact(&self, campaign: CampaignId, contact: ContactId) -> RepoResult<()>;
    /// Response rows with exactly the requested status. There is no implicit
    /// default: the caller always names the status it wants.
    fn list_contacts(
        &self,
        campaign: CampaignId,
        status: ResponseStatus,
    ) -> RepoResult<Vec<CampaignContactRecord>>;
    /// Records a response-status transition; see the date-stamp policy above.
    fn set_response(
        &self,
        campaign: CampaignId,
        contact: ContactId,
        status: ResponseStatus,
        date: Option<NaiveDate>,
    ) -> RepoResult<()>;
}

/// SQLite-backed campaign repository.
pub struct SqliteCampaignRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCampaignRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "campaigns", CAMPAIGN_COLUMNS)?;
        ensure_connection_ready(conn, "campaign_contacts", CAMPAIGN_CONTACT_COLUMNS)?;
        Ok(Self { conn })
    }

    fn require_campaign(&self, id: CampaignId) -> RepoResult<()> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM campaigns WHERE campaign_uuid = ?1);",
            [id.to_string()],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Err(RepoError::CampaignNotFound(id));
        }
        Ok(())
    }
}

impl CampaignRepository for SqliteCampaignRepository<'_> {
    fn create_campaign(&self, campaign: &Campaign) -> RepoResult<CampaignId> {
        campaign.validate()?;

        self.conn.execute(
            "INSERT INTO campaigns (
                campaign_uuid,
                name,
                description,
                channel,
                send_date,
                status,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                campaign.uuid.to_string(),
                campaign.name.as_str(),
                campaign.description.as_deref(),
                campaign.channel.as_db_str(),
                campaign.send_date,
                campaign.status.as_db_str(),
                campaign.created_at,
            ],
        )?;

        Ok(campaign.uuid)
    }

    fn get_campaign(&self, id: CampaignId) -> RepoResult<Option<Campaign>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CAMPAIGN_SELECT_SQL} WHERE campaign_uuid = ?1;"))?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_campaign_row(row)?));
        }

        Ok(None)
    }

    fn list_campaigns(&self) -> RepoResult<Vec<Campaign>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CAMPAIGN_SELECT_SQL} ORDER BY send_date DESC, campaign_uuid ASC;"
        ))?;

        let mut rows = stmt.query([])?;
        let mut campaigns = Vec::new();
        while let Some(row) = rows.next()? {
            campaigns.push(parse_campaign_row(row)?);
        }

        Ok(campaigns)
    }

    fn enroll_contact(&self, campaign: CampaignId, contact: ContactId) -> RepoResult<()> {
        self.require_campaign(campaign)?;
        if contact_kind(self.conn, contact)?.is_none() {
            return Err(RepoError::ContactNotFound(contact));
        }

        let inserted = self.conn.execute(
            "INSERT INTO campaign_contacts (
                campaign_uuid,
                contact_uuid,
                response_status,
                response_date,
                created_at
            ) VALUES (?1, ?2, 'pending', NULL, ?3);",
            params![campaign.to_string(), contact.to_string(), Utc::now()],
        );

        match inserted {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(RepoError::DuplicateEnrollment { campaign, contact })
            }
            Err(err) => Err(err.into()),
        }
    }

    fn list_contacts(
        &self,
        campaign: CampaignId,
        status: ResponseStatus,
    ) -> RepoResult<Vec<CampaignContactRecord>> {
        self.require_campaign(campaign)?;

        let mut stmt = self.conn.prepare(
            "SELECT
                c.contact_uuid,
                c.full_name,
                c.contact_type,
                c.email,
                c.phone,
                cc.response_status,
                cc.response_date
             FROM campaign_contacts cc
             INNER JOIN contacts c ON c.contact_uuid = cc.contact_uuid
             WHERE cc.campaign_uuid = ?1
               AND cc.response_status = ?2
             ORDER BY c.full_name ASC, c.contact_uuid ASC;",
        )?;

        let mut rows = stmt.query(params![campaign.to_string(), status.as_db_str()])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_campaign_contact_row(row)?);
        }

        let mut summaries =
            relationship_summaries_for_campaign(self.conn, campaign, status.as_db_str())?;
        for record in &mut records {
            if let Some(links) = summaries.remove(&record.contact_id) {
                record.relationships = links;
            }
        }

        Ok(records)
    }

    fn set_response(
        &self,
        campaign: CampaignId,
        contact: ContactId,
        status: ResponseStatus,
        date: Option<NaiveDate>,
    ) -> RepoResult<()> {
        if status.is_pending() && date.is_some() {
            return Err(RepoError::Validation(ValidationError::ResponseDateOnPending));
        }

        // Auto-stamp policy: a non-pending transition without a caller date
        // records the current date.
        let effective_date = if status.is_pending() {
            None
        } else {
            Some(date.unwrap_or_else(|| Utc::now().date_naive()))
        };

        let changed = self.conn.execute(
            "UPDATE campaign_contacts
             SET response_status = ?1, response_date = ?2
             WHERE campaign_uuid = ?3
               AND contact_uuid = ?4;",
            params![
                status.as_db_str(),
                effective_date,
                campaign.to_string(),
                contact.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::ResponseNotFound { campaign, contact });
        }

        Ok(())
    }
}

fn parse_campaign_row(row: &Row<'_>) -> RepoResult<Campaign> {
    let uuid_text: String = row.get("campaign_uuid")?;
    let channel_text: String = row.get("channel")?;
    let status_text: String = row.get("status")?;

    Ok(Campaign {
        uuid: parse_uuid(&uuid_text, "campaigns.campaign_uuid")?,
        name: row.get("name")?,
        description: row.get("description")?,
        channel: Channel::from_db_str(&channel_text).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid channel `{channel_text}` in campaigns.channel"))
        })?,
        send_date: row.get("send_date")?,
        status: CampaignStatus::from_db_str(&status_text).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid status `{status_text}` in campaigns.status"))
        })?,
        created_at: row.get("created_at")?,
    })
}

fn parse_campaign_contact_row(row: &Row<'_>) -> RepoResult<CampaignContactRecord> {
    let uuid_text: String = row.get("contact_uuid")?;
    let kind_text: String = row.get("contact_type")?;
    let status_text: String = row.get("response_status")?;

    Ok(CampaignContactRecord {
        contact_id: parse_uuid(&uuid_text, "contacts.contact_uuid")?,
        full_name: row.get("full_name")?,
        contact_type: parse_contact_type(&kind_text)?,
        email: row.get("email")?,
        phone: row.get("phone")?,
        response_status: parse_response_status(&status_text)?,
        response_date: row.get("response_date")?,
        relationships: Vec::new(),
    })
}

pub(crate) fn parse_response_status(value: &str) -> RepoResult<ResponseStatus> {
    ResponseStatus::from_db_str(value).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid response status `{value}` in campaign_contacts.response_status"
        ))
    })
}

/// Loads organisation-link summaries for every contact in the campaign with
/// the given response status, grouped by contact, in edge insertion order.
fn relationship_summaries_for_campaign(
    conn: &Connection,
    campaign: CampaignId,
    status: &str,
) -> RepoResult<HashMap<ContactId, Vec<RelationshipSummary>>> {
    let mut stmt = conn.prepare(
        "SELECT
            r.from_contact_uuid,
            r.relationship_type,
            o.full_name AS organisation
         FROM relationships r
         INNER JOIN contacts o ON o.contact_uuid = r.to_contact_uuid
         INNER JOIN campaign_contacts cc ON cc.contact_uuid = r.from_contact_uuid
         WHERE cc.campaign_uuid = ?1
           AND cc.response_status = ?2
         ORDER BY r.created_at ASC, r.relationship_uuid ASC;",
    )?;

    let mut rows = stmt.query(params![campaign.to_string(), status])?;
    let mut summaries: HashMap<ContactId, Vec<RelationshipSummary>> = HashMap::new();

    while let Some(row) = rows.next()? {
        let contact_text: String = row.get("from_contact_uuid")?;
        let type_text: String = row.get("relationship_type")?;
        let contact = parse_uuid(&contact_text, "relationships.from_contact_uuid")?;
        summaries.entry(contact).or_default().push(RelationshipSummary {
            relationship_type: parse_relationship_type(&type_text)?,
            organisation: row.get("organisation")?,
        });
    }

    Ok(summaries)
}
