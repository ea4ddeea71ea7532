//! Campaign aggregation engine.
//!
//! # Responsibility
//! - Compute overview and per-campaign response statistics.
//! - Resolve drill-down contact lists behind aggregated counts.
//!
//! # Invariants
//! - Each counting operation is a single SQL statement, so the counts inside
//!   one result always sum to the total even under concurrent writers.
//! - An empty campaign-id scope means "all campaigns", never "no campaigns".
//! - `response_rate` is computed with f64 division, rounded to one decimal,
//!   and defined as 0.0 when the scope is empty.
//! - Drill-down ordering is implementation-defined but stable:
//!   `campaign name ASC, full_name ASC, contact_uuid ASC`.

use crate::db::DbError;
use crate::model::campaign::{CampaignId, ResponseStatus};
use crate::model::contact::{ContactId, ContactType};
use crate::model::relationship::RelationshipSummary;
use crate::repo::campaign_repo::parse_response_status;
use crate::repo::contact_repo::parse_contact_type;
use crate::repo::relationship_repo::parse_relationship_type;
use crate::repo::parse_uuid;
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use serde::Serialize;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StatsResult<T> = Result<T, StatsError>;

/// Aggregation-layer error for scope resolution and result decoding.
#[derive(Debug)]
pub enum StatsError {
    Db(DbError),
    CampaignNotFound(CampaignId),
    InvalidData(String),
}

impl Display for StatsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::CampaignNotFound(id) => write!(f, "campaign not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid aggregation row: {message}"),
        }
    }
}

impl Error for StatsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::CampaignNotFound(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for StatsError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StatsError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<crate::repo::RepoError> for StatsError {
    fn from(value: crate::repo::RepoError) -> Self {
        match value {
            crate::repo::RepoError::Db(err) => Self::Db(err),
            other => Self::InvalidData(other.to_string()),
        }
    }
}

/// Response totals across a set of campaigns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverviewStats {
    pub total_contacts: i64,
    pub total_responded: i64,
    pub total_converted: i64,
    pub total_not_interested: i64,
    pub total_pending: i64,
    pub response_rate: f64,
}

/// Response totals for a single campaign, including everything it was sent to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CampaignStats {
    pub total_sent: i64,
    pub responded: i64,
    pub converted: i64,
    pub not_interested: i64,
    pub pending: i64,
    pub response_rate: f64,
}

/// Top-level dashboard counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_contacts: i64,
    pub individuals: i64,
    pub businesses: i64,
    pub estates: i64,
    pub total_campaigns: i64,
}

/// One drill-down row: the contact behind an aggregated count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseContact {
    #[serde(rename = "id")]
    pub contact_id: ContactId,
    pub full_name: String,
    pub contact_type: ContactType,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub campaign_id: CampaignId,
    pub campaign_name: String,
    pub response_status: ResponseStatus,
    pub response_date: Option<NaiveDate>,
    pub relationships: Vec<RelationshipSummary>,
}

struct ResponseTotals {
    total: i64,
    responded: i64,
    converted: i64,
    not_interested: i64,
    pending: i64,
}

/// Computes overview totals over the given campaign scope.
///
/// An empty `campaigns` slice widens the scope to every campaign.
pub fn overview_stats(conn: &Connection, campaigns: &[CampaignId]) -> StatsResult<OverviewStats> {
    let totals = response_totals(conn, campaigns)?;
    Ok(OverviewStats {
        total_contacts: totals.total,
        total_responded: totals.responded,
        total_converted: totals.converted,
        total_not_interested: totals.not_interested,
        total_pending: totals.pending,
        response_rate: response_rate(totals.responded, totals.converted, totals.total),
    })
}

/// Computes detail statistics for one campaign.
///
/// `total_sent` counts every response row of the campaign regardless of
/// status.
pub fn campaign_stats(conn: &Connection, campaign: CampaignId) -> StatsResult<CampaignStats> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM campaigns WHERE campaign_uuid = ?1);",
        [campaign.to_string()],
        |row| row.get(0),
    )?;
    if exists == 0 {
        return Err(StatsError::CampaignNotFound(campaign));
    }

    let totals = response_totals(conn, &[campaign])?;
    Ok(CampaignStats {
        total_sent: totals.total,
        responded: totals.responded,
        converted: totals.converted,
        not_interested: totals.not_interested,
        pending: totals.pending,
        response_rate: response_rate(totals.responded, totals.converted, totals.total),
    })
}

/// Lists the contacts behind one aggregated count.
///
/// Scope rules match [`overview_stats`]; each row carries the campaign it
/// was counted under, so a contact enrolled in two in-scope campaigns
/// appears twice.
pub fn drill_down(
    conn: &Connection,
    campaigns: &[CampaignId],
    status: ResponseStatus,
) -> StatsResult<Vec<ResponseContact>> {
    let mut sql = String::from(
        "SELECT
            c.contact_uuid,
            c.full_name,
            c.contact_type,
            c.email,
            c.phone,
            k.campaign_uuid,
            k.name AS campaign_name,
            cc.response_status,
            cc.response_date
         FROM campaign_contacts cc
         INNER JOIN contacts c ON c.contact_uuid = cc.contact_uuid
         INNER JOIN campaigns k ON k.campaign_uuid = cc.campaign_uuid
         WHERE cc.response_status = ?",
    );
    let mut bind_values: Vec<Value> = vec![Value::Text(status.as_db_str().to_string())];
    push_campaign_scope(&mut sql, &mut bind_values, "cc.campaign_uuid", campaigns);
    sql.push_str(" ORDER BY k.name ASC, c.full_name ASC, c.contact_uuid ASC;");

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut contacts = Vec::new();
    while let Some(row) = rows.next()? {
        contacts.push(parse_response_contact_row(row)?);
    }

    // A contact enrolled in two in-scope campaigns appears twice and each
    // row carries the same summary list, so the map is read, not drained.
    let summaries = relationship_summaries(conn, &contacts)?;
    for contact in &mut contacts {
        if let Some(links) = summaries.get(&contact.contact_id) {
            contact.relationships = links.clone();
        }
    }

    Ok(contacts)
}

/// Computes top-level dashboard counters.
pub fn dashboard_stats(conn: &Connection) -> StatsResult<DashboardStats> {
    let (total, individuals, businesses, estates) = conn.query_row(
        "SELECT
            COUNT(*),
            COALESCE(SUM(CASE WHEN contact_type = 'individual' THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN contact_type = 'business' THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN contact_type = 'estate' THEN 1 ELSE 0 END), 0)
         FROM contacts;",
        [],
        |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
            ))
        },
    )?;

    let total_campaigns: i64 = conn.query_row("SELECT COUNT(*) FROM campaigns;", [], |row| {
        row.get(0)
    })?;

    Ok(DashboardStats {
        total_contacts: total,
        individuals,
        businesses,
        estates,
        total_campaigns,
    })
}

fn response_totals(conn: &Connection, campaigns: &[CampaignId]) -> StatsResult<ResponseTotals> {
    let mut sql = String::from(
        "SELECT
            COUNT(*),
            COALESCE(SUM(CASE WHEN response_status = 'responded' THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN response_status = 'converted' THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN response_status = 'not_interested' THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN response_status = 'pending' THEN 1 ELSE 0 END), 0)
         FROM campaign_contacts
         WHERE 1 = 1",
    );
    let mut bind_values: Vec<Value> = Vec::new();
    push_campaign_scope(&mut sql, &mut bind_values, "campaign_uuid", campaigns);
    sql.push(';');

    let mut stmt = conn.prepare(&sql)?;
    let totals = stmt.query_row(params_from_iter(bind_values), |row| {
        Ok(ResponseTotals {
            total: row.get(0)?,
            responded: row.get(1)?,
            converted: row.get(2)?,
            not_interested: row.get(3)?,
            pending: row.get(4)?,
        })
    })?;

    Ok(totals)
}

fn push_campaign_scope(
    sql: &mut String,
    bind_values: &mut Vec<Value>,
    column: &str,
    campaigns: &[CampaignId],
) {
    if campaigns.is_empty() {
        return;
    }

    sql.push_str(&format!(" AND {column} IN ("));
    for (index, campaign) in campaigns.iter().enumerate() {
        if index > 0 {
            sql.push_str(", ");
        }
        sql.push('?');
        bind_values.push(Value::Text(campaign.to_string()));
    }
    sql.push(')');
}

/// Rounds `(responded + converted) / total * 100` to one decimal place.
fn response_rate(responded: i64, converted: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let rate = (responded + converted) as f64 / total as f64 * 100.0;
    (rate * 10.0).round() / 10.0
}

fn parse_response_contact_row(row: &Row<'_>) -> StatsResult<ResponseContact> {
    let contact_text: String = row.get("contact_uuid")?;
    let kind_text: String = row.get("contact_type")?;
    let campaign_text: String = row.get("campaign_uuid")?;
    let status_text: String = row.get("response_status")?;

    Ok(ResponseContact {
        contact_id: parse_uuid(&contact_text, "contacts.contact_uuid")?,
        full_name: row.get("full_name")?,
        contact_type: parse_contact_type(&kind_text)?,
        email: row.get("email")?,
        phone: row.get("phone")?,
        campaign_id: parse_uuid(&campaign_text, "campaigns.campaign_uuid")?,
        campaign_name: row.get("campaign_name")?,
        response_status: parse_response_status(&status_text)?,
        response_date: row.get("response_date")?,
        relationships: Vec::new(),
    })
}

/// Loads organisation-link summaries for every contact in the result set,
/// grouped by contact, in edge insertion order.
fn relationship_summaries(
    conn: &Connection,
    contacts: &[ResponseContact],
) -> StatsResult<HashMap<ContactId, Vec<RelationshipSummary>>> {
    let mut summaries: HashMap<ContactId, Vec<RelationshipSummary>> = HashMap::new();
    if contacts.is_empty() {
        return Ok(summaries);
    }

    let mut ids: Vec<ContactId> = contacts.iter().map(|contact| contact.contact_id).collect();
    ids.sort();
    ids.dedup();

    let mut sql = String::from(
        "SELECT
            r.from_contact_uuid,
            r.relationship_type,
            o.full_name AS organisation
         FROM relationships r
         INNER JOIN contacts o ON o.contact_uuid = r.to_contact_uuid
         WHERE r.from_contact_uuid IN (",
    );
    let mut bind_values: Vec<Value> = Vec::new();
    for (index, id) in ids.iter().enumerate() {
        if index > 0 {
            sql.push_str(", ");
        }
        sql.push('?');
        bind_values.push(Value::Text(id.to_string()));
    }
    sql.push_str(") ORDER BY r.created_at ASC, r.relationship_uuid ASC;");

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
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
