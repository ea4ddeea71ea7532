//! Campaign and response-record domain model.
//!
//! # Responsibility
//! - Define campaigns and the per-contact response rows counted by stats.
//! - Own the response-status/date coupling rule.
//!
//! # Invariants
//! - A response date is present if and only if the status is non-pending.
//! - `(campaign, contact)` identifies exactly one response row.

use crate::model::contact::ContactId;
use crate::model::ValidationError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for campaigns.
pub type CampaignId = Uuid;

/// Outreach channel a campaign was sent through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    Phone,
    Mail,
}

impl Channel {
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Mail => "mail",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "email" => Some(Self::Email),
            "phone" => Some(Self::Phone),
            "mail" => Some(Self::Mail),
            _ => None,
        }
    }
}

/// Send-process state of a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Draft,
    Scheduled,
    Sent,
    Completed,
}

impl CampaignStatus {
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Scheduled => "scheduled",
            Self::Sent => "sent",
            Self::Completed => "completed",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "scheduled" => Some(Self::Scheduled),
            "sent" => Some(Self::Sent),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// Marketing campaign record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    #[serde(rename = "id")]
    pub uuid: CampaignId,
    pub name: String,
    pub description: Option<String>,
    pub channel: Channel,
    pub send_date: NaiveDate,
    pub status: CampaignStatus,
    pub created_at: DateTime<Utc>,
}

impl Campaign {
    /// Creates a draft campaign with a generated stable ID.
    pub fn new(name: impl Into<String>, channel: Channel, send_date: NaiveDate) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            description: None,
            channel,
            send_date,
            status: CampaignStatus::Draft,
            created_at: Utc::now(),
        }
    }

    /// Checks field-level invariants before persistence.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        Ok(())
    }
}

/// Per-contact response outcome; the unit the aggregation engine counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Pending,
    Responded,
    Converted,
    NotInterested,
}

impl ResponseStatus {
    pub fn is_pending(self) -> bool {
        self == Self::Pending
    }

    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Responded => "responded",
            Self::Converted => "converted",
            Self::NotInterested => "not_interested",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "responded" => Some(Self::Responded),
            "converted" => Some(Self::Converted),
            "not_interested" => Some(Self::NotInterested),
            _ => None,
        }
    }
}

impl Display for ResponseStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db_str())
    }
}

/// One campaign/contact response row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignContact {
    #[serde(rename = "campaign_id")]
    pub campaign: CampaignId,
    #[serde(rename = "contact_id")]
    pub contact: ContactId,
    pub response_status: ResponseStatus,
    pub response_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl CampaignContact {
    /// Creates a pending response row for a freshly enrolled contact.
    pub fn new(campaign: CampaignId, contact: ContactId) -> Self {
        Self {
            campaign,
            contact,
            response_status: ResponseStatus::Pending,
            response_date: None,
            created_at: Utc::now(),
        }
    }

    /// Checks the status/date coupling on a row.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match (self.response_status.is_pending(), self.response_date) {
            (true, Some(_)) => Err(ValidationError::ResponseDateOnPending),
            (false, None) => Err(ValidationError::ResponseDateMissing(self.response_status)),
            _ => Ok(()),
        }
    }
}
