//! Campaign use-case service.
//!
//! # Responsibility
//! - Provide bulk enrolment for the campaign-send flow.
//! - Delegate response transitions to the campaign repository.

use crate::model::campaign::{Campaign, CampaignId, ResponseStatus};
use crate::model::contact::ContactId;
use crate::repo::campaign_repo::{CampaignContactRecord, CampaignRepository};
use crate::repo::{RepoError, RepoResult};
use chrono::NaiveDate;

/// Use-case service wrapper for campaigns and response tracking.
pub struct CampaignService<R: CampaignRepository> {
    repo: R,
}

impl<R: CampaignRepository> CampaignService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a campaign record.
    pub fn create_campaign(&self, campaign: &Campaign) -> RepoResult<CampaignId> {
        self.repo.create_campaign(campaign)
    }

    /// Gets one campaign by ID.
    pub fn get_campaign(&self, id: CampaignId) -> RepoResult<Option<Campaign>> {
        self.repo.get_campaign(id)
    }

    /// Lists campaigns, newest send date first.
    pub fn list_campaigns(&self) -> RepoResult<Vec<Campaign>> {
        self.repo.list_campaigns()
    }

    /// Enrols a batch of contacts, returning how many rows were created.
    ///
    /// Contacts already enrolled are skipped rather than failing the batch;
    /// every other error aborts it.
    pub fn enroll_contacts(
        &self,
        campaign: CampaignId,
        contacts: &[ContactId],
    ) -> RepoResult<u32> {
        let mut enrolled = 0;
        for &contact in contacts {
            match self.repo.enroll_contact(campaign, contact) {
                Ok(()) => enrolled += 1,
                Err(RepoError::DuplicateEnrollment { .. }) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(enrolled)
    }

    /// Lists response rows for a campaign with an explicit status.
    pub fn list_contacts(
        &self,
        campaign: CampaignId,
        status: ResponseStatus,
    ) -> RepoResult<Vec<CampaignContactRecord>> {
        self.repo.list_contacts(campaign, status)
    }

    /// Records a response-status transition.
    pub fn record_response(
        &self,
        campaign: CampaignId,
        contact: ContactId,
        status: ResponseStatus,
        date: Option<NaiveDate>,
    ) -> RepoResult<()> {
        self.repo.set_response(campaign, contact, status, date)
    }
}
