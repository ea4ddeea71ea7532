//! Contact use-case service.
//!
//! # Responsibility
//! - Provide per-kind creation helpers for the contact store.
//! - Delegate persistence to repository implementations.
//!
//! # Invariants
//! - Service APIs never bypass repository validation contracts.
//! - Service layer remains storage-agnostic.

use crate::model::contact::{Contact, ContactId, ContactType};
use crate::repo::contact_repo::{ContactListQuery, ContactRepository, OrganisationSummary};
use crate::repo::RepoResult;

/// Use-case service wrapper for contact operations.
pub struct ContactService<R: ContactRepository> {
    repo: R,
}

impl<R: ContactRepository> ContactService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates an individual contact from minimal form input.
    pub fn create_individual(
        &self,
        full_name: impl Into<String>,
        email: Option<String>,
    ) -> RepoResult<ContactId> {
        let mut contact = Contact::new(ContactType::Individual, full_name);
        contact.email = email;
        self.repo.create_contact(&contact)
    }

    /// Creates a business contact; `company_name` mirrors the display name.
    pub fn create_business(&self, full_name: impl Into<String>) -> RepoResult<ContactId> {
        let mut contact = Contact::new(ContactType::Business, full_name);
        contact.company_name = Some(contact.full_name.clone());
        self.repo.create_contact(&contact)
    }

    /// Creates an estate contact.
    pub fn create_estate(&self, full_name: impl Into<String>) -> RepoResult<ContactId> {
        let contact = Contact::new(ContactType::Estate, full_name);
        self.repo.create_contact(&contact)
    }

    /// Creates a fully specified contact.
    pub fn create_contact(&self, contact: &Contact) -> RepoResult<ContactId> {
        self.repo.create_contact(contact)
    }

    /// Updates an existing contact by stable ID.
    pub fn update_contact(&self, contact: &Contact) -> RepoResult<()> {
        self.repo.update_contact(contact)
    }

    /// Gets one contact by ID.
    pub fn get_contact(&self, id: ContactId) -> RepoResult<Option<Contact>> {
        self.repo.get_contact(id)
    }

    /// Lists contacts using filter and pagination options.
    pub fn list_contacts(&self, query: &ContactListQuery) -> RepoResult<Vec<Contact>> {
        self.repo.list_contacts(query)
    }

    /// Deletes a contact; edges, subscriptions and responses cascade.
    pub fn delete_contact(&self, id: ContactId) -> RepoResult<()> {
        self.repo.delete_contact(id)
    }

    /// Lists organisations with their linked-people counts.
    pub fn list_organisations(&self) -> RepoResult<Vec<OrganisationSummary>> {
        self.repo.list_organisations()
    }
}
