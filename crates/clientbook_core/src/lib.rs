//! Core domain logic for the clientbook CRM.
//! This crate is the single source of truth for business invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;
pub mod stats;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::campaign::{
    Campaign, CampaignContact, CampaignId, CampaignStatus, Channel, ResponseStatus,
};
pub use model::contact::{Contact, ContactId, ContactType};
pub use model::product::{
    BillingFrequency, Currency, CustomerProduct, Product, ProductId, ProductStatus,
    SubscriptionId, SubscriptionStatus,
};
pub use model::relationship::{
    Relationship, RelationshipId, RelationshipSummary, RelationshipType,
};
pub use model::ValidationError;
pub use repo::campaign_repo::{CampaignContactRecord, CampaignRepository, SqliteCampaignRepository};
pub use repo::contact_repo::{
    ContactListQuery, ContactRepository, OrganisationSummary, SqliteContactRepository,
};
pub use repo::product_repo::{
    ProductListQuery, ProductRepository, SqliteProductRepository, SubscriptionRecord,
    SubscriptionRepository,
};
pub use repo::relationship_repo::{
    LinkedPerson, OrganisationLink, RelationshipRepository, SqliteRelationshipRepository,
};
pub use repo::{RepoError, RepoResult};
pub use search::contacts::{
    search_contacts, ContactHit, ContactSearchQuery, SearchError, SearchResult,
};
pub use service::campaign_service::CampaignService;
pub use service::contact_service::ContactService;
pub use service::subscription_service::SubscriptionService;
pub use stats::{
    campaign_stats, dashboard_stats, drill_down, overview_stats, CampaignStats, DashboardStats,
    OverviewStats, ResponseContact, StatsError, StatsResult,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
