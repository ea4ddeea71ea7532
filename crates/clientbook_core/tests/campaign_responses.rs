use chrono::{NaiveDate, Utc};
use clientbook_core::db::open_db_in_memory;
use clientbook_core::{
    Campaign, CampaignRepository, CampaignService, Channel, Contact, ContactRepository,
    ContactType, RelationshipRepository, RelationshipType, RepoError, ResponseStatus,
    SqliteCampaignRepository, SqliteContactRepository, SqliteRelationshipRepository,
    ValidationError,
};
use uuid::Uuid;

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn spring_campaign(repo: &SqliteCampaignRepository<'_>) -> Campaign {
    let mut campaign = Campaign::new("Spring Tax Reminder", Channel::Email, date(2025, 3, 1));
    campaign.description = Some("Annual self-assessment deadline push".to_string());
    repo.create_campaign(&campaign).unwrap();
    campaign
}

fn person(conn: &rusqlite::Connection, name: &str) -> Contact {
    let contacts = SqliteContactRepository::try_new(conn).unwrap();
    let contact = Contact::new(ContactType::Individual, name);
    contacts.create_contact(&contact).unwrap();
    contact
}

#[test]
fn campaign_create_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCampaignRepository::try_new(&conn).unwrap();

    let campaign = spring_campaign(&repo);
    let loaded = repo.get_campaign(campaign.uuid).unwrap().unwrap();
    assert_eq!(loaded, campaign);
}

#[test]
fn list_campaigns_newest_send_date_first() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCampaignRepository::try_new(&conn).unwrap();

    let old = Campaign::new("Winter Mailshot", Channel::Mail, date(2024, 12, 1));
    let new = Campaign::new("Spring Tax Reminder", Channel::Email, date(2025, 3, 1));
    repo.create_campaign(&old).unwrap();
    repo.create_campaign(&new).unwrap();

    let listed = repo.list_campaigns().unwrap();
    assert_eq!(listed[0].uuid, new.uuid);
    assert_eq!(listed[1].uuid, old.uuid);
}

#[test]
fn enrollment_creates_pending_rows_once() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCampaignRepository::try_new(&conn).unwrap();
    let campaign = spring_campaign(&repo);
    let amy = person(&conn, "Amy Okafor");

    repo.enroll_contact(campaign.uuid, amy.uuid).unwrap();

    let pending = repo
        .list_contacts(campaign.uuid, ResponseStatus::Pending)
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].contact_id, amy.uuid);
    assert_eq!(pending[0].response_status, ResponseStatus::Pending);
    assert_eq!(pending[0].response_date, None);

    let err = repo.enroll_contact(campaign.uuid, amy.uuid).unwrap_err();
    assert!(matches!(err, RepoError::DuplicateEnrollment { .. }));
}

#[test]
fn enrollment_checks_both_endpoints() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCampaignRepository::try_new(&conn).unwrap();
    let campaign = spring_campaign(&repo);
    let amy = person(&conn, "Amy Okafor");
    let ghost = Uuid::new_v4();

    let err = repo.enroll_contact(ghost, amy.uuid).unwrap_err();
    assert!(matches!(err, RepoError::CampaignNotFound(id) if id == ghost));

    let err = repo.enroll_contact(campaign.uuid, ghost).unwrap_err();
    assert!(matches!(err, RepoError::ContactNotFound(id) if id == ghost));
}

#[test]
fn set_response_auto_stamps_todays_date() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCampaignRepository::try_new(&conn).unwrap();
    let campaign = spring_campaign(&repo);
    let amy = person(&conn, "Amy Okafor");
    repo.enroll_contact(campaign.uuid, amy.uuid).unwrap();

    repo.set_response(campaign.uuid, amy.uuid, ResponseStatus::Converted, None)
        .unwrap();

    let converted = repo
        .list_contacts(campaign.uuid, ResponseStatus::Converted)
        .unwrap();
    assert_eq!(converted.len(), 1);
    assert_eq!(converted[0].response_date, Some(Utc::now().date_naive()));
}

#[test]
fn set_response_keeps_caller_supplied_date() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCampaignRepository::try_new(&conn).unwrap();
    let campaign = spring_campaign(&repo);
    let amy = person(&conn, "Amy Okafor");
    repo.enroll_contact(campaign.uuid, amy.uuid).unwrap();

    repo.set_response(
        campaign.uuid,
        amy.uuid,
        ResponseStatus::Responded,
        Some(date(2025, 3, 14)),
    )
    .unwrap();

    let responded = repo
        .list_contacts(campaign.uuid, ResponseStatus::Responded)
        .unwrap();
    assert_eq!(responded[0].response_date, Some(date(2025, 3, 14)));
}

#[test]
fn pending_with_date_is_rejected_and_reset_clears_date() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCampaignRepository::try_new(&conn).unwrap();
    let campaign = spring_campaign(&repo);
    let amy = person(&conn, "Amy Okafor");
    repo.enroll_contact(campaign.uuid, amy.uuid).unwrap();

    let err = repo
        .set_response(
            campaign.uuid,
            amy.uuid,
            ResponseStatus::Pending,
            Some(date(2025, 3, 14)),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::ResponseDateOnPending)
    ));

    repo.set_response(campaign.uuid, amy.uuid, ResponseStatus::Converted, None)
        .unwrap();
    repo.set_response(campaign.uuid, amy.uuid, ResponseStatus::Pending, None)
        .unwrap();

    let pending = repo
        .list_contacts(campaign.uuid, ResponseStatus::Pending)
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].response_date, None);
}

#[test]
fn set_response_for_unknown_pair_is_reported() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCampaignRepository::try_new(&conn).unwrap();
    let campaign = spring_campaign(&repo);
    let amy = person(&conn, "Amy Okafor");

    let err = repo
        .set_response(campaign.uuid, amy.uuid, ResponseStatus::Converted, None)
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::ResponseNotFound { campaign: k, contact: c }
            if k == campaign.uuid && c == amy.uuid
    ));
}

#[test]
fn list_contacts_requires_explicit_status_and_joins_relationships() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCampaignRepository::try_new(&conn).unwrap();
    let contacts = SqliteContactRepository::try_new(&conn).unwrap();
    let graph = SqliteRelationshipRepository::try_new(&conn).unwrap();

    let campaign = spring_campaign(&repo);
    let amy = person(&conn, "Amy Okafor");
    let tom = person(&conn, "Tom Barker");
    let acme = Contact::new(ContactType::Business, "Acme Accounting");
    contacts.create_contact(&acme).unwrap();
    graph
        .add_relationship(amy.uuid, acme.uuid, RelationshipType::DirectorOf)
        .unwrap();

    repo.enroll_contact(campaign.uuid, amy.uuid).unwrap();
    repo.enroll_contact(campaign.uuid, tom.uuid).unwrap();
    repo.set_response(campaign.uuid, amy.uuid, ResponseStatus::Converted, None)
        .unwrap();

    let converted = repo
        .list_contacts(campaign.uuid, ResponseStatus::Converted)
        .unwrap();
    assert_eq!(converted.len(), 1);
    assert_eq!(converted[0].contact_id, amy.uuid);
    assert_eq!(converted[0].relationships.len(), 1);
    assert_eq!(converted[0].relationships[0].organisation, "Acme Accounting");
    assert_eq!(
        converted[0].relationships[0].relationship_type,
        RelationshipType::DirectorOf
    );

    // Pending listing still holds the untouched contact only.
    let pending = repo
        .list_contacts(campaign.uuid, ResponseStatus::Pending)
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].contact_id, tom.uuid);
    assert!(pending[0].relationships.is_empty());
}

#[test]
fn service_bulk_enrollment_skips_existing_rows() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCampaignRepository::try_new(&conn).unwrap();
    let campaign = spring_campaign(&repo);
    let amy = person(&conn, "Amy Okafor");
    let tom = person(&conn, "Tom Barker");
    repo.enroll_contact(campaign.uuid, amy.uuid).unwrap();

    let service = CampaignService::new(SqliteCampaignRepository::try_new(&conn).unwrap());
    let enrolled = service
        .enroll_contacts(campaign.uuid, &[amy.uuid, tom.uuid])
        .unwrap();
    assert_eq!(enrolled, 1);

    let pending = service
        .list_contacts(campaign.uuid, ResponseStatus::Pending)
        .unwrap();
    assert_eq!(pending.len(), 2);
}
