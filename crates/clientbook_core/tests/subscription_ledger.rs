use chrono::NaiveDate;
use clientbook_core::db::open_db_in_memory;
use clientbook_core::{
    BillingFrequency, Contact, ContactRepository, ContactType, Currency, CustomerProduct, Product,
    ProductListQuery, ProductRepository, ProductStatus, RepoError, SqliteContactRepository,
    SqliteProductRepository, SubscriptionRepository, SubscriptionService, SubscriptionStatus,
    ValidationError,
};
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn customer(conn: &rusqlite::Connection, name: &str) -> Contact {
    let contacts = SqliteContactRepository::try_new(conn).unwrap();
    let contact = Contact::new(ContactType::Business, name);
    contacts.create_contact(&contact).unwrap();
    contact
}

fn tax_product(repo: &SqliteProductRepository<'_>) -> Product {
    let mut product = Product::new("Annual Tax Return Preparation", date(2025, 1, 1));
    product.product_type = Some("Tax Services".to_string());
    product.base_price = Some(Decimal::from_str("500.00").unwrap());
    product.currency = Some(Currency::Gbp);
    product.billing_frequency = Some(BillingFrequency::Annual);
    repo.create_product(&product).unwrap();
    product
}

#[test]
fn product_create_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProductRepository::try_new(&conn).unwrap();

    let product = tax_product(&repo);
    let loaded = repo.get_product(product.uuid).unwrap().unwrap();
    assert_eq!(loaded, product);
}

#[test]
fn product_listing_filters_by_status() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProductRepository::try_new(&conn).unwrap();

    let active = tax_product(&repo);
    let mut archived = Product::new("Legacy Payroll", date(2023, 1, 1));
    archived.status = ProductStatus::Archived;
    repo.create_product(&archived).unwrap();

    let active_only = repo
        .list_products(&ProductListQuery {
            status: Some(ProductStatus::Active),
        })
        .unwrap();
    assert_eq!(active_only.len(), 1);
    assert_eq!(active_only[0].uuid, active.uuid);

    assert_eq!(repo.list_products(&ProductListQuery::default()).unwrap().len(), 2);
}

#[test]
fn create_revision_builds_acyclic_version_chain() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProductRepository::try_new(&conn).unwrap();

    let original = tax_product(&repo);

    let mut draft = original.clone();
    draft.base_price = Some(Decimal::from_str("550.00").unwrap());
    let second = repo.create_revision(original.uuid, &draft).unwrap();
    assert_eq!(second.version, 2);
    assert_eq!(second.parent_product, Some(original.uuid));

    let third = repo.create_revision(second.uuid, &draft).unwrap();
    assert_eq!(third.version, 3);

    let chain = repo.version_chain(third.uuid).unwrap();
    let ids: Vec<_> = chain.iter().map(|product| product.uuid).collect();
    assert_eq!(ids, vec![third.uuid, second.uuid, original.uuid]);
}

#[test]
fn version_chain_reports_corrupted_cycles() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProductRepository::try_new(&conn).unwrap();

    let original = tax_product(&repo);
    let revision = repo.create_revision(original.uuid, &original.clone()).unwrap();

    // Hand-corrupt the chain: point the root back at its own revision.
    conn.execute(
        "UPDATE products SET parent_product_uuid = ?1 WHERE product_uuid = ?2;",
        rusqlite::params![revision.uuid.to_string(), original.uuid.to_string()],
    )
    .unwrap();

    let err = repo.version_chain(revision.uuid).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(message) if message.contains("cycle")));
}

#[test]
fn add_subscription_defaults_to_active_and_conflicts_on_duplicate() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProductRepository::try_new(&conn).unwrap();
    let contact = customer(&conn, "Harrow & Sons Ltd");
    let product = tax_product(&repo);

    let subscription = CustomerProduct::new(contact.uuid, product.uuid, date(2025, 2, 1));
    assert_eq!(subscription.status, SubscriptionStatus::Active);
    repo.add_subscription(&subscription).unwrap();

    let duplicate = CustomerProduct::new(contact.uuid, product.uuid, date(2025, 3, 1));
    let err = repo.add_subscription(&duplicate).unwrap_err();
    assert!(matches!(
        err,
        RepoError::DuplicateActiveSubscription { contact: c, product: p }
            if c == contact.uuid && p == product.uuid
    ));
}

#[test]
fn ended_subscription_frees_the_pair_for_a_new_one() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProductRepository::try_new(&conn).unwrap();
    let contact = customer(&conn, "Harrow & Sons Ltd");
    let product = tax_product(&repo);

    let subscription = CustomerProduct::new(contact.uuid, product.uuid, date(2025, 2, 1));
    repo.add_subscription(&subscription).unwrap();
    repo.end_subscription(subscription.uuid, date(2025, 6, 30)).unwrap();

    let ended = repo.get_subscription(subscription.uuid).unwrap().unwrap();
    assert_eq!(ended.status, SubscriptionStatus::Ended);
    assert_eq!(ended.end_date, Some(date(2025, 6, 30)));

    // The historical record stays; a fresh subscription is allowed again.
    let renewal = CustomerProduct::new(contact.uuid, product.uuid, date(2025, 7, 1));
    repo.add_subscription(&renewal).unwrap();
}

#[test]
fn close_transitions_require_an_active_subscription() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProductRepository::try_new(&conn).unwrap();
    let contact = customer(&conn, "Harrow & Sons Ltd");
    let product = tax_product(&repo);

    let subscription = CustomerProduct::new(contact.uuid, product.uuid, date(2025, 2, 1));
    repo.add_subscription(&subscription).unwrap();
    repo.end_subscription(subscription.uuid, date(2025, 6, 30)).unwrap();

    let err = repo
        .end_subscription(subscription.uuid, date(2025, 7, 1))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::SubscriptionNotActive {
            status: SubscriptionStatus::Ended,
            ..
        }
    ));

    let err = repo
        .cancel_subscription(subscription.uuid, date(2025, 7, 1))
        .unwrap_err();
    assert!(matches!(err, RepoError::SubscriptionNotActive { .. }));
}

#[test]
fn pending_subscriptions_activate_but_do_not_close() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProductRepository::try_new(&conn).unwrap();
    let contact = customer(&conn, "Harrow & Sons Ltd");
    let product = tax_product(&repo);

    let mut subscription = CustomerProduct::new(contact.uuid, product.uuid, date(2025, 2, 1));
    subscription.status = SubscriptionStatus::Pending;
    repo.add_subscription(&subscription).unwrap();

    let err = repo
        .end_subscription(subscription.uuid, date(2025, 3, 1))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::SubscriptionNotActive {
            status: SubscriptionStatus::Pending,
            ..
        }
    ));

    repo.activate_subscription(subscription.uuid).unwrap();
    let active = repo.get_subscription(subscription.uuid).unwrap().unwrap();
    assert_eq!(active.status, SubscriptionStatus::Active);

    let err = repo.activate_subscription(subscription.uuid).unwrap_err();
    assert!(matches!(err, RepoError::SubscriptionNotPending { .. }));
}

#[test]
fn end_date_must_not_precede_start_date() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProductRepository::try_new(&conn).unwrap();
    let contact = customer(&conn, "Harrow & Sons Ltd");
    let product = tax_product(&repo);

    let subscription = CustomerProduct::new(contact.uuid, product.uuid, date(2025, 2, 1));
    repo.add_subscription(&subscription).unwrap();

    let err = repo
        .end_subscription(subscription.uuid, date(2025, 1, 1))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::EndDateBeforeStartDate)
    ));
}

#[test]
fn remove_subscription_is_allowed_from_any_status() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProductRepository::try_new(&conn).unwrap();
    let contact = customer(&conn, "Harrow & Sons Ltd");
    let product = tax_product(&repo);

    let subscription = CustomerProduct::new(contact.uuid, product.uuid, date(2025, 2, 1));
    repo.add_subscription(&subscription).unwrap();
    repo.end_subscription(subscription.uuid, date(2025, 6, 30)).unwrap();

    repo.remove_subscription(subscription.uuid).unwrap();
    assert!(repo.get_subscription(subscription.uuid).unwrap().is_none());

    let err = repo.remove_subscription(subscription.uuid).unwrap_err();
    assert!(matches!(err, RepoError::SubscriptionNotFound(id) if id == subscription.uuid));
}

#[test]
fn available_products_exclude_active_pairs() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProductRepository::try_new(&conn).unwrap();
    let contact = customer(&conn, "Harrow & Sons Ltd");
    let tax = tax_product(&repo);
    let mut payroll = Product::new("Payroll Management", date(2025, 1, 1));
    payroll.billing_frequency = Some(BillingFrequency::Monthly);
    repo.create_product(&payroll).unwrap();

    let before: Vec<_> = repo
        .available_products_for(contact.uuid)
        .unwrap()
        .into_iter()
        .map(|product| product.uuid)
        .collect();
    assert!(before.contains(&tax.uuid));
    assert!(before.contains(&payroll.uuid));

    let subscription = CustomerProduct::new(contact.uuid, tax.uuid, date(2025, 2, 1));
    repo.add_subscription(&subscription).unwrap();

    let during: Vec<_> = repo
        .available_products_for(contact.uuid)
        .unwrap()
        .into_iter()
        .map(|product| product.uuid)
        .collect();
    assert!(!during.contains(&tax.uuid));
    assert!(during.contains(&payroll.uuid));

    repo.end_subscription(subscription.uuid, date(2025, 6, 30)).unwrap();
    let after: Vec<_> = repo
        .available_products_for(contact.uuid)
        .unwrap()
        .into_iter()
        .map(|product| product.uuid)
        .collect();
    assert!(after.contains(&tax.uuid));
}

#[test]
fn list_for_contact_joins_product_fields() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProductRepository::try_new(&conn).unwrap();
    let contact = customer(&conn, "Harrow & Sons Ltd");
    let product = tax_product(&repo);

    let mut subscription = CustomerProduct::new(contact.uuid, product.uuid, date(2025, 2, 1));
    subscription.actual_price = Some(Decimal::from_str("450.00").unwrap());
    subscription.notes = Some("Long-standing client discount".to_string());
    repo.add_subscription(&subscription).unwrap();

    let records = repo.list_for_contact(contact.uuid).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].customer_product_id, subscription.uuid);
    assert_eq!(records[0].product_name, "Annual Tax Return Preparation");
    assert_eq!(records[0].product_type.as_deref(), Some("Tax Services"));
    assert_eq!(
        records[0].actual_price,
        Some(Decimal::from_str("450.00").unwrap())
    );
    assert_eq!(records[0].status, SubscriptionStatus::Active);
}

#[test]
fn product_delete_is_rejected_while_referenced() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProductRepository::try_new(&conn).unwrap();
    let contact = customer(&conn, "Harrow & Sons Ltd");
    let product = tax_product(&repo);

    let subscription = CustomerProduct::new(contact.uuid, product.uuid, date(2025, 2, 1));
    repo.add_subscription(&subscription).unwrap();

    let err = repo.delete_product(product.uuid).unwrap_err();
    assert!(matches!(err, RepoError::ProductInUse(id) if id == product.uuid));

    repo.remove_subscription(subscription.uuid).unwrap();
    repo.delete_product(product.uuid).unwrap();
    assert!(repo.get_product(product.uuid).unwrap().is_none());
}

#[test]
fn service_defaults_start_and_end_dates() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProductRepository::try_new(&conn).unwrap();
    let contact = customer(&conn, "Harrow & Sons Ltd");
    let product = tax_product(&repo);

    let ledger = SqliteProductRepository::try_new(&conn).unwrap();
    let service = SubscriptionService::new(ledger);

    let id = service
        .start_subscription(contact.uuid, product.uuid, None, None, None)
        .unwrap();

    let stored = repo.get_subscription(id).unwrap().unwrap();
    assert_eq!(stored.status, SubscriptionStatus::Active);
    assert_eq!(stored.start_date, chrono::Utc::now().date_naive());

    service.end_subscription(id, None).unwrap();
    let ended = repo.get_subscription(id).unwrap().unwrap();
    assert_eq!(ended.status, SubscriptionStatus::Ended);
    assert_eq!(ended.end_date, Some(chrono::Utc::now().date_naive()));
}

#[test]
fn subscription_for_unknown_contact_or_product_is_reported() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProductRepository::try_new(&conn).unwrap();
    let contact = customer(&conn, "Harrow & Sons Ltd");
    let product = tax_product(&repo);

    let ghost = Uuid::new_v4();

    let bad_contact = CustomerProduct::new(ghost, product.uuid, date(2025, 2, 1));
    let err = repo.add_subscription(&bad_contact).unwrap_err();
    assert!(matches!(err, RepoError::ContactNotFound(id) if id == ghost));

    let bad_product = CustomerProduct::new(contact.uuid, ghost, date(2025, 2, 1));
    let err = repo.add_subscription(&bad_product).unwrap_err();
    assert!(matches!(err, RepoError::ProductNotFound(id) if id == ghost));
}
