use clientbook_core::db::open_db_in_memory;
use clientbook_core::{
    Contact, ContactRepository, ContactType, RelationshipRepository, RelationshipType, RepoError,
    SqliteContactRepository, SqliteRelationshipRepository, ValidationError,
};
use uuid::Uuid;

fn person(repo: &SqliteContactRepository<'_>, name: &str) -> Contact {
    let contact = Contact::new(ContactType::Individual, name);
    repo.create_contact(&contact).unwrap();
    contact
}

fn business(repo: &SqliteContactRepository<'_>, name: &str) -> Contact {
    let contact = Contact::new(ContactType::Business, name);
    repo.create_contact(&contact).unwrap();
    contact
}

fn estate(repo: &SqliteContactRepository<'_>, name: &str) -> Contact {
    let contact = Contact::new(ContactType::Estate, name);
    repo.create_contact(&contact).unwrap();
    contact
}

#[test]
fn add_and_list_relationship() {
    let conn = open_db_in_memory().unwrap();
    let contacts = SqliteContactRepository::try_new(&conn).unwrap();
    let graph = SqliteRelationshipRepository::try_new(&conn).unwrap();

    let mut amy = Contact::new(ContactType::Individual, "Amy Okafor");
    amy.email = Some("amy@example.com".to_string());
    contacts.create_contact(&amy).unwrap();
    let acme = business(&contacts, "Acme Accounting");

    let edge_id = graph
        .add_relationship(amy.uuid, acme.uuid, RelationshipType::WorksFor)
        .unwrap();

    let linked = graph.list_for_organisation(acme.uuid).unwrap();
    assert_eq!(linked.len(), 1);
    assert_eq!(linked[0].relationship_id, edge_id);
    assert_eq!(linked[0].person_id, amy.uuid);
    assert_eq!(linked[0].full_name, "Amy Okafor");
    assert_eq!(linked[0].email.as_deref(), Some("amy@example.com"));
    assert_eq!(linked[0].relationship_type, RelationshipType::WorksFor);
}

#[test]
fn relationship_type_must_match_target_kind() {
    let conn = open_db_in_memory().unwrap();
    let contacts = SqliteContactRepository::try_new(&conn).unwrap();
    let graph = SqliteRelationshipRepository::try_new(&conn).unwrap();

    let amy = person(&contacts, "Amy Okafor");
    let barker = estate(&contacts, "Barker Estate");

    let err = graph
        .add_relationship(amy.uuid, barker.uuid, RelationshipType::WorksFor)
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::RelationshipTypeNotAllowed {
            relationship_type: RelationshipType::WorksFor,
            target_kind: ContactType::Estate,
        })
    ));

    graph
        .add_relationship(amy.uuid, barker.uuid, RelationshipType::TrusteeOf)
        .unwrap();
}

#[test]
fn source_must_be_individual_and_target_an_organisation() {
    let conn = open_db_in_memory().unwrap();
    let contacts = SqliteContactRepository::try_new(&conn).unwrap();
    let graph = SqliteRelationshipRepository::try_new(&conn).unwrap();

    let amy = person(&contacts, "Amy Okafor");
    let tom = person(&contacts, "Tom Barker");
    let acme = business(&contacts, "Acme Accounting");

    let err = graph
        .add_relationship(acme.uuid, acme.uuid, RelationshipType::WorksFor)
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::SourceNotIndividual { .. })
    ));

    let err = graph
        .add_relationship(amy.uuid, tom.uuid, RelationshipType::WorksFor)
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::TargetNotOrganisation { .. })
    ));
}

#[test]
fn missing_endpoints_are_reported() {
    let conn = open_db_in_memory().unwrap();
    let contacts = SqliteContactRepository::try_new(&conn).unwrap();
    let graph = SqliteRelationshipRepository::try_new(&conn).unwrap();

    let amy = person(&contacts, "Amy Okafor");
    let ghost = Uuid::new_v4();

    let err = graph
        .add_relationship(ghost, amy.uuid, RelationshipType::WorksFor)
        .unwrap_err();
    assert!(matches!(err, RepoError::ContactNotFound(id) if id == ghost));

    let err = graph
        .add_relationship(amy.uuid, ghost, RelationshipType::WorksFor)
        .unwrap_err();
    assert!(matches!(err, RepoError::ContactNotFound(id) if id == ghost));
}

#[test]
fn duplicate_triple_conflicts_but_new_type_succeeds() {
    let conn = open_db_in_memory().unwrap();
    let contacts = SqliteContactRepository::try_new(&conn).unwrap();
    let graph = SqliteRelationshipRepository::try_new(&conn).unwrap();

    let amy = person(&contacts, "Amy Okafor");
    let acme = business(&contacts, "Acme Accounting");

    graph
        .add_relationship(amy.uuid, acme.uuid, RelationshipType::WorksFor)
        .unwrap();

    let err = graph
        .add_relationship(amy.uuid, acme.uuid, RelationshipType::WorksFor)
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::DuplicateRelationship {
            relationship_type: RelationshipType::WorksFor,
            ..
        }
    ));

    // Same pair, different label: allowed.
    graph
        .add_relationship(amy.uuid, acme.uuid, RelationshipType::DirectorOf)
        .unwrap();
    assert_eq!(graph.list_for_organisation(acme.uuid).unwrap().len(), 2);
}

#[test]
fn list_for_organisation_preserves_insertion_order() {
    let conn = open_db_in_memory().unwrap();
    let contacts = SqliteContactRepository::try_new(&conn).unwrap();
    let graph = SqliteRelationshipRepository::try_new(&conn).unwrap();

    let acme = business(&contacts, "Acme Accounting");
    let zara = person(&contacts, "Zara Quinn");
    let amy = person(&contacts, "Amy Okafor");
    let tom = person(&contacts, "Tom Barker");

    // Insertion order deliberately differs from name order.
    graph
        .add_relationship(zara.uuid, acme.uuid, RelationshipType::Manages)
        .unwrap();
    graph
        .add_relationship(amy.uuid, acme.uuid, RelationshipType::WorksFor)
        .unwrap();
    graph
        .add_relationship(tom.uuid, acme.uuid, RelationshipType::OwnerOf)
        .unwrap();

    let linked = graph.list_for_organisation(acme.uuid).unwrap();
    let order: Vec<_> = linked.iter().map(|row| row.person_id).collect();
    assert_eq!(order, vec![zara.uuid, amy.uuid, tom.uuid]);
}

#[test]
fn list_for_person_returns_organisation_links() {
    let conn = open_db_in_memory().unwrap();
    let contacts = SqliteContactRepository::try_new(&conn).unwrap();
    let graph = SqliteRelationshipRepository::try_new(&conn).unwrap();

    let amy = person(&contacts, "Amy Okafor");
    let acme = business(&contacts, "Acme Accounting");
    let barker = estate(&contacts, "Barker Estate");

    graph
        .add_relationship(amy.uuid, acme.uuid, RelationshipType::WorksFor)
        .unwrap();
    graph
        .add_relationship(amy.uuid, barker.uuid, RelationshipType::BeneficiaryOf)
        .unwrap();

    let links = graph.list_for_person(amy.uuid).unwrap();
    assert_eq!(links.len(), 2);
    assert_eq!(links[0].organisation_id, acme.uuid);
    assert_eq!(links[0].relationship_type, RelationshipType::WorksFor);
    assert_eq!(links[1].organisation_id, barker.uuid);
    assert_eq!(links[1].full_name, "Barker Estate");
}

#[test]
fn candidate_people_excludes_linked_and_org_itself() {
    let conn = open_db_in_memory().unwrap();
    let contacts = SqliteContactRepository::try_new(&conn).unwrap();
    let graph = SqliteRelationshipRepository::try_new(&conn).unwrap();

    let acme = business(&contacts, "Acme Accounting");
    let amy = person(&contacts, "Amy Okafor");
    let tom = person(&contacts, "Tom Barker");

    let before: Vec<_> = graph
        .candidate_people(acme.uuid)
        .unwrap()
        .into_iter()
        .map(|(id, _)| id)
        .collect();
    assert_eq!(before, vec![amy.uuid, tom.uuid]);

    graph
        .add_relationship(amy.uuid, acme.uuid, RelationshipType::WorksFor)
        .unwrap();

    let after: Vec<_> = graph
        .candidate_people(acme.uuid)
        .unwrap()
        .into_iter()
        .map(|(id, _)| id)
        .collect();
    assert_eq!(after, vec![tom.uuid]);
}

#[test]
fn remove_relationship_reports_not_found() {
    let conn = open_db_in_memory().unwrap();
    let contacts = SqliteContactRepository::try_new(&conn).unwrap();
    let graph = SqliteRelationshipRepository::try_new(&conn).unwrap();

    let amy = person(&contacts, "Amy Okafor");
    let acme = business(&contacts, "Acme Accounting");

    let edge_id = graph
        .add_relationship(amy.uuid, acme.uuid, RelationshipType::WorksFor)
        .unwrap();

    graph.remove_relationship(edge_id).unwrap();
    assert!(graph.list_for_organisation(acme.uuid).unwrap().is_empty());

    // A second removal surfaces the stale id instead of masking it.
    let err = graph.remove_relationship(edge_id).unwrap_err();
    assert!(matches!(err, RepoError::RelationshipNotFound(id) if id == edge_id));
}
