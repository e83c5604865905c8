//! Integration tests for PgContactRepository: label assignment, filtering,
//! search, ordering, pagination, and statistics.

use chrono::NaiveDate;

use addressbook_core::{
    ContactChanges, ContactFilter, ContactQuery, ContactRepository, ContactSortField, Error,
    LabelRepository, NewContact, OrderBy, TextField,
};
use addressbook_db::test_fixtures::TestDatabase;

async fn setup() -> TestDatabase {
    let _ = dotenvy::dotenv();
    TestDatabase::new().await
}

fn names(contacts: &[addressbook_core::Contact]) -> Vec<&str> {
    contacts.iter().map(|c| c.name.as_str()).collect()
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_family_label_scenario() {
    let test_db = setup().await;
    let db = &test_db.db;

    let family = db.labels.create(test_db.label("Family")).await.unwrap();
    let anna = db.contacts.create(test_db.contact("Anna")).await.unwrap();
    assert!(anna.labels.is_empty());

    let with = db.contacts.add_labels(anna.id, &[family.id]).await.unwrap();
    assert_eq!(with.label_ids(), vec![family.id]);

    let without = db
        .contacts
        .remove_labels(anna.id, &[family.id])
        .await
        .unwrap();
    assert!(without.labels.is_empty());

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_label_ids_replace_clear_and_keep() {
    let test_db = setup().await;
    let db = &test_db.db;

    let l1 = db.labels.create(test_db.label("L1")).await.unwrap();
    let l2 = db.labels.create(test_db.label("L2")).await.unwrap();

    let contact = db
        .contacts
        .create(NewContact {
            label_ids: Some(vec![l1.id, l2.id]),
            ..test_db.contact("Kim")
        })
        .await
        .unwrap();
    assert_eq!(contact.labels.len(), 2);

    // Omitted: labels untouched
    let kept = db
        .contacts
        .update(
            contact.id,
            ContactChanges {
                phone: Some(Some("010-1111-2222".to_string())),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(kept.labels.len(), 2);
    assert_eq!(kept.phone.as_deref(), Some("010-1111-2222"));

    // Empty list: cleared
    let cleared = db
        .contacts
        .update(
            contact.id,
            ContactChanges {
                label_ids: Some(vec![]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(cleared.labels.is_empty());
    assert_eq!(cleared.phone.as_deref(), Some("010-1111-2222"));

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_unknown_label_ids_rejected_without_writing() {
    let test_db = setup().await;
    let db = &test_db.db;

    let err = db
        .contacts
        .create(NewContact {
            label_ids: Some(vec![424_242]),
            ..test_db.contact("Ghost")
        })
        .await
        .expect_err("unknown label id must fail");
    match err {
        Error::Validation(fields) => assert!(fields.contains("label_ids")),
        other => panic!("Expected Validation error, got {:?}", other),
    }

    let page = db.contacts.list(&ContactQuery::default()).await.unwrap();
    assert_eq!(page.total, 0, "failed create must not leave a row behind");

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_add_labels_is_idempotent_and_skips_unknown() {
    let test_db = setup().await;
    let db = &test_db.db;

    let label = db.labels.create(test_db.label("Work")).await.unwrap();
    let contact = db.contacts.create(test_db.contact("Lee")).await.unwrap();

    let once = db
        .contacts
        .add_labels(contact.id, &[label.id, 999_999])
        .await
        .unwrap();
    let twice = db.contacts.add_labels(contact.id, &[label.id]).await.unwrap();
    assert_eq!(once.label_ids(), vec![label.id]);
    assert_eq!(twice.label_ids(), vec![label.id]);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_remove_unattached_label_is_noop() {
    let test_db = setup().await;
    let db = &test_db.db;

    let attached = db.labels.create(test_db.label("Attached")).await.unwrap();
    let other = db.labels.create(test_db.label("Other")).await.unwrap();
    let contact = db
        .contacts
        .create(NewContact {
            label_ids: Some(vec![attached.id]),
            ..test_db.contact("Park")
        })
        .await
        .unwrap();

    let after = db
        .contacts
        .remove_labels(contact.id, &[other.id])
        .await
        .unwrap();
    assert_eq!(after.label_ids(), vec![attached.id]);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_label_actions_on_missing_contact() {
    let test_db = setup().await;
    let contacts = &test_db.db.contacts;

    assert!(matches!(
        contacts.add_labels(999_999, &[1]).await,
        Err(Error::ContactNotFound(999_999))
    ));
    assert!(matches!(
        contacts.remove_labels(999_999, &[1]).await,
        Err(Error::ContactNotFound(999_999))
    ));
    assert!(matches!(
        contacts.delete(999_999).await,
        Err(Error::ContactNotFound(_))
    ));

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_birthday_month_listing() {
    let test_db = setup().await;
    let db = &test_db.db;

    for (name, month) in [("Jan", 1), ("Mar1", 3), ("Mar2", 3), ("Dec", 12)] {
        db.contacts
            .create(NewContact {
                birthday: NaiveDate::from_ymd_opt(1990, month, 15),
                ..test_db.contact(name)
            })
            .await
            .unwrap();
    }
    db.contacts.create(test_db.contact("NoBirthday")).await.unwrap();

    let march = db.contacts.list_by_birthday_month(3).await.unwrap();
    let mut got = names(&march);
    got.sort();
    assert_eq!(got, vec!["Mar1", "Mar2"]);

    assert!(db.contacts.list_by_birthday_month(7).await.unwrap().is_empty());

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_statistics_excludes_empty_strings() {
    let test_db = setup().await;
    let db = &test_db.db;

    let rows = [
        ("A", Some("a@example.com"), Some("ACME"), Some("010")),
        ("B", Some("b@example.com"), Some("ACME"), None),
        ("C", Some(""), Some(""), Some("")),
        ("D", None, Some("Initech"), None),
    ];
    for (name, email, company, phone) in rows {
        db.contacts
            .create(NewContact {
                email: email.map(str::to_string),
                company: company.map(str::to_string),
                phone: phone.map(str::to_string),
                birthday: if name == "A" {
                    NaiveDate::from_ymd_opt(1985, 6, 1)
                } else {
                    None
                },
                ..test_db.contact(name)
            })
            .await
            .unwrap();
    }

    let stats = db.contacts.statistics().await.unwrap();
    assert_eq!(stats.total_contacts, 4);
    assert_eq!(stats.with_email, 2);
    assert_eq!(stats.with_phone, 1);
    assert_eq!(stats.with_birthday, 1);
    assert_eq!(stats.companies, 2);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_labels_filter_returns_only_labelled() {
    let test_db = setup().await;
    let db = &test_db.db;

    let l1 = db.labels.create(test_db.label("L1")).await.unwrap();
    let l2 = db.labels.create(test_db.label("L2")).await.unwrap();
    db.contacts
        .create(NewContact {
            label_ids: Some(vec![l1.id]),
            ..test_db.contact("HasL1")
        })
        .await
        .unwrap();
    db.contacts
        .create(NewContact {
            label_ids: Some(vec![l2.id]),
            ..test_db.contact("HasL2")
        })
        .await
        .unwrap();
    db.contacts.create(test_db.contact("None")).await.unwrap();

    let page = db
        .contacts
        .list(&ContactQuery::new(ContactFilter::new().with_labels(vec![l1.id])))
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(names(&page.contacts), vec!["HasL1"]);

    let any = db
        .contacts
        .list(&ContactQuery::new(
            ContactFilter::new().with_labels(vec![l1.id, l2.id]),
        ))
        .await
        .unwrap();
    assert_eq!(any.total, 2);

    let for_label = db.contacts.list_for_label(l2.id).await.unwrap();
    assert_eq!(names(&for_label), vec!["HasL2"]);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_search_filters_ordering_and_paging() {
    let test_db = setup().await;
    let db = &test_db.db;

    let people = [
        ("Kim Minsu", Some("minsu@acme.com"), Some("ACME")),
        ("Kim Jisoo", Some(""), Some("Initech")),
        ("Lee Acme", None, None),
        ("Park", Some("park@example.com"), Some("Globex")),
    ];
    for (name, email, company) in people {
        db.contacts
            .create(NewContact {
                email: email.map(str::to_string),
                company: company.map(str::to_string),
                ..test_db.contact(name)
            })
            .await
            .unwrap();
    }

    // One term matches any searchable field
    let acme = db
        .contacts
        .list(&ContactQuery::default().with_search("acme"))
        .await
        .unwrap();
    assert_eq!(acme.total, 2);

    // Terms are ANDed
    let kim_acme = db
        .contacts
        .list(&ContactQuery::default().with_search("kim acme"))
        .await
        .unwrap();
    assert_eq!(names(&kim_acme.contacts), vec!["Kim Minsu"]);

    // Case-insensitive substring plus presence flag
    let kims_with_email = db
        .contacts
        .list(&ContactQuery::new(
            ContactFilter::new()
                .contains(TextField::Name, "KIM")
                .has_email(true),
        ))
        .await
        .unwrap();
    assert_eq!(names(&kims_with_email.contacts), vec!["Kim Minsu"]);

    let without_email = db
        .contacts
        .list(&ContactQuery::new(ContactFilter::new().has_email(false)))
        .await
        .unwrap();
    assert_eq!(without_email.total, 2);

    // Ordering with a window: total counts every match
    let query = ContactQuery::default()
        .with_order(OrderBy::<ContactSortField>::parse("name").unwrap())
        .with_page(2, 2);
    let page = db.contacts.list(&query).await.unwrap();
    assert_eq!(page.total, 4);
    assert_eq!(names(&page.contacts), vec!["Lee Acme", "Park"]);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_default_listing_is_newest_first() {
    let test_db = setup().await;
    let db = &test_db.db;

    let first = db.contacts.create(test_db.contact("First")).await.unwrap();
    let second = db.contacts.create(test_db.contact("Second")).await.unwrap();

    let page = db.contacts.list(&ContactQuery::default()).await.unwrap();
    let ids: Vec<_> = page.contacts.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_delete_contact_keeps_labels() {
    let test_db = setup().await;
    let db = &test_db.db;

    let label = db.labels.create(test_db.label("Keep")).await.unwrap();
    let contact = db
        .contacts
        .create(NewContact {
            label_ids: Some(vec![label.id]),
            ..test_db.contact("Gone")
        })
        .await
        .unwrap();

    db.contacts.delete(contact.id).await.unwrap();

    assert!(matches!(
        db.contacts.fetch(contact.id).await,
        Err(Error::ContactNotFound(_))
    ));
    assert!(db.labels.get(label.id).await.unwrap().is_some());
    let stats = db.labels.stats().await.unwrap();
    assert_eq!(stats[0].contact_count, 0);

    test_db.cleanup().await;
}
