use super::{connect, count, teardown};
use tabula::{ColumnType, MigrationError};

fn labels(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn tickets(db: &mut tabula::Database<postgres::Client>) {
    db.session()
        .batch_execute(
            "CREATE TABLE tickets (id integer PRIMARY KEY, state text NOT NULL DEFAULT 'open');
             INSERT INTO tickets VALUES (1, 'open'), (2, 'pending'), (3, 'closed');",
        )
        .unwrap();
    db.create_enum("status", &labels(&["open", "closed"])).unwrap();
}

#[test]
fn enum_create_list_drop() {
    let schema = "enum_lifecycle_test";
    let mut db = connect(schema);

    db.create_enum("color", &labels(&["red", "green"])).unwrap();
    assert_eq!(db.enum_values("color").unwrap(), ["red", "green"]);
    assert_eq!(db.list_enums().unwrap()["color"], ["red", "green"]);

    db.drop_enum("color", false).unwrap();
    assert!(!db.list_enums().unwrap().contains_key("color"));
    assert!(db.enum_values("color").is_err());

    teardown(db, schema);
}

#[test]
fn enum_swap_with_substitute_keeps_constraints() {
    let schema = "enum_swap_test";
    let mut db = connect(schema);
    tickets(&mut db);

    assert_eq!(
        db.find_incompatible_values("tickets", "state", "status").unwrap(),
        ["pending"]
    );

    let swap = db
        .swap_column_to_enum("tickets", "state", "status", Some("closed"))
        .unwrap();
    assert_eq!(swap.replaced, ["pending"]);

    assert!(
        db.find_incompatible_values("tickets", "state", "status")
            .unwrap()
            .is_empty()
    );
    assert_eq!(
        count(&mut db, "SELECT count(*) FROM tickets WHERE state = 'closed'"),
        2
    );

    let meta = db.table("tickets").unwrap().clone();
    let state = meta.column("state").unwrap();
    assert_eq!(state.column_type, ColumnType::Enum);
    assert_eq!(state.enum_name.as_deref(), Some("status"));
    assert!(state.not_null);
    assert!(state.default.as_deref().unwrap().starts_with("'open'::"));
    assert!(meta.column("state__text").is_none());
    assert!(meta.column("state__enum").is_none());

    teardown(db, schema);
}

#[test]
fn enum_swap_without_substitute_leaves_table_untouched() {
    let schema = "enum_swap_fail_test";
    let mut db = connect(schema);
    tickets(&mut db);

    let err = db
        .swap_column_to_enum("tickets", "state", "status", None)
        .unwrap_err();
    assert_eq!(
        err,
        MigrationError::IncompatibleValues {
            enum_name: "status".into(),
            values: vec!["pending".into()],
        }
    );

    let meta = db.table("tickets").unwrap().clone();
    assert_eq!(meta.column("state").unwrap().column_type, ColumnType::Text);
    assert!(meta.column("state__text").is_none());
    assert_eq!(
        count(&mut db, "SELECT count(*) FROM tickets WHERE state = 'pending'"),
        1
    );

    teardown(db, schema);
}
