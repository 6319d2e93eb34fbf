use super::{connect, teardown};
use tabula::normalize::normalize_check;
use tabula::serde_json::json;
use tabula::{ColumnType, ErrorKind, PrimaryKey};

const SCHEMA_SQL: &str = r#"
    CREATE TYPE mood AS ENUM ('happy', 'sad');
    CREATE TABLE teams (id integer PRIMARY KEY);
    CREATE TABLE people (
        id integer PRIMARY KEY,
        email varchar(64) CONSTRAINT uniq_people_email UNIQUE,
        age integer DEFAULT 18 CONSTRAINT chk_people_age CHECK (age > 0),
        team integer CONSTRAINT fk_people_team REFERENCES teams (id),
        tags text[],
        feeling mood NOT NULL DEFAULT 'happy'
    );
"#;

#[test]
fn catalog_reads_columns_and_constraints() {
    let schema = "catalog_read_test";
    let mut db = connect(schema);
    db.session().batch_execute(SCHEMA_SQL).unwrap();

    let meta = db.table("people").unwrap().clone();
    let names: Vec<&str> = meta.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["id", "email", "age", "team", "tags", "feeling"]);

    let email = meta.column("email").unwrap();
    assert_eq!(email.column_type, ColumnType::Text);
    assert_eq!(email.length, Some(64));
    assert_eq!(meta.unique_constraint("email").unwrap().name, "uniq_people_email");

    let tags = meta.column("tags").unwrap();
    assert_eq!(tags.column_type, ColumnType::Array);
    assert_eq!(tags.array_elem_type.as_deref(), Some("text"));

    let feeling = meta.column("feeling").unwrap();
    assert_eq!(feeling.column_type, ColumnType::Enum);
    assert_eq!(feeling.enum_name.as_deref(), Some("mood"));
    assert!(feeling.not_null);

    let fk = meta.foreign_key("team").unwrap();
    assert_eq!(fk.name, "fk_people_team");
    assert_eq!(fk.ref_table, "teams");
    assert_eq!(fk.ref_columns, ["id"]);

    let check = meta.check("age").unwrap();
    assert_eq!(check.name, "chk_people_age");
    assert_eq!(normalize_check(&check.expression), normalize_check("age > 0"));

    assert_eq!(
        db.primary_key("people").unwrap(),
        Some(PrimaryKey {
            name: "people_pkey".into(),
            columns: vec!["id".into()],
        })
    );
    assert_eq!(db.unique_constraints("people").unwrap(), [vec!["email".to_string()]]);
    assert_eq!(
        db.column_enum_name("people", "feeling").unwrap().as_deref(),
        Some("mood")
    );
    assert_eq!(db.column_enum_name("people", "age").unwrap(), None);

    let set = db.current_columns("people").unwrap();
    let age = set.values().find(|c| c.name == "age").unwrap();
    assert_eq!(age.canonical_default().as_deref(), Some("18"));
    assert_eq!(age.fk_table, None);

    teardown(db, schema);
}

#[test]
fn catalog_lists_tables_and_reports_missing() {
    let schema = "catalog_list_test";
    let mut db = connect(schema);
    db.session().batch_execute(SCHEMA_SQL).unwrap();

    let tables = db.list_tables().unwrap();
    assert!(tables.contains(&"people".to_string()));
    assert!(tables.contains(&"teams".to_string()));

    let err = db.table("nobody").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    teardown(db, schema);
}

#[test]
fn catalog_cache_follows_external_changes_after_refresh() {
    let schema = "catalog_refresh_test";
    let mut db = connect(schema);
    db.session().batch_execute(SCHEMA_SQL).unwrap();

    assert!(db.table("teams").unwrap().column("label").is_none());
    db.session()
        .batch_execute("ALTER TABLE teams ADD COLUMN label text")
        .unwrap();
    assert!(db.table("teams").unwrap().column("label").is_none());

    db.refresh(&["teams"], false).unwrap();
    assert!(db.table("teams").unwrap().column("label").is_some());

    teardown(db, schema);
}

#[test]
fn check_uniques_reports_taken_values() {
    let schema = "catalog_uniques_test";
    let mut db = connect(schema);
    db.session().batch_execute(SCHEMA_SQL).unwrap();
    db.session()
        .batch_execute("INSERT INTO people (id, email) VALUES (1, 'a@example.com')")
        .unwrap();

    let taken = [
        ("id".to_string(), json!(1)),
        ("email".to_string(), json!("a@example.com")),
        ("age".to_string(), json!(40)),
    ]
    .into_iter()
    .collect();
    let conflicts = db.check_uniques("people", &taken).unwrap();
    assert_eq!(conflicts.len(), 2);
    assert_eq!(conflicts["email"], "value must be unique");

    let fresh = [
        ("id".to_string(), json!(2)),
        ("email".to_string(), json!("")),
    ]
    .into_iter()
    .collect();
    assert!(db.check_uniques("people", &fresh).unwrap().is_empty());

    teardown(db, schema);
}
