use super::{connect, count, teardown};
use tabula::serde_json::json;
use tabula::{
    ColumnSet, ColumnSpec, ColumnType, Database, ErrorKind, MigrationOptions, MigrationOutcome,
    PrimaryKey,
};

fn int(name: &str) -> ColumnSpec {
    ColumnSpec::new(name, ColumnType::Integer)
}

#[test]
fn alter_retype_and_back_restores_structure() {
    let schema = "alter_roundtrip_test";
    let mut db = connect(schema);
    db.session()
        .batch_execute(
            "CREATE TABLE people (id integer PRIMARY KEY, age integer);
             INSERT INTO people VALUES (1, 30), (2, NULL);",
        )
        .unwrap();

    let original = db.current_columns("people").unwrap();
    let age_id = *original.iter().find(|(_, c)| c.name == "age").unwrap().0;
    let mut widened = original.clone();
    widened.insert(age_id, ColumnSpec::text("age", Some(10)));

    let outcome = db.alter_table("people", "people", &original, &widened).unwrap();
    assert_eq!(
        outcome.statements(),
        [r#"ALTER TABLE "people" ALTER COLUMN "age" TYPE VARCHAR(10) USING "age"::VARCHAR(10)"#]
    );
    assert!(!outcome.table_was_emptied());

    let current = db.current_columns("people").unwrap();
    assert_eq!(current[&age_id].column_type, ColumnType::Text);
    assert_eq!(current[&age_id].length, Some(10));

    db.alter_table("people", "people", &current, &original).unwrap();
    assert_eq!(db.current_columns("people").unwrap(), original);
    assert_eq!(count(&mut db, "SELECT count(*) FROM people"), 2);

    teardown(db, schema);
}

#[test]
fn alter_rename_keeps_rows() {
    let schema = "alter_rename_test";
    let mut db = connect(schema);
    db.session()
        .batch_execute("CREATE TABLE people (age integer); INSERT INTO people VALUES (7);")
        .unwrap();

    let old = db.current_columns("people").unwrap();
    let new: ColumnSet = old
        .iter()
        .map(|(id, c)| (*id, ColumnSpec { name: "years".into(), ..c.clone() }))
        .collect();
    let outcome = db.alter_table("people", "humans", &old, &new).unwrap();

    assert_eq!(
        outcome.statements(),
        [
            r#"ALTER TABLE "people" RENAME TO "humans""#,
            r#"ALTER TABLE "humans" RENAME COLUMN "age" TO "years""#,
        ]
    );
    assert_eq!(count(&mut db, "SELECT count(*) FROM humans WHERE years = 7"), 1);
    assert!(db.list_tables().unwrap().contains(&"humans".to_string()));

    teardown(db, schema);
}

#[test]
fn alter_moves_primary_key() {
    let schema = "alter_pk_swap_test";
    let mut db = connect(schema);
    db.session()
        .batch_execute("CREATE TABLE things (a integer NOT NULL, b integer PRIMARY KEY)")
        .unwrap();

    let old = db.current_columns("things").unwrap();
    let new: ColumnSet = old
        .iter()
        .map(|(id, c)| {
            let moved = ColumnSpec {
                primary_key: c.name == "a",
                unique: c.name == "a",
                not_null: true,
                ..c.clone()
            };
            (*id, moved)
        })
        .collect();
    db.alter_table("things", "things", &old, &new).unwrap();

    assert_eq!(
        db.primary_key("things").unwrap(),
        Some(PrimaryKey {
            name: "pk_things".into(),
            columns: vec!["a".into()],
        })
    );

    teardown(db, schema);
}

#[test]
fn alter_adds_primary_key_column_to_empty_table() {
    let schema = "alter_add_pk_test";
    let mut db = connect(schema);
    db.session()
        .batch_execute("CREATE TABLE people (name text)")
        .unwrap();

    let old = db.current_columns("people").unwrap();
    let mut new = old.clone();
    new.insert(100, int("id").primary_key().not_null().unique());
    let outcome = db.alter_table("people", "people", &old, &new).unwrap();

    assert_eq!(
        outcome.statements(),
        [
            r#"ALTER TABLE "people" ADD COLUMN "id" INTEGER NOT NULL"#,
            r#"ALTER TABLE "people" ADD CONSTRAINT "pk_people" PRIMARY KEY ("id")"#,
        ]
    );

    teardown(db, schema);
}

#[test]
fn alter_truncates_and_retries_when_blocked_by_rows() {
    let schema = "alter_retry_test";
    let mut db = connect(schema);
    db.session()
        .batch_execute(
            "CREATE TABLE people (age integer);
             INSERT INTO people VALUES (1), (NULL);",
        )
        .unwrap();

    let old = db.current_columns("people").unwrap();
    let new: ColumnSet = old
        .iter()
        .map(|(id, c)| (*id, c.clone().not_null()))
        .collect();

    db.set_options(MigrationOptions::fail_fast());
    let err = db.alter_table("people", "people", &old, &new).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
    assert_eq!(count(&mut db, "SELECT count(*) FROM people"), 2);

    db.set_options(MigrationOptions::default());
    let outcome = db.alter_table("people", "people", &old, &new).unwrap();
    assert!(matches!(
        outcome,
        MigrationOutcome::AppliedAfterTruncate { .. }
    ));
    assert_eq!(count(&mut db, "SELECT count(*) FROM people"), 0);
    assert!(db.current_columns("people").unwrap().values().all(|c| c.not_null));

    teardown(db, schema);
}

#[test]
fn alter_through_borrowed_client_checks_rows() {
    let schema = "alter_borrowed_client_test";
    let mut client = connect(schema).into_session();
    client
        .batch_execute(
            "CREATE TABLE people (age integer, code text);
             INSERT INTO people VALUES (1, 'x');",
        )
        .unwrap();

    {
        let mut db = Database::new(&mut client);
        let old = db.current_columns("people").unwrap();
        let new: ColumnSet = old
            .iter()
            .map(|(id, c)| match c.name.as_str() {
                "age" => (*id, c.clone().not_null().unique()),
                _ => (*id, c.clone().check("code <> 'a  b'")),
            })
            .collect();
        let outcome = db.alter_table("people", "people", &old, &new).unwrap();
        assert!(!outcome.table_was_emptied());
        let taken = [("age".to_string(), json!(1))].into_iter().collect();
        assert!(db.check_uniques("people", &taken).unwrap().contains_key("age"));
        let free = [("age".to_string(), json!(2))].into_iter().collect();
        assert!(db.check_uniques("people", &free).unwrap().is_empty());
    }

    let definition: String = client
        .query_one(
            "SELECT pg_get_constraintdef(oid) FROM pg_constraint WHERE conname = 'chk_people_code'",
            &[],
        )
        .unwrap()
        .get(0);
    assert!(definition.contains("'a  b'"), "{definition}");

    let mut db = Database::new(client);
    assert_eq!(count(&mut db, "SELECT count(*) FROM people"), 1);
    teardown(db, schema);
}
