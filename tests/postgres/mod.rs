//! PostgreSQL end-to-end tests
//!
//! Each test works in its own schema (first on the search path) so tests can
//! run in parallel against one database.

pub mod alter;
pub mod catalog;
pub mod enums;

use postgres::{Client, NoTls};
use tabula::Database;

/// Connect to the test database, starting the compose service if needed, and
/// point the search path at a fresh `schema_name`.
pub fn connect(schema_name: &str) -> Database<Client> {
    use std::process::Command;
    use std::sync::Once;
    use std::thread;
    use std::time::Duration;

    static DOCKER_STARTED: Once = Once::new();

    let url = std::env::var("DATABASE_URL").unwrap_or_else(|_| {
        "host=localhost user=postgres password=postgres dbname=tabula_test".into()
    });

    DOCKER_STARTED.call_once(|| {
        if Client::connect(&url, NoTls).is_ok() {
            return;
        }
        let status = Command::new("docker")
            .args(["compose", "up", "-d", "postgres"])
            .status();
        if let Ok(s) = status
            && s.success()
        {
            for _ in 0..30 {
                thread::sleep(Duration::from_secs(1));
                if Client::connect(&url, NoTls).is_ok() {
                    return;
                }
            }
        }
        panic!("PostgreSQL not available");
    });

    let mut client = Client::connect(&url, NoTls).expect("connect");
    client
        .batch_execute(&format!(
            "DROP SCHEMA IF EXISTS \"{schema_name}\" CASCADE; \
             CREATE SCHEMA \"{schema_name}\"; \
             SET search_path TO \"{schema_name}\""
        ))
        .expect("setup test schema");
    Database::new(client)
}

pub fn teardown(mut db: Database<Client>, schema_name: &str) {
    db.session()
        .batch_execute(&format!("DROP SCHEMA \"{schema_name}\" CASCADE"))
        .expect("drop test schema");
}

pub fn count(db: &mut Database<Client>, sql: &str) -> i64 {
    db.session()
        .query_one(sql, &[])
        .expect("count query")
        .get::<_, i64>(0)
}
