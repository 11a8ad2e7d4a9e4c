use crate::infrastructure::error::InfraError;
use rusqlite::Connection;
use std::path::Path;

const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");

pub fn initialize_database(path: &Path) -> Result<(), InfraError> {
    let connection = Connection::open(path)?;
    connection.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_is_idempotent() {
        let path = std::env::temp_dir().join(format!(
            "slotkeeper-schema-{}-{}.sqlite",
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        initialize_database(&path).expect("first init");
        initialize_database(&path).expect("second init");

        let connection = Connection::open(&path).expect("open");
        let tables: i64 = connection
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'agenda_documents'",
                [],
                |row| row.get(0),
            )
            .expect("query");
        assert_eq!(tables, 1);
        let _ = std::fs::remove_file(path);
    }
}
