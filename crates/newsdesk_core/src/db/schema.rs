//! Layout of the `documents` table shared by every collection.
//!
//! One row per document: `(collection, id)` is the key and `body` holds the
//! JSON field map. Listing order is SQLite insertion order (`rowid`).

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

/// Layout version written to `PRAGMA user_version`.
pub const DOCUMENTS_LAYOUT_VERSION: u32 = 1;

const CREATE_DOCUMENTS: &str = "
CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    body TEXT NOT NULL,
    created_at INTEGER NOT NULL DEFAULT (CAST(strftime('%s', 'now') AS INTEGER) * 1000),
    updated_at INTEGER NOT NULL DEFAULT (CAST(strftime('%s', 'now') AS INTEGER) * 1000),
    PRIMARY KEY (collection, id)
);";

/// Reads the layout version stamped on the connection.
pub fn layout_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?)
}

/// Creates the `documents` table on a fresh file and stamps its version.
///
/// Files stamped by a newer build are refused rather than rewritten.
pub(crate) fn prepare_documents(conn: &mut Connection) -> DbResult<()> {
    let found = layout_version(conn)?;
    if found > DOCUMENTS_LAYOUT_VERSION {
        return Err(DbError::SchemaTooNew {
            found,
            supported: DOCUMENTS_LAYOUT_VERSION,
        });
    }
    if found == DOCUMENTS_LAYOUT_VERSION {
        return Ok(());
    }

    let tx = conn.transaction()?;
    tx.execute_batch(CREATE_DOCUMENTS)?;
    tx.execute_batch(&format!("PRAGMA user_version = {DOCUMENTS_LAYOUT_VERSION};"))?;
    tx.commit()?;
    info!("event=db_layout module=db status=ok from={found} to={DOCUMENTS_LAYOUT_VERSION}");
    Ok(())
}

/// Checks that `conn` carries the `documents` table.
pub fn verify_documents_table(conn: &Connection) -> DbResult<()> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'documents'
        );",
        [],
        |row| row.get(0),
    )?;
    if exists {
        Ok(())
    } else {
        Err(DbError::MissingDocumentsTable)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        layout_version, prepare_documents, verify_documents_table, DOCUMENTS_LAYOUT_VERSION,
    };
    use crate::db::DbError;
    use rusqlite::Connection;

    #[test]
    fn prepare_stamps_layout_and_is_repeatable() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert!(matches!(
            verify_documents_table(&conn),
            Err(DbError::MissingDocumentsTable)
        ));

        prepare_documents(&mut conn).unwrap();
        prepare_documents(&mut conn).unwrap();
        assert_eq!(layout_version(&conn).unwrap(), DOCUMENTS_LAYOUT_VERSION);
        verify_documents_table(&conn).unwrap();
    }
}
