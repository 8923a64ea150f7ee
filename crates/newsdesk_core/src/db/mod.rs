//! SQLite storage for the local document collection backend.
//!
//! # Responsibility
//! - Open and configure SQLite connections for newsdesk collections.
//! - Create the `documents` table and track its layout version.
//!
//! # Invariants
//! - The layout version is tracked via `PRAGMA user_version`.
//! - Collection reads/writes only happen on connections that passed
//!   `verify_documents_table`.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod open;
pub mod schema;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// The file was written by a newer newsdesk build.
    SchemaTooNew { found: u32, supported: u32 },
    /// Connection was not opened through `open_db`.
    MissingDocumentsTable,
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "newsdesk database layout {found} is newer than this build supports ({supported})"
            ),
            Self::MissingDocumentsTable => write!(
                f,
                "missing `documents` table; open the database with open_db"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
