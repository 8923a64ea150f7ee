//! Document collection contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide list-all/add/update-by-id/delete-by-id over one named collection.
//! - Store each record body as one JSON document.
//!
//! # Invariants
//! - Listing order is insertion order.
//! - Stored bodies use the `Headline/Content/Image/News` field names.

use crate::db::schema::verify_documents_table;
use crate::db::DbError;
use crate::model::record::{Record, RecordFields, RecordId, RecordPatch};
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type CollectionResult<T> = Result<T, CollectionError>;

/// Error returned by document collection backends.
#[derive(Debug)]
pub enum CollectionError {
    Db(DbError),
    NotFound(RecordId),
    InvalidData(String),
    /// Backend could not be reached or refused the call.
    Unavailable(String),
}

impl Display for CollectionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "document not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid stored document: {message}"),
            Self::Unavailable(message) => write!(f, "document collection unavailable: {message}"),
        }
    }
}

impl Error for CollectionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for CollectionError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for CollectionError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for CollectionError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidData(value.to_string())
    }
}

/// Remote document collection holding records.
pub trait DocumentCollection {
    /// Fetches every document in the collection.
    fn list_all(&self) -> CollectionResult<Vec<Record>>;
    /// Writes a new document and returns its server-generated id.
    fn add(&self, fields: &RecordFields) -> CollectionResult<RecordId>;
    /// Overwrites headline/content/image of an existing document.
    fn update(&self, id: &str, patch: &RecordPatch) -> CollectionResult<()>;
    /// Deletes one document by id.
    fn delete(&self, id: &str) -> CollectionResult<()>;
}

impl<T: DocumentCollection + ?Sized> DocumentCollection for &T {
    fn list_all(&self) -> CollectionResult<Vec<Record>> {
        (**self).list_all()
    }

    fn add(&self, fields: &RecordFields) -> CollectionResult<RecordId> {
        (**self).add(fields)
    }

    fn update(&self, id: &str, patch: &RecordPatch) -> CollectionResult<()> {
        (**self).update(id, patch)
    }

    fn delete(&self, id: &str) -> CollectionResult<()> {
        (**self).delete(id)
    }
}

/// SQLite-backed document collection.
pub struct SqliteDocumentCollection<'conn> {
    conn: &'conn Connection,
    collection: String,
}

impl<'conn> SqliteDocumentCollection<'conn> {
    /// Binds a connection from `open_db` to one named collection.
    pub fn try_new(conn: &'conn Connection, collection: impl Into<String>) -> CollectionResult<Self> {
        let collection = collection.into();
        if collection.trim().is_empty() {
            return Err(CollectionError::InvalidData(
                "collection name cannot be empty".to_string(),
            ));
        }
        verify_documents_table(conn)?;
        Ok(Self { conn, collection })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }
}

impl DocumentCollection for SqliteDocumentCollection<'_> {
    fn list_all(&self) -> CollectionResult<Vec<Record>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, body
             FROM documents
             WHERE collection = ?1
             ORDER BY rowid ASC;",
        )?;
        let mut rows = stmt.query([self.collection.as_str()])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let id: String = row.get("id")?;
            let body: String = row.get("body")?;
            let fields: RecordFields = serde_json::from_str(&body).map_err(|err| {
                CollectionError::InvalidData(format!("document `{id}`: {err}"))
            })?;
            records.push(Record::new(id, fields));
        }
        Ok(records)
    }

    fn add(&self, fields: &RecordFields) -> CollectionResult<RecordId> {
        let id = Uuid::new_v4().to_string();
        let body = serde_json::to_string(fields)?;
        self.conn.execute(
            "INSERT INTO documents (collection, id, body) VALUES (?1, ?2, ?3);",
            params![self.collection.as_str(), id.as_str(), body],
        )?;
        Ok(id)
    }

    fn update(&self, id: &str, patch: &RecordPatch) -> CollectionResult<()> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND id = ?2;",
                params![self.collection.as_str(), id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(body) = body else {
            return Err(CollectionError::NotFound(id.to_string()));
        };

        let mut fields: RecordFields = serde_json::from_str(&body)?;
        fields.headline = patch.headline.clone();
        fields.content = patch.content.clone();
        fields.image = patch.image.clone();

        let changed = self.conn.execute(
            "UPDATE documents
             SET
                body = ?3,
                updated_at = (CAST(strftime('%s', 'now') AS INTEGER) * 1000)
             WHERE collection = ?1
               AND id = ?2;",
            params![
                self.collection.as_str(),
                id,
                serde_json::to_string(&fields)?
            ],
        )?;
        if changed == 0 {
            return Err(CollectionError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn delete(&self, id: &str) -> CollectionResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2;",
            params![self.collection.as_str(), id],
        )?;
        if changed == 0 {
            return Err(CollectionError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
