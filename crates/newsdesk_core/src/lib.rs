//! Core logic for newsdesk: news/event records mirrored from a document
//! collection, with images kept in an object store.

pub mod auth;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod storage;

pub use auth::{
    AuthError, AuthListener, AuthProvider, AuthResult, AuthSubscription, AuthUser,
    LocalAuthProvider,
};
pub use config::{load_config, ConfigError, NewsdeskConfig};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::record::{
    partition_feed, EditDraft, Feed, ImageUpload, MissingField, NewRecordForm, Record,
    RecordFields, RecordId, RecordKind, RecordPatch,
};
pub use repo::collection::{
    CollectionError, CollectionResult, DocumentCollection, SqliteDocumentCollection,
};
pub use service::record_service::{
    DeleteOutcome, EditorState, RecordServiceError, RecordServiceResult, RecordStoreClient,
    RecordStoreOptions,
};
pub use storage::object_store::{
    object_path_for, sanitize_file_name, FsObjectStore, ObjectStore, ObjectStoreError,
    ObjectStoreResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
