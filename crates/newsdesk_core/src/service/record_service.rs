//! Record store client: local cache plus create/edit/delete orchestration.
//!
//! # Responsibility
//! - Load the collection once and mirror it in an in-memory list.
//! - Run the multi-step create/edit/delete sequences against the document
//!   collection and the object store.
//! - Hold add-form and inline-editor state.
//!
//! # Invariants
//! - The cache changes only after the remote write it mirrors succeeded.
//! - Mutations are refused while no user is signed in.
//! - Editor state is `Idle` or `Editing(id)`; only `save_edit` on success and
//!   `cancel_edit` return to `Idle`.
//! - Remote steps are not transactional; failed creates/edits remove the
//!   object they uploaded, best effort, unless that key already held an
//!   object before the upload.

use crate::auth::{AuthError, AuthProvider, AuthSubscription, AuthUser};
use crate::config::NewsdeskConfig;
use crate::logging::sanitize_message;
use crate::model::record::{
    partition_feed, EditDraft, Feed, ImageUpload, MissingField, NewRecordForm, Record,
    RecordFields, RecordId, RecordPatch,
};
use crate::repo::collection::{CollectionError, DocumentCollection};
use crate::storage::object_store::{object_path_for, ObjectStore, ObjectStoreError};
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

const MAX_LOGGED_ERROR_CHARS: usize = 240;

/// Service error for record client use-cases.
#[derive(Debug)]
pub enum RecordServiceError {
    MissingField(MissingField),
    RecordNotFound(RecordId),
    /// `save_edit` called for a record whose editor is not open.
    NotEditing(RecordId),
    NotAuthenticated,
    Collection(CollectionError),
    ObjectStore(ObjectStoreError),
    Auth(AuthError),
}

impl Display for RecordServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "missing required field: {field}"),
            Self::RecordNotFound(id) => write!(f, "record not found: {id}"),
            Self::NotEditing(id) => write!(f, "record is not being edited: {id}"),
            Self::NotAuthenticated => write!(f, "sign in required"),
            Self::Collection(err) => write!(f, "{err}"),
            Self::ObjectStore(err) => write!(f, "{err}"),
            Self::Auth(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RecordServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::MissingField(field) => Some(field),
            Self::Collection(err) => Some(err),
            Self::ObjectStore(err) => Some(err),
            Self::Auth(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MissingField> for RecordServiceError {
    fn from(value: MissingField) -> Self {
        Self::MissingField(value)
    }
}

impl From<CollectionError> for RecordServiceError {
    fn from(value: CollectionError) -> Self {
        match value {
            CollectionError::NotFound(id) => Self::RecordNotFound(id),
            other => Self::Collection(other),
        }
    }
}

impl From<ObjectStoreError> for RecordServiceError {
    fn from(value: ObjectStoreError) -> Self {
        Self::ObjectStore(value)
    }
}

impl From<AuthError> for RecordServiceError {
    fn from(value: AuthError) -> Self {
        Self::Auth(value)
    }
}

pub type RecordServiceResult<T> = Result<T, RecordServiceError>;

/// Object naming options for image uploads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordStoreOptions {
    pub object_prefix: String,
    pub unique_object_keys: bool,
}

impl Default for RecordStoreOptions {
    fn default() -> Self {
        Self {
            object_prefix: "News".to_string(),
            unique_object_keys: true,
        }
    }
}

impl From<&NewsdeskConfig> for RecordStoreOptions {
    fn from(config: &NewsdeskConfig) -> Self {
        Self {
            object_prefix: config.object_prefix.trim().to_string(),
            unique_object_keys: config.unique_object_keys,
        }
    }
}

/// Inline editor state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EditorState {
    #[default]
    Idle,
    Editing(EditDraft),
}

/// Result of a delete; the record is gone from the cache either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub id: RecordId,
    /// Whether the image object was removed as well.
    pub image_removed: bool,
}

/// Image written by one create/save attempt.
struct UploadedImage {
    url: String,
    /// No object existed at the path before this upload.
    fresh: bool,
}

/// Mirrors auth-state notifications into a flag the client can read.
struct AuthWatch {
    signed_in: Arc<AtomicBool>,
    _subscription: AuthSubscription,
}

impl AuthWatch {
    fn attach(provider: &dyn AuthProvider) -> Self {
        let signed_in = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&signed_in);
        let subscription = provider.subscribe(Box::new(move |user| {
            flag.store(user.is_some(), Ordering::SeqCst);
        }));
        Self {
            signed_in,
            _subscription: subscription,
        }
    }

    fn is_signed_in(&self) -> bool {
        self.signed_in.load(Ordering::SeqCst)
    }
}

/// Client over a document collection and an object store.
pub struct RecordStoreClient<C: DocumentCollection, S: ObjectStore> {
    collection: C,
    objects: S,
    auth: Arc<dyn AuthProvider>,
    auth_watch: AuthWatch,
    options: RecordStoreOptions,
    items: Vec<Record>,
    editor: EditorState,
    form: NewRecordForm,
}

impl<C: DocumentCollection, S: ObjectStore> RecordStoreClient<C, S> {
    /// Creates a client with an empty cache; call `load` to populate it.
    pub fn new(
        collection: C,
        objects: S,
        auth: Arc<dyn AuthProvider>,
        options: RecordStoreOptions,
    ) -> Self {
        let auth_watch = AuthWatch::attach(&*auth);
        Self {
            collection,
            objects,
            auth,
            auth_watch,
            options,
            items: Vec::new(),
            editor: EditorState::Idle,
            form: NewRecordForm::default(),
        }
    }

    /// Replaces the cache with the full remote collection.
    ///
    /// On failure the cache is left empty and the error is returned.
    pub fn load(&mut self) -> RecordServiceResult<usize> {
        let started_at = Instant::now();
        match self.collection.list_all() {
            Ok(records) => {
                self.items = records;
                info!(
                    "event=record_load module=service status=ok count={} duration_ms={}",
                    self.items.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(self.items.len())
            }
            Err(err) => {
                self.items.clear();
                Err(log_failure("record_load", started_at, err.into()))
            }
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.items
    }

    pub fn record(&self, id: &str) -> Option<&Record> {
        self.items.iter().find(|record| record.id == id)
    }

    /// Splits the cache into news and event listings.
    pub fn feed(&self) -> Feed<'_> {
        partition_feed(&self.items)
    }

    pub fn news_items(&self) -> impl Iterator<Item = &Record> {
        self.items.iter().filter(|record| record.fields.news)
    }

    pub fn event_items(&self) -> impl Iterator<Item = &Record> {
        self.items.iter().filter(|record| !record.fields.news)
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth_watch.is_signed_in()
    }

    /// Signs in through the auth provider; failures are logged and returned.
    pub fn sign_in(&self, account: &str) -> RecordServiceResult<AuthUser> {
        let started_at = Instant::now();
        self.auth
            .sign_in(account)
            .map_err(|err| log_failure("sign_in", started_at, err.into()))
    }

    pub fn sign_out(&self) -> RecordServiceResult<()> {
        let started_at = Instant::now();
        self.auth
            .sign_out()
            .map_err(|err| log_failure("sign_out", started_at, err.into()))
    }

    pub fn form(&self) -> &NewRecordForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut NewRecordForm {
        &mut self.form
    }

    /// Uploads the form image, writes a new document and appends it locally.
    ///
    /// Returns `MissingField` without any remote call when headline, content
    /// or image is empty. The form resets only on success.
    pub fn create(&mut self) -> RecordServiceResult<Record> {
        self.require_auth()?;
        if let Err(field) = self.form.validate() {
            debug!("event=record_create module=service status=skipped missing={field}");
            return Err(field.into());
        }

        let started_at = Instant::now();
        let Some(image) = self.form.image.clone() else {
            return Err(MissingField::Image.into());
        };
        let uploaded = self
            .upload_image(&image)
            .map_err(|err| log_failure("record_create", started_at, err))?;

        let fields = RecordFields {
            headline: self.form.headline.clone(),
            content: self.form.content.clone(),
            image: uploaded.url.clone(),
            news: self.form.news,
        };
        let id = match self.collection.add(&fields) {
            Ok(id) => id,
            Err(err) => {
                self.discard_failed_upload(&uploaded, "record_create");
                return Err(log_failure("record_create", started_at, err.into()));
            }
        };

        let record = Record::new(id, fields);
        self.items.push(record.clone());
        self.form.reset();
        info!(
            "event=record_create module=service status=ok kind={} duration_ms={}",
            record.kind().as_str(),
            started_at.elapsed().as_millis()
        );
        Ok(record)
    }

    /// Fills the add form and submits it.
    pub fn create_record(
        &mut self,
        headline: impl Into<String>,
        content: impl Into<String>,
        image: Option<ImageUpload>,
        news: bool,
    ) -> RecordServiceResult<Record> {
        self.form = NewRecordForm {
            headline: headline.into(),
            content: content.into(),
            image,
            news,
        };
        self.create()
    }

    pub fn editor(&self) -> &EditorState {
        &self.editor
    }

    /// Id of the record whose editor is open.
    pub fn editing_id(&self) -> Option<&str> {
        match &self.editor {
            EditorState::Editing(draft) => Some(draft.id.as_str()),
            EditorState::Idle => None,
        }
    }

    /// Opens the inline editor for a cached record, seeding the draft from it.
    pub fn begin_edit(&mut self, id: &str) -> RecordServiceResult<&mut EditDraft> {
        self.require_auth()?;
        let draft = self
            .record(id)
            .map(EditDraft::from_record)
            .ok_or_else(|| RecordServiceError::RecordNotFound(id.to_string()))?;
        self.editor = EditorState::Editing(draft);
        match &mut self.editor {
            EditorState::Editing(draft) => Ok(draft),
            EditorState::Idle => Err(RecordServiceError::NotEditing(id.to_string())),
        }
    }

    pub fn edit_draft_mut(&mut self) -> Option<&mut EditDraft> {
        match &mut self.editor {
            EditorState::Editing(draft) => Some(draft),
            EditorState::Idle => None,
        }
    }

    pub fn cancel_edit(&mut self) {
        self.editor = EditorState::Idle;
    }

    /// Writes the open draft to the document and patches the cache.
    ///
    /// Without a replacement file the previous image URL is kept. With one,
    /// the new file is uploaded first and the replaced object is removed
    /// after the patch succeeds.
    pub fn save_edit(&mut self, id: &str) -> RecordServiceResult<Record> {
        self.require_auth()?;
        let draft = match &self.editor {
            EditorState::Editing(draft) if draft.id == id => draft.clone(),
            _ => return Err(RecordServiceError::NotEditing(id.to_string())),
        };
        let Some(position) = self.items.iter().position(|record| record.id == id) else {
            return Err(RecordServiceError::RecordNotFound(id.to_string()));
        };

        let started_at = Instant::now();
        let uploaded = match draft.image_file.as_ref().filter(|file| file.is_present()) {
            Some(file) => Some(
                self.upload_image(file)
                    .map_err(|err| log_failure("record_update", started_at, err))?,
            ),
            None => None,
        };
        let new_image_url = uploaded.as_ref().map(|image| image.url.clone());

        let patch = RecordPatch {
            headline: draft.headline,
            content: draft.content,
            image: new_image_url
                .clone()
                .unwrap_or_else(|| draft.image_url.clone()),
        };
        if let Err(err) = self.collection.update(id, &patch) {
            if let Some(image) = uploaded.as_ref() {
                self.discard_failed_upload(image, "record_update");
            }
            return Err(log_failure("record_update", started_at, err.into()));
        }

        let previous_image = self.items[position].fields.image.clone();
        self.items[position].apply_patch(&patch);
        self.editor = EditorState::Idle;

        let previous_still_used = self
            .items
            .iter()
            .any(|record| record.fields.image == previous_image);
        if new_image_url.is_some() && !previous_image.is_empty() && !previous_still_used {
            self.discard_image(&previous_image, "record_update");
        }

        info!(
            "event=record_update module=service status=ok image_replaced={} duration_ms={}",
            new_image_url.is_some(),
            started_at.elapsed().as_millis()
        );
        Ok(self.items[position].clone())
    }

    /// Deletes the document, then its image object, then the cache entry.
    ///
    /// A failed image delete is logged and reported in the outcome; the
    /// record still leaves the cache once the document is gone.
    pub fn delete(&mut self, id: &str, image_url: &str) -> RecordServiceResult<DeleteOutcome> {
        self.require_auth()?;
        let started_at = Instant::now();
        self.collection
            .delete(id)
            .map_err(|err| log_failure("record_delete", started_at, err.into()))?;

        let image_removed = if image_url.is_empty() {
            false
        } else {
            match self.objects.delete_by_url(image_url) {
                Ok(()) => true,
                Err(err) => {
                    warn!(
                        "event=record_delete module=service status=partial error_code=image_delete_failed error={}",
                        sanitize_message(&err.to_string(), MAX_LOGGED_ERROR_CHARS)
                    );
                    false
                }
            }
        };

        self.items.retain(|record| record.id != id);
        if self.editing_id() == Some(id) {
            self.editor = EditorState::Idle;
        }
        info!(
            "event=record_delete module=service status=ok image_removed={} duration_ms={}",
            image_removed,
            started_at.elapsed().as_millis()
        );
        Ok(DeleteOutcome {
            id: id.to_string(),
            image_removed,
        })
    }

    /// Deletes a cached record using its current image URL.
    pub fn delete_cached(&mut self, id: &str) -> RecordServiceResult<DeleteOutcome> {
        self.require_auth()?;
        let image_url = self
            .record(id)
            .map(|record| record.fields.image.clone())
            .ok_or_else(|| RecordServiceError::RecordNotFound(id.to_string()))?;
        self.delete(id, &image_url)
    }

    fn require_auth(&self) -> RecordServiceResult<()> {
        if self.is_authenticated() {
            Ok(())
        } else {
            Err(RecordServiceError::NotAuthenticated)
        }
    }

    /// Uploads under the configured key policy, noting whether the path was
    /// already taken. Only fresh uploads may be removed on rollback.
    fn upload_image(&self, image: &ImageUpload) -> RecordServiceResult<UploadedImage> {
        let path = object_path_for(
            &self.options.object_prefix,
            &image.file_name,
            self.options.unique_object_keys,
        )?;
        let existed = self.objects.exists(&path)?;
        if existed {
            warn!("event=object_overwrite module=service status=warn path={path}");
        }
        self.objects.upload(&path, &image.bytes)?;
        Ok(UploadedImage {
            url: self.objects.public_url(&path)?,
            fresh: !existed,
        })
    }

    fn discard_failed_upload(&self, image: &UploadedImage, event: &'static str) {
        if image.fresh {
            self.discard_image(&image.url, event);
        } else {
            debug!("event={event} module=service status=skipped reason=shared_object_kept");
        }
    }

    fn discard_image(&self, url: &str, event: &'static str) {
        if let Err(err) = self.objects.delete_by_url(url) {
            warn!(
                "event={event} module=service status=partial error_code=image_cleanup_failed error={}",
                sanitize_message(&err.to_string(), MAX_LOGGED_ERROR_CHARS)
            );
        }
    }
}

fn log_failure(
    event: &'static str,
    started_at: Instant,
    err: RecordServiceError,
) -> RecordServiceError {
    error!(
        "event={event} module=service status=error duration_ms={} error={}",
        started_at.elapsed().as_millis(),
        sanitize_message(&err.to_string(), MAX_LOGGED_ERROR_CHARS)
    );
    err
}
