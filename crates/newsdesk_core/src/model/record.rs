//! Record domain model.
//!
//! # Invariants
//! - `id` is server-assigned and unique within one collection.
//! - Document field names are `Headline`, `Content`, `Image`, `News`.
//! - `id` is never part of the stored document body.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Opaque, server-assigned document id.
pub type RecordId = String;

/// One news-or-event entry mirrored from the document collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: RecordFields,
}

/// Stored document body for a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFields {
    #[serde(rename = "Headline")]
    pub headline: String,
    #[serde(rename = "Content")]
    pub content: String,
    /// Public URL of the record image.
    #[serde(rename = "Image")]
    pub image: String,
    /// `true` for news, `false` for events.
    #[serde(rename = "News")]
    pub news: bool,
}

/// Partial document update issued by an edit save.
///
/// The news/event flag is not editable after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPatch {
    #[serde(rename = "Headline")]
    pub headline: String,
    #[serde(rename = "Content")]
    pub content: String,
    #[serde(rename = "Image")]
    pub image: String,
}

/// Listing category derived from the `News` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    News,
    Event,
}

impl RecordKind {
    pub fn from_news_flag(news: bool) -> Self {
        if news {
            Self::News
        } else {
            Self::Event
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::News => "news",
            Self::Event => "event",
        }
    }
}

impl Record {
    pub fn new(id: impl Into<RecordId>, fields: RecordFields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn kind(&self) -> RecordKind {
        RecordKind::from_news_flag(self.fields.news)
    }

    /// Applies a successful remote patch to this cached copy.
    pub fn apply_patch(&mut self, patch: &RecordPatch) {
        self.fields.headline = patch.headline.clone();
        self.fields.content = patch.content.clone();
        self.fields.image = patch.image.clone();
    }
}

/// In-memory image file chosen by the user.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Returns whether this upload carries a usable file.
    pub fn is_present(&self) -> bool {
        !self.file_name.trim().is_empty()
    }
}

impl std::fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageUpload")
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Add-form state for a new record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecordForm {
    pub headline: String,
    pub content: String,
    pub image: Option<ImageUpload>,
    pub news: bool,
}

impl Default for NewRecordForm {
    fn default() -> Self {
        Self {
            headline: String::new(),
            content: String::new(),
            image: None,
            news: true,
        }
    }
}

/// Required field missing from a create request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    Headline,
    Content,
    Image,
}

impl Display for MissingField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Headline => write!(f, "headline"),
            Self::Content => write!(f, "content"),
            Self::Image => write!(f, "image"),
        }
    }
}

impl Error for MissingField {}

impl NewRecordForm {
    /// Checks that headline, content and image file are all present.
    pub fn validate(&self) -> Result<(), MissingField> {
        if self.headline.is_empty() {
            return Err(MissingField::Headline);
        }
        if self.content.is_empty() {
            return Err(MissingField::Content);
        }
        match self.image.as_ref() {
            Some(image) if image.is_present() => Ok(()),
            _ => Err(MissingField::Image),
        }
    }

    /// Clears the form back to its defaults (news selected).
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Inline editor state for one cached record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditDraft {
    pub id: RecordId,
    pub headline: String,
    pub content: String,
    /// Image URL the record currently points at.
    pub image_url: String,
    /// Replacement image chosen in the editor, if any.
    pub image_file: Option<ImageUpload>,
}

impl EditDraft {
    pub fn from_record(record: &Record) -> Self {
        Self {
            id: record.id.clone(),
            headline: record.fields.headline.clone(),
            content: record.fields.content.clone(),
            image_url: record.fields.image.clone(),
            image_file: None,
        }
    }
}

/// News and event listings split from one record list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Feed<'a> {
    pub news: Vec<&'a Record>,
    pub events: Vec<&'a Record>,
}

/// Splits records by their `News` flag, keeping input order.
pub fn partition_feed(records: &[Record]) -> Feed<'_> {
    let (news, events) = records.iter().partition(|record| record.fields.news);
    Feed { news, events }
}
