//! Object store contract, filesystem backend and object key policy.
//!
//! # Invariants
//! - Object paths are relative, `/`-separated and never contain `..`.
//! - `public_url(path)` and `delete_by_url(public_url(path))` address the
//!   same object.
//! - Uploading to an existing path overwrites it.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use uuid::Uuid;

static UNSAFE_NAME_CHARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("valid object name regex"));

pub type ObjectStoreResult<T> = Result<T, ObjectStoreError>;

/// Error returned by object store backends.
#[derive(Debug)]
pub enum ObjectStoreError {
    Io(std::io::Error),
    InvalidPath(String),
    /// URL does not belong to this store.
    ForeignUrl(String),
    NotFound(String),
    Unavailable(String),
}

impl Display for ObjectStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{err}"),
            Self::InvalidPath(path) => write!(f, "invalid object path: `{path}`"),
            Self::ForeignUrl(url) => write!(f, "url is not served by this object store: `{url}`"),
            Self::NotFound(path) => write!(f, "object not found: `{path}`"),
            Self::Unavailable(message) => write!(f, "object store unavailable: {message}"),
        }
    }
}

impl Error for ObjectStoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ObjectStoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Remote object storage for uploaded images.
pub trait ObjectStore {
    /// Stores `bytes` at `path`, replacing any existing object.
    fn upload(&self, path: &str, bytes: &[u8]) -> ObjectStoreResult<()>;
    /// Resolves the public URL of a stored object.
    fn public_url(&self, path: &str) -> ObjectStoreResult<String>;
    /// Deletes the object addressed by a URL previously returned by `public_url`.
    fn delete_by_url(&self, url: &str) -> ObjectStoreResult<()>;
    /// Returns whether an object exists at `path`.
    fn exists(&self, path: &str) -> ObjectStoreResult<bool>;
}

impl<T: ObjectStore + ?Sized> ObjectStore for &T {
    fn upload(&self, path: &str, bytes: &[u8]) -> ObjectStoreResult<()> {
        (**self).upload(path, bytes)
    }

    fn public_url(&self, path: &str) -> ObjectStoreResult<String> {
        (**self).public_url(path)
    }

    fn delete_by_url(&self, url: &str) -> ObjectStoreResult<()> {
        (**self).delete_by_url(url)
    }

    fn exists(&self, path: &str) -> ObjectStoreResult<bool> {
        (**self).exists(path)
    }
}

/// Object store writing files under a local root and serving them from a
/// base URL.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl FsObjectStore {
    /// Creates the store; the root directory is created when missing.
    pub fn try_new(
        root: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
    ) -> ObjectStoreResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        let public_base_url = public_base_url.into().trim_end_matches('/').to_string();
        if public_base_url.is_empty() {
            return Err(ObjectStoreError::InvalidPath(
                "public base url cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            root,
            public_base_url,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn public_base_url(&self) -> &str {
        &self.public_base_url
    }

    fn file_path(&self, path: &str) -> ObjectStoreResult<PathBuf> {
        validate_object_path(path)?;
        let mut full = self.root.clone();
        for segment in path.split('/') {
            full.push(segment);
        }
        Ok(full)
    }

    fn path_from_url<'u>(&self, url: &'u str) -> ObjectStoreResult<&'u str> {
        url.strip_prefix(self.public_base_url.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| ObjectStoreError::ForeignUrl(url.to_string()))
    }
}

impl ObjectStore for FsObjectStore {
    fn upload(&self, path: &str, bytes: &[u8]) -> ObjectStoreResult<()> {
        let target = self.file_path(path)?;
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(target, bytes)?;
        Ok(())
    }

    fn public_url(&self, path: &str) -> ObjectStoreResult<String> {
        if !self.file_path(path)?.is_file() {
            return Err(ObjectStoreError::NotFound(path.to_string()));
        }
        Ok(format!("{}/{}", self.public_base_url, path))
    }

    fn delete_by_url(&self, url: &str) -> ObjectStoreResult<()> {
        let path = self.path_from_url(url)?;
        let target = self.file_path(path)?;
        match std::fs::remove_file(&target) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(ObjectStoreError::NotFound(path.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn exists(&self, path: &str) -> ObjectStoreResult<bool> {
        Ok(self.file_path(path)?.is_file())
    }
}

/// Rejects absolute, empty-segment and parent-escaping object paths.
pub fn validate_object_path(path: &str) -> ObjectStoreResult<()> {
    let invalid = path.is_empty()
        || path.starts_with('/')
        || path.contains('\\')
        || path
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if invalid {
        return Err(ObjectStoreError::InvalidPath(path.to_string()));
    }
    Ok(())
}

/// Reduces a user file name to `[A-Za-z0-9._-]`.
///
/// Returns `None` when nothing usable is left.
pub fn sanitize_file_name(file_name: &str) -> Option<String> {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name)
        .trim();
    let cleaned = UNSAFE_NAME_CHARS_RE.replace_all(base, "_");
    let cleaned = cleaned.trim_matches('.');
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '_') {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// Builds the object path an image upload is stored under.
///
/// With `unique` set, a random token keeps same-named uploads apart.
/// Without it, the legacy `<prefix>/<file_name>` key is used and same-named
/// uploads overwrite each other.
pub fn object_path_for(prefix: &str, file_name: &str, unique: bool) -> ObjectStoreResult<String> {
    let name = sanitize_file_name(file_name)
        .ok_or_else(|| ObjectStoreError::InvalidPath(file_name.to_string()))?;
    let path = if unique {
        let token = Uuid::new_v4().simple().to_string();
        format!("{prefix}/{}-{name}", &token[..8])
    } else {
        format!("{prefix}/{name}")
    };
    validate_object_path(&path)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::{object_path_for, sanitize_file_name, validate_object_path, ObjectStoreError};

    #[test]
    fn sanitize_strips_directories_and_unsafe_chars() {
        assert_eq!(
            sanitize_file_name("C:\\photos\\open day.png").as_deref(),
            Some("open_day.png")
        );
        assert_eq!(
            sanitize_file_name("../../etc/passwd").as_deref(),
            Some("passwd")
        );
        assert_eq!(sanitize_file_name("..."), None);
        assert_eq!(sanitize_file_name("  "), None);
    }

    #[test]
    fn validate_rejects_escaping_paths() {
        for path in ["", "/News/a.png", "News//a.png", "News/../a.png", "News\\a.png"] {
            assert!(matches!(
                validate_object_path(path),
                Err(ObjectStoreError::InvalidPath(_))
            ));
        }
        assert!(validate_object_path("News/a.png").is_ok());
    }

    #[test]
    fn legacy_path_is_keyed_by_file_name() {
        assert_eq!(
            object_path_for("News", "cover.png", false).unwrap(),
            "News/cover.png"
        );
    }

    #[test]
    fn unique_paths_differ_for_same_file_name() {
        let first = object_path_for("News", "cover.png", true).unwrap();
        let second = object_path_for("News", "cover.png", true).unwrap();
        assert_ne!(first, second);
        assert!(first.starts_with("News/"));
        assert!(first.ends_with("-cover.png"));
    }
}
