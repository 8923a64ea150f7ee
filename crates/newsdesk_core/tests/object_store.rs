use newsdesk_core::{FsObjectStore, ObjectStore, ObjectStoreError};

const BASE_URL: &str = "https://cdn.example.test/images";

#[test]
fn upload_then_public_url_points_into_base_url() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsObjectStore::try_new(dir.path(), format!("{BASE_URL}/")).unwrap();

    store.upload("News/cover.png", b"png-bytes").unwrap();

    assert!(store.exists("News/cover.png").unwrap());
    assert_eq!(
        store.public_url("News/cover.png").unwrap(),
        format!("{BASE_URL}/News/cover.png")
    );
    let on_disk = std::fs::read(dir.path().join("News").join("cover.png")).unwrap();
    assert_eq!(on_disk, b"png-bytes");
}

#[test]
fn upload_to_same_path_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsObjectStore::try_new(dir.path(), BASE_URL).unwrap();

    store.upload("News/cover.png", b"first").unwrap();
    store.upload("News/cover.png", b"second").unwrap();

    let on_disk = std::fs::read(dir.path().join("News").join("cover.png")).unwrap();
    assert_eq!(on_disk, b"second");
}

#[test]
fn public_url_of_missing_object_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsObjectStore::try_new(dir.path(), BASE_URL).unwrap();

    assert!(matches!(
        store.public_url("News/missing.png"),
        Err(ObjectStoreError::NotFound(_))
    ));
}

#[test]
fn delete_by_url_removes_object_once() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsObjectStore::try_new(dir.path(), BASE_URL).unwrap();
    store.upload("News/cover.png", b"png").unwrap();
    let url = store.public_url("News/cover.png").unwrap();

    store.delete_by_url(&url).unwrap();
    assert!(!store.exists("News/cover.png").unwrap());
    assert!(matches!(
        store.delete_by_url(&url),
        Err(ObjectStoreError::NotFound(_))
    ));
}

#[test]
fn delete_by_url_rejects_foreign_and_escaping_urls() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsObjectStore::try_new(dir.path(), BASE_URL).unwrap();

    assert!(matches!(
        store.delete_by_url("https://elsewhere.test/News/cover.png"),
        Err(ObjectStoreError::ForeignUrl(_))
    ));
    assert!(matches!(
        store.delete_by_url(&format!("{BASE_URL}/../secret.txt")),
        Err(ObjectStoreError::InvalidPath(_))
    ));
}

#[test]
fn upload_rejects_invalid_paths() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsObjectStore::try_new(dir.path(), BASE_URL).unwrap();

    assert!(matches!(
        store.upload("/abs.png", b"x"),
        Err(ObjectStoreError::InvalidPath(_))
    ));
    assert!(matches!(
        store.upload("News/../../escape.png", b"x"),
        Err(ObjectStoreError::InvalidPath(_))
    ));
}
