#![allow(dead_code)]

use newsdesk_core::{
    CollectionError, CollectionResult, DocumentCollection, ObjectStore, ObjectStoreError,
    ObjectStoreResult, Record, RecordFields, RecordPatch,
};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

pub const BASE_URL: &str = "https://cdn.example.test";

/// In-memory collection that counts calls and can be told to fail.
#[derive(Default)]
pub struct FakeCollection {
    pub docs: RefCell<Vec<Record>>,
    pub calls: Cell<usize>,
    pub fail_list: Cell<bool>,
    pub fail_add: Cell<bool>,
    pub fail_update: Cell<bool>,
    pub fail_delete: Cell<bool>,
    next_id: Cell<u32>,
}

impl FakeCollection {
    pub fn with_records(records: Vec<Record>) -> Self {
        let fake = Self::default();
        *fake.docs.borrow_mut() = records;
        fake
    }

    fn tick(&self) {
        self.calls.set(self.calls.get() + 1);
    }
}

impl DocumentCollection for FakeCollection {
    fn list_all(&self) -> CollectionResult<Vec<Record>> {
        self.tick();
        if self.fail_list.get() {
            return Err(CollectionError::Unavailable("list refused".to_string()));
        }
        Ok(self.docs.borrow().clone())
    }

    fn add(&self, fields: &RecordFields) -> CollectionResult<String> {
        self.tick();
        if self.fail_add.get() {
            return Err(CollectionError::Unavailable("add refused".to_string()));
        }
        let next = self.next_id.get() + 1;
        self.next_id.set(next);
        let id = format!("doc-{next}");
        self.docs
            .borrow_mut()
            .push(Record::new(id.clone(), fields.clone()));
        Ok(id)
    }

    fn update(&self, id: &str, patch: &RecordPatch) -> CollectionResult<()> {
        self.tick();
        if self.fail_update.get() {
            return Err(CollectionError::Unavailable("update refused".to_string()));
        }
        let mut docs = self.docs.borrow_mut();
        let record = docs
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or_else(|| CollectionError::NotFound(id.to_string()))?;
        record.apply_patch(patch);
        Ok(())
    }

    fn delete(&self, id: &str) -> CollectionResult<()> {
        self.tick();
        if self.fail_delete.get() {
            return Err(CollectionError::Unavailable("delete refused".to_string()));
        }
        let mut docs = self.docs.borrow_mut();
        let before = docs.len();
        docs.retain(|record| record.id != id);
        if docs.len() == before {
            return Err(CollectionError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

/// In-memory object store keyed by path.
#[derive(Default)]
pub struct FakeObjectStore {
    pub objects: RefCell<BTreeMap<String, Vec<u8>>>,
    pub calls: Cell<usize>,
    pub exists_calls: Cell<usize>,
    pub fail_upload: Cell<bool>,
    pub fail_delete: Cell<bool>,
}

impl FakeObjectStore {
    pub fn url_for(path: &str) -> String {
        format!("{BASE_URL}/{path}")
    }

    pub fn paths(&self) -> Vec<String> {
        self.objects.borrow().keys().cloned().collect()
    }

    fn tick(&self) {
        self.calls.set(self.calls.get() + 1);
    }
}

impl ObjectStore for FakeObjectStore {
    fn upload(&self, path: &str, bytes: &[u8]) -> ObjectStoreResult<()> {
        self.tick();
        if self.fail_upload.get() {
            return Err(ObjectStoreError::Unavailable("upload refused".to_string()));
        }
        self.objects
            .borrow_mut()
            .insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    fn public_url(&self, path: &str) -> ObjectStoreResult<String> {
        self.tick();
        if !self.objects.borrow().contains_key(path) {
            return Err(ObjectStoreError::NotFound(path.to_string()));
        }
        Ok(Self::url_for(path))
    }

    fn delete_by_url(&self, url: &str) -> ObjectStoreResult<()> {
        self.tick();
        if self.fail_delete.get() {
            return Err(ObjectStoreError::Unavailable("delete refused".to_string()));
        }
        let path = url
            .strip_prefix(BASE_URL)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| ObjectStoreError::ForeignUrl(url.to_string()))?;
        self.objects
            .borrow_mut()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| ObjectStoreError::NotFound(path.to_string()))
    }

    fn exists(&self, path: &str) -> ObjectStoreResult<bool> {
        self.tick();
        self.exists_calls.set(self.exists_calls.get() + 1);
        Ok(self.objects.borrow().contains_key(path))
    }
}

pub fn record(id: &str, headline: &str, news: bool) -> Record {
    Record::new(
        id,
        RecordFields {
            headline: headline.to_string(),
            content: format!("{headline} body"),
            image: FakeObjectStore::url_for(&format!("News/{id}.png")),
            news,
        },
    )
}
