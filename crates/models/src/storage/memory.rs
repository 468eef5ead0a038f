use serde_json::Value;
use std::{collections::HashMap, sync::Mutex};
use uuid::Uuid;

use super::{Revision, Selector, Storage, StorageError, Stored};

/// Storage kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    /// Sequence number of the next created document.
    next_seq: u64,
    documents: HashMap<Uuid, Entry>,
}

#[derive(Debug)]
struct Entry {
    seq: u64,
    revision: Revision,
    data: Value,
}

impl MemoryStorage {
    pub fn new() -> MemoryStorage {
        MemoryStorage::default()
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.lock().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<Inner> {
        self.inner.lock().expect("memory storage lock poisoned")
    }
}

impl Storage for MemoryStorage {
    fn create(&self, id: Uuid, data: &Value) -> Result<Revision, StorageError> {
        let mut inner = self.lock();

        if inner.documents.contains_key(&id) {
            return Err(StorageError::AlreadyExists(id));
        }

        let revision = Revision::first();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.documents.insert(id, Entry {
            seq,
            revision: revision.clone(),
            data: data.clone(),
        });

        Ok(revision)
    }

    fn read(&self, id: Uuid) -> Result<Stored, StorageError> {
        let inner = self.lock();
        let entry = inner.documents.get(&id).ok_or(StorageError::NotFound(id))?;

        Ok(Stored {
            id,
            revision: entry.revision.clone(),
            data: entry.data.clone(),
        })
    }

    fn write(&self, id: Uuid, data: &Value, revision: &Revision)
    -> Result<Revision, StorageError> {
        let mut inner = self.lock();
        let entry = inner.documents.get_mut(&id).ok_or(StorageError::NotFound(id))?;

        if entry.revision != *revision {
            return Err(StorageError::Conflict(id));
        }

        entry.revision = revision.next();
        entry.data = data.clone();

        Ok(entry.revision.clone())
    }

    fn delete(&self, id: Uuid, revision: &Revision) -> Result<(), StorageError> {
        let mut inner = self.lock();

        match inner.documents.get(&id) {
            None => Err(StorageError::NotFound(id)),
            Some(entry) if entry.revision != *revision => Err(StorageError::Conflict(id)),
            Some(_) => {
                inner.documents.remove(&id);
                Ok(())
            }
        }
    }

    fn find(&self, selector: &Selector) -> Result<Vec<Stored>, StorageError> {
        let inner = self.lock();

        let mut found = inner.documents.iter()
            .filter(|(_, entry)| selector.matches(&entry.data))
            .collect::<Vec<_>>();
        found.sort_by_key(|(_, entry)| entry.seq);

        Ok(found.into_iter()
            .map(|(id, entry)| Stored {
                id: *id,
                revision: entry.revision.clone(),
                data: entry.data.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use super::*;
    use crate::storage::ObjectType;

    #[test]
    fn create_read_write() {
        let storage = MemoryStorage::new();
        let id = Uuid::new_v4();

        let first = storage.create(id, &json!({"type": "Advisory", "n": 1})).unwrap();
        let second = storage.write(id, &json!({"type": "Advisory", "n": 2}), &first).unwrap();

        let stored = storage.read(id).unwrap();
        assert_eq!(stored.revision, second);
        assert_eq!(stored.data["n"], 2);
    }

    #[test]
    fn stale_writes_conflict() {
        let storage = MemoryStorage::new();
        let id = Uuid::new_v4();

        let first = storage.create(id, &json!({})).unwrap();
        storage.write(id, &json!({"a": 1}), &first).unwrap();

        match storage.write(id, &json!({"a": 2}), &first) {
            Err(StorageError::Conflict(conflicting)) => assert_eq!(conflicting, id),
            other => panic!("expected conflict, got {:?}", other),
        }
        match storage.delete(id, &first) {
            Err(StorageError::Conflict(_)) => (),
            other => panic!("expected conflict, got {:?}", other),
        }
        assert_eq!(storage.read(id).unwrap().data, json!({"a": 1}));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let storage = MemoryStorage::new();
        let id = Uuid::new_v4();
        storage.create(id, &json!({})).unwrap();
        assert!(storage.create(id, &json!({})).is_err());
    }

    #[test]
    fn missing_documents() {
        let storage = MemoryStorage::new();
        let id = Uuid::new_v4();
        match storage.read(id) {
            Err(StorageError::NotFound(missing)) => assert_eq!(missing, id),
            other => panic!("expected not found, got {:?}", other),
        }
        assert!(storage.delete(id, &Revision::first()).is_err());
    }

    #[test]
    fn find_keeps_creation_order() {
        let storage = MemoryStorage::new();
        let ids = (0..10).map(|_| Uuid::new_v4()).collect::<Vec<_>>();

        for (inx, id) in ids.iter().enumerate() {
            let kind = if inx % 2 == 0 { "Advisory" } else { "Comment" };
            storage.create(*id, &json!({"type": kind, "n": inx})).unwrap();
        }

        let found = storage.find(&Selector::of_type(ObjectType::Advisory)).unwrap();
        let found = found.iter().map(|s| s.id).collect::<Vec<_>>();
        let expected = ids.iter().cloned().step_by(2).collect::<Vec<_>>();
        assert_eq!(found, expected);
    }
}
