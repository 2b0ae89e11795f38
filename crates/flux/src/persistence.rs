//! Persistence collaborator for `store` and `load` commands.
//!
//! Documents live in one collection keyed by user id; `store` merge-upserts
//! a single field, `load` point-reads one. The backend is
//! environment-provided; the in-memory implementation here doubles as the
//! test backend and as a reference for real ones.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use futures_util::future::{self, BoxFuture};
use thiserror::Error;

use crate::value::Value;

/// Collection every user document lives under.
pub const COLLECTION: &str = "flux-data";

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt document for user {user}: {reason}")]
    Corrupt { user: String, reason: String },
}

pub trait PersistenceBackend: Send + Sync {
    /// Merge-upsert one field of the user's document; other fields stay
    /// untouched.
    fn store_field<'a>(
        &'a self,
        user_id: &'a str,
        field: &'a str,
        value: &'a Value,
    ) -> BoxFuture<'a, Result<(), PersistenceError>>;

    /// Point-read one field of the user's document. `Ok(None)` when the
    /// document or the field does not exist.
    fn load_field<'a>(
        &'a self,
        user_id: &'a str,
        field: &'a str,
    ) -> BoxFuture<'a, Result<Option<Value>, PersistenceError>>;
}

/// In-memory backend: one document map per user id.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    documents: Mutex<HashMap<String, BTreeMap<Arc<str>, Value>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of one user's document, mainly for assertions.
    pub fn document(&self, user_id: &str) -> Option<Value> {
        self.documents
            .lock()
            .expect("storage lock")
            .get(user_id)
            .map(|fields| Value::Object(fields.clone()))
    }
}

impl PersistenceBackend for MemoryStorage {
    fn store_field<'a>(
        &'a self,
        user_id: &'a str,
        field: &'a str,
        value: &'a Value,
    ) -> BoxFuture<'a, Result<(), PersistenceError>> {
        let mut documents = self.documents.lock().expect("storage lock");
        documents
            .entry(user_id.to_string())
            .or_default()
            .insert(Arc::from(field), value.clone());
        Box::pin(future::ready(Ok(())))
    }

    fn load_field<'a>(
        &'a self,
        user_id: &'a str,
        field: &'a str,
    ) -> BoxFuture<'a, Result<Option<Value>, PersistenceError>> {
        let documents = self.documents.lock().expect("storage lock");
        let value = documents
            .get(user_id)
            .and_then(|fields| fields.get(field))
            .cloned();
        Box::pin(future::ready(Ok(value)))
    }
}
