// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory document store.
//!
//! Documents are kept as JSON values, so anything that round-trips through
//! serde behaves the same here as in Firestore. Collections can be told to
//! fail writes or deletes, which is how the best-effort paths get tested.

use crate::error::AppError;
use dashmap::{DashMap, DashSet};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Default)]
pub struct MemoryStore {
    collections: DashMap<String, BTreeMap<String, Value>>,
    failing_writes: DashSet<String>,
    failing_deletes: DashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write to `collection` fail until cleared.
    pub fn fail_writes_to(&self, collection: &str) {
        self.failing_writes.insert(collection.to_string());
    }

    /// Make every delete in `collection` fail until cleared.
    pub fn fail_deletes_in(&self, collection: &str) {
        self.failing_deletes.insert(collection.to_string());
    }

    pub fn clear_failures(&self) {
        self.failing_writes.clear();
        self.failing_deletes.clear();
    }

    pub fn get<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<Option<T>, AppError> {
        let Some(docs) = self.collections.get(collection) else {
            return Ok(None);
        };
        docs.get(id).cloned().map(decode).transpose()
    }

    pub fn set<T: Serialize>(&self, collection: &str, id: &str, doc: &T) -> Result<(), AppError> {
        if self.failing_writes.contains(collection) {
            return Err(AppError::Database(format!(
                "Injected write failure for {}/{}",
                collection, id
            )));
        }

        let value = serde_json::to_value(doc)
            .map_err(|e| AppError::Database(format!("Failed to encode document: {}", e)))?;
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), value);
        Ok(())
    }

    /// Delete a document. Deleting a missing document is not an error.
    pub fn delete(&self, collection: &str, id: &str) -> Result<(), AppError> {
        if self.failing_deletes.contains(collection) {
            return Err(AppError::Database(format!(
                "Injected delete failure for {}/{}",
                collection, id
            )));
        }

        if let Some(mut docs) = self.collections.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }

    /// All documents in a collection, ordered by document ID.
    pub fn list<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>, AppError> {
        self.list_matching(collection, |_| true)
    }

    /// Documents whose top-level string `field` equals `value`.
    pub fn list_where_eq<T: DeserializeOwned>(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<T>, AppError> {
        self.list_matching(collection, |doc| {
            doc.get(field).and_then(Value::as_str) == Some(value)
        })
    }

    fn list_matching<T, F>(&self, collection: &str, predicate: F) -> Result<Vec<T>, AppError>
    where
        T: DeserializeOwned,
        F: Fn(&Value) -> bool,
    {
        let Some(docs) = self.collections.get(collection) else {
            return Ok(Vec::new());
        };
        docs.values()
            .filter(|doc| predicate(doc))
            .cloned()
            .map(decode)
            .collect()
    }

    /// Number of documents in a collection.
    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, AppError> {
    serde_json::from_value(value)
        .map_err(|e| AppError::Database(format!("Failed to decode document: {}", e)))
}
