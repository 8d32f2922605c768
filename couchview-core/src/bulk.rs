//! Pseudo documents used as POST bodies for bulk operations.

use crate::document::CouchDocument;
use crate::error::{CouchError, CouchResult};
use serde_json::{Map, Value};

/// One element of a bulk key request.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkKey {
    /// Embedded as a JSON scalar or structure.
    Value(Value),
    /// Pre-encoded JSON text, embedded as-is.
    Raw(String),
}

macro_rules! bulk_key_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for BulkKey {
                fn from(value: $ty) -> Self {
                    BulkKey::Value(value.into())
                }
            }
        )*
    };
}

bulk_key_from!(Value, String, &str, i64, u64, f64, bool);

/// `{"keys": [...]}` body for fetching several keys in one request. Not to
/// be confused with compound keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkKeys {
    keys: Vec<BulkKey>,
}

impl BulkKeys {
    pub fn new<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<BulkKey>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn count(&self) -> usize {
        self.keys.len()
    }

    pub fn to_json(&self) -> CouchResult<Value> {
        let mut keys = Vec::with_capacity(self.keys.len());
        for key in &self.keys {
            match key {
                BulkKey::Value(value) => keys.push(value.clone()),
                BulkKey::Raw(text) => {
                    let value: Value = serde_json::from_str(text).map_err(|e| {
                        CouchError::encoding_with(format!("bulk key is not valid JSON: {}", text), e)
                    })?;
                    keys.push(value);
                }
            }
        }
        let mut body = Map::new();
        body.insert("keys".to_string(), Value::Array(keys));
        Ok(Value::Object(body))
    }

    pub fn to_json_string(&self) -> CouchResult<String> {
        Ok(self.to_json()?.to_string())
    }
}

/// `{"docs": [...]}` body for `_bulk_docs`.
#[derive(Debug)]
pub struct BulkDocuments<'a, D> {
    docs: &'a [D],
    require_identity: bool,
    all_or_nothing: bool,
}

impl<'a, D: CouchDocument> BulkDocuments<'a, D> {
    pub fn new(docs: &'a [D]) -> Self {
        Self {
            docs,
            require_identity: false,
            all_or_nothing: false,
        }
    }

    /// Every document must carry both id and revision (updates, deletes).
    pub fn require_identity(mut self) -> Self {
        self.require_identity = true;
        self
    }

    pub fn all_or_nothing(mut self, enabled: bool) -> Self {
        self.all_or_nothing = enabled;
        self
    }

    pub fn count(&self) -> usize {
        self.docs.len()
    }

    pub fn to_json(&self) -> CouchResult<Value> {
        let mut docs = Vec::with_capacity(self.docs.len());
        for (index, doc) in self.docs.iter().enumerate() {
            if self.require_identity && (doc.id().is_none() || doc.rev().is_none()) {
                return Err(CouchError::encoding(format!(
                    "document at position {} has no id/revision pair",
                    index
                )));
            }
            docs.push(doc.to_json()?);
        }
        let mut body = Map::new();
        if self.all_or_nothing {
            body.insert("all_or_nothing".to_string(), Value::Bool(true));
        }
        body.insert("docs".to_string(), Value::Array(docs));
        Ok(Value::Object(body))
    }

    pub fn to_json_string(&self) -> CouchResult<String> {
        Ok(self.to_json()?.to_string())
    }
}
