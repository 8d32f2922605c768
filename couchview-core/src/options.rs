use crate::encoding::{encode_compound_key, encode_key, try_encode_key};
use crate::error::CouchResult;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// Query-string parameter names understood by CouchDB views.
pub mod names {
    pub const KEY: &str = "key";
    pub const START_KEY: &str = "startkey";
    pub const END_KEY: &str = "endkey";
    pub const START_KEY_DOC_ID: &str = "startkey_docid";
    pub const END_KEY_DOC_ID: &str = "endkey_docid";
    pub const LIMIT: &str = "limit";
    pub const SKIP: &str = "skip";
    pub const DESCENDING: &str = "descending";
    pub const GROUP: &str = "group";
    pub const GROUP_LEVEL: &str = "group_level";
    pub const REDUCE: &str = "reduce";
    pub const INCLUDE_DOCS: &str = "include_docs";
    pub const STALE: &str = "stale";
}

const TRUE: &str = "true";

/// View query options: option name to pre-encoded value.
///
/// Every JSON-valued entry (`key`, `startkey`, `endkey`) is already valid
/// JSON text. Insertion order is kept only so that generated URLs are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    entries: IndexMap<String, String>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a pre-encoded value under `name`, replacing any previous one.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries.shift_remove(name)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `(name, value)` pairs ready for URL query encoding.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Any JSON value is a valid key: null, booleans, strings, numbers,
    /// objects and arrays.
    pub fn key(self, value: impl Into<Value>) -> Self {
        self.set(names::KEY, encode_key(&value.into()))
    }

    /// Compound key from several values, encoded as a JSON array.
    pub fn compound_key(self, values: &[Value]) -> Self {
        self.set(names::KEY, encode_compound_key(values))
    }

    /// Key from any serializable value.
    pub fn try_key<T: Serialize + ?Sized>(self, value: &T) -> CouchResult<Self> {
        Ok(self.set(names::KEY, try_encode_key(value)?))
    }

    pub fn start_key(self, value: impl Into<Value>) -> Self {
        self.set(names::START_KEY, encode_key(&value.into()))
    }

    pub fn compound_start_key(self, values: &[Value]) -> Self {
        self.set(names::START_KEY, encode_compound_key(values))
    }

    pub fn try_start_key<T: Serialize + ?Sized>(self, value: &T) -> CouchResult<Self> {
        Ok(self.set(names::START_KEY, try_encode_key(value)?))
    }

    pub fn end_key(self, value: impl Into<Value>) -> Self {
        self.set(names::END_KEY, encode_key(&value.into()))
    }

    pub fn compound_end_key(self, values: &[Value]) -> Self {
        self.set(names::END_KEY, encode_compound_key(values))
    }

    pub fn try_end_key<T: Serialize + ?Sized>(self, value: &T) -> CouchResult<Self> {
        Ok(self.set(names::END_KEY, try_encode_key(value)?))
    }

    pub fn start_key_document_id(self, id: impl Into<String>) -> Self {
        self.set(names::START_KEY_DOC_ID, id)
    }

    pub fn end_key_document_id(self, id: impl Into<String>) -> Self {
        self.set(names::END_KEY_DOC_ID, id)
    }

    pub fn limit(self, value: u64) -> Self {
        self.set(names::LIMIT, value.to_string())
    }

    pub fn skip(self, value: u64) -> Self {
        self.set(names::SKIP, value.to_string())
    }

    pub fn descending(self) -> Self {
        self.set(names::DESCENDING, TRUE)
    }

    pub fn group(self) -> Self {
        self.set(names::GROUP, TRUE)
    }

    pub fn group_level(self, value: u32) -> Self {
        self.set(names::GROUP_LEVEL, value.to_string())
    }

    /// Explicitly enable or disable the reduce step of a view.
    pub fn reduce(self, enabled: bool) -> Self {
        self.set(names::REDUCE, enabled.to_string())
    }

    pub fn include_documents(self) -> Self {
        self.set(names::INCLUDE_DOCS, TRUE)
    }

    /// Accept a possibly stale index (`stale=ok`).
    pub fn stale(self) -> Self {
        self.set(names::STALE, "ok")
    }
}
