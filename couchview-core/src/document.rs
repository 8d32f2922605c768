//! Document capabilities.
//!
//! Result rows and bulk payloads never require a common base type. A type
//! opts in to exactly the capability an operation needs: [`FromCouchJson`]
//! to be read out of a row, [`ToCouchJson`] to be written into a payload,
//! and [`CouchDocument`] when it also carries `_id` / `_rev` identity.

use crate::error::{CouchError, CouchResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

pub const ID_FIELD: &str = "_id";
pub const REV_FIELD: &str = "_rev";

/// Writes itself as a JSON object.
pub trait ToCouchJson {
    /// Write this value's fields into an object under construction.
    fn write_json(&self, fields: &mut Map<String, Value>) -> CouchResult<()>;

    /// The complete JSON form. The default opens a fresh object boundary
    /// and lets [`write_json`](Self::write_json) fill it; self-contained
    /// types that manage their own envelope override this instead.
    fn to_json(&self) -> CouchResult<Value> {
        let mut fields = Map::new();
        self.write_json(&mut fields)?;
        Ok(Value::Object(fields))
    }
}

/// Built from a JSON object.
pub trait FromCouchJson: Sized {
    fn read_json(obj: &Map<String, Value>) -> CouchResult<Self>;
}

/// A document with stable identity.
pub trait CouchDocument: ToCouchJson + FromCouchJson {
    fn id(&self) -> Option<&str>;
    fn rev(&self) -> Option<&str>;
    fn set_id(&mut self, id: String);
    fn set_rev(&mut self, rev: String);
}

/// Write `_id` and `_rev` when present.
pub fn write_id_and_rev(
    id: Option<&str>,
    rev: Option<&str>,
    fields: &mut Map<String, Value>,
) {
    if let Some(id) = id {
        fields.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
    }
    if let Some(rev) = rev {
        fields.insert(REV_FIELD.to_string(), Value::String(rev.to_string()));
    }
}

/// Read `_id` and `_rev` if they are strings.
pub fn read_id_and_rev(obj: &Map<String, Value>) -> (Option<String>, Option<String>) {
    let read = |name: &str| obj.get(name).and_then(Value::as_str).map(str::to_string);
    (read(ID_FIELD), read(REV_FIELD))
}

/// Decode an object through serde, for types that derive `Deserialize`.
pub fn from_object<T: DeserializeOwned>(obj: &Map<String, Value>) -> CouchResult<T> {
    serde_json::from_value(Value::Object(obj.clone()))
        .map_err(|e| CouchError::encoding_with("failed to decode document", e))
}

/// Write a serde-serializable value's fields into `fields`.
pub fn write_object<T: Serialize + ?Sized>(
    value: &T,
    fields: &mut Map<String, Value>,
) -> CouchResult<()> {
    match serde_json::to_value(value)
        .map_err(|e| CouchError::encoding_with("failed to encode document", e))?
    {
        Value::Object(obj) => {
            fields.extend(obj);
            Ok(())
        }
        other => Err(CouchError::encoding(format!(
            "document must encode to a JSON object, got {}",
            other
        ))),
    }
}

/// A schemaless document: identity plus whatever other fields it holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonDocument {
    pub id: Option<String>,
    pub rev: Option<String>,
    pub fields: Map<String, Value>,
}

impl JsonDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Parse from JSON text; `_id`/`_rev` are lifted out of the body.
    pub fn from_json_str(text: &str) -> CouchResult<Self> {
        match serde_json::from_str::<Value>(text)? {
            Value::Object(obj) => Self::read_json(&obj),
            _ => Err(CouchError::encoding("document text is not a JSON object")),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }
}

impl ToCouchJson for JsonDocument {
    fn write_json(&self, fields: &mut Map<String, Value>) -> CouchResult<()> {
        write_id_and_rev(self.id.as_deref(), self.rev.as_deref(), fields);
        for (name, value) in &self.fields {
            fields.insert(name.clone(), value.clone());
        }
        Ok(())
    }
}

impl FromCouchJson for JsonDocument {
    fn read_json(obj: &Map<String, Value>) -> CouchResult<Self> {
        let (id, rev) = read_id_and_rev(obj);
        let fields = obj
            .iter()
            .filter(|(name, _)| name.as_str() != ID_FIELD && name.as_str() != REV_FIELD)
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Ok(Self { id, rev, fields })
    }
}

impl CouchDocument for JsonDocument {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn rev(&self) -> Option<&str> {
        self.rev.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn set_rev(&mut self, rev: String) {
        self.rev = Some(rev);
    }
}

/// A whole view row taken as a document, as returned by `_all_docs`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowDocument {
    pub id: Option<String>,
    pub key: Value,
    pub value: Value,
    pub doc: Option<Value>,
}

impl RowDocument {
    /// Revision reported by `_all_docs` rows (`value.rev`).
    pub fn rev(&self) -> Option<&str> {
        self.value.get("rev").and_then(Value::as_str)
    }
}

impl FromCouchJson for RowDocument {
    fn read_json(obj: &Map<String, Value>) -> CouchResult<Self> {
        Ok(Self {
            id: obj.get("id").and_then(Value::as_str).map(str::to_string),
            key: obj.get("key").cloned().unwrap_or(Value::Null),
            value: obj.get("value").cloned().unwrap_or(Value::Null),
            doc: obj.get("doc").filter(|d| !d.is_null()).cloned(),
        })
    }
}
