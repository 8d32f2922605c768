//! Materialization of result rows into typed values.
//!
//! Every mode reads either the `value` or the `doc` field of each row, or the
//! whole row object, and preserves the server's row order. Rows where the
//! selected field is absent (or `null`) are skipped rather than treated as
//! errors; a field holding the wrong JSON type is an encoding failure.

use crate::document::{CouchDocument, FromCouchJson, JsonDocument, RowDocument};
use crate::error::{CouchError, CouchResult};
use crate::result::ViewRows;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use tracing::trace;

/// Which part of a row a retrieval mode reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowField {
    Value,
    Doc,
}

impl RowField {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowField::Value => "value",
            RowField::Doc => "doc",
        }
    }
}

type FieldSetter<T> = Box<dyn Fn(&mut T, &Value) -> CouchResult<()> + Send + Sync>;

/// Decoder for types with no decoding capability of their own: a factory
/// producing a fresh instance per row, plus an explicit table mapping JSON
/// field names to setters.
///
/// Fields missing from the object leave whatever the factory put there.
pub struct ArbitraryDecoder<T> {
    factory: Box<dyn Fn() -> T + Send + Sync>,
    fields: Vec<(String, FieldSetter<T>)>,
}

impl<T: 'static> ArbitraryDecoder<T> {
    pub fn new(factory: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            fields: Vec::new(),
        }
    }

    /// Map `name` to a setter receiving the field decoded as `V`.
    pub fn field<V, F>(mut self, name: impl Into<String>, setter: F) -> Self
    where
        V: DeserializeOwned,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        let name = name.into();
        let field_name = name.clone();
        self.fields.push((
            name,
            Box::new(move |target: &mut T, value: &Value| {
                let decoded = serde_json::from_value::<V>(value.clone()).map_err(|e| {
                    CouchError::encoding_with(format!("field '{}' has wrong type", field_name), e)
                })?;
                setter(target, decoded);
                Ok(())
            }),
        ));
        self
    }

    /// Map `name` to a setter receiving the raw JSON value.
    pub fn raw_field<F>(mut self, name: impl Into<String>, setter: F) -> Self
    where
        F: Fn(&mut T, &Value) -> CouchResult<()> + Send + Sync + 'static,
    {
        self.fields.push((name.into(), Box::new(setter)));
        self
    }
}

impl<T> ArbitraryDecoder<T> {
    /// Fresh instance from the factory, then every mapped field present in
    /// `obj` applied in table order.
    pub fn decode(&self, obj: &Map<String, Value>) -> CouchResult<T> {
        let mut instance = (self.factory)();
        for (name, setter) in &self.fields {
            if let Some(value) = obj.get(name) {
                setter(&mut instance, value)?;
            }
        }
        Ok(instance)
    }
}

impl<T> fmt::Debug for ArbitraryDecoder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.fields.iter().map(|(n, _)| n.as_str()).collect();
        f.debug_struct("ArbitraryDecoder")
            .field("fields", &names)
            .finish()
    }
}

fn selected(row: &Value, field: RowField) -> Option<&Value> {
    row.get(field.as_str()).filter(|v| !v.is_null())
}

fn as_object<'a>(value: &'a Value, what: &str) -> CouchResult<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| CouchError::encoding(format!("{} is not a JSON object", what)))
}

fn retrieve<T, F>(rows: &[Value], field: RowField, build: F) -> CouchResult<Vec<T>>
where
    F: Fn(&Map<String, Value>) -> CouchResult<T>,
{
    let mut out = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let Some(value) = selected(row, field) else {
            trace!(index, field = field.as_str(), "row has no such field; skipped");
            continue;
        };
        out.push(build(as_object(value, field.as_str())?)?);
    }
    Ok(out)
}

fn retrieve_first<T, F>(rows: &[Value], field: RowField, build: F) -> CouchResult<Option<T>>
where
    F: Fn(&Map<String, Value>) -> CouchResult<T>,
{
    let Some(row) = rows.first() else {
        return Ok(None);
    };
    match selected(row, field) {
        Some(value) => build(as_object(value, field.as_str())?).map(Some),
        None => Ok(None),
    }
}

fn retrieve_rows<T, F>(rows: &[Value], build: F) -> CouchResult<Vec<T>>
where
    F: Fn(&Map<String, Value>) -> CouchResult<T>,
{
    rows.iter()
        .map(|row| build(as_object(row, "row")?))
        .collect()
}

fn retrieve_with_ids<T>(rows: &[Value], field: RowField) -> CouchResult<Vec<T>>
where
    T: CouchDocument + Default,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for row in rows {
        let Some(value) = selected(row, field) else {
            continue;
        };
        let ids = value.as_array().ok_or_else(|| {
            CouchError::encoding(format!("{} is not an array of ids", field.as_str()))
        })?;
        for id in ids {
            let id = id
                .as_str()
                .ok_or_else(|| CouchError::encoding(format!("id {} is not a string", id)))?;
            if seen.insert(id.to_string()) {
                let mut doc = T::default();
                doc.set_id(id.to_string());
                out.push(doc);
            }
        }
    }
    Ok(out)
}

/// Retrieval modes over any row source.
pub trait GenericViewResult: ViewRows {
    /// Each row's `value`, deserialized directly. Rows without a `value`
    /// key are skipped; an explicit `null` is handed to the deserializer.
    fn values<T: DeserializeOwned>(&self) -> CouchResult<Vec<T>> {
        let mut out = Vec::with_capacity(self.rows().len());
        for row in self.rows() {
            if let Some(value) = row.get(RowField::Value.as_str()) {
                out.push(
                    serde_json::from_value(value.clone())
                        .map_err(|e| CouchError::encoding_with("failed to decode row value", e))?,
                );
            }
        }
        Ok(out)
    }

    fn value_documents<T: FromCouchJson>(&self) -> CouchResult<Vec<T>> {
        retrieve(self.rows(), RowField::Value, T::read_json)
    }

    /// `value` holds an array of ids (multi-emit views). Builds one `T` per
    /// distinct id in first-seen order, carrying only its id.
    fn value_documents_with_ids<T: CouchDocument + Default>(&self) -> CouchResult<Vec<T>> {
        retrieve_with_ids(self.rows(), RowField::Value)
    }

    fn value_document<T: FromCouchJson>(&self) -> CouchResult<Option<T>> {
        retrieve_first(self.rows(), RowField::Value, T::read_json)
    }

    fn arbitrary_value_documents<T>(&self, decoder: &ArbitraryDecoder<T>) -> CouchResult<Vec<T>> {
        retrieve(self.rows(), RowField::Value, |obj| decoder.decode(obj))
    }

    fn arbitrary_value_document<T>(
        &self,
        decoder: &ArbitraryDecoder<T>,
    ) -> CouchResult<Option<T>> {
        retrieve_first(self.rows(), RowField::Value, |obj| decoder.decode(obj))
    }

    /// Documents from `doc` (requires `include_docs`).
    fn documents<T: CouchDocument>(&self) -> CouchResult<Vec<T>> {
        retrieve(self.rows(), RowField::Doc, T::read_json)
    }

    fn json_documents(&self) -> CouchResult<Vec<JsonDocument>> {
        self.documents::<JsonDocument>()
    }

    fn document<T: CouchDocument>(&self) -> CouchResult<Option<T>> {
        retrieve_first(self.rows(), RowField::Doc, T::read_json)
    }

    fn arbitrary_documents<T>(&self, decoder: &ArbitraryDecoder<T>) -> CouchResult<Vec<T>> {
        retrieve(self.rows(), RowField::Doc, |obj| decoder.decode(obj))
    }

    fn arbitrary_document<T>(&self, decoder: &ArbitraryDecoder<T>) -> CouchResult<Option<T>> {
        retrieve_first(self.rows(), RowField::Doc, |obj| decoder.decode(obj))
    }

    /// Whole rows as documents, `_all_docs` style.
    fn row_documents<T: FromCouchJson>(&self) -> CouchResult<Vec<T>> {
        retrieve_rows(self.rows(), T::read_json)
    }

    fn typed_rows(&self) -> CouchResult<Vec<RowDocument>> {
        self.row_documents::<RowDocument>()
    }

    fn arbitrary_row_documents<T>(&self, decoder: &ArbitraryDecoder<T>) -> CouchResult<Vec<T>> {
        retrieve_rows(self.rows(), |obj| decoder.decode(obj))
    }
}

impl<R: ViewRows + ?Sized> GenericViewResult for R {}
