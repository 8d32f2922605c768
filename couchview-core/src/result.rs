use serde_json::Value;

/// Anything exposing the `rows` array of a view or search response.
pub trait ViewRows {
    fn rows(&self) -> &[Value];
}

/// A parsed response built from a JSON body and the ETag it came with.
pub trait QueryResult: ViewRows + Sized {
    fn from_response(body: Value, etag: Option<String>) -> Self;
    fn etag(&self) -> Option<&str>;
}

fn rows_of(body: &Value) -> &[Value] {
    body.get("rows")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// A parsed view response and the ETag it was served with.
///
/// Never mutated after construction; a re-fetch produces a new value.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewResult {
    body: Value,
    etag: Option<String>,
}

impl ViewResult {
    pub fn new(body: Value, etag: Option<String>) -> Self {
        Self { body, etag }
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }

    pub fn total_rows(&self) -> Option<u64> {
        self.body.get("total_rows").and_then(Value::as_u64)
    }

    pub fn offset(&self) -> Option<u64> {
        self.body.get("offset").and_then(Value::as_u64)
    }

    pub fn len(&self) -> usize {
        self.rows().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows().is_empty()
    }

    pub fn into_body(self) -> Value {
        self.body
    }
}

impl ViewRows for ViewResult {
    fn rows(&self) -> &[Value] {
        rows_of(&self.body)
    }
}

impl QueryResult for ViewResult {
    fn from_response(body: Value, etag: Option<String>) -> Self {
        Self::new(body, etag)
    }

    fn etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }
}

/// A full-text search response (couchdb-lucene or Cloudant search).
#[derive(Debug, Clone, PartialEq)]
pub struct LuceneResult {
    body: Value,
    etag: Option<String>,
}

impl LuceneResult {
    pub fn new(body: Value, etag: Option<String>) -> Self {
        Self { body, etag }
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }

    /// The query as the server understood it.
    pub fn q(&self) -> Option<&str> {
        self.body.get("q").and_then(Value::as_str)
    }

    pub fn total_rows(&self) -> Option<u64> {
        self.body.get("total_rows").and_then(Value::as_u64)
    }

    pub fn skip(&self) -> Option<u64> {
        self.body.get("skip").and_then(Value::as_u64)
    }

    pub fn limit(&self) -> Option<u64> {
        self.body.get("limit").and_then(Value::as_u64)
    }

    /// Cloudant pagination token.
    pub fn bookmark(&self) -> Option<&str> {
        self.body.get("bookmark").and_then(Value::as_str)
    }

    pub fn len(&self) -> usize {
        self.rows().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows().is_empty()
    }
}

impl ViewRows for LuceneResult {
    fn rows(&self) -> &[Value] {
        rows_of(&self.body)
    }
}

impl QueryResult for LuceneResult {
    fn from_response(body: Value, etag: Option<String>) -> Self {
        Self::new(body, etag)
    }

    fn etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }
}
