use couchview_core::{BulkKeys, CouchResult, QueryOptions, QueryResult, QueryTarget, ViewResult};
use couchview_transport::CouchRequest;
use http::Method;
use serde_json::Value;
use std::fmt;

/// Result of a conditional query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome<R = ViewResult> {
    /// A full response was read and parsed.
    Fetched(R),
    /// The server answered 304; the caller's copy is current.
    NotModified,
}

impl<R> QueryOutcome<R> {
    pub fn is_not_modified(&self) -> bool {
        matches!(self, QueryOutcome::NotModified)
    }

    pub fn fetched(self) -> Option<R> {
        match self {
            QueryOutcome::Fetched(result) => Some(result),
            QueryOutcome::NotModified => None,
        }
    }
}

/// Something a database can execute and parse into a result.
pub trait QueryRequest {
    type Output: QueryResult + Clone + fmt::Debug;

    /// Full GET/POST request for database `db`.
    fn build_request(&self, db: &str) -> CouchResult<CouchRequest>;

    /// Request used to check a cached ETag: HEAD when the query has no
    /// body, otherwise the full request (only its status is read).
    fn build_probe(&self, db: &str) -> CouchResult<CouchRequest>;

    /// Check validity with HEAD before issuing the full request.
    fn uses_head_probe(&self) -> bool {
        false
    }

    /// Whether the server emits usable ETags for this query.
    fn supports_etag(&self) -> bool {
        true
    }
}

/// A view, `_all_docs`, list or show query.
///
/// Plain value: cloning it is cheap and executing it never mutates it.
/// Cached execution lives in [`CachedQuery`](crate::cache::CachedQuery).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewQuery {
    target: QueryTarget,
    options: QueryOptions,
    body: Option<String>,
    check_etag_using_head: bool,
}

impl ViewQuery {
    pub fn new(target: QueryTarget) -> Self {
        Self {
            target,
            options: QueryOptions::new(),
            body: None,
            check_etag_using_head: false,
        }
    }

    pub fn view(design: impl Into<String>, view: impl Into<String>) -> Self {
        Self::new(QueryTarget::view(design, view))
    }

    pub fn all_documents() -> Self {
        Self::new(QueryTarget::AllDocuments)
    }

    pub fn list(
        design: impl Into<String>,
        list: impl Into<String>,
        view: impl Into<String>,
    ) -> Self {
        Self::new(QueryTarget::list(design, list, view))
    }

    pub fn show(
        design: impl Into<String>,
        show: impl Into<String>,
        doc_id: impl Into<String>,
    ) -> Self {
        Self::new(QueryTarget::show(design, show, doc_id))
    }

    pub fn target(&self) -> &QueryTarget {
        &self.target
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    delegate_options! {
        key(value: impl Into<Value>);
        /// Key made of several values, encoded as a JSON array.
        compound_key(values: &[Value]);
        start_key(value: impl Into<Value>);
        compound_start_key(values: &[Value]);
        end_key(value: impl Into<Value>);
        compound_end_key(values: &[Value]);
        start_key_document_id(id: impl Into<String>);
        end_key_document_id(id: impl Into<String>);
        limit(value: u64);
        skip(value: u64);
        descending();
        group();
        group_level(value: u32);
        reduce(enabled: bool);
        include_documents();
        /// Accept a possibly stale index instead of waiting for a rebuild.
        stale();
    }

    delegate_fallible_options! {
        try_key;
        try_start_key;
        try_end_key;
    }

    /// Arbitrary option, value passed through verbatim.
    pub fn option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(name, value);
        self
    }

    /// Raw JSON body. A query with a body is sent as POST.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Restrict the view to a set of keys, sent as `{"keys": [...]}`.
    pub fn keys(self, keys: &BulkKeys) -> CouchResult<Self> {
        let body = keys.to_json_string()?;
        Ok(self.with_body(body))
    }

    /// Validate a cached result with HEAD before re-reading the view.
    pub fn check_etag_using_head(mut self) -> Self {
        self.check_etag_using_head = true;
        self
    }

    pub fn clear_options(&mut self) {
        self.options.clear();
    }

    fn segments(&self, db: &str) -> Vec<String> {
        std::iter::once(db)
            .chain(self.target.segments())
            .map(str::to_string)
            .collect()
    }
}

impl QueryRequest for ViewQuery {
    type Output = ViewResult;

    fn build_request(&self, db: &str) -> CouchResult<CouchRequest> {
        let request = CouchRequest::get(self.segments(db)).query(self.options.to_query_pairs());
        Ok(match &self.body {
            Some(body) => request
                .json_body(body.clone())
                .with_method(Method::POST),
            None => request,
        })
    }

    fn build_probe(&self, db: &str) -> CouchResult<CouchRequest> {
        if self.body.is_some() {
            return self.build_request(db);
        }
        Ok(CouchRequest::head(self.segments(db)).query(self.options.to_query_pairs()))
    }

    /// POST queries fall back to a conditional full request.
    fn uses_head_probe(&self) -> bool {
        self.check_etag_using_head && self.body.is_none()
    }
}
