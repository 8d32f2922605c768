// CouchDB database handle
// Stateless executor over a CouchTransport:
// - document get/has/save/write and bulk save
// - conditional view execution (QueryOutcome) and HEAD probes
// - raw list output and show output

use crate::query::{QueryOutcome, QueryRequest, ViewQuery};
use bytes::Bytes;
use couchview_core::design::DESIGN_PREFIX;
use couchview_core::{
    BulkDocuments, CouchDocument, CouchError, CouchResult, FromCouchJson, QueryResult,
};
use couchview_transport::{CouchRequest, CouchResponse, CouchTransport};
use http::StatusCode;
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

#[cfg(feature = "http-client")]
use crate::config::ServerConfig;
#[cfg(feature = "http-client")]
use couchview_transport::HttpTransport;

/// One database on a CouchDB server.
#[derive(Debug, Clone)]
pub struct CouchDatabase<T> {
    transport: T,
    name: String,
}

#[cfg(feature = "http-client")]
impl CouchDatabase<HttpTransport> {
    /// Database `name` on the server described by `config`.
    pub fn connect(config: &ServerConfig, name: impl Into<String>) -> CouchResult<Self> {
        let mut transport = HttpTransport::new(&config.base_url(), config.timeout())
            .map_err(|e| CouchError::query_failure_with("Failed to build HTTP transport", e))?;
        if let Some(user) = &config.user {
            transport = transport.with_credentials(user.clone(), config.password.clone());
        }
        Ok(Self::new(transport, name))
    }
}

impl<T: CouchTransport> CouchDatabase<T> {
    pub fn new(transport: T, name: impl Into<String>) -> Self {
        Self {
            transport,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// View query against `_design/<design>/_view/<view>`.
    pub fn query(&self, design: impl Into<String>, view: impl Into<String>) -> ViewQuery {
        ViewQuery::view(design, view)
    }

    pub fn query_all_documents(&self) -> ViewQuery {
        ViewQuery::all_documents()
    }

    /// Database path segments for a document id. Design document ids keep
    /// their slash.
    fn document_segments(&self, id: &str) -> Vec<String> {
        let mut segments = vec![self.name.clone()];
        match id.strip_prefix(DESIGN_PREFIX) {
            Some(name) => {
                segments.push("_design".to_string());
                segments.push(name.to_string());
            }
            None => segments.push(id.to_string()),
        }
        segments
    }

    async fn send(&self, request: CouchRequest) -> CouchResult<CouchResponse> {
        let context = format!("{} {}", request.method(), request.path());
        debug!("Sending {}", context);
        if let Some(body) = request.body() {
            trace!("Request body:\n{}", String::from_utf8_lossy(body));
        }
        self.transport
            .send(request)
            .await
            .map_err(|e| CouchError::query_failure_with(format!("{} failed", context), e))
    }

    /// Pass success and 304 through; map anything else onto an error kind.
    fn check(response: CouchResponse, context: &str) -> CouchResult<CouchResponse> {
        if response.is_success() || response.is_not_modified() {
            return Ok(response);
        }
        let body = response.json().ok().flatten();
        Err(CouchError::from_status(
            response.status().as_u16(),
            context,
            body.as_ref(),
        ))
    }

    fn parse_json(response: &CouchResponse, context: &str) -> CouchResult<Value> {
        trace!("Response body:\n{}", response.text());
        response
            .json()
            .map_err(|e| CouchError::query_failure_with(format!("{}: malformed response", context), e))?
            .ok_or_else(|| CouchError::query_failure(format!("{}: empty response body", context)))
    }

    fn parse_object(response: &CouchResponse, context: &str) -> CouchResult<Map<String, Value>> {
        match Self::parse_json(response, context)? {
            Value::Object(obj) => Ok(obj),
            other => Err(CouchError::query_failure(format!(
                "{}: expected a JSON object, got {}",
                context, other
            ))),
        }
    }

    /// Fetch and build a document. 404 is `NotFound`.
    pub async fn get_document<D: FromCouchJson>(&self, id: &str) -> CouchResult<D> {
        let context = format!("get document {}", id);
        let response = self
            .send(CouchRequest::get(self.document_segments(id)))
            .await?;
        let response = Self::check(response, &context)?;
        let obj = Self::parse_object(&response, &context)?;
        D::read_json(&obj)
    }

    /// Like [`get_document`](Self::get_document) with 404 as `None`.
    pub async fn try_get_document<D: FromCouchJson>(&self, id: &str) -> CouchResult<Option<D>> {
        match self.get_document(id).await {
            Ok(doc) => Ok(Some(doc)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// HEAD on the document.
    pub async fn has_document(&self, id: &str) -> CouchResult<bool> {
        let response = self
            .send(CouchRequest::head(self.document_segments(id)))
            .await?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(CouchError::from_status(
                status.as_u16(),
                format!("check document {}", id),
                None,
            )),
        }
    }

    /// Number of live documents, from the database info.
    pub async fn count_documents(&self) -> CouchResult<u64> {
        let context = format!("database info {}", self.name);
        let response = self.send(CouchRequest::get([self.name.as_str()])).await?;
        let response = Self::check(response, &context)?;
        let obj = Self::parse_object(&response, &context)?;
        obj.get("doc_count")
            .and_then(Value::as_u64)
            .ok_or_else(|| CouchError::query_failure(format!("{}: no doc_count", context)))
    }

    /// Create or update: PUT when the document has an id, otherwise POST
    /// and let the server assign one. Stamps the new id and revision.
    pub async fn save_document<D: CouchDocument>(&self, doc: &mut D) -> CouchResult<()> {
        if doc.id().is_some() {
            return self.write_document(doc).await;
        }
        let body = doc.to_json()?.to_string();
        let response = self
            .send(CouchRequest::post([self.name.as_str()]).json_body(body))
            .await?;
        let response = Self::check(response, "create document")?;
        let obj = Self::parse_object(&response, "create document")?;
        stamp_identity(doc, &obj);
        Ok(())
    }

    /// PUT under the document's id. A stale revision is `Conflict`.
    pub async fn write_document<D: CouchDocument>(&self, doc: &mut D) -> CouchResult<()> {
        let id = doc
            .id()
            .map(str::to_string)
            .ok_or_else(|| CouchError::encoding("cannot write a document without an id"))?;
        let context = format!("write document {}", id);
        let body = doc.to_json()?.to_string();
        let response = self
            .send(CouchRequest::put(self.document_segments(&id)).json_body(body))
            .await?;
        let response = Self::check(response, &context)?;
        let obj = Self::parse_object(&response, &context)?;
        stamp_identity(doc, &obj);
        Ok(())
    }

    /// Save several documents in one `_bulk_docs` round trip. Ids and
    /// revisions are stamped in order for every document the server
    /// accepted; the first rejected document is reported as the error.
    pub async fn save_documents<D: CouchDocument>(&self, docs: &mut [D]) -> CouchResult<()> {
        let body = BulkDocuments::new(docs).to_json_string()?;
        let response = self
            .send(CouchRequest::post([self.name.as_str(), "_bulk_docs"]).json_body(body))
            .await?;
        let response = Self::check(response, "bulk save")?;
        let results = match Self::parse_json(&response, "bulk save")? {
            Value::Array(results) => results,
            other => {
                return Err(CouchError::query_failure(format!(
                    "bulk save: expected an array, got {}",
                    other
                )))
            }
        };
        if results.len() != docs.len() {
            warn!(
                "bulk save returned {} results for {} documents",
                results.len(),
                docs.len()
            );
        }

        let mut first_error = None;
        for (doc, result) in docs.iter_mut().zip(&results) {
            let Some(obj) = result.as_object() else {
                continue;
            };
            match obj.get("error").and_then(Value::as_str) {
                None => stamp_identity(doc, obj),
                Some(error) if first_error.is_none() => {
                    let id = obj.get("id").and_then(Value::as_str).unwrap_or_default();
                    let message = format!("bulk save of {}", id);
                    let status = if error == "conflict" { 409 } else { 500 };
                    first_error = Some(CouchError::from_status(status, message, Some(result)));
                }
                Some(_) => {}
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Execute a query, conditionally when `etag` is given. A 304 answer
    /// is `NotModified`.
    pub async fn execute<Q: QueryRequest>(
        &self,
        query: &Q,
        etag: Option<&str>,
    ) -> CouchResult<QueryOutcome<Q::Output>> {
        let mut request = query.build_request(&self.name)?;
        if let Some(etag) = etag {
            request = request
                .if_none_match(etag)
                .map_err(|e| CouchError::query_failure_with("bad cached ETag", e))?;
        }
        let context = format!("query {}", request.path());
        let response = Self::check(self.send(request).await?, &context)?;
        if response.is_not_modified() {
            debug!("{}: not modified", context);
            return Ok(QueryOutcome::NotModified);
        }
        let body = Self::parse_json(&response, &context)?;
        let etag = response.etag().map(str::to_string);
        Ok(QueryOutcome::Fetched(Q::Output::from_response(body, etag)))
    }

    /// Unconditional execution.
    pub async fn fetch<Q: QueryRequest>(&self, query: &Q) -> CouchResult<Q::Output> {
        match self.execute(query, None).await? {
            QueryOutcome::Fetched(result) => Ok(result),
            QueryOutcome::NotModified => Err(CouchError::query_failure(
                "server answered 304 to an unconditional request",
            )),
        }
    }

    /// Validity check with `If-None-Match`. Only 304 counts as still valid;
    /// any response body is discarded.
    pub async fn probe<Q: QueryRequest>(&self, query: &Q, etag: &str) -> CouchResult<bool> {
        let request = query
            .build_probe(&self.name)?
            .if_none_match(etag)
            .map_err(|e| CouchError::query_failure_with("bad cached ETag", e))?;
        let response = self.send(request).await?;
        debug!("ETag probe answered {}", response.status());
        Ok(response.is_not_modified())
    }

    /// Raw output of a list function.
    pub async fn list_output(&self, query: &ViewQuery) -> CouchResult<Bytes> {
        let request = query.build_request(&self.name)?;
        let context = format!("list {}", request.path());
        let response = Self::check(self.send(request).await?, &context)?;
        Ok(response.into_body())
    }

    /// First line of a show function's output.
    pub async fn show_output(&self, query: &ViewQuery) -> CouchResult<String> {
        let request = query.build_request(&self.name)?;
        let context = format!("show {}", request.path());
        let response = Self::check(self.send(request).await?, &context)?;
        Ok(response.text().lines().next().unwrap_or_default().to_string())
    }
}

/// Copy `id`/`rev` (or `_id`/`_rev`) from a write response onto the
/// document.
fn stamp_identity<D: CouchDocument>(doc: &mut D, response: &Map<String, Value>) {
    let field = |a: &str, b: &str| {
        response
            .get(a)
            .or_else(|| response.get(b))
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    if let Some(id) = field("id", "_id") {
        doc.set_id(id);
    }
    if let Some(rev) = field("rev", "_rev") {
        doc.set_rev(rev);
    }
}
