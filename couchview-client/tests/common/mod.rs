// In-memory CouchDB stand-in for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use couchview_transport::{CouchRequest, CouchResponse, CouchTransport, TransportError};
use http::{HeaderMap, Method, StatusCode};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

pub const DB: &str = "couchview_test";

/// Console logging for tests, controlled by RUST_LOG
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("couchview=trace,debug")),
        )
        .with_test_writer()
        .try_init();
}

/// One request as the fake saw it.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: Method,
    pub path: String,
    pub if_none_match: Option<String>,
    pub query: Vec<(String, String)>,
    pub body: Option<String>,
}

#[derive(Debug, Clone)]
struct ViewEntry {
    body: Value,
    etag: String,
}

/// Documents keyed by id, canned responses for query paths, and a log of
/// every request. Query ETags change whenever a document is written,
/// which is how a real view index behaves.
#[derive(Debug, Default)]
pub struct FakeCouch {
    docs: Mutex<HashMap<String, Value>>,
    views: Mutex<HashMap<String, ViewEntry>>,
    raw: Mutex<HashMap<String, String>>,
    seen: Mutex<Vec<SeenRequest>>,
    generation: AtomicU64,
    next_id: AtomicU64,
    writes: AtomicU64,
    conflict_on_write: AtomicBool,
}

impl FakeCouch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canned JSON response for a query path below the database, e.g.
    /// `_design/computers/_view/by_cpumake`.
    pub fn set_view(&self, path: &str, body: Value) {
        let etag = self.fresh_etag();
        self.views.lock().unwrap().insert(
            format!("{}/{}", DB, path),
            ViewEntry { body, etag },
        );
    }

    /// Canned non-JSON response (list and show output).
    pub fn set_raw(&self, path: &str, body: &str) {
        self.raw
            .lock()
            .unwrap()
            .insert(format!("{}/{}", DB, path), body.to_string());
    }

    /// Store a document directly, bypassing the write counter.
    pub fn put_raw(&self, id: &str, mut doc: Value) -> String {
        let rev = format!("1-{}", self.generation.fetch_add(1, Ordering::SeqCst));
        doc["_id"] = json!(id);
        doc["_rev"] = json!(rev);
        self.docs.lock().unwrap().insert(id.to_string(), doc);
        self.invalidate_views();
        rev
    }

    pub fn doc(&self, id: &str) -> Option<Value> {
        self.docs.lock().unwrap().get(id).cloned()
    }

    pub fn doc_count(&self) -> usize {
        self.docs.lock().unwrap().len()
    }

    /// Writes accepted through PUT, POST or _bulk_docs.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Answer the next document write with 409.
    pub fn conflict_on_next_write(&self) {
        self.conflict_on_write.store(true, Ordering::SeqCst);
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn seen_methods(&self) -> Vec<Method> {
        self.seen().into_iter().map(|r| r.method).collect()
    }

    pub fn clear_seen(&self) {
        self.seen.lock().unwrap().clear();
    }

    fn fresh_etag(&self) -> String {
        format!("\"g{}\"", self.generation.fetch_add(1, Ordering::SeqCst))
    }

    fn invalidate_views(&self) {
        let keys: Vec<String> = self.views.lock().unwrap().keys().cloned().collect();
        for key in keys {
            let etag = self.fresh_etag();
            if let Some(entry) = self.views.lock().unwrap().get_mut(&key) {
                entry.etag = etag;
            }
        }
    }

    fn store(&self, id: String, mut doc: Map<String, Value>) -> Result<String, StatusCode> {
        if self.conflict_on_write.swap(false, Ordering::SeqCst) {
            return Err(StatusCode::CONFLICT);
        }
        let mut docs = self.docs.lock().unwrap();
        let sent_rev = doc.get("_rev").and_then(Value::as_str).map(str::to_string);
        let next = match (docs.get(&id), sent_rev) {
            (None, None) => 1,
            (None, Some(_)) => return Err(StatusCode::CONFLICT),
            (Some(_), None) => return Err(StatusCode::CONFLICT),
            (Some(existing), Some(rev)) => {
                if existing["_rev"] != json!(rev) {
                    return Err(StatusCode::CONFLICT);
                }
                rev.split('-')
                    .next()
                    .and_then(|n| n.parse::<u64>().ok())
                    .unwrap_or(0)
                    + 1
            }
        };
        let rev = format!("{}-{}", next, self.generation.fetch_add(1, Ordering::SeqCst));
        doc.insert("_id".to_string(), json!(id));
        doc.insert("_rev".to_string(), json!(rev));
        docs.insert(id, Value::Object(doc));
        drop(docs);
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.invalidate_views();
        Ok(rev)
    }

    fn assign_id(&self) -> String {
        format!("doc-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn handle(&self, request: &CouchRequest) -> CouchResponse {
        let path = request.path();
        let segments = request.segments();
        let method = request.method().clone();

        if let Some(entry) = self.views.lock().unwrap().get(&path).cloned() {
            return view_response(&method, request.etag_condition(), &entry);
        }
        if let Some(text) = self.raw.lock().unwrap().get(&path).cloned() {
            return CouchResponse::new(StatusCode::OK, HeaderMap::new(), text);
        }

        match segments {
            [db] if db == DB => match method {
                Method::GET => json_response(
                    StatusCode::OK,
                    json!({"db_name": DB, "doc_count": self.doc_count()}),
                ),
                Method::POST => {
                    let Some(Value::Object(doc)) = body_json(request) else {
                        return bad_request();
                    };
                    let id = self.assign_id();
                    self.write_response(id.clone(), self.store(id, doc))
                }
                _ => bad_request(),
            },
            [_, bulk] if bulk == "_bulk_docs" => {
                let Some(body) = body_json(request) else {
                    return bad_request();
                };
                let docs = body["docs"].as_array().cloned().unwrap_or_default();
                let results: Vec<Value> = docs
                    .into_iter()
                    .map(|doc| {
                        let doc = doc.as_object().cloned().unwrap_or_default();
                        let id = doc
                            .get("_id")
                            .and_then(Value::as_str)
                            .map(str::to_string)
                            .unwrap_or_else(|| self.assign_id());
                        match self.store(id.clone(), doc) {
                            Ok(rev) => json!({"ok": true, "id": id, "rev": rev}),
                            Err(_) => json!({"id": id, "error": "conflict",
                                             "reason": "Document update conflict."}),
                        }
                    })
                    .collect();
                json_response(StatusCode::CREATED, Value::Array(results))
            }
            [_, rest @ ..] => {
                let id = rest.join("/");
                match method {
                    Method::HEAD => match self.doc(&id) {
                        Some(_) => CouchResponse::new(StatusCode::OK, HeaderMap::new(), Bytes::new()),
                        None => CouchResponse::new(StatusCode::NOT_FOUND, HeaderMap::new(), Bytes::new()),
                    },
                    Method::GET => match self.doc(&id) {
                        Some(doc) => json_response(StatusCode::OK, doc),
                        None => not_found(),
                    },
                    Method::PUT => {
                        let Some(Value::Object(doc)) = body_json(request) else {
                            return bad_request();
                        };
                        self.write_response(id.clone(), self.store(id, doc))
                    }
                    _ => bad_request(),
                }
            }
            [] => bad_request(),
        }
    }

    fn write_response(&self, id: String, result: Result<String, StatusCode>) -> CouchResponse {
        match result {
            Ok(rev) => json_response(StatusCode::CREATED, json!({"ok": true, "id": id, "rev": rev})),
            Err(status) => json_response(
                status,
                json!({"error": "conflict", "reason": "Document update conflict."}),
            ),
        }
    }
}

fn view_response(method: &Method, if_none_match: Option<&str>, entry: &ViewEntry) -> CouchResponse {
    if if_none_match == Some(entry.etag.as_str()) {
        return CouchResponse::new(StatusCode::NOT_MODIFIED, HeaderMap::new(), Bytes::new())
            .with_etag(&entry.etag);
    }
    let body = if *method == Method::HEAD {
        Bytes::new()
    } else {
        Bytes::from(entry.body.to_string())
    };
    CouchResponse::new(StatusCode::OK, HeaderMap::new(), body).with_etag(&entry.etag)
}

fn body_json(request: &CouchRequest) -> Option<Value> {
    request
        .body()
        .and_then(|body| serde_json::from_slice(body).ok())
}

fn json_response(status: StatusCode, body: Value) -> CouchResponse {
    CouchResponse::json_value(status, &body)
}

fn not_found() -> CouchResponse {
    json_response(
        StatusCode::NOT_FOUND,
        json!({"error": "not_found", "reason": "missing"}),
    )
}

fn bad_request() -> CouchResponse {
    json_response(
        StatusCode::BAD_REQUEST,
        json!({"error": "bad_request", "reason": "unsupported by fake"}),
    )
}

#[async_trait]
impl CouchTransport for FakeCouch {
    async fn send(&self, request: CouchRequest) -> Result<CouchResponse, TransportError> {
        self.seen.lock().unwrap().push(SeenRequest {
            method: request.method().clone(),
            path: request.path(),
            if_none_match: request.etag_condition().map(str::to_string),
            query: request.query_pairs().to_vec(),
            body: request
                .body()
                .map(|b| String::from_utf8_lossy(b).into_owned()),
        });
        Ok(self.handle(&request))
    }
}

/// Transport that always fails, for error-path tests.
#[derive(Debug, Default)]
pub struct DeadTransport;

#[async_trait]
impl CouchTransport for DeadTransport {
    async fn send(&self, _request: CouchRequest) -> Result<CouchResponse, TransportError> {
        Err(TransportError::Connection("connection refused".to_string()))
    }
}
