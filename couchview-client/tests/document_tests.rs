// Document, bulk, list/show and search operations against the in-memory server

mod common;

use common::{init_test_logging, FakeCouch, DB};
use couchview_client::{CachedLuceneQuery, CouchDatabase, LuceneQuery, ViewQuery};
use couchview_core::document::{read_id_and_rev, write_id_and_rev};
use couchview_core::{
    BulkKeys, CouchDocument, CouchError, CouchResult, FromCouchJson, GenericViewResult,
    JsonDocument, SortCriteria, ToCouchJson,
};
use http::Method;
use serde_json::{json, Map, Value};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq)]
struct Computer {
    id: Option<String>,
    rev: Option<String>,
    cpu: String,
}

impl ToCouchJson for Computer {
    fn write_json(&self, fields: &mut Map<String, Value>) -> CouchResult<()> {
        write_id_and_rev(self.id.as_deref(), self.rev.as_deref(), fields);
        fields.insert("CPU".to_string(), json!(self.cpu));
        Ok(())
    }
}

impl FromCouchJson for Computer {
    fn read_json(obj: &Map<String, Value>) -> CouchResult<Self> {
        let (id, rev) = read_id_and_rev(obj);
        let cpu = obj
            .get("CPU")
            .and_then(Value::as_str)
            .ok_or_else(|| CouchError::encoding("missing CPU"))?
            .to_string();
        Ok(Self { id, rev, cpu })
    }
}

impl CouchDocument for Computer {
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

fn computer(cpu: &str) -> Computer {
    Computer {
        cpu: cpu.to_string(),
        ..Default::default()
    }
}

fn setup() -> (Arc<FakeCouch>, CouchDatabase<Arc<FakeCouch>>) {
    init_test_logging();
    let fake = Arc::new(FakeCouch::new());
    let db = CouchDatabase::new(fake.clone(), DB);
    (fake, db)
}

#[tokio::test]
async fn test_write_document_stamps_revision() {
    let (fake, db) = setup();
    let mut doc = JsonDocument::from_json_str(r#"{"_id":"123", "CPU": "Intel"}"#).unwrap();

    db.write_document(&mut doc).await.unwrap();

    assert_eq!(db.count_documents().await.unwrap(), 1);
    assert_eq!(doc.id.as_deref(), Some("123"));
    assert!(doc.rev.is_some());
    assert_eq!(fake.doc("123").unwrap()["CPU"], "Intel");
}

#[tokio::test]
async fn test_save_without_id_lets_server_assign_one() {
    let (fake, db) = setup();
    let mut doc = computer("AMD");

    db.save_document(&mut doc).await.unwrap();

    let id = doc.id.clone().unwrap();
    assert!(doc.rev.is_some());
    assert_eq!(fake.seen_methods(), vec![Method::POST]);
    let loaded: Computer = db.get_document(&id).await.unwrap();
    assert_eq!(loaded, doc);
}

#[tokio::test]
async fn test_stale_revision_is_conflict() {
    let (_fake, db) = setup();
    let mut doc = computer("Via");
    doc.id = Some("c1".to_string());
    db.save_document(&mut doc).await.unwrap();

    let mut stale = doc.clone();
    doc.cpu = "Sparq".to_string();
    db.save_document(&mut doc).await.unwrap();

    stale.cpu = "Intel".to_string();
    let err = db.write_document(&mut stale).await.unwrap_err();
    assert!(err.is_conflict());
    assert!(err.reason().is_some());
}

#[tokio::test]
async fn test_write_without_id_is_encoding_failure() {
    let (fake, db) = setup();
    let err = db.write_document(&mut computer("Intel")).await.unwrap_err();
    assert!(matches!(err, CouchError::EncodingFailure { .. }));
    assert!(fake.seen().is_empty());
}

#[tokio::test]
async fn test_missing_document() {
    let (_fake, db) = setup();
    let err = db.get_document::<JsonDocument>("nope").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.reason(), Some("missing"));
    assert!(db.try_get_document::<JsonDocument>("nope").await.unwrap().is_none());
    assert!(!db.has_document("nope").await.unwrap());
}

#[tokio::test]
async fn test_has_document_uses_head() {
    let (fake, db) = setup();
    fake.put_raw("present", json!({"CPU": "Intel"}));
    fake.clear_seen();

    assert!(db.has_document("present").await.unwrap());
    assert_eq!(fake.seen_methods(), vec![Method::HEAD]);
}

#[tokio::test]
async fn test_bulk_save_stamps_in_order() {
    let (fake, db) = setup();
    let mut docs = vec![computer("Intel"), computer("AMD"), computer("Via")];

    db.save_documents(&mut docs).await.unwrap();

    assert_eq!(fake.doc_count(), 3);
    for doc in &docs {
        let stored = fake.doc(doc.id.as_deref().unwrap()).unwrap();
        assert_eq!(stored["CPU"], json!(doc.cpu));
        assert_eq!(stored["_rev"].as_str(), doc.rev.as_deref());
    }
    let seen = fake.seen();
    assert_eq!(seen[0].path, format!("{}/_bulk_docs", DB));
}

#[tokio::test]
async fn test_bulk_save_reports_rejected_document() {
    let (fake, db) = setup();
    fake.put_raw("taken", json!({"CPU": "Intel"}));
    let mut docs = vec![computer("AMD"), computer("Via")];
    docs[1].id = Some("taken".to_string());

    let err = db.save_documents(&mut docs).await.unwrap_err();

    assert!(err.is_conflict());
    assert!(docs[0].rev.is_some());
    assert!(docs[1].rev.is_none());
}

#[tokio::test]
async fn test_bulk_keys_post_body_keeps_order() {
    let (fake, db) = setup();
    fake.set_view(
        "_all_docs",
        json!({"total_rows": 2, "rows": [
            {"id": "id1", "key": "id1", "value": {"rev": "1-a"}, "doc": {"_id": "id1", "_rev": "1-a", "CPU": "Intel"}},
            {"id": "id2", "key": "id2", "value": {"rev": "1-b"}, "doc": {"_id": "id2", "_rev": "1-b", "CPU": "AMD"}}
        ]}),
    );
    let query = db
        .query_all_documents()
        .include_documents()
        .keys(&BulkKeys::new(["id1", "id2"]))
        .unwrap();

    let result = db.fetch(&query).await.unwrap();

    let seen = fake.seen();
    assert_eq!(seen[0].method, Method::POST);
    let body: Value = serde_json::from_str(seen[0].body.as_deref().unwrap()).unwrap();
    assert_eq!(body, json!({"keys": ["id1", "id2"]}));
    let computers: Vec<Computer> = result.documents().unwrap();
    let ids: Vec<_> = computers.iter().map(|c| c.id.as_deref().unwrap()).collect();
    assert_eq!(ids, vec!["id1", "id2"]);
    assert_eq!(computers[1].cpu, "AMD");
}

#[tokio::test]
async fn test_view_query_sends_encoded_options() {
    let (fake, db) = setup();
    fake.set_view("_design/computers/_view/by_cpumake", json!({"rows": []}));
    let query = db
        .query("computers", "by_cpumake")
        .key("Intel")
        .limit(10)
        .stale();

    let result = db.fetch(&query).await.unwrap();

    assert!(result.is_empty());
    let seen = fake.seen();
    assert_eq!(
        seen[0].query,
        vec![
            ("key".to_string(), "\"Intel\"".to_string()),
            ("limit".to_string(), "10".to_string()),
            ("stale".to_string(), "ok".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_list_and_show_output() {
    let (fake, db) = setup();
    fake.set_raw("_design/computers/_list/as_csv/by_cpumake", "a,Intel\nb,AMD\n");
    fake.set_raw("_design/computers/_show/detail/123", "<b>Intel</b>\nsecond line");

    let csv = db
        .list_output(&ViewQuery::list("computers", "as_csv", "by_cpumake"))
        .await
        .unwrap();
    assert_eq!(csv.as_ref(), b"a,Intel\nb,AMD\n");

    let shown = db
        .show_output(&ViewQuery::show("computers", "detail", "123"))
        .await
        .unwrap();
    assert_eq!(shown, "<b>Intel</b>");
}

#[tokio::test]
async fn test_couchdb_lucene_search_is_cached() {
    let (fake, db) = setup();
    fake.set_view(
        "_fti/_design/search/by_text",
        json!({"q": "default:intel", "skip": 0, "limit": 25, "total_rows": 1,
               "rows": [{"id": "a", "score": 1.0, "fields": {"CPU": "Intel"}}]}),
    );
    let query = LuceneQuery::couchdb_lucene("search", "by_text")
        .q("intel")
        .sort(&[SortCriteria::descending("CPU")])
        .unwrap();
    let mut cached = CachedLuceneQuery::new(query);

    let result = cached.get_result(&db).await.unwrap();
    assert_eq!(result.total_rows(), Some(1));
    assert_eq!(result.q(), Some("default:intel"));
    assert!(cached.is_cached_and_valid(&db).await.unwrap());

    fake.clear_seen();
    cached.get_result(&db).await.unwrap();
    assert!(fake.seen()[0].if_none_match.is_some());
    assert_eq!(fake.seen()[0].query[1], ("sort".to_string(), "\\CPU".to_string()));
}

#[tokio::test]
async fn test_cloudant_search_always_refetches() {
    let (fake, db) = setup();
    fake.set_view(
        "_design/search/_search/by_text",
        json!({"total_rows": 0, "bookmark": "g1", "rows": []}),
    );
    let mut cached = CachedLuceneQuery::new(LuceneQuery::cloudant("search", "by_text").q("make:yugo"));

    cached.get_result(&db).await.unwrap();
    assert!(!cached.is_cached_and_valid(&db).await.unwrap());
    fake.clear_seen();

    let result = cached.get_result(&db).await.unwrap();
    assert_eq!(result.bookmark(), Some("g1"));
    assert!(fake.seen()[0].if_none_match.is_none());
}

#[tokio::test]
async fn test_search_without_q_fails_before_sending() {
    let (fake, db) = setup();
    let err = db
        .fetch(&LuceneQuery::couchdb_lucene("search", "by_text"))
        .await
        .unwrap_err();
    assert!(matches!(err, CouchError::QueryFailure { .. }));
    assert!(fake.seen().is_empty());
}
