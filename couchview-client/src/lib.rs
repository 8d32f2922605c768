// couchview client
// CouchDB view access on top of couchview-core and a CouchTransport:
// - ETag-validated cached queries
// - couchdb-lucene and Cloudant full-text search
// - list and show functions
// - design document synchronization

#[macro_use]
mod macros;

pub mod cache;
pub mod config;
pub mod database;
pub mod design;
pub mod lucene;
pub mod query;

pub use cache::CachedQuery;
pub use config::ServerConfig;
pub use database::CouchDatabase;
pub use design::{DesignDocSynchronizer, SynchOutcome};
pub use lucene::{CachedLuceneQuery, LuceneQuery};
pub use query::{QueryOutcome, QueryRequest, ViewQuery};
