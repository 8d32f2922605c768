// couchview core
// Network-free building blocks for querying CouchDB views:
// - key encoding and view query options
// - bulk key / bulk document payloads
// - document capabilities and design documents
// - view results and typed row materialization

pub mod bulk;
pub mod design;
pub mod document;
pub mod encoding;
pub mod error;
pub mod lucene;
pub mod materialize;
pub mod options;
pub mod result;
pub mod target;

pub use bulk::{BulkDocuments, BulkKey, BulkKeys};
pub use design::{
    ComparisonScope, DesignDocument, ListDefinition, LuceneIndexDefinition, ShowDefinition,
    ViewDefinition,
};
pub use document::{CouchDocument, FromCouchJson, JsonDocument, RowDocument, ToCouchJson};
pub use encoding::{encode_compound_key, encode_key, try_encode_key};
pub use error::{CouchError, CouchResult};
pub use lucene::{LuceneOptions, SearchFlavour, SortCriteria, SortOrder};
pub use materialize::{ArbitraryDecoder, GenericViewResult, RowField};
pub use options::QueryOptions;
pub use result::{LuceneResult, QueryResult, ViewResult, ViewRows};
pub use target::QueryTarget;
