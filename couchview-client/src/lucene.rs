use crate::cache::CachedQuery;
use crate::query::QueryRequest;
use couchview_core::{
    CouchError, CouchResult, LuceneOptions, LuceneResult, QueryTarget, SearchFlavour,
    SortCriteria,
};
use couchview_transport::CouchRequest;

/// Full-text query against a couchdb-lucene index or a Cloudant search
/// index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LuceneQuery {
    target: QueryTarget,
    options: LuceneOptions,
}

/// couchdb-lucene results cached by ETag. Cloudant queries always refetch.
pub type CachedLuceneQuery = CachedQuery<LuceneQuery>;

impl LuceneQuery {
    /// `_fti/_design/<design>/<index>`
    pub fn couchdb_lucene(design: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            target: QueryTarget::lucene(design, index),
            options: LuceneOptions::new(SearchFlavour::CouchdbLucene),
        }
    }

    /// `_design/<design>/_search/<index>`
    pub fn cloudant(design: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            target: QueryTarget::cloudant_search(design, index),
            options: LuceneOptions::new(SearchFlavour::Cloudant),
        }
    }

    pub fn target(&self) -> &QueryTarget {
        &self.target
    }

    pub fn flavour(&self) -> SearchFlavour {
        self.options.flavour()
    }

    pub fn options(&self) -> &LuceneOptions {
        &self.options
    }

    delegate_options! {
        q(query: impl Into<String>);
        include_documents();
        skip(value: u64);
        limit(value: u64);
        analyzer(value: impl Into<String>);
        callback(value: impl Into<String>);
        debug();
        force_json();
        rewrite();
        stale();
        index(index: impl Into<String>);
        default_or();
        default_field(field: impl Into<String>);
    }

    pub fn sort(mut self, criteria: &[SortCriteria]) -> CouchResult<Self> {
        self.options = self.options.sort(criteria)?;
        Ok(self)
    }

    pub fn clear_options(&mut self) {
        self.options.clear();
    }

    fn segments(&self, db: &str) -> CouchResult<Vec<String>> {
        if !self.options.has_query() {
            return Err(CouchError::query_failure(format!(
                "search on {} has no q parameter",
                self.target
            )));
        }
        Ok(std::iter::once(db)
            .chain(self.target.segments())
            .map(str::to_string)
            .collect())
    }
}

impl QueryRequest for LuceneQuery {
    type Output = LuceneResult;

    fn build_request(&self, db: &str) -> CouchResult<CouchRequest> {
        Ok(CouchRequest::get(self.segments(db)?).query(self.options.options().to_query_pairs()))
    }

    fn build_probe(&self, db: &str) -> CouchResult<CouchRequest> {
        Ok(CouchRequest::head(self.segments(db)?).query(self.options.options().to_query_pairs()))
    }

    fn supports_etag(&self) -> bool {
        self.flavour() == SearchFlavour::CouchdbLucene
    }
}
