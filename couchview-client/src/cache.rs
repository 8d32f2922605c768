use crate::database::CouchDatabase;
use crate::query::{QueryOutcome, QueryRequest, ViewQuery};
use couchview_core::{CouchError, CouchResult, QueryResult};
use couchview_transport::CouchTransport;
use tracing::debug;

/// A query plus its last result, revalidated by ETag.
///
/// Uncached until the first [`get_result`](Self::get_result). Afterwards
/// the stored result is only replaced when the server reports a change;
/// [`clear`](Self::clear) drops it.
#[derive(Debug, Clone)]
pub struct CachedQuery<Q: QueryRequest = ViewQuery> {
    query: Q,
    result: Option<Q::Output>,
}

impl<Q: QueryRequest> CachedQuery<Q> {
    pub fn new(query: Q) -> Self {
        Self {
            query,
            result: None,
        }
    }

    pub fn query(&self) -> &Q {
        &self.query
    }

    /// Swap the query. The cached result belongs to the old one and is
    /// dropped.
    pub fn set_query(&mut self, query: Q) {
        self.query = query;
        self.result = None;
    }

    pub fn result(&self) -> Option<&Q::Output> {
        self.result.as_ref()
    }

    pub fn etag(&self) -> Option<&str> {
        self.result.as_ref().and_then(QueryResult::etag)
    }

    pub fn is_cached(&self) -> bool {
        self.result.is_some()
    }

    pub fn clear(&mut self) {
        self.result = None;
    }

    fn revalidation_tag(&self) -> Option<String> {
        if !self.query.supports_etag() {
            return None;
        }
        self.etag().map(str::to_string)
    }

    /// True only when a cached result exists and a conditional request with
    /// its ETag answers 304. That request is HEAD, or the query's own POST
    /// when it carries keys. Never touches the cached result.
    pub async fn is_cached_and_valid<T: CouchTransport>(
        &self,
        db: &CouchDatabase<T>,
    ) -> CouchResult<bool> {
        match self.revalidation_tag() {
            Some(etag) => db.probe(&self.query, &etag).await,
            None => Ok(false),
        }
    }

    /// The current result, fetching or revalidating as needed.
    pub async fn get_result<T: CouchTransport>(
        &mut self,
        db: &CouchDatabase<T>,
    ) -> CouchResult<&Q::Output> {
        let fresh = match self.revalidation_tag() {
            None => Some(db.fetch(&self.query).await?),
            Some(etag) if self.query.uses_head_probe() => {
                if db.probe(&self.query, &etag).await? {
                    debug!("Cached result still valid (HEAD)");
                    None
                } else {
                    Some(db.fetch(&self.query).await?)
                }
            }
            Some(etag) => match db.execute(&self.query, Some(&etag)).await? {
                QueryOutcome::NotModified => {
                    debug!("Cached result still valid (304)");
                    None
                }
                QueryOutcome::Fetched(result) => Some(result),
            },
        };
        if let Some(result) = fresh {
            self.result = Some(result);
        }
        self.result
            .as_ref()
            .ok_or_else(|| CouchError::query_failure("no result after revalidation"))
    }
}
