//! Full-text search options for couchdb-lucene and Cloudant search indexes.

use crate::error::{CouchError, CouchResult};
use crate::options::QueryOptions;

pub mod names {
    pub const Q: &str = "q";
    pub const INCLUDE_DOCS: &str = "include_docs";
    pub const SKIP: &str = "skip";
    pub const LIMIT: &str = "limit";
    pub const SORT: &str = "sort";
    pub const DESCENDING: &str = "descending";
    pub const ANALYZER: &str = "analyzer";
    pub const CALLBACK: &str = "callback";
    pub const DEBUG: &str = "debug";
    pub const FORCE_JSON: &str = "force_json";
    pub const REWRITE: &str = "rewrite";
    pub const STALE: &str = "stale";
    pub const INDEX: &str = "index";
    pub const DEFAULT_OR: &str = "default_or";
    pub const DEFAULT_FIELD: &str = "default_field";
}

/// Which search service serves the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchFlavour {
    CouchdbLucene,
    Cloudant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Sort criterion for a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortCriteria {
    pub field: String,
    pub order: SortOrder,
}

impl SortCriteria {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Ascending,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Descending,
        }
    }
}

/// couchdb-lucene sort string: `/field` ascending, `\field` descending,
/// comma separated.
pub fn lucene_sort(criteria: &[SortCriteria]) -> Option<String> {
    if criteria.is_empty() {
        return None;
    }
    let parts: Vec<String> = criteria
        .iter()
        .map(|c| {
            let prefix = match c.order {
                SortOrder::Ascending => '/',
                SortOrder::Descending => '\\',
            };
            format!("{}{}", prefix, c.field)
        })
        .collect();
    Some(parts.join(","))
}

/// Search options. Built on [`QueryOptions`]; the flavour decides how sort
/// criteria are encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LuceneOptions {
    flavour: SearchFlavour,
    options: QueryOptions,
}

impl LuceneOptions {
    pub fn new(flavour: SearchFlavour) -> Self {
        Self {
            flavour,
            options: QueryOptions::new(),
        }
    }

    pub fn flavour(&self) -> SearchFlavour {
        self.flavour
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    pub fn clear(&mut self) {
        self.options.clear();
    }

    fn set(mut self, name: &str, value: impl Into<String>) -> Self {
        self.options.insert(name, value);
        self
    }

    /// The query to run (e.g. `subject:hello`).
    pub fn q(self, query: impl Into<String>) -> Self {
        self.set(names::Q, query)
    }

    pub fn include_documents(self) -> Self {
        self.set(names::INCLUDE_DOCS, "true")
    }

    pub fn skip(self, value: u64) -> Self {
        self.set(names::SKIP, value.to_string())
    }

    pub fn limit(self, value: u64) -> Self {
        self.set(names::LIMIT, value.to_string())
    }

    pub fn analyzer(self, value: impl Into<String>) -> Self {
        self.set(names::ANALYZER, value)
    }

    /// JSONP callback wrapper.
    pub fn callback(self, value: impl Into<String>) -> Self {
        self.set(names::CALLBACK, value)
    }

    /// Disables server response caching and indents the response.
    pub fn debug(self) -> Self {
        self.set(names::DEBUG, "true")
    }

    pub fn force_json(self) -> Self {
        self.set(names::FORCE_JSON, "true")
    }

    pub fn rewrite(self) -> Self {
        self.set(names::REWRITE, "true")
    }

    pub fn stale(self) -> Self {
        self.set(names::STALE, "ok")
    }

    /// Cloudant: custom indexer.
    pub fn index(self, index: impl Into<String>) -> Self {
        self.set(names::INDEX, index)
    }

    /// Cloudant: OR between terms instead of AND.
    pub fn default_or(self) -> Self {
        self.set(names::DEFAULT_OR, "true")
    }

    /// Cloudant: field searched when a term names none.
    pub fn default_field(self, field: impl Into<String>) -> Self {
        self.set(names::DEFAULT_FIELD, field)
    }

    /// Apply sort criteria. An empty slice leaves the options untouched.
    /// Cloudant supports a single field only.
    pub fn sort(self, criteria: &[SortCriteria]) -> CouchResult<Self> {
        match self.flavour {
            SearchFlavour::CouchdbLucene => Ok(match lucene_sort(criteria) {
                Some(sort) => self.set(names::SORT, sort),
                None => self,
            }),
            SearchFlavour::Cloudant => match criteria {
                [] => Ok(self),
                [only] => {
                    let opts = self.set(names::SORT, only.field.clone());
                    Ok(match only.order {
                        SortOrder::Descending => opts.set(names::DESCENDING, "true"),
                        SortOrder::Ascending => opts,
                    })
                }
                _ => Err(CouchError::query_failure(
                    "Cloudant search does not support sorting over multiple fields",
                )),
            },
        }
    }

    pub fn has_query(&self) -> bool {
        self.options.contains(names::Q)
    }
}
