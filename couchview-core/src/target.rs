use crate::design::DESIGN_PREFIX;
use std::fmt;

/// What a query runs against, relative to a database.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryTarget {
    /// `_design/<design>/_view/<view>`
    View { design: String, view: String },
    /// `_all_docs`
    AllDocuments,
    /// `_design/<design>/_list/<list>/<view>`
    List {
        design: String,
        list: String,
        view: String,
    },
    /// `_design/<design>/_show/<show>/<doc_id>`
    Show {
        design: String,
        show: String,
        doc_id: String,
    },
    /// couchdb-lucene: `_fti/_design/<design>/<index>`
    Lucene { design: String, index: String },
    /// Cloudant search: `_design/<design>/_search/<index>`
    CloudantSearch { design: String, index: String },
}

impl QueryTarget {
    pub fn view(design: impl Into<String>, view: impl Into<String>) -> Self {
        QueryTarget::View {
            design: strip_design_prefix(design.into()),
            view: view.into(),
        }
    }

    pub fn list(
        design: impl Into<String>,
        list: impl Into<String>,
        view: impl Into<String>,
    ) -> Self {
        QueryTarget::List {
            design: strip_design_prefix(design.into()),
            list: list.into(),
            view: view.into(),
        }
    }

    pub fn show(
        design: impl Into<String>,
        show: impl Into<String>,
        doc_id: impl Into<String>,
    ) -> Self {
        QueryTarget::Show {
            design: strip_design_prefix(design.into()),
            show: show.into(),
            doc_id: doc_id.into(),
        }
    }

    pub fn lucene(design: impl Into<String>, index: impl Into<String>) -> Self {
        QueryTarget::Lucene {
            design: strip_design_prefix(design.into()),
            index: index.into(),
        }
    }

    pub fn cloudant_search(design: impl Into<String>, index: impl Into<String>) -> Self {
        QueryTarget::CloudantSearch {
            design: strip_design_prefix(design.into()),
            index: index.into(),
        }
    }

    /// Path segments below the database, unescaped.
    pub fn segments(&self) -> Vec<&str> {
        match self {
            QueryTarget::View { design, view } => {
                vec!["_design", design.as_str(), "_view", view.as_str()]
            }
            QueryTarget::AllDocuments => vec!["_all_docs"],
            QueryTarget::List { design, list, view } => vec![
                "_design",
                design.as_str(),
                "_list",
                list.as_str(),
                view.as_str(),
            ],
            QueryTarget::Show {
                design,
                show,
                doc_id,
            } => vec![
                "_design",
                design.as_str(),
                "_show",
                show.as_str(),
                doc_id.as_str(),
            ],
            QueryTarget::Lucene { design, index } => {
                vec!["_fti", "_design", design.as_str(), index.as_str()]
            }
            QueryTarget::CloudantSearch { design, index } => {
                vec!["_design", design.as_str(), "_search", index.as_str()]
            }
        }
    }

    /// Path below the database, segments joined with `/`.
    pub fn path(&self) -> String {
        self.segments().join("/")
    }
}

impl fmt::Display for QueryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

fn strip_design_prefix(design: String) -> String {
    match design.strip_prefix(DESIGN_PREFIX) {
        Some(name) => name.to_string(),
        None => design,
    }
}
