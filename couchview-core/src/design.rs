//! Design documents: named views, lists, shows and full-text indexes.

use crate::document::{
    read_id_and_rev, write_id_and_rev, CouchDocument, FromCouchJson, ToCouchJson,
};
use crate::error::{CouchError, CouchResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

pub const DESIGN_PREFIX: &str = "_design/";
pub const DEFAULT_LANGUAGE: &str = "javascript";

/// A couchdb-lucene index function that indexes every field of every
/// document, plus attachment text.
pub const INDEX_EVERYTHING: &str = r#"function(doc) {
  var ret = new Document();

  function idx(obj) {
    for (var key in obj) {
      switch (typeof obj[key]) {
      case 'object':
        idx(obj[key]);
        break;
      case 'function':
        break;
      default:
        ret.add(obj[key]);
        break;
      }
    }
  };

  idx(doc);

  if (doc._attachments) {
    for (var i in doc._attachments) {
      ret.attachment("attachment", i);
    }
  }
  return ret;
}"#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewDefinition {
    pub map: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reduce: Option<String>,
}

impl ViewDefinition {
    pub fn new(map: impl Into<String>) -> Self {
        Self {
            map: map.into(),
            reduce: None,
        }
    }

    pub fn with_reduce(map: impl Into<String>, reduce: impl Into<String>) -> Self {
        Self {
            map: map.into(),
            reduce: Some(reduce.into()),
        }
    }
}

/// A list function; stored as a bare string in the design document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListDefinition {
    pub function: String,
}

/// A show function; stored as a bare string in the design document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowDefinition {
    pub function: String,
}

/// A full-text index under the `fulltext` key (couchdb-lucene).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LuceneIndexDefinition {
    pub index: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<Value>,
}

impl LuceneIndexDefinition {
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            analyzer: None,
            defaults: None,
        }
    }
}

/// Which parts of a design document take part in a comparison.
///
/// Id, language and views (in order) are always compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComparisonScope {
    pub lists: bool,
    pub shows: bool,
    pub fulltext: bool,
}

impl ComparisonScope {
    /// Id, language and views only. Differences confined to lists, shows or
    /// full-text indexes are not detected.
    pub const VIEWS_ONLY: ComparisonScope = ComparisonScope {
        lists: false,
        shows: false,
        fulltext: false,
    };

    pub const ALL: ComparisonScope = ComparisonScope {
        lists: true,
        shows: true,
        fulltext: true,
    };
}

impl Default for ComparisonScope {
    fn default() -> Self {
        Self::VIEWS_ONLY
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DesignDocument {
    pub id: String,
    pub rev: Option<String>,
    pub language: String,
    pub views: IndexMap<String, ViewDefinition>,
    pub lists: IndexMap<String, ListDefinition>,
    pub shows: IndexMap<String, ShowDefinition>,
    pub fulltext: IndexMap<String, LuceneIndexDefinition>,
}

impl DesignDocument {
    /// New design document named `name`; its id is `_design/<name>`.
    pub fn new(name: &str) -> Self {
        Self::with_id(format!("{}{}", DESIGN_PREFIX, name))
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rev: None,
            language: DEFAULT_LANGUAGE.to_string(),
            views: IndexMap::new(),
            lists: IndexMap::new(),
            shows: IndexMap::new(),
            fulltext: IndexMap::new(),
        }
    }

    /// Name without the `_design/` prefix.
    pub fn name(&self) -> &str {
        self.id.strip_prefix(DESIGN_PREFIX).unwrap_or(&self.id)
    }

    /// Add (or replace) a view without a reduce function.
    pub fn add_view(&mut self, name: impl Into<String>, map: impl Into<String>) -> &mut Self {
        self.views.insert(name.into(), ViewDefinition::new(map));
        self
    }

    pub fn add_view_with_reduce(
        &mut self,
        name: impl Into<String>,
        map: impl Into<String>,
        reduce: impl Into<String>,
    ) -> &mut Self {
        self.views
            .insert(name.into(), ViewDefinition::with_reduce(map, reduce));
        self
    }

    pub fn view(&self, name: &str) -> Option<&ViewDefinition> {
        self.views.get(name)
    }

    /// Remove a view, keeping the order of the remaining ones.
    pub fn remove_view(&mut self, name: &str) -> Option<ViewDefinition> {
        self.views.shift_remove(name)
    }

    pub fn add_list(&mut self, name: impl Into<String>, function: impl Into<String>) -> &mut Self {
        self.lists.insert(
            name.into(),
            ListDefinition {
                function: function.into(),
            },
        );
        self
    }

    pub fn add_show(&mut self, name: impl Into<String>, function: impl Into<String>) -> &mut Self {
        self.shows.insert(
            name.into(),
            ShowDefinition {
                function: function.into(),
            },
        );
        self
    }

    pub fn add_lucene_view(
        &mut self,
        name: impl Into<String>,
        index: impl Into<String>,
    ) -> &mut Self {
        self.fulltext
            .insert(name.into(), LuceneIndexDefinition::new(index));
        self
    }

    /// Add a full-text index that indexes everything, see [`INDEX_EVERYTHING`].
    pub fn add_lucene_view_index_everything(&mut self, name: impl Into<String>) -> &mut Self {
        self.add_lucene_view(name, INDEX_EVERYTHING)
    }

    pub fn remove_lucene_view(&mut self, name: &str) -> Option<LuceneIndexDefinition> {
        self.fulltext.shift_remove(name)
    }

    /// Compare with another copy within `scope`. Revisions never take part.
    pub fn matches(&self, other: &DesignDocument, scope: ComparisonScope) -> bool {
        self.id == other.id
            && self.language == other.language
            && self.views.iter().eq(other.views.iter())
            && (!scope.lists || self.lists.iter().eq(other.lists.iter()))
            && (!scope.shows || self.shows.iter().eq(other.shows.iter()))
            && (!scope.fulltext || self.fulltext.iter().eq(other.fulltext.iter()))
    }
}

impl ToCouchJson for DesignDocument {
    fn write_json(&self, fields: &mut Map<String, Value>) -> CouchResult<()> {
        write_id_and_rev(Some(&self.id), self.rev.as_deref(), fields);
        fields.insert("language".to_string(), Value::String(self.language.clone()));
        fields.insert("views".to_string(), serde_json::to_value(&self.views)?);

        let lists = self
            .lists
            .iter()
            .map(|(name, def)| (name.clone(), Value::String(def.function.clone())))
            .collect();
        fields.insert("lists".to_string(), Value::Object(lists));

        let shows = self
            .shows
            .iter()
            .map(|(name, def)| (name.clone(), Value::String(def.function.clone())))
            .collect();
        fields.insert("shows".to_string(), Value::Object(shows));

        if !self.fulltext.is_empty() {
            fields.insert("fulltext".to_string(), serde_json::to_value(&self.fulltext)?);
        }
        Ok(())
    }
}

impl FromCouchJson for DesignDocument {
    fn read_json(obj: &Map<String, Value>) -> CouchResult<Self> {
        let (id, rev) = read_id_and_rev(obj);
        let id = id.ok_or_else(|| CouchError::encoding("design document has no _id"))?;
        let mut doc = DesignDocument::with_id(id);
        doc.rev = rev;
        if let Some(language) = obj.get("language").and_then(Value::as_str) {
            doc.language = language.to_string();
        }

        if let Some(views) = obj.get("views").and_then(Value::as_object) {
            for (name, def) in views {
                let def: ViewDefinition = serde_json::from_value(def.clone()).map_err(|e| {
                    CouchError::encoding_with(format!("invalid view definition '{}'", name), e)
                })?;
                doc.views.insert(name.clone(), def);
            }
        }

        for (name, function) in string_entries(obj, "lists") {
            doc.lists.insert(name, ListDefinition { function });
        }
        for (name, function) in string_entries(obj, "shows") {
            doc.shows.insert(name, ShowDefinition { function });
        }

        if let Some(fulltext) = obj.get("fulltext").and_then(Value::as_object) {
            for (name, def) in fulltext {
                let def: LuceneIndexDefinition =
                    serde_json::from_value(def.clone()).map_err(|e| {
                        CouchError::encoding_with(format!("invalid fulltext index '{}'", name), e)
                    })?;
                doc.fulltext.insert(name.clone(), def);
            }
        }
        Ok(doc)
    }
}

/// Entries of a `name -> function source` object. Non-string entries are
/// skipped.
fn string_entries(obj: &Map<String, Value>, field: &str) -> Vec<(String, String)> {
    let Some(entries) = obj.get(field).and_then(Value::as_object) else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|(name, value)| match value.as_str() {
            Some(function) => Some((name.clone(), function.to_string())),
            None => {
                warn!(field, name = %name, "skipping non-string design document entry");
                None
            }
        })
        .collect()
}

impl CouchDocument for DesignDocument {
    fn id(&self) -> Option<&str> {
        Some(&self.id)
    }

    fn rev(&self) -> Option<&str> {
        self.rev.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn set_rev(&mut self, rev: String) {
        self.rev = Some(rev);
    }
}
