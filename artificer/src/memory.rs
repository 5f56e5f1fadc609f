//! In-memory collaborators.
//!
//! Good enough for tests, demos and small embedded deployments; a real
//! repository plugs in its ontology store and search index instead.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use artificer_api::{
    ArtifactId, ArtifactTypeCatalog, ArtifactTypeInfo, ClassificationResolver, ClassificationUri,
    FullTextIndex, ResolveError, SearchError, builtin_type,
};
use regex::Regex;
use tracing::trace;

/// Catalog backed by the fixed S-RAMP type table.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTypeCatalog;

impl ArtifactTypeCatalog for BuiltinTypeCatalog {
    fn resolve(&self, type_name: &str) -> ArtifactTypeInfo {
        builtin_type(type_name).unwrap_or_else(ArtifactTypeInfo::extended)
    }
}

/// One classification scheme. Class URIs are `{base}#{id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ontology {
    base: String,
    parents: BTreeMap<String, Option<String>>,
}

impl Ontology {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            parents: BTreeMap::new(),
        }
    }

    /// Adds class `id` beneath `parent` (or as a root class).
    pub fn with_class(mut self, id: impl Into<String>, parent: Option<&str>) -> Self {
        self.parents.insert(id.into(), parent.map(str::to_string));
        self
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn uri(&self, id: &str) -> ClassificationUri {
        ClassificationUri::new(format!("{}#{id}", self.base))
    }

    fn contains(&self, id: &str) -> bool {
        self.parents.contains_key(id)
    }
}

/// Resolves terms against a set of ontologies.
///
/// Accepted spellings: the full class URI, `#id`, or a bare `id`. A bare or
/// fragment term found in more than one ontology is ambiguous.
#[derive(Debug, Default)]
pub struct MemoryClassifications {
    ontologies: Vec<Ontology>,
}

impl MemoryClassifications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ontology(mut self, ontology: Ontology) -> Self {
        self.ontologies.push(ontology);
        self
    }

    fn locate(&self, term: &str) -> Result<(&Ontology, String), ResolveError> {
        if let Some((base, id)) = term.rsplit_once('#')
            && !base.is_empty()
        {
            return self
                .ontologies
                .iter()
                .find(|o| o.base == base && o.contains(id))
                .map(|o| (o, id.to_string()))
                .ok_or_else(|| ResolveError::Unknown(term.to_string()));
        }

        let id = term.strip_prefix('#').unwrap_or(term);
        let found: Vec<&Ontology> = self.ontologies.iter().filter(|o| o.contains(id)).collect();
        match found.as_slice() {
            [] => Err(ResolveError::Unknown(term.to_string())),
            [only] => Ok((*only, id.to_string())),
            many => Err(ResolveError::Ambiguous {
                term: term.to_string(),
                candidates: many.iter().map(|o| o.uri(id)).collect(),
            }),
        }
    }

    /// The class named by `term` plus every ancestor class.
    ///
    /// This is the set stored as an artifact's normalized classifications.
    pub fn normalize(&self, term: &str) -> Result<BTreeSet<ClassificationUri>, ResolveError> {
        let (ontology, mut id) = self.locate(term)?;
        let mut out = BTreeSet::new();
        loop {
            if !out.insert(ontology.uri(&id)) {
                // cycle in the parent chain
                break;
            }
            match ontology.parents.get(&id).cloned().flatten() {
                Some(parent) => id = parent,
                None => break,
            }
        }
        Ok(out)
    }
}

impl ClassificationResolver for MemoryClassifications {
    fn resolve(&self, term: &str) -> Result<ClassificationUri, ResolveError> {
        let (ontology, id) = self.locate(term)?;
        Ok(ontology.uri(&id))
    }
}

/// Searchable text per artifact, keyed by field name.
#[derive(Debug, Default)]
pub struct MemoryFullTextIndex {
    docs: RwLock<Vec<(ArtifactId, BTreeMap<String, String>)>>,
}

impl MemoryFullTextIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) `field` of artifact `id`.
    pub fn index(&self, id: impl Into<ArtifactId>, field: impl Into<String>, text: impl Into<String>) {
        let id = id.into();
        let mut docs = self.docs.write().unwrap_or_else(|e| e.into_inner());
        let pos = match docs.iter().position(|(doc, _)| *doc == id) {
            Some(pos) => pos,
            None => {
                docs.push((id, BTreeMap::new()));
                docs.len() - 1
            }
        };
        let field = field.into();
        trace!(id = %docs[pos].0, field = %field, "memory full-text index");
        docs[pos].1.insert(field, text.into());
    }
}

/// Compiles a full-text pattern: `.*` is the only wildcard, the match is
/// anchored at both ends and case-insensitive.
fn pattern_regex(pattern: &str) -> Result<Regex, SearchError> {
    let body = pattern
        .split(".*")
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("(?is)^{body}$")).map_err(|e| SearchError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

impl FullTextIndex for MemoryFullTextIndex {
    fn search(&self, pattern: &str, fields: &[String]) -> Result<Vec<ArtifactId>, SearchError> {
        if pattern.trim().is_empty() {
            return Err(SearchError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: "empty pattern".into(),
            });
        }
        let regex = pattern_regex(pattern)?;

        let docs = self.docs.read().unwrap_or_else(|e| e.into_inner());
        let hits: Vec<ArtifactId> = docs
            .iter()
            .filter(|(_, doc)| {
                doc.iter()
                    .filter(|(field, _)| fields.is_empty() || fields.contains(field))
                    .any(|(_, text)| regex.is_match(text))
            })
            .map(|(id, _)| id.clone())
            .collect();
        trace!(pattern, hits = hits.len(), "memory full-text search");
        Ok(hits)
    }
}
