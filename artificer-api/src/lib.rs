use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

mod catalog;

pub use catalog::{BUILTIN_ARTIFACT_TYPES, builtin_type};

/// Namespace URI of the S-RAMP vocabulary.
///
/// Functions and properties qualified with this namespace belong to the
/// repository's query language rather than to XPath.
pub const SRAMP_NS: &str = "http://docs.oasis-open.org/s-ramp/ns/s-ramp-v1.0";

/// Namespace URI of the standard XPath function library (`fn:`).
pub const XPATH_FUNCTIONS_NS: &str = "http://www.w3.org/2005/xpath-functions";

/// Model name used for every user-defined artifact type.
pub const EXTENDED_MODEL: &str = "ext";

/// Stable identifier of a stored artifact (its UUID in canonical text form).
pub type ArtifactId = String;

/// Fully qualified classification node, e.g.
/// `http://example.org/ontologies/regions.owl/China`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClassificationUri(pub String);

impl ClassificationUri {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClassificationUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Broad family an artifact type belongs to.
///
/// - Document: uploaded content (`XsdDocument`, `WsdlDocument`, ...)
/// - Derived: extracted from a document during indexing (`ElementDeclaration`, `Port`, ...)
/// - Logical: modelled without content (SOA and service implementation types)
/// - Extended: anything registered by users under the `ext` model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactKind {
    Document,
    Derived,
    Logical,
    Extended,
}

/// Answer of an [`ArtifactTypeCatalog`] lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactTypeInfo {
    /// Model the type lives in (`core`, `xsd`, `wsdl`, ..., `ext`).
    pub model: String,
    /// `true` when the type is one of the fixed S-RAMP types.
    pub builtin: bool,
    pub kind: ArtifactKind,
}

impl ArtifactTypeInfo {
    /// Info for a type name the catalog does not know.
    pub fn extended() -> Self {
        Self {
            model: EXTENDED_MODEL.to_string(),
            builtin: false,
            kind: ArtifactKind::Extended,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("unknown classification: {0}")]
    Unknown(String),
    #[error("ambiguous classification {term}: matches {candidates:?}")]
    Ambiguous {
        term: String,
        candidates: Vec<ClassificationUri>,
    },
    #[error("classification backend failure: {0}")]
    Backend(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("invalid full-text pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error("full-text index failure: {0}")]
    Backend(String),
}

/// Resolves user supplied classification terms into ontology URIs.
///
/// A term may be a full URI, a `#fragment` or a bare node id. What the
/// strings mean is entirely up to the implementation.
pub trait ClassificationResolver: Send + Sync {
    fn resolve(&self, term: &str) -> Result<ClassificationUri, ResolveError>;

    /// Resolves every term; fails on the first term that cannot be resolved.
    fn resolve_all(&self, terms: &[String]) -> Result<BTreeSet<ClassificationUri>, ResolveError> {
        terms.iter().map(|term| self.resolve(term)).collect()
    }
}

/// Synchronous full-text search over artifact content and metadata.
pub trait FullTextIndex: Send + Sync {
    /// Returns the ids of all artifacts where any of `fields` matches `pattern`.
    ///
    /// An empty `fields` slice means "every indexed field". Order of the
    /// returned ids is not significant, but it is preserved by the compiler.
    fn search(&self, pattern: &str, fields: &[String]) -> Result<Vec<ArtifactId>, SearchError>;
}

/// Classifies artifact type names.
///
/// Unknown names must come back as [`ArtifactTypeInfo::extended`] rather than
/// as an error: every unrecognised type is a user extension.
pub trait ArtifactTypeCatalog: Send + Sync {
    fn resolve(&self, type_name: &str) -> ArtifactTypeInfo;
}
