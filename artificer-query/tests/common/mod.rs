#![allow(dead_code)]

use artificer_api::{
    ArtifactId, ArtifactTypeCatalog, ArtifactTypeInfo, ClassificationResolver, ClassificationUri,
    FullTextIndex, ResolveError, SearchError, builtin_type,
};
use artificer_query::Collaborators;

pub struct FakeCatalog;

impl ArtifactTypeCatalog for FakeCatalog {
    fn resolve(&self, type_name: &str) -> ArtifactTypeInfo {
        builtin_type(type_name).unwrap_or_else(ArtifactTypeInfo::extended)
    }
}

pub struct FakeRegions;

impl ClassificationResolver for FakeRegions {
    fn resolve(&self, term: &str) -> Result<ClassificationUri, ResolveError> {
        match term {
            "China" | "Japan" | "Asia" => Ok(ClassificationUri::new(format!("urn:regions#{term}"))),
            other => Err(ResolveError::Unknown(other.to_string())),
        }
    }
}

/// Returns a fixed id list for every search.
pub struct FakeIndex(pub Vec<ArtifactId>);

impl FullTextIndex for FakeIndex {
    fn search(&self, _pattern: &str, _fields: &[String]) -> Result<Vec<ArtifactId>, SearchError> {
        Ok(self.0.clone())
    }
}

pub static CATALOG: FakeCatalog = FakeCatalog;
pub static REGIONS: FakeRegions = FakeRegions;

pub fn collaborators(index: &FakeIndex) -> Collaborators<'_> {
    Collaborators {
        classifications: &REGIONS,
        catalog: &CATALOG,
        full_text: index,
    }
}
