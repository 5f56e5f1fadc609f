//! # Artificer
//!
//! Compiles S-RAMP artifact queries (the XPath-like `/s-ramp/xsd/XsdDocument[@name = 'foo']`
//! language) into queries a store can run.
//!
//! The query is handed in as an AST; the compiler walks it once, asks the
//! collaborators about classifications, artifact types and full-text hits,
//! and produces a backend-agnostic [`ConstraintTree`]. A [`query::QueryBuilder`]
//! then realizes the tree: [`RelationalBuilder`] emits parameterized SQL,
//! [`HierarchicalBuilder`] emits JCR-SQL2 for a content repository.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use artificer::query::ast::{Expr, LocationPath, Query};
//! use artificer::{Config, MemoryClassifications, MemoryFullTextIndex, QueryEngine, Result};
//!
//! fn main() -> Result<()> {
//!     let engine = QueryEngine::new(
//!         Arc::new(MemoryClassifications::new()),
//!         Arc::new(MemoryFullTextIndex::new()),
//!         Config::load_or_default("artificer.json")?,
//!     );
//!
//!     let query = Query::new(LocationPath::typed("xsd", "XsdDocument"))
//!         .with_predicate(Expr::equals("name", "foo"));
//!     let sql = engine.compile_relational(&query, None)?;
//!     println!("{} {:?}", sql.sql, sql.params);
//!     Ok(())
//! }
//! ```
//!
//! ## Core Concepts
//!
//! - **[`QueryEngine`]**: owns the collaborators and configuration. Cheap to share
//!   across threads; every compile is independent.
//! - **Collaborators** ([`api`]): classification resolution, full-text search and
//!   the artifact type catalog. [`memory`] has in-process implementations.
//! - **[`query`]**: the compiler and both backends (re-exported from `artificer-query`).

mod config;
mod error;
pub mod memory;

use std::sync::Arc;

use artificer_api::{ArtifactTypeCatalog, ClassificationResolver, FullTextIndex};
use artificer_query::ast::Query;
use artificer_query::{Collaborators, PreparedQuery, QueryCompiler};
use tracing::debug;

pub use artificer_api as api;
pub use artificer_query as query;
pub use artificer_query::{
    ConstraintTree, HierarchicalBuilder, OrderBy, RelationalBuilder, Sql2Query, SqlQuery,
};
pub use config::Config;
pub use error::{Error, Result};
pub use memory::{BuiltinTypeCatalog, MemoryClassifications, MemoryFullTextIndex, Ontology};

/// Entry point for compiling queries.
///
/// # Example
///
/// ```ignore
/// let engine = QueryEngine::new(classifications, index, Config::default());
/// let sql2 = engine.compile_hierarchical(&query, Some(&OrderBy::ascending("name")))?;
/// ```
#[derive(Clone)]
pub struct QueryEngine {
    classifications: Arc<dyn ClassificationResolver>,
    catalog: Arc<dyn ArtifactTypeCatalog>,
    full_text: Arc<dyn FullTextIndex>,
    config: Config,
}

impl std::fmt::Debug for QueryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl QueryEngine {
    /// Creates an engine using the built-in artifact type table.
    pub fn new(
        classifications: Arc<dyn ClassificationResolver>,
        full_text: Arc<dyn FullTextIndex>,
        config: Config,
    ) -> Self {
        Self {
            classifications,
            catalog: Arc::new(BuiltinTypeCatalog),
            full_text,
            config,
        }
    }

    /// Replaces the artifact type catalog.
    pub fn with_catalog(mut self, catalog: Arc<dyn ArtifactTypeCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn collaborators(&self) -> Collaborators<'_> {
        Collaborators {
            classifications: self.classifications.as_ref(),
            catalog: self.catalog.as_ref(),
            full_text: self.full_text.as_ref(),
        }
    }

    /// Compiles `query` into a backend-agnostic tree.
    pub fn compile_tree(&self, query: &Query, order_by: Option<&OrderBy>) -> Result<ConstraintTree> {
        let collaborators = self.collaborators();
        let compiler = QueryCompiler::new(&collaborators, &self.config.compiler);
        Ok(compiler.compile_tree(query, order_by)?)
    }

    /// Compiles once so the tree can be realized by several backends.
    pub fn prepare(&self, query: &Query, order_by: Option<&OrderBy>) -> Result<PreparedQuery> {
        Ok(artificer_query::prepare(
            query,
            &self.collaborators(),
            &self.config.compiler,
            order_by,
        )?)
    }

    /// Compiles `query` to parameterized SQL.
    pub fn compile_relational(&self, query: &Query, order_by: Option<&OrderBy>) -> Result<SqlQuery> {
        let mut builder = RelationalBuilder::with_artifact_root(&self.config.compiler.artifact_root_path);
        let sql = self.prepare(query, order_by)?.realize(&mut builder)?;
        debug!(sql = %sql.sql, params = sql.params.len(), "relational query");
        Ok(sql)
    }

    /// Compiles `query` to JCR-SQL2.
    pub fn compile_hierarchical(&self, query: &Query, order_by: Option<&OrderBy>) -> Result<Sql2Query> {
        let sql2 = self.prepare(query, order_by)?.realize(&mut HierarchicalBuilder::new())?;
        debug!(statement = %sql2.statement, "hierarchical query");
        Ok(sql2)
    }

    /// Indented plan text of the compiled tree.
    pub fn explain(&self, query: &Query) -> Result<String> {
        Ok(self.prepare(query, None)?.explain())
    }
}
