use crate::ast::Query;
use crate::backend::{QueryBuilder, realize};
use crate::compiler::{Collaborators, OrderBy, QueryCompiler};
use crate::config::CompilerConfig;
use crate::error::Result;
use crate::model::ConstraintTree;

/// A compiled query, ready to be realized by any backend.
///
/// Created by [`prepare()`]. The walk over the AST (and every call to the
/// classification resolver and full-text index) happens once; realizing the
/// tree afterwards is pure.
///
/// # Example
///
/// ```ignore
/// let prepared = prepare(&query, &collaborators, &CompilerConfig::default(), None)?;
/// let sql = prepared.realize(&mut RelationalBuilder::new())?;
/// let sql2 = prepared.realize(&mut HierarchicalBuilder::new())?;
/// ```
#[derive(Debug, Clone)]
pub struct PreparedQuery {
    tree: ConstraintTree,
}

impl PreparedQuery {
    /// Realizes the compiled tree with `builder`.
    pub fn realize<B: QueryBuilder>(&self, builder: &mut B) -> Result<B::Query> {
        realize(&self.tree, builder)
    }

    /// Indented plan text of the compiled tree.
    pub fn explain(&self) -> String {
        self.tree.explain()
    }

    pub fn tree(&self) -> &ConstraintTree {
        &self.tree
    }

    pub fn into_tree(self) -> ConstraintTree {
        self.tree
    }
}

/// Compiles `query` without choosing a backend yet.
pub fn prepare(
    query: &Query,
    collaborators: &Collaborators<'_>,
    config: &CompilerConfig,
    order_by: Option<&OrderBy>,
) -> Result<PreparedQuery> {
    let tree = QueryCompiler::new(collaborators, config).compile_tree(query, order_by)?;
    Ok(PreparedQuery { tree })
}

/// Compiles `query` and realizes it with `builder` in one step.
pub fn compile<B: QueryBuilder>(
    query: &Query,
    collaborators: &Collaborators<'_>,
    config: &CompilerConfig,
    builder: &mut B,
    order_by: Option<&OrderBy>,
) -> Result<B::Query> {
    QueryCompiler::new(collaborators, config).compile(query, builder, order_by)
}
