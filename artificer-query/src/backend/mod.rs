//! Realization of a [`ConstraintTree`] for a concrete store.

pub mod hierarchical;
pub mod relational;

use crate::coerce::Value;
use crate::error::Result;
use crate::model::{
    Constraint, ConstraintTree, JoinCondition, JoinKind, Operand, Operator, Ordering, Selector,
    SourceRef, Subquery,
};

pub use hierarchical::{HierarchicalBuilder, Sql2Query};
pub use relational::{RelationalBuilder, SqlQuery};

/// Factory for one backend's query objects.
///
/// Every method may refuse with [`crate::Error::BackendCapabilityGap`] when the
/// store cannot express the requested shape.
pub trait QueryBuilder {
    type Source;
    type Constraint;
    type Query;

    /// Short backend name used in logs and error messages.
    fn name(&self) -> &'static str;

    fn selector(&mut self, selector: &Selector) -> Result<Self::Source>;

    fn join(
        &mut self,
        left: Self::Source,
        right: Self::Source,
        kind: JoinKind,
        condition: &JoinCondition,
    ) -> Result<Self::Source>;

    fn comparison(&mut self, operand: &Operand, operator: Operator, value: &Value) -> Result<Self::Constraint>;

    fn property_existence(&mut self, operand: &Operand) -> Result<Self::Constraint>;

    fn in_list(&mut self, operand: &Operand, values: &[Value]) -> Result<Self::Constraint>;

    /// Correlated existence test; the builder realizes the subquery itself.
    fn exists(&mut self, subquery: &Subquery) -> Result<Self::Constraint>;

    fn descendant(&mut self, selector: &Selector, ancestor_path: &str) -> Result<Self::Constraint>;

    fn not(&mut self, inner: Self::Constraint) -> Result<Self::Constraint>;

    fn and(&mut self, left: Self::Constraint, right: Self::Constraint) -> Result<Self::Constraint>;

    fn or(&mut self, left: Self::Constraint, right: Self::Constraint) -> Result<Self::Constraint>;

    fn build(
        &mut self,
        source: Self::Source,
        constraint: Option<Self::Constraint>,
        column: &Selector,
        ordering: Option<&Ordering>,
    ) -> Result<Self::Query>;
}

/// Walks `tree` bottom-up and hands every node to `builder`.
pub fn realize<B: QueryBuilder + ?Sized>(tree: &ConstraintTree, builder: &mut B) -> Result<B::Query> {
    let source = realize_source(&tree.source, builder)?;
    let constraint = tree
        .constraint
        .as_ref()
        .map(|c| realize_constraint(c, builder))
        .transpose()?;
    builder.build(source, constraint, &tree.column, tree.ordering.as_ref())
}

pub fn realize_source<B: QueryBuilder + ?Sized>(source: &SourceRef, builder: &mut B) -> Result<B::Source> {
    match source {
        SourceRef::Selector(selector) => builder.selector(selector),
        SourceRef::Join {
            left,
            right,
            kind,
            condition,
        } => {
            let left = realize_source(left, builder)?;
            let right = builder.selector(right)?;
            builder.join(left, right, *kind, condition)
        }
    }
}

pub fn realize_constraint<B: QueryBuilder + ?Sized>(
    constraint: &Constraint,
    builder: &mut B,
) -> Result<B::Constraint> {
    match constraint {
        Constraint::And(l, r) => {
            let l = realize_constraint(l, builder)?;
            let r = realize_constraint(r, builder)?;
            builder.and(l, r)
        }
        Constraint::Or(l, r) => {
            let l = realize_constraint(l, builder)?;
            let r = realize_constraint(r, builder)?;
            builder.or(l, r)
        }
        Constraint::Not(inner) => {
            let inner = realize_constraint(inner, builder)?;
            builder.not(inner)
        }
        Constraint::Comparison {
            operand,
            operator,
            value,
        } => builder.comparison(operand, *operator, value),
        Constraint::Exists(operand) => builder.property_existence(operand),
        Constraint::In { operand, values } => builder.in_list(operand, values),
        Constraint::Descendant {
            selector,
            ancestor_path,
        } => builder.descendant(selector, ancestor_path),
        Constraint::ExistsSubquery(subquery) => builder.exists(subquery),
    }
}
