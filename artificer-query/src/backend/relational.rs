//! SQL realization over the relational artifact schema.
//!
//! Tables: `artifact`, `relationship`, `target`, `artifact_property`,
//! `relationship_attribute`, `target_attribute`, plus the two classifier
//! link tables. Literals are always bound as `?` parameters, in textual order.

use serde::{Deserialize, Serialize};

use super::{QueryBuilder, realize_constraint, realize_source};
use crate::coerce::Value;
use crate::error::{Error, Result};
use crate::model::{
    CoreProperty, JoinCondition, JoinKind, NodeKind, Operand, Operator, Ordering, Property,
    Selector, Subquery,
};

const BACKEND: &str = "relational";

/// A parameterized SQL statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BoolOp {
    And,
    Or,
}

/// A piece of SQL together with the parameters it binds.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    sql: String,
    params: Vec<Value>,
    op: Option<BoolOp>,
}

impl Fragment {
    fn atom(sql: String, params: Vec<Value>) -> Self {
        Self { sql, params, op: None }
    }

    /// SQL text, parenthesized when it is a boolean of a different kind than `outer`.
    fn nested_in(&self, outer: Option<BoolOp>) -> String {
        match self.op {
            Some(op) if Some(op) != outer => format!("({})", self.sql),
            _ => self.sql.clone(),
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }
}

#[derive(Debug, Clone)]
pub struct RelationalBuilder {
    artifact_root_path: String,
    classifiers: u32,
}

impl Default for RelationalBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RelationalBuilder {
    pub fn new() -> Self {
        Self::with_artifact_root("/s-ramp")
    }

    /// Builder whose trash filter recognizes `path` as the live artifact root.
    pub fn with_artifact_root(path: impl Into<String>) -> Self {
        Self {
            artifact_root_path: path.into(),
            classifiers: 0,
        }
    }

    fn combine(&mut self, op: BoolOp, left: Fragment, right: Fragment) -> Fragment {
        let keyword = match op {
            BoolOp::And => "AND",
            BoolOp::Or => "OR",
        };
        let sql = format!(
            "{} {keyword} {}",
            left.nested_in(Some(op)),
            right.nested_in(Some(op))
        );
        let mut params = left.params;
        params.extend(right.params);
        Fragment {
            sql,
            params,
            op: Some(op),
        }
    }
}

fn table(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Artifact => "artifact",
        NodeKind::Relationship => "relationship",
        NodeKind::Target => "target",
        NodeKind::PropertyEntry => "artifact_property",
        NodeKind::RelationshipAttribute => "relationship_attribute",
        NodeKind::TargetAttribute => "target_attribute",
    }
}

/// Foreign key on `child` that points at `parent`.
fn parent_key(child: NodeKind, parent: NodeKind) -> Option<&'static str> {
    Some(match (child, parent) {
        (NodeKind::Relationship, NodeKind::Artifact) => "owner_id",
        (NodeKind::Target, NodeKind::Relationship) => "relationship_id",
        (NodeKind::PropertyEntry, NodeKind::Artifact) => "artifact_id",
        (NodeKind::RelationshipAttribute, NodeKind::Relationship) => "relationship_id",
        (NodeKind::TargetAttribute, NodeKind::Target) => "target_id",
        (NodeKind::Artifact, NodeKind::Artifact) => "derived_from_id",
        _ => return None,
    })
}

fn core_column(property: CoreProperty) -> &'static str {
    match property {
        CoreProperty::CreatedBy => "created_by",
        CoreProperty::CreatedTimestamp => "created_timestamp",
        CoreProperty::LastModifiedBy => "last_modified_by",
        CoreProperty::LastModifiedTimestamp => "last_modified_timestamp",
        CoreProperty::Version => "version",
        CoreProperty::Uuid => "uuid",
        CoreProperty::Description => "description",
        CoreProperty::Name => "name",
        CoreProperty::ContentType => "content_type",
        CoreProperty::ContentSize => "content_size",
        CoreProperty::ContentHash => "content_hash",
        CoreProperty::ContentEncoding => "content_encoding",
        CoreProperty::ExtendedType => "extended_type",
        CoreProperty::Derived => "derived",
        CoreProperty::NcName => "nc_name",
        CoreProperty::Namespace => "namespace",
        CoreProperty::TargetNamespace => "target_namespace",
        CoreProperty::Style => "style",
        CoreProperty::Transport => "transport",
        CoreProperty::SoapLocation => "soap_location",
    }
}

fn column(operand: &Operand) -> Result<String> {
    let kind = operand.selector.kind;
    let name = match (kind, operand.property) {
        (_, Property::Id) => "id",
        (NodeKind::Artifact, Property::Core(p)) => core_column(p),
        (NodeKind::Artifact, Property::ArtifactType) => "artifact_type",
        (NodeKind::Artifact, Property::ArtifactModel) => "artifact_model",
        (NodeKind::Relationship, Property::RelationshipType) => "relationship_type",
        (NodeKind::Target, Property::TargetArtifact) => "target_artifact_id",
        (
            NodeKind::PropertyEntry | NodeKind::RelationshipAttribute | NodeKind::TargetAttribute,
            Property::EntryKey,
        ) => "entry_key",
        (
            NodeKind::PropertyEntry | NodeKind::RelationshipAttribute | NodeKind::TargetAttribute,
            Property::EntryValue,
        ) => "entry_value",
        (kind, property) => {
            return Err(Error::gap(
                BACKEND,
                format!("property {property} on a {kind:?} selector"),
            ));
        }
    };
    Ok(format!("{}.{name}", operand.selector.alias))
}

impl QueryBuilder for RelationalBuilder {
    type Source = Fragment;
    type Constraint = Fragment;
    type Query = SqlQuery;

    fn name(&self) -> &'static str {
        BACKEND
    }

    fn selector(&mut self, selector: &Selector) -> Result<Fragment> {
        Ok(Fragment::atom(
            format!("{} {}", table(selector.kind), selector.alias),
            Vec::new(),
        ))
    }

    fn join(
        &mut self,
        left: Fragment,
        right: Fragment,
        kind: JoinKind,
        condition: &JoinCondition,
    ) -> Result<Fragment> {
        let on = match condition {
            JoinCondition::Equi { left, right } => format!("{} = {}", column(left)?, column(right)?),
            JoinCondition::Child { child, parent } => {
                let key = parent_key(child.kind, parent.kind).ok_or_else(|| {
                    Error::gap(
                        BACKEND,
                        format!("a {:?} stored beneath a {:?}", child.kind, parent.kind),
                    )
                })?;
                format!("{}.{key} = {}.id", child.alias, parent.alias)
            }
        };
        let keyword = match kind {
            JoinKind::Inner => "JOIN",
            JoinKind::LeftOuter => "LEFT JOIN",
        };
        let mut params = left.params;
        params.extend(right.params);
        Ok(Fragment::atom(
            format!("{} {keyword} {} ON {on}", left.sql, right.sql),
            params,
        ))
    }

    fn comparison(&mut self, operand: &Operand, operator: Operator, value: &Value) -> Result<Fragment> {
        if let Property::Classifier { normalized } = operand.property {
            if operator != Operator::Eq {
                return Err(Error::gap(
                    BACKEND,
                    format!("classifier comparison with {}", operator.symbol()),
                ));
            }
            let table = if normalized {
                "artifact_normalized_classifier"
            } else {
                "artifact_classifier"
            };
            self.classifiers += 1;
            let alias = format!("classifier{}", self.classifiers);
            return Ok(Fragment::atom(
                format!(
                    "EXISTS (SELECT 1 FROM {table} {alias} WHERE {alias}.artifact_id = {}.id AND {alias}.classification = ?)",
                    operand.selector.alias
                ),
                vec![value.clone()],
            ));
        }
        Ok(Fragment::atom(
            format!("{} {} ?", column(operand)?, operator.symbol()),
            vec![value.clone()],
        ))
    }

    fn property_existence(&mut self, operand: &Operand) -> Result<Fragment> {
        Ok(Fragment::atom(
            format!("{} IS NOT NULL", column(operand)?),
            Vec::new(),
        ))
    }

    fn in_list(&mut self, operand: &Operand, values: &[Value]) -> Result<Fragment> {
        if values.is_empty() {
            return Ok(Fragment::atom("1 = 0".to_string(), Vec::new()));
        }
        let placeholders = vec!["?"; values.len()].join(", ");
        Ok(Fragment::atom(
            format!("{} IN ({placeholders})", column(operand)?),
            values.to_vec(),
        ))
    }

    fn exists(&mut self, subquery: &Subquery) -> Result<Fragment> {
        let source = realize_source(&subquery.source, self)?;
        let mut sql = format!(
            "EXISTS (SELECT 1 FROM {} WHERE {} = {}",
            source.sql,
            column(&subquery.correlated)?,
            column(&subquery.outer)?
        );
        let mut params = source.params;
        if let Some(constraint) = &subquery.constraint {
            let inner = realize_constraint(constraint, self)?;
            sql.push_str(" AND ");
            sql.push_str(&inner.nested_in(Some(BoolOp::And)));
            params.extend(inner.params);
        }
        sql.push(')');
        Ok(Fragment::atom(sql, params))
    }

    fn descendant(&mut self, selector: &Selector, ancestor_path: &str) -> Result<Fragment> {
        if selector.kind != NodeKind::Artifact || ancestor_path != self.artifact_root_path {
            return Err(Error::gap(
                BACKEND,
                format!("a {:?} located under {ancestor_path}", selector.kind),
            ));
        }
        Ok(Fragment::atom(
            format!("{}.trashed = FALSE", selector.alias),
            Vec::new(),
        ))
    }

    fn not(&mut self, inner: Fragment) -> Result<Fragment> {
        Ok(Fragment::atom(
            format!("NOT {}", inner.nested_in(None)),
            inner.params,
        ))
    }

    fn and(&mut self, left: Fragment, right: Fragment) -> Result<Fragment> {
        Ok(self.combine(BoolOp::And, left, right))
    }

    fn or(&mut self, left: Fragment, right: Fragment) -> Result<Fragment> {
        Ok(self.combine(BoolOp::Or, left, right))
    }

    fn build(
        &mut self,
        source: Fragment,
        constraint: Option<Fragment>,
        column_selector: &Selector,
        ordering: Option<&Ordering>,
    ) -> Result<SqlQuery> {
        let mut sql = format!("SELECT DISTINCT {}.* FROM {}", column_selector.alias, source.sql);
        let mut params = source.params;
        if let Some(constraint) = constraint {
            sql.push_str(" WHERE ");
            sql.push_str(&constraint.sql);
            params.extend(constraint.params);
        }
        if let Some(ordering) = ordering {
            let dir = if ordering.ascending { "ASC" } else { "DESC" };
            sql.push_str(&format!(" ORDER BY {} {dir}", column(&ordering.operand)?));
        }
        Ok(SqlQuery { sql, params })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::realize;
    use crate::model::{Alias, Constraint, ConstraintTree, SourceRef};

    fn sel(kind: NodeKind, alias: &str) -> Selector {
        Selector::new(kind, Alias::new(alias))
    }

    fn name_is(s: &Selector, v: &str) -> Constraint {
        Constraint::Comparison {
            operand: s.operand(Property::Core(CoreProperty::Name)),
            operator: Operator::Eq,
            value: Value::string(v),
        }
    }

    fn live(s: &Selector) -> Constraint {
        Constraint::Descendant {
            selector: s.clone(),
            ancestor_path: "/s-ramp".into(),
        }
    }

    #[test]
    fn test_simple_select() {
        let a1 = sel(NodeKind::Artifact, "artifact1");
        let tree = ConstraintTree {
            source: SourceRef::Selector(a1.clone()),
            constraint: Some(Constraint::and(name_is(&a1, "foo"), live(&a1))),
            column: a1.clone(),
            ordering: Some(Ordering {
                operand: a1.operand(Property::Core(CoreProperty::LastModifiedTimestamp)),
                ascending: false,
            }),
        };
        let q = realize(&tree, &mut RelationalBuilder::new()).unwrap();
        assert_eq!(
            q.sql,
            "SELECT DISTINCT artifact1.* FROM artifact artifact1 \
             WHERE artifact1.name = ? AND artifact1.trashed = FALSE \
             ORDER BY artifact1.last_modified_timestamp DESC"
        );
        assert_eq!(q.params, vec![Value::string("foo")]);
    }

    #[test]
    fn test_join_keeps_source_params() {
        let r1 = sel(NodeKind::Relationship, "relationship1");
        let t1 = sel(NodeKind::Target, "target1");
        let left = Fragment::atom("relationship relationship1".into(), vec![Value::string("l")]);
        let right = Fragment::atom("target target1".into(), vec![Value::string("r")]);
        let joined = RelationalBuilder::new()
            .join(
                left,
                right,
                JoinKind::LeftOuter,
                &JoinCondition::Child { child: t1, parent: r1 },
            )
            .unwrap();
        assert_eq!(
            joined.sql(),
            "relationship relationship1 LEFT JOIN target target1 ON target1.relationship_id = relationship1.id"
        );
        assert_eq!(joined.params, vec![Value::string("l"), Value::string("r")]);
    }

    #[test]
    fn test_mixed_booleans_are_parenthesized() {
        let a1 = sel(NodeKind::Artifact, "artifact1");
        let c = Constraint::and(
            Constraint::or(name_is(&a1, "a"), name_is(&a1, "b")),
            Constraint::negate(Constraint::and(name_is(&a1, "c"), name_is(&a1, "d"))),
        );
        let mut b = RelationalBuilder::new();
        let f = realize_constraint(&c, &mut b).unwrap();
        assert_eq!(
            f.sql(),
            "(artifact1.name = ? OR artifact1.name = ?) AND NOT (artifact1.name = ? AND artifact1.name = ?)"
        );
        let params: Vec<String> = f.params.iter().map(|v| v.to_string()).collect();
        assert_eq!(params, vec!["'a'", "'b'", "'c'", "'d'"]);
    }

    #[test]
    fn test_property_entry_subquery() {
        let a1 = sel(NodeKind::Artifact, "artifact1");
        let a2 = sel(NodeKind::Artifact, "artifact2");
        let p1 = sel(NodeKind::PropertyEntry, "property1");
        let sub = Subquery {
            source: SourceRef::Selector(a2.clone()).join(
                p1.clone(),
                JoinKind::Inner,
                JoinCondition::Child {
                    child: p1.clone(),
                    parent: a2.clone(),
                },
            ),
            constraint: Some(Constraint::Comparison {
                operand: p1.operand(Property::EntryKey),
                operator: Operator::Eq,
                value: Value::string("color"),
            }),
            correlated: a2.operand(Property::Id),
            outer: a1.operand(Property::Id),
        };
        let f = realize_constraint(&Constraint::ExistsSubquery(Box::new(sub)), &mut RelationalBuilder::new())
            .unwrap();
        assert_eq!(
            f.sql(),
            "EXISTS (SELECT 1 FROM artifact artifact2 JOIN artifact_property property1 \
             ON property1.artifact_id = artifact2.id \
             WHERE artifact2.id = artifact1.id AND property1.entry_key = ?)"
        );
    }

    #[test]
    fn test_classifier_and_in_list() {
        let a1 = sel(NodeKind::Artifact, "artifact1");
        let mut b = RelationalBuilder::new();
        let f = b
            .comparison(
                &a1.operand(Property::Classifier { normalized: true }),
                Operator::Eq,
                &Value::string("urn:x#China"),
            )
            .unwrap();
        assert_eq!(
            f.sql(),
            "EXISTS (SELECT 1 FROM artifact_normalized_classifier classifier1 \
             WHERE classifier1.artifact_id = artifact1.id AND classifier1.classification = ?)"
        );

        let uuid = a1.operand(Property::Core(CoreProperty::Uuid));
        let f = b
            .in_list(&uuid, &[Value::string("u1"), Value::string("u2")])
            .unwrap();
        assert_eq!(f.sql(), "artifact1.uuid IN (?, ?)");
        assert_eq!(b.in_list(&uuid, &[]).unwrap().sql(), "1 = 0");
    }

    #[test]
    fn test_capability_gaps() {
        let r1 = sel(NodeKind::Relationship, "relationship1");
        let a1 = sel(NodeKind::Artifact, "artifact1");
        let mut b = RelationalBuilder::new();
        let err = b
            .property_existence(&r1.operand(Property::Core(CoreProperty::Name)))
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::BackendCapabilityGap);

        let err = b
            .comparison(
                &a1.operand(Property::Classifier { normalized: false }),
                Operator::Like,
                &Value::string("x"),
            )
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::BackendCapabilityGap);

        assert!(b.descendant(&a1, "/elsewhere").is_err());
    }
}
