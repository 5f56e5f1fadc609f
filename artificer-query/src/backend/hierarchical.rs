//! JCR-SQL2 realization over the content-repository node tree.
//!
//! Artifacts are `sramp:baseArtifactType` nodes; relationships and targets are
//! child nodes beneath them. Custom properties and edge attributes are plain
//! node properties under the `sramp-properties` / `sramp-otherAttributes`
//! prefixes, so key/value probes collapse into a single property test.

use serde::{Deserialize, Serialize};

use super::{QueryBuilder, realize_constraint, realize_source};
use crate::coerce::Value;
use crate::error::{Error, Result};
use crate::model::{
    Constraint, CoreProperty, JoinCondition, JoinKind, NodeKind, Operand, Operator, Ordering,
    Property, Selector, SourceRef, Subquery,
};

const BACKEND: &str = "hierarchical";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sql2Query {
    pub statement: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BoolOp {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    text: String,
    op: Option<BoolOp>,
}

impl Clause {
    fn atom(text: String) -> Self {
        Self { text, op: None }
    }

    fn nested_in(&self, outer: Option<BoolOp>) -> String {
        match self.op {
            Some(op) if Some(op) != outer => format!("({})", self.text),
            _ => self.text.clone(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

#[derive(Debug, Clone, Default)]
pub struct HierarchicalBuilder;

impl HierarchicalBuilder {
    pub fn new() -> Self {
        Self
    }
}

fn node_type(kind: NodeKind) -> Result<&'static str> {
    match kind {
        NodeKind::Artifact => Ok("sramp:baseArtifactType"),
        NodeKind::Relationship => Ok("sramp:relationship"),
        NodeKind::Target => Ok("sramp:target"),
        other => Err(Error::gap(
            BACKEND,
            format!("{other:?} as a selector; entries are node properties"),
        )),
    }
}

fn property_name(property: Property) -> Result<String> {
    Ok(match property {
        Property::Core(core) => match core {
            CoreProperty::CreatedBy => "jcr:createdBy".to_string(),
            CoreProperty::CreatedTimestamp => "jcr:created".to_string(),
            CoreProperty::LastModifiedBy => "jcr:lastModifiedBy".to_string(),
            CoreProperty::LastModifiedTimestamp => "jcr:lastModified".to_string(),
            CoreProperty::Version => "version".to_string(),
            other => format!("sramp:{}", other.local_name()),
        },
        Property::ArtifactType => "sramp:artifactType".to_string(),
        Property::ArtifactModel => "sramp:artifactModel".to_string(),
        Property::RelationshipType => "sramp:relationshipType".to_string(),
        Property::TargetArtifact => "sramp:targetArtifact".to_string(),
        Property::Id => "jcr:uuid".to_string(),
        Property::Classifier { normalized: true } => "sramp:normalizedClassifiedBy".to_string(),
        Property::Classifier { normalized: false } => "sramp:classifiedBy".to_string(),
        Property::EntryKey | Property::EntryValue => {
            return Err(Error::gap(
                BACKEND,
                format!("{property} outside of a property probe"),
            ));
        }
    })
}

fn operand(operand: &Operand) -> Result<String> {
    Ok(format!(
        "{}.[{}]",
        operand.selector.alias,
        property_name(operand.property)?
    ))
}

fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        Value::Boolean(b) => format!("CAST('{b}' AS BOOLEAN)"),
        Value::Double(d) => format!("CAST('{d}' AS DOUBLE)"),
        Value::Date(d) => format!("CAST('{}T00:00:00.000Z' AS DATE)", d.format("%Y-%m-%d")),
    }
}

/// Node-property prefix the entries of `kind` are stored under.
fn entry_prefix(kind: NodeKind) -> Option<&'static str> {
    match kind {
        NodeKind::PropertyEntry => Some("sramp-properties"),
        NodeKind::RelationshipAttribute | NodeKind::TargetAttribute => {
            Some("sramp-otherAttributes")
        }
        _ => None,
    }
}

/// A recognized `EXISTS (owner JOIN entry WHERE key = k [AND value op v])`.
struct EntryTest<'a> {
    prefix: &'static str,
    key: &'a str,
    test: Option<(Operator, &'a Value)>,
}

fn entry_test(subquery: &Subquery) -> Option<EntryTest<'_>> {
    let SourceRef::Join {
        left,
        right: entry,
        kind: JoinKind::Inner,
        condition: JoinCondition::Child { child, parent },
    } = &subquery.source
    else {
        return None;
    };
    let SourceRef::Selector(owner) = left.as_ref() else {
        return None;
    };
    if child != entry || parent != owner || subquery.correlated != owner.operand(Property::Id) {
        return None;
    }
    let prefix = entry_prefix(entry.kind)?;

    let (key, value) = match subquery.constraint.as_ref()? {
        Constraint::And(key, value) => (key.as_ref(), Some(value.as_ref())),
        key => (key, None),
    };
    let Constraint::Comparison {
        operand: key_operand,
        operator: Operator::Eq,
        value: Value::String(key),
    } = key
    else {
        return None;
    };
    if key_operand != &entry.operand(Property::EntryKey) {
        return None;
    }
    let test = match value {
        None => None,
        Some(Constraint::Comparison {
            operand,
            operator,
            value,
        }) if operand == &entry.operand(Property::EntryValue) => Some((*operator, value)),
        Some(_) => return None,
    };
    Some(EntryTest { prefix, key, test })
}

impl QueryBuilder for HierarchicalBuilder {
    type Source = String;
    type Constraint = Clause;
    type Query = Sql2Query;

    fn name(&self) -> &'static str {
        BACKEND
    }

    fn selector(&mut self, selector: &Selector) -> Result<String> {
        Ok(format!("[{}] AS {}", node_type(selector.kind)?, selector.alias))
    }

    fn join(
        &mut self,
        left: String,
        right: String,
        kind: JoinKind,
        condition: &JoinCondition,
    ) -> Result<String> {
        let on = match condition {
            JoinCondition::Equi { left, right } => format!("{} = {}", operand(left)?, operand(right)?),
            JoinCondition::Child { child, parent } => {
                format!("ISCHILDNODE({}, {})", child.alias, parent.alias)
            }
        };
        let keyword = match kind {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::LeftOuter => "LEFT OUTER JOIN",
        };
        Ok(format!("{left} {keyword} {right} ON {on}"))
    }

    fn comparison(&mut self, op: &Operand, operator: Operator, value: &Value) -> Result<Clause> {
        Ok(Clause::atom(format!(
            "{} {} {}",
            operand(op)?,
            operator.symbol(),
            literal(value)
        )))
    }

    fn property_existence(&mut self, op: &Operand) -> Result<Clause> {
        Ok(Clause::atom(format!("{} IS NOT NULL", operand(op)?)))
    }

    fn in_list(&mut self, op: &Operand, values: &[Value]) -> Result<Clause> {
        if values.is_empty() {
            return Ok(Clause::atom(format!(
                "NOT ISDESCENDANTNODE({}, '/')",
                op.selector.alias
            )));
        }
        let list: Vec<String> = values.iter().map(literal).collect();
        Ok(Clause::atom(format!("{} IN ({})", operand(op)?, list.join(", "))))
    }

    fn exists(&mut self, subquery: &Subquery) -> Result<Clause> {
        if let Some(entry) = entry_test(subquery) {
            if entry.key.contains(']') {
                return Err(Error::gap(
                    BACKEND,
                    format!("property name {:?} in a bracketed identifier", entry.key),
                ));
            }
            let name = format!(
                "{}.[{}:{}]",
                subquery.outer.selector.alias, entry.prefix, entry.key
            );
            return Ok(Clause::atom(match entry.test {
                Some((operator, value)) => {
                    format!("{name} {} {}", operator.symbol(), literal(value))
                }
                None => format!("{name} IS NOT NULL"),
            }));
        }

        // JCR-SQL2 has no correlated EXISTS; select the matching owners instead
        let source = realize_source(&subquery.source, self)?;
        let mut text = format!(
            "{} IN (SELECT {} FROM {source}",
            operand(&subquery.outer)?,
            operand(&subquery.correlated)?
        );
        if let Some(constraint) = &subquery.constraint {
            let inner = realize_constraint(constraint, self)?;
            text.push_str(" WHERE ");
            text.push_str(&inner.text);
        }
        text.push(')');
        Ok(Clause::atom(text))
    }

    fn descendant(&mut self, selector: &Selector, ancestor_path: &str) -> Result<Clause> {
        Ok(Clause::atom(format!(
            "ISDESCENDANTNODE({}, '{}')",
            selector.alias,
            ancestor_path.replace('\'', "''")
        )))
    }

    fn not(&mut self, inner: Clause) -> Result<Clause> {
        Ok(Clause::atom(format!("NOT ({})", inner.text)))
    }

    fn and(&mut self, left: Clause, right: Clause) -> Result<Clause> {
        Ok(Clause {
            text: format!(
                "{} AND {}",
                left.nested_in(Some(BoolOp::And)),
                right.nested_in(Some(BoolOp::And))
            ),
            op: Some(BoolOp::And),
        })
    }

    fn or(&mut self, left: Clause, right: Clause) -> Result<Clause> {
        Ok(Clause {
            text: format!(
                "{} OR {}",
                left.nested_in(Some(BoolOp::Or)),
                right.nested_in(Some(BoolOp::Or))
            ),
            op: Some(BoolOp::Or),
        })
    }

    fn build(
        &mut self,
        source: String,
        constraint: Option<Clause>,
        column: &Selector,
        ordering: Option<&Ordering>,
    ) -> Result<Sql2Query> {
        let mut statement = format!("SELECT {}.* FROM {source}", column.alias);
        if let Some(constraint) = constraint {
            statement.push_str(" WHERE ");
            statement.push_str(&constraint.text);
        }
        if let Some(ordering) = ordering {
            let dir = if ordering.ascending { "ASC" } else { "DESC" };
            statement.push_str(&format!(" ORDER BY {} {dir}", operand(&ordering.operand)?));
        }
        Ok(Sql2Query { statement })
    }
}
