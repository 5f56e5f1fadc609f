//! Backend-agnostic constraint trees.
//!
//! The compiler produces a [`ConstraintTree`]; a [`crate::backend::QueryBuilder`]
//! turns it into something a store can execute.

use std::fmt::{self, Write as _};

use serde::{Deserialize, Serialize};

use crate::ast::EqualityOperator;
use crate::coerce::Value;

/// Name of a join participant, e.g. `artifact1` or `relationship2`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Alias(String);

impl Alias {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Alias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a selector ranges over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Artifact,
    Relationship,
    Target,
    /// One entry of an artifact's custom property collection.
    PropertyEntry,
    RelationshipAttribute,
    TargetAttribute,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selector {
    pub kind: NodeKind,
    pub alias: Alias,
}

impl Selector {
    pub fn new(kind: NodeKind, alias: Alias) -> Self {
        Self { kind, alias }
    }

    pub fn operand(&self, property: Property) -> Operand {
        Operand {
            selector: self.clone(),
            property,
        }
    }
}

/// The fixed artifact properties that map to a scalar column or field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoreProperty {
    CreatedBy,
    CreatedTimestamp,
    LastModifiedBy,
    LastModifiedTimestamp,
    Version,
    Uuid,
    Description,
    Name,
    ContentType,
    ContentSize,
    ContentHash,
    ContentEncoding,
    ExtendedType,
    Derived,
    NcName,
    Namespace,
    TargetNamespace,
    Style,
    Transport,
    SoapLocation,
}

impl CoreProperty {
    pub const ALL: [CoreProperty; 20] = [
        CoreProperty::CreatedBy,
        CoreProperty::CreatedTimestamp,
        CoreProperty::LastModifiedBy,
        CoreProperty::LastModifiedTimestamp,
        CoreProperty::Version,
        CoreProperty::Uuid,
        CoreProperty::Description,
        CoreProperty::Name,
        CoreProperty::ContentType,
        CoreProperty::ContentSize,
        CoreProperty::ContentHash,
        CoreProperty::ContentEncoding,
        CoreProperty::ExtendedType,
        CoreProperty::Derived,
        CoreProperty::NcName,
        CoreProperty::Namespace,
        CoreProperty::TargetNamespace,
        CoreProperty::Style,
        CoreProperty::Transport,
        CoreProperty::SoapLocation,
    ];

    /// Name as written in a query (`@createdBy`).
    pub fn local_name(self) -> &'static str {
        match self {
            CoreProperty::CreatedBy => "createdBy",
            CoreProperty::CreatedTimestamp => "createdTimestamp",
            CoreProperty::LastModifiedBy => "lastModifiedBy",
            CoreProperty::LastModifiedTimestamp => "lastModifiedTimestamp",
            CoreProperty::Version => "version",
            CoreProperty::Uuid => "uuid",
            CoreProperty::Description => "description",
            CoreProperty::Name => "name",
            CoreProperty::ContentType => "contentType",
            CoreProperty::ContentSize => "contentSize",
            CoreProperty::ContentHash => "contentHash",
            CoreProperty::ContentEncoding => "contentEncoding",
            CoreProperty::ExtendedType => "extendedType",
            CoreProperty::Derived => "derived",
            CoreProperty::NcName => "ncName",
            CoreProperty::Namespace => "namespace",
            CoreProperty::TargetNamespace => "targetNamespace",
            CoreProperty::Style => "style",
            CoreProperty::Transport => "transport",
            CoreProperty::SoapLocation => "soapLocation",
        }
    }

    pub fn from_local_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.local_name() == name)
    }

    pub fn is_timestamp(self) -> bool {
        matches!(
            self,
            CoreProperty::CreatedTimestamp | CoreProperty::LastModifiedTimestamp
        )
    }
}

/// A logical column on some selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Property {
    Core(CoreProperty),
    ArtifactType,
    ArtifactModel,
    RelationshipType,
    /// Id of the artifact a target points at.
    TargetArtifact,
    /// Store-internal identity used for joins and correlation.
    Id,
    /// Multi-valued classification set; `normalized` includes ancestor classes.
    Classifier { normalized: bool },
    EntryKey,
    EntryValue,
}

impl Property {
    pub fn is_timestamp(self) -> bool {
        matches!(self, Property::Core(p) if p.is_timestamp())
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Property::Core(p) => f.write_str(p.local_name()),
            Property::ArtifactType => f.write_str("artifactType"),
            Property::ArtifactModel => f.write_str("artifactModel"),
            Property::RelationshipType => f.write_str("relationshipType"),
            Property::TargetArtifact => f.write_str("targetArtifact"),
            Property::Id => f.write_str("id"),
            Property::Classifier { normalized: true } => f.write_str("normalizedClassifiers"),
            Property::Classifier { normalized: false } => f.write_str("classifiers"),
            Property::EntryKey => f.write_str("key"),
            Property::EntryValue => f.write_str("value"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Operand {
    pub selector: Selector,
    pub property: Property,
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.selector.alias, self.property)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinKind {
    Inner,
    LeftOuter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JoinCondition {
    Equi { left: Operand, right: Operand },
    /// `child` is stored directly beneath `parent`.
    Child { child: Selector, parent: Selector },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SourceRef {
    Selector(Selector),
    Join {
        left: Box<SourceRef>,
        right: Selector,
        kind: JoinKind,
        condition: JoinCondition,
    },
}

impl SourceRef {
    /// Appends `right` to the join chain.
    pub fn join(self, right: Selector, kind: JoinKind, condition: JoinCondition) -> Self {
        SourceRef::Join {
            left: Box::new(self),
            right,
            kind,
            condition,
        }
    }

    /// The selector the chain starts from.
    pub fn root(&self) -> &Selector {
        match self {
            SourceRef::Selector(s) => s,
            SourceRef::Join { left, .. } => left.root(),
        }
    }

    /// Every selector in the chain, in join order.
    pub fn selectors(&self) -> Vec<&Selector> {
        match self {
            SourceRef::Selector(s) => vec![s],
            SourceRef::Join { left, right, .. } => {
                let mut out = left.selectors();
                out.push(right);
                out
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
}

impl Operator {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "=" => Operator::Eq,
            "<>" | "!=" => Operator::Ne,
            "<" => Operator::Lt,
            "<=" => Operator::Le,
            ">" => Operator::Gt,
            ">=" => Operator::Ge,
            s if s.eq_ignore_ascii_case("like") => Operator::Like,
            _ => return None,
        })
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "<>",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Like => "LIKE",
        }
    }
}

impl From<EqualityOperator> for Operator {
    fn from(op: EqualityOperator) -> Self {
        match op {
            EqualityOperator::Eq => Operator::Eq,
            EqualityOperator::Ne => Operator::Ne,
            EqualityOperator::Lt => Operator::Lt,
            EqualityOperator::Le => Operator::Le,
            EqualityOperator::Gt => Operator::Gt,
            EqualityOperator::Ge => Operator::Ge,
            EqualityOperator::Like => Operator::Like,
        }
    }
}

/// Correlated existence test.
///
/// True for an outer row when some row of `source` satisfies `constraint` and
/// has `correlated = outer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subquery {
    pub source: SourceRef,
    pub constraint: Option<Constraint>,
    pub correlated: Operand,
    pub outer: Operand,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constraint {
    And(Box<Constraint>, Box<Constraint>),
    Or(Box<Constraint>, Box<Constraint>),
    Not(Box<Constraint>),
    Comparison {
        operand: Operand,
        operator: Operator,
        value: Value,
    },
    /// The property has a value.
    Exists(Operand),
    In {
        operand: Operand,
        values: Vec<Value>,
    },
    /// The selector's node lives under `ancestor_path`.
    Descendant {
        selector: Selector,
        ancestor_path: String,
    },
    ExistsSubquery(Box<Subquery>),
}

impl Constraint {
    pub fn and(left: Constraint, right: Constraint) -> Self {
        Constraint::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Constraint, right: Constraint) -> Self {
        Constraint::Or(Box::new(left), Box::new(right))
    }

    pub fn negate(inner: Constraint) -> Self {
        Constraint::Not(Box::new(inner))
    }

    /// `c1 AND (c2 AND (c3 ...))`; `None` for an empty list.
    pub fn and_all(constraints: Vec<Constraint>) -> Option<Constraint> {
        fold_right(constraints, Constraint::and)
    }

    /// `c1 OR (c2 OR (c3 ...))`; `None` for an empty list.
    pub fn or_all(constraints: Vec<Constraint>) -> Option<Constraint> {
        fold_right(constraints, Constraint::or)
    }
}

fn fold_right(
    constraints: Vec<Constraint>,
    combine: fn(Constraint, Constraint) -> Constraint,
) -> Option<Constraint> {
    let mut iter = constraints.into_iter().rev();
    let last = iter.next()?;
    Some(iter.fold(last, |acc, c| combine(c, acc)))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ordering {
    pub operand: Operand,
    pub ascending: bool,
}

/// A compiled query before any backend has seen it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintTree {
    pub source: SourceRef,
    pub constraint: Option<Constraint>,
    /// Selector whose rows are the result.
    pub column: Selector,
    pub ordering: Option<Ordering>,
}

impl ConstraintTree {
    /// Indented plan text, one node per line.
    pub fn explain(&self) -> String {
        fn indent(n: usize) -> String {
            "  ".repeat(n)
        }

        fn source(out: &mut String, src: &SourceRef, depth: usize) {
            let pad = indent(depth);
            match src {
                SourceRef::Selector(s) => {
                    let _ = writeln!(out, "{pad}Selector({:?} AS {})", s.kind, s.alias);
                }
                SourceRef::Join {
                    left,
                    right,
                    kind,
                    condition,
                } => {
                    let on = match condition {
                        JoinCondition::Equi { left, right } => format!("{left} = {right}"),
                        JoinCondition::Child { child, parent } => {
                            format!("child({}, {})", child.alias, parent.alias)
                        }
                    };
                    let _ = writeln!(
                        out,
                        "{pad}Join({kind:?}, {:?} AS {}, on={on})",
                        right.kind, right.alias
                    );
                    source(out, left, depth + 1);
                }
            }
        }

        fn constraint(out: &mut String, c: &Constraint, depth: usize) {
            let pad = indent(depth);
            match c {
                Constraint::And(l, r) => {
                    let _ = writeln!(out, "{pad}And");
                    constraint(out, l, depth + 1);
                    constraint(out, r, depth + 1);
                }
                Constraint::Or(l, r) => {
                    let _ = writeln!(out, "{pad}Or");
                    constraint(out, l, depth + 1);
                    constraint(out, r, depth + 1);
                }
                Constraint::Not(inner) => {
                    let _ = writeln!(out, "{pad}Not");
                    constraint(out, inner, depth + 1);
                }
                Constraint::Comparison {
                    operand,
                    operator,
                    value,
                } => {
                    let _ = writeln!(out, "{pad}Compare({operand} {} {value})", operator.symbol());
                }
                Constraint::Exists(operand) => {
                    let _ = writeln!(out, "{pad}Exists({operand})");
                }
                Constraint::In { operand, values } => {
                    let _ = writeln!(out, "{pad}In({operand}, count={})", values.len());
                }
                Constraint::Descendant {
                    selector,
                    ancestor_path,
                } => {
                    let _ = writeln!(out, "{pad}Descendant({}, {ancestor_path:?})", selector.alias);
                }
                Constraint::ExistsSubquery(sub) => {
                    let _ = writeln!(out, "{pad}ExistsSubquery({} = {})", sub.correlated, sub.outer);
                    source(out, &sub.source, depth + 1);
                    if let Some(c) = &sub.constraint {
                        constraint(out, c, depth + 1);
                    }
                }
            }
        }

        let mut out = String::new();
        let _ = writeln!(out, "Select({})", self.column.alias);
        if let Some(ordering) = &self.ordering {
            let dir = if ordering.ascending { "asc" } else { "desc" };
            let _ = writeln!(out, "  OrderBy({} {dir})", ordering.operand);
        }
        source(&mut out, &self.source, 1);
        if let Some(c) = &self.constraint {
            constraint(&mut out, c, 1);
        }
        out.trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmp(name: &str) -> Constraint {
        let s = Selector::new(NodeKind::Artifact, Alias::new("artifact1"));
        Constraint::Comparison {
            operand: s.operand(Property::Core(CoreProperty::Name)),
            operator: Operator::Eq,
            value: Value::String(name.to_string()),
        }
    }

    #[test]
    fn test_and_all_nests_to_the_right() {
        let c = Constraint::and_all(vec![cmp("a"), cmp("b"), cmp("c")]).unwrap();
        assert_eq!(c, Constraint::and(cmp("a"), Constraint::and(cmp("b"), cmp("c"))));
        assert_eq!(Constraint::or_all(vec![cmp("a")]), Some(cmp("a")));
        assert_eq!(Constraint::and_all(Vec::new()), None);
    }

    #[test]
    fn test_core_property_names() {
        for p in CoreProperty::ALL {
            assert_eq!(CoreProperty::from_local_name(p.local_name()), Some(p));
        }
        assert_eq!(CoreProperty::from_local_name("Name"), None);
        assert!(Property::Core(CoreProperty::LastModifiedTimestamp).is_timestamp());
        assert!(!Property::EntryValue.is_timestamp());
    }

    #[test]
    fn test_source_selectors_in_join_order() {
        let a = Selector::new(NodeKind::Artifact, Alias::new("artifact1"));
        let r = Selector::new(NodeKind::Relationship, Alias::new("relationship1"));
        let src = SourceRef::Selector(a.clone()).join(
            r.clone(),
            JoinKind::Inner,
            JoinCondition::Child {
                child: r.clone(),
                parent: a.clone(),
            },
        );
        assert_eq!(src.root(), &a);
        assert_eq!(src.selectors(), vec![&a, &r]);
    }
}
