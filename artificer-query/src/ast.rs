use artificer_api::{SRAMP_NS, XPATH_FUNCTIONS_NS};
use serde::{Deserialize, Serialize};

/// Namespace-qualified name of a property or function.
///
/// A missing namespace means the S-RAMP namespace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct QName {
    pub namespace: Option<String>,
    pub prefix: Option<String>,
    pub local: String,
}

impl QName {
    pub fn new(local: impl Into<String>) -> Self {
        Self {
            namespace: None,
            prefix: None,
            local: local.into(),
        }
    }

    pub fn qualified(
        namespace: impl Into<String>,
        prefix: impl Into<String>,
        local: impl Into<String>,
    ) -> Self {
        Self {
            namespace: Some(namespace.into()),
            prefix: Some(prefix.into()),
            local: local.into(),
        }
    }

    pub fn sramp(local: impl Into<String>) -> Self {
        Self::qualified(SRAMP_NS, "s-ramp", local)
    }

    pub fn xpath(local: impl Into<String>) -> Self {
        Self::qualified(XPATH_FUNCTIONS_NS, "fn", local)
    }

    /// Namespace URI with the S-RAMP default applied.
    pub fn namespace_uri(&self) -> &str {
        match self.namespace.as_deref() {
            None | Some("") => SRAMP_NS,
            Some(ns) => ns,
        }
    }

    pub fn is_sramp(&self) -> bool {
        self.namespace_uri() == SRAMP_NS
    }

    pub fn is_xpath_function(&self) -> bool {
        self.namespace_uri() == XPATH_FUNCTIONS_NS
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Query {
    pub artifact_set: LocationPath,
    pub predicate: Option<Expr>,
    pub subartifact_set: Option<SubartifactSet>,
}

impl Query {
    pub fn new(artifact_set: LocationPath) -> Self {
        Self {
            artifact_set,
            predicate: None,
            subartifact_set: None,
        }
    }

    pub fn with_predicate(mut self, predicate: Expr) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn with_subartifacts(mut self, subartifact_set: SubartifactSet) -> Self {
        self.subartifact_set = Some(subartifact_set);
        self
    }
}

/// `/s-ramp[/model[/type]]`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LocationPath {
    pub artifact_model: Option<String>,
    pub artifact_type: Option<String>,
}

impl LocationPath {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn model(model: impl Into<String>) -> Self {
        Self {
            artifact_model: Some(model.into()),
            artifact_type: None,
        }
    }

    pub fn typed(model: impl Into<String>, artifact_type: impl Into<String>) -> Self {
        Self {
            artifact_model: Some(model.into()),
            artifact_type: Some(artifact_type.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum SubartifactSet {
    Function(FunctionCall),
    Relationship {
        path: RelationshipPath,
        predicate: Option<Expr>,
        subartifact_set: Option<Box<SubartifactSet>>,
    },
}

impl SubartifactSet {
    pub fn relationship(relationship_type: impl Into<String>) -> Self {
        SubartifactSet::Relationship {
            path: RelationshipPath {
                relationship_type: relationship_type.into(),
            },
            predicate: None,
            subartifact_set: None,
        }
    }

    /// Attaches a predicate to a relationship step; function steps are returned unchanged.
    pub fn with_predicate(self, expr: Expr) -> Self {
        match self {
            SubartifactSet::Relationship {
                path,
                subartifact_set,
                ..
            } => SubartifactSet::Relationship {
                path,
                predicate: Some(expr),
                subartifact_set,
            },
            other => other,
        }
    }

    /// Chains a further step after a relationship step.
    pub fn then(self, next: SubartifactSet) -> Self {
        match self {
            SubartifactSet::Relationship {
                path, predicate, ..
            } => SubartifactSet::Relationship {
                path,
                predicate,
                subartifact_set: Some(Box::new(next)),
            },
            other => other,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelationshipPath {
    pub relationship_type: String,
}

/// Root of a predicate expression.
pub type Expr = AndExpr;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AndExpr {
    pub left: OrExpr,
    pub right: Option<Box<AndExpr>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrExpr {
    pub left: EqualityExpr,
    pub right: Option<Box<OrExpr>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum EqualityExpr {
    Subartifacts(Box<SubartifactSet>),
    Grouped(Box<Expr>),
    /// `left` alone is an existence test; with a comparison it is `left op right`.
    Test {
        left: Operand,
        comparison: Option<(EqualityOperator, PrimaryExpr)>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Operand {
    Property(ForwardPropertyStep),
    Function(FunctionCall),
    Primary(PrimaryExpr),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EqualityOperator {
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
    Like,
    Ne,
}

impl EqualityOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            EqualityOperator::Eq => "=",
            EqualityOperator::Gt => ">",
            EqualityOperator::Ge => ">=",
            EqualityOperator::Lt => "<",
            EqualityOperator::Le => "<=",
            EqualityOperator::Like => "like",
            EqualityOperator::Ne => "<>",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "=" => EqualityOperator::Eq,
            ">" => EqualityOperator::Gt,
            ">=" => EqualityOperator::Ge,
            "<" => EqualityOperator::Lt,
            "<=" => EqualityOperator::Le,
            "<>" | "!=" => EqualityOperator::Ne,
            s if s.eq_ignore_ascii_case("like") => EqualityOperator::Like,
            _ => return None,
        })
    }
}

/// `@name`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForwardPropertyStep {
    pub property: QName,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    pub name: QName,
    pub arguments: Vec<Argument>,
}

impl FunctionCall {
    pub fn sramp(local: &str, arguments: Vec<Argument>) -> Self {
        Self {
            name: QName::sramp(local),
            arguments,
        }
    }

    pub fn xpath(local: &str, arguments: Vec<Argument>) -> Self {
        Self {
            name: QName::xpath(local),
            arguments,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Argument {
    Primary(PrimaryExpr),
    Expr(Expr),
}

impl Argument {
    pub fn literal(value: impl Into<String>) -> Self {
        Argument::Primary(PrimaryExpr::Literal(value.into()))
    }

    /// The `.` argument.
    pub fn context() -> Self {
        Argument::Primary(PrimaryExpr::ContextItem)
    }

    /// An `@name` argument, as `matches(@name, ...)` takes it.
    pub fn property(name: impl Into<String>) -> Self {
        Argument::Expr(Expr::exists(name))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum PrimaryExpr {
    Literal(String),
    Number(f64),
    /// `$name`
    Property(QName),
    /// `.`
    ContextItem,
}

impl PrimaryExpr {
    pub fn literal(value: impl Into<String>) -> Self {
        PrimaryExpr::Literal(value.into())
    }
}

impl From<EqualityExpr> for AndExpr {
    fn from(expr: EqualityExpr) -> Self {
        AndExpr {
            left: OrExpr {
                left: expr,
                right: None,
            },
            right: None,
        }
    }
}

impl AndExpr {
    /// `@name` (property existence).
    pub fn exists(property: impl Into<String>) -> Self {
        EqualityExpr::Test {
            left: Operand::Property(ForwardPropertyStep {
                property: QName::new(property),
            }),
            comparison: None,
        }
        .into()
    }

    /// `@name op right`.
    pub fn compare(property: impl Into<String>, op: EqualityOperator, right: PrimaryExpr) -> Self {
        EqualityExpr::Test {
            left: Operand::Property(ForwardPropertyStep {
                property: QName::new(property),
            }),
            comparison: Some((op, right)),
        }
        .into()
    }

    /// `@name = 'value'`.
    pub fn equals(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self::compare(property, EqualityOperator::Eq, PrimaryExpr::literal(value))
    }

    /// A bare function call used as a boolean test.
    pub fn function(call: FunctionCall) -> Self {
        EqualityExpr::Test {
            left: Operand::Function(call),
            comparison: None,
        }
        .into()
    }

    /// `fn(args) op right`.
    pub fn function_compare(call: FunctionCall, op: EqualityOperator, right: PrimaryExpr) -> Self {
        EqualityExpr::Test {
            left: Operand::Function(call),
            comparison: Some((op, right)),
        }
        .into()
    }

    pub fn subartifacts(set: SubartifactSet) -> Self {
        EqualityExpr::Subartifacts(Box::new(set)).into()
    }

    /// `fn:not(self)`.
    pub fn negate(self) -> Self {
        Self::function(FunctionCall::xpath("not", vec![Argument::Expr(self)]))
    }

    pub fn and(self, right: Expr) -> Self {
        AndExpr {
            left: self.into_or(),
            right: Some(Box::new(right)),
        }
    }

    pub fn or(self, right: Expr) -> Self {
        AndExpr {
            left: OrExpr {
                left: self.into_equality(),
                right: Some(Box::new(right.into_or())),
            },
            right: None,
        }
    }

    fn into_or(self) -> OrExpr {
        match self.right {
            None => self.left,
            Some(_) => OrExpr {
                left: EqualityExpr::Grouped(Box::new(self)),
                right: None,
            },
        }
    }

    fn into_equality(self) -> EqualityExpr {
        match self {
            AndExpr {
                left: OrExpr { left, right: None },
                right: None,
            } => left,
            grouped => EqualityExpr::Grouped(Box::new(grouped)),
        }
    }
}
