//! Canonical query text for AST nodes.
//!
//! The rendering is what error messages quote as the offending fragment, so it
//! stays close to what a user would have typed.

use std::fmt::{self, Display, Formatter};

use crate::ast::{
    AndExpr, Argument, EqualityExpr, ForwardPropertyStep, FunctionCall, LocationPath, Operand,
    OrExpr, PrimaryExpr, QName, Query, RelationshipPath, SubartifactSet,
};

fn write_prefixed(f: &mut Formatter<'_>, name: &QName, skip_sramp: bool) -> fmt::Result {
    if let Some(prefix) = name.prefix.as_deref().map(str::trim)
        && !prefix.is_empty()
        && !(skip_sramp && prefix == "s-ramp")
    {
        write!(f, "{prefix}:")?;
    }
    f.write_str(&name.local)
}

impl Display for QName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_prefixed(f, self, false)
    }
}

impl Display for Query {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.artifact_set)?;
        if let Some(predicate) = &self.predicate {
            write!(f, "[{predicate}]")?;
        }
        if let Some(set) = &self.subartifact_set {
            write!(f, "/{set}")?;
        }
        Ok(())
    }
}

impl Display for LocationPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("/s-ramp")?;
        if let Some(model) = &self.artifact_model {
            write!(f, "/{model}")?;
            if let Some(ty) = &self.artifact_type {
                write!(f, "/{ty}")?;
            }
        }
        Ok(())
    }
}

impl Display for SubartifactSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SubartifactSet::Function(call) => write!(f, "{call}"),
            SubartifactSet::Relationship {
                path,
                predicate,
                subartifact_set,
            } => {
                write!(f, "{path}")?;
                if let Some(predicate) = predicate {
                    write!(f, "[{predicate}]")?;
                }
                if let Some(next) = subartifact_set {
                    write!(f, "/{next}")?;
                }
                Ok(())
            }
        }
    }
}

impl Display for RelationshipPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.relationship_type)
    }
}

impl Display for AndExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.left)?;
        if let Some(right) = &self.right {
            write!(f, " and {right}")?;
        }
        Ok(())
    }
}

impl Display for OrExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.left)?;
        if let Some(right) = &self.right {
            write!(f, " or {right}")?;
        }
        Ok(())
    }
}

impl Display for EqualityExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            EqualityExpr::Subartifacts(set) => write!(f, "{set}"),
            EqualityExpr::Grouped(expr) => write!(f, "({expr})"),
            EqualityExpr::Test { left, comparison } => {
                write!(f, "{left}")?;
                if let Some((op, right)) = comparison {
                    write!(f, " {} {right}", op.symbol())?;
                }
                Ok(())
            }
        }
    }
}

impl Display for Operand {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Property(step) => write!(f, "{step}"),
            Operand::Function(call) => write!(f, "{call}"),
            Operand::Primary(primary) => write!(f, "{primary}"),
        }
    }
}

impl Display for ForwardPropertyStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.property)
    }
}

impl Display for FunctionCall {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_prefixed(f, &self.name, true)?;
        f.write_str("(")?;
        for (i, arg) in self.arguments.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{arg}")?;
        }
        f.write_str(")")
    }
}

impl Display for Argument {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Primary(primary) => write!(f, "{primary}"),
            Argument::Expr(expr) => write!(f, "{expr}"),
        }
    }
}

impl Display for PrimaryExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PrimaryExpr::Literal(s) => write!(f, "'{}'", s.replace('\'', "''")),
            PrimaryExpr::Number(n) if n.is_finite() && n.fract() == 0.0 => write!(f, "{n:.0}"),
            PrimaryExpr::Number(n) => write!(f, "{n}"),
            PrimaryExpr::Property(name) => write!(f, "${name}"),
            PrimaryExpr::ContextItem => f.write_str("."),
        }
    }
}
