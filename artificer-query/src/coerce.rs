//! Literal coercion.
//!
//! Turns a raw literal into a typed [`Value`] using the property it is compared
//! against. Both backends receive the same value and only differ in encoding.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ast::PrimaryExpr;
use crate::error::{Error, Result};
use crate::model::Property;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    String(String),
    Boolean(bool),
    Double(f64),
    Date(NaiveDate),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Double(d) => write!(f, "{d}"),
            Value::Date(d) => write!(f, "date({d})"),
        }
    }
}

/// Coerces `literal` for comparison against `context`.
///
/// Order matters: a timestamp context wins over the boolean spelling, and
/// custom property / attribute values are always strings.
pub fn coerce(context: Option<&Property>, literal: &PrimaryExpr, date_format: &str) -> Result<Value> {
    match literal {
        PrimaryExpr::Literal(raw) => {
            if context.is_some_and(|p| p.is_timestamp()) {
                return NaiveDate::parse_from_str(raw, date_format)
                    .map(Value::Date)
                    .map_err(|e| Error::MalformedLiteral {
                        literal: raw.clone(),
                        reason: format!("expected a date in format {date_format}: {e}"),
                    });
            }
            if matches!(context, Some(Property::EntryValue)) {
                return Ok(Value::String(raw.clone()));
            }
            if raw.eq_ignore_ascii_case("true") {
                Ok(Value::Boolean(true))
            } else if raw.eq_ignore_ascii_case("false") {
                Ok(Value::Boolean(false))
            } else {
                Ok(Value::String(raw.clone()))
            }
        }
        PrimaryExpr::Number(n) => Ok(Value::Double(*n)),
        PrimaryExpr::Property(_) => Err(Error::unsupported(
            "property references are not allowed as comparison values",
            literal,
        )),
        PrimaryExpr::ContextItem => Err(Error::unsupported(
            "the context item is not allowed as a comparison value",
            literal,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::QName;
    use crate::error::ErrorKind;
    use crate::model::CoreProperty;

    const FMT: &str = "%Y-%m-%d";

    fn lit(s: &str) -> PrimaryExpr {
        PrimaryExpr::literal(s)
    }

    #[test]
    fn test_boolean_spelling_is_case_insensitive() {
        let derived = Property::Core(CoreProperty::Derived);
        assert_eq!(coerce(Some(&derived), &lit("true"), FMT).unwrap(), Value::Boolean(true));
        assert_eq!(coerce(Some(&derived), &lit("FALSE"), FMT).unwrap(), Value::Boolean(false));
        assert_eq!(coerce(None, &lit("True"), FMT).unwrap(), Value::Boolean(true));
        assert_eq!(coerce(None, &lit("yes"), FMT).unwrap(), Value::string("yes"));
    }

    #[test]
    fn test_timestamp_context_parses_dates() {
        let created = Property::Core(CoreProperty::CreatedTimestamp);
        assert_eq!(
            coerce(Some(&created), &lit("2014-01-02"), FMT).unwrap(),
            Value::Date(NaiveDate::from_ymd_opt(2014, 1, 2).unwrap())
        );

        let err = coerce(Some(&created), &lit("02/01/2014"), FMT).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedLiteral);

        // a date-looking literal stays a string elsewhere
        let name = Property::Core(CoreProperty::Name);
        assert_eq!(
            coerce(Some(&name), &lit("2014-01-02"), FMT).unwrap(),
            Value::string("2014-01-02")
        );
    }

    #[test]
    fn test_entry_values_stay_strings() {
        assert_eq!(
            coerce(Some(&Property::EntryValue), &lit("true"), FMT).unwrap(),
            Value::string("true")
        );
    }

    #[test]
    fn test_numbers_and_rejected_primaries() {
        assert_eq!(coerce(None, &PrimaryExpr::Number(42.0), FMT).unwrap(), Value::Double(42.0));

        let err = coerce(None, &PrimaryExpr::Property(QName::new("name")), FMT).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFeature);
        let err = coerce(None, &PrimaryExpr::ContextItem, FMT).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFeature);
    }
}
