//! Error and result types for the query compiler.

use artificer_api::{ResolveError, SearchError};

pub type Result<T> = std::result::Result<T, Error>;

/// Every compile failure is fatal to the compile that raised it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unsupported: {message} (in `{fragment}`)")]
    UnsupportedFeature { message: String, fragment: String },

    #[error("malformed literal '{literal}': {reason}")]
    MalformedLiteral { literal: String, reason: String },

    #[error("unresolved reference: {0}")]
    UnresolvedReference(String),

    #[error(transparent)]
    Classification(#[from] ResolveError),

    #[error(transparent)]
    FullText(#[from] SearchError),

    #[error("invalid compiler configuration: {0}")]
    InvalidConfig(String),

    #[error("{backend} backend cannot express {capability}")]
    BackendCapabilityGap {
        backend: &'static str,
        capability: String,
    },
}

/// Coarse classification of [`Error`], for callers that map errors to responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnsupportedFeature,
    MalformedLiteral,
    UnresolvedReference,
    BackendCapabilityGap,
    InvalidConfig,
    External,
}

impl Error {
    pub fn unsupported(message: impl Into<String>, fragment: impl ToString) -> Self {
        Error::UnsupportedFeature {
            message: message.into(),
            fragment: fragment.to_string(),
        }
    }

    pub fn gap(backend: &'static str, capability: impl Into<String>) -> Self {
        Error::BackendCapabilityGap {
            backend,
            capability: capability.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnsupportedFeature { .. } => ErrorKind::UnsupportedFeature,
            Error::MalformedLiteral { .. } => ErrorKind::MalformedLiteral,
            Error::UnresolvedReference(_) | Error::Classification(_) => {
                ErrorKind::UnresolvedReference
            }
            Error::BackendCapabilityGap { .. } => ErrorKind::BackendCapabilityGap,
            Error::InvalidConfig(_) => ErrorKind::InvalidConfig,
            Error::FullText(_) => ErrorKind::External,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        let err = Error::unsupported("nested subartifact sets", "a[b[c]]");
        assert_eq!(err.kind(), ErrorKind::UnsupportedFeature);
        assert_eq!(
            err.to_string(),
            "unsupported: nested subartifact sets (in `a[b[c]]`)"
        );

        let err: Error = ResolveError::Unknown("Mars".into()).into();
        assert_eq!(err.kind(), ErrorKind::UnresolvedReference);
        assert_eq!(err.to_string(), "unknown classification: Mars");

        let err: Error = SearchError::Backend("index offline".into()).into();
        assert_eq!(err.kind(), ErrorKind::External);
    }
}
