//! Error types.
//!
//! Failures come in two tiers. [`RefError`] means a ref expression (or the
//! ref storage behind it) does not denote a real commit; callers are expected
//! to let it propagate. [`TagError`] and [`RepositoryError`] carry the
//! anticipated, user-facing failures that the command layer renders as a
//! message and a failure exit code.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading, writing or resolving references.
#[derive(Debug, Error)]
pub enum RefError {
    /// The expression is malformed, names a missing ref, or points at an
    /// object that does not exist.
    #[error("Invalid reference: {expression}")]
    InvalidReference { expression: String },

    /// A symbolic ref is missing or points at a ref that does not exist yet.
    #[error("{}", unresolved_message(.name, .target))]
    UnresolvedSymbolicRef {
        name: String,
        target: Option<String>,
    },

    /// The name cannot be used as a key in the ref store.
    #[error("invalid ref name {name:?}: {reason}")]
    InvalidRefName { name: String, reason: String },

    #[error("ref store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RefError {
    pub(crate) fn invalid_reference(expression: impl Into<String>) -> Self {
        RefError::InvalidReference {
            expression: expression.into(),
        }
    }
}

fn unresolved_message(name: &str, target: &Option<String>) -> String {
    match target {
        Some(target) => format!("Cannot resolve {name}: {target} does not exist yet"),
        None => format!("Cannot resolve {name}: it does not exist"),
    }
}

/// Tag business-rule failures.
#[derive(Debug, Error)]
pub enum TagError {
    #[error("Invalid tag name {name:?}: {reason}")]
    InvalidTagName { name: String, reason: String },

    #[error("Tag \"{name}\" already exists")]
    TagAlreadyExists { name: String },

    #[error("Tag \"{name}\" does not exist")]
    TagNotFound { name: String },

    /// Resolution and storage failures, passed through untouched.
    #[error(transparent)]
    Ref(#[from] RefError),
}

impl TagError {
    /// Separates the two tiers: `Err` carries a [`RefError`] that must keep
    /// propagating, `Ok` an error that may be reported to the user.
    pub fn into_user_error(self) -> Result<TagError, RefError> {
        match self {
            TagError::Ref(err) => Err(err),
            other => Ok(other),
        }
    }
}

/// Repository lifecycle failures.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("No repository found at {}", .path.display())]
    NotInitialized { path: PathBuf },

    #[error("A repository already exists at {}", .path.display())]
    AlreadyInitialized { path: PathBuf },

    #[error("invalid repository config: {0}")]
    Config(String),

    #[error("object store error: {0:#}")]
    Object(anyhow::Error),

    #[error(transparent)]
    Ref(#[from] RefError),

    #[error("repository I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_reference_message_names_the_expression() {
        let err = RefError::invalid_reference("invalid_ref_12345");
        assert_eq!(err.to_string(), "Invalid reference: invalid_ref_12345");
    }

    #[test]
    fn unresolved_symbolic_ref_mentions_target() {
        let err = RefError::UnresolvedSymbolicRef {
            name: "HEAD".to_string(),
            target: Some("refs/heads/main".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Cannot resolve HEAD: refs/heads/main does not exist yet"
        );

        let err = RefError::UnresolvedSymbolicRef {
            name: "HEAD".to_string(),
            target: None,
        };
        assert_eq!(err.to_string(), "Cannot resolve HEAD: it does not exist");
    }

    #[test]
    fn tag_error_is_transparent_over_ref_error() {
        let err: TagError = RefError::invalid_reference("nope").into();
        assert_eq!(err.to_string(), "Invalid reference: nope");
    }

    #[test]
    fn into_user_error_splits_tiers() {
        let err: TagError = RefError::invalid_reference("nope").into();
        assert!(matches!(
            err.into_user_error(),
            Err(RefError::InvalidReference { .. })
        ));

        let err = TagError::TagNotFound {
            name: "v1".to_string(),
        };
        assert!(matches!(
            err.into_user_error(),
            Ok(TagError::TagNotFound { .. })
        ));
    }

    #[test]
    fn not_initialized_message() {
        let err = RepositoryError::NotInitialized {
            path: PathBuf::from("/tmp/nowhere"),
        };
        assert_eq!(err.to_string(), "No repository found at /tmp/nowhere");
    }
}
