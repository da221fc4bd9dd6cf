//! Error types.
//!
//! Schema-author mistakes surface as [`SchemaError`] at build time and
//! runaway reference recursion as [`EvaluationError`] at evaluation time.
//! A failing instance is *not* an error: validation failures are data in the
//! evaluation tree and the output documents.
use core::fmt;

use referencing::Draft;

/// An error raised while building an evaluator from a schema document.
#[derive(Debug)]
pub enum SchemaError {
    /// A keyword value has the wrong shape for its keyword.
    Parse {
        /// Canonical location of the offending schema.
        location: String,
        message: String,
    },
    /// A keyword form is not legal under the active draft.
    DraftIncompatible {
        /// Canonical location of the offending schema.
        location: String,
        draft: Draft,
        message: String,
    },
    /// A `$ref` target cannot be found.
    UnresolvedReference {
        reference: String,
        /// Canonical location of the referencing schema.
        location: String,
        source: referencing::Error,
    },
    /// The `$schema` value names a specification this library does not know.
    UnknownSpecification { specification: String },
    /// Any other reference-resolution failure.
    Referencing(referencing::Error),
}

impl SchemaError {
    pub(crate) fn parse(location: impl Into<String>, message: impl Into<String>) -> SchemaError {
        SchemaError::Parse {
            location: location.into(),
            message: message.into(),
        }
    }
    pub(crate) fn draft_incompatible(
        location: impl Into<String>,
        draft: Draft,
        message: impl Into<String>,
    ) -> SchemaError {
        SchemaError::DraftIncompatible {
            location: location.into(),
            draft,
            message: message.into(),
        }
    }
    pub(crate) fn unresolved_reference(
        reference: impl Into<String>,
        location: impl Into<String>,
        source: referencing::Error,
    ) -> SchemaError {
        SchemaError::UnresolvedReference {
            reference: reference.into(),
            location: location.into(),
            source,
        }
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::Parse { location, message } => {
                f.write_fmt(format_args!("{message} (schema location: {location})"))
            }
            SchemaError::DraftIncompatible {
                location,
                draft,
                message,
            } => f.write_fmt(format_args!(
                "{message} under {draft:?} (schema location: {location})"
            )),
            SchemaError::UnresolvedReference {
                reference,
                location,
                source,
            } => f.write_fmt(format_args!(
                "Failed to resolve '{reference}' (schema location: {location}): {source}"
            )),
            SchemaError::UnknownSpecification { specification } => {
                f.write_fmt(format_args!("Unknown specification: {specification}"))
            }
            SchemaError::Referencing(error) => error.fmt(f),
        }
    }
}

impl std::error::Error for SchemaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SchemaError::UnresolvedReference { source, .. } | SchemaError::Referencing(source) => {
                Some(source)
            }
            _ => None,
        }
    }
}

impl From<referencing::Error> for SchemaError {
    fn from(error: referencing::Error) -> Self {
        if let referencing::Error::UnknownSpecification { specification } = error {
            SchemaError::UnknownSpecification { specification }
        } else {
            SchemaError::Referencing(error)
        }
    }
}

/// An error raised while evaluating an instance.
#[derive(Debug)]
pub enum EvaluationError {
    /// A reference cycle was entered again without consuming any of the
    /// instance, so evaluation could never terminate.
    InfiniteRecursion {
        /// Evaluation path of the re-entered reference.
        evaluation_path: String,
        /// Instance location at which the cycle was detected.
        instance_location: String,
    },
}

impl fmt::Display for EvaluationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluationError::InfiniteRecursion {
                evaluation_path,
                instance_location,
            } => f.write_fmt(format_args!(
                "Infinite recursion at '{evaluation_path}' evaluating instance location '{instance_location}'"
            )),
        }
    }
}

impl std::error::Error for EvaluationError {}
