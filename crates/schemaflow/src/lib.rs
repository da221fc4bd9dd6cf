//! A JSON Schema evaluator built around an annotation-aware constraint
//! graph.
//!
//! Schemas compile into an arena of keyword constraints ordered by their
//! sibling dependencies; evaluation walks the graph, producing a tree of
//! [`Evaluation`] nodes carrying per-keyword annotations and errors, which
//! projects into the four standard output formats.
//!
//! ## Supported drafts
//!
//! Draft 6, Draft 7, Draft 2019-09, Draft 2020-12 (default), and the
//! draft-next track.
//!
//! # Validation
//!
//! For one-off checks use [`is_valid`]:
//!
//! ```rust
//! use serde_json::json;
//!
//! let schema = json!({"maxLength": 5});
//! assert!(schemaflow::is_valid(&schema, &json!("foo")));
//! ```
//!
//! For repeated evaluation against the same schema, compile once:
//!
//! ```rust
//! use serde_json::json;
//!
//! let schema = json!({"type": "object", "required": ["name"]});
//! let evaluator = schemaflow::evaluator_for(&schema).expect("A valid schema");
//!
//! assert!(evaluator.is_valid(&json!({"name": "Box"})));
//! assert!(!evaluator.is_valid(&json!({})));
//! ```
//!
//! # Output formats
//!
//! [`Evaluator::apply`] defers evaluation until one of the formats is
//! requested:
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use serde_json::json;
//!
//! let schema = json!({"allOf": [{"type": "string"}, {"minLength": 3}]});
//! let evaluator = schemaflow::evaluator_for(&schema)?;
//!
//! let instance = json!("ab");
//! let output = evaluator.apply(&instance);
//! assert!(!output.flag()?.valid);
//! let basic = output.basic()?;
//! assert_eq!(basic.details().len(), 3);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! [`options`] returns a builder covering the draft override, extra
//! resources, the external-reference retriever, custom formats, and custom
//! keywords:
//!
//! ```rust
//! use schemaflow::Draft;
//! use serde_json::json;
//!
//! let evaluator = schemaflow::options()
//!     .with_draft(Draft::Draft7)
//!     .should_validate_formats(true)
//!     .build(&json!({"format": "ipv4"}))
//!     .expect("A valid schema");
//! assert!(!evaluator.is_valid(&json!("not an ip")));
//! ```
mod compiler;
mod ecma;
pub mod error;
mod evaluation;
mod evaluator;
mod graph;
mod keywords;
mod options;
pub mod output;
pub mod paths;
pub mod primitive_type;

pub use error::{EvaluationError, SchemaError};
pub use evaluation::{CancellationToken, Evaluation, ShortCircuit};
pub use evaluator::Evaluator;
pub use keywords::{
    custom::{CustomKeyword, KeywordFactory},
    BuiltinKeyword, Keyword,
};
pub use options::EvaluationOptions;
pub use output::{BasicOutput, Flag, Output, OutputUnit};
pub use referencing::{Draft, Registry, Resource, Retrieve, Uri, UriRef};

use serde_json::Value;

/// Validate `instance` against `schema` in one call, detecting the draft
/// automatically.
///
/// ```rust
/// use serde_json::json;
///
/// assert!(schemaflow::is_valid(&json!({"minimum": 5}), &json!(7)));
/// ```
///
/// # Panics
///
/// Panics on an invalid schema; build an [`Evaluator`] to handle schema
/// errors.
#[must_use]
#[inline]
pub fn is_valid(schema: &Value, instance: &Value) -> bool {
    evaluator_for(schema)
        .expect("Invalid schema")
        .is_valid(instance)
}

/// Compile `schema` into a reusable [`Evaluator`] with the default options.
pub fn evaluator_for(schema: &Value) -> Result<Evaluator, SchemaError> {
    Evaluator::new(schema)
}

/// Default [`EvaluationOptions`] to configure and build an [`Evaluator`].
#[must_use]
pub fn options() -> EvaluationOptions {
    EvaluationOptions::default()
}


#[cfg(test)]
mod tests {
    use super::is_valid;
    use serde_json::json;
    use test_case::test_case;

    #[test]
    fn one_off_validation() {
        let schema = json!({"minLength": 5});
        assert!(is_valid(&schema, &json!("foobar")));
        assert!(!is_valid(&schema, &json!("foo")));
    }

    #[test_case(&json!(true), &json!(42), true; "true schema accepts everything")]
    #[test_case(&json!(false), &json!(42), false; "false schema rejects everything")]
    #[test_case(&json!({}), &json!([1, 2]), true; "empty schema accepts everything")]
    fn boolean_schemas(schema: &serde_json::Value, instance: &serde_json::Value, expected: bool) {
        assert_eq!(is_valid(schema, instance), expected);
    }

    #[test]
    fn non_object_schema_is_rejected() {
        assert!(super::evaluator_for(&json!([1])).is_err());
    }

    #[test]
    fn unknown_dialects_are_rejected_by_default() {
        let schema = json!({"$schema": "https://example.com/unknown"});
        assert!(matches!(
            super::evaluator_for(&schema),
            Err(super::SchemaError::UnknownSpecification { .. })
        ));
        assert!(super::options()
            .allow_unknown_dialects(true)
            .build(&schema)
            .is_ok());
    }
}
