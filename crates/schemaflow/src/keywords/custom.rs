//! User-defined keywords registered through
//! [`crate::EvaluationOptions::with_keyword`].
use serde_json::{Map, Value};

use crate::{
    error::{EvaluationError, SchemaError},
    evaluation::{EvalContext, Evaluation},
    graph::Evaluate,
    keywords::Keyword,
};

/// Behavior of a user-defined keyword.
pub trait CustomKeyword: Send + Sync {
    /// Whether the instance satisfies this keyword.
    fn is_valid(&self, instance: &Value) -> bool;
    /// Error message reported when [`CustomKeyword::is_valid`] returns `false`.
    fn error_message(&self, instance: &Value) -> String {
        format!("{instance} is not valid")
    }
    /// Annotation produced on success, if any.
    fn annotation(&self, _instance: &Value) -> Option<Value> {
        None
    }
}

/// Builds [`CustomKeyword`] instances during compilation.
pub trait KeywordFactory: Send + Sync {
    /// Deserialize the keyword value into its runtime form.
    ///
    /// # Errors
    ///
    /// Returns an error if the keyword value has the wrong shape.
    fn init(
        &self,
        parent: &Map<String, Value>,
        value: &Value,
        location: &str,
    ) -> Result<Box<dyn CustomKeyword>, SchemaError>;
}

impl<F> KeywordFactory for F
where
    F: Fn(&Map<String, Value>, &Value, &str) -> Result<Box<dyn CustomKeyword>, SchemaError>
        + Send
        + Sync,
{
    fn init(
        &self,
        parent: &Map<String, Value>,
        value: &Value,
        location: &str,
    ) -> Result<Box<dyn CustomKeyword>, SchemaError> {
        self(parent, value, location)
    }
}

pub(crate) struct CustomConstraint {
    keyword: Keyword,
    inner: Box<dyn CustomKeyword>,
}

impl CustomConstraint {
    pub(crate) fn new(name: &str, inner: Box<dyn CustomKeyword>) -> Self {
        CustomConstraint {
            keyword: Keyword::custom(name),
            inner,
        }
    }
}

impl Evaluate for CustomConstraint {
    fn evaluate<'a>(
        &'a self,
        _: &mut EvalContext<'a>,
        instance: &Value,
        node: &mut Evaluation,
    ) -> Result<(), EvaluationError> {
        if self.inner.is_valid(instance) {
            if let Some(annotation) = self.inner.annotation(instance) {
                node.annotate(self.keyword.clone(), annotation);
            }
        } else {
            node.fail(self.keyword.clone(), self.inner.error_message(instance));
        }
        Ok(())
    }
}
