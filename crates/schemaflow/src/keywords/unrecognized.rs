use serde_json::Value;

use crate::{
    error::EvaluationError,
    evaluation::{EvalContext, Evaluation},
    graph::Evaluate,
    keywords::Keyword,
};

/// An unrecognized keyword: always valid, annotates with the raw value so
/// that unknown annotations round-trip through the output.
pub(crate) struct UnrecognizedConstraint {
    keyword: Keyword,
    value: Value,
}

impl UnrecognizedConstraint {
    pub(crate) fn new(name: &str, value: Value) -> Self {
        UnrecognizedConstraint {
            keyword: Keyword::custom(name),
            value,
        }
    }
}

impl Evaluate for UnrecognizedConstraint {
    fn evaluate<'a>(
        &'a self,
        _: &mut EvalContext<'a>,
        _: &Value,
        node: &mut Evaluation,
    ) -> Result<(), EvaluationError> {
        node.annotate(self.keyword.clone(), self.value.clone());
        Ok(())
    }
}
