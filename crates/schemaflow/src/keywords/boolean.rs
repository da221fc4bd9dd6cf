use serde_json::Value;

use crate::{
    error::EvaluationError,
    evaluation::{EvalContext, Evaluation},
    graph::Evaluate,
    keywords::Keyword,
};

/// The compiled form of the `false` schema: nothing is valid.
pub(crate) struct FalseConstraint;

impl Evaluate for FalseConstraint {
    fn evaluate<'a>(
        &'a self,
        _: &mut EvalContext<'a>,
        instance: &Value,
        node: &mut Evaluation,
    ) -> Result<(), EvaluationError> {
        node.fail(
            Keyword::Schema,
            format!("False schema does not allow {instance}"),
        );
        Ok(())
    }
}
