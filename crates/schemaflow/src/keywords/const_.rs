use serde_json::{Map, Value};

use crate::{
    compiler,
    error::EvaluationError,
    evaluation::{EvalContext, Evaluation},
    graph::Evaluate,
    keywords::{helpers, BuiltinKeyword, CompilationResult},
};

pub(crate) struct ConstConstraint {
    expected: Value,
}

impl Evaluate for ConstConstraint {
    fn evaluate<'a>(
        &'a self,
        _: &mut EvalContext<'a>,
        instance: &Value,
        node: &mut Evaluation,
    ) -> Result<(), EvaluationError> {
        if !helpers::equal(&self.expected, instance) {
            node.fail(
                BuiltinKeyword::Const.into(),
                format!("{} was expected", self.expected),
            );
        }
        Ok(())
    }
}

pub(crate) fn compile(
    _: &compiler::Context<'_>,
    _: &Map<String, Value>,
    value: &Value,
) -> Option<CompilationResult> {
    Some(Ok(Box::new(ConstConstraint {
        expected: value.clone(),
    })))
}
