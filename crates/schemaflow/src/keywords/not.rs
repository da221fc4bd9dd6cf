use serde_json::{Map, Value};

use crate::{
    compiler,
    error::EvaluationError,
    evaluation::{EvalContext, Evaluation},
    graph::{ConstraintId, Evaluate},
    keywords::{BuiltinKeyword, CompilationResult},
    paths::keyword,
};

pub(crate) struct NotConstraint {
    target: ConstraintId,
    raw: Value,
}

impl Evaluate for NotConstraint {
    fn evaluate<'a>(
        &'a self,
        ctx: &mut EvalContext<'a>,
        instance: &Value,
        node: &mut Evaluation,
    ) -> Result<(), EvaluationError> {
        let child = ctx.apply(
            self.target,
            instance,
            node.evaluation_path().clone_with(keyword("not")),
            node.instance_location().clone(),
        )?;
        let negated_held = child.valid();
        node.attach(BuiltinKeyword::Not.into(), child);
        if negated_held {
            node.fail(
                BuiltinKeyword::Not.into(),
                format!("{} is not allowed for {instance}", self.raw),
            );
        }
        Ok(())
    }
}

pub(crate) fn compile(
    ctx: &compiler::Context<'_>,
    _: &Map<String, Value>,
    value: &Value,
) -> Option<CompilationResult> {
    let kctx = ctx.new_at_location("not");
    match compiler::compile(&kctx, kctx.as_resource_ref(value)) {
        Ok(target) => Some(Ok(Box::new(NotConstraint {
            target,
            raw: value.clone(),
        }))),
        Err(error) => Some(Err(error)),
    }
}
