use serde_json::{Map, Value};

use crate::{
    compiler,
    error::EvaluationError,
    evaluation::{EvalContext, Evaluation},
    graph::{ConstraintId, Evaluate},
    keywords::{all_of, prefix_items, BuiltinKeyword, CompilationResult},
    paths::keyword,
};

pub(crate) struct OneOfConstraint {
    targets: Vec<ConstraintId>,
}

impl Evaluate for OneOfConstraint {
    fn evaluate<'a>(
        &'a self,
        ctx: &mut EvalContext<'a>,
        instance: &Value,
        node: &mut Evaluation,
    ) -> Result<(), EvaluationError> {
        // Exactly-one-valid requires every branch to run, even in
        // fail-fast mode
        let mut valid_count = 0_usize;
        for (index, target) in self.targets.iter().enumerate() {
            if ctx.is_cancelled() {
                return Ok(());
            }
            let child = ctx.apply(
                *target,
                instance,
                node.evaluation_path()
                    .clone_with(keyword("oneOf"))
                    .clone_with(index),
                node.instance_location().clone(),
            )?;
            if child.valid() {
                valid_count += 1;
            }
            node.attach(BuiltinKeyword::OneOf.into(), child);
        }
        match valid_count {
            1 => {}
            0 => node.fail(
                BuiltinKeyword::OneOf.into(),
                format!("{instance} is not valid under any of the schemas listed in the 'oneOf' keyword"),
            ),
            _ => node.fail(
                BuiltinKeyword::OneOf.into(),
                format!("{instance} is valid under more than one of the schemas listed in the 'oneOf' keyword"),
            ),
        }
        Ok(())
    }
}

pub(crate) fn compile(
    ctx: &compiler::Context<'_>,
    _: &Map<String, Value>,
    value: &Value,
) -> Option<CompilationResult> {
    Some(
        all_of::parse_schema_list(ctx, value)
            .and_then(|schemas| prefix_items::compile_list(ctx, "oneOf", schemas))
            .map(|targets| Box::new(OneOfConstraint { targets }) as crate::graph::BoxedConstraint),
    )
}
