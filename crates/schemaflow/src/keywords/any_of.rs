use serde_json::{Map, Value};

use crate::{
    compiler,
    error::EvaluationError,
    evaluation::{EvalContext, Evaluation},
    graph::{ConstraintId, Evaluate},
    keywords::{all_of, prefix_items, BuiltinKeyword, CompilationResult},
    paths::keyword,
};

pub(crate) struct AnyOfConstraint {
    targets: Vec<ConstraintId>,
}

impl Evaluate for AnyOfConstraint {
    fn evaluate<'a>(
        &'a self,
        ctx: &mut EvalContext<'a>,
        instance: &Value,
        node: &mut Evaluation,
    ) -> Result<(), EvaluationError> {
        let mut any_valid = false;
        for (index, target) in self.targets.iter().enumerate() {
            if ctx.is_cancelled() {
                return Ok(());
            }
            let child = ctx.apply(
                *target,
                instance,
                node.evaluation_path()
                    .clone_with(keyword("anyOf"))
                    .clone_with(index),
                node.instance_location().clone(),
            )?;
            any_valid |= child.valid();
            node.attach(BuiltinKeyword::AnyOf.into(), child);
            if any_valid && ctx.stops_on_first_error() {
                break;
            }
        }
        if !any_valid {
            node.fail(
                BuiltinKeyword::AnyOf.into(),
                format!("{instance} is not valid under any of the schemas listed in the 'anyOf' keyword"),
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
    Some(
        all_of::parse_schema_list(ctx, value)
            .and_then(|schemas| prefix_items::compile_list(ctx, "anyOf", schemas))
            .map(|targets| Box::new(AnyOfConstraint { targets }) as crate::graph::BoxedConstraint),
    )
}

#[cfg(test)]
mod tests {
    use crate::tests_util;
    use serde_json::{json, Value};
    use test_case::test_case;

    #[test_case(&json!({"anyOf": [{"type": "integer"}, {"minimum": 2}]}), &json!(1))]
    #[test_case(&json!({"anyOf": [{"type": "integer"}, {"minimum": 2}]}), &json!(2.5))]
    fn valid(schema: &Value, instance: &Value) {
        tests_util::is_valid(schema, instance);
    }

    #[test]
    fn error_message() {
        tests_util::assert_error_message(
            &json!({"anyOf": [{"type": "integer"}, {"minimum": 2}]}),
            &json!(1.5),
            "1.5 is not valid under any of the schemas listed in the 'anyOf' keyword",
        );
    }

    #[test]
    fn disjunction_of_branches() {
        let schema = json!({"anyOf": [{"maximum": 2}, {"minimum": 5}]});
        for (instance, expected) in [(json!(1), true), (json!(6), true), (json!(3), false)] {
            assert_eq!(tests_util::evaluate(&schema, &instance).valid(), expected);
        }
    }
}
