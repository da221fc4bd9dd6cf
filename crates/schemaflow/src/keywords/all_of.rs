use serde_json::{Map, Value};

use crate::{
    compiler,
    error::{EvaluationError, SchemaError},
    evaluation::{EvalContext, Evaluation},
    graph::{ConstraintId, Evaluate},
    keywords::{prefix_items, BuiltinKeyword, CompilationResult},
    paths::keyword,
};

pub(crate) struct AllOfConstraint {
    targets: Vec<ConstraintId>,
}

impl Evaluate for AllOfConstraint {
    fn evaluate<'a>(
        &'a self,
        ctx: &mut EvalContext<'a>,
        instance: &Value,
        node: &mut Evaluation,
    ) -> Result<(), EvaluationError> {
        let mut valid = true;
        for (index, target) in self.targets.iter().enumerate() {
            if ctx.is_cancelled() {
                return Ok(());
            }
            let child = ctx.apply(
                *target,
                instance,
                node.evaluation_path()
                    .clone_with(keyword("allOf"))
                    .clone_with(index),
                node.instance_location().clone(),
            )?;
            valid &= child.valid();
            node.attach(BuiltinKeyword::AllOf.into(), child);
            if !valid && ctx.stops_on_first_error() {
                break;
            }
        }
        if !valid {
            node.mark_invalid();
        }
        Ok(())
    }
}

pub(crate) fn parse_schema_list<'s>(
    ctx: &compiler::Context<'_>,
    value: &'s Value,
) -> Result<&'s Vec<Value>, SchemaError> {
    if let Value::Array(schemas) = value {
        Ok(schemas)
    } else {
        Err(SchemaError::parse(
            ctx.schema_location(),
            format!("{value} is not of type \"array\""),
        ))
    }
}

pub(crate) fn compile(
    ctx: &compiler::Context<'_>,
    _: &Map<String, Value>,
    value: &Value,
) -> Option<CompilationResult> {
    Some(
        parse_schema_list(ctx, value)
            .and_then(|schemas| prefix_items::compile_list(ctx, "allOf", schemas))
            .map(|targets| Box::new(AllOfConstraint { targets }) as crate::graph::BoxedConstraint),
    )
}

#[cfg(test)]
mod tests {
    use crate::tests_util;
    use serde_json::{json, Value};
    use test_case::test_case;

    #[test_case(&json!({"allOf": [{"type": "string"}, {"minLength": 3}]}), &json!("abc"))]
    #[test_case(&json!({"allOf": []}), &json!(1))]
    fn valid(schema: &Value, instance: &Value) {
        tests_util::is_valid(schema, instance);
    }

    #[test_case(&json!({"allOf": [{"type": "string"}, {"minLength": 3}]}), &json!("ab"))]
    #[test_case(&json!({"allOf": [{"type": "string"}, {"minLength": 3}]}), &json!(5))]
    fn invalid(schema: &Value, instance: &Value) {
        tests_util::is_not_valid(schema, instance);
    }

    #[test]
    fn conjunction_of_branches() {
        // allOf == AND over its branches
        let schema = json!({"allOf": [{"minimum": 2}, {"maximum": 5}]});
        for (instance, expected) in [(json!(3), true), (json!(1), false), (json!(6), false)] {
            assert_eq!(tests_util::evaluate(&schema, &instance).valid(), expected);
        }
    }

    #[test]
    fn malformed_all_of() {
        tests_util::is_schema_error(&json!({"allOf": {"type": "string"}}));
    }
}
