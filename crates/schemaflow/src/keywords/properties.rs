use serde_json::{Map, Value};

use crate::{
    compiler,
    error::{EvaluationError, SchemaError},
    evaluation::{EvalContext, Evaluation},
    graph::{ConstraintId, Evaluate},
    keywords::{BuiltinKeyword, CompilationResult},
    paths::keyword,
};

pub(crate) struct PropertiesConstraint {
    properties: Vec<(String, ConstraintId)>,
}

impl Evaluate for PropertiesConstraint {
    fn evaluate<'a>(
        &'a self,
        ctx: &mut EvalContext<'a>,
        instance: &Value,
        node: &mut Evaluation,
    ) -> Result<(), EvaluationError> {
        let Value::Object(object) = instance else {
            return Ok(());
        };
        let mut applied = Vec::new();
        let mut valid = true;
        for (name, target) in &self.properties {
            let Some(value) = object.get(name) else {
                continue;
            };
            if ctx.is_cancelled() {
                return Ok(());
            }
            let child = ctx.apply(
                *target,
                value,
                node.evaluation_path()
                    .clone_with(keyword("properties"))
                    .clone_with(name.as_str()),
                node.instance_location().clone_with(name.as_str()),
            )?;
            valid &= child.valid();
            applied.push(Value::String(name.clone()));
            node.attach(BuiltinKeyword::Properties.into(), child);
            if !valid && ctx.stops_on_first_error() {
                break;
            }
        }
        if valid {
            // The names this keyword evaluated, consumed by
            // `additionalProperties` and `unevaluatedProperties`
            node.annotate(BuiltinKeyword::Properties.into(), Value::Array(applied));
        } else {
            node.mark_invalid();
        }
        Ok(())
    }
}

pub(crate) fn compile(
    ctx: &compiler::Context<'_>,
    _: &Map<String, Value>,
    value: &Value,
) -> Option<CompilationResult> {
    Some(compile_impl(ctx, value))
}

fn compile_impl(ctx: &compiler::Context<'_>, value: &Value) -> CompilationResult {
    let Value::Object(map) = value else {
        return Err(SchemaError::parse(
            ctx.schema_location(),
            format!("{value} is not of type \"object\""),
        ));
    };
    let kctx = ctx.new_at_location("properties");
    let mut properties = Vec::with_capacity(map.len());
    for (name, subschema) in map {
        let pctx = kctx.new_at_location(name);
        let id = compiler::compile(&pctx, pctx.as_resource_ref(subschema))?;
        properties.push((name.clone(), id));
    }
    Ok(Box::new(PropertiesConstraint { properties }))
}

#[cfg(test)]
mod tests {
    use crate::tests_util;
    use serde_json::{json, Value};
    use test_case::test_case;

    #[test_case(&json!({"properties": {"a": {"type": "integer"}}}), &json!({"a": 1}))]
    #[test_case(&json!({"properties": {"a": {"type": "integer"}}}), &json!({"b": "x"}); "absent properties are fine")]
    #[test_case(&json!({"properties": {"a": {"type": "integer"}}}), &json!(1); "non objects are unconstrained")]
    fn valid(schema: &Value, instance: &Value) {
        tests_util::is_valid(schema, instance);
    }

    #[test]
    fn invalid_property() {
        tests_util::is_not_valid(
            &json!({"properties": {"a": {"type": "integer"}}}),
            &json!({"a": "x"}),
        );
    }

    #[test]
    fn annotation_lists_evaluated_names() {
        let evaluation = tests_util::evaluate(
            &json!({"properties": {"a": {}, "b": {}}}),
            &json!({"a": 1, "c": 2}),
        );
        assert_eq!(
            evaluation.gather("properties"),
            vec![&json!(["a"])],
        );
    }
}
