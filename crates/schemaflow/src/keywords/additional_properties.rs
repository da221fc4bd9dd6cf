use ahash::AHashSet;
use serde_json::{Map, Value};

use crate::{
    compiler,
    error::EvaluationError,
    evaluation::{EvalContext, Evaluation},
    graph::{ConstraintId, Evaluate},
    keywords::{helpers, BuiltinKeyword, CompilationResult},
    paths::keyword,
};

/// Applies its subschema to every property not already claimed by the
/// sibling `properties` or `patternProperties`, which it discovers through
/// their annotations on the node under construction.
pub(crate) struct AdditionalPropertiesConstraint {
    target: ConstraintId,
    /// The subschema is the `false` schema, so failures are reported as
    /// unexpected properties rather than through child errors.
    forbids: bool,
}

fn names_from_annotation(value: Option<&Value>, into: &mut AHashSet<String>) {
    if let Some(Value::Array(names)) = value {
        for name in names {
            if let Value::String(name) = name {
                into.insert(name.clone());
            }
        }
    }
}

impl Evaluate for AdditionalPropertiesConstraint {
    fn evaluate<'a>(
        &'a self,
        ctx: &mut EvalContext<'a>,
        instance: &Value,
        node: &mut Evaluation,
    ) -> Result<(), EvaluationError> {
        let Value::Object(object) = instance else {
            return Ok(());
        };
        let mut covered = AHashSet::new();
        names_from_annotation(node.annotation("properties"), &mut covered);
        names_from_annotation(node.annotation("patternProperties"), &mut covered);

        let mut applied = Vec::new();
        let mut unexpected = Vec::new();
        for (name, value) in object {
            if covered.contains(name.as_str()) {
                continue;
            }
            if ctx.is_cancelled() {
                return Ok(());
            }
            let child = ctx.apply(
                self.target,
                value,
                node.evaluation_path()
                    .clone_with(keyword("additionalProperties"))
                    .clone_with(name.as_str()),
                node.instance_location().clone_with(name.as_str()),
            )?;
            if !child.valid() {
                unexpected.push(name.clone());
            }
            applied.push(Value::String(name.clone()));
            node.attach(BuiltinKeyword::AdditionalProperties.into(), child);
            if !unexpected.is_empty() && ctx.stops_on_first_error() {
                break;
            }
        }
        if unexpected.is_empty() {
            node.annotate(
                BuiltinKeyword::AdditionalProperties.into(),
                Value::Array(applied),
            );
        } else if self.forbids {
            let detail = if unexpected.len() == 1 { "was" } else { "were" };
            node.fail(
                BuiltinKeyword::AdditionalProperties.into(),
                format!(
                    "Additional properties are not allowed ({} {detail} unexpected)",
                    helpers::quoted_list(&unexpected)
                ),
            );
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
    let kctx = ctx.new_at_location("additionalProperties");
    match compiler::compile(&kctx, kctx.as_resource_ref(value)) {
        Ok(target) => Some(Ok(Box::new(AdditionalPropertiesConstraint {
            target,
            forbids: value == &Value::Bool(false),
        }))),
        Err(error) => Some(Err(error)),
    }
}

#[cfg(test)]
mod tests {
    use crate::tests_util;
    use serde_json::{json, Value};
    use test_case::test_case;

    #[test_case(&json!({"additionalProperties": false}), &json!({}))]
    #[test_case(&json!({"additionalProperties": {"type": "string"}}), &json!({"a": "x"}))]
    #[test_case(
        &json!({"properties": {"foo": {}}, "additionalProperties": false}),
        &json!({"foo": 1})
    )]
    #[test_case(
        &json!({"patternProperties": {"^v": {}}, "additionalProperties": false}),
        &json!({"v1": 1, "v2": 2})
    )]
    fn valid(schema: &Value, instance: &Value) {
        tests_util::is_valid(schema, instance);
    }

    #[test_case(&json!({"additionalProperties": false}), &json!({"a": 1}))]
    #[test_case(&json!({"additionalProperties": {"type": "string"}}), &json!({"a": 1}))]
    #[test_case(
        &json!({"properties": {"foo": {}}, "additionalProperties": {"type": "integer"}}),
        &json!({"foo": "anything", "bar": "x"})
    )]
    fn invalid(schema: &Value, instance: &Value) {
        tests_util::is_not_valid(schema, instance);
    }

    #[test]
    fn error_message() {
        tests_util::assert_error_message(
            &json!({
                "properties": {"foo": {}, "bar": {}},
                "patternProperties": {"^v": {}},
                "additionalProperties": false
            }),
            &json!({"foo": 1, "bar": 2, "quux": "boom"}),
            "Additional properties are not allowed ('quux' was unexpected)",
        );
    }
}
