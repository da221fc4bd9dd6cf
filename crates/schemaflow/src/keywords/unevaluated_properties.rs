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

/// Property-name annotations that mark a property as evaluated at this
/// instance location.
const PROPERTY_ANNOTATIONS: &[&str] = &[
    "properties",
    "patternProperties",
    "additionalProperties",
    "unevaluatedProperties",
];

/// Applies its subschema to every property no in-place applicator evaluated.
///
/// Runs with maximum priority, after every sibling; the set of already
/// evaluated names is the union of the property-name annotations gathered
/// from all valid subschemas applied to this location, including through
/// `$ref`, the `*Of` combinators, `if`/`then`/`else`, and
/// `dependentSchemas`.
pub(crate) struct UnevaluatedPropertiesConstraint {
    target: ConstraintId,
    forbids: bool,
}

impl Evaluate for UnevaluatedPropertiesConstraint {
    fn evaluate<'a>(
        &'a self,
        ctx: &mut EvalContext<'a>,
        instance: &Value,
        node: &mut Evaluation,
    ) -> Result<(), EvaluationError> {
        let Value::Object(object) = instance else {
            return Ok(());
        };
        let mut evaluated = AHashSet::new();
        for annotation in PROPERTY_ANNOTATIONS {
            for value in node.gather(annotation) {
                if let Value::Array(names) = value {
                    for name in names {
                        if let Value::String(name) = name {
                            evaluated.insert(name.clone());
                        }
                    }
                }
            }
        }

        let mut applied = Vec::new();
        let mut unexpected = Vec::new();
        for (name, value) in object {
            if evaluated.contains(name.as_str()) {
                continue;
            }
            if ctx.is_cancelled() {
                return Ok(());
            }
            let child = ctx.apply(
                self.target,
                value,
                node.evaluation_path()
                    .clone_with(keyword("unevaluatedProperties"))
                    .clone_with(name.as_str()),
                node.instance_location().clone_with(name.as_str()),
            )?;
            if !child.valid() {
                unexpected.push(name.clone());
            }
            applied.push(Value::String(name.clone()));
            node.attach(BuiltinKeyword::UnevaluatedProperties.into(), child);
        }
        if unexpected.is_empty() {
            node.annotate(
                BuiltinKeyword::UnevaluatedProperties.into(),
                Value::Array(applied),
            );
        } else if self.forbids {
            let detail = if unexpected.len() == 1 { "was" } else { "were" };
            node.fail(
                BuiltinKeyword::UnevaluatedProperties.into(),
                format!(
                    "Unevaluated properties are not allowed ({} {detail} unexpected)",
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
    let kctx = ctx.new_at_location("unevaluatedProperties");
    match compiler::compile(&kctx, kctx.as_resource_ref(value)) {
        Ok(target) => Some(Ok(Box::new(UnevaluatedPropertiesConstraint {
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

    #[test_case(
        &json!({"properties": {"a": {}}, "unevaluatedProperties": false}),
        &json!({"a": 1})
    )]
    #[test_case(
        &json!({"allOf": [{"properties": {"a": {}}}], "unevaluatedProperties": false}),
        &json!({"a": 1});
        "annotations flow out of allOf"
    )]
    #[test_case(
        &json!({
            "$defs": {"base": {"properties": {"a": {}}}},
            "$ref": "#/$defs/base",
            "unevaluatedProperties": false
        }),
        &json!({"a": 1});
        "annotations flow through ref"
    )]
    #[test_case(
        &json!({
            "if": {"properties": {"kind": {"const": "x"}}, "required": ["kind"]},
            "then": {"properties": {"payload": {}}},
            "unevaluatedProperties": false
        }),
        &json!({"kind": "x", "payload": 1});
        "annotations flow from the taken conditional branch"
    )]
    #[test_case(
        &json!({"unevaluatedProperties": {"type": "integer"}}),
        &json!({"a": 1})
    )]
    fn valid(schema: &Value, instance: &Value) {
        tests_util::is_valid(schema, instance);
    }

    #[test_case(
        &json!({"properties": {"a": {}}, "unevaluatedProperties": false}),
        &json!({"a": 1, "b": 2})
    )]
    #[test_case(
        &json!({
            "anyOf": [{"properties": {"a": {}}, "required": ["a"]}],
            "unevaluatedProperties": false
        }),
        &json!({"b": 2});
        "annotations from failed branches are dropped"
    )]
    fn invalid(schema: &Value, instance: &Value) {
        tests_util::is_not_valid(schema, instance);
    }

    #[test]
    fn error_message() {
        tests_util::assert_error_message(
            &json!({"properties": {"a": {}}, "unevaluatedProperties": false}),
            &json!({"a": 1, "b": 2}),
            "Unevaluated properties are not allowed ('b' was unexpected)",
        );
    }

    #[test]
    fn unevaluated_set_identity() {
        // The names reported unevaluated are exactly the object's keys minus
        // the union of property annotations from valid branches
        let schema = json!({
            "properties": {"a": {}},
            "patternProperties": {"^b": {}},
            "additionalProperties": {"type": "integer"}
        });
        let instance = json!({"a": 1, "b1": 2, "c": 3});
        let evaluation = tests_util::evaluate(&schema, &instance);
        let mut evaluated = std::collections::HashSet::new();
        for name in ["properties", "patternProperties", "additionalProperties"] {
            for value in evaluation.gather(name) {
                for entry in value.as_array().expect("Always an array") {
                    evaluated.insert(entry.as_str().expect("Always a string").to_string());
                }
            }
        }
        let all: std::collections::HashSet<String> = instance
            .as_object()
            .expect("Is an object")
            .keys()
            .cloned()
            .collect();
        assert_eq!(evaluated, all);
    }
}
