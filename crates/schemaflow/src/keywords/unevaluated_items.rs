use ahash::AHashSet;
use serde_json::{Map, Value};

use crate::{
    compiler,
    error::EvaluationError,
    evaluation::{EvalContext, Evaluation},
    graph::{ConstraintId, Evaluate},
    keywords::{BuiltinKeyword, CompilationResult},
    paths::keyword,
};

/// Applies its subschema to the array elements no in-place applicator
/// evaluated, discovered through the `prefixItems`/`items`/
/// `additionalItems`/`contains`/`unevaluatedItems` annotations gathered from
/// valid subschemas at this location.
pub(crate) struct UnevaluatedItemsConstraint {
    target: ConstraintId,
    forbids: bool,
}

impl Evaluate for UnevaluatedItemsConstraint {
    fn evaluate<'a>(
        &'a self,
        ctx: &mut EvalContext<'a>,
        instance: &Value,
        node: &mut Evaluation,
    ) -> Result<(), EvaluationError> {
        let Value::Array(items) = instance else {
            return Ok(());
        };
        let mut prefix_length = 0_usize;
        let mut contained = AHashSet::new();
        for annotation in ["prefixItems", "items", "additionalItems", "unevaluatedItems"] {
            for value in node.gather(annotation) {
                match value {
                    Value::Bool(true) => prefix_length = items.len(),
                    Value::Number(max_index) => {
                        if let Some(index) = max_index.as_u64() {
                            prefix_length = prefix_length.max(index as usize + 1);
                        }
                    }
                    _ => {}
                }
            }
        }
        for value in node.gather("contains") {
            match value {
                Value::Bool(true) => prefix_length = items.len(),
                Value::Array(indices) => {
                    for index in indices {
                        if let Some(index) = index.as_u64() {
                            contained.insert(index as usize);
                        }
                    }
                }
                _ => {}
            }
        }

        let mut applied = false;
        let mut unexpected = 0_usize;
        for (index, item) in items.iter().enumerate().skip(prefix_length) {
            if contained.contains(&index) {
                continue;
            }
            if ctx.is_cancelled() {
                return Ok(());
            }
            let child = ctx.apply(
                self.target,
                item,
                node.evaluation_path().clone_with(keyword("unevaluatedItems")),
                node.instance_location().clone_with(index),
            )?;
            if !child.valid() {
                unexpected += 1;
            }
            applied = true;
            node.attach(BuiltinKeyword::UnevaluatedItems.into(), child);
        }
        if unexpected > 0 {
            if self.forbids {
                let noun = if unexpected == 1 { "item was" } else { "items were" };
                node.fail(
                    BuiltinKeyword::UnevaluatedItems.into(),
                    format!("Unevaluated items are not allowed ({unexpected} {noun} unexpected)"),
                );
            } else {
                node.mark_invalid();
            }
        } else if applied {
            node.annotate(BuiltinKeyword::UnevaluatedItems.into(), Value::Bool(true));
        }
        Ok(())
    }
}

pub(crate) fn compile(
    ctx: &compiler::Context<'_>,
    _: &Map<String, Value>,
    value: &Value,
) -> Option<CompilationResult> {
    let kctx = ctx.new_at_location("unevaluatedItems");
    match compiler::compile(&kctx, kctx.as_resource_ref(value)) {
        Ok(target) => Some(Ok(Box::new(UnevaluatedItemsConstraint {
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
        &json!({"prefixItems": [{}], "unevaluatedItems": false}),
        &json!([1])
    )]
    #[test_case(
        &json!({"prefixItems": [{}], "items": {}, "unevaluatedItems": false}),
        &json!([1, 2, 3]);
        "items covers the rest"
    )]
    #[test_case(
        &json!({"allOf": [{"prefixItems": [{}, {}]}], "unevaluatedItems": false}),
        &json!([1, 2]);
        "annotations flow out of allOf"
    )]
    #[test_case(
        &json!({"contains": {"type": "integer"}, "unevaluatedItems": false}),
        &json!([1, 2]);
        "contained elements count as evaluated"
    )]
    #[test_case(
        &json!({"unevaluatedItems": {"type": "integer"}}),
        &json!([1, 2])
    )]
    fn valid(schema: &Value, instance: &Value) {
        tests_util::is_valid(schema, instance);
    }

    #[test_case(
        &json!({"prefixItems": [{}], "unevaluatedItems": false}),
        &json!([1, 2])
    )]
    #[test_case(
        &json!({"contains": {"type": "integer"}, "unevaluatedItems": false}),
        &json!([1, "x"])
    )]
    #[test_case(
        &json!({"unevaluatedItems": {"type": "integer"}}),
        &json!(["x"])
    )]
    fn invalid(schema: &Value, instance: &Value) {
        tests_util::is_not_valid(schema, instance);
    }

    #[test]
    fn error_message() {
        tests_util::assert_error_message(
            &json!({"prefixItems": [{}], "unevaluatedItems": false}),
            &json!([1, 2]),
            "Unevaluated items are not allowed (1 item was unexpected)",
        );
    }
}
