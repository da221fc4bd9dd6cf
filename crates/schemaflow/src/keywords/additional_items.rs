use serde_json::{Map, Value};

use crate::{
    compiler,
    error::EvaluationError,
    evaluation::{EvalContext, Evaluation},
    graph::{ConstraintId, Evaluate},
    keywords::{BuiltinKeyword, CompilationResult},
    paths::keyword,
};

/// Pre-2020 companion of the array form of `items`: applies to the elements
/// past the positional subschemas, discovered through the `items` annotation.
pub(crate) struct AdditionalItemsConstraint {
    target: ConstraintId,
    forbids: bool,
}

impl Evaluate for AdditionalItemsConstraint {
    fn evaluate<'a>(
        &'a self,
        ctx: &mut EvalContext<'a>,
        instance: &Value,
        node: &mut Evaluation,
    ) -> Result<(), EvaluationError> {
        let Value::Array(items) = instance else {
            return Ok(());
        };
        let skip = match node.annotation("items") {
            Some(Value::Number(max_index)) => {
                max_index.as_u64().map_or(0, |index| index as usize + 1)
            }
            // Either every element was already covered or `items` itself
            // failed; nothing to do in both cases
            _ => return Ok(()),
        };
        let mut valid = true;
        let mut applied = false;
        for (index, item) in items.iter().enumerate().skip(skip) {
            if ctx.is_cancelled() {
                return Ok(());
            }
            let child = ctx.apply(
                self.target,
                item,
                node.evaluation_path().clone_with(keyword("additionalItems")),
                node.instance_location().clone_with(index),
            )?;
            valid &= child.valid();
            applied = true;
            node.attach(BuiltinKeyword::AdditionalItems.into(), child);
            if !valid && ctx.stops_on_first_error() {
                break;
            }
        }
        if valid {
            if applied {
                node.annotate(BuiltinKeyword::AdditionalItems.into(), Value::Bool(true));
            }
        } else if self.forbids {
            node.fail(
                BuiltinKeyword::AdditionalItems.into(),
                format!("Additional items are not allowed ({skip} items were expected at most)"),
            );
        } else {
            node.mark_invalid();
        }
        Ok(())
    }
}

pub(crate) fn compile(
    ctx: &compiler::Context<'_>,
    parent: &Map<String, Value>,
    value: &Value,
) -> Option<CompilationResult> {
    // Only meaningful next to the array form of `items`
    if !parent.get("items").is_some_and(Value::is_array) {
        return None;
    }
    let kctx = ctx.new_at_location("additionalItems");
    match compiler::compile(&kctx, kctx.as_resource_ref(value)) {
        Ok(target) => Some(Ok(Box::new(AdditionalItemsConstraint {
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
        &json!({"items": [{"type": "string"}], "additionalItems": {"type": "integer"}}),
        &json!(["x", 1, 2])
    )]
    #[test_case(
        &json!({"items": [{"type": "string"}], "additionalItems": false}),
        &json!(["x"])
    )]
    #[test_case(
        &json!({"additionalItems": false}),
        &json!([1, 2]);
        "inert without the array form of items"
    )]
    #[test_case(
        &json!({"items": {"type": "integer"}, "additionalItems": false}),
        &json!([1, 2]);
        "inert next to the object form of items"
    )]
    fn valid(schema: &Value, instance: &Value) {
        tests_util::is_valid_with_draft(referencing::Draft::Draft7, schema, instance);
    }

    #[test_case(
        &json!({"items": [{"type": "string"}], "additionalItems": {"type": "integer"}}),
        &json!(["x", "y"])
    )]
    #[test_case(
        &json!({"items": [{"type": "string"}], "additionalItems": false}),
        &json!(["x", 1])
    )]
    fn invalid(schema: &Value, instance: &Value) {
        tests_util::is_not_valid_with_draft(referencing::Draft::Draft7, schema, instance);
    }
}
