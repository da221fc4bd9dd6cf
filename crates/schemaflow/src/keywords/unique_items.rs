use serde_json::{Map, Value};

use crate::{
    compiler,
    error::{EvaluationError, SchemaError},
    evaluation::{EvalContext, Evaluation},
    graph::Evaluate,
    keywords::{helpers, BuiltinKeyword, CompilationResult},
};

pub(crate) struct UniqueItemsConstraint;

pub(crate) fn is_unique(items: &[Value]) -> bool {
    // Pairwise comparison keeps JSON Schema's numeric equivalence (1 == 1.0)
    // without hashing tricks; schemas rarely pair `uniqueItems` with huge
    // arrays
    for (index, item) in items.iter().enumerate() {
        if items[..index].iter().any(|other| helpers::equal(item, other)) {
            return false;
        }
    }
    true
}

impl Evaluate for UniqueItemsConstraint {
    fn evaluate<'a>(
        &'a self,
        _: &mut EvalContext<'a>,
        instance: &Value,
        node: &mut Evaluation,
    ) -> Result<(), EvaluationError> {
        if let Value::Array(items) = instance {
            if !is_unique(items) {
                node.fail(
                    BuiltinKeyword::UniqueItems.into(),
                    format!("{instance} has non-unique elements"),
                );
            }
        }
        Ok(())
    }
}

pub(crate) fn compile(
    ctx: &compiler::Context<'_>,
    _: &Map<String, Value>,
    value: &Value,
) -> Option<CompilationResult> {
    match value {
        Value::Bool(true) => Some(Ok(Box::new(UniqueItemsConstraint))),
        Value::Bool(false) => None,
        _ => Some(Err(SchemaError::parse(
            ctx.schema_location(),
            format!("{value} is not of type \"boolean\""),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use crate::tests_util;
    use serde_json::{json, Value};
    use test_case::test_case;

    #[test_case(&json!({"uniqueItems": true}), &json!([1, 2, 3]))]
    #[test_case(&json!({"uniqueItems": true}), &json!([]))]
    #[test_case(&json!({"uniqueItems": false}), &json!([1, 1]))]
    #[test_case(&json!({"uniqueItems": true}), &json!([{"a": 1}, {"a": 2}]))]
    fn valid(schema: &Value, instance: &Value) {
        tests_util::is_valid(schema, instance);
    }

    #[test_case(&json!({"uniqueItems": true}), &json!([1, 1]))]
    #[test_case(&json!({"uniqueItems": true}), &json!([1, 1.0]); "numeric equivalence")]
    #[test_case(&json!({"uniqueItems": true}), &json!([{"a": 1}, {"a": 1.0}]))]
    fn invalid(schema: &Value, instance: &Value) {
        tests_util::is_not_valid(schema, instance);
    }

    #[test]
    fn error_message() {
        tests_util::assert_error_message(
            &json!({"uniqueItems": true}),
            &json!([1, 1]),
            "[1,1] has non-unique elements",
        );
    }
}
