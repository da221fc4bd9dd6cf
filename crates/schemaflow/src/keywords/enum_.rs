use serde_json::{Map, Value};

use crate::{
    compiler,
    error::{EvaluationError, SchemaError},
    evaluation::{EvalContext, Evaluation},
    graph::Evaluate,
    keywords::{helpers, BuiltinKeyword, CompilationResult},
};

pub(crate) struct EnumConstraint {
    options: Vec<Value>,
    raw: Value,
}

impl Evaluate for EnumConstraint {
    fn evaluate<'a>(
        &'a self,
        _: &mut EvalContext<'a>,
        instance: &Value,
        node: &mut Evaluation,
    ) -> Result<(), EvaluationError> {
        if !self
            .options
            .iter()
            .any(|option| helpers::equal(option, instance))
        {
            node.fail(
                BuiltinKeyword::Enum.into(),
                format!("{instance} is not one of {}", self.raw),
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
    if let Value::Array(options) = value {
        Some(Ok(Box::new(EnumConstraint {
            options: options.clone(),
            raw: value.clone(),
        })))
    } else {
        Some(Err(SchemaError::parse(
            ctx.schema_location(),
            format!("{value} is not of type \"array\""),
        )))
    }
}

#[cfg(test)]
mod tests {
    use crate::tests_util;
    use serde_json::{json, Value};
    use test_case::test_case;

    #[test_case(&json!({"enum": [1, 2, 3]}), &json!(2))]
    #[test_case(&json!({"enum": [0.0]}), &json!(0))]
    #[test_case(&json!({"enum": [[{"b": 1.0}]]}), &json!([{"b": 1}]))]
    #[test_case(&json!({"enum": []}), &json!(1); "empty enum rejects")]
    fn behaviour(schema: &Value, instance: &Value) {
        if schema["enum"].as_array().is_some_and(Vec::is_empty) {
            tests_util::is_not_valid(schema, instance);
        } else {
            tests_util::is_valid(schema, instance);
        }
    }

    #[test]
    fn error_message() {
        tests_util::assert_error_message(
            &json!({"enum": [1, 2, 3]}),
            &json!(4),
            "4 is not one of [1,2,3]",
        );
    }
}
