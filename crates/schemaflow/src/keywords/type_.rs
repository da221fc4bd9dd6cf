use std::fmt::Write;

use serde_json::{Map, Value};

use crate::{
    compiler,
    error::{EvaluationError, SchemaError},
    evaluation::{EvalContext, Evaluation},
    graph::Evaluate,
    keywords::{BuiltinKeyword, CompilationResult},
    primitive_type::{PrimitiveType, PrimitiveTypesBitMap},
};

pub(crate) struct TypeConstraint {
    types: PrimitiveTypesBitMap,
}

impl Evaluate for TypeConstraint {
    fn evaluate<'a>(
        &'a self,
        _: &mut EvalContext<'a>,
        instance: &Value,
        node: &mut Evaluation,
    ) -> Result<(), EvaluationError> {
        if !self.types.is_valid(instance) {
            node.fail(BuiltinKeyword::Type.into(), self.message(instance));
        }
        Ok(())
    }
}

impl TypeConstraint {
    fn message(&self, instance: &Value) -> String {
        let expected: Vec<PrimitiveType> = self.types.iter().collect();
        if let [single] = expected.as_slice() {
            format!("{instance} is not of type \"{single}\"")
        } else {
            let mut message = format!("{instance} is not of types ");
            for (index, primitive_type) in expected.iter().enumerate() {
                if index > 0 {
                    message.push_str(", ");
                }
                let _ = write!(message, "\"{primitive_type}\"");
            }
            message
        }
    }
}

pub(crate) fn compile(
    ctx: &compiler::Context<'_>,
    _: &Map<String, Value>,
    value: &Value,
) -> Option<CompilationResult> {
    let mut types = PrimitiveTypesBitMap::new();
    match value {
        Value::String(name) => match name.parse::<PrimitiveType>() {
            Ok(primitive_type) => types = types.add_type(primitive_type),
            Err(()) => return Some(Err(invalid_type_name(ctx, value))),
        },
        Value::Array(names) => {
            for name in names {
                match name.as_str().map(str::parse) {
                    Some(Ok(primitive_type)) => types = types.add_type(primitive_type),
                    _ => return Some(Err(invalid_type_name(ctx, name))),
                }
            }
        }
        _ => {
            return Some(Err(SchemaError::parse(
                ctx.schema_location(),
                format!("{value} is not of types \"array\", \"string\""),
            )))
        }
    }
    Some(Ok(Box::new(TypeConstraint { types })))
}

fn invalid_type_name(ctx: &compiler::Context<'_>, value: &Value) -> SchemaError {
    SchemaError::parse(
        ctx.schema_location(),
        format!("{value} is not a valid JSON type name"),
    )
}

#[cfg(test)]
mod tests {
    use crate::tests_util;
    use serde_json::{json, Value};
    use test_case::test_case;

    #[test_case(&json!({"type": "integer"}), &json!(1))]
    #[test_case(&json!({"type": "integer"}), &json!(1.0); "integer valued float")]
    #[test_case(&json!({"type": "number"}), &json!(1))]
    #[test_case(&json!({"type": ["integer", "string"]}), &json!("a"))]
    #[test_case(&json!({"type": "null"}), &json!(null))]
    fn valid(schema: &Value, instance: &Value) {
        tests_util::is_valid(schema, instance);
    }

    #[test_case(&json!({"type": "integer"}), &json!(1.1), "1.1 is not of type \"integer\"")]
    #[test_case(&json!({"type": ["integer", "string"]}), &json!(null), "null is not of types \"integer\", \"string\"")]
    fn error_message(schema: &Value, instance: &Value, expected: &str) {
        tests_util::assert_error_message(schema, instance, expected);
    }

    #[test]
    fn malformed_type() {
        tests_util::is_schema_error(&json!({"type": "wat"}));
        tests_util::is_schema_error(&json!({"type": 1}));
    }
}
