use serde_json::{Map, Value};

use crate::{
    compiler,
    error::{EvaluationError, SchemaError},
    evaluation::{EvalContext, Evaluation},
    graph::Evaluate,
    keywords::{BuiltinKeyword, CompilationResult},
};

pub(crate) struct MultipleOfConstraint {
    multiple_of: f64,
    raw: Value,
}

impl Evaluate for MultipleOfConstraint {
    fn evaluate<'a>(
        &'a self,
        _: &mut EvalContext<'a>,
        instance: &Value,
        node: &mut Evaluation,
    ) -> Result<(), EvaluationError> {
        if let Value::Number(number) = instance {
            let value = number.as_f64().expect("Always representable");
            // `fract` keeps the sign of the quotient, so compare its
            // magnitude; exact division leaves no fractional part and the
            // epsilon guard absorbs binary representation noise like
            // 0.0075 / 0.0001 from either side
            let remainder = (value / self.multiple_of).fract().abs();
            if !(remainder < f64::EPSILON || remainder > 1. - f64::EPSILON) {
                node.fail(
                    BuiltinKeyword::MultipleOf.into(),
                    format!("{instance} is not a multiple of {}", self.raw),
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
    if let Value::Number(multiple_of) = value {
        let multiple_of = multiple_of.as_f64().expect("Always representable");
        if multiple_of <= 0. {
            return Some(Err(SchemaError::parse(
                ctx.schema_location(),
                format!("{value} is not strictly greater than 0"),
            )));
        }
        Some(Ok(Box::new(MultipleOfConstraint {
            multiple_of,
            raw: value.clone(),
        })))
    } else {
        Some(Err(SchemaError::parse(
            ctx.schema_location(),
            format!("{value} is not of type \"number\""),
        )))
    }
}

#[cfg(test)]
mod tests {
    use crate::tests_util;
    use serde_json::{json, Value};
    use test_case::test_case;

    #[test_case(&json!({"multipleOf": 2}), &json!(4); "multiple of 2 is 4 int")]
    #[test_case(&json!({"multipleOf": 2}), &json!(4.0); "multiple of 2 is 4 float")]
    #[test_case(&json!({"multipleOf": 2}), &json!(-4); "multiple of 2 is negative 4")]
    #[test_case(&json!({"multipleOf": 2.5}), &json!(5); "multiple of 2.5 is 5")]
    #[test_case(&json!({"multipleOf": 2.5}), &json!(-7.5); "multiple of 2.5 is negative 7.5")]
    #[test_case(&json!({"multipleOf": 0.0001}), &json!(0.0075); "multiple of 0.0001 is 0.0075")]
    #[test_case(&json!({"multipleOf": 0.0001}), &json!(-0.0075); "multiple of 0.0001 is negative 0.0075")]
    #[test_case(&json!({"multipleOf": 2}), &json!("4"); "non numbers are unconstrained")]
    fn valid(schema: &Value, instance: &Value) {
        tests_util::is_valid(schema, instance);
    }

    #[test_case(&json!({"multipleOf": 2}), &json!(7); "not a multiple of 2 is 7")]
    #[test_case(&json!({"multipleOf": 2}), &json!(-1); "not a multiple of 2 is negative 1")]
    #[test_case(&json!({"multipleOf": 2}), &json!(-3); "not a multiple of 2 is negative 3")]
    #[test_case(&json!({"multipleOf": 2.5}), &json!(7.5001); "not a multiple of 2.5 is 7.5001")]
    #[test_case(&json!({"multipleOf": 2.5}), &json!(-7.4); "not a multiple of 2.5 is negative 7.4")]
    fn invalid(schema: &Value, instance: &Value) {
        tests_util::is_not_valid(schema, instance);
    }

    #[test]
    fn error_message() {
        tests_util::assert_error_message(
            &json!({"multipleOf": 2}),
            &json!(7),
            "7 is not a multiple of 2",
        );
    }
}
