use serde_json::{Map, Value};

use crate::{
    compiler,
    error::EvaluationError,
    evaluation::{EvalContext, Evaluation},
    graph::{ConstraintId, Evaluate},
    keywords::{helpers, BuiltinKeyword, CompilationResult},
    paths::keyword,
};

/// Applies its subschema to every property *name*, treated as a string
/// instance at the object's own location.
pub(crate) struct PropertyNamesConstraint {
    target: ConstraintId,
}

impl Evaluate for PropertyNamesConstraint {
    fn evaluate<'a>(
        &'a self,
        ctx: &mut EvalContext<'a>,
        instance: &Value,
        node: &mut Evaluation,
    ) -> Result<(), EvaluationError> {
        let Value::Object(object) = instance else {
            return Ok(());
        };
        let mut invalid = Vec::new();
        for name in object.keys() {
            if ctx.is_cancelled() {
                return Ok(());
            }
            let name_instance = Value::String(name.clone());
            let child = ctx.apply(
                self.target,
                &name_instance,
                node.evaluation_path().clone_with(keyword("propertyNames")),
                node.instance_location().clone(),
            )?;
            if !child.valid() {
                invalid.push(name.clone());
            }
            node.attach(BuiltinKeyword::PropertyNames.into(), child);
            if !invalid.is_empty() && ctx.stops_on_first_error() {
                break;
            }
        }
        if !invalid.is_empty() {
            let message = if let [name] = invalid.as_slice() {
                format!("Property name '{name}' is not valid")
            } else {
                format!(
                    "Property names {} are not valid",
                    helpers::quoted_list(&invalid)
                )
            };
            node.fail(BuiltinKeyword::PropertyNames.into(), message);
        }
        Ok(())
    }
}

pub(crate) fn compile(
    ctx: &compiler::Context<'_>,
    _: &Map<String, Value>,
    value: &Value,
) -> Option<CompilationResult> {
    let kctx = ctx.new_at_location("propertyNames");
    match compiler::compile(&kctx, kctx.as_resource_ref(value)) {
        Ok(target) => Some(Ok(Box::new(PropertyNamesConstraint { target }))),
        Err(error) => Some(Err(error)),
    }
}

#[cfg(test)]
mod tests {
    use crate::tests_util;
    use serde_json::{json, Value};
    use test_case::test_case;

    #[test_case(&json!({"propertyNames": {"maxLength": 3}}), &json!({"foo": 1}))]
    #[test_case(&json!({"propertyNames": {"maxLength": 3}}), &json!({}))]
    #[test_case(&json!({"propertyNames": {"maxLength": 3}}), &json!(null); "non objects are unconstrained")]
    #[test_case(&json!({"propertyNames": false}), &json!({}))]
    fn valid(schema: &Value, instance: &Value) {
        tests_util::is_valid(schema, instance);
    }

    #[test_case(&json!({"propertyNames": {"maxLength": 3}}), &json!({"long name": 1}))]
    #[test_case(&json!({"propertyNames": false}), &json!({"a": 1}))]
    fn invalid(schema: &Value, instance: &Value) {
        tests_util::is_not_valid(schema, instance);
    }

    #[test]
    fn error_message() {
        tests_util::assert_error_message(
            &json!({"propertyNames": {"maxLength": 3}}),
            &json!({"quux": 1}),
            "Property name 'quux' is not valid",
        );
    }
}
