use serde_json::{Map, Value};

use crate::{
    compiler,
    error::{EvaluationError, SchemaError},
    evaluation::{EvalContext, Evaluation},
    graph::{ConstraintId, Evaluate},
    keywords::{BuiltinKeyword, CompilationResult},
    paths::keyword,
};

pub(crate) struct PrefixItemsConstraint {
    targets: Vec<ConstraintId>,
}

impl Evaluate for PrefixItemsConstraint {
    fn evaluate<'a>(
        &'a self,
        ctx: &mut EvalContext<'a>,
        instance: &Value,
        node: &mut Evaluation,
    ) -> Result<(), EvaluationError> {
        let Value::Array(items) = instance else {
            return Ok(());
        };
        if items.is_empty() {
            return Ok(());
        }
        let mut valid = true;
        let mut max_index_applied = 0;
        for (index, (target, item)) in self.targets.iter().zip(items.iter()).enumerate() {
            if ctx.is_cancelled() {
                return Ok(());
            }
            let child = ctx.apply(
                *target,
                item,
                node.evaluation_path()
                    .clone_with(keyword("prefixItems"))
                    .clone_with(index),
                node.instance_location().clone_with(index),
            )?;
            valid &= child.valid();
            max_index_applied = index;
            node.attach(BuiltinKeyword::PrefixItems.into(), child);
            if !valid && ctx.stops_on_first_error() {
                break;
            }
        }
        if valid {
            // The largest index a subschema applied to, or `true` when every
            // element was covered; `items` and `unevaluatedItems` read this
            let annotation = if self.targets.len() >= items.len() {
                Value::Bool(true)
            } else {
                Value::from(max_index_applied)
            };
            node.annotate(BuiltinKeyword::PrefixItems.into(), annotation);
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
    let Value::Array(schemas) = value else {
        return Some(Err(SchemaError::parse(
            ctx.schema_location(),
            format!("{value} is not of type \"array\""),
        )));
    };
    Some(compile_list(ctx, "prefixItems", schemas).map(|targets| {
        Box::new(PrefixItemsConstraint { targets }) as crate::graph::BoxedConstraint
    }))
}

pub(crate) fn compile_list(
    ctx: &compiler::Context<'_>,
    keyword: &'static str,
    schemas: &[Value],
) -> Result<Vec<ConstraintId>, SchemaError> {
    let kctx = ctx.new_at_location(keyword);
    let mut targets = Vec::with_capacity(schemas.len());
    for (index, subschema) in schemas.iter().enumerate() {
        let ictx = kctx.new_at_location(index);
        targets.push(compiler::compile(&ictx, ictx.as_resource_ref(subschema))?);
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use crate::tests_util;
    use serde_json::{json, Value};
    use test_case::test_case;

    fn schema() -> Value {
        json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "prefixItems": [{"type": "integer"}, {"maximum": 5}]
        })
    }

    #[test_case(&json!([]))]
    #[test_case(&json!([1]))]
    #[test_case(&json!([1, 5]))]
    #[test_case(&json!([1, 5, "anything"]))]
    fn valid(instance: &Value) {
        tests_util::is_valid(&schema(), instance);
    }

    #[test_case(&json!(["string"]))]
    #[test_case(&json!([1, 6]))]
    fn invalid(instance: &Value) {
        tests_util::is_not_valid(&schema(), instance);
    }

    #[test]
    fn annotation_is_true_when_all_covered() {
        let evaluation = tests_util::evaluate(&schema(), &json!([1, 5]));
        assert_eq!(evaluation.gather("prefixItems"), vec![&json!(true)]);
    }

    #[test]
    fn annotation_is_max_index_when_partial() {
        let evaluation = tests_util::evaluate(&schema(), &json!([1, 5, 9, 9]));
        assert_eq!(evaluation.gather("prefixItems"), vec![&json!(1)]);
    }
}
