use referencing::Draft;
use serde_json::{Map, Value};

use crate::{
    compiler,
    error::{EvaluationError, SchemaError},
    evaluation::{EvalContext, Evaluation},
    graph::{ConstraintId, Evaluate},
    keywords::{BuiltinKeyword, CompilationResult},
    paths::keyword,
};

/// `contains`, with the `minContains`/`maxContains` bounds folded in at
/// compile time (they have no effect without an adjacent `contains`).
pub(crate) struct ContainsConstraint {
    target: ConstraintId,
    min: u64,
    max: Option<u64>,
}

impl Evaluate for ContainsConstraint {
    fn evaluate<'a>(
        &'a self,
        ctx: &mut EvalContext<'a>,
        instance: &Value,
        node: &mut Evaluation,
    ) -> Result<(), EvaluationError> {
        let Value::Array(items) = instance else {
            return Ok(());
        };
        let mut matched = Vec::new();
        for (index, item) in items.iter().enumerate() {
            if ctx.is_cancelled() {
                return Ok(());
            }
            let child = ctx.apply(
                self.target,
                item,
                node.evaluation_path().clone_with(keyword("contains")),
                node.instance_location().clone_with(index),
            )?;
            if child.valid() {
                matched.push(index);
            }
            node.attach(BuiltinKeyword::Contains.into(), child);
        }
        let count = matched.len() as u64;
        if count < self.min {
            let message = if self.min == 1 && self.max.is_none() {
                format!("None of {instance} are valid under the given schema")
            } else {
                format!(
                    "{instance} has less than {} items matching the given schema",
                    self.min
                )
            };
            node.fail(BuiltinKeyword::Contains.into(), message);
        } else if self.max.is_some_and(|max| count > max) {
            node.fail(
                BuiltinKeyword::Contains.into(),
                format!(
                    "{instance} has more than {} items matching the given schema",
                    self.max.expect("Checked above")
                ),
            );
        } else {
            let annotation = if matched.len() == items.len() {
                Value::Bool(true)
            } else {
                Value::Array(matched.into_iter().map(Value::from).collect())
            };
            node.annotate(BuiltinKeyword::Contains.into(), annotation);
        }
        Ok(())
    }
}

fn parse_bound(
    ctx: &compiler::Context<'_>,
    parent: &Map<String, Value>,
    name: &str,
) -> Result<Option<u64>, SchemaError> {
    match parent.get(name) {
        None => Ok(None),
        Some(value) => value.as_u64().map(Some).ok_or_else(|| {
            SchemaError::parse(
                ctx.schema_location(),
                format!("{value} is not a non-negative integer"),
            )
        }),
    }
}

pub(crate) fn compile(
    ctx: &compiler::Context<'_>,
    parent: &Map<String, Value>,
    value: &Value,
) -> Option<CompilationResult> {
    let (min, max) = if ctx.draft() >= Draft::Draft201909 {
        let min = match parse_bound(ctx, parent, "minContains") {
            Ok(bound) => bound.unwrap_or(1),
            Err(error) => return Some(Err(error)),
        };
        let max = match parse_bound(ctx, parent, "maxContains") {
            Ok(bound) => bound,
            Err(error) => return Some(Err(error)),
        };
        (min, max)
    } else {
        (1, None)
    };
    let kctx = ctx.new_at_location("contains");
    match compiler::compile(&kctx, kctx.as_resource_ref(value)) {
        Ok(target) => Some(Ok(Box::new(ContainsConstraint { target, min, max }))),
        Err(error) => Some(Err(error)),
    }
}

/// `minContains` / `maxContains` never compile on their own.
pub(crate) fn compile_bound(
    _: &compiler::Context<'_>,
    _: &Map<String, Value>,
    _: &Value,
) -> Option<CompilationResult> {
    None
}

#[cfg(test)]
mod tests {
    use crate::tests_util;
    use serde_json::{json, Value};
    use test_case::test_case;

    #[test_case(&json!({"contains": {"minimum": 5}}), &json!([2, 3, 7]))]
    #[test_case(&json!({"contains": {"minimum": 5}}), &json!("no array"); "non arrays are unconstrained")]
    #[test_case(&json!({"contains": {"minimum": 5}, "minContains": 0}), &json!([]))]
    #[test_case(&json!({"contains": {"minimum": 5}, "minContains": 2}), &json!([5, 6]))]
    #[test_case(&json!({"contains": {"minimum": 5}, "maxContains": 1}), &json!([1, 9]))]
    fn valid(schema: &Value, instance: &Value) {
        tests_util::is_valid(schema, instance);
    }

    #[test_case(&json!({"contains": {"minimum": 5}}), &json!([2, 3, 4]))]
    #[test_case(&json!({"contains": {"minimum": 5}, "minContains": 2}), &json!([5]))]
    #[test_case(&json!({"contains": {"minimum": 5}, "maxContains": 1}), &json!([5, 6]))]
    fn invalid(schema: &Value, instance: &Value) {
        tests_util::is_not_valid(schema, instance);
    }

    #[test]
    fn error_message() {
        tests_util::assert_error_message(
            &json!({"contains": {"minimum": 5}}),
            &json!([2, 3, 4]),
            "None of [2,3,4] are valid under the given schema",
        );
    }

    #[test]
    fn annotation_lists_matching_indices() {
        let evaluation =
            tests_util::evaluate(&json!({"contains": {"minimum": 5}}), &json!([9, 1, 7]));
        assert_eq!(evaluation.gather("contains"), vec![&json!([0, 2])]);
    }

    #[test]
    fn annotation_is_true_when_all_match() {
        let evaluation =
            tests_util::evaluate(&json!({"contains": {"minimum": 5}}), &json!([9, 7]));
        assert_eq!(evaluation.gather("contains"), vec![&json!(true)]);
    }
}
