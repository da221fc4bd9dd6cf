//! `if`/`then`/`else` cooperate through the evaluation node: `if` runs first
//! (priority order) and leaves its child evaluation behind; `then` and
//! `else` read that child's validity to decide whether they apply.
use serde_json::{Map, Value};

use crate::{
    compiler,
    error::EvaluationError,
    evaluation::{EvalContext, Evaluation},
    graph::{ConstraintId, Evaluate},
    keywords::{BuiltinKeyword, CompilationResult},
    paths::keyword,
};

pub(crate) struct IfConstraint {
    target: ConstraintId,
}

impl Evaluate for IfConstraint {
    fn evaluate<'a>(
        &'a self,
        ctx: &mut EvalContext<'a>,
        instance: &Value,
        node: &mut Evaluation,
    ) -> Result<(), EvaluationError> {
        let child = ctx.apply(
            self.target,
            instance,
            node.evaluation_path().clone_with(keyword("if")),
            node.instance_location().clone(),
        )?;
        // The condition itself never fails the schema
        node.attach(BuiltinKeyword::If.into(), child);
        Ok(())
    }
}

pub(crate) struct ThenConstraint {
    target: ConstraintId,
}

impl Evaluate for ThenConstraint {
    fn evaluate<'a>(
        &'a self,
        ctx: &mut EvalContext<'a>,
        instance: &Value,
        node: &mut Evaluation,
    ) -> Result<(), EvaluationError> {
        let condition = node.children_of("if").last().map(Evaluation::valid);
        if condition == Some(true) {
            let child = ctx.apply(
                self.target,
                instance,
                node.evaluation_path().clone_with(keyword("then")),
                node.instance_location().clone(),
            )?;
            if !child.valid() {
                node.mark_invalid();
            }
            node.attach(BuiltinKeyword::Then.into(), child);
        }
        Ok(())
    }
}

pub(crate) struct ElseConstraint {
    target: ConstraintId,
}

impl Evaluate for ElseConstraint {
    fn evaluate<'a>(
        &'a self,
        ctx: &mut EvalContext<'a>,
        instance: &Value,
        node: &mut Evaluation,
    ) -> Result<(), EvaluationError> {
        let condition = node.children_of("if").last().map(Evaluation::valid);
        if condition == Some(false) {
            let child = ctx.apply(
                self.target,
                instance,
                node.evaluation_path().clone_with(keyword("else")),
                node.instance_location().clone(),
            )?;
            if !child.valid() {
                node.mark_invalid();
            }
            node.attach(BuiltinKeyword::Else.into(), child);
        }
        Ok(())
    }
}

pub(crate) fn compile_if(
    ctx: &compiler::Context<'_>,
    _: &Map<String, Value>,
    value: &Value,
) -> Option<CompilationResult> {
    let kctx = ctx.new_at_location("if");
    match compiler::compile(&kctx, kctx.as_resource_ref(value)) {
        Ok(target) => Some(Ok(Box::new(IfConstraint { target }))),
        Err(error) => Some(Err(error)),
    }
}

pub(crate) fn compile_then(
    ctx: &compiler::Context<'_>,
    parent: &Map<String, Value>,
    value: &Value,
) -> Option<CompilationResult> {
    // Without a condition to consume, `then` is inert
    if !parent.contains_key("if") {
        return None;
    }
    let kctx = ctx.new_at_location("then");
    match compiler::compile(&kctx, kctx.as_resource_ref(value)) {
        Ok(target) => Some(Ok(Box::new(ThenConstraint { target }))),
        Err(error) => Some(Err(error)),
    }
}

pub(crate) fn compile_else(
    ctx: &compiler::Context<'_>,
    parent: &Map<String, Value>,
    value: &Value,
) -> Option<CompilationResult> {
    if !parent.contains_key("if") {
        return None;
    }
    let kctx = ctx.new_at_location("else");
    match compiler::compile(&kctx, kctx.as_resource_ref(value)) {
        Ok(target) => Some(Ok(Box::new(ElseConstraint { target }))),
        Err(error) => Some(Err(error)),
    }
}

#[cfg(test)]
mod tests {
    use crate::tests_util;
    use serde_json::{json, Value};
    use test_case::test_case;

    fn schema() -> Value {
        json!({
            "if": {"type": "integer"},
            "then": {"minimum": 2},
            "else": {"type": "string"}
        })
    }

    #[test_case(&json!(2); "condition holds and then passes")]
    #[test_case(&json!("x"); "condition fails and else passes")]
    fn valid(instance: &Value) {
        tests_util::is_valid(&schema(), instance);
    }

    #[test_case(&json!(1); "condition holds and then fails")]
    #[test_case(&json!(1.5); "condition fails and else fails")]
    fn invalid(instance: &Value) {
        tests_util::is_not_valid(&schema(), instance);
    }

    #[test]
    fn then_without_if_is_inert() {
        tests_util::is_valid(&json!({"then": {"minimum": 100}}), &json!(1));
        tests_util::is_valid(&json!({"else": {"minimum": 100}}), &json!(1));
    }

    #[test]
    fn annotations_flow_from_the_taken_branch() {
        let evaluation = tests_util::evaluate(
            &json!({
                "if": {"properties": {"a": {}}},
                "then": {"properties": {"b": {}}}
            }),
            &json!({"a": 1, "b": 2}),
        );
        assert!(evaluation.valid());
        assert_eq!(
            evaluation.gather("properties"),
            vec![&json!(["a"]), &json!(["b"])],
        );
    }
}
