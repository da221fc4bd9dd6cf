//! The compiled evaluator and its entry points.
use std::sync::Arc;

use referencing::Draft;
use serde_json::Value;

use crate::{
    error::{EvaluationError, SchemaError},
    evaluation::{CancellationToken, EvalContext, Evaluation, ShortCircuit},
    graph::{ConstraintGraph, ConstraintId},
    options::EvaluationOptions,
    output::Output,
    paths::JsonPointer,
};

/// A schema compiled into an immutable constraint graph.
///
/// Compiled evaluators are `Send + Sync`: one evaluator may serve concurrent
/// evaluations from multiple threads.
#[derive(Debug)]
pub struct Evaluator {
    graph: ConstraintGraph,
    root: ConstraintId,
    draft: Draft,
    config: Arc<EvaluationOptions>,
}

impl Evaluator {
    /// Create an evaluator using the default options.
    pub fn new(schema: &Value) -> Result<Evaluator, SchemaError> {
        Self::options().build(schema)
    }
    /// Default [`EvaluationOptions`] for configuring an evaluator.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use schemaflow::Draft;
    /// # let schema = serde_json::json!({});
    /// let evaluator = schemaflow::Evaluator::options()
    ///     .with_draft(Draft::Draft7)
    ///     .build(&schema);
    /// ```
    #[must_use]
    pub fn options() -> EvaluationOptions {
        EvaluationOptions::default()
    }

    pub(crate) fn from_parts(
        graph: ConstraintGraph,
        root: ConstraintId,
        draft: Draft,
        config: Arc<EvaluationOptions>,
    ) -> Evaluator {
        Evaluator {
            graph,
            root,
            draft,
            config,
        }
    }

    /// Whether `instance` satisfies the schema.
    ///
    /// Faster than [`Evaluator::evaluate`] when only the verdict matters.
    /// Runaway reference recursion reports as invalid.
    #[must_use]
    pub fn is_valid(&self, instance: &Value) -> bool {
        self.run(instance, ShortCircuit::AnnotationsOnly, None)
            .map(|evaluation| evaluation.valid())
            .unwrap_or(false)
    }

    /// Evaluate `instance` and return the raw evaluation tree.
    pub fn evaluate(&self, instance: &Value) -> Result<Evaluation, EvaluationError> {
        self.run(instance, self.config.evaluation_mode(), None)
    }

    /// Evaluate `instance`, checking `token` between keyword evaluations.
    /// On cancellation the returned tree is partial and marked cancelled.
    pub fn evaluate_cancellable(
        &self,
        instance: &Value,
        token: &CancellationToken,
    ) -> Result<Evaluation, EvaluationError> {
        self.run(instance, self.config.evaluation_mode(), Some(token))
    }

    pub(crate) fn run(
        &self,
        instance: &Value,
        mode: ShortCircuit,
        token: Option<&CancellationToken>,
    ) -> Result<Evaluation, EvaluationError> {
        let mut ctx = EvalContext::new(&self.graph, mode, token);
        let mut root = ctx.apply(
            self.root,
            instance,
            JsonPointer::default(),
            JsonPointer::default(),
        )?;
        if ctx.observed_cancellation() {
            root.set_cancelled();
        }
        Ok(root)
    }

    /// Apply the schema and return an [`Output`] that projects the result
    /// into the standard output formats. Evaluation is deferred until a
    /// format is requested, since formats differ in how much work they need.
    #[must_use]
    pub fn apply<'a, 'b>(&'a self, instance: &'b Value) -> Output<'a, 'b> {
        Output::new(self, instance)
    }

    /// The draft this evaluator was compiled under.
    #[must_use]
    pub fn draft(&self) -> Draft {
        self.draft
    }

    /// The options this evaluator was built with.
    #[must_use]
    pub fn config(&self) -> Arc<EvaluationOptions> {
        Arc::clone(&self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::Evaluator;
    use crate::evaluation::CancellationToken;
    use serde_json::json;

    #[test]
    fn evaluator_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Evaluator>();
    }

    #[test]
    fn deterministic_across_calls() {
        let evaluator = Evaluator::new(&json!({
            "type": "object",
            "properties": {"a": {"type": "integer"}},
            "required": ["a"]
        }))
        .expect("Valid schema");
        let instance = json!({"a": 1});
        let first = evaluator.evaluate(&instance).expect("Evaluates");
        let second = evaluator.evaluate(&instance).expect("Evaluates");
        assert_eq!(first.valid(), second.valid());
        assert_eq!(
            evaluator.is_valid(&instance),
            first.valid(),
            "is_valid agrees with the tree"
        );
    }

    #[test]
    fn pre_cancelled_token_yields_partial_tree() {
        let evaluator = Evaluator::new(&json!({"type": "object"})).expect("Valid schema");
        let token = CancellationToken::new();
        token.cancel();
        let evaluation = evaluator
            .evaluate_cancellable(&json!({}), &token)
            .expect("Evaluates");
        assert!(evaluation.cancelled());
    }

    #[test]
    fn concurrent_evaluations_share_the_graph() {
        let evaluator = std::sync::Arc::new(
            Evaluator::new(&json!({"items": {"type": "integer"}})).expect("Valid schema"),
        );
        let handles: Vec<_> = (0..4)
            .map(|index| {
                let evaluator = std::sync::Arc::clone(&evaluator);
                std::thread::spawn(move || evaluator.is_valid(&json!([index])))
            })
            .collect();
        for handle in handles {
            assert!(handle.join().expect("No panic"));
        }
    }
}
