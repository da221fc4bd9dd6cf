//! The runtime result tree and the machinery that builds it.
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use serde_json::Value;

use crate::{
    error::EvaluationError,
    graph::{ConstraintGraph, ConstraintId},
    keywords::Keyword,
    paths::JsonPointer,
};

/// How eagerly evaluation gives up on a failing instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ShortCircuit {
    /// Evaluate every keyword and gather every error.
    #[default]
    CollectAll,
    /// Stop a schema's keyword list at the first failure.
    FailFast,
    /// Like [`ShortCircuit::FailFast`], for callers that only read the flag
    /// and annotations.
    AnnotationsOnly,
}

/// Cooperative cancellation signal checked between keyword evaluations.
///
/// There is no built-in timer; callers cancel from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// One node of the runtime result tree: a schema applied at one instance
/// location.
#[derive(Debug, Clone)]
pub struct Evaluation {
    evaluation_path: JsonPointer,
    schema_location: String,
    instance_location: JsonPointer,
    annotations: Vec<(Keyword, Value)>,
    errors: Vec<(Keyword, String)>,
    children: Vec<(Keyword, Evaluation)>,
    valid: bool,
    cancelled: bool,
}

impl Evaluation {
    pub(crate) fn new(
        evaluation_path: JsonPointer,
        schema_location: String,
        instance_location: JsonPointer,
    ) -> Self {
        Evaluation {
            evaluation_path,
            schema_location,
            instance_location,
            annotations: Vec::new(),
            errors: Vec::new(),
            children: Vec::new(),
            valid: true,
            cancelled: false,
        }
    }

    /// Whether the instance satisfied this schema.
    #[must_use]
    pub fn valid(&self) -> bool {
        self.valid
    }
    /// Whether evaluation was cancelled while this node was open; the
    /// subtree below it is partial.
    #[must_use]
    pub fn cancelled(&self) -> bool {
        self.cancelled
    }
    /// The schema-location trail that led here, including reference keywords.
    #[must_use]
    pub fn evaluation_path(&self) -> &JsonPointer {
        &self.evaluation_path
    }
    /// Canonical location of the applied schema: absolute URI plus pointer
    /// fragment.
    #[must_use]
    pub fn schema_location(&self) -> &str {
        &self.schema_location
    }
    /// Location in the instance this evaluation targets.
    #[must_use]
    pub fn instance_location(&self) -> &JsonPointer {
        &self.instance_location
    }
    /// Annotations produced by this node's keywords, in evaluation order.
    pub fn annotations(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.annotations
            .iter()
            .map(|(keyword, value)| (keyword.as_str(), value))
    }
    /// Errors produced by this node's keywords, in evaluation order.
    pub fn errors(&self) -> impl Iterator<Item = (&str, &str)> {
        self.errors
            .iter()
            .map(|(keyword, message)| (keyword.as_str(), message.as_str()))
    }
    /// Child evaluations, in evaluation order.
    pub fn children(&self) -> impl Iterator<Item = &Evaluation> {
        self.children.iter().map(|(_, child)| child)
    }

    /// Union the values of every `keyword` annotation from this node and all
    /// valid descendants applied to the same instance location.
    ///
    /// This is the annotation-collection operation behind
    /// `unevaluatedProperties` and `unevaluatedItems`: descendants with a
    /// different instance location (object members, array elements) are
    /// opaque, while applicator branches (`allOf`, `$ref`, `then`, ...) are
    /// transparent when valid.
    #[must_use]
    pub fn gather(&self, keyword: &str) -> Vec<&Value> {
        let mut values = Vec::new();
        self.gather_into(keyword, &mut values);
        values
    }

    fn gather_into<'e>(&'e self, keyword: &str, values: &mut Vec<&'e Value>) {
        for (name, value) in &self.annotations {
            if name.as_str() == keyword {
                values.push(value);
            }
        }
        for (_, child) in &self.children {
            if child.valid && child.instance_location == self.instance_location {
                child.gather_into(keyword, values);
            }
        }
    }

    /// Sibling annotation lookup by keyword name.
    pub(crate) fn annotation(&self, keyword: &str) -> Option<&Value> {
        self.annotations
            .iter()
            .find(|(name, _)| name.as_str() == keyword)
            .map(|(_, value)| value)
    }
    /// Child evaluations attached by the given keyword.
    pub(crate) fn children_of(&self, keyword: &str) -> impl Iterator<Item = &Evaluation> {
        let keyword = keyword.to_string();
        self.children
            .iter()
            .filter(move |(name, _)| name.as_str() == keyword)
            .map(|(_, child)| child)
    }

    /// A keyword sets at most one annotation under its own name per node.
    pub(crate) fn annotate(&mut self, keyword: Keyword, value: Value) {
        debug_assert!(self.annotation(keyword.as_str()).is_none());
        self.annotations.push((keyword, value));
    }
    pub(crate) fn fail(&mut self, keyword: Keyword, message: impl Into<String>) {
        self.valid = false;
        self.errors.push((keyword, message.into()));
    }
    /// Mark invalid without a message of this node's own; the failure detail
    /// lives in a child evaluation.
    pub(crate) fn mark_invalid(&mut self) {
        self.valid = false;
    }
    pub(crate) fn set_cancelled(&mut self) {
        self.cancelled = true;
    }
    pub(crate) fn attach(&mut self, keyword: Keyword, child: Evaluation) {
        if child.cancelled {
            self.cancelled = true;
        }
        self.children.push((keyword, child));
    }
}

/// Per-call evaluation state.
///
/// Holds the dynamic scope (resource URIs currently open along the recursion
/// path), the reference cycle guard, the cancellation token, and the
/// short-circuit mode. The constraint graph itself is immutable and shared.
pub(crate) struct EvalContext<'a> {
    graph: &'a ConstraintGraph,
    mode: ShortCircuit,
    token: Option<&'a CancellationToken>,
    /// Outermost-first stack of open resource URIs.
    scope: Vec<&'a str>,
    /// `(target, instance pointer depth)` for every reference currently
    /// being expanded.
    active_refs: Vec<(ConstraintId, usize)>,
    cancelled: bool,
}

impl<'a> EvalContext<'a> {
    pub(crate) fn new(
        graph: &'a ConstraintGraph,
        mode: ShortCircuit,
        token: Option<&'a CancellationToken>,
    ) -> Self {
        EvalContext {
            graph,
            mode,
            token,
            scope: Vec::new(),
            active_refs: Vec::new(),
            cancelled: false,
        }
    }

    /// Apply a compiled schema to an instance value and return the resulting
    /// evaluation node.
    pub(crate) fn apply(
        &mut self,
        target: ConstraintId,
        instance: &Value,
        evaluation_path: JsonPointer,
        instance_location: JsonPointer,
    ) -> Result<Evaluation, EvaluationError> {
        self.apply_in_scope(target, None, instance, evaluation_path, instance_location)
    }

    /// Like [`EvalContext::apply`], entering `scope_uri` for the duration of
    /// the application. Used by dynamic references that jump into the middle
    /// of a resource.
    pub(crate) fn apply_in_scope(
        &mut self,
        target: ConstraintId,
        scope_uri: Option<&'a str>,
        instance: &Value,
        evaluation_path: JsonPointer,
        instance_location: JsonPointer,
    ) -> Result<Evaluation, EvaluationError> {
        // Copy the graph reference out so the constraint borrow is `'a`,
        // independent of `self`
        let graph: &'a ConstraintGraph = self.graph;
        let constraint = graph.get(target);
        let mut node = Evaluation::new(
            evaluation_path,
            constraint.location.clone(),
            instance_location,
        );
        let frame = scope_uri.or(constraint.scope_uri.as_deref());
        if let Some(uri) = frame {
            self.scope.push(uri);
        }
        for keyword_constraint in &constraint.constraints {
            if self.is_cancelled() {
                node.set_cancelled();
                break;
            }
            keyword_constraint
                .evaluator
                .evaluate(self, instance, &mut node)?;
            if !node.valid() && self.stops_on_first_error() {
                break;
            }
        }
        if frame.is_some() {
            self.scope.pop();
        }
        Ok(node)
    }

    /// Outermost-first iteration over the dynamic scope.
    pub(crate) fn dynamic_scope(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.scope.iter().copied()
    }

    pub(crate) fn stops_on_first_error(&self) -> bool {
        matches!(
            self.mode,
            ShortCircuit::FailFast | ShortCircuit::AnnotationsOnly
        )
    }

    pub(crate) fn is_cancelled(&mut self) -> bool {
        if !self.cancelled {
            if let Some(token) = self.token {
                self.cancelled = token.is_cancelled();
            }
        }
        self.cancelled
    }

    pub(crate) fn observed_cancellation(&self) -> bool {
        self.cancelled
    }

    /// Guard a reference expansion: entering the same target twice without
    /// consuming any of the instance cannot terminate.
    pub(crate) fn enter_reference(
        &mut self,
        target: ConstraintId,
        node: &Evaluation,
    ) -> Result<(), EvaluationError> {
        let depth = node.instance_location().len();
        if self
            .active_refs
            .iter()
            .any(|(active, at)| *active == target && *at == depth)
        {
            return Err(EvaluationError::InfiniteRecursion {
                evaluation_path: node.evaluation_path().to_string(),
                instance_location: node.instance_location().to_string(),
            });
        }
        self.active_refs.push((target, depth));
        Ok(())
    }

    pub(crate) fn exit_reference(&mut self) {
        self.active_refs.pop();
    }
}
