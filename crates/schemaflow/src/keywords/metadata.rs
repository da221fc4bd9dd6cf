//! Meta-data keywords are pure annotations.
use serde_json::{Map, Value};

use crate::{
    compiler,
    error::EvaluationError,
    evaluation::{EvalContext, Evaluation},
    graph::Evaluate,
    keywords::{BuiltinKeyword, CompilationResult},
};

pub(crate) struct AnnotationConstraint {
    keyword: BuiltinKeyword,
    value: Value,
}

impl Evaluate for AnnotationConstraint {
    fn evaluate<'a>(
        &'a self,
        _: &mut EvalContext<'a>,
        _: &Value,
        node: &mut Evaluation,
    ) -> Result<(), EvaluationError> {
        node.annotate(self.keyword.into(), self.value.clone());
        Ok(())
    }
}

fn annotation(keyword: BuiltinKeyword, value: &Value) -> Option<CompilationResult> {
    Some(Ok(Box::new(AnnotationConstraint {
        keyword,
        value: value.clone(),
    })))
}

pub(crate) fn compile_title(
    _: &compiler::Context<'_>,
    _: &Map<String, Value>,
    value: &Value,
) -> Option<CompilationResult> {
    annotation(BuiltinKeyword::Title, value)
}

pub(crate) fn compile_description(
    _: &compiler::Context<'_>,
    _: &Map<String, Value>,
    value: &Value,
) -> Option<CompilationResult> {
    annotation(BuiltinKeyword::Description, value)
}

pub(crate) fn compile_default(
    _: &compiler::Context<'_>,
    _: &Map<String, Value>,
    value: &Value,
) -> Option<CompilationResult> {
    annotation(BuiltinKeyword::Default, value)
}

pub(crate) fn compile_examples(
    _: &compiler::Context<'_>,
    _: &Map<String, Value>,
    value: &Value,
) -> Option<CompilationResult> {
    annotation(BuiltinKeyword::Examples, value)
}

pub(crate) fn compile_read_only(
    _: &compiler::Context<'_>,
    _: &Map<String, Value>,
    value: &Value,
) -> Option<CompilationResult> {
    annotation(BuiltinKeyword::ReadOnly, value)
}

pub(crate) fn compile_write_only(
    _: &compiler::Context<'_>,
    _: &Map<String, Value>,
    value: &Value,
) -> Option<CompilationResult> {
    annotation(BuiltinKeyword::WriteOnly, value)
}

pub(crate) fn compile_deprecated(
    _: &compiler::Context<'_>,
    _: &Map<String, Value>,
    value: &Value,
) -> Option<CompilationResult> {
    annotation(BuiltinKeyword::Deprecated, value)
}
