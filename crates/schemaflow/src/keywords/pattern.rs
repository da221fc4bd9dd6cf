use fancy_regex::Regex;
use serde_json::{Map, Value};

use crate::{
    compiler, ecma,
    error::{EvaluationError, SchemaError},
    evaluation::{EvalContext, Evaluation},
    graph::Evaluate,
    keywords::{BuiltinKeyword, CompilationResult},
};

pub(crate) struct PatternConstraint {
    pattern: String,
    regex: Regex,
}

impl Evaluate for PatternConstraint {
    fn evaluate<'a>(
        &'a self,
        _: &mut EvalContext<'a>,
        instance: &Value,
        node: &mut Evaluation,
    ) -> Result<(), EvaluationError> {
        if let Value::String(value) = instance {
            match self.regex.is_match(value) {
                Ok(true) => {}
                Ok(false) => node.fail(
                    BuiltinKeyword::Pattern.into(),
                    format!("{instance} does not match \"{}\"", self.pattern),
                ),
                // Matching gave up, e.g. the backtracking limit was exceeded
                Err(error) => node.fail(
                    BuiltinKeyword::Pattern.into(),
                    format!("Error matching \"{}\": {error}", self.pattern),
                ),
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
    let Some(pattern) = value.as_str() else {
        return Some(Err(SchemaError::parse(
            ctx.schema_location(),
            format!("{value} is not of type \"string\""),
        )));
    };
    match ecma::to_rust_regex(pattern).and_then(|converted| {
        Regex::new(&converted).map_err(|error| error.to_string())
    }) {
        Ok(regex) => Some(Ok(Box::new(PatternConstraint {
            pattern: pattern.to_string(),
            regex,
        }))),
        Err(error) => Some(Err(SchemaError::parse(
            ctx.schema_location(),
            format!("Invalid pattern {value}: {error}"),
        ))),
    }
}
