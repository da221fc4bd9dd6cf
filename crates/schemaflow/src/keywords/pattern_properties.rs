use fancy_regex::Regex;
use serde_json::{Map, Value};

use crate::{
    compiler, ecma,
    error::{EvaluationError, SchemaError},
    evaluation::{EvalContext, Evaluation},
    graph::{ConstraintId, Evaluate},
    keywords::{BuiltinKeyword, CompilationResult},
    paths::keyword,
};

pub(crate) struct PatternPropertiesConstraint {
    patterns: Vec<(String, Regex, ConstraintId)>,
}

impl Evaluate for PatternPropertiesConstraint {
    fn evaluate<'a>(
        &'a self,
        ctx: &mut EvalContext<'a>,
        instance: &Value,
        node: &mut Evaluation,
    ) -> Result<(), EvaluationError> {
        let Value::Object(object) = instance else {
            return Ok(());
        };
        let mut applied = Vec::new();
        let mut valid = true;
        for (name, value) in object {
            let mut matched = false;
            for (pattern, regex, target) in &self.patterns {
                if !regex.is_match(name).unwrap_or(false) {
                    continue;
                }
                matched = true;
                if ctx.is_cancelled() {
                    return Ok(());
                }
                let child = ctx.apply(
                    *target,
                    value,
                    node.evaluation_path()
                        .clone_with(keyword("patternProperties"))
                        .clone_with(pattern.as_str()),
                    node.instance_location().clone_with(name.as_str()),
                )?;
                valid &= child.valid();
                node.attach(BuiltinKeyword::PatternProperties.into(), child);
            }
            if matched {
                applied.push(Value::String(name.clone()));
            }
            if !valid && ctx.stops_on_first_error() {
                break;
            }
        }
        if valid {
            node.annotate(
                BuiltinKeyword::PatternProperties.into(),
                Value::Array(applied),
            );
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
    Some(compile_impl(ctx, value))
}

fn compile_impl(ctx: &compiler::Context<'_>, value: &Value) -> CompilationResult {
    let Value::Object(map) = value else {
        return Err(SchemaError::parse(
            ctx.schema_location(),
            format!("{value} is not of type \"object\""),
        ));
    };
    let kctx = ctx.new_at_location("patternProperties");
    let mut patterns = Vec::with_capacity(map.len());
    for (pattern, subschema) in map {
        let regex = ecma::to_rust_regex(pattern)
            .and_then(|converted| Regex::new(&converted).map_err(|error| error.to_string()))
            .map_err(|error| {
                SchemaError::parse(
                    ctx.schema_location(),
                    format!("Invalid pattern \"{pattern}\": {error}"),
                )
            })?;
        let pctx = kctx.new_at_location(pattern);
        let id = compiler::compile(&pctx, pctx.as_resource_ref(subschema))?;
        patterns.push((pattern.clone(), regex, id));
    }
    Ok(Box::new(PatternPropertiesConstraint { patterns }))
}
