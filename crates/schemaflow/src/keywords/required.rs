use serde_json::{Map, Value};

use crate::{
    compiler,
    error::{EvaluationError, SchemaError},
    evaluation::{EvalContext, Evaluation},
    graph::Evaluate,
    keywords::{BuiltinKeyword, CompilationResult},
};

pub(crate) struct RequiredConstraint {
    required: Vec<String>,
}

pub(crate) fn missing_properties_message(missing: &[&String]) -> String {
    if let [single] = missing {
        format!("\"{single}\" is a required property")
    } else {
        let mut names = String::new();
        for (index, name) in missing.iter().enumerate() {
            if index > 0 {
                names.push_str(", ");
            }
            names.push('"');
            names.push_str(name);
            names.push('"');
        }
        format!("{names} are required properties")
    }
}

impl Evaluate for RequiredConstraint {
    fn evaluate<'a>(
        &'a self,
        _: &mut EvalContext<'a>,
        instance: &Value,
        node: &mut Evaluation,
    ) -> Result<(), EvaluationError> {
        if let Value::Object(object) = instance {
            let missing: Vec<&String> = self
                .required
                .iter()
                .filter(|name| !object.contains_key(name.as_str()))
                .collect();
            if !missing.is_empty() {
                node.fail(
                    BuiltinKeyword::Required.into(),
                    missing_properties_message(&missing),
                );
            }
        }
        Ok(())
    }
}

pub(crate) fn parse_required(
    ctx: &compiler::Context<'_>,
    value: &Value,
) -> Result<Vec<String>, SchemaError> {
    let Value::Array(names) = value else {
        return Err(SchemaError::parse(
            ctx.schema_location(),
            format!("{value} is not of type \"array\""),
        ));
    };
    names
        .iter()
        .map(|name| {
            name.as_str().map(str::to_string).ok_or_else(|| {
                SchemaError::parse(
                    ctx.schema_location(),
                    format!("{name} is not of type \"string\""),
                )
            })
        })
        .collect()
}

pub(crate) fn compile(
    ctx: &compiler::Context<'_>,
    _: &Map<String, Value>,
    value: &Value,
) -> Option<CompilationResult> {
    match parse_required(ctx, value) {
        Ok(required) => Some(Ok(Box::new(RequiredConstraint { required }))),
        Err(error) => Some(Err(error)),
    }
}
