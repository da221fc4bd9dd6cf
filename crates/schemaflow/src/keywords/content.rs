//! `contentEncoding` / `contentMediaType` / `contentSchema`.
//!
//! Draft 7 made the first two assertions; 2019-09 and later demoted all
//! three to annotations.
use base64::Engine;
use referencing::Draft;
use serde_json::{Map, Value};

use crate::{
    compiler,
    error::{EvaluationError, SchemaError},
    evaluation::{EvalContext, Evaluation},
    graph::Evaluate,
    keywords::{BuiltinKeyword, CompilationResult},
};

fn is_base64(value: &str) -> bool {
    base64::engine::general_purpose::STANDARD.decode(value).is_ok()
}

fn is_json(value: &str) -> bool {
    serde_json::from_str::<Value>(value).is_ok()
}

pub(crate) struct ContentEncodingConstraint {
    encoding: String,
    check: Option<fn(&str) -> bool>,
    assert: bool,
}

impl Evaluate for ContentEncodingConstraint {
    fn evaluate<'a>(
        &'a self,
        _: &mut EvalContext<'a>,
        instance: &Value,
        node: &mut Evaluation,
    ) -> Result<(), EvaluationError> {
        if self.assert {
            if let (Value::String(value), Some(check)) = (instance, self.check) {
                if !check(value) {
                    node.fail(
                        BuiltinKeyword::ContentEncoding.into(),
                        format!("{instance} is not encoded as \"{}\"", self.encoding),
                    );
                    return Ok(());
                }
            }
        }
        node.annotate(
            BuiltinKeyword::ContentEncoding.into(),
            Value::String(self.encoding.clone()),
        );
        Ok(())
    }
}

pub(crate) struct ContentMediaTypeConstraint {
    media_type: String,
    check: Option<fn(&str) -> bool>,
    assert: bool,
}

impl Evaluate for ContentMediaTypeConstraint {
    fn evaluate<'a>(
        &'a self,
        _: &mut EvalContext<'a>,
        instance: &Value,
        node: &mut Evaluation,
    ) -> Result<(), EvaluationError> {
        if self.assert {
            if let (Value::String(value), Some(check)) = (instance, self.check) {
                if !check(value) {
                    node.fail(
                        BuiltinKeyword::ContentMediaType.into(),
                        format!("{instance} is not of media type \"{}\"", self.media_type),
                    );
                    return Ok(());
                }
            }
        }
        node.annotate(
            BuiltinKeyword::ContentMediaType.into(),
            Value::String(self.media_type.clone()),
        );
        Ok(())
    }
}

/// `contentSchema` is never applied to the decoded document here; it only
/// annotates, carrying the subschema for consumers.
pub(crate) struct ContentSchemaConstraint {
    value: Value,
}

impl Evaluate for ContentSchemaConstraint {
    fn evaluate<'a>(
        &'a self,
        _: &mut EvalContext<'a>,
        _: &Value,
        node: &mut Evaluation,
    ) -> Result<(), EvaluationError> {
        node.annotate(BuiltinKeyword::ContentSchema.into(), self.value.clone());
        Ok(())
    }
}

fn string_value<'s>(
    ctx: &compiler::Context<'_>,
    value: &'s Value,
) -> Result<&'s str, SchemaError> {
    value.as_str().ok_or_else(|| {
        SchemaError::parse(
            ctx.schema_location(),
            format!("{value} is not of type \"string\""),
        )
    })
}

pub(crate) fn compile_encoding(
    ctx: &compiler::Context<'_>,
    _: &Map<String, Value>,
    value: &Value,
) -> Option<CompilationResult> {
    let encoding = match string_value(ctx, value) {
        Ok(encoding) => encoding,
        Err(error) => return Some(Err(error)),
    };
    let check = match encoding {
        "base64" => Some(is_base64 as fn(&str) -> bool),
        _ => None,
    };
    Some(Ok(Box::new(ContentEncodingConstraint {
        encoding: encoding.to_string(),
        check,
        assert: ctx.draft() <= Draft::Draft7,
    })))
}

pub(crate) fn compile_media_type(
    ctx: &compiler::Context<'_>,
    parent: &Map<String, Value>,
    value: &Value,
) -> Option<CompilationResult> {
    let media_type = match string_value(ctx, value) {
        Ok(media_type) => media_type,
        Err(error) => return Some(Err(error)),
    };
    // A sibling `contentEncoding` means the raw string is encoded and the
    // media type describes the decoded form; only unencoded JSON is checked
    let encoded = parent.contains_key("contentEncoding");
    let check = match media_type {
        "application/json" if !encoded => Some(is_json as fn(&str) -> bool),
        _ => None,
    };
    Some(Ok(Box::new(ContentMediaTypeConstraint {
        media_type: media_type.to_string(),
        check,
        assert: ctx.draft() <= Draft::Draft7,
    })))
}

pub(crate) fn compile_schema(
    _: &compiler::Context<'_>,
    parent: &Map<String, Value>,
    value: &Value,
) -> Option<CompilationResult> {
    // Without `contentMediaType` there is nothing to describe
    if !parent.contains_key("contentMediaType") {
        return None;
    }
    Some(Ok(Box::new(ContentSchemaConstraint {
        value: value.clone(),
    })))
}
