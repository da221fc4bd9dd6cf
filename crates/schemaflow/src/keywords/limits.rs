//! Numeric bounds and size limits: `maximum`, `minimum`,
//! `exclusiveMaximum`, `exclusiveMinimum`, `maxLength`, `minLength`,
//! `maxItems`, `minItems`, `maxProperties`, `minProperties`.
use num_cmp::NumCmp;
use serde_json::{Map, Number, Value};

use crate::{
    compiler,
    error::{EvaluationError, SchemaError},
    evaluation::{EvalContext, Evaluation},
    graph::Evaluate,
    keywords::{BuiltinKeyword, CompilationResult},
};

#[derive(Debug, Clone, Copy)]
enum Bound {
    Maximum,
    ExclusiveMaximum,
    Minimum,
    ExclusiveMinimum,
}

impl Bound {
    fn keyword(self) -> BuiltinKeyword {
        match self {
            Bound::Maximum => BuiltinKeyword::Maximum,
            Bound::ExclusiveMaximum => BuiltinKeyword::ExclusiveMaximum,
            Bound::Minimum => BuiltinKeyword::Minimum,
            Bound::ExclusiveMinimum => BuiltinKeyword::ExclusiveMinimum,
        }
    }
}

/// A single numeric bound. Non-numbers are unconstrained.
pub(crate) struct NumericBoundConstraint {
    bound: Bound,
    limit: f64,
    raw: Value,
}

impl NumericBoundConstraint {
    fn is_valid(&self, number: &Number) -> bool {
        let out_of_bounds = if let Some(value) = number.as_u64() {
            self.compare(value)
        } else if let Some(value) = number.as_i64() {
            self.compare(value)
        } else {
            let value = number.as_f64().expect("Always representable");
            self.compare(value)
        };
        !out_of_bounds
    }

    fn compare<T: NumCmp<f64>>(&self, value: T) -> bool {
        match self.bound {
            Bound::Maximum => NumCmp::num_gt(value, self.limit),
            Bound::ExclusiveMaximum => NumCmp::num_ge(value, self.limit),
            Bound::Minimum => NumCmp::num_lt(value, self.limit),
            Bound::ExclusiveMinimum => NumCmp::num_le(value, self.limit),
        }
    }

    fn message(&self, instance: &Value) -> String {
        let raw = &self.raw;
        match self.bound {
            Bound::Maximum => format!("{instance} is greater than the maximum of {raw}"),
            Bound::ExclusiveMaximum => {
                format!("{instance} is greater than or equal to the maximum of {raw}")
            }
            Bound::Minimum => format!("{instance} is less than the minimum of {raw}"),
            Bound::ExclusiveMinimum => {
                format!("{instance} is less than or equal to the minimum of {raw}")
            }
        }
    }
}

impl Evaluate for NumericBoundConstraint {
    fn evaluate<'a>(
        &'a self,
        _: &mut EvalContext<'a>,
        instance: &Value,
        node: &mut Evaluation,
    ) -> Result<(), EvaluationError> {
        if let Value::Number(number) = instance {
            if !self.is_valid(number) {
                node.fail(self.bound.keyword().into(), self.message(instance));
            }
        }
        Ok(())
    }
}

fn compile_bound(
    ctx: &compiler::Context<'_>,
    value: &Value,
    bound: Bound,
) -> Option<CompilationResult> {
    if let Value::Number(limit) = value {
        Some(Ok(Box::new(NumericBoundConstraint {
            bound,
            limit: limit.as_f64().expect("Always representable"),
            raw: value.clone(),
        })))
    } else {
        Some(Err(SchemaError::parse(
            ctx.schema_location(),
            format!("{value} is not of type \"number\""),
        )))
    }
}

pub(crate) fn compile_maximum(
    ctx: &compiler::Context<'_>,
    _: &Map<String, Value>,
    value: &Value,
) -> Option<CompilationResult> {
    compile_bound(ctx, value, Bound::Maximum)
}

pub(crate) fn compile_exclusive_maximum(
    ctx: &compiler::Context<'_>,
    _: &Map<String, Value>,
    value: &Value,
) -> Option<CompilationResult> {
    compile_bound(ctx, value, Bound::ExclusiveMaximum)
}

pub(crate) fn compile_minimum(
    ctx: &compiler::Context<'_>,
    _: &Map<String, Value>,
    value: &Value,
) -> Option<CompilationResult> {
    compile_bound(ctx, value, Bound::Minimum)
}

pub(crate) fn compile_exclusive_minimum(
    ctx: &compiler::Context<'_>,
    _: &Map<String, Value>,
    value: &Value,
) -> Option<CompilationResult> {
    compile_bound(ctx, value, Bound::ExclusiveMinimum)
}

#[derive(Debug, Clone, Copy)]
enum Size {
    MaxLength,
    MinLength,
    MaxItems,
    MinItems,
    MaxProperties,
    MinProperties,
}

impl Size {
    fn keyword(self) -> BuiltinKeyword {
        match self {
            Size::MaxLength => BuiltinKeyword::MaxLength,
            Size::MinLength => BuiltinKeyword::MinLength,
            Size::MaxItems => BuiltinKeyword::MaxItems,
            Size::MinItems => BuiltinKeyword::MinItems,
            Size::MaxProperties => BuiltinKeyword::MaxProperties,
            Size::MinProperties => BuiltinKeyword::MinProperties,
        }
    }
}

/// A size limit over the matching instance type; other types pass.
pub(crate) struct SizeLimitConstraint {
    size: Size,
    limit: u64,
}

impl SizeLimitConstraint {
    fn measure(&self, instance: &Value) -> Option<u64> {
        match (self.size, instance) {
            (Size::MaxLength | Size::MinLength, Value::String(value)) => {
                Some(value.chars().count() as u64)
            }
            (Size::MaxItems | Size::MinItems, Value::Array(items)) => Some(items.len() as u64),
            (Size::MaxProperties | Size::MinProperties, Value::Object(object)) => {
                Some(object.len() as u64)
            }
            _ => None,
        }
    }

    fn noun(&self) -> &'static str {
        match (self.size, self.limit) {
            (Size::MaxLength | Size::MinLength, 1) => "character",
            (Size::MaxLength | Size::MinLength, _) => "characters",
            (Size::MaxItems | Size::MinItems, 1) => "item",
            (Size::MaxItems | Size::MinItems, _) => "items",
            (Size::MaxProperties | Size::MinProperties, 1) => "property",
            (Size::MaxProperties | Size::MinProperties, _) => "properties",
        }
    }

    fn message(&self, instance: &Value) -> String {
        let limit = self.limit;
        let noun = self.noun();
        match self.size {
            Size::MaxLength => format!("{instance} is longer than {limit} {noun}"),
            Size::MinLength => format!("{instance} is shorter than {limit} {noun}"),
            Size::MaxItems | Size::MaxProperties => {
                format!("{instance} has more than {limit} {noun}")
            }
            Size::MinItems | Size::MinProperties => {
                format!("{instance} has less than {limit} {noun}")
            }
        }
    }
}

impl Evaluate for SizeLimitConstraint {
    fn evaluate<'a>(
        &'a self,
        _: &mut EvalContext<'a>,
        instance: &Value,
        node: &mut Evaluation,
    ) -> Result<(), EvaluationError> {
        if let Some(measured) = self.measure(instance) {
            let out_of_bounds = match self.size {
                Size::MaxLength | Size::MaxItems | Size::MaxProperties => measured > self.limit,
                Size::MinLength | Size::MinItems | Size::MinProperties => measured < self.limit,
            };
            if out_of_bounds {
                node.fail(self.size.keyword().into(), self.message(instance));
            }
        }
        Ok(())
    }
}

fn compile_size(
    ctx: &compiler::Context<'_>,
    value: &Value,
    size: Size,
) -> Option<CompilationResult> {
    if let Some(limit) = value.as_u64() {
        Some(Ok(Box::new(SizeLimitConstraint { size, limit })))
    } else {
        Some(Err(SchemaError::parse(
            ctx.schema_location(),
            format!("{value} is not a non-negative integer"),
        )))
    }
}

pub(crate) fn compile_max_length(
    ctx: &compiler::Context<'_>,
    _: &Map<String, Value>,
    value: &Value,
) -> Option<CompilationResult> {
    compile_size(ctx, value, Size::MaxLength)
}

pub(crate) fn compile_min_length(
    ctx: &compiler::Context<'_>,
    _: &Map<String, Value>,
    value: &Value,
) -> Option<CompilationResult> {
    compile_size(ctx, value, Size::MinLength)
}

pub(crate) fn compile_max_items(
    ctx: &compiler::Context<'_>,
    _: &Map<String, Value>,
    value: &Value,
) -> Option<CompilationResult> {
    compile_size(ctx, value, Size::MaxItems)
}

pub(crate) fn compile_min_items(
    ctx: &compiler::Context<'_>,
    _: &Map<String, Value>,
    value: &Value,
) -> Option<CompilationResult> {
    compile_size(ctx, value, Size::MinItems)
}

pub(crate) fn compile_max_properties(
    ctx: &compiler::Context<'_>,
    _: &Map<String, Value>,
    value: &Value,
) -> Option<CompilationResult> {
    compile_size(ctx, value, Size::MaxProperties)
}

pub(crate) fn compile_min_properties(
    ctx: &compiler::Context<'_>,
    _: &Map<String, Value>,
    value: &Value,
) -> Option<CompilationResult> {
    compile_size(ctx, value, Size::MinProperties)
}

#[cfg(test)]
mod tests {
    use crate::tests_util;
    use serde_json::{json, Value};
    use test_case::test_case;

    #[test_case(&json!({"maximum": 5}), &json!(5))]
    #[test_case(&json!({"maximum": 5}), &json!("5"); "non numbers are unconstrained")]
    #[test_case(&json!({"minimum": 5}), &json!(5))]
    #[test_case(&json!({"exclusiveMaximum": 5}), &json!(4.9))]
    #[test_case(&json!({"exclusiveMinimum": 5}), &json!(5.1))]
    #[test_case(&json!({"maxLength": 2}), &json!("fo"))]
    #[test_case(&json!({"minLength": 2}), &json!("fo"))]
    #[test_case(&json!({"maxItems": 2}), &json!([1, 2]))]
    #[test_case(&json!({"minItems": 1}), &json!([1]))]
    #[test_case(&json!({"maxProperties": 1}), &json!({"a": 1}))]
    #[test_case(&json!({"minProperties": 1}), &json!({"a": 1}))]
    fn valid(schema: &Value, instance: &Value) {
        tests_util::is_valid(schema, instance);
    }

    #[test_case(&json!({"maximum": 5}), &json!(6))]
    #[test_case(&json!({"maximum": 5.5}), &json!(5.6))]
    #[test_case(&json!({"exclusiveMaximum": 3}), &json!(3.0))]
    #[test_case(&json!({"exclusiveMinimum": 1}), &json!(1.0))]
    #[test_case(&json!({"minimum": 3}), &json!(2.5))]
    #[test_case(&json!({"maxLength": 2}), &json!("foo"))]
    #[test_case(&json!({"minLength": 2}), &json!("f"))]
    #[test_case(&json!({"maxItems": 2}), &json!([1, 2, 3]))]
    #[test_case(&json!({"minItems": 1}), &json!([]))]
    #[test_case(&json!({"maxProperties": 1}), &json!({"a": 1, "b": 2}))]
    #[test_case(&json!({"minProperties": 1}), &json!({}))]
    fn invalid(schema: &Value, instance: &Value) {
        tests_util::is_not_valid(schema, instance);
    }

    #[test_case(&json!({"maximum": 3}), &json!(3.5), "3.5 is greater than the maximum of 3")]
    #[test_case(&json!({"exclusiveMaximum": 3}), &json!(3.0), "3.0 is greater than or equal to the maximum of 3")]
    #[test_case(&json!({"exclusiveMinimum": 1}), &json!(1.0), "1.0 is less than or equal to the minimum of 1")]
    #[test_case(&json!({"minimum": 3.0}), &json!(2.5), "2.5 is less than the minimum of 3.0")]
    #[test_case(&json!({"maxLength": 2}), &json!("foo"), "\"foo\" is longer than 2 characters")]
    #[test_case(&json!({"minLength": 2}), &json!("f"), "\"f\" is shorter than 2 characters")]
    #[test_case(&json!({"maxItems": 2}), &json!([1, 2, 3]), "[1,2,3] has more than 2 items")]
    #[test_case(&json!({"minItems": 1}), &json!([]), "[] has less than 1 item")]
    #[test_case(&json!({"minProperties": 1}), &json!({}), "{} has less than 1 property")]
    fn error_message(schema: &Value, instance: &Value, expected: &str) {
        tests_util::assert_error_message(schema, instance, expected);
    }

    #[test]
    fn malformed_limits() {
        tests_util::is_schema_error(&json!({"maximum": "5"}));
        tests_util::is_schema_error(&json!({"minLength": -1}));
        tests_util::is_schema_error(&json!({"maxItems": 1.5}));
    }
}
