use referencing::Draft;
use serde_json::{Map, Value};

use crate::{
    compiler,
    error::{EvaluationError, SchemaError},
    evaluation::{EvalContext, Evaluation},
    graph::{ConstraintId, Evaluate},
    keywords::{prefix_items, BuiltinKeyword, CompilationResult},
    paths::keyword,
};

/// The single-schema form of `items`.
///
/// Under 2020-12 it starts after the elements claimed by the sibling
/// `prefixItems` annotation; under earlier drafts it covers the whole array.
pub(crate) struct ItemsConstraint {
    target: ConstraintId,
    reads_prefix: bool,
}

impl Evaluate for ItemsConstraint {
    fn evaluate<'a>(
        &'a self,
        ctx: &mut EvalContext<'a>,
        instance: &Value,
        node: &mut Evaluation,
    ) -> Result<(), EvaluationError> {
        let Value::Array(items) = instance else {
            return Ok(());
        };
        let skip = if self.reads_prefix {
            match node.annotation("prefixItems") {
                Some(Value::Bool(true)) => items.len(),
                Some(Value::Number(max_index)) => {
                    max_index.as_u64().map_or(0, |index| index as usize + 1)
                }
                _ => 0,
            }
        } else {
            0
        };
        let mut valid = true;
        let mut applied = false;
        for (index, item) in items.iter().enumerate().skip(skip) {
            if ctx.is_cancelled() {
                return Ok(());
            }
            let child = ctx.apply(
                self.target,
                item,
                node.evaluation_path().clone_with(keyword("items")),
                node.instance_location().clone_with(index),
            )?;
            valid &= child.valid();
            applied = true;
            node.attach(BuiltinKeyword::Items.into(), child);
            if !valid && ctx.stops_on_first_error() {
                break;
            }
        }
        if !valid {
            node.mark_invalid();
        } else if applied {
            node.annotate(BuiltinKeyword::Items.into(), Value::Bool(true));
        }
        Ok(())
    }
}

/// The array form of `items` from drafts 6 through 2019-09: positional
/// subschemas, annotated like `prefixItems`.
pub(crate) struct LegacyItemsConstraint {
    targets: Vec<ConstraintId>,
}

impl Evaluate for LegacyItemsConstraint {
    fn evaluate<'a>(
        &'a self,
        ctx: &mut EvalContext<'a>,
        instance: &Value,
        node: &mut Evaluation,
    ) -> Result<(), EvaluationError> {
        let Value::Array(items) = instance else {
            return Ok(());
        };
        if items.is_empty() {
            return Ok(());
        }
        let mut valid = true;
        let mut max_index_applied = 0;
        for (index, (target, item)) in self.targets.iter().zip(items.iter()).enumerate() {
            if ctx.is_cancelled() {
                return Ok(());
            }
            let child = ctx.apply(
                *target,
                item,
                node.evaluation_path()
                    .clone_with(keyword("items"))
                    .clone_with(index),
                node.instance_location().clone_with(index),
            )?;
            valid &= child.valid();
            max_index_applied = index;
            node.attach(BuiltinKeyword::Items.into(), child);
            if !valid && ctx.stops_on_first_error() {
                break;
            }
        }
        if valid {
            let annotation = if self.targets.len() >= items.len() {
                Value::Bool(true)
            } else {
                Value::from(max_index_applied)
            };
            node.annotate(BuiltinKeyword::Items.into(), annotation);
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
    match (ctx.draft(), value) {
        (Draft::Draft202012 | Draft::DraftNext, Value::Array(_)) => {
            Some(Err(SchemaError::draft_incompatible(
                ctx.schema_location(),
                ctx.draft(),
                "The array form of 'items' was replaced by 'prefixItems'",
            )))
        }
        (Draft::Draft6 | Draft::Draft7 | Draft::Draft201909, Value::Array(schemas)) => Some(
            prefix_items::compile_list(ctx, "items", schemas).map(|targets| {
                Box::new(LegacyItemsConstraint { targets }) as crate::graph::BoxedConstraint
            }),
        ),
        (draft, _) => {
            let kctx = ctx.new_at_location("items");
            match compiler::compile(&kctx, kctx.as_resource_ref(value)) {
                Ok(target) => Some(Ok(Box::new(ItemsConstraint {
                    target,
                    reads_prefix: draft >= Draft::Draft202012,
                }))),
                Err(error) => Some(Err(error)),
            }
        }
    }
}
