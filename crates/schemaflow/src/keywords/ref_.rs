//! `$ref`, `$recursiveRef`, and `$dynamicRef`.
//!
//! Plain references resolve at compile time to an arena index; cycles fall
//! out of the compiler's memoization. The dynamic pair cannot be resolved
//! statically: they compile every registered candidate target up front and
//! pick between them at evaluation time by walking the dynamic scope
//! outermost-first.
use ahash::AHashMap;
use serde_json::{Map, Value};

use crate::{
    compiler,
    error::{EvaluationError, SchemaError},
    evaluation::{EvalContext, Evaluation},
    graph::{ConstraintId, Evaluate},
    keywords::{BuiltinKeyword, CompilationResult},
    paths::keyword,
};

pub(crate) struct RefConstraint {
    keyword: BuiltinKeyword,
    target: ConstraintId,
}

impl Evaluate for RefConstraint {
    fn evaluate<'a>(
        &'a self,
        ctx: &mut EvalContext<'a>,
        instance: &Value,
        node: &mut Evaluation,
    ) -> Result<(), EvaluationError> {
        apply_reference(ctx, instance, node, self.keyword, self.target, None)
    }
}

pub(crate) struct DynamicRefConstraint {
    keyword: BuiltinKeyword,
    fallback: ConstraintId,
    /// Candidate targets per dynamic-scope URI.
    candidates: AHashMap<String, ConstraintId>,
}

impl Evaluate for DynamicRefConstraint {
    fn evaluate<'a>(
        &'a self,
        ctx: &mut EvalContext<'a>,
        instance: &Value,
        node: &mut Evaluation,
    ) -> Result<(), EvaluationError> {
        // The outermost schema in the dynamic scope that declares a matching
        // dynamic anchor wins; without one, behave like a plain reference
        let selected = ctx
            .dynamic_scope()
            .find_map(|uri| self.candidates.get_key_value(uri));
        let (target, scope_uri) = match selected {
            Some((uri, id)) => (*id, Some(uri.as_str())),
            None => (self.fallback, None),
        };
        apply_reference(ctx, instance, node, self.keyword, target, scope_uri)
    }
}

fn apply_reference<'a>(
    ctx: &mut EvalContext<'a>,
    instance: &Value,
    node: &mut Evaluation,
    reference_keyword: BuiltinKeyword,
    target: ConstraintId,
    scope_uri: Option<&'a str>,
) -> Result<(), EvaluationError> {
    ctx.enter_reference(target, node)?;
    let child = ctx.apply_in_scope(
        target,
        scope_uri,
        instance,
        node.evaluation_path()
            .clone_with(keyword(reference_keyword.as_str())),
        node.instance_location().clone(),
    );
    ctx.exit_reference();
    let child = child?;
    if !child.valid() {
        node.mark_invalid();
    }
    node.attach(reference_keyword.into(), child);
    Ok(())
}

fn reference_value<'s>(
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

/// Resolve a reference and compile its target, rooted at the resolved
/// location so that the canonical-location memoization ties cycles back to
/// already-reserved arena slots.
fn compile_target(
    ctx: &compiler::Context<'_>,
    reference: &str,
) -> Result<ConstraintId, SchemaError> {
    let resolved = ctx.lookup(reference).map_err(|error| {
        SchemaError::unresolved_reference(reference, ctx.schema_location(), error)
    })?;
    let (contents, resolver, draft) = resolved.into_inner();
    let fragment = reference
        .split_once('#')
        .map(|(_, fragment)| fragment)
        .unwrap_or("")
        .to_string();
    let tctx = ctx.at_resolved(resolver, draft, fragment, contents);
    compiler::compile_with(&tctx, tctx.as_resource_ref(contents))
}

/// Also called directly by the compiler for the drafts where `$ref`
/// suppresses its siblings.
pub(crate) fn compile_ref(
    ctx: &compiler::Context<'_>,
    _: &Map<String, Value>,
    value: &Value,
) -> Option<CompilationResult> {
    Some(compile_ref_impl(ctx, value))
}

fn compile_ref_impl(ctx: &compiler::Context<'_>, value: &Value) -> CompilationResult {
    let reference = reference_value(ctx, value)?;
    let target = compile_target(ctx, reference)?;
    Ok(Box::new(RefConstraint {
        keyword: BuiltinKeyword::Ref,
        target,
    }))
}

pub(crate) fn compile_dynamic_ref(
    ctx: &compiler::Context<'_>,
    _: &Map<String, Value>,
    value: &Value,
) -> Option<CompilationResult> {
    Some(compile_dynamic_impl(ctx, value))
}

fn compile_dynamic_impl(ctx: &compiler::Context<'_>, value: &Value) -> CompilationResult {
    let reference = reference_value(ctx, value)?;
    let fallback = compile_target(ctx, reference)?;
    // Dynamic behavior needs a plain-name fragment; pointer fragments and
    // cross-document references degrade to `$ref` semantics
    let name = match reference.strip_prefix('#') {
        Some(fragment) if !fragment.is_empty() && !fragment.starts_with('/') => fragment,
        _ => {
            return Ok(Box::new(RefConstraint {
                keyword: BuiltinKeyword::DynamicRef,
                target: fallback,
            }))
        }
    };
    let candidates = compile_candidates(ctx, name)?;
    // The initially resolved anchor must itself be dynamic
    if !candidates.contains_key(ctx.base_uri().as_str()) {
        return Ok(Box::new(RefConstraint {
            keyword: BuiltinKeyword::DynamicRef,
            target: fallback,
        }));
    }
    Ok(Box::new(DynamicRefConstraint {
        keyword: BuiltinKeyword::DynamicRef,
        fallback,
        candidates,
    }))
}

pub(crate) fn compile_recursive_ref(
    ctx: &compiler::Context<'_>,
    _: &Map<String, Value>,
    value: &Value,
) -> Option<CompilationResult> {
    Some(compile_recursive_impl(ctx, value))
}

fn compile_recursive_impl(ctx: &compiler::Context<'_>, value: &Value) -> CompilationResult {
    let reference = reference_value(ctx, value)?;
    let fallback = compile_target(ctx, reference)?;
    if reference != "#" {
        return Ok(Box::new(RefConstraint {
            keyword: BuiltinKeyword::RecursiveRef,
            target: fallback,
        }));
    }
    // `$recursiveAnchor: true` is indexed as an unnamed dynamic anchor
    let candidates = compile_candidates(ctx, "")?;
    if !candidates.contains_key(ctx.base_uri().as_str()) {
        // The current resource did not opt in; "#" is an ordinary reference
        return Ok(Box::new(RefConstraint {
            keyword: BuiltinKeyword::RecursiveRef,
            target: fallback,
        }));
    }
    Ok(Box::new(DynamicRefConstraint {
        keyword: BuiltinKeyword::RecursiveRef,
        fallback,
        candidates,
    }))
}

fn compile_candidates(
    ctx: &compiler::Context<'_>,
    name: &str,
) -> Result<AHashMap<String, ConstraintId>, SchemaError> {
    let mut candidates = AHashMap::new();
    for (uri, resource) in ctx.registry().dynamic_anchor_candidates(name) {
        let resolver = ctx.registry().resolver(uri.clone());
        let tctx = ctx.at_resolved(
            resolver,
            resource.draft(),
            name.to_string(),
            resource.contents(),
        );
        let id = compiler::compile_with(&tctx, tctx.as_resource_ref(resource.contents()))?;
        candidates.insert(uri.as_str().to_string(), id);
    }
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use crate::tests_util;
    use serde_json::{json, Value};
    use test_case::test_case;

    #[test_case(
        &json!({
            "properties": {"foo": {"$ref": "#/$defs/foo"}},
            "$defs": {"foo": {"type": "string"}}
        }),
        &json!({"foo": "x"}),
        true
    )]
    #[test_case(
        &json!({
            "properties": {"foo": {"$ref": "#/$defs/foo"}},
            "$defs": {"foo": {"type": "string"}}
        }),
        &json!({"foo": 42}),
        false
    )]
    fn plain_reference(schema: &Value, instance: &Value, expected: bool) {
        if expected {
            tests_util::is_valid(schema, instance);
        } else {
            tests_util::is_not_valid(schema, instance);
        }
    }

    #[test]
    fn recursive_list_with_progress() {
        let schema = json!({
            "$defs": {
                "n": {
                    "type": "object",
                    "properties": {"next": {"$ref": "#/$defs/n"}}
                }
            },
            "$ref": "#/$defs/n"
        });
        tests_util::is_valid(&schema, &json!({"next": {"next": {}}}));
        tests_util::is_not_valid(&schema, &json!({"next": {"next": 3}}));
    }

    #[test]
    fn self_reference_without_progress_is_detected() {
        let evaluator = crate::evaluator_for(&json!({"$ref": "#"})).expect("Valid schema");
        let error = evaluator.evaluate(&json!(1)).expect_err("Should not terminate");
        assert!(matches!(
            error,
            crate::EvaluationError::InfiniteRecursion { .. }
        ));
    }

    #[test]
    fn reference_keyword_is_part_of_the_evaluation_path() {
        let evaluation = tests_util::evaluate(
            &json!({
                "properties": {"foo": {"$ref": "#/$defs/foo"}},
                "$defs": {"foo": {"type": "string"}}
            }),
            &json!({"foo": 42}),
        );
        let paths = tests_util::collect_paths(&evaluation);
        assert!(paths.contains(&"/properties/foo/$ref".to_string()));
    }
}
