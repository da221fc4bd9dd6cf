//! Property dependencies: the legacy mixed-form `dependencies` of drafts 6
//! and 7, plus its 2019-09 split into `dependentRequired` and
//! `dependentSchemas`.
use serde_json::{Map, Value};

use crate::{
    compiler,
    error::{EvaluationError, SchemaError},
    evaluation::{EvalContext, Evaluation},
    graph::{ConstraintId, Evaluate},
    keywords::{required, BuiltinKeyword, CompilationResult},
    paths::keyword,
};

pub(crate) struct DependentRequiredConstraint {
    keyword: BuiltinKeyword,
    requirements: Vec<(String, Vec<String>)>,
}

impl Evaluate for DependentRequiredConstraint {
    fn evaluate<'a>(
        &'a self,
        _: &mut EvalContext<'a>,
        instance: &Value,
        node: &mut Evaluation,
    ) -> Result<(), EvaluationError> {
        let Value::Object(object) = instance else {
            return Ok(());
        };
        let mut missing = Vec::new();
        for (property, requirements) in &self.requirements {
            if !object.contains_key(property) {
                continue;
            }
            for requirement in requirements {
                if !object.contains_key(requirement) {
                    missing.push(requirement);
                }
            }
        }
        if !missing.is_empty() {
            node.fail(
                self.keyword.into(),
                required::missing_properties_message(&missing),
            );
        }
        Ok(())
    }
}

pub(crate) struct DependentSchemasConstraint {
    keyword: BuiltinKeyword,
    dependencies: Vec<(String, ConstraintId)>,
}

impl Evaluate for DependentSchemasConstraint {
    fn evaluate<'a>(
        &'a self,
        ctx: &mut EvalContext<'a>,
        instance: &Value,
        node: &mut Evaluation,
    ) -> Result<(), EvaluationError> {
        let Value::Object(object) = instance else {
            return Ok(());
        };
        let mut valid = true;
        for (property, target) in &self.dependencies {
            if !object.contains_key(property) {
                continue;
            }
            if ctx.is_cancelled() {
                return Ok(());
            }
            // The dependent schema applies to the whole object, so its
            // annotations stay visible to `unevaluatedProperties`
            let child = ctx.apply(
                *target,
                instance,
                node.evaluation_path()
                    .clone_with(keyword(self.keyword.as_str()))
                    .clone_with(property.as_str()),
                node.instance_location().clone(),
            )?;
            valid &= child.valid();
            node.attach(self.keyword.into(), child);
            if !valid && ctx.stops_on_first_error() {
                break;
            }
        }
        if !valid {
            node.mark_invalid();
        }
        Ok(())
    }
}

fn parse_requirements(
    ctx: &compiler::Context<'_>,
    map: &Map<String, Value>,
) -> Result<Vec<(String, Vec<String>)>, SchemaError> {
    let mut requirements = Vec::with_capacity(map.len());
    for (property, names) in map {
        requirements.push((property.clone(), required::parse_required(ctx, names)?));
    }
    Ok(requirements)
}

pub(crate) fn compile(
    ctx: &compiler::Context<'_>,
    _: &Map<String, Value>,
    value: &Value,
) -> Option<CompilationResult> {
    let Value::Object(map) = value else {
        return Some(Err(SchemaError::parse(
            ctx.schema_location(),
            format!("{value} is not of type \"object\""),
        )));
    };
    // The legacy form mixes required-name arrays with dependent schemas;
    // compile it as both and run them back to back
    let mut requirements = Vec::new();
    let mut dependencies = Vec::new();
    let kctx = ctx.new_at_location("dependencies");
    for (property, dependency) in map {
        if dependency.is_array() {
            match required::parse_required(ctx, dependency) {
                Ok(names) => requirements.push((property.clone(), names)),
                Err(error) => return Some(Err(error)),
            }
        } else {
            let pctx = kctx.new_at_location(property);
            match compiler::compile(&pctx, pctx.as_resource_ref(dependency)) {
                Ok(id) => dependencies.push((property.clone(), id)),
                Err(error) => return Some(Err(error)),
            }
        }
    }
    let keyword = BuiltinKeyword::Dependencies;
    let constraint: crate::graph::BoxedConstraint = match (
        requirements.is_empty(),
        dependencies.is_empty(),
    ) {
        (false, true) => Box::new(DependentRequiredConstraint {
            keyword,
            requirements,
        }),
        (true, false) | (true, true) => Box::new(DependentSchemasConstraint {
            keyword,
            dependencies,
        }),
        (false, false) => Box::new(MixedDependenciesConstraint {
            required: DependentRequiredConstraint {
                keyword,
                requirements,
            },
            schemas: DependentSchemasConstraint {
                keyword,
                dependencies,
            },
        }),
    };
    Some(Ok(constraint))
}

pub(crate) struct MixedDependenciesConstraint {
    required: DependentRequiredConstraint,
    schemas: DependentSchemasConstraint,
}

impl Evaluate for MixedDependenciesConstraint {
    fn evaluate<'a>(
        &'a self,
        ctx: &mut EvalContext<'a>,
        instance: &Value,
        node: &mut Evaluation,
    ) -> Result<(), EvaluationError> {
        self.required.evaluate(ctx, instance, node)?;
        self.schemas.evaluate(ctx, instance, node)
    }
}

pub(crate) fn compile_dependent_required(
    ctx: &compiler::Context<'_>,
    _: &Map<String, Value>,
    value: &Value,
) -> Option<CompilationResult> {
    let Value::Object(map) = value else {
        return Some(Err(SchemaError::parse(
            ctx.schema_location(),
            format!("{value} is not of type \"object\""),
        )));
    };
    Some(parse_requirements(ctx, map).map(|requirements| {
        Box::new(DependentRequiredConstraint {
            keyword: BuiltinKeyword::DependentRequired,
            requirements,
        }) as crate::graph::BoxedConstraint
    }))
}

pub(crate) fn compile_dependent_schemas(
    ctx: &compiler::Context<'_>,
    _: &Map<String, Value>,
    value: &Value,
) -> Option<CompilationResult> {
    let Value::Object(map) = value else {
        return Some(Err(SchemaError::parse(
            ctx.schema_location(),
            format!("{value} is not of type \"object\""),
        )));
    };
    let kctx = ctx.new_at_location("dependentSchemas");
    let mut dependencies = Vec::with_capacity(map.len());
    for (property, subschema) in map {
        let pctx = kctx.new_at_location(property);
        match compiler::compile(&pctx, pctx.as_resource_ref(subschema)) {
            Ok(id) => dependencies.push((property.clone(), id)),
            Err(error) => return Some(Err(error)),
        }
    }
    Some(Ok(Box::new(DependentSchemasConstraint {
        keyword: BuiltinKeyword::DependentSchemas,
        dependencies,
    })))
}

#[cfg(test)]
mod tests {
    use crate::tests_util;
    use serde_json::{json, Value};
    use test_case::test_case;

    #[test_case(&json!({"dependentRequired": {"a": ["b"]}}), &json!({"a": 1, "b": 2}))]
    #[test_case(&json!({"dependentRequired": {"a": ["b"]}}), &json!({"c": 1}))]
    #[test_case(&json!({"dependentSchemas": {"a": {"required": ["b"]}}}), &json!({"a": 1, "b": 2}))]
    #[test_case(&json!({"dependentSchemas": {"a": {"required": ["b"]}}}), &json!({}))]
    fn valid(schema: &Value, instance: &Value) {
        tests_util::is_valid(schema, instance);
    }

    #[test_case(&json!({"dependentRequired": {"a": ["b"]}}), &json!({"a": 1}))]
    #[test_case(&json!({"dependentSchemas": {"a": {"required": ["b"]}}}), &json!({"a": 1}))]
    fn invalid(schema: &Value, instance: &Value) {
        tests_util::is_not_valid(schema, instance);
    }

    #[test_case(&json!({"dependencies": {"bar": ["foo"]}}), &json!({"bar": 1, "foo": 2}), true)]
    #[test_case(&json!({"dependencies": {"bar": ["foo"]}}), &json!({"bar": 1}), false)]
    #[test_case(&json!({"dependencies": {"bar": {"minProperties": 2}}}), &json!({"bar": 1, "x": 2}), true)]
    #[test_case(&json!({"dependencies": {"bar": {"minProperties": 2}}}), &json!({"bar": 1}), false)]
    fn legacy_mixed_form(schema: &Value, instance: &Value, expected: bool) {
        if expected {
            tests_util::is_valid_with_draft(referencing::Draft::Draft7, schema, instance);
        } else {
            tests_util::is_not_valid_with_draft(referencing::Draft::Draft7, schema, instance);
        }
    }
}
