use serde_json::{json, Value};

use schemaflow::{Draft, Resource, Retrieve, Uri};

#[test]
fn reference_into_a_registered_resource() {
    let evaluator = schemaflow::options()
        .with_resource(
            "https://example.com/person.json",
            Resource::from_contents(json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "age": {"type": "integer"}
                },
                "required": ["name", "age"]
            }))
            .unwrap(),
        )
        .build(&json!({"$ref": "https://example.com/person.json"}))
        .expect("Schema should compile");

    assert!(evaluator.is_valid(&json!({"name": "Alice", "age": 30})));
    assert!(!evaluator.is_valid(&json!({"name": "Bob"})));
}

struct StaticRetriever {
    schemas: Vec<(String, Value)>,
}

impl Retrieve for StaticRetriever {
    fn retrieve(&self, uri: &Uri<&str>) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        self.schemas
            .iter()
            .find(|(registered, _)| registered == uri.as_str())
            .map(|(_, contents)| contents.clone())
            .ok_or_else(|| format!("Schema not found: {uri}").into())
    }
}

#[test]
fn missing_references_go_through_the_retriever() {
    let retriever = StaticRetriever {
        schemas: vec![(
            "https://example.com/ids.json".to_string(),
            json!({"type": "integer", "minimum": 1}),
        )],
    };
    let evaluator = schemaflow::options()
        .with_retriever(retriever)
        .build(&json!({"$ref": "https://example.com/ids.json"}))
        .expect("Schema should compile");
    assert!(evaluator.is_valid(&json!(3)));
    assert!(!evaluator.is_valid(&json!(0)));
}

#[test]
fn unresolved_reference_fails_compilation() {
    let error = schemaflow::evaluator_for(&json!({"$ref": "https://example.com/absent.json"}))
        .expect_err("Should not compile");
    assert!(matches!(
        error,
        schemaflow::SchemaError::UnresolvedReference { .. }
    ));
}

#[test]
fn reference_to_a_plain_anchor() {
    let evaluator = schemaflow::evaluator_for(&json!({
        "$defs": {"item": {"$anchor": "item", "type": "integer"}},
        "items": {"$ref": "#item"}
    }))
    .expect("Schema should compile");
    assert!(evaluator.is_valid(&json!([1, 2])));
    assert!(!evaluator.is_valid(&json!(["x"])));
}

#[test]
fn id_scoping_applies_to_nested_references() {
    let evaluator = schemaflow::options()
        .with_resource(
            "https://example.com/nested/inner.json",
            Resource::from_contents(json!({"type": "string"})).unwrap(),
        )
        .build(&json!({
            "$id": "https://example.com/nested/root.json",
            "properties": {
                "value": {"$ref": "inner.json"}
            }
        }))
        .expect("Schema should compile");
    assert!(evaluator.is_valid(&json!({"value": "x"})));
    assert!(!evaluator.is_valid(&json!({"value": 1})));
}

#[test]
fn recursive_ref_extends_through_the_scope() {
    // The classic extensible-tree setup: the extension re-enters through
    // `$recursiveRef`, so nested nodes are validated against the extension
    let tree = json!({
        "$schema": "https://json-schema.org/draft/2019-09/schema",
        "$id": "https://example.com/tree",
        "$recursiveAnchor": true,
        "type": "object",
        "properties": {
            "children": {
                "type": "array",
                "items": {"$recursiveRef": "#"}
            }
        }
    });
    let strict_tree = json!({
        "$schema": "https://json-schema.org/draft/2019-09/schema",
        "$id": "https://example.com/strict-tree",
        "$recursiveAnchor": true,
        "$ref": "https://example.com/tree",
        "unevaluatedProperties": false
    });

    let evaluator = schemaflow::options()
        .with_resource(
            "https://example.com/tree",
            Resource::from_contents(tree).unwrap(),
        )
        .build(&strict_tree)
        .expect("Schema should compile");

    assert!(evaluator.is_valid(&json!({"children": [{"children": []}]})));
    // The extra property hides deep inside a node reached through
    // `$recursiveRef`; only the strict extension rejects it
    assert!(!evaluator.is_valid(&json!({"children": [{"daat": 1}]})));
}

#[test]
fn dynamic_and_recursive_refs_do_not_mix() {
    let error = schemaflow::options()
        .with_draft(Draft::Draft202012)
        .build(&json!({
            "$recursiveRef": "#",
            "$dynamicRef": "#T"
        }))
        .expect_err("Should not compile");
    assert!(matches!(
        error,
        schemaflow::SchemaError::DraftIncompatible { .. }
    ));
}

#[test]
fn evaluation_paths_cross_reference_boundaries() {
    let evaluator = schemaflow::evaluator_for(&json!({
        "$defs": {"positive": {"minimum": 0}},
        "properties": {"count": {"$ref": "#/$defs/positive"}}
    }))
    .expect("Schema should compile");
    let output = evaluator.apply(&json!({"count": -1})).basic().unwrap();
    let paths: Vec<&str> = output
        .details()
        .iter()
        .map(schemaflow::OutputUnit::evaluation_path)
        .collect();
    assert_eq!(paths, ["", "/properties/count", "/properties/count/$ref"]);
    assert_eq!(
        output.details()[2].schema_location(),
        "json-schema:///#/$defs/positive"
    );
}
