use serde_json::{json, Value};
use test_case::test_case;

fn evaluator_for(schema: &Value) -> schemaflow::Evaluator {
    schemaflow::evaluator_for(schema).expect("Schema should compile")
}

#[test]
fn basic_validation() {
    let evaluator = evaluator_for(&json!({
        "type": "object",
        "properties": {"a": {"type": "integer"}},
        "required": ["a"]
    }));

    assert!(evaluator.apply(&json!({"a": 1})).flag().unwrap().valid);

    let output = evaluator.apply(&json!({})).basic().unwrap();
    assert!(!output.valid());
    let errors: Vec<(String, String)> = output
        .details()
        .iter()
        .flat_map(|unit| {
            unit.errors()
                .map(|(keyword, message)| (keyword.to_string(), message.to_string()))
        })
        .collect();
    assert_eq!(
        errors,
        [(
            "required".to_string(),
            "\"a\" is a required property".to_string()
        )]
    );
}

#[test]
fn applicator_annotation_flow() {
    let evaluator = evaluator_for(&json!({
        "properties": {"a": {}},
        "unevaluatedProperties": false
    }));
    assert!(evaluator.is_valid(&json!({"a": 1})));
    assert!(!evaluator.is_valid(&json!({"a": 1, "b": 2})));
}

#[test]
fn ref_cycle_with_progress() {
    let evaluator = evaluator_for(&json!({
        "$defs": {
            "n": {
                "type": "object",
                "properties": {"next": {"$ref": "#/$defs/n"}}
            }
        },
        "$ref": "#/$defs/n"
    }));
    assert!(evaluator.is_valid(&json!({"next": {"next": {}}})));
    assert!(!evaluator.is_valid(&json!({"next": {"next": 1}})));
}

#[test]
fn dynamic_reference_binds_to_the_outermost_anchor() {
    let generic_list = json!({
        "$id": "https://example.com/generic-list",
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$defs": {
            "defaultItemType": {"$dynamicAnchor": "T"}
        },
        "type": "array",
        "items": {"$dynamicRef": "#T"}
    });
    let string_list = json!({
        "$id": "https://example.com/string-list",
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$defs": {
            "itemType": {"$dynamicAnchor": "T", "type": "string"}
        },
        "$ref": "https://example.com/generic-list"
    });

    let evaluator = schemaflow::options()
        .with_resource(
            "https://example.com/generic-list",
            schemaflow::Resource::from_contents(generic_list.clone()).unwrap(),
        )
        .build(&string_list)
        .expect("Schema should compile");
    // The inner `$dynamicRef` binds to the outermost `$dynamicAnchor` in
    // the evaluation stack, i.e. the string specialization
    assert!(evaluator.is_valid(&json!(["a", "b"])));
    assert!(!evaluator.is_valid(&json!(["a", 1])));

    // Evaluated on its own, the generic list accepts anything
    let generic = evaluator_for(&generic_list);
    assert!(generic.is_valid(&json!(["a", 1])));
}

#[test]
fn draft_incompatible_items_form() {
    let error = schemaflow::evaluator_for(&json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "items": [{"type": "integer"}]
    }))
    .expect_err("Should not compile");
    assert!(matches!(
        error,
        schemaflow::SchemaError::DraftIncompatible { .. }
    ));
}

#[test]
fn basic_output_shape() {
    let evaluator = evaluator_for(&json!({
        "allOf": [{"type": "string"}, {"minLength": 3}]
    }));
    let output = evaluator.apply(&json!("ab")).basic().unwrap();
    assert!(!output.valid());

    let units: Vec<(bool, &str, &str)> = output
        .details()
        .iter()
        .map(|unit| (unit.valid(), unit.evaluation_path(), unit.instance_location()))
        .collect();
    assert_eq!(
        units,
        [
            (false, "", ""),
            (true, "/allOf/0", ""),
            (false, "/allOf/1", ""),
        ]
    );

    let serialized = serde_json::to_value(&output).unwrap();
    assert_eq!(
        serialized,
        json!({
            "valid": false,
            "details": [
                {
                    "valid": false,
                    "evaluationPath": "",
                    "schemaLocation": "json-schema:///#",
                    "instanceLocation": ""
                },
                {
                    "valid": true,
                    "evaluationPath": "/allOf/0",
                    "schemaLocation": "json-schema:///#/allOf/0",
                    "instanceLocation": ""
                },
                {
                    "valid": false,
                    "evaluationPath": "/allOf/1",
                    "schemaLocation": "json-schema:///#/allOf/1",
                    "instanceLocation": "",
                    "errors": {
                        "minLength": "\"ab\" is shorter than 3 characters"
                    }
                }
            ]
        })
    );
}

#[test]
fn flag_matches_hierarchical_root() {
    let evaluator = evaluator_for(&json!({
        "type": "object",
        "properties": {"a": {"type": "integer"}}
    }));
    for instance in [json!({"a": 1}), json!({"a": "x"}), json!(42)] {
        let output = evaluator.apply(&instance);
        assert_eq!(
            output.flag().unwrap().valid,
            output.hierarchical().unwrap().valid(),
            "Flag and Hierarchical disagree on {instance}"
        );
    }
}

#[test]
fn detailed_splices_out_pass_through_nodes() {
    let evaluator = evaluator_for(&json!({
        "properties": {"a": {"$ref": "#/$defs/x"}},
        "$defs": {"x": {"type": "integer"}}
    }));
    let detailed = evaluator.apply(&json!({"a": "s"})).detailed().unwrap();
    // Root and the `/properties/a` node each have a single child and no
    // errors or annotations of their own, so the failing `$ref` target
    // surfaces directly
    assert!(!detailed.valid());
    assert_eq!(detailed.evaluation_path(), "/properties/a/$ref");
    assert!(detailed.details().is_empty());

    let hierarchical = evaluator.apply(&json!({"a": "s"})).hierarchical().unwrap();
    assert_eq!(hierarchical.evaluation_path(), "");
    assert_eq!(hierarchical.details().len(), 1);
}

#[test]
fn output_round_trips_through_serde() {
    let evaluator = evaluator_for(&json!({
        "title": "point",
        "properties": {"x": {"type": "number"}}
    }));
    let output = evaluator.apply(&json!({"x": 1})).basic().unwrap();
    let serialized = serde_json::to_string(&output).unwrap();
    let parsed: Value = serde_json::from_str(&serialized).unwrap();
    assert_eq!(parsed, serde_json::to_value(&output).unwrap());
    assert_eq!(parsed["valid"], json!(true));
    assert_eq!(parsed["details"][0]["annotations"]["title"], json!("point"));
}

#[test_case(&json!({"maximum": 5}), &json!(5), true)]
#[test_case(&json!({"maximum": 5}), &json!(6), false)]
#[test_case(&json!({"maximum": 5}), &json!("5"), true; "non numbers are unconstrained")]
#[test_case(&json!({"type": "integer"}), &json!(1.0), true; "integer valued numbers pass")]
fn boundaries(schema: &Value, instance: &Value, expected: bool) {
    assert_eq!(schemaflow::is_valid(schema, instance), expected);
}

#[test]
fn unevaluated_properties_set_identity() {
    // evaluated_keys == properties ∪ patternProperties ∪ additionalProperties
    // from valid branches; everything else is unevaluated
    let evaluator = evaluator_for(&json!({
        "allOf": [
            {"properties": {"a": {}}},
            {"patternProperties": {"^b": {}}}
        ],
        "unevaluatedProperties": false
    }));
    assert!(evaluator.is_valid(&json!({"a": 1, "b1": 2})));
    assert!(!evaluator.is_valid(&json!({"a": 1, "c": 3})));
}

#[test]
fn cancellation_produces_a_partial_tree() {
    let evaluator = evaluator_for(&json!({"items": {"type": "integer"}}));
    let token = schemaflow::CancellationToken::new();
    token.cancel();
    let evaluation = evaluator
        .evaluate_cancellable(&json!([1, 2, 3]), &token)
        .unwrap();
    assert!(evaluation.cancelled());
    assert_eq!(evaluation.children().count(), 0);
}
