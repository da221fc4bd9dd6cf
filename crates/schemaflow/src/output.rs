//! Projection of the raw evaluation tree into the four standard output
//! formats: `Flag`, `Basic`, `Detailed`, and `Hierarchical`.
use serde::ser::SerializeMap;
use serde_json::Value;

use crate::{
    error::EvaluationError,
    evaluation::{CancellationToken, Evaluation, ShortCircuit},
    evaluator::Evaluator,
};

/// The deferred result of applying a schema to an instance.
///
/// Each format method evaluates on demand: `flag` short-circuits, the
/// structured formats collect everything.
#[derive(Debug, Clone)]
pub struct Output<'a, 'b> {
    evaluator: &'a Evaluator,
    instance: &'b Value,
    token: Option<CancellationToken>,
}

impl<'a, 'b> Output<'a, 'b> {
    pub(crate) fn new(evaluator: &'a Evaluator, instance: &'b Value) -> Output<'a, 'b> {
        Output {
            evaluator,
            instance,
            token: None,
        }
    }

    /// Check the given token between keyword evaluations.
    #[must_use]
    pub fn with_cancellation(mut self, token: &CancellationToken) -> Self {
        self.token = Some(token.clone());
        self
    }

    /// The `Flag` format: a single boolean.
    pub fn flag(&self) -> Result<Flag, EvaluationError> {
        self.evaluator
            .run(
                self.instance,
                ShortCircuit::AnnotationsOnly,
                self.token.as_ref(),
            )
            .map(|evaluation| Flag {
                valid: evaluation.valid(),
            })
    }

    /// The `Basic` format: one record per evaluation node, flattened
    /// depth-first.
    pub fn basic(&self) -> Result<BasicOutput, EvaluationError> {
        let evaluation = self.evaluate()?;
        let mut details = Vec::new();
        flatten(&evaluation, &mut details);
        Ok(BasicOutput {
            valid: evaluation.valid(),
            details,
        })
    }

    /// The `Detailed` format: the evaluation tree with pass-through nodes
    /// (exactly one child, nothing of their own to report) spliced out.
    pub fn detailed(&self) -> Result<OutputUnit, EvaluationError> {
        self.evaluate().map(|evaluation| collapse(tree(&evaluation)))
    }

    /// The `Hierarchical` format: the full evaluation tree, never collapsed.
    pub fn hierarchical(&self) -> Result<OutputUnit, EvaluationError> {
        self.evaluate().map(|evaluation| tree(&evaluation))
    }

    fn evaluate(&self) -> Result<Evaluation, EvaluationError> {
        self.evaluator
            .run(self.instance, ShortCircuit::CollectAll, self.token.as_ref())
    }
}

/// The `Flag` output document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Flag {
    pub valid: bool,
}

/// The `Basic` output document.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicOutput {
    valid: bool,
    details: Vec<OutputUnit>,
}

impl BasicOutput {
    /// Overall verdict.
    #[must_use]
    pub fn valid(&self) -> bool {
        self.valid
    }
    /// The flat list of per-node records.
    #[must_use]
    pub fn details(&self) -> &[OutputUnit] {
        &self.details
    }
}

/// One record of the structured output formats.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputUnit {
    valid: bool,
    evaluation_path: String,
    schema_location: String,
    instance_location: String,
    errors: Vec<(String, String)>,
    annotations: Vec<(String, Value)>,
    details: Vec<OutputUnit>,
}

impl OutputUnit {
    #[must_use]
    pub fn valid(&self) -> bool {
        self.valid
    }
    #[must_use]
    pub fn evaluation_path(&self) -> &str {
        &self.evaluation_path
    }
    #[must_use]
    pub fn schema_location(&self) -> &str {
        &self.schema_location
    }
    #[must_use]
    pub fn instance_location(&self) -> &str {
        &self.instance_location
    }
    /// Keyword errors at this node, in evaluation order.
    pub fn errors(&self) -> impl Iterator<Item = (&str, &str)> {
        self.errors
            .iter()
            .map(|(keyword, message)| (keyword.as_str(), message.as_str()))
    }
    /// Keyword annotations at this node, in evaluation order.
    pub fn annotations(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.annotations
            .iter()
            .map(|(keyword, value)| (keyword.as_str(), value))
    }
    /// Child records; empty in the `Basic` format.
    #[must_use]
    pub fn details(&self) -> &[OutputUnit] {
        &self.details
    }
}

fn record(evaluation: &Evaluation) -> OutputUnit {
    let errors = if evaluation.valid() {
        Vec::new()
    } else {
        evaluation
            .errors()
            .map(|(keyword, message)| (keyword.to_string(), message.to_string()))
            .collect()
    };
    let annotations = if evaluation.valid() {
        evaluation
            .annotations()
            .map(|(keyword, value)| (keyword.to_string(), value.clone()))
            .collect()
    } else {
        Vec::new()
    };
    OutputUnit {
        valid: evaluation.valid(),
        evaluation_path: evaluation.evaluation_path().to_string(),
        schema_location: evaluation.schema_location().to_string(),
        instance_location: evaluation.instance_location().to_string(),
        errors,
        annotations,
        details: Vec::new(),
    }
}

fn flatten(evaluation: &Evaluation, into: &mut Vec<OutputUnit>) {
    into.push(record(evaluation));
    for child in evaluation.children() {
        flatten(child, into);
    }
}

fn tree(evaluation: &Evaluation) -> OutputUnit {
    let mut unit = record(evaluation);
    unit.details = evaluation.children().map(tree).collect();
    unit
}

fn collapse(unit: OutputUnit) -> OutputUnit {
    let mut unit = OutputUnit {
        details: unit.details.into_iter().map(collapse).collect(),
        ..unit
    };
    if unit.details.len() == 1 && unit.errors.is_empty() && unit.annotations.is_empty() {
        unit.details.pop().expect("Has exactly one element")
    } else {
        unit
    }
}

impl serde::Serialize for BasicOutput {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("valid", &self.valid)?;
        map.serialize_entry("details", &self.details)?;
        map.end()
    }
}

struct AsMap<'u, T>(&'u [(String, T)]);

impl<T: serde::Serialize> serde::Serialize for AsMap<'_, T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (keyword, value) in self.0 {
            map.serialize_entry(keyword, value)?;
        }
        map.end()
    }
}

impl serde::Serialize for OutputUnit {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("valid", &self.valid)?;
        map.serialize_entry("evaluationPath", &self.evaluation_path)?;
        map.serialize_entry("schemaLocation", &self.schema_location)?;
        map.serialize_entry("instanceLocation", &self.instance_location)?;
        if !self.errors.is_empty() {
            map.serialize_entry("errors", &AsMap(&self.errors))?;
        }
        if !self.annotations.is_empty() {
            map.serialize_entry("annotations", &AsMap(&self.annotations))?;
        }
        if !self.details.is_empty() {
            map.serialize_entry("details", &self.details)?;
        }
        map.end()
    }
}
