//! The compiled form of a schema: a graph of constraints.
//!
//! Compiled schemas are addressed by stable arena indexes so that `$ref`
//! cycles are plain index edges instead of owning references. The arena is
//! immutable after compilation and may be shared across concurrent
//! evaluations.
use core::fmt;

use serde_json::Value;

use crate::{
    error::EvaluationError,
    evaluation::{EvalContext, Evaluation},
    keywords::Keyword,
};

/// Index of a [`SchemaConstraint`] within its [`ConstraintGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ConstraintId(pub(crate) usize);

/// A single keyword compiled into its evaluator-ready form.
pub(crate) struct KeywordConstraint {
    pub(crate) keyword: Keyword,
    pub(crate) evaluator: BoxedConstraint,
}

pub(crate) type BoxedConstraint = Box<dyn Evaluate + Send + Sync>;

/// The compiled form of one schema object (or boolean schema).
///
/// Keyword constraints are stored in priority order: every sibling
/// dependency of a keyword precedes it in the list.
pub(crate) struct SchemaConstraint {
    /// Canonical schema location: absolute URI with a pointer fragment.
    pub(crate) location: String,
    /// Resource URI pushed onto the dynamic scope while this schema is open.
    /// Set for resource roots only.
    pub(crate) scope_uri: Option<String>,
    pub(crate) constraints: Vec<KeywordConstraint>,
}

impl fmt::Debug for SchemaConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaConstraint")
            .field("location", &self.location)
            .field(
                "keywords",
                &self
                    .constraints
                    .iter()
                    .map(|constraint| constraint.keyword.as_str().to_string())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Arena owning every compiled schema of a single evaluator.
#[derive(Debug)]
pub(crate) struct ConstraintGraph {
    nodes: Vec<SchemaConstraint>,
}

impl ConstraintGraph {
    pub(crate) fn new(nodes: Vec<SchemaConstraint>) -> Self {
        Self { nodes }
    }
    pub(crate) fn get(&self, id: ConstraintId) -> &SchemaConstraint {
        &self.nodes[id.0]
    }
}

/// The evaluator callback of one compiled keyword.
///
/// Implementations read the local instance, consult sibling annotations and
/// child evaluations already present on `node`, spawn child evaluations via
/// the context, and record an annotation or a failure on the node.
pub(crate) trait Evaluate: Send + Sync {
    fn evaluate<'a>(
        &'a self,
        ctx: &mut EvalContext<'a>,
        instance: &Value,
        node: &mut Evaluation,
    ) -> Result<(), EvaluationError>;
}
