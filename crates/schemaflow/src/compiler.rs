//! Building a constraint graph from a schema document.
//!
//! Compilation walks the schema keyword-by-keyword in priority order and
//! produces arena-indexed [`SchemaConstraint`]s. Memoization per canonical
//! location makes `$ref` cycles plain index edges: a reserved-but-unfilled
//! arena slot doubles as the lazy handle for a schema that is still being
//! compiled further up the stack.
use std::{cell::RefCell, fmt::Write, rc::Rc, sync::Arc};

use ahash::AHashMap;
use serde_json::{Map, Value};

use referencing::{uri, Draft, Registry, Resolved, Resolver, ResourceRef, Vocabulary, VocabularySet};

use crate::{
    error::SchemaError,
    evaluator::Evaluator,
    graph::{ConstraintGraph, ConstraintId, KeywordConstraint, SchemaConstraint},
    keywords::{self, custom::CustomConstraint, unrecognized::UnrecognizedConstraint, Keyword},
    options::EvaluationOptions,
};

/// A single segment of the location of a schema within its resource.
#[derive(Debug, Clone, Copy)]
pub(crate) enum LocationSegment<'a> {
    Key(&'a str),
    Index(usize),
}

impl<'a> From<&'a str> for LocationSegment<'a> {
    fn from(value: &'a str) -> Self {
        LocationSegment::Key(value)
    }
}

impl<'a> From<&'a String> for LocationSegment<'a> {
    fn from(value: &'a String) -> Self {
        LocationSegment::Key(value)
    }
}

impl From<usize> for LocationSegment<'_> {
    fn from(value: usize) -> Self {
        LocationSegment::Index(value)
    }
}

#[derive(Default)]
pub(crate) struct GraphBuilder {
    nodes: Vec<Option<SchemaConstraint>>,
    seen: AHashMap<String, ConstraintId>,
}

impl GraphBuilder {
    fn lookup(&self, location: &str) -> Option<ConstraintId> {
        self.seen.get(location).copied()
    }
    fn reserve(&mut self, location: String) -> ConstraintId {
        let id = ConstraintId(self.nodes.len());
        self.nodes.push(None);
        self.seen.insert(location, id);
        id
    }
    fn fill(&mut self, id: ConstraintId, constraint: SchemaConstraint) {
        self.nodes[id.0] = Some(constraint);
    }
    fn finish(self) -> ConstraintGraph {
        ConstraintGraph::new(
            self.nodes
                .into_iter()
                // INVARIANT: every reserved slot is filled before compilation returns
                .map(|node| node.expect("Reserved constraint was never compiled"))
                .collect(),
        )
    }
}

/// Container for the information required to compile one schema.
///
/// Tracks the location within the current resource, the resolver for that
/// resource, the active dialect, and the shared graph builder.
#[derive(Clone)]
pub(crate) struct Context<'a> {
    config: Arc<EvaluationOptions>,
    registry: Arc<Registry>,
    resolver: Rc<Resolver<'a>>,
    draft: Draft,
    vocabularies: Rc<VocabularySet>,
    /// JSON Pointer within the current resource, in fragment form.
    fragment: String,
    graph: Rc<RefCell<GraphBuilder>>,
}

impl<'a> Context<'a> {
    pub(crate) fn new(
        config: Arc<EvaluationOptions>,
        registry: Arc<Registry>,
        resolver: Rc<Resolver<'a>>,
        draft: Draft,
        vocabularies: Rc<VocabularySet>,
    ) -> Self {
        Context {
            config,
            registry,
            resolver,
            draft,
            vocabularies,
            fragment: String::new(),
            graph: Rc::new(RefCell::new(GraphBuilder::default())),
        }
    }
    pub(crate) fn draft(&self) -> Draft {
        self.draft
    }
    pub(crate) fn config(&self) -> &Arc<EvaluationOptions> {
        &self.config
    }
    pub(crate) fn registry(&self) -> &Registry {
        &self.registry
    }
    /// Vocabulary-based keyword activation. Drafts 6 and 7 predate
    /// vocabularies, so every keyword of the draft is active there.
    pub(crate) fn has_vocabulary(&self, vocabulary: &Vocabulary) -> bool {
        self.draft <= Draft::Draft7 || self.vocabularies.contains(vocabulary)
    }
    pub(crate) fn validates_formats_by_default(&self) -> bool {
        self.config
            .validate_formats()
            .unwrap_or(self.draft <= Draft::Draft7)
    }
    /// Canonical location of the current schema: absolute URI + pointer
    /// fragment.
    pub(crate) fn schema_location(&self) -> String {
        format!("{}#{}", self.resolver.base_uri().as_str(), self.fragment)
    }
    /// A context one location segment deeper within the same resource.
    pub(crate) fn new_at_location<'s>(&self, segment: impl Into<LocationSegment<'s>>) -> Self {
        let mut fragment = self.fragment.clone();
        fragment.push('/');
        match segment.into() {
            LocationSegment::Key(key) => {
                for ch in key.chars() {
                    match ch {
                        '~' => fragment.push_str("~0"),
                        '/' => fragment.push_str("~1"),
                        _ => fragment.push(ch),
                    }
                }
            }
            LocationSegment::Index(index) => {
                let _ = fragment.write_str(itoa::Buffer::new().format(index));
            }
        }
        Context {
            config: Arc::clone(&self.config),
            registry: Arc::clone(&self.registry),
            resolver: Rc::clone(&self.resolver),
            draft: self.draft,
            vocabularies: Rc::clone(&self.vocabularies),
            fragment,
            graph: Rc::clone(&self.graph),
        }
    }
    pub(crate) fn as_resource_ref<'r>(&self, contents: &'r Value) -> ResourceRef<'r> {
        self.draft
            .detect(contents)
            .unwrap_or(self.draft)
            .create_resource_ref(contents)
    }
    /// A context for a subresource: `$id`-bearing schemas re-base the
    /// resolver and restart the location fragment.
    pub(crate) fn in_subresource(
        &self,
        resource: ResourceRef,
    ) -> Result<Context<'a>, referencing::Error> {
        if resource.id().is_some() {
            let resolver = self.resolver.in_subresource(resource)?;
            let draft = resource.draft();
            Ok(Context {
                config: Arc::clone(&self.config),
                registry: Arc::clone(&self.registry),
                resolver: Rc::new(resolver),
                draft,
                vocabularies: Rc::new(self.registry.find_vocabularies(draft, resource.contents())),
                fragment: String::new(),
                graph: Rc::clone(&self.graph),
            })
        } else {
            let mut ctx = self.clone();
            ctx.draft = resource.draft();
            Ok(ctx)
        }
    }
    /// A context rooted at a resolved reference target. The resolver may
    /// borrow the registry for a shorter region than this context does.
    pub(crate) fn at_resolved<'r>(
        &self,
        resolver: Resolver<'r>,
        draft: Draft,
        fragment: String,
        contents: &Value,
    ) -> Context<'r> {
        Context {
            config: Arc::clone(&self.config),
            registry: Arc::clone(&self.registry),
            resolver: Rc::new(resolver),
            draft,
            vocabularies: Rc::new(self.registry.find_vocabularies(draft, contents)),
            fragment,
            graph: Rc::clone(&self.graph),
        }
    }
    pub(crate) fn lookup(&self, reference: &str) -> Result<Resolved<'a>, referencing::Error> {
        self.resolver.lookup(reference)
    }
    pub(crate) fn base_uri(&self) -> String {
        self.resolver.base_uri().as_str().to_string()
    }
    fn is_resource_root(&self) -> bool {
        self.fragment.is_empty()
    }
    fn lookup_compiled(&self, location: &str) -> Option<ConstraintId> {
        self.graph.borrow().lookup(location)
    }
    fn reserve(&self, location: String) -> ConstraintId {
        self.graph.borrow_mut().reserve(location)
    }
    fn fill(&self, id: ConstraintId, constraint: SchemaConstraint) {
        self.graph.borrow_mut().fill(id, constraint);
    }
    fn into_graph(self) -> ConstraintGraph {
        let graph = self.graph;
        // INVARIANT: all child contexts are gone once compilation finishes
        Rc::try_unwrap(graph)
            .map(RefCell::into_inner)
            .unwrap_or_else(|_| panic!("Graph builder still shared after compilation"))
            .finish()
    }
}

pub(crate) fn build_evaluator(
    config: EvaluationOptions,
    schema: &Value,
) -> Result<Evaluator, SchemaError> {
    // Draft preference: explicit option, then `$schema`, then the default
    let draft = if let Some(draft) = config.draft() {
        draft
    } else {
        match Draft::default().detect(schema) {
            Ok(draft) => draft,
            Err(referencing::Error::UnknownSpecification { specification }) => {
                if config.allows_unknown_dialects() {
                    Draft::default()
                } else {
                    return Err(SchemaError::UnknownSpecification { specification });
                }
            }
            Err(error) => return Err(error.into()),
        }
    };
    let resource = draft.create_resource(schema.clone());
    let base_uri = resource
        .id()
        .unwrap_or(uri::DEFAULT_ROOT_URI.as_str())
        .to_string();

    let mut resources = Vec::with_capacity(1 + config.resources().len());
    resources.push((base_uri.clone(), resource));
    for (uri, resource) in config.resources() {
        resources.push((uri.clone(), resource.clone()));
    }

    let registry = Arc::new(Registry::default().try_with_resources_and_retriever(
        resources.into_iter(),
        config.retriever(),
        draft,
    )?);
    let resolver = Rc::new(registry.try_resolver(&base_uri)?);
    let vocabularies = Rc::new(registry.find_vocabularies(draft, schema));

    let config = Arc::new(config);
    let ctx = Context::new(
        Arc::clone(&config),
        Arc::clone(&registry),
        resolver,
        draft,
        vocabularies,
    );
    let root = compile(&ctx, ctx.as_resource_ref(schema))?;
    let graph = ctx.into_graph();
    Ok(Evaluator::from_parts(graph, root, draft, config))
}

/// Compile a schema, re-basing on its `$id` first if it has one.
pub(crate) fn compile(
    ctx: &Context<'_>,
    resource: ResourceRef<'_>,
) -> Result<ConstraintId, SchemaError> {
    let ctx = ctx.in_subresource(resource)?;
    compile_with(&ctx, resource)
}

/// Compile a schema at the context's exact location.
pub(crate) fn compile_with(
    ctx: &Context<'_>,
    resource: ResourceRef<'_>,
) -> Result<ConstraintId, SchemaError> {
    let location = ctx.schema_location();
    if let Some(id) = ctx.lookup_compiled(&location) {
        return Ok(id);
    }
    let id = ctx.reserve(location.clone());
    let scope_uri = ctx.is_resource_root().then(|| ctx.base_uri());
    let constraints = match resource.contents() {
        Value::Bool(true) => Vec::new(),
        Value::Bool(false) => vec![KeywordConstraint {
            keyword: Keyword::Schema,
            evaluator: Box::new(keywords::boolean::FalseConstraint),
        }],
        Value::Object(schema) => compile_keywords(ctx, schema)?,
        contents => {
            return Err(SchemaError::parse(
                location,
                format!("{contents} is not of types \"boolean\", \"object\""),
            ))
        }
    };
    ctx.fill(
        id,
        SchemaConstraint {
            location,
            scope_uri,
            constraints,
        },
    );
    Ok(id)
}

/// Keywords that shape lexical scope and carry no constraint of their own.
/// They are processed before everything else (registry indexing, base URI
/// scoping), which is what the sentinel-minimum priority amounts to.
const STRUCTURAL: &[&str] = &[
    "$anchor",
    "$comment",
    "$defs",
    "$dynamicAnchor",
    "$id",
    "$recursiveAnchor",
    "$schema",
    "$vocabulary",
    "definitions",
];

enum Pending<'s> {
    Builtin(Keyword, keywords::CompileFunc, &'s Value),
    Custom(&'s str, &'s Value),
    Unrecognized(&'s str, &'s Value),
}

fn compile_keywords(
    ctx: &Context<'_>,
    schema: &Map<String, Value>,
) -> Result<Vec<KeywordConstraint>, SchemaError> {
    // Drafts 6 & 7 ignore every sibling of `$ref`
    if ctx.draft() <= Draft::Draft7 {
        if let Some(reference) = schema.get("$ref") {
            let evaluator = keywords::ref_::compile_ref(ctx, schema, reference)
                .expect("`$ref` compilation is never skipped")?;
            return Ok(vec![KeywordConstraint {
                keyword: keywords::BuiltinKeyword::Ref.into(),
                evaluator,
            }]);
        }
    }
    if schema.contains_key("$recursiveRef") && schema.contains_key("$dynamicRef") {
        return Err(SchemaError::draft_incompatible(
            ctx.schema_location(),
            ctx.draft(),
            "'$recursiveRef' and '$dynamicRef' cannot appear in the same schema object",
        ));
    }

    let mut queue = Vec::with_capacity(schema.len());
    for (index, (key, value)) in schema.iter().enumerate() {
        if STRUCTURAL.contains(&key.as_str()) {
            continue;
        }
        if ctx.config().keyword_factory(key).is_some() {
            queue.push((keywords::priority(key), index, Pending::Custom(key, value)));
        } else if let Some((keyword, compile)) = keywords::get_for_draft(ctx, key) {
            queue.push((
                keywords::priority(key),
                index,
                Pending::Builtin(keyword, compile, value),
            ));
        } else if !ctx.draft().is_known_keyword(key) {
            // Unrecognized keywords round-trip as annotations
            queue.push((0, index, Pending::Unrecognized(key, value)));
        }
    }
    // Ascending priority; source order breaks ties, so sibling dependencies
    // are always compiled (and evaluated) before their dependents
    queue.sort_by_key(|(priority, index, _)| (*priority, *index));

    let mut constraints = Vec::with_capacity(queue.len());
    for (_, _, pending) in queue {
        match pending {
            Pending::Builtin(keyword, compile, value) => {
                if let Some(result) = compile(ctx, schema, value) {
                    constraints.push(KeywordConstraint {
                        keyword,
                        evaluator: result?,
                    });
                }
            }
            Pending::Custom(key, value) => {
                let factory = ctx
                    .config()
                    .keyword_factory(key)
                    .expect("Factory presence was checked above");
                let keyword = factory.init(schema, value, &ctx.schema_location())?;
                constraints.push(KeywordConstraint {
                    keyword: Keyword::custom(key),
                    evaluator: Box::new(CustomConstraint::new(key, keyword)),
                });
            }
            Pending::Unrecognized(key, value) => {
                constraints.push(KeywordConstraint {
                    keyword: Keyword::custom(key),
                    evaluator: Box::new(UnrecognizedConstraint::new(key, value.clone())),
                });
            }
        }
    }
    Ok(constraints)
}
