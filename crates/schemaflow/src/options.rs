use std::sync::Arc;

use ahash::AHashMap;
use referencing::{Draft, Resource, Retrieve};
use serde_json::Value;

use crate::{
    compiler,
    error::SchemaError,
    evaluation::ShortCircuit,
    evaluator::Evaluator,
    keywords::{custom::KeywordFactory, format::Format},
};

/// Configuration for building an [`Evaluator`].
#[derive(Clone)]
pub struct EvaluationOptions {
    draft: Option<Draft>,
    /// Retriever for references to resources that were not supplied.
    retriever: Arc<dyn Retrieve>,
    /// Additional resources addressable during evaluation.
    resources: AHashMap<String, Resource>,
    formats: AHashMap<String, Arc<dyn Format>>,
    validate_formats: Option<bool>,
    ignore_unknown_formats: bool,
    allow_unknown_dialects: bool,
    short_circuit: bool,
    keywords: AHashMap<String, Arc<dyn KeywordFactory>>,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        EvaluationOptions {
            draft: None,
            retriever: Arc::new(referencing::DefaultRetriever),
            resources: AHashMap::default(),
            formats: AHashMap::default(),
            validate_formats: None,
            ignore_unknown_formats: true,
            allow_unknown_dialects: false,
            short_circuit: false,
            keywords: AHashMap::default(),
        }
    }
}

impl EvaluationOptions {
    /// Build an evaluator for `schema` using the current options.
    ///
    /// # Example
    ///
    /// ```rust
    /// use serde_json::json;
    ///
    /// let schema = json!({"type": "string"});
    /// let evaluator = schemaflow::options()
    ///     .build(&schema)
    ///     .expect("A valid schema");
    ///
    /// assert!(evaluator.is_valid(&json!("Hello")));
    /// assert!(!evaluator.is_valid(&json!(42)));
    /// ```
    pub fn build(&self, schema: &Value) -> Result<Evaluator, SchemaError> {
        compiler::build_evaluator(self.clone(), schema)
    }
    /// Set the JSON Schema draft version, overriding `$schema` detection.
    #[inline]
    pub fn with_draft(&mut self, draft: Draft) -> &mut Self {
        self.draft = Some(draft);
        self
    }
    pub(crate) fn draft(&self) -> Option<Draft> {
        self.draft
    }
    /// Add a schema resource, addressable by the given URI during
    /// evaluation.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use serde_json::json;
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// use schemaflow::Resource;
    ///
    /// let extra = Resource::from_contents(json!({"minimum": 5}))?;
    /// let evaluator = schemaflow::options()
    ///     .with_resource("urn:minimum-schema", extra)
    ///     .build(&json!({"$ref": "urn:minimum-schema"}))?;
    /// assert!(evaluator.is_valid(&json!(5)));
    /// assert!(!evaluator.is_valid(&json!(4)));
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_resource(&mut self, uri: impl Into<String>, resource: Resource) -> &mut Self {
        self.resources.insert(uri.into(), resource);
        self
    }
    /// Add multiple schema resources at once.
    pub fn with_resources(
        &mut self,
        pairs: impl Iterator<Item = (impl Into<String>, Resource)>,
    ) -> &mut Self {
        for (uri, resource) in pairs {
            self.resources.insert(uri.into(), resource);
        }
        self
    }
    pub(crate) fn resources(&self) -> &AHashMap<String, Resource> {
        &self.resources
    }
    /// Set a retriever to fetch external resources.
    pub fn with_retriever(&mut self, retriever: impl Retrieve + 'static) -> &mut Self {
        self.retriever = Arc::new(retriever);
        self
    }
    pub(crate) fn retriever(&self) -> &dyn Retrieve {
        &*self.retriever
    }
    /// Register a custom format validator.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use serde_json::json;
    /// let schema = json!({"type": "string", "format": "custom"});
    /// let evaluator = schemaflow::options()
    ///     .with_format("custom", |value: &str| value.ends_with("42!"))
    ///     .should_validate_formats(true)
    ///     .build(&schema)
    ///     .expect("A valid schema");
    ///
    /// assert!(evaluator.is_valid(&json!("foo42!")));
    /// assert!(!evaluator.is_valid(&json!("foo")));
    /// ```
    pub fn with_format<N, F>(&mut self, name: N, format: F) -> &mut Self
    where
        N: Into<String>,
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.formats.insert(name.into(), Arc::new(format));
        self
    }
    pub(crate) fn format(&self, name: &str) -> Option<&Arc<dyn Format>> {
        self.formats.get(name)
    }
    /// Set whether `format` asserts. The default depends on the draft:
    /// drafts 6 and 7 assert, 2019-09 and later annotate.
    #[inline]
    pub fn should_validate_formats(&mut self, yes: bool) -> &mut Self {
        self.validate_formats = Some(yes);
        self
    }
    pub(crate) fn validate_formats(&self) -> Option<bool> {
        self.validate_formats
    }
    /// Set whether unknown formats are ignored. When set to `false` and
    /// format validation is on, unknown formats fail compilation.
    pub fn should_ignore_unknown_formats(&mut self, yes: bool) -> &mut Self {
        self.ignore_unknown_formats = yes;
        self
    }
    pub(crate) const fn ignores_unknown_formats(&self) -> bool {
        self.ignore_unknown_formats
    }
    /// Treat unknown `$schema` URIs as the default dialect instead of
    /// failing compilation.
    pub fn allow_unknown_dialects(&mut self, yes: bool) -> &mut Self {
        self.allow_unknown_dialects = yes;
        self
    }
    pub(crate) const fn allows_unknown_dialects(&self) -> bool {
        self.allow_unknown_dialects
    }
    /// Stop evaluating a schema's keywords at the first failure instead of
    /// gathering every error.
    pub fn with_short_circuit(&mut self, yes: bool) -> &mut Self {
        self.short_circuit = yes;
        self
    }
    pub(crate) fn evaluation_mode(&self) -> ShortCircuit {
        if self.short_circuit {
            ShortCircuit::FailFast
        } else {
            ShortCircuit::CollectAll
        }
    }
    /// Register a custom keyword.
    ///
    /// # Example
    ///
    /// ```rust
    /// use schemaflow::{CustomKeyword, SchemaError};
    /// use serde_json::{json, Map, Value};
    ///
    /// struct EvenNumber;
    ///
    /// impl CustomKeyword for EvenNumber {
    ///     fn is_valid(&self, instance: &Value) -> bool {
    ///         instance.as_u64().map_or(true, |value| value % 2 == 0)
    ///     }
    ///     fn error_message(&self, instance: &Value) -> String {
    ///         format!("{instance} is not even")
    ///     }
    /// }
    ///
    /// fn factory(
    ///     _: &Map<String, Value>,
    ///     value: &Value,
    ///     location: &str,
    /// ) -> Result<Box<dyn CustomKeyword>, SchemaError> {
    ///     if value == &Value::Bool(true) {
    ///         Ok(Box::new(EvenNumber))
    ///     } else {
    ///         Err(SchemaError::Parse {
    ///             location: location.to_string(),
    ///             message: "'even-number' must be set to true".to_string(),
    ///         })
    ///     }
    /// }
    ///
    /// let evaluator = schemaflow::options()
    ///     .with_keyword("even-number", factory)
    ///     .build(&json!({"even-number": true}))
    ///     .expect("A valid schema");
    /// assert!(evaluator.is_valid(&json!(2)));
    /// assert!(!evaluator.is_valid(&json!(3)));
    /// ```
    pub fn with_keyword<N, F>(&mut self, name: N, factory: F) -> &mut Self
    where
        N: Into<String>,
        F: KeywordFactory + 'static,
    {
        self.keywords.insert(name.into(), Arc::new(factory));
        self
    }
    pub(crate) fn keyword_factory(&self, name: &str) -> Option<&Arc<dyn KeywordFactory>> {
        self.keywords.get(name)
    }
}

impl core::fmt::Debug for EvaluationOptions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EvaluationOptions")
            .field("draft", &self.draft)
            .field("validate_formats", &self.validate_formats)
            .field("short_circuit", &self.short_circuit)
            .finish_non_exhaustive()
    }
}
