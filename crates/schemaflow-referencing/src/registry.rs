use std::{collections::VecDeque, sync::Arc};

use ahash::{AHashMap, AHashSet};
use fluent_uri::Uri;
use serde_json::Value;

use crate::{
    uri, vocabularies, Anchor, DefaultRetriever, Draft, Error, Resolver, Resource, Retrieve,
    VocabularySet,
};

type ResourceMap = AHashMap<Uri<String>, Arc<Resource>>;
type AnchorMap = AHashMap<Uri<String>, AHashMap<String, Anchor>>;

/// A registry of JSON Schema resources, each identified by their canonical URIs.
///
/// Registries eagerly process all added resources: subresources carrying `$id`
/// and anchors become immediately addressable, and references to resources
/// that are not present are drained through the configured [`Retrieve`] hook.
/// Once constructed, a registry is immutable and safe to share across threads.
#[derive(Debug, Default)]
pub struct Registry {
    resources: ResourceMap,
    anchors: AnchorMap,
}

/// Configuration options for creating a [`Registry`].
pub struct RegistryOptions {
    retriever: Box<dyn Retrieve>,
    draft: Draft,
}

impl RegistryOptions {
    #[must_use]
    pub fn new() -> Self {
        Self {
            retriever: Box::new(DefaultRetriever),
            draft: Draft::default(),
        }
    }
    /// Set a custom retriever for the [`Registry`].
    #[must_use]
    pub fn retriever(mut self, retriever: Box<dyn Retrieve>) -> Self {
        self.retriever = retriever;
        self
    }
    /// Set the specification version under which resources without their own
    /// `$schema` should be interpreted.
    #[must_use]
    pub fn draft(mut self, draft: Draft) -> Self {
        self.draft = draft;
        self
    }
    /// Create a [`Registry`] with a single resource using these options.
    ///
    /// # Errors
    ///
    /// Returns an error if the URI is invalid or a resource cannot be processed.
    pub fn try_new(self, uri: impl Into<String>, resource: Resource) -> Result<Registry, Error> {
        Registry::try_new_impl(uri, resource, &*self.retriever, self.draft)
    }
    /// Create a [`Registry`] from multiple resources using these options.
    ///
    /// # Errors
    ///
    /// Returns an error if any URI is invalid or a resource cannot be processed.
    pub fn try_from_resources(
        self,
        pairs: impl Iterator<Item = (impl Into<String>, Resource)>,
    ) -> Result<Registry, Error> {
        Registry::try_from_resources_impl(pairs, &*self.retriever, self.draft)
    }
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Get [`RegistryOptions`] for configuring a new [`Registry`].
    #[must_use]
    pub fn options() -> RegistryOptions {
        RegistryOptions::new()
    }
    /// Create a new [`Registry`] with a single resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the URI is invalid or a resource cannot be processed.
    pub fn try_new(uri: impl Into<String>, resource: Resource) -> Result<Self, Error> {
        Self::try_new_impl(uri, resource, &DefaultRetriever, Draft::default())
    }
    /// Create a new [`Registry`] from an iterator of `(URI, Resource)` pairs.
    ///
    /// # Errors
    ///
    /// Returns an error if any URI is invalid or a resource cannot be processed.
    pub fn try_from_resources(
        pairs: impl Iterator<Item = (impl Into<String>, Resource)>,
    ) -> Result<Self, Error> {
        Self::try_from_resources_impl(pairs, &DefaultRetriever, Draft::default())
    }
    fn try_new_impl(
        uri: impl Into<String>,
        resource: Resource,
        retriever: &dyn Retrieve,
        draft: Draft,
    ) -> Result<Self, Error> {
        Self::try_from_resources_impl([(uri, resource)].into_iter(), retriever, draft)
    }
    fn try_from_resources_impl(
        pairs: impl Iterator<Item = (impl Into<String>, Resource)>,
        retriever: &dyn Retrieve,
        draft: Draft,
    ) -> Result<Self, Error> {
        let mut resources = ResourceMap::new();
        let mut anchors = AnchorMap::new();
        process_resources(pairs, retriever, &mut resources, &mut anchors, draft)?;
        Ok(Registry { resources, anchors })
    }
    /// Create a new registry extended with more resources.
    ///
    /// # Errors
    ///
    /// Returns an error if any URI is invalid or a resource cannot be processed.
    pub fn try_with_resources(
        self,
        pairs: impl Iterator<Item = (impl Into<String>, Resource)>,
        draft: Draft,
    ) -> Result<Registry, Error> {
        self.try_with_resources_and_retriever(pairs, &DefaultRetriever, draft)
    }
    /// Create a new registry extended with more resources, using the given
    /// retriever for references to resources that are not supplied.
    ///
    /// # Errors
    ///
    /// Returns an error if any URI is invalid or a resource cannot be processed.
    pub fn try_with_resources_and_retriever(
        self,
        pairs: impl Iterator<Item = (impl Into<String>, Resource)>,
        retriever: &dyn Retrieve,
        draft: Draft,
    ) -> Result<Registry, Error> {
        let mut resources = self.resources;
        let mut anchors = self.anchors;
        process_resources(pairs, retriever, &mut resources, &mut anchors, draft)?;
        Ok(Registry { resources, anchors })
    }
    /// Create a new [`Resolver`] for this registry with the given base URI.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URI is invalid.
    pub fn try_resolver(&self, base_uri: &str) -> Result<Resolver, Error> {
        Ok(self.resolver(uri::from_str(base_uri)?))
    }
    /// Create a new [`Resolver`] for this registry with a known valid base URI.
    #[must_use]
    pub fn resolver(&self, base_uri: Uri<String>) -> Resolver {
        Resolver::new(self, Arc::new(base_uri))
    }
    pub(crate) fn resource<'r>(&'r self, uri: &Uri<String>) -> Result<&'r Resource, Error> {
        if let Some(resource) = self.resources.get(uri) {
            Ok(resource)
        } else {
            Err(Error::unretrievable(
                uri.as_str(),
                Some(
                    "Retrieving external resources is not supported once the registry is populated"
                        .into(),
                ),
            ))
        }
    }
    pub(crate) fn anchor<'r>(&'r self, uri: &Uri<String>, name: &str) -> Result<&'r Anchor, Error> {
        if let Some(anchor) = self.anchors.get(uri).and_then(|names| names.get(name)) {
            return Ok(anchor);
        }
        // The resource may be registered under a non-canonical URI while its
        // anchors were indexed under the declared `$id`
        if let Some(id) = self.resources.get(uri).and_then(|resource| resource.id()) {
            let canonical = uri::from_str(id)?;
            if let Some(anchor) = self
                .anchors
                .get(&canonical)
                .and_then(|names| names.get(name))
            {
                return Ok(anchor);
            }
        }
        if name.contains('/') {
            Err(Error::invalid_anchor(name))
        } else {
            Err(Error::no_such_anchor(name))
        }
    }
    /// Find the vocabularies enabled for a schema document.
    ///
    /// Known `$schema` values map to their draft's default set; an unknown
    /// meta-schema that is itself registered contributes its `$vocabulary`.
    #[must_use]
    pub fn find_vocabularies(&self, draft: Draft, contents: &Value) -> VocabularySet {
        match draft.detect(contents) {
            Ok(draft) => draft.default_vocabularies(),
            Err(Error::UnknownSpecification { specification }) => {
                if let Ok(Some(resource)) =
                    uri::from_str(&specification).map(|uri| self.resources.get(&uri))
                {
                    if let Ok(Some(vocabularies)) = vocabularies::find(resource.contents()) {
                        return vocabularies;
                    }
                }
                draft.default_vocabularies()
            }
            Err(_) => draft.default_vocabularies(),
        }
    }
    /// Every resource URI that declares a dynamic anchor with this name,
    /// paired with the anchored subschema.
    ///
    /// The evaluator's `$dynamicRef` dispatcher matches these against the
    /// dynamic scope at evaluation time.
    #[must_use]
    pub fn dynamic_anchor_candidates(&self, name: &str) -> Vec<(Uri<String>, Arc<Resource>)> {
        let mut candidates = Vec::new();
        for (uri, names) in &self.anchors {
            if let Some(anchor) = names.get(name) {
                if anchor.dynamic {
                    candidates.push((uri.clone(), Arc::clone(&anchor.resource)));
                }
            }
        }
        candidates
    }
}

fn process_resources(
    pairs: impl Iterator<Item = (impl Into<String>, Resource)>,
    retriever: &dyn Retrieve,
    resources: &mut ResourceMap,
    anchors: &mut AnchorMap,
    default_draft: Draft,
) -> Result<(), Error> {
    let mut queue = VecDeque::with_capacity(32);
    let mut seen = AHashSet::new();
    let mut external = AHashSet::new();

    for (uri, resource) in pairs {
        let uri = uri::from_str(uri.into().trim_end_matches('#'))?;
        let resource = Arc::new(resource);
        resources.insert(uri.clone(), Arc::clone(&resource));
        queue.push_back((uri, resource));
    }

    loop {
        if queue.is_empty() && external.is_empty() {
            break;
        }

        // Process the current queue and collect references to external resources
        while let Some((mut base, resource)) = queue.pop_front() {
            if let Some(id) = resource.id() {
                base = uri::resolve_against(&base.borrow(), id)?;
            }

            for anchor in resource.anchors() {
                anchors
                    .entry(base.clone())
                    .or_default()
                    .insert(anchor.name.clone(), anchor);
            }

            collect_external_references(&base, resource.contents(), &mut external, &mut seen)?;

            for subresource in resource.subresources() {
                queue.push_back((base.clone(), Arc::new(subresource?)));
            }
            if resource.id().is_some() {
                resources.insert(base, resource);
            }
        }

        // Retrieve external resources through the fetch hook
        for uri in external.drain() {
            let mut fragmentless = uri.clone();
            fragmentless.set_fragment(None);
            if !resources.contains_key(&fragmentless) {
                let retrieved = retriever
                    .retrieve(&fragmentless.borrow())
                    .map_err(|err| Error::unretrievable(fragmentless.as_str(), Some(err)))?;
                let resource = Arc::new(Resource::from_contents_and_specification(
                    retrieved,
                    default_draft,
                )?);
                resources.insert(fragmentless.clone(), Arc::clone(&resource));
                queue.push_back((fragmentless, resource));
            }
        }
    }

    Ok(())
}

fn collect_external_references(
    base: &Uri<String>,
    contents: &Value,
    collected: &mut AHashSet<Uri<String>>,
    seen: &mut AHashSet<(String, String)>,
) -> Result<(), Error> {
    if base.scheme().as_str() == "urn" {
        return Ok(());
    }
    if let Some(reference) = contents.get("$ref").and_then(Value::as_str) {
        if reference.starts_with('#') {
            // Not an external resource
            return Ok(());
        }
        if !seen.insert((base.as_str().to_string(), reference.to_string())) {
            return Ok(());
        }
        let resolved = uri::resolve_against(&base.borrow(), reference)?;
        if resolved.scheme().as_str() != uri::DEFAULT_SCHEME {
            collected.insert(resolved);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use ahash::AHashMap;
    use fluent_uri::Uri;
    use serde_json::{json, Value};
    use test_case::test_case;

    use crate::{Draft, Registry, Resource, Retrieve};

    struct TestRetriever {
        schemas: AHashMap<String, Value>,
    }

    impl Retrieve for TestRetriever {
        fn retrieve(
            &self,
            uri: &Uri<&str>,
        ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
            if let Some(value) = self.schemas.get(uri.as_str()) {
                Ok(value.clone())
            } else {
                Err(format!("Failed to find {uri}").into())
            }
        }
    }

    fn retriever(schemas: &[(&str, Value)]) -> TestRetriever {
        TestRetriever {
            schemas: schemas
                .iter()
                .map(|&(uri, ref contents)| (uri.to_string(), contents.clone()))
                .collect(),
        }
    }

    #[test]
    fn invalid_uri_on_creation() {
        let schema = Draft::Draft202012.create_resource(json!({}));
        let error = Registry::try_new(":/example.com", schema).expect_err("Should fail");
        assert!(error.to_string().starts_with("Invalid URI"));
        assert!(error.source().is_some());
    }

    #[test]
    fn lookup_unresolvable_uri() {
        let schema = Draft::Draft202012.create_resource(json!({"type": "object"}));
        let registry =
            Registry::try_new("http://example.com/schema1", schema).expect("Valid resources");
        let resolver = registry
            .try_resolver("http://example.com/absent")
            .expect("Valid base URI");
        let error = resolver.lookup("").expect_err("Should fail");
        assert_eq!(
            error.to_string(),
            "Resource 'http://example.com/absent' is not present in a registry and retrieving it failed: Retrieving external resources is not supported once the registry is populated"
        );
    }

    struct ReferenceCase {
        input: Vec<(&'static str, Value)>,
        remote: Vec<(&'static str, Value)>,
        expected: Vec<&'static str>,
    }

    #[test_case(
        ReferenceCase {
            input: vec![("http://example.com/schema1", json!({"$ref": "http://example.com/schema2"}))],
            remote: vec![("http://example.com/schema2", json!({"type": "object"}))],
            expected: vec!["http://example.com/schema1", "http://example.com/schema2"],
        }
    ; "external ref at top")]
    #[test_case(
        ReferenceCase {
            input: vec![("http://example.com/schema1", json!({
                "$defs": {"subschema": {"type": "string"}},
                "$ref": "#/$defs/subschema"
            }))],
            remote: vec![],
            expected: vec!["http://example.com/schema1"],
        }
    ; "internal ref at top")]
    #[test_case(
        ReferenceCase {
            input: vec![("http://example.com/schema1", json!({
                "type": "object",
                "properties": {"prop1": {"$ref": "http://example.com/schema2"}}
            }))],
            remote: vec![("http://example.com/schema2", json!({"type": "string"}))],
            expected: vec!["http://example.com/schema1", "http://example.com/schema2"],
        }
    ; "external ref in subresource")]
    #[test_case(
        ReferenceCase {
            input: vec![("http://example.com/schema1", json!({"$ref": "http://example.com/schema2"}))],
            remote: vec![
                ("http://example.com/schema2", json!({"$ref": "http://example.com/schema3"})),
                ("http://example.com/schema3", json!({"$ref": "http://example.com/schema1"})),
            ],
            expected: vec![
                "http://example.com/schema1",
                "http://example.com/schema2",
                "http://example.com/schema3",
            ],
        }
    ; "circular external references")]
    fn references_processing(case: ReferenceCase) {
        let retriever = retriever(&case.remote);
        let registry = Registry::options()
            .retriever(Box::new(retriever))
            .try_from_resources(
                case.input
                    .iter()
                    .map(|(uri, contents)| {
                        (*uri, Resource::from_contents(contents.clone()).expect("Valid resource"))
                    }),
            )
            .expect("Valid resources");
        for uri in case.expected {
            let resolver = registry.try_resolver("").expect("Valid base URI");
            assert!(resolver.lookup(uri).is_ok());
        }
    }

    #[test]
    fn default_retriever_refuses_remote_refs() {
        let error = Registry::try_from_resources(
            [(
                "http://example.com/schema1",
                Resource::from_contents(json!({"$ref": "http://example.com/schema2"}))
                    .expect("Valid resource"),
            )]
            .into_iter(),
        )
        .expect_err("Should fail");
        assert_eq!(
            error.to_string(),
            "Resource 'http://example.com/schema2' is not present in a registry and retrieving it failed: Default retriever does not fetch resources"
        );
    }

    #[test]
    fn id_bearing_subresources_are_addressable() {
        let schema = Draft::Draft202012.create_resource(json!({
            "$id": "http://example.com/root",
            "$defs": {
                "named": {"$id": "item", "type": "integer"}
            }
        }));
        let registry = Registry::try_new("http://example.com/root", schema).expect("Valid");
        let resolver = registry.try_resolver("").expect("Valid base URI");
        let resolved = resolver
            .lookup("http://example.com/item")
            .expect("Lookup failed");
        assert_eq!(resolved.contents(), &json!({"$id": "item", "type": "integer"}));
    }

    #[test]
    fn anchors_are_indexed() {
        let schema = Draft::Draft202012.create_resource(json!({
            "$defs": {"foo": {"$anchor": "known", "type": "null"}}
        }));
        let registry = Registry::try_new("http://example.com", schema).expect("Valid");
        let resolver = registry.try_resolver("http://example.com").expect("Valid");
        let resolved = resolver.lookup("#known").expect("Lookup failed");
        assert_eq!(resolved.contents(), &json!({"$anchor": "known", "type": "null"}));

        let error = resolver.lookup("#unknown").expect_err("Should fail");
        assert_eq!(error.to_string(), "Anchor 'unknown' does not exist");
        let error = resolver.lookup("#bad/anchor").expect_err("Should fail");
        assert_eq!(error.to_string(), "Anchor 'bad/anchor' is invalid");
    }

    #[test]
    fn dynamic_anchor_candidates() {
        let schema = Draft::Draft202012.create_resource(json!({
            "$id": "http://example.com/list",
            "$dynamicAnchor": "T",
            "$defs": {
                "specialized": {
                    "$id": "specialized",
                    "$dynamicAnchor": "T",
                    "type": "string"
                }
            }
        }));
        let registry = Registry::try_new("http://example.com/list", schema).expect("Valid");
        let mut uris: Vec<String> = registry
            .dynamic_anchor_candidates("T")
            .into_iter()
            .map(|(uri, _)| uri.as_str().to_string())
            .collect();
        uris.sort();
        assert_eq!(
            uris,
            ["http://example.com/list", "http://example.com/specialized"]
        );
    }
}
