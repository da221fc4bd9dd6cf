use std::borrow::Cow;

use serde_json::Value;

use crate::{Anchor, Draft, Error, Resolved, Resolver, Segments};

/// A document with a concrete interpretation under a JSON Schema specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    contents: Value,
    draft: Draft,
}

impl Resource {
    pub(crate) fn new(contents: Value, draft: Draft) -> Self {
        Self { contents, draft }
    }
    /// Resource contents.
    #[must_use]
    pub fn contents(&self) -> &Value {
        &self.contents
    }
    /// JSON Schema draft under which this contents is interpreted.
    #[must_use]
    pub fn draft(&self) -> Draft {
        self.draft
    }
    /// Create a resource, autodetecting the specification which applies.
    ///
    /// # Errors
    ///
    /// On unknown `$schema` value it returns [`Error::UnknownSpecification`].
    pub fn from_contents(contents: Value) -> Result<Resource, Error> {
        Self::from_contents_and_specification(contents, Draft::default())
    }

    pub(crate) fn from_contents_and_specification(
        contents: Value,
        draft: Draft,
    ) -> Result<Resource, Error> {
        Ok(draft.detect(&contents)?.create_resource(contents))
    }
    /// Resource identifier.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.draft.id_of(&self.contents)
    }

    pub(crate) fn subresources(&self) -> impl Iterator<Item = Result<Resource, Error>> + '_ {
        self.draft
            .subresources_of(&self.contents)
            .map(|contents| Resource::from_contents_and_specification(contents.clone(), self.draft))
    }

    pub(crate) fn anchors(&self) -> impl Iterator<Item = Anchor> + '_ {
        self.draft.anchors(&self.contents)
    }

    /// Resolve a JSON Pointer within this resource, re-basing the resolver
    /// whenever the walk crosses into an `$id`-bearing subresource.
    pub(crate) fn pointer<'r>(
        &'r self,
        pointer: &str,
        mut resolver: Resolver<'r>,
    ) -> Result<Resolved<'r>, Error> {
        // INVARIANT: the pointer always starts with `/`
        let mut contents = &self.contents;
        let mut segments = Segments::new();
        let original_pointer = pointer;
        let pointer = percent_encoding::percent_decode_str(&pointer[1..])
            .decode_utf8()
            .map_err(|err| Error::invalid_percent_encoding(original_pointer, err))?;
        for segment in pointer.split('/') {
            if let Some(array) = contents.as_array() {
                let index = segment
                    .parse::<usize>()
                    .map_err(|err| Error::invalid_array_index(original_pointer, segment, err))?;
                contents = array
                    .get(index)
                    .ok_or_else(|| Error::pointer_to_nowhere(original_pointer))?;
                segments.push(index);
            } else {
                let segment = unescape_segment(segment);
                contents = contents
                    .get(segment.as_ref())
                    .ok_or_else(|| Error::pointer_to_nowhere(original_pointer))?;
                segments.push(segment);
            }
            let previous = resolver.clone();
            resolver = self.draft.maybe_in_subresource(
                &segments,
                &resolver,
                self.draft.create_resource_ref(contents),
            )?;
            if resolver != previous {
                segments = Segments::new();
            }
        }
        Ok(Resolved::new(contents, resolver, self.draft))
    }
    /// A reference to the underlying contents together with the draft.
    #[must_use]
    pub fn as_ref(&self) -> ResourceRef<'_> {
        ResourceRef::new(&self.contents, self.draft)
    }
}

/// A borrowed document with a concrete specification interpretation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ResourceRef<'a> {
    contents: &'a Value,
    draft: Draft,
}

impl<'a> ResourceRef<'a> {
    #[must_use]
    pub fn new(contents: &'a Value, draft: Draft) -> Self {
        Self { contents, draft }
    }
    #[must_use]
    pub fn contents(&self) -> &'a Value {
        self.contents
    }
    #[must_use]
    pub fn draft(&self) -> Draft {
        self.draft
    }
    #[must_use]
    pub fn id(&self) -> Option<&'a str> {
        self.draft.id_of(self.contents)
    }
}

/// Apply the RFC 6901 unescaping rules: `~1` is `/` and `~0` is `~`.
fn unescape_segment(segment: &str) -> Cow<'_, str> {
    if segment.contains('~') {
        Cow::Owned(segment.replace("~1", "/").replace("~0", "~"))
    } else {
        Cow::Borrowed(segment)
    }
}

#[cfg(test)]
mod tests {
    use super::Resource;
    use crate::{Draft, Registry};
    use serde_json::json;
    use test_case::test_case;

    #[test]
    fn detected_draft_wins() {
        let resource = Resource::from_contents(
            json!({"$schema": "http://json-schema.org/draft-07/schema#"}),
        )
        .expect("Known specification");
        assert_eq!(resource.draft(), Draft::Draft7);
    }

    #[test_case("/properties/name", json!({"type": "string"}))]
    #[test_case("/properties/na~1me", json!({"type": "integer"}))]
    #[test_case("/properties/na~0me", json!({"type": "boolean"}))]
    #[test_case("/allOf/0", json!({"required": ["name"]}))]
    fn pointer_resolution(pointer: &str, expected: serde_json::Value) {
        let schema = Draft::Draft202012.create_resource(json!({
            "properties": {
                "name": {"type": "string"},
                "na/me": {"type": "integer"},
                "na~me": {"type": "boolean"},
            },
            "allOf": [{"required": ["name"]}]
        }));
        let registry =
            Registry::try_new("https://example.com/schema", schema).expect("Valid resources");
        let resolver = registry
            .try_resolver("https://example.com/schema")
            .expect("Valid base URI");
        let resolved = resolver
            .lookup(&format!("#{pointer}"))
            .expect("Resolvable pointer");
        assert_eq!(resolved.contents(), &expected);
    }

    #[test]
    fn pointer_to_nowhere() {
        let schema = Draft::Draft202012.create_resource(json!({"properties": {}}));
        let registry =
            Registry::try_new("https://example.com/schema", schema).expect("Valid resources");
        let resolver = registry
            .try_resolver("https://example.com/schema")
            .expect("Valid base URI");
        let error = resolver.lookup("#/missing").expect_err("Should fail");
        assert_eq!(error.to_string(), "Pointer '/missing' does not exist");
    }
}
