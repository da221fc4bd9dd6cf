use serde_json::Value;

use crate::{
    anchors,
    segments::Segment,
    vocabularies::{VocabularySet, DRAFT_2019_09_VOCABULARIES, DRAFT_2020_12_VOCABULARIES},
    Anchor, Error, Resolver, Resource, ResourceRef, Segments,
};

/// JSON Schema specification versions.
#[non_exhaustive]
#[derive(Debug, Default, PartialEq, Copy, Clone, Hash, Eq, PartialOrd, Ord)]
pub enum Draft {
    /// JSON Schema Draft 6
    Draft6,
    /// JSON Schema Draft 7
    Draft7,
    /// JSON Schema Draft 2019-09
    Draft201909,
    /// JSON Schema Draft 2020-12
    #[default]
    Draft202012,
    /// The "draft/next" work-in-progress dialect
    DraftNext,
}

type SubresourceIterator<'a> = Box<dyn Iterator<Item = &'a Value> + 'a>;

impl Draft {
    #[must_use]
    pub fn create_resource(self, contents: Value) -> Resource {
        Resource::new(contents, self)
    }
    #[must_use]
    pub fn create_resource_ref(self, contents: &Value) -> ResourceRef<'_> {
        ResourceRef::new(contents, self)
    }
    /// Detect what specification could be applied to the given contents.
    ///
    /// # Errors
    ///
    /// On unknown `$schema` value it returns [`Error::UnknownSpecification`].
    pub fn detect(self, contents: &Value) -> Result<Draft, Error> {
        if let Some(schema) = contents
            .as_object()
            .and_then(|contents| contents.get("$schema"))
            .and_then(|schema| schema.as_str())
        {
            Ok(match schema.trim_end_matches('#') {
                "https://json-schema.org/draft/next/schema" => Draft::DraftNext,
                "https://json-schema.org/draft/2020-12/schema" => Draft::Draft202012,
                "https://json-schema.org/draft/2019-09/schema" => Draft::Draft201909,
                "http://json-schema.org/draft-07/schema" => Draft::Draft7,
                "http://json-schema.org/draft-06/schema" => Draft::Draft6,
                value => return Err(Error::unknown_specification(value)),
            })
        } else {
            Ok(self)
        }
    }
    /// The resource identifier declared by the contents, if any.
    ///
    /// Drafts 6 & 7 use fragment-only `$id` values as anchors, not ids.
    pub(crate) fn id_of(self, contents: &Value) -> Option<&str> {
        let id = contents
            .as_object()
            .and_then(|schema| schema.get("$id"))
            .and_then(Value::as_str)?;
        match self {
            Draft::Draft6 | Draft::Draft7 if id.starts_with('#') => None,
            _ => Some(id),
        }
    }
    /// Subschemas which establish their own resource scope when they carry `$id`.
    #[must_use]
    pub fn subresources_of(self, contents: &Value) -> SubresourceIterator<'_> {
        let Some(schema) = contents.as_object() else {
            return Box::new(std::iter::empty());
        };
        Box::new(schema.iter().flat_map(move |(key, value)| {
            if key == "items" {
                // Pre-2020 `items` doubles as a positional subschema list
                return match value {
                    Value::Array(subschemas) if self <= Draft::Draft201909 => {
                        Box::new(subschemas.iter()) as SubresourceIterator<'_>
                    }
                    _ => Box::new(std::iter::once(value)),
                };
            }
            if self.is_subschema_in_value(key) {
                Box::new(std::iter::once(value)) as SubresourceIterator<'_>
            } else if self.is_subschema_in_array(key) {
                Box::new(value.as_array().into_iter().flatten())
            } else if self.is_subschema_in_object(key) {
                // `dependencies` mixes schemas with property-name arrays
                Box::new(
                    value
                        .as_object()
                        .into_iter()
                        .flat_map(|object| object.values())
                        .filter(|value| !value.is_array()),
                )
            } else {
                Box::new(std::iter::empty())
            }
        }))
    }
    fn is_subschema_in_value(self, keyword: &str) -> bool {
        match keyword {
            "additionalProperties" | "contains" | "not" | "propertyNames" => true,
            "additionalItems" => self <= Draft::Draft201909,
            // Pre-2020 `items` may also be an array; the caller flattens both forms
            "items" => true,
            "if" | "then" | "else" => self >= Draft::Draft7,
            "contentSchema" | "unevaluatedItems" | "unevaluatedProperties" => {
                self >= Draft::Draft201909
            }
            _ => false,
        }
    }
    fn is_subschema_in_array(self, keyword: &str) -> bool {
        match keyword {
            "allOf" | "anyOf" | "oneOf" => true,
            // The array form of `items` doubles as a subschema list pre-2020
            "items" => self <= Draft::Draft201909,
            "prefixItems" => self >= Draft::Draft202012,
            _ => false,
        }
    }
    fn is_subschema_in_object(self, keyword: &str) -> bool {
        match keyword {
            "definitions" | "patternProperties" | "properties" => true,
            "dependencies" => self <= Draft::Draft7,
            "$defs" | "dependentSchemas" => self >= Draft::Draft201909,
            _ => false,
        }
    }
    pub(crate) fn anchors<'a>(self, contents: &'a Value) -> Box<dyn Iterator<Item = Anchor> + 'a> {
        match self {
            Draft::Draft6 | Draft::Draft7 => anchors::legacy_anchor_in_dollar_id(self, contents),
            Draft::Draft201909 => anchors::anchor_2019(self, contents),
            Draft::Draft202012 | Draft::DraftNext => anchors::anchor(self, contents),
        }
    }
    /// Whether a pointer walk that produced `segments` landed inside a
    /// subresource, in which case resolution must re-base on its `$id`.
    pub(crate) fn maybe_in_subresource<'r>(
        self,
        segments: &Segments,
        resolver: &Resolver<'r>,
        subresource: ResourceRef<'r>,
    ) -> Result<Resolver<'r>, Error> {
        let mut iter = segments.iter();
        while let Some(segment) = iter.next() {
            if let Segment::Key(key) = segment {
                if (*key == "items" || (self <= Draft::Draft7 && *key == "dependencies"))
                    && subresource.contents().is_object()
                {
                    return resolver.in_subresource(subresource);
                }
                let key = key.as_ref();
                if !self.is_subschema_in_value(key)
                    && ((!self.is_subschema_in_array(key) && !self.is_subschema_in_object(key))
                        || iter.next().is_none())
                {
                    return Ok(resolver.clone());
                }
            }
        }
        resolver.in_subresource(subresource)
    }
    /// Identifies known JSON Schema keywords per draft.
    #[must_use]
    pub fn is_known_keyword(&self, keyword: &str) -> bool {
        match keyword {
            "$id"
            | "$ref"
            | "$schema"
            | "additionalProperties"
            | "allOf"
            | "anyOf"
            | "const"
            | "contains"
            | "default"
            | "definitions"
            | "dependencies"
            | "description"
            | "enum"
            | "examples"
            | "exclusiveMaximum"
            | "exclusiveMinimum"
            | "format"
            | "items"
            | "maxItems"
            | "maxLength"
            | "maxProperties"
            | "maximum"
            | "minItems"
            | "minLength"
            | "minProperties"
            | "minimum"
            | "multipleOf"
            | "not"
            | "oneOf"
            | "pattern"
            | "patternProperties"
            | "properties"
            | "propertyNames"
            | "required"
            | "title"
            | "type"
            | "uniqueItems" => true,

            "additionalItems" if *self <= Draft::Draft201909 => true,

            "contentEncoding" | "contentMediaType" if *self >= Draft::Draft7 => true,

            "$comment" | "else" | "if" | "readOnly" | "then" | "writeOnly"
                if *self >= Draft::Draft7 =>
            {
                true
            }

            "$anchor"
            | "$defs"
            | "$recursiveAnchor"
            | "$recursiveRef"
            | "$vocabulary"
            | "contentSchema"
            | "dependentRequired"
            | "dependentSchemas"
            | "deprecated"
            | "maxContains"
            | "minContains"
            | "unevaluatedItems"
            | "unevaluatedProperties"
                if *self >= Draft::Draft201909 =>
            {
                true
            }

            "$dynamicAnchor" | "$dynamicRef" | "prefixItems" if *self >= Draft::Draft202012 => {
                true
            }

            _ => false,
        }
    }

    #[must_use]
    pub fn default_vocabularies(self) -> VocabularySet {
        match self {
            Draft::Draft6 | Draft::Draft7 => VocabularySet::new(),
            Draft::Draft201909 => VocabularySet::from_known(DRAFT_2019_09_VOCABULARIES),
            Draft::Draft202012 | Draft::DraftNext => {
                VocabularySet::from_known(DRAFT_2020_12_VOCABULARIES)
            }
        }
    }
}
