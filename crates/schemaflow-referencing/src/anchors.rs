use std::sync::Arc;

use serde_json::Value;

use crate::{Draft, Resource};

/// An anchor within a resource.
///
/// `$recursiveAnchor: true` is stored as a dynamic anchor with an empty name,
/// which is how `$recursiveRef: "#"` targets are discovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Anchor {
    pub(crate) name: String,
    pub(crate) dynamic: bool,
    pub(crate) resource: Arc<Resource>,
}

impl Anchor {
    fn new(draft: Draft, name: &str, dynamic: bool, contents: &Value) -> Anchor {
        Anchor {
            name: name.to_string(),
            dynamic,
            resource: Arc::new(draft.create_resource(contents.clone())),
        }
    }
}

pub(crate) fn anchor(draft: Draft, contents: &Value) -> Box<dyn Iterator<Item = Anchor> + '_> {
    Box::new(contents.as_object().into_iter().flat_map(move |schema| {
        let default = schema
            .get("$anchor")
            .and_then(Value::as_str)
            .map(|name| Anchor::new(draft, name, false, contents));
        let dynamic = schema
            .get("$dynamicAnchor")
            .and_then(Value::as_str)
            .map(|name| Anchor::new(draft, name, true, contents));
        default.into_iter().chain(dynamic)
    }))
}

pub(crate) fn anchor_2019(draft: Draft, contents: &Value) -> Box<dyn Iterator<Item = Anchor> + '_> {
    Box::new(contents.as_object().into_iter().flat_map(move |schema| {
        let default = schema
            .get("$anchor")
            .and_then(Value::as_str)
            .map(|name| Anchor::new(draft, name, false, contents));
        let recursive = schema
            .get("$recursiveAnchor")
            .and_then(Value::as_bool)
            .filter(|enabled| *enabled)
            .map(|_| Anchor::new(draft, "", true, contents));
        default.into_iter().chain(recursive)
    }))
}

pub(crate) fn legacy_anchor_in_dollar_id(
    draft: Draft,
    contents: &Value,
) -> Box<dyn Iterator<Item = Anchor> + '_> {
    Box::new(
        contents
            .as_object()
            .and_then(|schema| schema.get("$id").and_then(Value::as_str))
            .and_then(|id| id.strip_prefix('#'))
            .map(move |name| Anchor::new(draft, name, false, contents))
            .into_iter(),
    )
}
