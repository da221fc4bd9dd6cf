use core::fmt;
use std::sync::Arc;

use fluent_uri::Uri;
use serde_json::Value;

use crate::{uri, Draft, Error, Registry, Resource, ResourceRef};

/// A reference resolver.
///
/// Resolves references against its base URI and looks the result up in the
/// registry. Resolvers are cheap to clone and immutable; entering an
/// `$id`-bearing subresource produces a new resolver with a new base.
#[derive(Clone)]
pub struct Resolver<'r> {
    registry: &'r Registry,
    base_uri: Arc<Uri<String>>,
}

impl PartialEq for Resolver<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.base_uri == other.base_uri
    }
}
impl Eq for Resolver<'_> {}

impl fmt::Debug for Resolver<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("base_uri", &self.base_uri.as_str())
            .finish()
    }
}

impl<'r> Resolver<'r> {
    pub(crate) fn new(registry: &'r Registry, base_uri: Arc<Uri<String>>) -> Self {
        Self { registry, base_uri }
    }
    #[must_use]
    pub fn base_uri(&self) -> Arc<Uri<String>> {
        Arc::clone(&self.base_uri)
    }
    /// Resolve a reference to the resource it points to.
    ///
    /// The fragment is interpreted as a JSON Pointer when it starts with `/`
    /// and as a plain-name anchor otherwise.
    ///
    /// # Errors
    ///
    /// If the reference cannot be resolved or is invalid.
    pub fn lookup(&self, reference: &str) -> Result<Resolved<'r>, Error> {
        let (uri, fragment) = if let Some(fragment) = reference.strip_prefix('#') {
            (Arc::clone(&self.base_uri), fragment)
        } else {
            let (uri, fragment) = if let Some((uri, fragment)) = reference.rsplit_once('#') {
                (uri, fragment)
            } else {
                (reference, "")
            };
            let uri = Arc::new(uri::resolve_against(&self.base_uri.borrow(), uri)?);
            (uri, fragment)
        };

        let retrieved = self.registry.resource(&uri)?;

        if fragment.starts_with('/') {
            let resolver = Resolver::new(self.registry, uri);
            return retrieved.pointer(fragment, resolver);
        }

        if !fragment.is_empty() {
            let anchor = self.registry.anchor(&uri, fragment)?;
            let resolver = Resolver::new(self.registry, uri);
            let resolver = resolver.in_subresource(Resource::as_ref(&anchor.resource))?;
            return Ok(Resolved::new(
                anchor.resource.contents(),
                resolver,
                anchor.resource.draft(),
            ));
        }

        Ok(Resolved::new(
            retrieved.contents(),
            Resolver::new(self.registry, uri),
            retrieved.draft(),
        ))
    }
    /// Create a resolver for a subresource.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource id cannot be resolved against the
    /// base URI of this resolver.
    pub fn in_subresource(&self, subresource: ResourceRef) -> Result<Self, Error> {
        if let Some(id) = subresource.id() {
            let base_uri = uri::resolve_against(&self.base_uri.borrow(), id)?;
            Ok(Resolver {
                registry: self.registry,
                base_uri: Arc::new(base_uri),
            })
        } else {
            Ok(self.clone())
        }
    }
}

/// A reference resolved to its contents by a [`Resolver`].
#[derive(Debug)]
pub struct Resolved<'r> {
    contents: &'r Value,
    resolver: Resolver<'r>,
    draft: Draft,
}

impl<'r> Resolved<'r> {
    pub(crate) fn new(contents: &'r Value, resolver: Resolver<'r>, draft: Draft) -> Self {
        Self {
            contents,
            resolver,
            draft,
        }
    }
    /// Resolved contents.
    #[must_use]
    pub fn contents(&self) -> &'r Value {
        self.contents
    }
    /// Resolver positioned at the resolved contents.
    #[must_use]
    pub fn resolver(&self) -> &Resolver<'r> {
        &self.resolver
    }
    #[must_use]
    pub fn draft(&self) -> Draft {
        self.draft
    }
    #[must_use]
    pub fn into_inner(self) -> (&'r Value, Resolver<'r>, Draft) {
        (self.contents, self.resolver, self.draft)
    }
}
