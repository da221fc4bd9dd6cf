//! # referencing
//!
//! JSON reference resolution for schema resources: a registry of documents
//! keyed by their canonical URIs, anchor indexing, and per-draft subresource
//! discovery. The evaluator crate builds on top of it but the library itself
//! is implementation-agnostic.
mod anchors;
mod drafts;
mod error;
mod registry;
mod resolver;
mod resource;
mod retriever;
mod segments;
pub mod uri;
mod vocabularies;

pub(crate) use anchors::Anchor;
pub use drafts::Draft;
pub use error::{Error, UriError};
pub use fluent_uri::{Uri, UriRef};
pub use registry::{Registry, RegistryOptions};
pub use resolver::{Resolved, Resolver};
pub use resource::{Resource, ResourceRef};
pub use retriever::{DefaultRetriever, Retrieve};
pub(crate) use segments::{Segment, Segments};
pub use vocabularies::{Vocabulary, VocabularySet};
