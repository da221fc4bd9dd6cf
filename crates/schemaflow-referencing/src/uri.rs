//! Thin wrappers around `fluent-uri` used throughout the workspace.
use fluent_uri::{Uri, UriRef};
use once_cell::sync::Lazy;

use crate::Error;

/// Base URI assigned to documents that do not declare an `$id` of their own.
pub static DEFAULT_ROOT_URI: Lazy<Uri<String>> =
    Lazy::new(|| Uri::parse("json-schema:///".to_string()).expect("Is a valid URI"));

/// Scheme of [`DEFAULT_ROOT_URI`].
pub const DEFAULT_SCHEME: &str = "json-schema";

/// Resolve a URI reference against the given base and normalize the target.
///
/// # Errors
///
/// Returns an error if the reference is not a valid URI reference or cannot
/// be resolved against the base.
pub fn resolve_against(base: &Uri<&str>, reference: &str) -> Result<Uri<String>, Error> {
    Ok(UriRef::parse(reference)?.resolve_against(base)?.normalize())
}

/// Parse a string into an absolute, normalized URI.
///
/// Relative references are interpreted against [`DEFAULT_ROOT_URI`] so that
/// every registered resource ends up with an absolute identifier.
///
/// # Errors
///
/// Returns an error if the input does not conform to RFC 3986.
pub fn from_str(input: &str) -> Result<Uri<String>, Error> {
    let reference = UriRef::parse(input)?;
    if reference.scheme().is_some() {
        Ok(Uri::parse(input.to_string())?.normalize())
    } else {
        Ok(reference
            .resolve_against(&DEFAULT_ROOT_URI.borrow())?
            .normalize())
    }
}

#[cfg(test)]
mod tests {
    use super::{from_str, resolve_against};

    #[test]
    fn absolute_uri_roundtrip() {
        let uri = from_str("https://example.com/schema.json").expect("Valid URI");
        assert_eq!(uri.as_str(), "https://example.com/schema.json");
    }

    #[test]
    fn relative_uri_gets_default_root() {
        let uri = from_str("folder/schema.json").expect("Valid URI");
        assert_eq!(uri.as_str(), "json-schema:///folder/schema.json");
    }

    #[test]
    fn resolution_against_base() {
        let base = from_str("https://example.com/dir/root.json").expect("Valid URI");
        let resolved = resolve_against(&base.borrow(), "other.json").expect("Resolvable");
        assert_eq!(resolved.as_str(), "https://example.com/dir/other.json");
    }

    #[test]
    fn resolution_normalizes_dot_segments() {
        let base = from_str("https://example.com/a/b/c.json").expect("Valid URI");
        let resolved = resolve_against(&base.borrow(), "../x.json").expect("Resolvable");
        assert_eq!(resolved.as_str(), "https://example.com/a/x.json");
    }

    #[test]
    fn invalid_uri_is_rejected() {
        assert!(from_str(":/example.com").is_err());
    }
}
