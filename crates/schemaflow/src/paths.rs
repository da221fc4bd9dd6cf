//! JSON Pointers addressing positions in schemas and instances.
use std::{fmt, fmt::Write, slice::Iter, str::FromStr};

/// A key within a JSON object or an index within a JSON array.
///
/// Keyword segments are kept as static strings so that building evaluation
/// paths does not allocate for the overwhelmingly common case.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PathChunk {
    /// Property name within a JSON object.
    Property(Box<str>),
    /// Index within a JSON array.
    Index(usize),
    /// JSON Schema keyword.
    Keyword(&'static str),
}

/// JSON Pointer as a wrapper around individual path components.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct JsonPointer(Vec<PathChunk>);

impl JsonPointer {
    /// Pointer components, in order.
    pub fn iter(&self) -> Iter<'_, PathChunk> {
        self.0.iter()
    }
    /// Number of components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    /// The last pointer component.
    #[must_use]
    pub fn last(&self) -> Option<&PathChunk> {
        self.0.last()
    }
    /// A copy of this pointer with one more component at the end.
    #[must_use]
    pub fn clone_with(&self, chunk: impl Into<PathChunk>) -> Self {
        let mut new = self.clone();
        new.0.push(chunk.into());
        new
    }
    /// Combine two pointers: the components of `other` appended to `self`.
    #[must_use]
    pub fn combine(&self, other: &JsonPointer) -> Self {
        let mut new = self.clone();
        new.0.extend_from_slice(&other.0);
        new
    }
    /// Pointer components as strings.
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        self.0
            .into_iter()
            .map(|chunk| match chunk {
                PathChunk::Property(value) => value.into_string(),
                PathChunk::Index(index) => index.to_string(),
                PathChunk::Keyword(keyword) => keyword.to_string(),
            })
            .collect()
    }
}

/// Error returned when a string is not a valid JSON Pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePointerError {
    input: String,
}

impl fmt::Display for ParsePointerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("Invalid JSON Pointer: {}", self.input))
    }
}

impl std::error::Error for ParsePointerError {}

impl FromStr for JsonPointer {
    type Err = ParsePointerError;

    /// Parse an RFC 6901 pointer: `~1` unescapes to `/` and `~0` to `~`.
    /// Digit-only segments become indexes.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if input.is_empty() {
            return Ok(JsonPointer::default());
        }
        let rest = input.strip_prefix('/').ok_or_else(|| ParsePointerError {
            input: input.to_string(),
        })?;
        let mut chunks = Vec::new();
        for segment in rest.split('/') {
            if !segment.is_empty() && segment.bytes().all(|byte| byte.is_ascii_digit()) {
                // Leading zeros make a property name, not an index
                if segment.len() == 1 || !segment.starts_with('0') {
                    chunks.push(PathChunk::Index(
                        segment.parse().map_err(|_| ParsePointerError {
                            input: input.to_string(),
                        })?,
                    ));
                    continue;
                }
            }
            let unescaped = segment.replace("~1", "/").replace("~0", "~");
            chunks.push(PathChunk::Property(unescaped.into_boxed_str()));
        }
        Ok(JsonPointer(chunks))
    }
}

impl serde::Serialize for JsonPointer {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for chunk in &self.0 {
            f.write_char('/')?;
            match chunk {
                PathChunk::Property(value) => write_escaped(f, value)?,
                PathChunk::Index(index) => f.write_str(itoa::Buffer::new().format(*index))?,
                PathChunk::Keyword(keyword) => write_escaped(f, keyword)?,
            }
        }
        Ok(())
    }
}

fn write_escaped(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    for ch in value.chars() {
        match ch {
            '/' => f.write_str("~1")?,
            '~' => f.write_str("~0")?,
            _ => f.write_char(ch)?,
        }
    }
    Ok(())
}

impl From<String> for PathChunk {
    #[inline]
    fn from(value: String) -> Self {
        PathChunk::Property(value.into_boxed_str())
    }
}

impl From<&str> for PathChunk {
    #[inline]
    fn from(value: &str) -> Self {
        PathChunk::Property(value.into())
    }
}

impl From<usize> for PathChunk {
    #[inline]
    fn from(value: usize) -> Self {
        PathChunk::Index(value)
    }
}

impl IntoIterator for JsonPointer {
    type Item = PathChunk;
    type IntoIter = <Vec<PathChunk> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a JsonPointer {
    type Item = &'a PathChunk;
    type IntoIter = Iter<'a, PathChunk>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<Vec<PathChunk>> for JsonPointer {
    fn from(chunks: Vec<PathChunk>) -> Self {
        JsonPointer(chunks)
    }
}

pub(crate) fn keyword(name: &'static str) -> PathChunk {
    PathChunk::Keyword(name)
}

#[cfg(test)]
mod tests {
    use super::JsonPointer;
    use serde_json::json;
    use test_case::test_case;

    #[test]
    fn escaping_in_display() {
        let pointer = JsonPointer::default().clone_with("/").clone_with("~");
        assert_eq!(pointer.to_string(), "/~1/~0");
        let data = json!({"/": {"~": 42}});
        assert_eq!(data.pointer(&pointer.to_string()), Some(&json!(42)));
    }

    #[test_case("", 0)]
    #[test_case("/a/b", 2)]
    #[test_case("/a/0/b", 3)]
    #[test_case("/~0~1", 1)]
    fn parse_roundtrip(input: &str, expected_len: usize) {
        let pointer: JsonPointer = input.parse().expect("Valid pointer");
        assert_eq!(pointer.len(), expected_len);
        assert_eq!(pointer.to_string(), input);
    }

    #[test]
    fn parse_rejects_missing_slash() {
        assert!("a/b".parse::<JsonPointer>().is_err());
    }

    #[test]
    fn combination() {
        let left: JsonPointer = "/a".parse().expect("Valid pointer");
        let right: JsonPointer = "/b/0".parse().expect("Valid pointer");
        assert_eq!(left.combine(&right).to_string(), "/a/b/0");
    }
}
