use core::fmt;
use std::str::FromStr;

use ahash::AHashSet;
use fluent_uri::Uri;
use serde_json::Value;

use crate::{uri, Error};

/// A named collection of keywords that a dialect may opt into.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Vocabulary {
    Core,
    Applicator,
    Unevaluated,
    Validation,
    Metadata,
    Format,
    FormatAnnotation,
    Content,
    Custom(Uri<String>),
}

impl FromStr for Vocabulary {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "https://json-schema.org/draft/next/vocab/core"
            | "https://json-schema.org/draft/2020-12/vocab/core"
            | "https://json-schema.org/draft/2019-09/vocab/core" => Ok(Vocabulary::Core),
            "https://json-schema.org/draft/next/vocab/applicator"
            | "https://json-schema.org/draft/2020-12/vocab/applicator"
            | "https://json-schema.org/draft/2019-09/vocab/applicator" => {
                Ok(Vocabulary::Applicator)
            }
            "https://json-schema.org/draft/next/vocab/unevaluated"
            | "https://json-schema.org/draft/2020-12/vocab/unevaluated" => {
                Ok(Vocabulary::Unevaluated)
            }
            "https://json-schema.org/draft/next/vocab/validation"
            | "https://json-schema.org/draft/2020-12/vocab/validation"
            | "https://json-schema.org/draft/2019-09/vocab/validation" => {
                Ok(Vocabulary::Validation)
            }
            "https://json-schema.org/draft/next/vocab/meta-data"
            | "https://json-schema.org/draft/2020-12/vocab/meta-data"
            | "https://json-schema.org/draft/2019-09/vocab/meta-data" => Ok(Vocabulary::Metadata),
            "https://json-schema.org/draft/next/vocab/format-assertion"
            | "https://json-schema.org/draft/2020-12/vocab/format-assertion"
            | "https://json-schema.org/draft/2019-09/vocab/format" => Ok(Vocabulary::Format),
            "https://json-schema.org/draft/next/vocab/format-annotation"
            | "https://json-schema.org/draft/2020-12/vocab/format-annotation" => {
                Ok(Vocabulary::FormatAnnotation)
            }
            "https://json-schema.org/draft/next/vocab/content"
            | "https://json-schema.org/draft/2020-12/vocab/content"
            | "https://json-schema.org/draft/2019-09/vocab/content" => Ok(Vocabulary::Content),
            _ => Ok(Vocabulary::Custom(uri::from_str(s)?)),
        }
    }
}

/// An immutable set of vocabularies enabled for a dialect.
///
/// Known vocabularies live in a bitmask; custom ones in a side set.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct VocabularySet {
    known: u8,
    custom: AHashSet<Uri<String>>,
}

const NAMES: [&str; 8] = [
    "core",
    "applicator",
    "unevaluated",
    "validation",
    "meta-data",
    "format",
    "format-annotation",
    "content",
];

impl fmt::Debug for VocabularySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug_list = f.debug_list();
        for (bit, name) in NAMES.iter().enumerate() {
            if self.known & (1 << bit) != 0 {
                debug_list.entry(name);
            }
        }
        if !self.custom.is_empty() {
            let mut custom: Vec<_> = self.custom.iter().map(Uri::as_str).collect();
            custom.sort_unstable();
            for uri in custom {
                debug_list.entry(&uri);
            }
        }
        debug_list.finish()
    }
}

fn bit_of(vocabulary: &Vocabulary) -> Option<u8> {
    match vocabulary {
        Vocabulary::Core => Some(0),
        Vocabulary::Applicator => Some(1),
        Vocabulary::Unevaluated => Some(2),
        Vocabulary::Validation => Some(3),
        Vocabulary::Metadata => Some(4),
        Vocabulary::Format => Some(5),
        Vocabulary::FormatAnnotation => Some(6),
        Vocabulary::Content => Some(7),
        Vocabulary::Custom(_) => None,
    }
}

impl VocabularySet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_known(known: u8) -> Self {
        Self {
            known,
            custom: AHashSet::new(),
        }
    }

    pub(crate) fn add(&mut self, vocabulary: Vocabulary) {
        if let Some(bit) = bit_of(&vocabulary) {
            self.known |= 1 << bit;
        } else if let Vocabulary::Custom(uri) = vocabulary {
            self.custom.insert(uri);
        }
    }

    #[must_use]
    pub fn contains(&self, vocabulary: &Vocabulary) -> bool {
        if let Some(bit) = bit_of(vocabulary) {
            self.known & (1 << bit) != 0
        } else if let Vocabulary::Custom(uri) = vocabulary {
            self.custom.contains(uri)
        } else {
            false
        }
    }
}

pub(crate) const DRAFT_2020_12_VOCABULARIES: u8 = 0b1111_1111;
pub(crate) const DRAFT_2019_09_VOCABULARIES: u8 = 0b1011_1011;

/// Find the vocabularies enabled by a meta-schema document's `$vocabulary`.
pub(crate) fn find(document: &Value) -> Result<Option<VocabularySet>, Error> {
    if let Some(vocabularies) = document.get("$vocabulary").and_then(Value::as_object) {
        let mut set = VocabularySet::new();
        for (uri, enabled) in vocabularies {
            if enabled.as_bool().unwrap_or(false) {
                set.add(Vocabulary::from_str(uri)?);
            }
        }
        Ok(Some(set))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::{find, Vocabulary, VocabularySet};
    use crate::uri;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(&Vocabulary::Core, 0b0000_0001, true)]
    #[test_case(&Vocabulary::Applicator, 0b0000_0010, true)]
    #[test_case(&Vocabulary::Unevaluated, 0b0000_0100, true)]
    #[test_case(&Vocabulary::Validation, 0b0000_1000, true)]
    #[test_case(&Vocabulary::Metadata, 0b0001_0000, true)]
    #[test_case(&Vocabulary::Format, 0b0010_0000, true)]
    #[test_case(&Vocabulary::FormatAnnotation, 0b0100_0000, true)]
    #[test_case(&Vocabulary::Content, 0b1000_0000, true)]
    #[test_case(&Vocabulary::Unevaluated, 0b1111_1011, false)]
    #[test_case(&Vocabulary::Content, 0b0111_1111, false)]
    fn known_bitmask(vocabulary: &Vocabulary, known: u8, expected: bool) {
        let set = VocabularySet::from_known(known);
        assert_eq!(set.contains(vocabulary), expected);
    }

    #[test]
    fn add_and_contains_custom() {
        let custom = uri::from_str("https://example.com/custom-vocab").expect("Valid URI");
        let mut set = VocabularySet::new();
        set.add(Vocabulary::Custom(custom.clone()));
        assert!(set.contains(&Vocabulary::Custom(custom)));
        assert!(!set.contains(&Vocabulary::Custom(
            uri::from_str("https://example.com/other").expect("Valid URI")
        )));
    }

    #[test]
    fn find_parses_vocabulary_object() {
        let document = json!({
            "$id": "https://example.com/custom-schema",
            "$vocabulary": {
                "https://json-schema.org/draft/2020-12/vocab/core": true,
                "https://json-schema.org/draft/2020-12/vocab/validation": true,
                "https://json-schema.org/draft/2020-12/vocab/content": false,
            }
        });
        let set = find(&document).expect("Valid vocabulary").expect("Present");
        assert!(set.contains(&Vocabulary::Core));
        assert!(set.contains(&Vocabulary::Validation));
        assert!(!set.contains(&Vocabulary::Content));
    }

    #[test]
    fn find_without_vocabulary_keyword() {
        assert!(find(&json!({"$id": "https://example.com"}))
            .expect("Valid")
            .is_none());
    }
}
