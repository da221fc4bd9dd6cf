use core::fmt;

use serde_json::Value;

/// The six JSON types plus `integer`, as used by the `type` keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PrimitiveType {
    Array,
    Boolean,
    Integer,
    Null,
    Number,
    Object,
    String,
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimitiveType::Array => f.write_str("array"),
            PrimitiveType::Boolean => f.write_str("boolean"),
            PrimitiveType::Integer => f.write_str("integer"),
            PrimitiveType::Null => f.write_str("null"),
            PrimitiveType::Number => f.write_str("number"),
            PrimitiveType::Object => f.write_str("object"),
            PrimitiveType::String => f.write_str("string"),
        }
    }
}

impl std::str::FromStr for PrimitiveType {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "array" => Ok(PrimitiveType::Array),
            "boolean" => Ok(PrimitiveType::Boolean),
            "integer" => Ok(PrimitiveType::Integer),
            "null" => Ok(PrimitiveType::Null),
            "number" => Ok(PrimitiveType::Number),
            "object" => Ok(PrimitiveType::Object),
            "string" => Ok(PrimitiveType::String),
            _ => Err(()),
        }
    }
}

const fn bit(primitive_type: PrimitiveType) -> u8 {
    match primitive_type {
        PrimitiveType::Array => 1,
        PrimitiveType::Boolean => 1 << 1,
        PrimitiveType::Integer => 1 << 2,
        PrimitiveType::Null => 1 << 3,
        PrimitiveType::Number => 1 << 4,
        PrimitiveType::Object => 1 << 5,
        PrimitiveType::String => 1 << 6,
    }
}

/// A set of primitive types as a bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrimitiveTypesBitMap {
    inner: u8,
}

impl PrimitiveTypesBitMap {
    pub(crate) const fn new() -> Self {
        Self { inner: 0 }
    }
    #[must_use]
    pub(crate) const fn add_type(mut self, primitive_type: PrimitiveType) -> Self {
        self.inner |= bit(primitive_type);
        self
    }
    pub(crate) const fn contains_type(self, primitive_type: PrimitiveType) -> bool {
        self.inner & bit(primitive_type) != 0
    }
    /// Whether the instance matches any type in the set.
    ///
    /// Integer-valued numbers pass `integer`, and integers always pass
    /// `number`.
    pub(crate) fn is_valid(self, instance: &Value) -> bool {
        match instance {
            Value::Array(_) => self.contains_type(PrimitiveType::Array),
            Value::Bool(_) => self.contains_type(PrimitiveType::Boolean),
            Value::Null => self.contains_type(PrimitiveType::Null),
            Value::Number(number) => {
                self.contains_type(PrimitiveType::Number)
                    || (self.contains_type(PrimitiveType::Integer)
                        && (number.is_u64()
                            || number.is_i64()
                            || number.as_f64().is_some_and(|value| value.fract() == 0.)))
            }
            Value::Object(_) => self.contains_type(PrimitiveType::Object),
            Value::String(_) => self.contains_type(PrimitiveType::String),
        }
    }
    pub(crate) fn iter(self) -> impl Iterator<Item = PrimitiveType> {
        [
            PrimitiveType::Array,
            PrimitiveType::Boolean,
            PrimitiveType::Integer,
            PrimitiveType::Null,
            PrimitiveType::Number,
            PrimitiveType::Object,
            PrimitiveType::String,
        ]
        .into_iter()
        .filter(move |primitive_type| self.contains_type(*primitive_type))
    }
}

impl From<PrimitiveType> for PrimitiveTypesBitMap {
    fn from(primitive_type: PrimitiveType) -> Self {
        PrimitiveTypesBitMap::new().add_type(primitive_type)
    }
}

#[cfg(test)]
mod tests {
    use super::{PrimitiveType, PrimitiveTypesBitMap};
    use serde_json::json;
    use test_case::test_case;

    #[test_case(json!(1), true)]
    #[test_case(json!(1.0), true; "integer valued float")]
    #[test_case(json!(1.5), false)]
    #[test_case(json!("1"), false)]
    fn integer_rules(instance: serde_json::Value, expected: bool) {
        let types = PrimitiveTypesBitMap::from(PrimitiveType::Integer);
        assert_eq!(types.is_valid(&instance), expected);
    }

    #[test]
    fn multiple_types() {
        let types = PrimitiveTypesBitMap::new()
            .add_type(PrimitiveType::String)
            .add_type(PrimitiveType::Null);
        assert!(types.is_valid(&json!("a")));
        assert!(types.is_valid(&json!(null)));
        assert!(!types.is_valid(&json!(1)));
        assert_eq!(types.iter().count(), 2);
    }
}
