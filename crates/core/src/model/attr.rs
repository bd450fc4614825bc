use serde::{Deserialize, Serialize};

/// Scalar attribute value carried on a span.
///
/// Variant order matters for untagged deserialization: strings first, then
/// integers before floats so whole numbers round-trip as `Int`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AttrValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Plain-text rendering used when matching glob filters against values.
    pub fn render(&self) -> String {
        match self {
            Self::Str(s) => s.clone(),
            Self::Int(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::Bool(v) => v.to_string(),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        Self::Int(value as i64)
    }
}

impl From<usize> for AttrValue {
    fn from(value: usize) -> Self {
        Self::Int(value as i64)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_bare_scalars() {
        assert_eq!(
            serde_json::to_string(&AttrValue::Str("redis".into())).unwrap(),
            "\"redis\""
        );
        assert_eq!(serde_json::to_string(&AttrValue::Int(7)).unwrap(), "7");
        assert_eq!(serde_json::to_string(&AttrValue::Bool(true)).unwrap(), "true");
    }

    #[test]
    fn whole_numbers_deserialize_as_int() {
        let v: AttrValue = serde_json::from_str("42").unwrap();
        assert_eq!(v, AttrValue::Int(42));
        let v: AttrValue = serde_json::from_str("42.5").unwrap();
        assert_eq!(v, AttrValue::Float(42.5));
    }

    #[test]
    fn renders_for_filter_matching() {
        assert_eq!(AttrValue::from("abc").render(), "abc");
        assert_eq!(AttrValue::from(3i64).render(), "3");
        assert_eq!(AttrValue::from(false).render(), "false");
    }
}
