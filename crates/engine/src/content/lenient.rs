use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

/// Numeric level field that never fails the load. Absent and malformed
/// values both resolve to a caller-supplied default; malformed ones warn.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LenientNumber {
    #[default]
    Absent,
    Value(f32),
    Malformed(String),
}

impl LenientNumber {
    pub fn resolve(&self, field: &str, default: f32) -> f32 {
        match self {
            Self::Absent => default,
            Self::Value(value) => *value,
            Self::Malformed(raw) => {
                warn!(field, raw = %raw, default, "malformed_level_number");
                default
            }
        }
    }

    pub fn resolve_i32(&self, field: &str, default: i32) -> i32 {
        self.resolve(field, default as f32).round() as i32
    }
}

impl From<f32> for LenientNumber {
    fn from(value: f32) -> Self {
        Self::Value(value)
    }
}

impl<'de> Deserialize<'de> for LenientNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let parsed = match &value {
            Value::Null => return Ok(Self::Absent),
            Value::Number(number) => number.as_f64().map(|v| v as f32),
            Value::String(raw) => raw.trim().parse::<f32>().ok(),
            _ => None,
        };
        Ok(match parsed.filter(|v| v.is_finite()) {
            Some(v) => Self::Value(v),
            None => Self::Malformed(value.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(default)]
        width: LenientNumber,
    }

    fn parse(raw: &str) -> LenientNumber {
        serde_json::from_str::<Probe>(raw).expect("probe").width
    }

    #[test]
    fn numbers_and_numeric_strings_parse() {
        assert_eq!(parse(r#"{"width": 48}"#), LenientNumber::Value(48.0));
        assert_eq!(parse(r#"{"width": " 12.5 "}"#), LenientNumber::Value(12.5));
    }

    #[test]
    fn missing_and_null_are_absent() {
        assert_eq!(parse("{}"), LenientNumber::Absent);
        assert_eq!(parse(r#"{"width": null}"#), LenientNumber::Absent);
    }

    #[test]
    fn garbage_resolves_to_default() {
        let width = parse(r#"{"width": "wide"}"#);
        assert!(matches!(width, LenientNumber::Malformed(_)));
        assert_eq!(width.resolve("width", 32.0), 32.0);
        assert_eq!(parse(r#"{"width": [1]}"#).resolve_i32("width", 7), 7);
    }
}
