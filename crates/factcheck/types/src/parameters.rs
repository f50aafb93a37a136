//! Flat solver parameters.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A scalar parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Integer(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Integer(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

/// Name to scalar map handed to a solver constructor.
///
/// Values loaded from environment variables arrive as text, so the numeric
/// and boolean accessors also parse text values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(BTreeMap<String, ParamValue>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build parameters from a JSON object, rejecting nested values.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ConfigError> {
        let object = match value {
            serde_json::Value::Null => return Ok(Self::default()),
            serde_json::Value::Object(object) => object,
            other => {
                return Err(ConfigError::Invalid(format!(
                    "parameters must be an object, got {other}"
                )))
            }
        };

        let mut params = Self::default();
        for (name, value) in object {
            let scalar = match value {
                serde_json::Value::Bool(b) => ParamValue::Bool(*b),
                serde_json::Value::Number(n) => match n.as_i64() {
                    Some(i) => ParamValue::Integer(i),
                    None => ParamValue::Float(n.as_f64().unwrap_or_default()),
                },
                serde_json::Value::String(s) => ParamValue::Text(s.clone()),
                serde_json::Value::Null
                | serde_json::Value::Array(_)
                | serde_json::Value::Object(_) => {
                    return Err(ConfigError::NestedParameter(name.clone()))
                }
            };
            params.0.insert(name.clone(), scalar);
        }
        Ok(params)
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Overlay `other` on top of these parameters.
    pub fn merged(&self, other: &Parameters) -> Parameters {
        let mut merged = self.clone();
        for (name, value) in &other.0 {
            merged.0.insert(name.clone(), value.clone());
        }
        merged
    }

    pub fn str(&self, name: &str) -> Result<Option<&str>, ConfigError> {
        match self.0.get(name) {
            None => Ok(None),
            Some(ParamValue::Text(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(invalid(name, format!("expected text, got {other}"))),
        }
    }

    pub fn require_str(&self, name: &str) -> Result<&str, ConfigError> {
        self.str(name)?
            .ok_or_else(|| ConfigError::MissingParameter(name.to_string()))
    }

    pub fn u64_or(&self, name: &str, default: u64) -> Result<u64, ConfigError> {
        match self.0.get(name) {
            None => Ok(default),
            Some(ParamValue::Integer(i)) if *i >= 0 => Ok(*i as u64),
            Some(ParamValue::Text(s)) => s
                .trim()
                .parse()
                .map_err(|_| invalid(name, format!("'{s}' is not a non-negative integer"))),
            Some(other) => Err(invalid(
                name,
                format!("expected a non-negative integer, got {other}"),
            )),
        }
    }

    pub fn f64_or(&self, name: &str, default: f64) -> Result<f64, ConfigError> {
        match self.0.get(name) {
            None => Ok(default),
            Some(ParamValue::Float(f)) => Ok(*f),
            Some(ParamValue::Integer(i)) => Ok(*i as f64),
            Some(ParamValue::Text(s)) => s
                .trim()
                .parse()
                .map_err(|_| invalid(name, format!("'{s}' is not a number"))),
            Some(other) => Err(invalid(name, format!("expected a number, got {other}"))),
        }
    }

    pub fn bool_or(&self, name: &str, default: bool) -> Result<bool, ConfigError> {
        match self.0.get(name) {
            None => Ok(default),
            Some(ParamValue::Bool(b)) => Ok(*b),
            Some(ParamValue::Text(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(true),
                "false" | "no" | "0" => Ok(false),
                _ => Err(invalid(name, format!("'{s}' is not a boolean"))),
            },
            Some(other) => Err(invalid(name, format!("expected a boolean, got {other}"))),
        }
    }
}

fn invalid(name: &str, reason: String) -> ConfigError {
    ConfigError::InvalidParameter {
        parameter: name.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn typed_accessors() {
        let params = Parameters::new()
            .with("max_claims", 4_i64)
            .with("threshold", "0.25")
            .with("strict", "yes");

        assert_eq!(params.u64_or("max_claims", 1).unwrap(), 4);
        assert_eq!(params.u64_or("absent", 7).unwrap(), 7);
        assert!((params.f64_or("threshold", 0.0).unwrap() - 0.25).abs() < f64::EPSILON);
        assert!(params.bool_or("strict", false).unwrap());
        assert!(matches!(
            params.require_str("label"),
            Err(ConfigError::MissingParameter(name)) if name == "label"
        ));
    }

    #[test]
    fn wrong_type_is_invalid_parameter() {
        let params = Parameters::new().with("max_claims", "many");
        assert!(matches!(
            params.u64_or("max_claims", 1),
            Err(ConfigError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn from_json_rejects_nested_values() {
        let ok = Parameters::from_json(&json!({"label": "false", "k": 3})).unwrap();
        assert_eq!(ok.len(), 2);

        let err = Parameters::from_json(&json!({"model": {"name": "x"}})).unwrap_err();
        assert_eq!(err, ConfigError::NestedParameter("model".into()));

        let err = Parameters::from_json(&json!({"sources": ["a", "b"]})).unwrap_err();
        assert_eq!(err, ConfigError::NestedParameter("sources".into()));
    }

    #[test]
    fn merge_overrides_left_side() {
        let base = Parameters::new().with("k", 1_i64).with("label", "true");
        let merged = base.merged(&Parameters::new().with("k", 5_i64));
        assert_eq!(merged.u64_or("k", 0).unwrap(), 5);
        assert_eq!(merged.require_str("label").unwrap(), "true");
    }
}
