//! Positional action arguments
//!
//! Build definitions give each action an ordered list of primitive values
//! (strings, numbers, booleans and nested lists). [`ActionArgs`] wraps that
//! list and offers typed accessors whose failures are always
//! [`ErrorKind::Validation`](crate::error::ErrorKind::Validation) errors, so an
//! action's `validate()` can be written as a handful of `?` calls.

use crate::error::{ActionError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Ordered, immutable argument list for one action
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ActionArgs(Vec<Value>);

impl ActionArgs {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }

    /// Check that the argument count lies within `min..=max`
    pub fn expect_arity(&self, min: usize, max: usize) -> Result<()> {
        let n = self.0.len();
        if n < min || n > max {
            let expected = if min == max {
                format!("{}", min)
            } else {
                format!("{} to {}", min, max)
            };
            return Err(ActionError::validation(format!(
                "expected {} argument(s), got {}",
                expected, n
            )));
        }
        Ok(())
    }

    fn required(&self, index: usize) -> Result<&Value> {
        self.0.get(index).ok_or_else(|| {
            ActionError::validation(format!("missing argument {}", index))
        })
    }

    /// Required string argument
    pub fn string(&self, index: usize) -> Result<&str> {
        let value = self.required(index)?;
        value.as_str().ok_or_else(|| mismatch(index, "string", value))
    }

    /// Optional string argument; `null` counts as absent
    pub fn optional_string(&self, index: usize) -> Result<Option<&str>> {
        match self.0.get(index) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_str()
                .map(Some)
                .ok_or_else(|| mismatch(index, "string", value)),
        }
    }

    /// Required non-negative integer argument
    pub fn u64(&self, index: usize) -> Result<u64> {
        let value = self.required(index)?;
        value
            .as_u64()
            .ok_or_else(|| mismatch(index, "non-negative integer", value))
    }

    /// Optional non-negative integer argument; `null` counts as absent
    pub fn optional_u64(&self, index: usize) -> Result<Option<u64>> {
        match self.0.get(index) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_u64()
                .map(Some)
                .ok_or_else(|| mismatch(index, "non-negative integer", value)),
        }
    }

    /// Optional boolean argument; `null` counts as absent
    pub fn optional_bool(&self, index: usize) -> Result<Option<bool>> {
        match self.0.get(index) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_bool()
                .map(Some)
                .ok_or_else(|| mismatch(index, "boolean", value)),
        }
    }

    /// Required nested list argument
    pub fn list(&self, index: usize) -> Result<&[Value]> {
        let value = self.required(index)?;
        value
            .as_array()
            .map(|v| v.as_slice())
            .ok_or_else(|| mismatch(index, "list", value))
    }
}

fn mismatch(index: usize, expected: &str, got: &Value) -> ActionError {
    ActionError::validation(format!(
        "argument {}: expected {}, got {}",
        index,
        expected,
        value_type(got)
    ))
}

/// Short type name of a JSON value, used in diagnostics
pub fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

// A lone scalar is accepted as a one-element list and `null` as no arguments,
// which keeps hand-written definitions like `system.Sleep: 30` valid.
impl<'de> Deserialize<'de> for ActionArgs {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Null => Self::default(),
            Value::Array(values) => Self(values),
            other => Self(vec![other]),
        })
    }
}

impl From<Vec<Value>> for ActionArgs {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl FromIterator<Value> for ActionArgs {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ActionArgs {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(values: Value) -> ActionArgs {
        serde_json::from_value(values).unwrap()
    }

    #[test]
    fn test_arity() {
        let a = args(json!([1, 2]));
        assert!(a.expect_arity(2, 2).is_ok());
        assert!(a.expect_arity(0, 3).is_ok());

        let err = a.expect_arity(1, 1).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(
            err.message(),
            "expected 1 argument(s), got 2"
        );

        let err = a.expect_arity(3, 4).unwrap_err();
        assert!(err.message().contains("3 to 4"));
    }

    #[test]
    fn test_typed_accessors() {
        let a = args(json!(["C:\\Windows", 100, true, [1, 2]]));

        assert_eq!(a.string(0).unwrap(), "C:\\Windows");
        assert_eq!(a.u64(1).unwrap(), 100);
        assert_eq!(a.optional_bool(2).unwrap(), Some(true));
        assert_eq!(a.list(3).unwrap().len(), 2);
    }

    #[test]
    fn test_type_mismatch_is_validation_error() {
        let a = args(json!(["not a number"]));

        let err = a.u64(0).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(
            err.message(),
            "argument 0: expected non-negative integer, got string"
        );
    }

    #[test]
    fn test_missing_argument() {
        let a = ActionArgs::default();
        assert!(a.string(0).unwrap_err().is_validation());
        assert_eq!(a.optional_string(0).unwrap(), None);
        assert_eq!(a.optional_u64(0).unwrap(), None);
    }

    #[test]
    fn test_null_is_absent() {
        let a = args(json!([null]));
        assert_eq!(a.optional_u64(0).unwrap(), None);
        assert!(a.u64(0).is_err());
    }

    #[test]
    fn test_negative_number_rejected() {
        let a = args(json!([-5]));
        assert!(a.u64(0).is_err());
    }

    #[test]
    fn test_scalar_and_null_deserialize() {
        assert_eq!(args(json!(30)).as_slice(), &[json!(30)]);
        assert!(args(Value::Null).is_empty());
    }

    #[test]
    fn test_serializes_as_plain_list() {
        let a = ActionArgs::from(vec![json!("a"), json!(1)]);
        assert_eq!(serde_json::to_value(&a).unwrap(), json!(["a", 1]));
    }
}
