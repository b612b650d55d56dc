//! Runtime values for the interpreter

use serde::{Deserialize, Serialize};
use std::fmt;

/// Runtime value. The language has exactly one type: string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Value(String);

const TRUE: &str = "true";
const FALSE: &str = "false";

impl Value {
    pub fn new(s: impl Into<String>) -> Self {
        Value(s.into())
    }

    /// The empty value, result of every soft failure
    pub fn empty() -> Self {
        Value(String::new())
    }

    pub fn from_bool(b: bool) -> Self {
        Value::new(if b { TRUE } else { FALSE })
    }

    /// False iff the value is `""` or `"false"`
    pub fn is_truthy(&self) -> bool {
        !(self.0.is_empty() || self.0 == FALSE)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }

    /// Bytes held by this value, counted against the memory budget
    pub fn footprint(&self) -> usize {
        self.0.len()
    }

    /// The character at `index`, if any
    pub fn char_at(&self, index: usize) -> Option<Value> {
        self.0.chars().nth(index).map(|c| Value(c.to_string()))
    }

    pub fn concat(&self, other: &Value) -> Value {
        let mut s = String::with_capacity(self.0.len() + other.0.len());
        s.push_str(&self.0);
        s.push_str(&other.0);
        Value(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value(s)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value(n.to_string())
    }
}

impl PartialEq<str> for Value {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::from("").is_truthy());
        assert!(!Value::from("false").is_truthy());
        assert!(Value::from("0").is_truthy());
        assert!(Value::from("true").is_truthy());
        assert!(Value::from("False").is_truthy());
    }

    #[test]
    fn test_from_bool() {
        assert_eq!(Value::from_bool(true), "true");
        assert_eq!(Value::from_bool(false), "false");
    }

    #[test]
    fn test_char_at_is_per_character() {
        let v = Value::from("héllo");
        assert_eq!(v.char_at(1), Some(Value::from("é")));
        assert_eq!(v.char_at(5), None);
        assert_eq!(v.char_len(), 5);
        assert_eq!(v.footprint(), 6);
    }

    #[test]
    fn test_concat_and_display() {
        let v = Value::from("ab").concat(&Value::from("cd"));
        assert_eq!(v.to_string(), "abcd");
    }

    #[test]
    fn test_serde_transparent() {
        let json = serde_json::to_string(&Value::from("x")).unwrap();
        assert_eq!(json, "\"x\"");
    }
}
