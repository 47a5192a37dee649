//! Schema validation over untrusted JSON.
//!
//! Validators walk a `serde_json::Value` and collect every failing check
//! instead of stopping at the first, then hand back a [`Validation`].

use std::fmt;

use regex::Regex;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// One step in the path to a failing value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl Serialize for PathSegment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PathSegment::Key(key) => serializer.serialize_str(key),
            PathSegment::Index(index) => serializer.serialize_u64(*index as u64),
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => f.write_str(key),
            PathSegment::Index(index) => write!(f, "{index}"),
        }
    }
}

/// A failing check and where it failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub path: Vec<PathSegment>,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: Vec<PathSegment>, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }

    /// Dotted path, e.g. `tags.1`.
    pub fn path_string(&self) -> String {
        self.path
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path_string(), self.message)
    }
}

/// Join issues into one human-readable line.
pub fn summarize(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result of validating untrusted input.
#[derive(Debug, Clone, PartialEq)]
pub enum Validation<T> {
    Success(T),
    Failure(Vec<ValidationIssue>),
}

impl<T> Validation<T> {
    pub fn into_result(self) -> Result<T, Vec<ValidationIssue>> {
        match self {
            Validation::Success(data) => Ok(data),
            Validation::Failure(issues) => Err(issues),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Validation::Success(_))
    }
}

/// Constraints on a string field.
#[derive(Default)]
pub struct StringRule<'r> {
    min: Option<(usize, &'r str)>,
    max: Option<(usize, &'r str)>,
    pattern: Option<(&'r Regex, &'r str)>,
    check: Option<(fn(&str) -> bool, &'r str)>,
}

impl<'r> StringRule<'r> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Minimum length in UTF-16 code units.
    pub fn min(mut self, len: usize, message: &'r str) -> Self {
        self.min = Some((len, message));
        self
    }

    /// Maximum length in UTF-16 code units.
    pub fn max(mut self, len: usize, message: &'r str) -> Self {
        self.max = Some((len, message));
        self
    }

    pub fn pattern(mut self, regex: &'r Regex, message: &'r str) -> Self {
        self.pattern = Some((regex, message));
        self
    }

    pub fn check(mut self, f: fn(&str) -> bool, message: &'r str) -> Self {
        self.check = Some((f, message));
        self
    }

    fn apply(&self, value: &str, path: &[PathSegment], issues: &mut Vec<ValidationIssue>) {
        let len = value.encode_utf16().count();
        if let Some((min, message)) = self.min {
            if len < min {
                issues.push(ValidationIssue::new(path.to_vec(), message));
            }
        }
        if let Some((max, message)) = self.max {
            if len > max {
                issues.push(ValidationIssue::new(path.to_vec(), message));
            }
        }
        if let Some((regex, message)) = self.pattern {
            if !regex.is_match(value) {
                issues.push(ValidationIssue::new(path.to_vec(), message));
            }
        }
        if let Some((f, message)) = self.check {
            if !f(value) {
                issues.push(ValidationIssue::new(path.to_vec(), message));
            }
        }
    }
}

/// Walks the fields of one JSON object, collecting issues.
pub struct ObjectValidator<'a> {
    fields: Option<&'a Map<String, Value>>,
    issues: Vec<ValidationIssue>,
}

impl<'a> ObjectValidator<'a> {
    /// Start validating `value`. A non-object records a root issue and makes
    /// every field lookup return `None`.
    pub fn new(value: &'a Value) -> Self {
        match value {
            Value::Object(fields) => Self {
                fields: Some(fields),
                issues: Vec::new(),
            },
            other => Self {
                fields: None,
                issues: vec![ValidationIssue::new(
                    Vec::new(),
                    format!("Expected object, received {}", type_name(other)),
                )],
            },
        }
    }

    /// Field value, treating absence as `None`. JSON `null` is a present value.
    fn field(&self, key: &str) -> Option<&'a Value> {
        self.fields.and_then(|fields| fields.get(key))
    }

    fn required(&mut self, key: &str) -> Option<&'a Value> {
        let value = self.field(key);
        if value.is_none() && self.fields.is_some() {
            self.issues.push(ValidationIssue::new(path(key), "Required"));
        }
        value
    }

    fn expect_type(&mut self, key: &str, expected: &str, value: &Value) {
        self.issues.push(ValidationIssue::new(
            path(key),
            format!("Expected {expected}, received {}", type_name(value)),
        ));
    }

    fn string_value(&mut self, key: &str, value: &'a Value, rule: &StringRule<'_>) -> Option<String> {
        match value {
            Value::String(s) => {
                let before = self.issues.len();
                rule.apply(s, &path(key), &mut self.issues);
                (self.issues.len() == before).then(|| s.clone())
            }
            other => {
                self.expect_type(key, "string", other);
                None
            }
        }
    }

    /// A required string.
    pub fn string(&mut self, key: &str, rule: &StringRule<'_>) -> Option<String> {
        let value = self.required(key)?;
        self.string_value(key, value, rule)
    }

    /// An optional string; `None` when absent or invalid.
    pub fn optional_string(&mut self, key: &str, rule: &StringRule<'_>) -> Option<String> {
        let value = self.field(key)?;
        self.string_value(key, value, rule)
    }

    fn boolean_value(&mut self, key: &str, value: &Value) -> Option<bool> {
        match value {
            Value::Bool(b) => Some(*b),
            other => {
                self.expect_type(key, "boolean", other);
                None
            }
        }
    }

    /// A required boolean.
    pub fn boolean(&mut self, key: &str) -> Option<bool> {
        let value = self.required(key)?;
        self.boolean_value(key, value)
    }

    pub fn optional_boolean(&mut self, key: &str) -> Option<bool> {
        let value = self.field(key)?;
        self.boolean_value(key, value)
    }

    /// An optional array of strings; `None` when absent or invalid.
    pub fn optional_string_list(&mut self, key: &str) -> Option<Vec<String>> {
        let value = self.field(key)?;
        let Value::Array(items) = value else {
            self.expect_type(key, "array", value);
            return None;
        };

        let mut out = Vec::with_capacity(items.len());
        let mut valid = true;
        for (index, item) in items.iter().enumerate() {
            match item {
                Value::String(s) => out.push(s.clone()),
                other => {
                    valid = false;
                    self.issues.push(ValidationIssue::new(
                        vec![PathSegment::Key(key.to_string()), PathSegment::Index(index)],
                        format!("Expected string, received {}", type_name(other)),
                    ));
                }
            }
        }
        valid.then_some(out)
    }

    /// Finish; `Ok(())` when no check failed.
    pub fn finish(self) -> Result<(), Vec<ValidationIssue>> {
        if self.issues.is_empty() {
            Ok(())
        } else {
            Err(self.issues)
        }
    }
}

fn path(key: &str) -> Vec<PathSegment> {
    vec![PathSegment::Key(key.to_string())]
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
