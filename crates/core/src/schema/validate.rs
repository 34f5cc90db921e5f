//! Document validation against a [`CollectionSpec`].

use core::fmt;

use regex::Regex;
use serde_json::Value;

use super::{CollectionSpec, FieldRule, FieldSpec, TIMESTAMP_PATTERN};

/// What went wrong with a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationKind {
    /// A required field is absent.
    Missing,
    /// The value has the wrong JSON type.
    WrongType {
        /// Human-readable expected type.
        expected: &'static str,
    },
    /// A string value does not match the field pattern.
    PatternMismatch,
    /// The value is not one of the allowed strings.
    NotOneOf {
        /// Allowed values.
        allowed: &'static [&'static str],
    },
    /// A string value is shorter than allowed.
    TooShort {
        /// Minimum number of characters.
        min: usize,
    },
    /// The rule's pattern failed to compile.
    InvalidPattern,
}

/// A rule violation on one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Dotted path of the offending field.
    pub path: &'static str,
    /// What was violated.
    pub kind: ViolationKind,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ViolationKind::Missing => write!(f, "{} is required", self.path),
            ViolationKind::WrongType { expected } => {
                write!(f, "{} must be {expected}", self.path)
            }
            ViolationKind::PatternMismatch => {
                write!(f, "{} does not match the required pattern", self.path)
            }
            ViolationKind::NotOneOf { allowed } => {
                write!(f, "{} must be one of: {}", self.path, allowed.join(", "))
            }
            ViolationKind::TooShort { min } => {
                write!(f, "{} must be at least {min} characters", self.path)
            }
            ViolationKind::InvalidPattern => {
                write!(f, "{} has an invalid pattern rule", self.path)
            }
        }
    }
}

/// Document rejected by a collection validator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Documents must be JSON objects.
    #[error("document must be a JSON object")]
    NotAnObject,
    /// One or more field rules failed.
    #[error("document failed validation: {}", join(.0))]
    Violations(Vec<Violation>),
}

impl ValidationError {
    /// Violations, empty for [`ValidationError::NotAnObject`].
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::NotAnObject => &[],
            Self::Violations(v) => v,
        }
    }

    /// Whether any violation concerns `path`.
    #[must_use]
    pub fn touches(&self, path: &str) -> bool {
        self.violations().iter().any(|v| v.path == path)
    }
}

fn join(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Resolve a dotted path inside a JSON document.
///
/// Returns `None` if any segment is missing or a non-object is traversed.
/// A present JSON `null` is returned as `Some(Value::Null)`.
#[must_use]
pub fn lookup<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(document, |current, segment| current.as_object()?.get(segment))
}

/// Validate `document` against every field rule in `spec`.
///
/// # Errors
///
/// Returns `ValidationError::NotAnObject` for non-object documents, or
/// `ValidationError::Violations` listing every failed rule.
pub fn validate_document(spec: &CollectionSpec, document: &Value) -> Result<(), ValidationError> {
    if !document.is_object() {
        return Err(ValidationError::NotAnObject);
    }

    let violations: Vec<Violation> = spec
        .fields
        .iter()
        .flat_map(|field| check_field(field, document))
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::Violations(violations))
    }
}

fn check_field(field: &FieldSpec, document: &Value) -> Vec<Violation> {
    let Some(value) = lookup(document, field.path) else {
        return if field.required {
            vec![Violation {
                path: field.path,
                kind: ViolationKind::Missing,
            }]
        } else {
            Vec::new()
        };
    };

    field
        .rules
        .iter()
        .filter_map(|rule| check_rule(*rule, value))
        .map(|kind| Violation {
            path: field.path,
            kind,
        })
        .collect()
}

fn check_rule(rule: FieldRule, value: &Value) -> Option<ViolationKind> {
    match rule {
        FieldRule::String => (!value.is_string()).then_some(ViolationKind::WrongType {
            expected: "a string",
        }),
        FieldRule::NullableString => (!(value.is_string() || value.is_null())).then_some(
            ViolationKind::WrongType {
                expected: "a string or null",
            },
        ),
        FieldRule::Number => (!value.is_number()).then_some(ViolationKind::WrongType {
            expected: "a number",
        }),
        FieldRule::Timestamp => {
            let ok = match value.as_str() {
                Some(s) => matches_pattern(TIMESTAMP_PATTERN, s)?,
                None => false,
            };
            (!ok).then_some(ViolationKind::WrongType {
                expected: "an RFC 3339 timestamp",
            })
        }
        FieldRule::Pattern(pattern) => {
            let s = value.as_str()?;
            match matches_pattern(pattern, s) {
                Some(true) => None,
                Some(false) => Some(ViolationKind::PatternMismatch),
                None => Some(ViolationKind::InvalidPattern),
            }
        }
        FieldRule::OneOf(allowed) => {
            let ok = value.as_str().is_some_and(|s| allowed.contains(&s));
            (!ok).then_some(ViolationKind::NotOneOf { allowed })
        }
        FieldRule::MinLength(min) => {
            let s = value.as_str()?;
            (s.chars().count() < min).then_some(ViolationKind::TooShort { min })
        }
    }
}

/// `None` when the pattern does not compile.
fn matches_pattern(pattern: &str, s: &str) -> Option<bool> {
    Regex::new(pattern).ok().map(|re| re.is_match(s))
}
