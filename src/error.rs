use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Field-keyed validation failures, collected without short-circuiting so a
/// caller can flag every invalid input at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a map holding a single error.
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.insert(field, message);
        errors
    }

    /// Records an error for `field`. The first message recorded for a field wins.
    pub fn insert(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }

    /// Returns `Ok(value)` when no errors were recorded.
    pub fn into_result<T>(self, value: T) -> std::result::Result<T, FieldErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in self.iter() {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum BillingError {
    /// One or more caller-supplied fields are missing or malformed.
    #[error("Validation error: {0}")]
    ValidationError(FieldErrors),
    /// The request conflicts with the current invoice or submission state.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl BillingError {
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation(message.into())
    }

    pub fn field(field: &'static str, message: impl Into<String>) -> Self {
        Self::ValidationError(FieldErrors::single(field, message))
    }

    /// Field errors carried by a validation failure, if this is one.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::ValidationError(errors) => Some(errors),
            _ => None,
        }
    }

    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::InvariantViolation(_))
    }
}

impl From<FieldErrors> for BillingError {
    fn from(errors: FieldErrors) -> Self {
        Self::ValidationError(errors)
    }
}

pub type Result<T> = std::result::Result<T, BillingError>;
