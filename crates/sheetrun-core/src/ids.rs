//! Newtype wrappers for identifiers to ensure type safety.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::CoreError;

/// Unique identifier for a processing Run.
///
/// Generated ids look like `143015-6f1c...`: the local wall-clock time keeps
/// log files sortable within a day, the uuid suffix keeps runs started in the
/// same second apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(String);

impl RunId {
    /// Create a new RunId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new unique RunId.
    pub fn generate() -> Self {
        let time = chrono::Local::now().format("%H%M%S");
        Self(format!("{}-{}", time, Uuid::new_v4().simple()))
    }

    /// Get the inner string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RunId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RunId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Label of a pipeline variant, e.g. `modulo1`.
///
/// Only ASCII alphanumerics, `-` and `_` are accepted because the label ends
/// up in log file names, upload directories and URL paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Category(String);

impl Category {
    /// Validate and wrap a category label.
    pub fn new(label: impl Into<String>) -> Result<Self, CoreError> {
        let label = label.into();
        let valid = !label.is_empty()
            && label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if valid {
            Ok(Self(label))
        } else {
            Err(CoreError::InvalidCategory(label))
        }
    }

    /// Get the inner string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Category {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Category> for String {
    fn from(c: Category) -> Self {
        c.0
    }
}
