//! Migration step model.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;

/// Strongly-typed wrapper for step ids.
///
/// A step id is a non-empty token without whitespace. It identifies a step
/// across runs and is the journal's primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StepId(String);

impl StepId {
    /// Try to create a new `StepId`, returning `None` if the token is empty
    /// or contains whitespace.
    pub fn try_new(id: impl Into<String>) -> Option<Self> {
        let s = id.into();
        if s.is_empty() || s.chars().any(char::is_whitespace) {
            None
        } else {
            Some(Self(s))
        }
    }

    /// Return the underlying id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the inner `String`.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl TryFrom<String> for StepId {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        StepId::try_new(s.clone()).ok_or_else(|| format!("invalid step id '{}'", s))
    }
}

impl From<StepId> for String {
    fn from(id: StepId) -> Self {
        id.0
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StepId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for StepId {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for StepId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for StepId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for StepId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// One identified unit of schema change parsed from a migration script.
///
/// Immutable once emitted by the parser. `sql` is the trimmed body between
/// this step's header and the next header (or end of input) and is never
/// empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStep {
    /// Identity across runs
    pub id: StepId,

    /// Human-readable label, not used for identity
    pub name: String,

    /// Optional boolean probe: "is this step's effect already present?"
    pub check_sql: Option<String>,

    /// Statements to apply, newline-joined and trimmed
    pub sql: String,
}

impl MigrationStep {
    /// Label used in log lines: `id (name)`.
    pub fn label(&self) -> String {
        if self.name.is_empty() {
            self.id.to_string()
        } else {
            format!("{} ({})", self.id, self.name)
        }
    }
}
