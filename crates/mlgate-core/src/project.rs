//! Project identity

use serde::{Deserialize, Serialize};
use std::fmt;

/// NewType pattern for the stable project key
///
/// The platform sends projects as `"{project_id}.{timestamp}"`; only the part
/// before the first `.` identifies the project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectId(String);

impl ProjectId {
    /// Create from an already extracted id
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Extract the project id from a composite `"{id}.{timestamp}"` string.
    ///
    /// A string without `.` is taken whole. Empty input yields `None`.
    pub fn from_composite(composite: &str) -> Option<Self> {
        if composite.is_empty() {
            return None;
        }
        let id = composite
            .split_once('.')
            .map_or(composite, |(id, _timestamp)| id);
        Some(Self(id.to_string()))
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
