//! Backend value type
//!
//! A backend is a named, weighted endpoint. Weights are signed: anything
//! `<= 0` keeps the backend in configuration but makes it unselectable.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named, weighted backend
///
/// Fields are private so a backend cannot be reweighted after it has been
/// handed to a selector. Changing a weight means building a new selector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Backend {
    name: String,
    /// Relative traffic share; `<= 0` disables the backend
    #[serde(default = "default_weight")]
    weight: i64,
}

fn default_weight() -> i64 {
    1
}

impl Backend {
    /// Create a backend with the given name and weight
    pub fn new(name: impl Into<String>, weight: i64) -> Self {
        Self {
            name: name.into(),
            weight,
        }
    }

    /// Get the backend name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the configured weight (may be zero or negative)
    pub fn weight(&self) -> i64 {
        self.weight
    }

    /// Whether this backend takes part in selection
    pub fn is_enabled(&self) -> bool {
        self.weight > 0
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (weight {})", self.name, self.weight)
    }
}
