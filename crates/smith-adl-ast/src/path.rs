//! Reference paths.
//!
//! References in ADL are dot-separated paths rooted at a namespace:
//! - `var.model_temperature`
//! - `model.llama2_instance.name`
//! - `plugin.local.echo.source`
//!
//! The resolver uses Path as the key for memoization and cycle detection.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A dotted reference path.
///
/// Paths are immutable and support cheap comparison and hashing, which is
/// what the resolver's memo table and in-progress stack need.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    /// Create a path from its segments.
    pub fn new(segments: Vec<String>) -> Self {
        Self { segments }
    }

    /// Parse a path from a dot-separated string.
    pub fn parse(s: &str) -> Self {
        Self {
            segments: s.split('.').map(String::from).collect(),
        }
    }

    /// Get the path segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Get the number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Check if the path has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Get the first segment (the reference namespace: `var`, `model`, ...).
    pub fn first(&self) -> Option<&str> {
        self.segments.first().map(String::as_str)
    }

    /// Get the last segment.
    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Get the segment at an index.
    pub fn get(&self, idx: usize) -> Option<&str> {
        self.segments.get(idx).map(String::as_str)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl From<&str> for Path {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<String> for Path {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}
