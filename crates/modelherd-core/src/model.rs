//! Model descriptors parsed from a runtime's `list` output.

use serde::{Deserialize, Serialize};

/// Name and optional size metadata for a selectable model.
///
/// Descriptors are read-only reference data produced by parsing the output
/// of a registered list invocation. The expected line format is one model
/// per line: a whitespace-separated name followed by an optional size token
/// (`"1.5b  1.1GB"`). Header rows (first token `NAME`), runtime log lines
/// (first token starting with `[GIN]`), and lines without a metadata column
/// are skipped rather than treated as fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Model name as reported by the runtime.
    pub name: String,
    /// Size tag for the model file, when the listing reports one.
    pub size: Option<String>,
}

impl ModelDescriptor {
    /// Parse a single listing line, returning `None` for noise.
    pub fn parse_line(line: &str) -> Option<Self> {
        let mut tokens = line.split_whitespace();
        let name = tokens.next()?;
        if name == "NAME" || name.starts_with("[GIN]") {
            return None;
        }
        // A bare token with no metadata column is runtime noise, not a model row.
        let size = tokens.next()?;
        Some(Self {
            name: name.to_string(),
            size: Some(size.to_string()),
        })
    }

    /// Parse a complete listing, skipping malformed lines.
    pub fn parse_listing(output: &str) -> Vec<Self> {
        output.lines().filter_map(Self::parse_line).collect()
    }
}
