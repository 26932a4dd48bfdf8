// SPDX-License-Identifier: MIT

//! Step placeholders
//!
//! A node input may reference a prior step's output with
//! `{{step:<nodeId>.response.<fieldPath>}}`. The executor substitutes the
//! value at run time; this module only recognises and builds the syntax.
//! Nothing here rewrites an input.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::portal::error::GraphError;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{step:([^{}]*)\}\}").expect("placeholder pattern is valid")
});

const RESPONSE_MARKER: &str = ".response.";

/// One step of a field path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Object key (`results`)
    Key(String),
    /// Array index (`[0]`)
    Index(usize),
}

/// Dot/bracket path into a step's output, e.g. `results[0].snippet`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath(Vec<PathSegment>);

/// A parsed `{{step:...}}` reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRef {
    pub node_id: String,
    pub path: FieldPath,
}

impl FieldPath {
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }
}

impl FromStr for FieldPath {
    type Err = GraphError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let malformed = || GraphError::MalformedPlaceholder(raw.to_string());
        let mut segments = Vec::new();

        for (i, part) in raw.split('.').enumerate() {
            let (name, mut brackets) = match part.find('[') {
                Some(at) => (&part[..at], &part[at..]),
                None => (part, ""),
            };

            if name.contains(']') {
                return Err(malformed());
            }
            if name.is_empty() {
                // A bare index is only allowed at the very start: `[0].title`
                if i > 0 || brackets.is_empty() {
                    return Err(malformed());
                }
            } else {
                segments.push(PathSegment::Key(name.to_string()));
            }

            while !brackets.is_empty() {
                let close = brackets.find(']').ok_or_else(malformed)?;
                let index = brackets[1..close]
                    .parse::<usize>()
                    .map_err(|_| malformed())?;
                segments.push(PathSegment::Index(index));
                brackets = &brackets[close + 1..];
                if !brackets.is_empty() && !brackets.starts_with('[') {
                    return Err(malformed());
                }
            }
        }

        Ok(Self(segments))
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if i == 0 => write!(f, "{}", key)?,
                PathSegment::Key(key) => write!(f, ".{}", key)?,
                PathSegment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

impl StepRef {
    /// Parse a whole placeholder, braces included
    pub fn parse(text: &str) -> Result<Self, GraphError> {
        let inner = text
            .trim()
            .strip_prefix("{{step:")
            .and_then(|rest| rest.strip_suffix("}}"))
            .ok_or_else(|| GraphError::MalformedPlaceholder(text.to_string()))?;
        Self::parse_inner(inner).map_err(|_| GraphError::MalformedPlaceholder(text.to_string()))
    }

    /// Parse the part between `{{step:` and `}}`
    fn parse_inner(inner: &str) -> Result<Self, GraphError> {
        let (node_id, path) = inner
            .split_once(RESPONSE_MARKER)
            .ok_or_else(|| GraphError::MalformedPlaceholder(inner.to_string()))?;
        if node_id.is_empty() || path.is_empty() {
            return Err(GraphError::MalformedPlaceholder(inner.to_string()));
        }

        Ok(Self {
            node_id: node_id.to_string(),
            path: path.parse()?,
        })
    }
}

impl FromStr for StepRef {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for StepRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{{step:{}.response.{}}}}}", self.node_id, self.path)
    }
}

/// Build the placeholder text an editor inserts for `node_id` and `path`
pub fn placeholder(node_id: &str, path: &str) -> Result<String, GraphError> {
    let step = StepRef {
        node_id: node_id.to_string(),
        path: path.parse()?,
    };
    Ok(step.to_string())
}

/// Scan one string; malformed placeholders come back as errors
pub fn scan(text: &str) -> Vec<Result<StepRef, GraphError>> {
    PLACEHOLDER
        .captures_iter(text)
        .map(|caps| {
            StepRef::parse_inner(&caps[1])
                .map_err(|_| GraphError::MalformedPlaceholder(caps[0].to_string()))
        })
        .collect()
}

/// Every well-formed placeholder in every string of `value`, in document order
pub fn find_references(value: &Value) -> Vec<StepRef> {
    let mut found = Vec::new();
    collect(value, &mut found);
    found
}

fn collect(value: &Value, found: &mut Vec<StepRef>) {
    match value {
        Value::String(text) => {
            for result in scan(text) {
                match result {
                    Ok(step) => found.push(step),
                    Err(e) => log::debug!("Skipping placeholder: {}", e),
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect(item, found)),
        Value::Object(map) => map.values().for_each(|item| collect(item, found)),
        _ => {}
    }
}
