//! Expression resolution for `{{ }}` references between nodes
//!
//! Supports:
//! - {{ nodeId.json.field }}
//! - {{ nodeId.json.items[0].name }}
//! - {{ nodeId.nodeName }}
//!
//! A string that is exactly one expression keeps the referenced value's type.
//! Embedded expressions are replaced by their string form. A reference that
//! cannot be resolved becomes `null` (or an empty string when embedded) and is
//! logged; it never fails the node.

use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::sync::LazyLock;
use tracing::warn;

use super::output_store::OutputStore;

static EXPRESSION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([^{}]*?)\s*\}\}").unwrap());

static STANDALONE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{\{\s*([^{}]*?)\s*\}\}$").unwrap());

static SEGMENT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^\[\]]*)((?:\[\d+\])*)$").unwrap());

static INDEX_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[(\d+)\]").unwrap());

/// Reasons a reference degraded to `null`
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExpressionWarning {
    #[error("Malformed expression '{0}': expected nodeId.path")]
    Malformed(String),

    #[error("Invalid path segment '{segment}' in '{expr}'")]
    InvalidSegment { expr: String, segment: String },

    #[error("No output recorded for node '{node}' in '{expr}'")]
    UnknownNode { expr: String, node: String },

    #[error("Missing key '{key}' in '{expr}'")]
    MissingKey { expr: String, key: String },

    #[error("Cannot read '{key}' of a non-object value in '{expr}'")]
    NotAnObject { expr: String, key: String },

    #[error("Cannot index a non-array value in '{expr}'")]
    NotAnArray { expr: String },

    #[error("Index {index} out of range (len {len}) in '{expr}'")]
    IndexOutOfRange { expr: String, index: usize, len: usize },
}

#[derive(Debug, Clone, PartialEq)]
enum PathStep {
    Key(String),
    Index(usize),
}

/// Resolves `{{ }}` references against the outputs recorded so far
pub struct ExpressionResolver<'a> {
    outputs: &'a OutputStore,
}

impl<'a> ExpressionResolver<'a> {
    pub fn new(outputs: &'a OutputStore) -> Self {
        Self { outputs }
    }

    /// Resolve every string inside a value tree
    pub fn resolve(&self, value: &Value) -> Value {
        match value {
            Value::String(s) => self.resolve_str(s),
            Value::Array(items) => Value::Array(items.iter().map(|v| self.resolve(v)).collect()),
            Value::Object(map) => Value::Object(self.resolve_parameters(map)),
            other => other.clone(),
        }
    }

    /// Resolve a node's parameter map
    pub fn resolve_parameters(&self, params: &Map<String, Value>) -> Map<String, Value> {
        params
            .iter()
            .map(|(key, value)| (key.clone(), self.resolve(value)))
            .collect()
    }

    /// Resolve a single string
    pub fn resolve_str(&self, input: &str) -> Value {
        if let Some(caps) = STANDALONE_REGEX.captures(input.trim()) {
            return self.lookup(caps[1].trim());
        }

        if !EXPRESSION_REGEX.is_match(input) {
            return Value::String(input.to_string());
        }

        let replaced = EXPRESSION_REGEX.replace_all(input, |caps: &Captures| {
            stringify(&self.lookup(caps[1].trim()))
        });
        Value::String(replaced.into_owned())
    }

    /// Evaluate one expression body (without the `{{ }}` wrapper)
    pub fn evaluate(&self, expr: &str) -> Result<Value, ExpressionWarning> {
        let segments: Vec<&str> = expr.split('.').map(str::trim).collect();
        if segments.len() < 2 || segments[0].is_empty() {
            return Err(ExpressionWarning::Malformed(expr.to_string()));
        }

        let node_id = segments[0];
        let output = self
            .outputs
            .get(node_id)
            .ok_or_else(|| ExpressionWarning::UnknownNode {
                expr: expr.to_string(),
                node: node_id.to_string(),
            })?;

        let root = serde_json::json!({
            "nodeName": output.node_name,
            "json": output.json,
        });

        let steps = parse_steps(expr, &segments[1..])?;
        walk(expr, &root, &steps).cloned()
    }

    fn lookup(&self, expr: &str) -> Value {
        match self.evaluate(expr) {
            Ok(value) => value,
            Err(warning) => {
                warn!(expression = %expr, "{}", warning);
                Value::Null
            }
        }
    }
}

fn parse_steps(expr: &str, segments: &[&str]) -> Result<Vec<PathStep>, ExpressionWarning> {
    let mut steps = Vec::new();

    for segment in segments {
        let invalid = || ExpressionWarning::InvalidSegment {
            expr: expr.to_string(),
            segment: segment.to_string(),
        };

        let caps = SEGMENT_REGEX.captures(segment).ok_or_else(invalid)?;
        let key = &caps[1];
        let indexes = &caps[2];

        if key.is_empty() && indexes.is_empty() {
            return Err(invalid());
        }
        if !key.is_empty() {
            steps.push(PathStep::Key(key.to_string()));
        }
        for idx in INDEX_REGEX.captures_iter(indexes) {
            let index = idx[1].parse::<usize>().map_err(|_| invalid())?;
            steps.push(PathStep::Index(index));
        }
    }

    Ok(steps)
}

fn walk<'v>(expr: &str, root: &'v Value, steps: &[PathStep]) -> Result<&'v Value, ExpressionWarning> {
    let mut current = root;

    for step in steps {
        current = match step {
            PathStep::Key(key) => match current {
                Value::Object(map) => map.get(key).ok_or_else(|| ExpressionWarning::MissingKey {
                    expr: expr.to_string(),
                    key: key.clone(),
                })?,
                _ => {
                    return Err(ExpressionWarning::NotAnObject {
                        expr: expr.to_string(),
                        key: key.clone(),
                    })
                }
            },
            PathStep::Index(index) => match current {
                Value::Array(items) => {
                    items
                        .get(*index)
                        .ok_or_else(|| ExpressionWarning::IndexOutOfRange {
                            expr: expr.to_string(),
                            index: *index,
                            len: items.len(),
                        })?
                }
                _ => {
                    return Err(ExpressionWarning::NotAnArray {
                        expr: expr.to_string(),
                    })
                }
            },
        };
    }

    Ok(current)
}

fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
