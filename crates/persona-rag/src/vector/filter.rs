//! Metadata filters for vector search
//!
//! The JSON form mirrors the where-clause shape used by document stores:
//!
//! ```json
//! {"doc_type": "projects", "company": {"$regex": ".*Kakao.*"}}
//! ```

use crate::document::{DocType, DocumentMetadata};
use crate::error::{RagError, RagResult};
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Predicate over a single metadata field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldPredicate {
    /// Field value equals the string exactly
    Equals(String),
    /// Field value matches the regular expression
    Regex(String),
}

/// Metadata filter that always constrains `doc_type`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataFilter {
    doc_type: DocType,
    fields: BTreeMap<String, FieldPredicate>,
}

impl MetadataFilter {
    /// Filter on a partition only
    pub fn new(doc_type: DocType) -> Self {
        Self {
            doc_type,
            fields: BTreeMap::new(),
        }
    }

    /// Add a field predicate (`doc_type` is ignored here, use [`Self::new`])
    pub fn with_field(mut self, name: impl Into<String>, predicate: FieldPredicate) -> Self {
        let name = name.into();
        if name != "doc_type" {
            self.fields.insert(name, predicate);
        }
        self
    }

    /// Partition constrained by this filter
    pub fn doc_type(&self) -> DocType {
        self.doc_type
    }

    /// Field predicates besides `doc_type`
    pub fn fields(&self) -> &BTreeMap<String, FieldPredicate> {
        &self.fields
    }

    /// Drop every field predicate whose name is not in `allowed`
    pub fn retain_fields(&mut self, allowed: &[&str]) {
        self.fields.retain(|name, _| allowed.contains(&name.as_str()));
    }

    /// Parse the JSON form; `doc_type` is required
    pub fn from_json(value: &Value) -> RagResult<Self> {
        let object = value.as_object().ok_or_else(|| {
            RagError::validation("filters", "must be a JSON object", value.to_string())
        })?;

        let doc_type = match object.get("doc_type") {
            Some(Value::String(s)) => s.parse::<DocType>()?,
            Some(Value::Object(op)) => match op.get("$eq").and_then(Value::as_str) {
                Some(s) => s.parse::<DocType>()?,
                None => {
                    return Err(RagError::validation(
                        "filters.doc_type",
                        "must be a string",
                        Value::Object(op.clone()).to_string(),
                    ))
                }
            },
            _ => {
                return Err(RagError::validation(
                    "filters.doc_type",
                    "is required",
                    value.to_string(),
                ))
            }
        };

        let mut filter = Self::new(doc_type);
        for (name, raw) in object.iter().filter(|(name, _)| *name != "doc_type") {
            if let Some(predicate) = parse_predicate(name, raw)? {
                filter.fields.insert(name.clone(), predicate);
            }
        }

        Ok(filter)
    }

    /// Render the JSON form
    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        object.insert(
            "doc_type".to_string(),
            Value::String(self.doc_type.as_str().to_string()),
        );
        for (name, predicate) in &self.fields {
            let value = match predicate {
                FieldPredicate::Equals(s) => Value::String(s.clone()),
                FieldPredicate::Regex(pattern) => serde_json::json!({ "$regex": pattern }),
            };
            object.insert(name.clone(), value);
        }
        Value::Object(object)
    }

    /// Compile regex predicates; an invalid pattern is an index fault
    pub fn compile(&self) -> RagResult<CompiledFilter> {
        let mut fields = Vec::with_capacity(self.fields.len());
        for (name, predicate) in &self.fields {
            let matcher = match predicate {
                FieldPredicate::Equals(s) => Matcher::Equals(s.clone()),
                FieldPredicate::Regex(pattern) => Matcher::Regex(Regex::new(pattern).map_err(
                    |e| RagError::retrieval("compile_filter", format!("{name}: {e}")),
                )?),
            };
            fields.push((name.clone(), matcher));
        }

        Ok(CompiledFilter {
            doc_type: self.doc_type,
            fields,
        })
    }
}

fn parse_predicate(name: &str, raw: &Value) -> RagResult<Option<FieldPredicate>> {
    match raw {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(FieldPredicate::Equals(s.clone()))),
        Value::Number(n) => Ok(Some(FieldPredicate::Equals(n.to_string()))),
        Value::Bool(b) => Ok(Some(FieldPredicate::Equals(b.to_string()))),
        Value::Object(op) => {
            if let Some(pattern) = op.get("$regex").and_then(Value::as_str) {
                Ok(Some(FieldPredicate::Regex(pattern.to_string())))
            } else if let Some(value) = op.get("$eq").and_then(Value::as_str) {
                Ok(Some(FieldPredicate::Equals(value.to_string())))
            } else {
                Err(RagError::validation(
                    format!("filters.{name}"),
                    "supports only $regex and $eq operators",
                    raw.to_string(),
                ))
            }
        }
        Value::Array(_) => Err(RagError::validation(
            format!("filters.{name}"),
            "must not be an array",
            raw.to_string(),
        )),
    }
}

#[derive(Debug)]
enum Matcher {
    Equals(String),
    Regex(Regex),
}

/// A filter ready to be evaluated against metadata
#[derive(Debug)]
pub struct CompiledFilter {
    doc_type: DocType,
    fields: Vec<(String, Matcher)>,
}

impl CompiledFilter {
    /// Whether `metadata` satisfies every predicate
    pub fn matches(&self, metadata: &DocumentMetadata) -> bool {
        if metadata.doc_type != self.doc_type {
            return false;
        }

        self.fields.iter().all(|(name, matcher)| {
            match (metadata.field(name), matcher) {
                (None, _) => false,
                (Some(value), Matcher::Equals(expected)) => value == expected,
                (Some(value), Matcher::Regex(re)) => re.is_match(value),
            }
        })
    }
}
