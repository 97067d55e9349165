//! Indexed knowledge units

use crate::error::RagError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Partition tag carried by every document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocType {
    /// One entry of the structured project list
    Projects,
    /// One entry of the structured Q&A list
    Qna,
    /// A chunk of the free-text self introduction
    Summary,
}

impl DocType {
    /// Metadata value of this partition
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Projects => "projects",
            Self::Qna => "qna",
            Self::Summary => "summary",
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocType {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "projects" => Ok(Self::Projects),
            "qna" => Ok(Self::Qna),
            "summary" => Ok(Self::Summary),
            other => Err(RagError::validation(
                "doc_type",
                "must be one of projects, qna, summary",
                other,
            )),
        }
    }
}

/// Searchable metadata attached to a document
///
/// Dates are kept as the strings written at ingestion time; consumers parse
/// them leniently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Partition
    pub doc_type: DocType,

    /// Employer the project was done for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,

    /// Roles held, comma separated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Human readable period, e.g. `2023.03~ING`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,

    /// Start of the period (ISO date)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_from: Option<String>,

    /// End of the period (ISO date)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_to: Option<String>,

    /// Technologies used, comma separated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tech_stack: Option<String>,

    /// Q&A topic tags, comma separated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_tags: Option<String>,
}

impl DocumentMetadata {
    /// Metadata with only a partition tag
    pub fn new(doc_type: DocType) -> Self {
        Self {
            doc_type,
            company: None,
            role: None,
            period: None,
            period_from: None,
            period_to: None,
            tech_stack: None,
            topic_tags: None,
        }
    }

    /// Look up a field by its metadata name
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "doc_type" => Some(self.doc_type.as_str()),
            "company" => self.company.as_deref(),
            "role" => self.role.as_deref(),
            "period" => self.period.as_deref(),
            "period_from" => self.period_from.as_deref(),
            "period_to" => self.period_to.as_deref(),
            "tech_stack" => self.tech_stack.as_deref(),
            "topic_tags" => self.topic_tags.as_deref(),
            _ => None,
        }
    }

    /// Set the company
    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }

    /// Set the role
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Set the period start
    pub fn with_period_from(mut self, period_from: impl Into<String>) -> Self {
        self.period_from = Some(period_from.into());
        self
    }

    /// Set the tech stack
    pub fn with_tech_stack(mut self, tech_stack: impl Into<String>) -> Self {
        self.tech_stack = Some(tech_stack.into());
        self
    }

    /// Set the topic tags
    pub fn with_topic_tags(mut self, topic_tags: impl Into<String>) -> Self {
        self.topic_tags = Some(topic_tags.into());
        self
    }
}

/// An indexed chunk of source knowledge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier
    pub id: String,

    /// Text handed to the generator as context
    pub content: String,

    /// Filterable metadata
    pub metadata: DocumentMetadata,
}

impl Document {
    /// Create a document with a fresh id
    pub fn new(content: impl Into<String>, metadata: DocumentMetadata) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content: content.into(),
            metadata,
        }
    }

    /// Partition of this document
    pub fn doc_type(&self) -> DocType {
        self.metadata.doc_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_type_round_trips_through_str() {
        for doc_type in [DocType::Projects, DocType::Qna, DocType::Summary] {
            assert_eq!(doc_type.as_str().parse::<DocType>().unwrap(), doc_type);
        }
        assert!("resume".parse::<DocType>().is_err());
    }

    #[test]
    fn test_metadata_field_lookup() {
        let meta = DocumentMetadata::new(DocType::Projects)
            .with_company("Kakao")
            .with_tech_stack("Rust, Kafka");

        assert_eq!(meta.field("doc_type"), Some("projects"));
        assert_eq!(meta.field("company"), Some("Kakao"));
        assert_eq!(meta.field("role"), None);
        assert_eq!(meta.field("unknown"), None);
    }
}
