//! Resume ingestion
//!
//! Turns the three resume sources into [`Document`]s ready for indexing:
//!
//! - a project list (`{"projects": [...]}`) → one `projects` document per project
//! - a Q&A list (`[{..., "topic_tags": [...]}]`) → one `qna` document per entry
//! - a free-text self introduction → `summary` chunks
//!
//! Project and Q&A documents carry the pretty-printed source object as their
//! content, so the generator sees every field.

use crate::agent::parse_period;
use crate::document::{DocType, Document, DocumentMetadata};
use crate::error::{RagError, RagResult};
use chrono::{NaiveDate, Utc};
use serde_json::Value;
use std::path::{Path, PathBuf};
use text_splitter::{ChunkConfig, TextSplitter};
use tracing::{debug, info, warn};

/// Local resume source files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResumeSources {
    /// Project list JSON
    pub projects: Option<PathBuf>,

    /// Q&A list JSON
    pub qna: Option<PathBuf>,

    /// Self introduction text
    pub introduction: Option<PathBuf>,
}

impl ResumeSources {
    /// No sources
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the project list file
    pub fn with_projects(mut self, path: impl Into<PathBuf>) -> Self {
        self.projects = Some(path.into());
        self
    }

    /// Set the Q&A file
    pub fn with_qna(mut self, path: impl Into<PathBuf>) -> Self {
        self.qna = Some(path.into());
        self
    }

    /// Set the self introduction file
    pub fn with_introduction(mut self, path: impl Into<PathBuf>) -> Self {
        self.introduction = Some(path.into());
        self
    }
}

/// Read every configured source and build documents
///
/// An unreadable file is logged and skipped; a file that reads but does not
/// parse is an [`RagError::Ingestion`].
pub async fn load_documents(sources: &ResumeSources) -> RagResult<Vec<Document>> {
    let mut documents = Vec::new();

    if let Some(path) = &sources.projects {
        if let Some(text) = read_source(path).await {
            documents.extend(project_documents(&parse_json(path, &text)?)?);
        }
    }
    if let Some(path) = &sources.qna {
        if let Some(text) = read_source(path).await {
            documents.extend(qna_documents(&parse_json(path, &text)?)?);
        }
    }
    if let Some(path) = &sources.introduction {
        if let Some(text) = read_source(path).await {
            documents.extend(text_documents(&text)?);
        }
    }

    info!(documents = documents.len(), "Loaded resume documents");
    Ok(documents)
}

async fn read_source(path: &Path) -> Option<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Some(text),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Skipping unreadable source");
            None
        }
    }
}

fn parse_json(path: &Path, text: &str) -> RagResult<Value> {
    serde_json::from_str(text)
        .map_err(|e| RagError::ingestion(path.display().to_string(), e.to_string()))
}

/// One `projects` document per entry of `data["projects"]`
///
/// A missing `projects` key yields no documents.
pub fn project_documents(data: &Value) -> RagResult<Vec<Document>> {
    let projects = match data.get("projects") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(projects)) => projects,
        Some(_) => {
            return Err(RagError::ingestion(
                "projects",
                "`projects` must be an array",
            ))
        }
    };

    let today = Utc::now().date_naive();
    projects
        .iter()
        .map(|project| project_document(project, today))
        .collect()
}

fn project_document(project: &Value, today: NaiveDate) -> RagResult<Document> {
    let content = serde_json::to_string_pretty(project)
        .map_err(|e| RagError::ingestion("projects", e.to_string()))?;

    let mut metadata = DocumentMetadata::new(DocType::Projects);
    metadata.company = project.get("company").and_then(Value::as_str).map(str::to_string);
    metadata.role = project.get("role").and_then(join_strings);
    metadata.tech_stack = project
        .get("tech_stack")
        .and_then(Value::as_array)
        .map(|stack| {
            stack
                .iter()
                .filter_map(|t| t.get("name").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join(", ")
        });

    match project.get("period") {
        Some(Value::Object(period)) => {
            let from = period.get("from").and_then(Value::as_str);
            let to = period.get("to").and_then(Value::as_str);
            metadata.period = Some(format!("{}~{}", from.unwrap_or(""), to.unwrap_or("")));
            metadata.period_from = from.and_then(|raw| period_boundary(raw, today));
            metadata.period_to = to.and_then(|raw| period_boundary(raw, today));
        }
        Some(Value::String(period)) => metadata.period = Some(period.clone()),
        _ => {}
    }

    debug!(
        company = metadata.company.as_deref().unwrap_or(""),
        period_from = metadata.period_from.as_deref().unwrap_or(""),
        "Project document"
    );

    Ok(Document::new(content, metadata))
}

/// One `qna` document per array entry
pub fn qna_documents(data: &Value) -> RagResult<Vec<Document>> {
    let entries = data
        .as_array()
        .ok_or_else(|| RagError::ingestion("qna", "Q&A source must be an array"))?;

    entries
        .iter()
        .map(|entry| {
            let content = serde_json::to_string_pretty(entry)
                .map_err(|e| RagError::ingestion("qna", e.to_string()))?;
            let mut metadata = DocumentMetadata::new(DocType::Qna);
            metadata.topic_tags = entry.get("topic_tags").and_then(join_strings);
            Ok(Document::new(content, metadata))
        })
        .collect()
}

/// Characters per free-text chunk
pub const CHUNK_SIZE: usize = 1000;

/// Characters shared between neighbouring free-text chunks
pub const CHUNK_OVERLAP: usize = 200;

/// `summary` chunks of a free-text source
pub fn text_documents(text: &str) -> RagResult<Vec<Document>> {
    Ok(split_text(text, CHUNK_SIZE, CHUNK_OVERLAP)?
        .into_iter()
        .map(|chunk| Document::new(chunk, DocumentMetadata::new(DocType::Summary)))
        .collect())
}

/// Split `text` into trimmed chunks of at most `chunk_size` characters
///
/// Paragraph and sentence boundaries are preferred over mid-word cuts.
/// Neighbouring chunks share up to `chunk_overlap` characters.
pub fn split_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> RagResult<Vec<String>> {
    let config = ChunkConfig::new(chunk_size)
        .with_overlap(chunk_overlap)
        .map_err(|e| {
            RagError::validation("chunk_overlap", e.to_string(), chunk_overlap.to_string())
        })?;

    let chunks: Vec<String> = TextSplitter::new(config)
        .chunks(text)
        .filter(|chunk| !chunk.trim().is_empty())
        .map(str::to_string)
        .collect();

    debug!(chunks = chunks.len(), chunk_size, chunk_overlap, "Split free text");
    Ok(chunks)
}

/// A string, or a list of strings joined with `", "`
fn join_strings(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        _ => None,
    }
}

/// Normalize a period boundary to `YYYY-MM-DD`
///
/// `ING`, `CURRENT` and `PRESENT` (any case) mean `today`.
pub fn period_boundary(raw: &str, today: NaiveDate) -> Option<String> {
    let trimmed = raw.trim();
    let date = if ["ING", "CURRENT", "PRESENT"]
        .iter()
        .any(|open| trimmed.eq_ignore_ascii_case(open))
    {
        Some(today)
    } else {
        parse_period(trimmed)
    };
    date.map(|d| d.format("%Y-%m-%d").to_string())
}
