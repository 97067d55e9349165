//! Question classifier
//!
//! Maps a free-text question to a category, a temporal hint and a metadata
//! filter. The backend is asked for a JSON object; anything that does not
//! match the contract is a [`RagError::Classification`].
//!
//! The category → `doc_type` partition and the per-category field whitelist
//! are fixed here and enforced on the backend's output, so every filter
//! carries the `doc_type` its category maps to.

use crate::document::DocType;
use crate::error::{RagError, RagResult};
use crate::vector::MetadataFilter;
use persona_llm::{ChatMessage, LlmClient, ResponseFormat};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Question category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Projects done at a company
    ProjectExperience,
    /// Technologies used
    TechStack,
    /// Teamwork and communication
    Collaboration,
    /// General self introduction
    SelfIntro,
    /// Things learned and how
    LearningExperience,
    /// Why the candidate applies
    Motivation,
}

impl Category {
    /// Categories offered to the backend in the prompt
    pub const PROMPTED: [Category; 5] = [
        Category::ProjectExperience,
        Category::TechStack,
        Category::Collaboration,
        Category::SelfIntro,
        Category::LearningExperience,
    ];

    /// Every accepted category
    pub const ALL: [Category; 6] = [
        Category::ProjectExperience,
        Category::TechStack,
        Category::Collaboration,
        Category::SelfIntro,
        Category::LearningExperience,
        Category::Motivation,
    ];

    /// Stable identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProjectExperience => "project_experience",
            Self::TechStack => "tech_stack",
            Self::Collaboration => "collaboration",
            Self::SelfIntro => "self_intro",
            Self::LearningExperience => "learning_experience",
            Self::Motivation => "motivation",
        }
    }

    /// Korean label used in prompts and legacy cache entries
    pub fn label(&self) -> &'static str {
        match self {
            Self::ProjectExperience => "프로젝트 경험",
            Self::TechStack => "기술 스택",
            Self::Collaboration => "협업",
            Self::SelfIntro => "자기소개",
            Self::LearningExperience => "학습 경험",
            Self::Motivation => "지원 동기",
        }
    }

    /// Document partition searched for this category
    pub fn doc_type(&self) -> DocType {
        match self {
            Self::ProjectExperience | Self::TechStack => DocType::Projects,
            Self::LearningExperience | Self::Collaboration | Self::Motivation => DocType::Qna,
            Self::SelfIntro => DocType::Summary,
        }
    }

    /// Metadata fields a filter for this category may constrain besides `doc_type`
    pub fn allowed_fields(&self) -> &'static [&'static str] {
        match self {
            Self::ProjectExperience => &[
                "company",
                "role",
                "period",
                "period_from",
                "period_to",
                "tech_stack",
            ],
            Self::TechStack => &["tech_stack"],
            Self::LearningExperience | Self::Collaboration | Self::Motivation => &["topic_tags"],
            Self::SelfIntro => &[],
        }
    }

    /// Parse an identifier or Korean label (spacing-insensitive)
    pub fn parse(raw: &str) -> Option<Self> {
        let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        Self::ALL.into_iter().find(|category| {
            category.as_str() == compact
                || category.label().replace(' ', "") == compact
        })
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Temporal hint for project questions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeCondition {
    /// Most recent project first
    Recent,
    /// Earliest project first
    First,
    /// No temporal ordering
    #[default]
    None,
}

impl TimeCondition {
    /// Wire value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recent => "recent",
            Self::First => "first",
            Self::None => "none",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "recent" => Some(Self::Recent),
            "first" => Some(Self::First),
            "none" => Some(Self::None),
            _ => None,
        }
    }

    /// Detect temporal language in a question
    ///
    /// "최근"/"마지막" → recent, "처음"/"첫번째" → first.
    pub fn detect(question: &str) -> Self {
        let compact: String = question.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.contains("최근") || compact.contains("마지막") {
            Self::Recent
        } else if compact.contains("처음") || compact.contains("첫번째") {
            Self::First
        } else {
            Self::None
        }
    }
}

/// Result of classifying one question
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Assigned category
    pub category: Category,

    /// Temporal hint; only ever set for project experience
    pub time_condition: TimeCondition,

    /// Search filter; always constrains `doc_type`
    pub filter: MetadataFilter,
}

impl Classification {
    /// Classification without field predicates
    pub fn new(category: Category, time_condition: TimeCondition) -> Self {
        Self {
            category,
            time_condition,
            filter: MetadataFilter::new(category.doc_type()),
        }
    }
}

/// LLM-backed question classifier
pub struct Classifier {
    client: Arc<dyn LlmClient>,
}

impl Classifier {
    /// Create a classifier backed by `client`
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    /// Classify `question`
    pub async fn classify(&self, question: &str) -> RagResult<Classification> {
        let response = self
            .client
            .chat_completion(
                vec![ChatMessage::system(classify_prompt(question))],
                ResponseFormat::JsonObject,
            )
            .await
            .map_err(|e| RagError::llm("classify", e))?;

        let classification = parse_classification(question, &response.content)?;

        info!(
            category = %classification.category,
            time_condition = classification.time_condition.as_str(),
            filter = %classification.filter.to_json(),
            "Classified question"
        );

        Ok(classification)
    }
}

/// Validate backend output and enforce the category rules
pub fn parse_classification(question: &str, raw: &str) -> RagResult<Classification> {
    let value: Value = serde_json::from_str(raw.trim())
        .map_err(|e| RagError::classification(format!("output is not valid JSON: {e}")))?;
    let object = value
        .as_object()
        .ok_or_else(|| RagError::classification("output is not a JSON object"))?;

    let raw_category = object
        .get("category")
        .and_then(Value::as_str)
        .ok_or_else(|| RagError::classification("missing string field `category`"))?;
    let category = Category::parse(raw_category)
        .ok_or_else(|| RagError::classification(format!("unknown category `{raw_category}`")))?;

    let raw_time = object
        .get("time_condition")
        .and_then(Value::as_str)
        .ok_or_else(|| RagError::classification("missing string field `time_condition`"))?;
    let reported_time = TimeCondition::parse(raw_time).ok_or_else(|| {
        RagError::classification(format!("unknown time_condition `{raw_time}`"))
    })?;

    let time_condition = match category {
        Category::ProjectExperience => TimeCondition::detect(question),
        _ => TimeCondition::None,
    };
    if reported_time != time_condition {
        debug!(
            reported = reported_time.as_str(),
            applied = time_condition.as_str(),
            "Overriding reported time_condition"
        );
    }

    let filter = build_filter(category, object.get("filters"))?;

    Ok(Classification {
        category,
        time_condition,
        filter,
    })
}

fn build_filter(category: Category, raw: Option<&Value>) -> RagResult<MetadataFilter> {
    let mut fields = match raw {
        None | Some(Value::Null) => serde_json::Map::new(),
        Some(Value::Object(fields)) => fields.clone(),
        Some(other) => {
            return Err(RagError::classification(format!(
                "`filters` must be an object, got {other}"
            )))
        }
    };

    if let Some(reported) = fields.get("doc_type").and_then(Value::as_str) {
        if reported != category.doc_type().as_str() {
            debug!(
                reported,
                applied = category.doc_type().as_str(),
                "Overriding reported doc_type"
            );
        }
    }
    fields.insert(
        "doc_type".to_string(),
        Value::String(category.doc_type().as_str().to_string()),
    );

    let mut filter = MetadataFilter::from_json(&Value::Object(fields))
        .map_err(|e| RagError::classification(format!("invalid filters: {e}")))?;
    filter.retain_fields(category.allowed_fields());

    Ok(filter)
}

fn classify_prompt(question: &str) -> String {
    let categories = Category::PROMPTED
        .iter()
        .map(|c| format!("{} ({})", c.as_str(), c.label()))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"분류할 질문: "{question}"

카테고리 (반드시 이 중 하나의 식별자를 출력): {categories}

이력서 데이터 메타데이터 필드:
- company
- role
- period, period_from, period_to
- tech_stack
- topic_tags (고정값: {{"문제 해결", "프로젝트 경험", "학습 경험", "기술 스택", "지원 동기", "협업"}})

카테고리 → 메타데이터 매핑:
- project_experience → [company, role, period, period_from, period_to, tech_stack]
- tech_stack → [tech_stack]
- learning_experience, collaboration, motivation → [topic_tags]
- self_intro → [summary]

카테고리 → doc_type 매핑:
- project_experience, tech_stack → "projects"
- learning_experience, collaboration, motivation → "qna"
- self_intro → "summary"

추가 규칙:
- 항상 filters에 doc_type 포함 (예: {{"doc_type": "projects"}})
- 질문에 특정 값이 있으면 해당 메타데이터 필드에 regex 조건 추가 가능
- project_experience 질문에 "최근/마지막" → time_condition="recent"
- project_experience 질문에 "처음/첫번째" → time_condition="first"
- 그 외 → time_condition="none"
- self_intro 카테고리의 경우 filters에는 doc_type만 포함

출력 형식(JSON):
{{
    "category": "<카테고리 식별자>",
    "time_condition": "<recent|first|none>",
    "filters": {{
        "doc_type": "<projects|qna|summary>",
        "<필드명>": {{"$regex": ".*<값>.*"}}
    }}
}}"#
    )
}
