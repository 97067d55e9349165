//! Style refiner for drafted answers

use crate::error::{RagError, RagResult};
use persona_llm::{ChatMessage, LlmClient, ResponseFormat};
use std::sync::Arc;

/// Rewrites a draft into a terser, confident spoken register
///
/// Purely stylistic: no retrieval, no new facts.
pub struct Refiner {
    client: Arc<dyn LlmClient>,
}

impl Refiner {
    /// Create a refiner backed by `client`
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    /// Polish `draft`
    pub async fn refine(&self, draft: &str) -> RagResult<String> {
        let response = self
            .client
            .chat_completion(
                vec![ChatMessage::system(refine_prompt(draft))],
                ResponseFormat::Text,
            )
            .await
            .map_err(|e| RagError::llm("refine", e))?;

        Ok(response.content.trim().to_string())
    }
}

fn refine_prompt(draft: &str) -> String {
    format!(
        "아래는 면접 답변 초안입니다:\n\
         {draft}\n\n\
         이 답변을 다음 기준으로 다듬어주세요:\n\
         - 반드시 한국어로 대답한다.\n\
         - 실제 면접 대화처럼 자연스럽고 자신감 있는 어투로 바꾼다.\n\
         - 답변이 너무 길면 핵심만 담아 5문장 이내로 줄인다.\n\
         - 성과와 핵심 경험을 명확히 강조한다.\n\
         - 초안에 없는 사실은 추가하지 않는다.\n\
         - 글을 읽는 듯한 어투 대신, 구어체 면접 답변처럼 자연스럽게 표현한다."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedLlm;

    #[tokio::test]
    async fn test_refine_embeds_draft_in_prompt() {
        let llm = Arc::new(ScriptedLlm::new().with_reply("다듬은 답변입니다."));
        let refiner = Refiner::new(llm.clone());

        let refined = refiner.refine("초안 답변").await.unwrap();
        assert_eq!(refined, "다듬은 답변입니다.");

        let requests = llm.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0][0].content.contains("초안 답변"));
        assert!(requests[0][0].content.contains("5문장 이내"));
    }
}
