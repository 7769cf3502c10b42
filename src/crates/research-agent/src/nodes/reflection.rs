use super::ResearchContext;
use crate::error::Result;
use crate::prompts::reflection_instructions;
use crate::schemas::{invoke_structured, Reflection};
use crate::state::{ResearchState, StateUpdate};
use crate::utils::research_topic;
use llm::ChatRequest;
use tracing::info;

/// Separator between research summaries in the reflection prompt.
pub(crate) const REFLECTION_SEPARATOR: &str = "\n\n---\n\n";

/// Judge whether the research so far answers the topic.
///
/// Always counts one research cycle, whatever the verdict. The follow-up
/// queries become the next wave's pending queries; routing decides whether
/// that wave runs.
pub async fn reflection(ctx: &ResearchContext, state: &ResearchState) -> Result<StateUpdate> {
    let loop_count = state.loop_count + 1;
    let model = state
        .reasoning_model
        .clone()
        .unwrap_or_else(|| ctx.config().reflection_model.clone());

    let summaries = state.research_texts().collect::<Vec<_>>().join(REFLECTION_SEPARATOR);
    let prompt = reflection_instructions(&research_topic(&state.messages), &summaries);
    let request = ChatRequest::from_prompt(prompt)
        .with_model(model)
        .with_temperature(1.0);

    let verdict: Reflection = invoke_structured(ctx.model(), request).await?;

    info!(
        loop_count,
        is_sufficient = verdict.is_sufficient,
        follow_ups = verdict.follow_up_queries.len(),
        "Reflection complete"
    );

    Ok(StateUpdate {
        pending_queries: Some(verdict.follow_up_queries.clone()),
        loop_count: Some(loop_count),
        last_reflection: Some(verdict),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::Configuration;
    use crate::state::{ResearchResult, RunInput};
    use crate::testing::ScriptedModel;
    use std::sync::Arc;

    fn researched_state() -> ResearchState {
        let mut state = ResearchState::from_input(RunInput::question("Euro 2024 top scorer")).unwrap();
        for (id, text) in ["first finding", "second finding"].iter().enumerate() {
            state.research_results.push(ResearchResult {
                task_id: id,
                query: format!("q{}", id),
                text: text.to_string(),
                sources: vec![],
            });
        }
        state
    }

    #[tokio::test]
    async fn test_reflection_increments_loop_count() {
        let model = ScriptedModel::new().always_insufficient(vec!["kane assists"]);
        let ctx = ResearchContext::new(Arc::new(model.clone()), Configuration::default());

        let update = reflection(&ctx, &researched_state()).await.unwrap();

        assert_eq!(update.loop_count, Some(1));
        assert_eq!(update.pending_queries, Some(vec!["kane assists".to_string()]));
        assert!(!update.last_reflection.unwrap().is_sufficient);

        let request = &model.requests()[0];
        assert_eq!(request.model.as_deref(), Some("gemini-2.5-flash"));
        assert!(request.messages[0].content.contains("first finding\n\n---\n\nsecond finding"));
    }

    #[tokio::test]
    async fn test_reasoning_model_overrides_reflection_model() {
        let model = ScriptedModel::new();
        let ctx = ResearchContext::new(Arc::new(model.clone()), Configuration::default());
        let mut state = researched_state();
        state.reasoning_model = Some("gemini-2.5-pro".to_string());

        reflection(&ctx, &state).await.unwrap();

        assert_eq!(model.requests()[0].model.as_deref(), Some("gemini-2.5-pro"));
    }
}
