use super::ResearchContext;
use crate::citations::resolve_citations;
use crate::error::Result;
use crate::prompts::answer_instructions;
use crate::state::{FinalAnswer, ResearchState, StateUpdate};
use crate::utils::research_topic;
use llm::{ChatRequest, Message};
use tracing::info;

/// Separator between research summaries in the answer prompt.
pub(crate) const ANSWER_SEPARATOR: &str = "\n---\n\n";

/// Compose the final answer and swap placeholder urls for real ones.
pub async fn finalize_answer(ctx: &ResearchContext, state: &ResearchState) -> Result<StateUpdate> {
    let model = state
        .reasoning_model
        .clone()
        .unwrap_or_else(|| ctx.config().answer_model.clone());

    let summaries = state.research_texts().collect::<Vec<_>>().join(ANSWER_SEPARATOR);
    let prompt = answer_instructions(&research_topic(&state.messages), &ctx.current_date(), &summaries);
    let request = ChatRequest::from_prompt(prompt)
        .with_model(model)
        .with_temperature(0.0);

    let response = ctx.model().chat(request).await?;
    let resolved = resolve_citations(response.text(), &state.sources);

    info!(
        cited = resolved.sources.len(),
        unresolved = resolved.unresolved.len(),
        "Final answer composed"
    );

    Ok(StateUpdate {
        messages: vec![Message::assistant(resolved.content.clone())],
        final_answer: Some(FinalAnswer {
            content: resolved.content,
            sources: resolved.sources,
            unresolved_citations: resolved.unresolved,
        }),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citations::SHORT_URL_PREFIX;
    use crate::configuration::Configuration;
    use crate::state::{ResearchResult, RunInput, Source};
    use crate::testing::ScriptedModel;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_finalize_resolves_sources() {
        let short = format!("{}0-0", SHORT_URL_PREFIX);
        let model = ScriptedModel::new();
        let ctx = ResearchContext::new(Arc::new(model.clone()), Configuration::default());

        let mut state = ResearchState::from_input(RunInput::question("Euro 2024 top scorer")).unwrap();
        state.research_results.push(ResearchResult {
            task_id: 0,
            query: "q".into(),
            text: format!("Kane scored 3 [uefa]({})", short),
            sources: vec![],
        });
        state.sources.insert(Source::new("uefa", short, "https://uefa.example/stats"));

        let update = finalize_answer(&ctx, &state).await.unwrap();

        let answer = update.final_answer.unwrap();
        assert!(answer.content.contains("[uefa](https://uefa.example/stats)"));
        assert!(!answer.content.contains(SHORT_URL_PREFIX));
        assert_eq!(answer.sources.len(), 1);
        assert!(answer.unresolved_citations.is_empty());
        assert!(update.messages[0].is_assistant());
        assert!(update.messages[0].id.is_some());

        let request = &model.requests()[0];
        assert_eq!(request.model.as_deref(), Some("gemini-2.5-pro"));
        assert_eq!(request.config.temperature, Some(0.0));
    }

    #[tokio::test]
    async fn test_finalize_reports_unknown_markers() {
        let model = ScriptedModel::new().with_answer(format!("Claim [bbc]({}3-3).", SHORT_URL_PREFIX));
        let ctx = ResearchContext::new(Arc::new(model), Configuration::default());
        let state = ResearchState::from_input(RunInput::question("q")).unwrap();

        let answer = finalize_answer(&ctx, &state).await.unwrap().final_answer.unwrap();

        assert_eq!(answer.content, "Claim bbc.");
        assert_eq!(answer.unresolved_citations, vec![format!("{}3-3", SHORT_URL_PREFIX)]);
    }
}
