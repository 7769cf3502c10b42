use super::ResearchContext;
use crate::error::{AgentError, Result};
use crate::prompts::query_writer_instructions;
use crate::schemas::{invoke_structured, SearchQueryList, StructuredOutput};
use crate::state::{ResearchState, StateUpdate};
use crate::utils::research_topic;
use llm::ChatRequest;
use std::collections::HashSet;
use tracing::{debug, info};

/// Generate the first wave of search queries from the conversation.
///
/// The reply is deduplicated ignoring case and whitespace, then truncated to
/// the configured count. Fewer distinct queries than requested is a schema
/// error.
pub async fn generate_query(ctx: &ResearchContext, state: &ResearchState) -> Result<StateUpdate> {
    let count = state.initial_query_count(ctx.config());
    let topic = research_topic(&state.messages);
    let prompt = query_writer_instructions(&topic, &ctx.current_date(), count);

    let request = ChatRequest::from_prompt(prompt)
        .with_model(&ctx.config().query_generator_model)
        .with_temperature(1.0);

    let reply: SearchQueryList = invoke_structured(ctx.model(), request).await?;
    debug!(rationale = %reply.rationale, proposed = reply.query.len(), "Model proposed queries");

    let queries = distinct_queries(reply.query, count);
    if queries.len() < count {
        return Err(AgentError::schema(
            SearchQueryList::NAME,
            format!("expected {} distinct queries, got {}", count, queries.len()),
        ));
    }

    info!(count = queries.len(), queries = ?queries, "Generated search queries");

    Ok(StateUpdate {
        pending_queries: Some(queries),
        ..Default::default()
    })
}

fn distinct_queries(proposed: Vec<String>, limit: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    proposed
        .into_iter()
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .filter(|q| {
            let key = q.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
            seen.insert(key)
        })
        .take(limit)
        .collect()
}
