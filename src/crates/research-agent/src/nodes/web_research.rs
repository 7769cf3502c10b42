use super::ResearchContext;
use crate::citations::{extract_citations, insert_citation_markers, resolve_urls};
use crate::error::Result;
use crate::prompts::web_searcher_instructions;
use crate::state::{ResearchResult, Source, StateUpdate};
use llm::{ChatRequest, Tool};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// One query dispatched to the web researcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSearchTask {
    pub query: String,
    /// Unique across all waves of a run
    pub id: usize,
}

impl WebSearchTask {
    pub fn new(query: impl Into<String>, id: usize) -> Self {
        Self {
            query: query.into(),
            id,
        }
    }
}

/// Run one grounded search and return its cited summary.
pub async fn web_research(ctx: &ResearchContext, task: WebSearchTask) -> Result<StateUpdate> {
    let prompt = web_searcher_instructions(&task.query, &ctx.current_date());
    let request = ChatRequest::from_prompt(prompt)
        .with_model(&ctx.config().query_generator_model)
        .with_temperature(0.0)
        .with_tool(Tool::GoogleSearch);

    let response = ctx.model().chat(request).await?;
    let grounding = response.grounding.clone().unwrap_or_default();

    let resolved = resolve_urls(&grounding.grounding_chunks, task.id);
    let citations = extract_citations(&grounding, &resolved);
    let text = insert_citation_markers(response.text(), &citations);

    let mut sources: Vec<Source> = Vec::new();
    for source in citations.into_iter().flat_map(|c| c.sources) {
        if !sources.iter().any(|s| s.url == source.url) {
            sources.push(source);
        }
    }

    debug!(
        task_id = task.id,
        chunks = grounding.grounding_chunks.len(),
        supports = grounding.grounding_supports.len(),
        "Resolved grounding"
    );
    info!(task_id = task.id, query = %task.query, sources = sources.len(), "Web research complete");

    Ok(StateUpdate {
        executed_queries: vec![task.query.clone()],
        research_results: vec![ResearchResult {
            task_id: task.id,
            query: task.query,
            text,
            sources: sources.clone(),
        }],
        sources,
        ..Default::default()
    })
}
