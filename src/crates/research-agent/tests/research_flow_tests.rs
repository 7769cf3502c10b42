//! End-to-end research runs against the scripted model.

use futures::StreamExt;
use llm::LlmError;
use research_agent::graph::{FINALIZE_ANSWER, GENERATE_QUERY, REFLECTION, WEB_RESEARCH};
use research_agent::nodes::ResearchContext;
use research_agent::testing::{CallKind, ScriptedModel};
use research_agent::{
    ChatSession, Configuration, Effort, GraphError, ResearchGraph, RunInput, StepEvent, StreamChunk,
};
use std::sync::Arc;

fn graph(model: &ScriptedModel) -> ResearchGraph {
    let ctx = ResearchContext::new(Arc::new(model.clone()), Configuration::default()).with_date("July 15, 2024");
    ResearchGraph::from_context(ctx)
}

#[tokio::test]
async fn test_low_effort_single_wave_with_citations() {
    let model = ScriptedModel::new();
    let state = graph(&model)
        .invoke(RunInput::question("Who was the top scorer of Euro 2024?").with_effort(Effort::Low))
        .await
        .unwrap();

    assert_eq!(model.requests_of(CallKind::Queries).len(), 1);
    assert_eq!(model.research_calls(), 1);
    assert_eq!(model.reflection_calls(), 1);
    assert_eq!(state.executed_queries, vec!["primary topic query".to_string()]);
    assert_eq!(state.loop_count, 1);

    let answer = state.final_answer.expect("final answer");
    assert!(!answer.sources.is_empty());
    assert!(answer.unresolved_citations.is_empty());
    assert!(answer.content.contains("[source0](https://source0.example.com/report)"));
    assert!(!answer.content.contains("vertexaisearch"));

    let last = state.messages.last().unwrap();
    assert!(last.is_assistant());
    assert_eq!(last.content, answer.content);
}

#[tokio::test]
async fn test_high_effort_stops_at_loop_ceiling() {
    let model = ScriptedModel::new().always_insufficient(vec!["follow up"]);
    let chunks: Vec<StreamChunk> = graph(&model)
        .stream(RunInput::question("q").with_effort(Effort::High))
        .map(|c| c.unwrap())
        .collect()
        .await;

    // 5 initial searches, then one follow-up wave after each of the first 9 reflections.
    assert_eq!(model.reflection_calls(), 10);
    assert_eq!(model.research_calls(), 14);

    let state = chunks.last().cloned().and_then(StreamChunk::into_state).unwrap();
    assert_eq!(state.loop_count, 10);
    assert_eq!(state.research_results.len(), 14);
    assert!(state.final_answer.is_some());

    let reflections = chunks
        .iter()
        .filter(|c| matches!(c.as_event(), Some(StepEvent::Reflection(_))))
        .count();
    assert_eq!(reflections, 10);
}

#[tokio::test]
async fn test_event_order_and_wave_task_order() {
    let model = ScriptedModel::new();
    let mut input = RunInput::question("q");
    input.initial_search_query_count = Some(3);

    let events: Vec<StepEvent> = graph(&model)
        .stream(input)
        .filter_map(|c| async move { c.ok()?.as_event().cloned() })
        .collect()
        .await;

    let nodes: Vec<_> = events.iter().filter_map(StepEvent::node).collect();
    assert_eq!(
        nodes,
        vec![GENERATE_QUERY, WEB_RESEARCH, WEB_RESEARCH, WEB_RESEARCH, REFLECTION, FINALIZE_ANSWER]
    );

    let queries: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            StepEvent::WebResearch(w) => w.search_query.first().cloned(),
            _ => None,
        })
        .collect();
    assert_eq!(queries, vec!["primary topic query", "recent news on topic", "topic statistics"]);
}

#[tokio::test]
async fn test_reasoning_model_override_reaches_reflection_and_answer() {
    let model = ScriptedModel::new();
    graph(&model)
        .invoke(RunInput::question("q").with_effort(Effort::Low).with_reasoning_model("custom-model"))
        .await
        .unwrap();

    let reflection = &model.requests_of(CallKind::Reflection)[0];
    let answer = &model.requests_of(CallKind::Answer)[0];
    let queries = &model.requests_of(CallKind::Queries)[0];
    assert_eq!(reflection.model.as_deref(), Some("custom-model"));
    assert_eq!(answer.model.as_deref(), Some("custom-model"));
    assert_eq!(queries.model.as_deref(), Some("gemini-2.0-flash"));
}

#[tokio::test]
async fn test_malformed_query_output_fails_run() {
    let model = ScriptedModel::new().on_queries(|_| Ok("not json".to_string()));
    let err = graph(&model)
        .invoke(RunInput::question("q").with_effort(Effort::Low))
        .await
        .unwrap_err();

    assert!(matches!(err, GraphError::NodeExecution { ref node, .. } if node == GENERATE_QUERY));
    assert_eq!(model.research_calls(), 0);
}

#[tokio::test]
async fn test_answer_failure_keeps_no_final_answer() {
    let model = ScriptedModel::new()
        .on_answer(|_| Err(LlmError::RateLimitExceeded("quota".to_string())));
    let chunks: Vec<_> = graph(&model)
        .stream(RunInput::question("q").with_effort(Effort::Low))
        .collect()
        .await;

    assert!(chunks.iter().all(|c| !matches!(c, Ok(StreamChunk::Values(_)))));
    assert!(matches!(
        chunks.last(),
        Some(Err(GraphError::NodeExecution { node, .. })) if node == FINALIZE_ANSWER
    ));
}

#[tokio::test]
async fn test_chat_session_over_live_stream() {
    let model = ScriptedModel::new();
    let graph = graph(&model);
    let mut session = ChatSession::new();

    let input = session.submit("Who was the top scorer of Euro 2024?", Effort::Low, None);
    let mut stream = graph.stream(input);
    let mut final_messages = Vec::new();
    while let Some(chunk) = stream.next().await {
        match chunk.unwrap() {
            StreamChunk::Updates(event) => {
                session.on_event(&event.to_payload());
            }
            StreamChunk::Values(state) => final_messages = state.messages,
        }
    }
    session.on_finish(final_messages);

    let id = session.settle().expect("settled");
    let titles: Vec<_> = session
        .timeline_for(&id)
        .unwrap()
        .iter()
        .map(|e| e.title.as_str())
        .collect();
    assert_eq!(
        titles,
        vec!["Generating Search Queries", "Web Research", "Reflection", "Finalizing Answer"]
    );
    assert_eq!(session.settle(), None);
    assert_eq!(session.history_len(), 1);
}
