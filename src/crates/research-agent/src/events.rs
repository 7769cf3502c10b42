//! Step-completion events.
//!
//! Each completed step produces one payload object keyed by the node name,
//! e.g. `{"web_research": {"sources_gathered": [...], ...}}`. Consumers parse
//! payloads back into [`StepEvent`]; a payload with none of the known keys, or
//! whose body has an unexpected shape, becomes [`StepEvent::Unrecognized`]
//! rather than an error.

use crate::graph::{NodeId, FINALIZE_ANSWER, GENERATE_QUERY, REFLECTION, WEB_RESEARCH};
use crate::schemas::Reflection;
use crate::state::{ResearchState, Source, StateUpdate};
use llm::Message;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateQueryEvent {
    #[serde(default)]
    pub search_query: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebResearchEvent {
    #[serde(default)]
    pub sources_gathered: Vec<Source>,
    #[serde(default)]
    pub search_query: Vec<String>,
    #[serde(default)]
    pub web_research_result: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReflectionEvent {
    #[serde(default)]
    pub is_sufficient: bool,
    #[serde(default)]
    pub knowledge_gap: String,
    #[serde(default)]
    pub follow_up_queries: Vec<String>,
    #[serde(default)]
    pub research_loop_count: usize,
    #[serde(default)]
    pub number_of_ran_queries: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinalizeAnswerEvent {
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub sources_gathered: Vec<Source>,
    #[serde(default)]
    pub unresolved_citations: Vec<String>,
}

/// A step-completion event.
#[derive(Debug, Clone, PartialEq)]
pub enum StepEvent {
    GenerateQuery(GenerateQueryEvent),
    WebResearch(WebResearchEvent),
    Reflection(ReflectionEvent),
    FinalizeAnswer(FinalizeAnswerEvent),
    /// Payload from an unknown or newer producer, kept as received
    Unrecognized(Value),
}

impl StepEvent {
    /// Build the event for a step's update.
    ///
    /// `state` is the state the step ran against, before the update is merged.
    pub fn from_update(node: &str, update: &StateUpdate, state: &ResearchState) -> Self {
        match node {
            GENERATE_QUERY => StepEvent::GenerateQuery(GenerateQueryEvent {
                search_query: update.pending_queries.clone().unwrap_or_default(),
            }),
            WEB_RESEARCH => StepEvent::WebResearch(WebResearchEvent {
                sources_gathered: update.sources.clone(),
                search_query: update.executed_queries.clone(),
                web_research_result: update.research_results.iter().map(|r| r.text.clone()).collect(),
            }),
            REFLECTION => {
                let verdict = update.last_reflection.clone().unwrap_or_else(|| Reflection {
                    is_sufficient: true,
                    knowledge_gap: String::new(),
                    follow_up_queries: Vec::new(),
                });
                StepEvent::Reflection(ReflectionEvent {
                    is_sufficient: verdict.is_sufficient,
                    knowledge_gap: verdict.knowledge_gap,
                    follow_up_queries: verdict.follow_up_queries,
                    research_loop_count: update.loop_count.unwrap_or(state.loop_count),
                    number_of_ran_queries: state.executed_queries.len(),
                })
            }
            FINALIZE_ANSWER => {
                let (sources_gathered, unresolved_citations) = update
                    .final_answer
                    .as_ref()
                    .map(|a| (a.sources.clone(), a.unresolved_citations.clone()))
                    .unwrap_or_default();
                StepEvent::FinalizeAnswer(FinalizeAnswerEvent {
                    messages: update.messages.clone(),
                    sources_gathered,
                    unresolved_citations,
                })
            }
            other => {
                let mut payload = Map::new();
                payload.insert(other.to_string(), Value::Null);
                StepEvent::Unrecognized(Value::Object(payload))
            }
        }
    }

    /// Parse a payload by key presence, in workflow order.
    pub fn from_payload(payload: &Value) -> Self {
        let Some(obj) = payload.as_object() else {
            return StepEvent::Unrecognized(payload.clone());
        };

        if let Some(body) = obj.get(GENERATE_QUERY) {
            return parse_body(payload, GENERATE_QUERY, body).map_or_else(StepEvent::Unrecognized, StepEvent::GenerateQuery);
        }
        if let Some(body) = obj.get(WEB_RESEARCH) {
            return parse_body(payload, WEB_RESEARCH, body).map_or_else(StepEvent::Unrecognized, StepEvent::WebResearch);
        }
        if let Some(body) = obj.get(REFLECTION) {
            return parse_body(payload, REFLECTION, body).map_or_else(StepEvent::Unrecognized, StepEvent::Reflection);
        }
        if let Some(body) = obj.get(FINALIZE_ANSWER) {
            return parse_body(payload, FINALIZE_ANSWER, body).map_or_else(StepEvent::Unrecognized, StepEvent::FinalizeAnswer);
        }
        StepEvent::Unrecognized(payload.clone())
    }

    /// Node that produced the event.
    pub fn node(&self) -> Option<NodeId> {
        match self {
            StepEvent::GenerateQuery(_) => Some(GENERATE_QUERY),
            StepEvent::WebResearch(_) => Some(WEB_RESEARCH),
            StepEvent::Reflection(_) => Some(REFLECTION),
            StepEvent::FinalizeAnswer(_) => Some(FINALIZE_ANSWER),
            StepEvent::Unrecognized(_) => None,
        }
    }

    /// Wire payload: `{ "<node>": <body> }`.
    pub fn to_payload(&self) -> Value {
        let (node, body) = match self {
            StepEvent::GenerateQuery(e) => (GENERATE_QUERY, serde_json::to_value(e)),
            StepEvent::WebResearch(e) => (WEB_RESEARCH, serde_json::to_value(e)),
            StepEvent::Reflection(e) => (REFLECTION, serde_json::to_value(e)),
            StepEvent::FinalizeAnswer(e) => (FINALIZE_ANSWER, serde_json::to_value(e)),
            StepEvent::Unrecognized(raw) => return raw.clone(),
        };
        let mut payload = Map::new();
        payload.insert(node.to_string(), body.unwrap_or(Value::Null));
        Value::Object(payload)
    }
}

fn parse_body<T: DeserializeOwned>(payload: &Value, node: &str, body: &Value) -> Result<T, Value> {
    serde_json::from_value(body.clone()).map_err(|e| {
        debug!(node = %node, error = %e, "Event body has unexpected shape");
        payload.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_by_key_presence() {
        let event = StepEvent::from_payload(&json!({"generate_query": {"search_query": ["a", "b"]}}));
        assert_eq!(
            event,
            StepEvent::GenerateQuery(GenerateQueryEvent {
                search_query: vec!["a".into(), "b".into()]
            })
        );

        let event = StepEvent::from_payload(&json!({
            "web_research": {
                "sources_gathered": [{"label": "uefa", "short_url": "s", "value": "https://uefa.example"}],
                "search_query": ["q"],
                "web_research_result": ["text"]
            }
        }));
        let StepEvent::WebResearch(body) = event else {
            panic!("expected web research");
        };
        assert_eq!(body.sources_gathered[0].url, "https://uefa.example");
    }

    #[test]
    fn test_unknown_and_malformed_payloads() {
        let unknown = json!({"__metadata__": {"run_id": "r1"}});
        assert_eq!(StepEvent::from_payload(&unknown), StepEvent::Unrecognized(unknown.clone()));

        let malformed = json!({"reflection": {"is_sufficient": "maybe"}});
        assert!(matches!(StepEvent::from_payload(&malformed), StepEvent::Unrecognized(_)));

        assert!(matches!(StepEvent::from_payload(&json!("text")), StepEvent::Unrecognized(_)));
    }

    #[test]
    fn test_workflow_order_wins() {
        let payload = json!({"finalize_answer": {}, "generate_query": {"search_query": ["a"]}});
        assert_eq!(StepEvent::from_payload(&payload).node(), Some(GENERATE_QUERY));
    }

    #[test]
    fn test_reflection_event_from_update() {
        let state = ResearchState {
            executed_queries: vec!["a".into(), "b".into(), "c".into()],
            ..Default::default()
        };
        let update = StateUpdate {
            loop_count: Some(1),
            last_reflection: Some(Reflection {
                is_sufficient: false,
                knowledge_gap: "assists".into(),
                follow_up_queries: vec!["kane assists".into()],
            }),
            ..Default::default()
        };

        let event = StepEvent::from_update(REFLECTION, &update, &state);
        let payload = event.to_payload();

        assert_eq!(payload["reflection"]["research_loop_count"], 1);
        assert_eq!(payload["reflection"]["number_of_ran_queries"], 3);
        assert_eq!(StepEvent::from_payload(&payload), event);
    }
}
