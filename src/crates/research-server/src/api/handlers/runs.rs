//! Research run endpoints
//!
//! `POST /runs/wait` blocks until the run finishes. `POST /runs/stream`
//! answers with Server-Sent Events:
//!
//! - `updates`: one per completed step, `{ "<node>": { .. } }`
//! - `values`: the final [`RunOutput`], once
//! - `error`: an [`ApiErrorResponse`](crate::api::ApiErrorResponse), then the stream ends

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::{Stream, StreamExt};
use research_agent::StreamChunk;
use tracing::{debug, info};

use crate::api::error::{ApiError, ApiResult};
use crate::api::models::{RunOutput, RunRequest};
use crate::api::routes::AppState;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Handler for POST /runs/wait
pub async fn runs_wait(State(state): State<AppState>, Json(request): Json<RunRequest>) -> ApiResult<Json<RunOutput>> {
    let input = request.into_input();
    input.validate()?;

    info!(messages = input.messages.len(), "Running research to completion");
    let final_state = state.graph.invoke(input).await?;
    Ok(Json(RunOutput::from(final_state)))
}

/// Handler for POST /runs/stream
pub async fn runs_stream(
    State(state): State<AppState>,
    Json(request): Json<RunRequest>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let input = request.into_input();
    input.validate()?;

    info!(messages = input.messages.len(), "Streaming research run");
    let mut chunks = state.graph.stream(input);

    let stream = async_stream::stream! {
        while let Some(chunk) = chunks.next().await {
            match chunk {
                Ok(StreamChunk::Updates(event)) => {
                    yield Ok(Event::default().event("updates").data(event.to_payload().to_string()));
                }
                Ok(StreamChunk::Values(final_state)) => {
                    let output = RunOutput::from(*final_state);
                    let data = serde_json::to_string(&output).unwrap_or_else(|_| "{}".to_string());
                    yield Ok(Event::default().event("values").data(data));
                }
                Err(e) => {
                    let body = ApiError::from(e).body();
                    let data = serde_json::to_string(&body).unwrap_or_else(|_| "{}".to_string());
                    yield Ok(Event::default().event("error").data(data));
                    break;
                }
            }
        }
        debug!("Research event stream closed");
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL)))
}
