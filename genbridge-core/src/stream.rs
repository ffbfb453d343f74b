use crate::generator::ResponseStream;
use crate::model::{Candidate, FinishReason, GenerateContentResponse};
use crate::types::Part;
use crate::{BridgeError, Result};
use futures::StreamExt;

/// Aggregate streaming responses into a single response
///
/// Text from every fragment is joined into one leading text part, function
/// calls follow in arrival order. A specific finish reason (anything but
/// `Other`) is never overwritten by a later unspecified one. Usage and
/// response id come from the last fragment that carries them.
pub async fn aggregate_stream(mut stream: ResponseStream) -> Result<GenerateContentResponse> {
    let mut aggregated_text = String::new();
    let mut function_calls: Vec<Part> = Vec::new();
    let mut finish_reason: Option<FinishReason> = None;
    let mut index = 0;
    let mut aggregated = GenerateContentResponse::default();
    let mut received = false;

    while let Some(result) = stream.next().await {
        let response = result?;
        received = true;

        if let Some(candidate) = response.candidates.into_iter().next() {
            for part in candidate.content.parts {
                match part {
                    Part::Text { text } => aggregated_text.push_str(&text),
                    call @ Part::FunctionCall { .. } => function_calls.push(call),
                    _ => {}
                }
            }
            finish_reason = match (candidate.finish_reason, finish_reason) {
                (Some(FinishReason::Other) | None, Some(seen)) => Some(seen),
                (reason, _) => reason,
            };
            index = candidate.index;
        }

        if response.usage_metadata.is_some() {
            aggregated.usage_metadata = response.usage_metadata;
        }
        if response.response_id.is_some() {
            aggregated.response_id = response.response_id;
        }
        if response.model_version.is_some() {
            aggregated.model_version = response.model_version;
        }
    }

    if !received {
        return Err(BridgeError::Transport("No responses received from stream".to_string()));
    }

    let mut parts = Vec::new();
    if !aggregated_text.is_empty() {
        parts.push(Part::Text { text: aggregated_text });
    }
    parts.extend(function_calls);

    aggregated.candidates =
        vec![Candidate::new(parts, finish_reason.unwrap_or(FinishReason::Other), index)];
    Ok(aggregated)
}
