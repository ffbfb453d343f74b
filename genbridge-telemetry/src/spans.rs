//! Span helpers for provider calls

use tracing::Span;

/// Create a span for one provider operation
///
/// # Arguments
/// * `model_name` - Deployment or model the adapter is bound to
/// * `prompt_id` - Host correlation id for the call
/// * `stream` - Whether the call streams its response
///
/// # Example
/// ```
/// use genbridge_telemetry::model_call_span;
/// let span = model_call_span("gpt-4o", "prompt-42", true);
/// let _enter = span.enter();
/// ```
pub fn model_call_span(model_name: &str, prompt_id: &str, stream: bool) -> Span {
    tracing::info_span!(
        "model.call",
        model.name = model_name,
        prompt.id = prompt_id,
        stream = stream,
        otel.kind = "client"
    )
}

/// Create a span around the decoding of one streamed chunk
pub fn stream_chunk_span(index: usize) -> Span {
    tracing::debug_span!("model.stream_chunk", chunk.index = index)
}
