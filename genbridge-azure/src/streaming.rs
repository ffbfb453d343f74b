//! Incremental decoding of Azure OpenAI `text/event-stream` bodies.

use crate::config::ToolCallMode;
use crate::convert;
use crate::wire::{ChatCompletionChunk, ToolCallDelta};
use async_stream::try_stream;
use futures::{Stream, StreamExt};
use genbridge_core::{BridgeError, FunctionCall, GenerateContentResponse, Part, ResponseStream};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Display;

const DATA_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "[DONE]";

/// Splits arbitrary byte reads into complete lines.
///
/// The unterminated tail of each read is held back until a later read
/// completes it, so lines (and multi-byte characters) split across reads
/// come out whole.
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let Some(last_newline) = self.pending.iter().rposition(|b| *b == b'\n') else {
            return Vec::new();
        };
        let tail = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, tail);
        String::from_utf8_lossy(&complete).lines().map(str::to_string).collect()
    }

    /// Whatever is left once the body is exhausted.
    pub(crate) fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(String::from_utf8_lossy(&rest).trim_end_matches('\r').to_string())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum SseEvent<'a> {
    Data(&'a str),
    Done,
}

/// Classify one line; anything without the `data: ` prefix is ignored.
pub(crate) fn parse_event_line(line: &str) -> Option<SseEvent<'_>> {
    let payload = line.strip_prefix(DATA_PREFIX)?;
    if payload.trim_end() == DONE_SENTINEL {
        Some(SseEvent::Done)
    } else {
        Some(SseEvent::Data(payload))
    }
}

/// One tool call being assembled from streamed fragments.
#[derive(Debug, Default)]
struct PendingToolCall {
    id: Option<String>,
    name: String,
    arguments: String,
    emitted: bool,
}

impl PendingToolCall {
    fn absorb(&mut self, fragment: ToolCallDelta) {
        if let Some(id) = fragment.id.filter(|id| !id.is_empty()) {
            self.id = Some(id);
        }
        if let Some(function) = fragment.function {
            if let Some(name) = function.name.filter(|n| !n.is_empty()) {
                self.name = name;
            }
            if let Some(arguments) = function.arguments {
                self.arguments.push_str(&arguments);
            }
        }
    }

    /// Emit the call once, as soon as its arguments parse.
    fn try_resolve(&mut self) -> Option<Part> {
        if self.emitted || self.name.is_empty() || self.arguments.trim().is_empty() {
            return None;
        }
        let args = serde_json::from_str::<Value>(&self.arguments).ok()?;
        Some(self.emit(args))
    }

    fn emit(&mut self, args: Value) -> Part {
        self.emitted = true;
        Part::FunctionCall {
            function_call: FunctionCall { name: self.name.clone(), args, id: self.id.clone() },
        }
    }
}

/// Turns the lines of one event stream into response fragments.
pub(crate) struct StreamDecoder {
    lines: LineBuffer,
    mode: ToolCallMode,
    slots: BTreeMap<u32, PendingToolCall>,
    chunks_seen: usize,
}

impl StreamDecoder {
    pub(crate) fn new(mode: ToolCallMode) -> Self {
        Self { lines: LineBuffer::default(), mode, slots: BTreeMap::new(), chunks_seen: 0 }
    }

    pub(crate) fn chunks_seen(&self) -> usize {
        self.chunks_seen
    }

    /// Feed one body read. Returns the fragments it completed and whether the
    /// `[DONE]` sentinel was reached; lines after the sentinel are discarded.
    pub(crate) fn feed(&mut self, bytes: &[u8]) -> (Vec<GenerateContentResponse>, bool) {
        let mut responses = Vec::new();
        for line in self.lines.push(bytes) {
            match parse_event_line(&line) {
                None => {}
                Some(SseEvent::Done) => return (responses, true),
                Some(SseEvent::Data(payload)) => responses.extend(self.decode_payload(payload)),
            }
        }
        (responses, false)
    }

    /// Decode a trailing line that never got its newline.
    pub(crate) fn finish(&mut self) -> Option<GenerateContentResponse> {
        let line = self.lines.finish()?;
        match parse_event_line(&line)? {
            SseEvent::Done => None,
            SseEvent::Data(payload) => self.decode_payload(payload),
        }
    }

    fn decode_payload(&mut self, payload: &str) -> Option<GenerateContentResponse> {
        let _span = genbridge_telemetry::stream_chunk_span(self.chunks_seen).entered();
        self.chunks_seen += 1;

        let chunk = match serde_json::from_str::<ChatCompletionChunk>(payload) {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::warn!("failed to parse Azure OpenAI chunk: {e} - {payload}");
                return None;
            }
        };

        match self.mode {
            ToolCallMode::PerChunk => convert::parse_stream_chunk(chunk),
            ToolCallMode::Accumulate => self.accumulate(chunk),
        }
    }

    fn accumulate(&mut self, chunk: ChatCompletionChunk) -> Option<GenerateContentResponse> {
        let choice = chunk.choices.into_iter().next()?;
        let mut parts = Vec::new();

        if let Some(delta) = choice.delta {
            if let Some(text) = delta.content.filter(|t| !t.is_empty()) {
                parts.push(Part::Text { text });
            }
            for (position, fragment) in delta.tool_calls.unwrap_or_default().into_iter().enumerate()
            {
                let key = fragment.index.unwrap_or(position as u32);
                let slot = self.slots.entry(key).or_default();
                slot.absorb(fragment);
                parts.extend(slot.try_resolve());
            }
        }

        if choice.finish_reason.is_some() {
            parts.extend(self.flush_slots());
        }

        if parts.is_empty() {
            return None;
        }

        Some(convert::chunk_response(
            parts,
            choice.finish_reason.as_deref(),
            choice.index.unwrap_or(0),
            chunk.id,
            chunk.model,
        ))
    }

    /// Resolve what is left when the provider signals the end of the turn.
    fn flush_slots(&mut self) -> Vec<Part> {
        let mut parts = Vec::new();
        for (_, mut slot) in std::mem::take(&mut self.slots) {
            if slot.emitted || slot.name.is_empty() {
                continue;
            }
            if slot.arguments.trim().is_empty() {
                parts.push(slot.emit(Value::Object(Default::default())));
                continue;
            }
            match serde_json::from_str::<Value>(&slot.arguments) {
                Ok(args) => parts.push(slot.emit(args)),
                Err(e) => tracing::warn!(
                    function = %slot.name,
                    error = %e,
                    "dropping tool call with unparseable streamed arguments"
                ),
            }
        }
        parts
    }
}

/// Decode a streamed response body into response fragments.
///
/// The body is owned by the returned stream and dropped on every exit path:
/// the `[DONE]` sentinel, body exhaustion, a read error, or the consumer
/// dropping the stream early.
pub(crate) fn decode_stream<S, B, E>(body: S, mode: ToolCallMode) -> ResponseStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    Box::pin(try_stream! {
        let mut body = Box::pin(body);
        let mut decoder = StreamDecoder::new(mode);
        let mut done = false;

        while let Some(read) = body.next().await {
            let bytes = read
                .map_err(|e| BridgeError::Transport(format!("Azure OpenAI stream error: {e}")))?;
            let (responses, reached_done) = decoder.feed(bytes.as_ref());
            for response in responses {
                yield response;
            }
            if reached_done {
                done = true;
                break;
            }
        }

        if !done {
            if let Some(response) = decoder.finish() {
                yield response;
            }
        }

        tracing::debug!(chunks = decoder.chunks_seen(), done, "Azure OpenAI stream finished");
    })
}
