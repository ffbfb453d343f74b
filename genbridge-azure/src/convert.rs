//! Type conversions between genbridge and Azure OpenAI chat completions format.
//!
//! Outbound, every turn is flattened into one plain-text message: function
//! calls and responses are rendered as readable text rather than native
//! `tool_calls`/`tool` messages. Inbound, only the first choice is translated.

use crate::wire::{
    ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ChatRole,
    FunctionDefinition, ToolCallDelta, ToolDefinition, Usage,
};
use genbridge_core::{
    BridgeError, Candidate, Content, FinishReason, GenerateContentRequest,
    GenerateContentResponse, Part, Result, Role, Tool, UsageMetadata,
};
use serde_json::Value;

/// Build an Azure OpenAI chat completions request body from a genbridge request.
///
/// `deployment` replaces whatever model the host asked for.
pub(crate) fn build_request(
    deployment: &str,
    max_tokens: u32,
    request: &GenerateContentRequest,
    stream: bool,
) -> ChatCompletionRequest {
    let config = request.config.as_ref();

    let mut messages = Vec::with_capacity(request.contents.len() + 1);
    if let Some(system) = config.and_then(|c| c.system_instruction.as_ref()).and_then(|s| s.text())
    {
        messages.push(ChatMessage { role: ChatRole::System, content: system });
    }
    messages.extend(request.contents.iter().map(content_to_message));

    ChatCompletionRequest {
        model: deployment.to_string(),
        messages,
        tools: config.and_then(|c| c.tools.as_deref()).and_then(convert_tools),
        max_tokens,
        temperature: config.and_then(|c| c.temperature),
        top_p: config.and_then(|c| c.top_p),
        stream: stream.then_some(true),
    }
}

pub(crate) fn map_role(role: Role) -> ChatRole {
    match role {
        Role::User => ChatRole::User,
        Role::Model => ChatRole::Assistant,
    }
}

/// Convert a single turn to an Azure message.
pub(crate) fn content_to_message(content: &Content) -> ChatMessage {
    ChatMessage { role: map_role(content.role), content: flatten_parts(&content.parts) }
}

/// Render parts as one string, in order, without separators.
pub(crate) fn flatten_parts(parts: &[Part]) -> String {
    parts
        .iter()
        .map(|part| match part {
            Part::Text { text } => text.clone(),
            Part::FunctionCall { function_call } => {
                format!("Function call: {}({})", function_call.name, function_call.args)
            }
            Part::FunctionResponse { function_response } => {
                format!("Function response: {}", function_response.response)
            }
            Part::Other(_) => String::new(),
        })
        .collect()
}

/// Flatten every declaration of every tool; `None` when nothing is declared.
pub(crate) fn convert_tools(tools: &[Tool]) -> Option<Vec<ToolDefinition>> {
    let definitions: Vec<ToolDefinition> = tools
        .iter()
        .flat_map(|tool| tool.function_declarations.iter().flatten())
        .map(|decl| {
            let parameters = decl.schema().cloned().unwrap_or_else(|| {
                serde_json::json!({
                    "type": "object",
                    "properties": {}
                })
            });
            ToolDefinition::function(FunctionDefinition {
                name: decl.name.clone(),
                description: decl.description.clone(),
                parameters,
            })
        })
        .collect();

    if definitions.is_empty() { None } else { Some(definitions) }
}

/// Convert a unary response. Fails on zero choices and on tool-call
/// arguments that are not valid JSON.
pub(crate) fn parse_response(response: ChatCompletionResponse) -> Result<GenerateContentResponse> {
    let ChatCompletionResponse { id, model, choices, usage } = response;
    let choice = choices.into_iter().next().ok_or(BridgeError::EmptyResponse)?;

    let mut parts = Vec::new();
    if let Some(text) = choice.message.content {
        parts.push(Part::Text { text });
    }

    for tool_call in choice.message.tool_calls.unwrap_or_default() {
        let name = tool_call.function.name;
        let args: Value = serde_json::from_str(&tool_call.function.arguments)
            .map_err(|source| BridgeError::FunctionArguments { name: name.clone(), source })?;
        parts.push(Part::FunctionCall {
            function_call: genbridge_core::FunctionCall { name, args, id: tool_call.id },
        });
    }

    Ok(GenerateContentResponse {
        candidates: vec![Candidate::new(
            parts,
            map_finish_reason(choice.finish_reason.as_deref()),
            choice.index,
        )],
        usage_metadata: usage.map(map_usage),
        response_id: id,
        model_version: model,
    })
}

/// Convert one streamed chunk, treating every tool-call fragment in isolation.
///
/// Returns `None` for chunks without a delta and for chunks that yield no parts.
pub(crate) fn parse_stream_chunk(chunk: ChatCompletionChunk) -> Option<GenerateContentResponse> {
    let choice = chunk.choices.into_iter().next()?;
    let delta = choice.delta?;

    let mut parts = Vec::new();
    if let Some(text) = delta.content.filter(|t| !t.is_empty()) {
        parts.push(Part::Text { text });
    }
    for fragment in delta.tool_calls.unwrap_or_default() {
        if let Some(part) = complete_fragment(fragment) {
            parts.push(part);
        }
    }

    if parts.is_empty() {
        return None;
    }

    Some(chunk_response(
        parts,
        choice.finish_reason.as_deref(),
        choice.index.unwrap_or(0),
        chunk.id,
        chunk.model,
    ))
}

/// A fragment that carries both a name and an argument string that parses.
fn complete_fragment(fragment: ToolCallDelta) -> Option<Part> {
    let function = fragment.function?;
    let name = function.name.filter(|n| !n.is_empty())?;
    let arguments = function.arguments.filter(|a| !a.is_empty())?;
    match serde_json::from_str::<Value>(&arguments) {
        Ok(args) => Some(Part::FunctionCall {
            function_call: genbridge_core::FunctionCall { name, args, id: fragment.id },
        }),
        Err(e) => {
            tracing::debug!(function = %name, error = %e, "dropping incomplete tool-call fragment");
            None
        }
    }
}

pub(crate) fn chunk_response(
    parts: Vec<Part>,
    finish_reason: Option<&str>,
    index: u32,
    id: Option<String>,
    model: Option<String>,
) -> GenerateContentResponse {
    GenerateContentResponse {
        candidates: vec![Candidate::new(parts, map_finish_reason(finish_reason), index)],
        usage_metadata: None,
        response_id: id,
        model_version: model,
    }
}

/// Map Azure finish_reason to the host's `FinishReason`. Total: anything
/// unrecognized, including a missing reason, is `Other`.
pub(crate) fn map_finish_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("stop") => FinishReason::Stop,
        Some("length") => FinishReason::MaxTokens,
        Some("tool_calls") => FinishReason::Stop,
        Some("content_filter") => FinishReason::Safety,
        _ => FinishReason::Other,
    }
}

fn map_usage(usage: Usage) -> UsageMetadata {
    UsageMetadata {
        prompt_token_count: usage.prompt_tokens,
        candidates_token_count: usage.completion_tokens,
        total_token_count: usage.total_tokens,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genbridge_core::{FunctionDeclaration, GenerateContentConfig};
    use serde_json::json;

    fn request(contents: Vec<Content>) -> GenerateContentRequest {
        GenerateContentRequest::new("gemini-2.5-pro", contents)
    }

    fn response(value: Value) -> ChatCompletionResponse {
        serde_json::from_value(value).unwrap()
    }

    fn chunk(value: Value) -> ChatCompletionChunk {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_build_request_basic() {
        let body = build_request(
            "my-deployment",
            4096,
            &request(vec![Content::user().with_text("Hello")]),
            false,
        );

        assert_eq!(body.model, "my-deployment");
        assert_eq!(body.max_tokens, 4096);
        assert_eq!(body.stream, None);
        assert_eq!(body.messages, vec![ChatMessage {
            role: ChatRole::User,
            content: "Hello".to_string()
        }]);
        assert!(body.tools.is_none());
        assert!(body.temperature.is_none());
        assert!(body.top_p.is_none());
    }

    #[test]
    fn test_build_request_ignores_host_model() {
        let body = build_request("deployment-a", 10, &request(vec![]), false);
        assert_eq!(body.model, "deployment-a");
    }

    #[test]
    fn test_build_request_streaming_flag() {
        let body = build_request("d", 10, &request(vec![]), true);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["stream"], true);
    }

    #[test]
    fn test_build_request_with_sampling() {
        let req = request(vec![]).with_config(GenerateContentConfig {
            temperature: Some(0.5),
            top_p: Some(0.25),
            ..Default::default()
        });
        let json = serde_json::to_value(build_request("d", 512, &req, false)).unwrap();

        assert_eq!(json["temperature"], 0.5);
        assert_eq!(json["top_p"], 0.25);
        assert_eq!(json["max_tokens"], 512);
    }

    #[test]
    fn test_system_instruction_becomes_leading_message() {
        let req = request(vec![
            Content::user().with_text("one"),
            Content::model().with_text("two"),
            Content::user().with_text("three"),
        ])
        .with_system_instruction("You are terse.");
        let body = build_request("d", 10, &req, false);

        assert_eq!(body.messages.len(), 4);
        assert_eq!(body.messages[0], ChatMessage {
            role: ChatRole::System,
            content: "You are terse.".to_string()
        });
        assert_eq!(
            body.messages.iter().filter(|m| m.role == ChatRole::System).count(),
            1
        );
    }

    #[test]
    fn test_structured_system_instruction() {
        let req: GenerateContentRequest = serde_json::from_value(json!({
            "contents": [],
            "config": {"systemInstruction": {"text": "From a part."}}
        }))
        .unwrap();
        let body = build_request("d", 10, &req, false);
        assert_eq!(body.messages[0].content, "From a part.");
        assert_eq!(body.messages[0].role, ChatRole::System);
    }

    #[test]
    fn test_role_mapping() {
        assert_eq!(map_role(Role::User), ChatRole::User);
        assert_eq!(map_role(Role::Model), ChatRole::Assistant);
    }

    #[test]
    fn test_flatten_parts_renders_calls_and_responses() {
        let content = Content::model()
            .with_text("Let me check. ")
            .with_function_call("lookup", json!({"q": "x"}))
            .with_function_response("lookup", json!({"hits": 2}))
            .with_part(Part::Other(serde_json::Map::new()))
            .with_text(" Done.");

        assert_eq!(
            flatten_parts(&content.parts),
            "Let me check. Function call: lookup({\"q\":\"x\"})Function response: {\"hits\":2} Done."
        );
    }

    #[test]
    fn test_flatten_parts_keeps_key_order() {
        let parts = [
            Part::function_call("f", json!({"zeta": 1, "alpha": 2})),
            Part::function_response("f", json!({"when": "now", "at": 3})),
        ];
        assert_eq!(
            flatten_parts(&parts),
            "Function call: f({\"zeta\":1,\"alpha\":2})Function response: {\"when\":\"now\",\"at\":3}"
        );
    }

    #[test]
    fn test_convert_tools_keeps_schema_property_order() {
        let tools = vec![Tool::functions(vec![FunctionDeclaration::new("book").with_json_schema(
            json!({
                "type": "object",
                "properties": {"to": {"type": "string"}, "from": {"type": "string"}},
                "required": ["to", "from"]
            }),
        )])];

        let defs = convert_tools(&tools).unwrap();
        assert_eq!(
            serde_json::to_string(&defs[0].function.parameters).unwrap(),
            r#"{"type":"object","properties":{"to":{"type":"string"},"from":{"type":"string"}},"required":["to","from"]}"#
        );
    }

    #[test]
    fn test_content_to_message_model_role() {
        let msg = content_to_message(&Content::model().with_text("Hello!"));
        assert_eq!(msg.role, ChatRole::Assistant);
        assert_eq!(msg.content, "Hello!");
    }

    #[test]
    fn test_convert_tools_flattens_declarations() {
        let tools = vec![
            Tool::functions(vec![
                FunctionDeclaration::new("get_weather")
                    .with_description("Get weather for a city")
                    .with_parameters(json!({"type": "OBJECT"}))
                    .with_json_schema(json!({
                        "type": "object",
                        "properties": {"city": {"type": "string"}}
                    })),
                FunctionDeclaration::new("no_params"),
            ]),
            Tool::default(),
            Tool::functions(vec![
                FunctionDeclaration::new("legacy").with_parameters(json!({"type": "OBJECT"})),
            ]),
        ];

        let defs = convert_tools(&tools).unwrap();
        assert_eq!(defs.len(), 3);
        assert_eq!(defs[0].kind, "function");
        assert_eq!(defs[0].function.name, "get_weather");
        assert_eq!(defs[0].function.description.as_deref(), Some("Get weather for a city"));
        assert_eq!(defs[0].function.parameters["properties"]["city"]["type"], "string");
        assert_eq!(defs[1].function.parameters, json!({"type": "object", "properties": {}}));
        assert_eq!(defs[2].function.parameters, json!({"type": "OBJECT"}));
    }

    #[test]
    fn test_convert_tools_empty_is_omitted() {
        assert!(convert_tools(&[]).is_none());
        assert!(convert_tools(&[Tool::default(), Tool::functions(vec![])]).is_none());

        let req = request(vec![]).with_tools(vec![Tool::default()]);
        let json = serde_json::to_value(build_request("d", 10, &req, false)).unwrap();
        assert!(json.get("tools").is_none());
    }

    #[test]
    fn test_parse_response_text() {
        let resp = parse_response(response(json!({
            "id": "chatcmpl-123",
            "model": "gpt-4o-2024-08-06",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "hello"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        })))
        .unwrap();

        assert_eq!(resp.candidates.len(), 1);
        let candidate = &resp.candidates[0];
        assert_eq!(candidate.content.role, Role::Model);
        assert_eq!(candidate.content.parts, vec![Part::text_part("hello")]);
        assert_eq!(candidate.finish_reason, Some(FinishReason::Stop));
        assert_eq!(candidate.index, 0);
        assert_eq!(resp.response_id.as_deref(), Some("chatcmpl-123"));

        let usage = resp.usage_metadata.unwrap();
        assert_eq!(usage.prompt_token_count, 10);
        assert_eq!(usage.candidates_token_count, 5);
        assert_eq!(usage.total_token_count, 15);
    }

    #[test]
    fn test_parse_response_without_usage() {
        let resp = parse_response(response(json!({
            "choices": [{"message": {"content": "x"}, "finish_reason": "length"}]
        })))
        .unwrap();
        assert!(resp.usage_metadata.is_none());
        assert_eq!(resp.finish_reason(), Some(FinishReason::MaxTokens));
    }

    #[test]
    fn test_parse_response_with_tool_calls() {
        let resp = parse_response(response(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {"name": "lookup", "arguments": "{\"q\":\"x\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        })))
        .unwrap();

        assert_eq!(resp.finish_reason(), Some(FinishReason::Stop));
        let calls = resp.function_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "lookup");
        assert_eq!(calls[0].args, json!({"q": "x"}));
        assert_eq!(calls[0].id.as_deref(), Some("call_abc"));
        assert_eq!(resp.candidates[0].content.parts.len(), 1);
    }

    #[test]
    fn test_parse_response_keeps_empty_text() {
        let resp = parse_response(response(json!({
            "choices": [{"message": {"content": ""}, "finish_reason": "content_filter"}]
        })))
        .unwrap();
        assert_eq!(resp.candidates[0].content.parts, vec![Part::text_part("")]);
        assert_eq!(resp.finish_reason(), Some(FinishReason::Safety));
    }

    #[test]
    fn test_parse_response_translates_first_choice_only() {
        let resp = parse_response(response(json!({
            "choices": [
                {"index": 0, "message": {"content": "first"}, "finish_reason": "stop"},
                {"index": 1, "message": {"content": "second"}, "finish_reason": "stop"}
            ]
        })))
        .unwrap();
        assert_eq!(resp.candidates.len(), 1);
        assert_eq!(resp.text(), "first");
    }

    #[test]
    fn test_parse_response_copies_choice_index() {
        let resp = parse_response(response(json!({
            "choices": [{"index": 2, "message": {"content": "hi"}, "finish_reason": "stop"}]
        })))
        .unwrap();
        assert_eq!(resp.candidates[0].index, 2);
    }

    #[test]
    fn test_parse_stream_chunk_copies_choice_index() {
        let resp = parse_stream_chunk(chunk(json!({
            "choices": [{"index": 3, "delta": {"content": "Hi"}}]
        })))
        .unwrap();
        assert_eq!(resp.candidates[0].index, 3);
    }

    #[test]
    fn test_parse_response_no_choices_fails() {
        let err = parse_response(response(json!({"id": "x", "choices": []}))).unwrap_err();
        assert!(matches!(err, BridgeError::EmptyResponse));
        assert!(err.to_string().contains("no choices"));
    }

    #[test]
    fn test_parse_response_bad_arguments_fail() {
        let err = parse_response(response(json!({
            "choices": [{
                "message": {
                    "tool_calls": [{"id": "c1", "function": {"name": "lookup", "arguments": "{\"q\":"}}]
                },
                "finish_reason": "tool_calls"
            }]
        })))
        .unwrap_err();
        assert!(matches!(err, BridgeError::FunctionArguments { ref name, .. } if name == "lookup"));
    }

    #[test]
    fn test_parse_stream_chunk_text() {
        let resp = parse_stream_chunk(chunk(json!({
            "choices": [{"delta": {"content": "Hi"}, "index": 0}]
        })))
        .unwrap();
        assert_eq!(resp.text(), "Hi");
        assert_eq!(resp.candidates[0].content.role, Role::Model);
        assert_eq!(resp.finish_reason(), Some(FinishReason::Other));
        assert_eq!(resp.candidates[0].index, 0);
    }

    #[test]
    fn test_parse_stream_chunk_index_defaults_to_zero() {
        let resp = parse_stream_chunk(chunk(json!({
            "choices": [{"delta": {"content": "Hi"}, "finish_reason": "stop"}]
        })))
        .unwrap();
        assert_eq!(resp.candidates[0].index, 0);
        assert_eq!(resp.finish_reason(), Some(FinishReason::Stop));
    }

    #[test]
    fn test_parse_stream_chunk_suppresses_empty() {
        assert!(parse_stream_chunk(chunk(json!({"choices": []}))).is_none());
        assert!(parse_stream_chunk(chunk(json!({"choices": [{"index": 0}]}))).is_none());
        assert!(
            parse_stream_chunk(chunk(json!({
                "choices": [{"delta": {"content": ""}, "finish_reason": "stop"}]
            })))
            .is_none()
        );
        assert!(
            parse_stream_chunk(chunk(json!({
                "choices": [{"delta": {"role": "assistant"}, "finish_reason": null}]
            })))
            .is_none()
        );
    }

    #[test]
    fn test_parse_stream_chunk_complete_tool_call() {
        let resp = parse_stream_chunk(chunk(json!({
            "choices": [{
                "delta": {
                    "tool_calls": [{
                        "index": 0,
                        "id": "call_xyz",
                        "function": {"name": "search", "arguments": "{\"q\":\"rust\"}"}
                    }]
                }
            }]
        })))
        .unwrap();

        let calls = resp.function_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "search");
        assert_eq!(calls[0].args, json!({"q": "rust"}));
        assert_eq!(calls[0].id.as_deref(), Some("call_xyz"));
    }

    #[test]
    fn test_parse_stream_chunk_drops_partial_tool_calls() {
        // Name without arguments: the opening fragment of a split call.
        assert!(
            parse_stream_chunk(chunk(json!({
                "choices": [{"delta": {"tool_calls": [
                    {"index": 0, "id": "c1", "function": {"name": "search", "arguments": ""}}
                ]}}]
            })))
            .is_none()
        );
        // Arguments without a name: a continuation fragment.
        assert!(
            parse_stream_chunk(chunk(json!({
                "choices": [{"delta": {"tool_calls": [
                    {"index": 0, "function": {"arguments": "{\"q\":\"rust\"}"}}
                ]}}]
            })))
            .is_none()
        );
        // Name with truncated arguments: dropped, never an error.
        assert!(
            parse_stream_chunk(chunk(json!({
                "choices": [{"delta": {"tool_calls": [
                    {"index": 0, "function": {"name": "search", "arguments": "{\"q\":"}}
                ]}}]
            })))
            .is_none()
        );
    }

    #[test]
    fn test_parse_stream_chunk_keeps_text_when_call_dropped() {
        let resp = parse_stream_chunk(chunk(json!({
            "choices": [{"delta": {
                "content": "thinking",
                "tool_calls": [{"index": 0, "function": {"name": "search"}}]
            }}]
        })))
        .unwrap();
        assert_eq!(resp.candidates[0].content.parts, vec![Part::text_part("thinking")]);
    }

    #[test]
    fn test_map_finish_reason_is_total() {
        assert_eq!(map_finish_reason(Some("stop")), FinishReason::Stop);
        assert_eq!(map_finish_reason(Some("length")), FinishReason::MaxTokens);
        assert_eq!(map_finish_reason(Some("tool_calls")), FinishReason::Stop);
        assert_eq!(map_finish_reason(Some("content_filter")), FinishReason::Safety);
        assert_eq!(map_finish_reason(None), FinishReason::Other);
        assert_eq!(map_finish_reason(Some("anything-else")), FinishReason::Other);
    }

    mod properties {
        use super::*;
        use genbridge_core::SystemInstruction;
        use proptest::prelude::*;

        fn arb_role() -> impl Strategy<Value = Role> {
            prop_oneof![Just(Role::User), Just(Role::Model)]
        }

        fn arb_part() -> impl Strategy<Value = Part> {
            prop_oneof![
                "[A-Za-z0-9 .,!?]{0,40}".prop_map(|text: String| Part::text_part(text)),
                "[a-z_]{1,12}".prop_map(|name| Part::function_call(name, json!({"k": 1}))),
                "[a-z_]{1,12}".prop_map(|name| Part::function_response(name, json!({"ok": true}))),
            ]
        }

        fn arb_content() -> impl Strategy<Value = Content> {
            (arb_role(), prop::collection::vec(arb_part(), 0..4))
                .prop_map(|(role, parts)| Content { role, parts })
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(100))]

            /// One outbound message per turn, in order, plus at most one leading
            /// system message.
            #[test]
            fn prop_one_message_per_turn(
                contents in prop::collection::vec(arb_content(), 0..8),
                system in prop::option::of("[A-Za-z ]{0,20}"),
            ) {
                let mut request = GenerateContentRequest::new("m", contents.clone());
                if let Some(system) = &system {
                    request =
                        request.with_system_instruction(SystemInstruction::Text(system.clone()));
                }
                let body = build_request("deployment", 128, &request, false);

                let has_system = system.as_deref().is_some_and(|s| !s.is_empty());
                let offset = usize::from(has_system);
                prop_assert_eq!(body.messages.len(), contents.len() + offset);
                prop_assert_eq!(
                    body.messages.iter().filter(|m| m.role == ChatRole::System).count(),
                    offset
                );
                for (message, content) in body.messages[offset..].iter().zip(&contents) {
                    let expected = match content.role {
                        Role::User => ChatRole::User,
                        Role::Model => ChatRole::Assistant,
                    };
                    prop_assert_eq!(message.role, expected);
                    prop_assert_eq!(&message.content, &flatten_parts(&content.parts));
                }
            }

            #[test]
            fn prop_finish_reason_mapping_is_total(reason in prop::option::of(".{0,16}")) {
                let mapped = map_finish_reason(reason.as_deref());
                let expected = match reason.as_deref() {
                    Some("stop") | Some("tool_calls") => FinishReason::Stop,
                    Some("length") => FinishReason::MaxTokens,
                    Some("content_filter") => FinishReason::Safety,
                    _ => FinishReason::Other,
                };
                prop_assert_eq!(mapped, expected);
            }
        }
    }
}
