//! Streaming chat-completions client for OpenAI-compatible endpoints.

use std::collections::VecDeque;
use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{stream, Stream, StreamExt};
use serde_json::{json, Value};

use super::error::LlmError;
use super::provider::LlmProvider;
use super::settings::LlmSettings;
use super::stream::LlmStream;

type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, LlmError>> + Send>>;

#[derive(Clone)]
pub struct OpenAiCompatibleProvider {
    client: reqwest::Client,
    settings: LlmSettings,
}

impl OpenAiCompatibleProvider {
    pub fn new(settings: LlmSettings) -> Result<Self, LlmError> {
        if settings.api_key.as_deref().map_or(true, str::is_empty) {
            return Err(LlmError::MissingApiKey);
        }
        Ok(Self {
            client: reqwest::Client::new(),
            settings,
        })
    }

    pub fn settings(&self) -> &LlmSettings {
        &self.settings
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.settings.base_url.trim_end_matches('/'))
    }

    fn request_body(&self, system: &str, user: &str) -> Value {
        json!({
            "model": self.settings.model,
            "temperature": self.settings.temperature,
            "max_tokens": self.settings.max_output_tokens,
            "stream": true,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    async fn complete(&self, system: &str, user: &str) -> Result<LlmStream, LlmError> {
        let api_key = self.settings.api_key.as_deref().ok_or(LlmError::MissingApiKey)?;
        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(&self.request_body(system, user))
            .send()
            .await
            .map_err(|error| LlmError::Network(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        tracing::debug!("streaming completion from {}", self.settings.model);
        let bytes: ByteStream = Box::pin(response.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|error| LlmError::Network(error.to_string()))
        }));
        Ok(sse_text_stream(bytes))
    }

    fn name(&self) -> &str {
        &self.settings.model
    }
}

#[derive(Debug, PartialEq)]
enum SseLine {
    Text(String),
    Failure(String),
    Done,
    Skip,
}

fn parse_sse_line(line: &str) -> SseLine {
    let Some(data) = line.strip_prefix("data:") else {
        return SseLine::Skip;
    };
    let data = data.trim();
    if data == "[DONE]" {
        return SseLine::Done;
    }
    let Ok(payload) = serde_json::from_str::<Value>(data) else {
        return SseLine::Skip;
    };
    if let Some(error) = payload.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return SseLine::Failure(message);
    }
    match payload
        .pointer("/choices/0/delta/content")
        .and_then(Value::as_str)
    {
        Some(text) if !text.is_empty() => SseLine::Text(text.to_string()),
        _ => SseLine::Skip,
    }
}

struct SseState {
    bytes: ByteStream,
    buffer: Vec<u8>,
    pending: VecDeque<Result<String, LlmError>>,
    done: bool,
}

impl SseState {
    fn push_line(&mut self, raw: &[u8]) {
        let line = String::from_utf8_lossy(raw);
        match parse_sse_line(line.trim()) {
            SseLine::Text(text) => self.pending.push_back(Ok(text)),
            SseLine::Failure(message) => {
                self.pending.push_back(Err(LlmError::Stream(message)));
                self.done = true;
            }
            SseLine::Done => self.done = true,
            SseLine::Skip => {}
        }
    }

    fn drain_lines(&mut self) {
        while !self.done {
            let Some(position) = self.buffer.iter().position(|byte| *byte == b'\n') else {
                break;
            };
            let line: Vec<u8> = self.buffer.drain(..=position).collect();
            self.push_line(&line);
        }
    }
}

/// Turn raw SSE bytes into text deltas. Lines are split on raw bytes so
/// multi-byte characters spanning chunk boundaries survive.
fn sse_text_stream(bytes: ByteStream) -> LlmStream {
    let state = SseState {
        bytes,
        buffer: Vec::new(),
        pending: VecDeque::new(),
        done: false,
    };
    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.done {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    state.buffer.extend_from_slice(&chunk);
                    state.drain_lines();
                }
                Some(Err(error)) => {
                    state.done = true;
                    return Some((Err(error), state));
                }
                None => {
                    let rest = std::mem::take(&mut state.buffer);
                    state.push_line(&rest);
                    state.done = true;
                }
            }
        }
    }))
}
