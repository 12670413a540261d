//! Request/response lifecycle against the vision-model server.
//!
//! The server speaks the OpenAI-style chat-completion protocol. Transient
//! transport failures are retried with linear backoff; structurally wrong
//! responses are surfaced immediately as [`DeskPilotError::MalformedResponse`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::ModelConfig;
use crate::errors::{DeskPilotError, DeskPilotResult};

const MAX_RETRIES: u32 = 2;

/// One model reply: the raw assistant text and, when a JSON object could be
/// extracted from it, the parsed plan. A missing plan is "no actionable plan
/// this iteration", not an error.
#[derive(Debug, Clone)]
pub struct ModelResponse {
    pub raw_text: String,
    pub plan: Option<Value>,
}

/// Model-server capability consumed by the agent loop. Mocked in tests.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn check_health(&self) -> bool;

    /// Sends one planning request. The abort flag is consulted before the
    /// request goes out and again when the response lands, so a human stop
    /// short-circuits a call already in flight.
    async fn send_request(
        &self,
        prompt: &str,
        image_base64: Option<&str>,
        abort: &Arc<AtomicBool>,
    ) -> DeskPilotResult<ModelResponse>;
}

pub struct HttpModelClient {
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
    top_p: f64,
    client: reqwest::Client,
}

impl HttpModelClient {
    pub fn new(config: &ModelConfig) -> DeskPilotResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            client,
        })
    }

    /// Polls the liveness endpoint until it answers or the budget elapses.
    pub async fn wait_for_server(&self, max_wait: Duration) -> bool {
        let start = tokio::time::Instant::now();
        while start.elapsed() < max_wait {
            if self.check_health().await {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        false
    }

    fn build_payload(&self, prompt: &str, image_base64: Option<&str>) -> Value {
        let mut user_content = Vec::new();
        if let Some(b64) = image_base64 {
            user_content.push(json!({
                "type": "image_url",
                "image_url": {"url": format!("data:image/png;base64,{b64}")}
            }));
        }
        user_content.push(json!({"type": "text", "text": prompt}));

        json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": [{"type": "text", "text": crate::llm::prompts::SYSTEM_PROMPT}],
                },
                {
                    "role": "user",
                    "content": user_content,
                },
            ],
            "temperature": self.temperature,
            "top_p": self.top_p,
            "max_tokens": self.max_tokens,
        })
    }
}

#[async_trait]
impl ModelClient for HttpModelClient {
    async fn check_health(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).timeout(Duration::from_secs(10)).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    async fn send_request(
        &self,
        prompt: &str,
        image_base64: Option<&str>,
        abort: &Arc<AtomicBool>,
    ) -> DeskPilotResult<ModelResponse> {
        let payload = self.build_payload(prompt, image_base64);
        let url = format!("{}/v1/chat/completions", self.base_url);

        let mut last_error = String::new();
        for attempt in 0..=MAX_RETRIES {
            if abort.load(Ordering::Relaxed) {
                tracing::info!("model request aborted before send");
                return Err(DeskPilotError::Aborted);
            }

            if attempt > 0 {
                tracing::warn!(attempt, max = MAX_RETRIES, error = %last_error, "retrying model request");
                tokio::time::sleep(Duration::from_secs(attempt as u64)).await;
            }

            let response = match self.client.post(&url).json(&payload).send().await {
                Ok(resp) => resp,
                Err(e) => {
                    last_error = if e.is_timeout() {
                        "model request timed out".to_string()
                    } else if e.is_connect() {
                        "cannot connect to model server".to_string()
                    } else {
                        format!("network error: {e}")
                    };
                    continue;
                }
            };

            if abort.load(Ordering::Relaxed) {
                tracing::info!("model request aborted after response");
                return Err(DeskPilotError::Aborted);
            }

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                last_error = format!("server error {status}: {body}");
                continue;
            }

            // A body that is not valid JSON, or lacks the expected fields, is
            // structural: retrying will not fix it.
            let body: Value = match response.json().await {
                Ok(v) => v,
                Err(e) => {
                    return Err(DeskPilotError::MalformedResponse(format!(
                        "response body is not valid JSON: {e}"
                    )));
                }
            };
            let content = body["choices"][0]["message"]["content"]
                .as_str()
                .ok_or_else(|| {
                    DeskPilotError::MalformedResponse(
                        "missing choices[0].message.content".into(),
                    )
                })?;

            let plan = extract_json(content);
            return Ok(ModelResponse {
                raw_text: content.to_string(),
                plan,
            });
        }

        Err(DeskPilotError::Inference(last_error))
    }
}

/// Pulls a JSON object out of free-form model text: fenced code blocks are
/// tried first, then the span between the first `{` and the last `}`.
pub fn extract_json(text: &str) -> Option<Value> {
    let fence = regex::Regex::new(r"```(?:json)?\s*\n?([\s\S]*?)\n?```").ok()?;
    for cap in fence.captures_iter(text) {
        if let Ok(value) = serde_json::from_str::<Value>(cap[1].trim()) {
            if value.is_object() {
                return Some(value);
            }
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&text[start..=end])
        .ok()
        .filter(Value::is_object)
}
