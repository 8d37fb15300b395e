// src/provider/openai_compat.rs — Generic OpenAI-compatible provider
//
// Works against any `/v1/chat/completions` endpoint: OpenAI, Groq, DeepSeek,
// Together, OpenRouter, vLLM, and custom gateways.

use async_trait::async_trait;

use super::{ChatRequest, ChatResponse, ModelProvider, Role, StopReason, TokenUsage};
use crate::infra::errors::PromptuneError;

pub struct OpenAICompatProvider {
    id_str: String,
    name_str: String,
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAICompatProvider {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        api_key: String,
        base_url: String,
    ) -> Self {
        Self {
            id_str: id.into(),
            name_str: name.into(),
            api_key,
            base_url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ModelProvider for OpenAICompatProvider {
    fn id(&self) -> &str {
        &self.id_str
    }

    fn name(&self) -> &str {
        &self.name_str
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, PromptuneError> {
        let messages: Vec<serde_json::Value> = {
            let mut msgs = Vec::new();
            if let Some(system) = &request.system {
                msgs.push(serde_json::json!({
                    "role": "system",
                    "content": system,
                }));
            }
            for m in &request.messages {
                msgs.push(serde_json::json!({
                    "role": match m.role {
                        Role::User => "user",
                        Role::Assistant => "assistant",
                        Role::System => "system",
                    },
                    "content": m.content,
                }));
            }
            msgs
        };

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": messages,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        if let Some(temp) = request.temperature {
            body["temperature"] = serde_json::json!(temp);
        }

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| PromptuneError::Provider {
                provider: self.id_str.clone(),
                message: e.to_string(),
                retriable: e.is_timeout() || e.is_connect(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_ms = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(|secs| secs * 1000)
                .unwrap_or(0);
            return Err(PromptuneError::RateLimited {
                provider: self.id_str.clone(),
                retry_after_ms,
            });
        }

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(PromptuneError::Provider {
                provider: self.id_str.clone(),
                message: format!("HTTP {status}: {error_body}"),
                retriable: status.is_server_error(),
            });
        }

        let resp: serde_json::Value =
            response.json().await.map_err(|e| PromptuneError::Provider {
                provider: self.id_str.clone(),
                message: format!("Failed to parse response: {}", e),
                retriable: false,
            })?;

        let content = resp["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string();

        let usage = TokenUsage {
            input_tokens: resp["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
            output_tokens: resp["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
        };

        let stop_reason = match resp["choices"][0]["finish_reason"].as_str() {
            Some("stop") => StopReason::EndTurn,
            Some("length") => StopReason::MaxTokens,
            _ => StopReason::Unknown,
        };

        Ok(ChatResponse {
            content,
            usage,
            stop_reason,
        })
    }
}
