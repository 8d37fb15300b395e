// src/provider/ollama.rs — Ollama local model provider

use async_trait::async_trait;

use super::{ChatRequest, ChatResponse, ModelProvider, Role, StopReason, TokenUsage};
use crate::infra::errors::PromptuneError;

pub struct OllamaProvider {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(base_url: Option<String>) -> Self {
        Self {
            base_url: base_url.unwrap_or_else(|| "http://localhost:11434".into()),
            client: reqwest::Client::new(),
        }
    }

    /// Check whether a local Ollama daemon is reachable and list its models.
    pub async fn probe(&self) -> Result<Vec<String>, PromptuneError> {
        let resp = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(std::time::Duration::from_secs(3))
            .send()
            .await
            .map_err(|e| PromptuneError::Provider {
                provider: "ollama".into(),
                message: format!("Cannot reach Ollama: {}", e),
                retriable: false,
            })?;

        let body: serde_json::Value = resp.json().await.map_err(|e| PromptuneError::Provider {
            provider: "ollama".into(),
            message: format!("Invalid Ollama response: {}", e),
            retriable: false,
        })?;

        let models: Vec<String> = body["models"]
            .as_array()
            .unwrap_or(&vec![])
            .iter()
            .filter_map(|m| m["name"].as_str().map(|s| s.to_string()))
            .collect();

        Ok(models)
    }

    pub fn pick_best_model(models: &[String]) -> String {
        let priority = ["llama3.3", "llama3.1", "qwen2.5", "mistral", "gemma2"];
        for preferred in &priority {
            if let Some(m) = models.iter().find(|m| m.contains(preferred)) {
                return m.clone();
            }
        }
        models.first().cloned().unwrap_or_else(|| "llama3.3".into())
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl ModelProvider for OllamaProvider {
    fn id(&self) -> &str {
        "ollama"
    }

    fn name(&self) -> &str {
        "Ollama"
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
            "stream": false,
        });

        if let Some(temp) = request.temperature {
            body["options"] = serde_json::json!({ "temperature": temp });
        }

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| PromptuneError::Provider {
                provider: "ollama".into(),
                message: e.to_string(),
                retriable: e.is_timeout() || e.is_connect(),
            })?;

        if !response.status().is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(PromptuneError::Provider {
                provider: "ollama".into(),
                message: format!("HTTP error: {}", error_body),
                retriable: false,
            });
        }

        let resp: serde_json::Value =
            response.json().await.map_err(|e| PromptuneError::Provider {
                provider: "ollama".into(),
                message: format!("Failed to parse response: {}", e),
                retriable: false,
            })?;

        let content = resp["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string();

        let usage = TokenUsage {
            input_tokens: resp["prompt_eval_count"].as_u64().unwrap_or(0) as u32,
            output_tokens: resp["eval_count"].as_u64().unwrap_or(0) as u32,
        };

        Ok(ChatResponse {
            content,
            usage,
            stop_reason: StopReason::EndTurn,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_best_model_priority() {
        let models = vec!["mistral:7b".to_string(), "llama3.3:70b".to_string()];
        assert_eq!(OllamaProvider::pick_best_model(&models), "llama3.3:70b");
    }

    #[test]
    fn test_pick_best_model_fallback_first() {
        let models = vec!["phi4:latest".to_string()];
        assert_eq!(OllamaProvider::pick_best_model(&models), "phi4:latest");
    }

    #[test]
    fn test_pick_best_model_empty() {
        assert_eq!(OllamaProvider::pick_best_model(&[]), "llama3.3");
    }
}
