use async_trait::async_trait;
use serde_json::Value;

use crate::config::LlmConfig;
use crate::error::{LlmError, LlmResult};

/// Backend-agnostic chat completion surface. `complete` is the plain
/// free-text path (the reporter node's final narrative); `complete_json`
/// additionally asks the backend to constrain its output to `schema`
/// where the backend supports it, and always returns raw text for the
/// caller to parse — constraint support varies by backend and is never
/// assumed to guarantee valid JSON.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> LlmResult<String>;

    async fn complete_json(&self, system_prompt: &str, user_prompt: &str, schema: &Value) -> LlmResult<String>;

    fn backend_name(&self) -> &'static str;
}

/// HTTP-backed provider speaking an OpenAI-compatible chat completions
/// API, matching the shape of the NVIDIA NIM endpoint the pipeline was
/// originally wired against.
pub struct HttpLlmProvider {
    client: reqwest::Client,
    config: LlmConfig,
}

impl HttpLlmProvider {
    pub fn new(config: LlmConfig) -> LlmResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(proxy) = &config.proxy_url {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }
        let client = builder.build()?;
        Ok(Self { client, config })
    }

    async fn chat(&self, system_prompt: &str, user_prompt: &str, force_json: bool) -> LlmResult<String> {
        let mut body = serde_json::json!({
            "model": self.config.model_name,
            "max_tokens": self.config.max_output_tokens,
            "top_p": self.config.top_p,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt},
            ],
            "extra_body": {"chat_template_kwargs": {"thinking": self.config.thinking}},
        });
        if force_json {
            body["response_format"] = serde_json::json!({"type": "json_object"});
        }

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(LlmError::ProviderError(format!("{status}: {text}")));
        }

        let parsed: Value = resp.json().await?;
        parsed["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| LlmError::SchemaMismatch("missing choices[0].message.content".into()))
    }
}

#[async_trait]
impl LlmProvider for HttpLlmProvider {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> LlmResult<String> {
        self.chat(system_prompt, user_prompt, false).await
    }

    async fn complete_json(&self, system_prompt: &str, user_prompt: &str, _schema: &Value) -> LlmResult<String> {
        self.chat(system_prompt, user_prompt, true).await
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}
