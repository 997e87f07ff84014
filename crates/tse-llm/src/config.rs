/// Configuration for the structured-output chat model backing every
/// worker and consensus node.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub model_name: String,
    pub max_output_tokens: u32,
    pub top_p: f32,
    pub thinking: bool,
    pub proxy_url: Option<String>,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("TSE_LLM_BASE_URL")
                .unwrap_or_else(|_| "https://integrate.api.nvidia.com/v1".to_string()),
            api_key: std::env::var("TSE_LLM_API_KEY").unwrap_or_default(),
            model_name: std::env::var("TSE_LLM_MODEL_NAME")
                .unwrap_or_else(|_| "deepseek-ai/deepseek-v3.1-terminus".to_string()),
            max_output_tokens: std::env::var("TSE_LLM_MAX_TOKENS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20_000),
            top_p: std::env::var("TSE_LLM_TOP_P")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.0),
            thinking: std::env::var("TSE_LLM_THINKING")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            proxy_url: std::env::var("TSE_LLM_PROXY_URL").ok(),
        }
    }
}
