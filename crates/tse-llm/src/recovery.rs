use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{LlmError, LlmResult};
use crate::provider::LlmProvider;
use tse_core::{RecoveryMeta, RecoveryRung};

fn schema_directive(schema: &Value, original_prompt: &str) -> String {
    format!(
        "Return ONLY valid JSON matching this schema: {schema}\n\nOriginal prompt: {original_prompt}"
    )
}

/// Structured-output invocation with a three-rung recovery ladder:
///
/// 1. ask the backend for schema-constrained JSON and parse it directly.
/// 2. re-prompt once with an explicit "return ONLY JSON matching this
///    schema" directive wrapping the original prompt.
/// 3. re-prompt again with the same directive, this time via the plain
///    completion path, for backends whose JSON mode rejected the schema
///    itself.
///
/// Propagates the third attempt's error if it too fails to parse.
pub async fn invoke_structured<T: DeserializeOwned>(
    provider: &dyn LlmProvider,
    system_prompt: &str,
    user_prompt: &str,
    schema: &Value,
) -> LlmResult<(T, RecoveryMeta)> {
    match provider.complete_json(system_prompt, user_prompt, schema).await {
        Ok(text) => {
            if let Ok(value) = serde_json::from_str::<T>(&text) {
                return Ok((value, None));
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, "first-try structured invocation failed, recovering");
        }
    }

    let fix_prompt = schema_directive(schema, user_prompt);
    match provider.complete_json(system_prompt, &fix_prompt, schema).await {
        Ok(text) => {
            if let Ok(value) = serde_json::from_str::<T>(&text) {
                return Ok((value, Some(RecoveryRung::FixPrompt)));
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, "fix-prompt recovery failed, falling back to json-only");
        }
    }

    let fallback_prompt = schema_directive(schema, user_prompt);
    let text = provider.complete(system_prompt, &fallback_prompt).await?;
    let value = serde_json::from_str::<T>(&text)
        .map_err(|e| LlmError::SchemaMismatch(format!("final recovery rung failed to parse: {e}")))?;
    Ok((value, Some(RecoveryRung::JsonOnlyFallback)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Report {
        verdict: String,
    }

    struct ScriptedProvider {
        call_count: AtomicUsize,
        responses: Vec<&'static str>,
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn complete(&self, _system_prompt: &str, _user_prompt: &str) -> LlmResult<String> {
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            Ok(self.responses[idx.min(self.responses.len() - 1)].to_string())
        }

        async fn complete_json(&self, system_prompt: &str, user_prompt: &str, _schema: &Value) -> LlmResult<String> {
            self.complete(system_prompt, user_prompt).await
        }

        fn backend_name(&self) -> &'static str {
            "scripted"
        }
    }

    #[tokio::test]
    async fn first_try_success_reports_no_recovery() {
        let provider = ScriptedProvider {
            call_count: AtomicUsize::new(0),
            responses: vec![r#"{"verdict":"buy"}"#],
        };
        let schema = serde_json::json!({"type": "object"});
        let (report, meta): (Report, RecoveryMeta) = invoke_structured(&provider, "sys", "user", &schema).await.unwrap();
        assert_eq!(report, Report { verdict: "buy".into() });
        assert_eq!(meta, None);
    }

    #[tokio::test]
    async fn second_rung_recovers_after_malformed_first_response() {
        let provider = ScriptedProvider {
            call_count: AtomicUsize::new(0),
            responses: vec!["not json at all", r#"{"verdict":"hold"}"#],
        };
        let schema = serde_json::json!({"type": "object"});
        let (report, meta): (Report, RecoveryMeta) = invoke_structured(&provider, "sys", "user", &schema).await.unwrap();
        assert_eq!(report.verdict, "hold");
        assert_eq!(meta, Some(RecoveryRung::FixPrompt));
    }

    #[tokio::test]
    async fn third_rung_propagates_error_when_still_malformed() {
        let provider = ScriptedProvider {
            call_count: AtomicUsize::new(0),
            responses: vec!["still not json", "also not json", "nope"],
        };
        let schema = serde_json::json!({"type": "object"});
        let result: LlmResult<(Report, RecoveryMeta)> = invoke_structured(&provider, "sys", "user", &schema).await;
        assert!(result.is_err());
    }
}
