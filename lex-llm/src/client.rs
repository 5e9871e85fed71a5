//! Structured-output LLM RPC client (§4.6).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use lex_cache::{cache_key, Cache};
use lex_core::{LexError, LexResult, LlmConfig, LlmError, ModelTier};
use lex_ratelimit::{HostLimits, RateLimiter};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{instrument, warn};

use crate::templates::TemplateRegistry;
use crate::tiering::token_budget;
use crate::types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, EmbeddingRequest, EmbeddingResponse,
    JsonSchemaSpec, ResponseFormat,
};
use crate::Usage;

/// Responses are cached for at least 24 hours (§4.6 "Response caching").
const LLM_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const NAMESPACE: &str = "llm:response";
const BASE_URL: &str = "https://api.openai.com/v1";
const LLM_HOST: &str = "api.openai.com";

/// A structured-output call: which template/vars to render, which tier to
/// run it at, the JSON schema the response must satisfy, and how many
/// output tokens the caller expects to need (used to compute the
/// tier-appropriate token-budget field, §4.6).
pub struct ChatRequest<'a> {
    pub template: &'a str,
    pub vars: HashMap<&'a str, String>,
    pub tier: ModelTier,
    pub schema_name: &'a str,
    pub schema: serde_json::Value,
    pub requested_tokens: u32,
    /// `false` bypasses the response cache — used sparingly (e.g. a
    /// force-refresh that legitimately wants a fresh clustering/synthesis
    /// pass even though the prompt hasn't changed).
    pub cacheable: bool,
}

/// A structured value plus whatever usage accounting came back with it.
/// `usage` is `None` whenever the response didn't carry one, which is
/// explicitly non-fatal per §4.6.
#[derive(Debug, Clone)]
pub struct StructuredOutput<T> {
    pub value: T,
    pub usage: Option<Usage>,
}

/// The structured-output RPC client (§4.6). One instance is shared
/// process-wide; per-tier semaphores bound concurrency (§5 "LLM client:
/// reentrant; concurrency is bounded by a semaphore per tier").
pub struct LlmClient {
    http: Client,
    config: LlmConfig,
    cache: Arc<Cache>,
    templates: TemplateRegistry,
    tier_semaphores: HashMap<ModelTier, Arc<Semaphore>>,
    limiter: Arc<RateLimiter>,
}

impl LlmClient {
    pub fn new(config: LlmConfig, cache: Arc<Cache>) -> Self {
        let tier_semaphores = [ModelTier::Low, ModelTier::Medium, ModelTier::High]
            .into_iter()
            .map(|tier| (tier, Arc::new(Semaphore::new(8))))
            .collect();

        Self {
            http: Client::new(),
            config,
            cache,
            templates: TemplateRegistry::standard(),
            tier_semaphores,
            limiter: Arc::new(RateLimiter::new(HostLimits {
                requests_per_second: 10.0,
                max_concurrent: 8,
            })),
        }
    }

    /// Render `request.template`, call the tier-selected model with a
    /// strict JSON-schema response format, and deserialize the result into
    /// `T`. Identical concurrent calls (same rendered prompt, schema, and
    /// tier) coalesce onto one in-flight request via the cache's
    /// `get_or_build` primitive (§4.6 "Request coalescing").
    #[instrument(skip(self, request), fields(template = request.template, tier = %request.tier))]
    pub async fn chat_structured<T>(&self, request: ChatRequest<'_>) -> LexResult<StructuredOutput<T>>
    where
        T: DeserializeOwned + Serialize,
    {
        let template = self.templates.get(request.template)?;
        let rendered = template.render(&request.vars)?;

        let model_spec = self
            .config
            .model_tier_map
            .get(&request.tier)
            .ok_or_else(|| LexError::Llm(LlmError::TierNotConfigured {
                tier: request.tier.to_string(),
            }))?
            .clone();

        let budget = token_budget(model_spec.completion_token_budget, request.requested_tokens);

        let key = cache_key(
            NAMESPACE,
            &[
                request.template,
                request.schema_name,
                &request.tier.to_string(),
                &rendered,
            ],
        );

        let semaphore = Arc::clone(
            self.tier_semaphores
                .get(&request.tier)
                .expect("every ModelTier has a semaphore"),
        );

        let ttl = request.cacheable.then_some(LLM_CACHE_TTL);
        let schema_name = request.schema_name.to_string();
        let schema = request.schema.clone();
        let model_id = model_spec.model_id.clone();
        let api_key = self.config.api_key.clone();
        let http = self.http.clone();
        let limiter = Arc::clone(&self.limiter);

        let envelope: RawOutputEnvelope = if request.cacheable {
            self.cache
                .get_or_build_json(NAMESPACE, &key, ttl, || async move {
                    call_model(&http, &limiter, &api_key, &model_id, &rendered, &schema_name, schema, budget, semaphore).await
                })
                .await?
        } else {
            call_model(&http, &limiter, &api_key, &model_id, &rendered, &schema_name, schema, budget, semaphore).await?
        };

        let value: T = serde_json::from_str(&envelope.content).map_err(|e| {
            LexError::Llm(LlmError::SchemaViolation { reason: e.to_string() })
        })?;

        Ok(StructuredOutput { value, usage: envelope.usage })
    }

    /// Embed a query for the resolver's semantic leg (§4.4 step 4). Not
    /// itself part of the structured-output contract, but shares the same
    /// client, cache, and rate limiting as the chat path.
    #[instrument(skip(self, text))]
    pub async fn embed(&self, text: &str) -> LexResult<Vec<f32>> {
        let key = cache_key("llm:embedding", &[&self.config.embedding_model, text]);
        let model = self.config.embedding_model.clone();
        let api_key = self.config.api_key.clone();
        let http = self.http.clone();
        let limiter = Arc::clone(&self.limiter);
        let text = text.to_string();

        self.cache
            .get_or_build_json(
                "llm:embedding",
                &key,
                Some(LLM_CACHE_TTL),
                || async move { call_embedding(&http, &limiter, &api_key, &model, &text).await },
            )
            .await
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct RawOutputEnvelope {
    content: String,
    usage: Option<Usage>,
}

#[allow(clippy::too_many_arguments)]
async fn call_model(
    http: &Client,
    limiter: &RateLimiter,
    api_key: &str,
    model_id: &str,
    rendered_prompt: &str,
    schema_name: &str,
    schema: serde_json::Value,
    budget: crate::tiering::TokenBudget,
    semaphore: Arc<Semaphore>,
) -> LexResult<RawOutputEnvelope> {
    let _permit = semaphore
        .acquire_owned()
        .await
        .map_err(|e| LexError::Internal(format!("llm tier semaphore closed: {e}")))?;
    let rate_permit = limiter.acquire(LLM_HOST).await;

    let (max_tokens, max_completion_tokens) = match budget {
        crate::tiering::TokenBudget::MaxTokens(v) => (Some(v), None),
        crate::tiering::TokenBudget::MaxCompletionTokens(v) => (None, Some(v)),
    };

    let body = ChatCompletionRequest {
        model: model_id.to_string(),
        messages: vec![ChatMessage { role: "user", content: rendered_prompt.to_string() }],
        response_format: ResponseFormat {
            kind: "json_schema",
            json_schema: JsonSchemaSpec {
                name: schema_name.to_string(),
                schema,
                strict: true,
            },
        },
        max_tokens,
        max_completion_tokens,
    };

    let response = http
        .post(format!("{BASE_URL}/chat/completions"))
        .bearer_auth(api_key)
        .json(&body)
        .send()
        .await
        .map_err(|e| LexError::Llm(LlmError::RequestFailed { reason: e.to_string() }))?;

    let status = response.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after_ms = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .map(|secs| secs * 1000);
        rate_permit.record_rate_limited(retry_after_ms.map(Duration::from_millis));
        return Err(LexError::Llm(LlmError::RateLimited { retry_after_ms }));
    }
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), body = %text, "llm request failed");
        rate_permit.record_success();
        return Err(LexError::Llm(LlmError::RequestFailed {
            reason: format!("status {status}: {text}"),
        }));
    }
    rate_permit.record_success();

    let parsed: ChatCompletionResponse = response
        .json()
        .await
        .map_err(|e| LexError::Llm(LlmError::RequestFailed { reason: e.to_string() }))?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or_else(|| LexError::Llm(LlmError::RequestFailed { reason: "empty choices".to_string() }))?;

    let usage = parsed.usage.map(|u| Usage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });

    Ok(RawOutputEnvelope { content, usage })
}

async fn call_embedding(
    http: &Client,
    limiter: &RateLimiter,
    api_key: &str,
    model: &str,
    text: &str,
) -> LexResult<Vec<f32>> {
    let body = EmbeddingRequest { model: model.to_string(), input: vec![text.to_string()] };
    let rate_permit = limiter.acquire(LLM_HOST).await;

    let response = http
        .post(format!("{BASE_URL}/embeddings"))
        .bearer_auth(api_key)
        .json(&body)
        .send()
        .await
        .map_err(|e| LexError::Llm(LlmError::RequestFailed { reason: e.to_string() }))?;

    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        rate_permit.record_success();
        return Err(LexError::Llm(LlmError::RequestFailed {
            reason: format!("status {status}: {text}"),
        }));
    }
    rate_permit.record_success();

    let parsed: EmbeddingResponse = response
        .json()
        .await
        .map_err(|e| LexError::Llm(LlmError::RequestFailed { reason: e.to_string() }))?;

    parsed
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .ok_or_else(|| LexError::Llm(LlmError::RequestFailed { reason: "empty embedding data".to_string() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lex_core::LexConfig;

    fn test_cache() -> (Arc<Cache>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = LexConfig::development().cache;
        settings.disk_root = dir.path().to_string_lossy().to_string();
        (Arc::new(Cache::open(&settings).unwrap()), dir)
    }

    #[test]
    fn client_construction_builds_one_semaphore_per_tier() {
        let (cache, _dir) = test_cache();
        let client = LlmClient::new(LexConfig::development().llm, cache);
        assert_eq!(client.tier_semaphores.len(), 3);
    }
}
