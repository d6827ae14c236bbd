//! Language-model cleanup: send the delimited text to a chat model.
//!
//! This is the only stage with network I/O and the only one whose failure
//! does not fail the run. [`run_analysis`] always returns an
//! [`AnalysisOutcome`]; [`analyze`] and [`resolve_provider`] expose the
//! fallible steps for callers that want the error itself.
//!
//! The credential check happens in [`resolve_provider`], before a provider
//! is constructed, so a missing key never results in a request.

use crate::config::{AnalysisConfig, ProviderKind};
use crate::error::Pdf2CsvError;
use crate::output::AnalysisOutcome;
use crate::prompts::analysis_prompt;
use edgequake_llm::{
    AnthropicProvider, ChatMessage, CompletionOptions, GeminiProvider, LLMProvider, OpenAIProvider,
    ProviderFactory,
};
use std::path::Path;
use std::sync::Arc;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

/// Run the whole analysis step and capture any failure in the outcome.
///
/// On success the response is written verbatim to `output_path`.
pub async fn run_analysis(
    csv_content: &str,
    output_path: &Path,
    config: &AnalysisConfig,
) -> AnalysisOutcome {
    if !config.enabled {
        debug!("Analysis disabled; skipping");
        return AnalysisOutcome::Skipped;
    }

    let result = async {
        let provider = resolve_provider(config)?;
        let text = analyze(&provider, csv_content, config).await?;
        persist_analysis(&text, output_path).await?;
        Ok::<_, Pdf2CsvError>(text)
    }
    .await;

    match result {
        Ok(text) => {
            info!("Saved analysis to {}", output_path.display());
            AnalysisOutcome::Completed {
                path: output_path.to_path_buf(),
                text,
            }
        }
        Err(e) => {
            warn!("Analysis failed: {}", e);
            AnalysisOutcome::Failed {
                error: e.to_string(),
            }
        }
    }
}

/// Resolve the chat provider.
///
/// 1. **Pre-built provider** (`config.provider`): used as-is.
/// 2. **Keyed service** (Gemini, OpenAI, Anthropic): the key is read from
///    [`AnalysisConfig::credential_var`] and handed to the provider. An unset
///    or empty variable is [`Pdf2CsvError::ServiceAuth`], raised before
///    anything is built.
/// 3. **Ollama**: built from `OLLAMA_HOST` by the provider factory.
pub fn resolve_provider(config: &AnalysisConfig) -> Result<Arc<dyn LLMProvider>, Pdf2CsvError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let model = config.model.as_str();
    let provider: Arc<dyn LLMProvider> = match config.provider_kind {
        ProviderKind::Gemini => Arc::new(GeminiProvider::new(read_credential(config)?).with_model(model)),
        ProviderKind::OpenAI => Arc::new(OpenAIProvider::new(read_credential(config)?).with_model(model)),
        ProviderKind::Anthropic => {
            Arc::new(AnthropicProvider::new(read_credential(config)?).with_model(model))
        }
        ProviderKind::Ollama => {
            ProviderFactory::create_llm_provider(ProviderKind::Ollama.as_str(), model).map_err(
                |e| Pdf2CsvError::ServiceAuth {
                    provider: config.provider_kind.to_string(),
                    hint: format!("{e}"),
                },
            )?
        }
    };
    debug!("Analysis provider: {} ({})", provider.name(), provider.model());
    Ok(provider)
}

/// The non-empty key held by the provider's credential variable.
fn read_credential(config: &AnalysisConfig) -> Result<String, Pdf2CsvError> {
    let missing = |var: &str| Pdf2CsvError::ServiceAuth {
        provider: config.provider_kind.to_string(),
        hint: format!(
            "API key not found. Set the {var} environment variable (a .env file works too)."
        ),
    };
    let Some(var) = config.credential_var() else {
        return Err(missing("provider's API key"));
    };
    std::env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| missing(var))
}

/// Delay before retry `attempt` (1-based): `base_ms * 2^(attempt - 1)`, saturating.
fn backoff_delay_ms(base_ms: u64, attempt: u32) -> u64 {
    base_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}

/// Send one prompt and return the response text.
///
/// Retries `config.max_retries` times with exponential backoff
/// (`retry_backoff_ms * 2^(attempt - 1)`, saturating). An empty response counts as a failure.
pub async fn analyze(
    provider: &Arc<dyn LLMProvider>,
    csv_content: &str,
    config: &AnalysisConfig,
) -> Result<String, Pdf2CsvError> {
    let messages = vec![ChatMessage::user(analysis_prompt(csv_content))];
    let options = build_options(config);
    let mut last_err = String::from("Unknown error");

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = backoff_delay_ms(config.retry_backoff_ms, attempt);
            warn!(
                "Analysis: retry {}/{} after {}ms",
                attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        let call = provider.chat(&messages, Some(&options));
        match timeout(Duration::from_secs(config.api_timeout_secs), call).await {
            Ok(Ok(response)) => {
                debug!(
                    "Analysis: {} input tokens, {} output tokens",
                    response.prompt_tokens, response.completion_tokens
                );
                if response.content.trim().is_empty() {
                    last_err = "service returned an empty response".to_string();
                    warn!("Analysis: attempt {}: {}", attempt + 1, last_err);
                    continue;
                }
                return Ok(response.content);
            }
            Ok(Err(e)) => {
                last_err = format!("{e}");
                warn!("Analysis: attempt {} failed: {}", attempt + 1, last_err);
            }
            Err(_) => {
                last_err = format!("call timed out after {}s", config.api_timeout_secs);
                warn!("Analysis: attempt {}: {}", attempt + 1, last_err);
            }
        }
    }

    Err(Pdf2CsvError::ServiceResponse { message: last_err })
}

/// Write the response verbatim to `path`.
pub async fn persist_analysis(text: &str, path: &Path) -> Result<(), Pdf2CsvError> {
    tokio::fs::write(path, text.as_bytes())
        .await
        .map_err(|e| Pdf2CsvError::io(path, e))
}

fn build_options(config: &AnalysisConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}
