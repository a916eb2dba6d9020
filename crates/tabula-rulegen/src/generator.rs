//! Core RuleGenerator implementation

use crate::config::GeneratorConfig;
use crate::error::RuleGenerationError;
use crate::parser::parse_generated_rules;
use crate::prompt::{PromptBuilder, SYSTEM_PROMPT};
use crate::summary;
use crate::types::{GeneratedRules, GenerationMetadata};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tabula_domain::traits::TextGenerator;
use tabula_domain::DocumentModel;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// The RuleGenerator proposes extraction rules for a document
///
/// It renders a bounded summary of the document, sends it to the injected
/// text-generation provider, and validates the proposed rules with the same
/// checks applied to user-authored templates. One provider call per
/// invocation; the whole call is a pure function of its input and safe to
/// retry.
pub struct RuleGenerator<G>
where
    G: TextGenerator,
{
    provider: Arc<G>,
    config: GeneratorConfig,
    model_name: String,
}

impl<G> RuleGenerator<G>
where
    G: TextGenerator + Send + Sync + 'static,
    G::Error: std::fmt::Display,
{
    /// Create a new RuleGenerator
    pub fn new(provider: G, config: GeneratorConfig) -> Self {
        Self {
            provider: Arc::new(provider),
            config,
            model_name: "llm".to_string(),
        }
    }

    /// Record the model name stamped into generation metadata
    pub fn with_model_name(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = model_name.into();
        self
    }

    /// Generate extraction rules for a document
    ///
    /// # Errors
    ///
    /// Fails with [`RuleGenerationError`] when the provider is unreachable,
    /// the call times out, the response holds no parseable JSON, or the
    /// JSON is missing the `fields` mapping. Individual invalid fields are
    /// dropped and reported in the result, not treated as fatal.
    pub async fn generate_rules(
        &self,
        doc: &DocumentModel,
        user_guidance: Option<&str>,
    ) -> Result<GeneratedRules, RuleGenerationError> {
        let rendered = summary::render(doc, &self.config);
        let mut builder = PromptBuilder::new(rendered);
        if let Some(guidance) = user_guidance {
            builder = builder.with_guidance(guidance);
        }
        let prompt = builder.build();

        debug!("Rule generation prompt length: {} chars", prompt.len());

        let response = timeout(self.config.generation_timeout(), self.call_provider(prompt))
            .await
            .map_err(|_| RuleGenerationError::Timeout)??;

        debug!("Provider response length: {} chars", response.len());

        let (fields, dropped) = parse_generated_rules(&response)?;

        if !dropped.is_empty() {
            warn!(
                "Dropped {} generated field(s) that failed validation",
                dropped.len()
            );
        }

        let metadata = GenerationMetadata {
            model: self.model_name.clone(),
            generated_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            tables_analyzed: doc.tables.len(),
            key_value_pairs_analyzed: doc.key_value_pairs.len(),
        };

        info!(
            "Generated {} rule(s), dropped {}, from {} table(s) and {} pair(s)",
            fields.len(),
            dropped.len(),
            metadata.tables_analyzed,
            metadata.key_value_pairs_analyzed
        );

        Ok(GeneratedRules {
            fields,
            dropped,
            metadata,
        })
    }

    /// Call the provider off the async runtime
    async fn call_provider(&self, prompt: String) -> Result<String, RuleGenerationError> {
        let provider = Arc::clone(&self.provider);

        // Providers are synchronous; run them on the blocking pool
        tokio::task::spawn_blocking(move || {
            provider
                .generate(SYSTEM_PROMPT, &prompt)
                .map_err(|e| RuleGenerationError::Provider(e.to_string()))
        })
        .await
        .map_err(|e| RuleGenerationError::Provider(format!("Task join error: {}", e)))?
    }
}
