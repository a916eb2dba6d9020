//! Tabula Rule Generation
//!
//! AI-assisted extraction rule proposals: render a bounded summary of a
//! normalized document, delegate to an injected text-generation provider,
//! and parse and validate the returned rule set.
//!
//! # Overview
//!
//! ```text
//! DocumentModel → summary → prompt → provider → parse → validate → GeneratedRules
//! ```
//!
//! The provider's response is untrusted input: every proposed field runs
//! through the same rule validation applied to user-authored templates, and
//! fields that fail are dropped and reported rather than rejecting the
//! whole result. The caller decides whether to persist a proposal as a
//! `Template`.
//!
//! # Example
//!
//! ```no_run
//! use tabula_domain::DocumentModel;
//! use tabula_llm::OllamaProvider;
//! use tabula_rulegen::{GeneratorConfig, RuleGenerator};
//!
//! # async fn example(doc: DocumentModel) -> Result<(), Box<dyn std::error::Error>> {
//! let provider = OllamaProvider::default_endpoint("llama3")?;
//! let generator = RuleGenerator::new(provider, GeneratorConfig::default())
//!     .with_model_name("llama3");
//!
//! let generated = generator.generate_rules(&doc, Some("extract the brand table")).await?;
//! println!("Proposed {} field(s)", generated.fields.len());
//!
//! let template = generated.into_template("brand_leaders");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod generator;
mod parser;
mod prompt;
mod summary;
mod types;

pub use config::GeneratorConfig;
pub use error::RuleGenerationError;
pub use generator::RuleGenerator;
pub use parser::parse_generated_rules;
pub use prompt::{PromptBuilder, SYSTEM_PROMPT};
pub use summary::render as render_summary;
pub use types::{DroppedField, GeneratedRules, GenerationMetadata};
