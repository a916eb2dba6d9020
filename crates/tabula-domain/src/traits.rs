//! Trait definitions for external interactions
//!
//! These traits define the boundaries between domain logic and
//! infrastructure. The engine's entry points receive implementations as
//! explicit dependencies so everything is testable with fakes; there are no
//! ambient singletons.

use crate::template::{Template, TemplateId};

/// Trait for the external text-generation service
///
/// Implemented by the infrastructure layer (tabula-llm). The engine owns
/// prompt construction and response parsing only; the provider owns the
/// transport.
pub trait TextGenerator {
    /// Error type for generation operations
    type Error;

    /// Generate a completion from a system prompt plus a user prompt
    fn generate(&self, system: &str, prompt: &str) -> Result<String, Self::Error>;
}

/// Trait for storing and retrieving templates with optimistic concurrency
///
/// A write is accepted only when the caller's base version matches the
/// currently stored version; otherwise the implementation must reject the
/// write and leave the stored template unchanged.
pub trait TemplateStore {
    /// Error type for store operations
    type Error;

    /// Fetch a template by id
    fn get(&self, id: TemplateId) -> Result<Option<Template>, Self::Error>;

    /// Insert a new template, rejecting duplicates
    fn insert(&mut self, template: Template) -> Result<TemplateId, Self::Error>;

    /// Replace a template's contents if `base_version` matches the stored
    /// version; returns the new version on success
    fn update(&mut self, template: Template, base_version: u64) -> Result<u64, Self::Error>;

    /// List all stored templates
    fn list(&self) -> Result<Vec<Template>, Self::Error>;
}
