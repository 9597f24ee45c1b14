//! Prompt templating for the answer model.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::chunk::Chunk;

const CONTEXT_PLACEHOLDER: &str = "{context}";
const QUERY_PLACEHOLDER: &str = "{query}";

/// A text template with `{context}` and `{query}` placeholders.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    /// Wraps a template string, validating that both placeholders appear.
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        anyhow::ensure!(
            template.contains(CONTEXT_PLACEHOLDER),
            "prompt template is missing the {} placeholder",
            CONTEXT_PLACEHOLDER
        );
        anyhow::ensure!(
            template.contains(QUERY_PLACEHOLDER),
            "prompt template is missing the {} placeholder",
            QUERY_PLACEHOLDER
        );
        Ok(Self { template })
    }

    /// Loads a template from a UTF-8 text file.
    pub fn load(path: &Path) -> Result<Self> {
        let template = fs::read_to_string(path)
            .with_context(|| format!("failed to read prompt template {:?}", path))?;
        Self::new(template).with_context(|| format!("invalid prompt template {:?}", path))
    }

    /// Renders the prompt: chunk texts joined by newlines fill `{context}`,
    /// the user's query fills `{query}`.
    pub fn render(&self, chunks: &[Chunk], query: &str) -> String {
        let context = chunks
            .iter()
            .map(|chunk| chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        self.template
            .replace(CONTEXT_PLACEHOLDER, &context)
            .replace(QUERY_PLACEHOLDER, query)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            template: include_str!("../prompts/prompt_v1.txt").to_string(),
        }
    }
}
