#[cfg(test)]
mod tests;

use anyhow::Result;
use tracing::{debug, warn};

use crate::llm::TextCompletion;
use crate::prompts::PromptTemplate;

/// Augments chunks with an LLM-generated situating description.
///
/// The description is prepended to the chunk before embedding, so semantic
/// search matches on both the chunk's own content and a document-level
/// gloss.
pub struct Contextualizer {
    client: Box<dyn TextCompletion>,
    template: PromptTemplate,
}

impl Contextualizer {
    #[inline]
    pub fn new(client: Box<dyn TextCompletion>, template: PromptTemplate) -> Self {
        Self { client, template }
    }

    /// Ask the language model for a one- to two-sentence description of the
    /// chunk's place within the full document.
    #[inline]
    pub fn contextualize(&self, document: &str, chunk: &str) -> Result<String> {
        let prompt = self
            .template
            .render(&[("document", document), ("chunk", chunk)])?;
        let context = self.client.complete(&prompt)?;
        Ok(context.trim().to_string())
    }

    /// Contextualize a document's chunks, prepending each description.
    ///
    /// The language model client retries transient failures internally; a
    /// chunk that still fails is kept without added context so ingestion of
    /// a large corpus completes despite isolated failures. The output always
    /// has the same length and order as the input.
    #[inline]
    pub fn contextualize_chunks(&self, document: &str, chunks: &[String]) -> Vec<String> {
        let mut augmented = Vec::with_capacity(chunks.len());

        for (index, chunk) in chunks.iter().enumerate() {
            match self.contextualize(document, chunk) {
                Ok(context) if !context.is_empty() => {
                    debug!("Contextualized chunk {}/{}", index + 1, chunks.len());
                    augmented.push(format!("{context}\n\n{chunk}"));
                }
                Ok(_) => {
                    warn!("Empty context for chunk {}, keeping chunk as-is", index);
                    augmented.push(chunk.clone());
                }
                Err(e) => {
                    warn!(
                        "Failed to contextualize chunk {}, keeping chunk as-is: {:#}",
                        index, e
                    );
                    augmented.push(chunk.clone());
                }
            }
        }

        augmented
    }
}
