
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result, bail};
use fancy_regex::Regex;
use tracing::debug;

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z_]+)\}").expect("placeholder pattern is valid"));

const CONTEXTUAL_CHUNK_DEFAULT: &str = include_str!("templates/contextual_chunk.txt");
const ANSWER_DEFAULT: &str = include_str!("templates/answer.txt");

/// A plain-text prompt template with `{placeholder}` substitution.
///
/// Defaults are compiled in; a file of the same name under the configured
/// prompts directory overrides the default. Treated as configuration and
/// loaded once at startup.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    name: String,
    text: String,
}

impl PromptTemplate {
    /// Load the contextual-chunk template ({document}, {chunk})
    #[inline]
    pub fn contextual_chunk(prompts_dir: &Path) -> Result<Self> {
        Self::load("contextual_chunk", CONTEXTUAL_CHUNK_DEFAULT, prompts_dir)
    }

    /// Load the answer template ({context}, {query})
    #[inline]
    pub fn answer(prompts_dir: &Path) -> Result<Self> {
        Self::load("answer", ANSWER_DEFAULT, prompts_dir)
    }

    fn load(name: &str, default: &str, prompts_dir: &Path) -> Result<Self> {
        let override_path = prompts_dir.join(format!("{name}.txt"));

        let text = if override_path.exists() {
            debug!("Loading prompt template from {}", override_path.display());
            std::fs::read_to_string(&override_path).with_context(|| {
                format!(
                    "Failed to read prompt template: {}",
                    override_path.display()
                )
            })?
        } else {
            default.to_string()
        };

        Ok(Self {
            name: name.to_string(),
            text,
        })
    }

    /// Substitute named placeholders and return the rendered prompt.
    ///
    /// Every `{placeholder}` in the template must be covered by `vars`;
    /// leftovers are an error so a typo in an override file cannot silently
    /// reach the language model.
    #[inline]
    pub fn render(&self, vars: &[(&str, &str)]) -> Result<String> {
        let mut rendered = self.text.clone();
        for (key, value) in vars {
            rendered = rendered.replace(&format!("{{{key}}}"), value);
        }

        // Only check the part of the output that came from the template
        // itself; substituted values may legitimately contain braces
        let mut probe = self.text.clone();
        for (key, _) in vars {
            probe = probe.replace(&format!("{{{key}}}"), "");
        }
        if let Ok(Some(m)) = PLACEHOLDER_RE.find(&probe) {
            bail!(
                "Unresolved placeholder {} in prompt template '{}'",
                m.as_str(),
                self.name
            );
        }

        Ok(rendered)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}
