use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// Completion stub that fails on chosen call indices
struct FlakyCompletion {
    calls: AtomicUsize,
    fail_on: Vec<usize>,
}

impl FlakyCompletion {
    fn new(fail_on: Vec<usize>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_on,
        }
    }
}

impl TextCompletion for FlakyCompletion {
    fn complete(&self, _prompt: &str) -> Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on.contains(&call) {
            anyhow::bail!("simulated model failure");
        }
        Ok(format!("Context for call {call}."))
    }
}

fn test_contextualizer(fail_on: Vec<usize>) -> Contextualizer {
    let temp_dir = TempDir::new().expect("can create temp dir");
    let template =
        PromptTemplate::contextual_chunk(temp_dir.path()).expect("builtin template loads");
    Contextualizer::new(Box::new(FlakyCompletion::new(fail_on)), template)
}

#[test]
fn description_is_prepended_to_chunk() {
    let contextualizer = test_contextualizer(vec![]);
    let chunks = vec!["Cows drop leather.".to_string()];

    let augmented = contextualizer.contextualize_chunks("# Cow\nFull page.", &chunks);

    assert_eq!(augmented.len(), 1);
    assert_eq!(augmented[0], "Context for call 0.\n\nCows drop leather.");
}

#[test]
fn failed_chunk_falls_back_to_bare_text() {
    let contextualizer = test_contextualizer(vec![1]);
    let chunks = vec![
        "First chunk.".to_string(),
        "Second chunk.".to_string(),
        "Third chunk.".to_string(),
    ];

    let augmented = contextualizer.contextualize_chunks("doc", &chunks);

    assert_eq!(augmented.len(), 3);
    assert!(augmented[0].ends_with("First chunk."));
    assert_eq!(augmented[1], "Second chunk.");
    assert!(augmented[2].ends_with("Third chunk."));
}

#[test]
fn output_preserves_length_and_order_when_all_fail() {
    let contextualizer = test_contextualizer(vec![0, 1]);
    let chunks = vec!["A.".to_string(), "B.".to_string()];

    let augmented = contextualizer.contextualize_chunks("doc", &chunks);

    assert_eq!(augmented, chunks);
}
