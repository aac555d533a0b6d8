//! Known-model catalog with task-based hints
//!
//! An advisory table of the models each stock provider serves, plus simple
//! prompt-keyword task inference. Hints influence which model a caller may
//! pin via `model_preference`; they never change how providers are selected.

/// One known model and its rough capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelEntry {
    /// Provider serving this model
    pub provider: &'static str,
    /// Model identifier as sent on the wire
    pub model: &'static str,
    /// Context window in tokens
    pub context_window: u32,
    /// Capability tags
    pub capabilities: &'static [&'static str],
}

const CATALOG: &[ModelEntry] = &[
    ModelEntry {
        provider: "groq",
        model: "llama3-8b-8192",
        context_window: 8_192,
        capabilities: &["chat", "speed"],
    },
    ModelEntry {
        provider: "groq",
        model: "llama3-70b-8192",
        context_window: 8_192,
        capabilities: &["chat", "reasoning", "coding"],
    },
    ModelEntry {
        provider: "groq",
        model: "mixtral-8x7b-32768",
        context_window: 32_768,
        capabilities: &["chat", "reasoning", "coding", "multilingual"],
    },
    ModelEntry {
        provider: "openai",
        model: "gpt-4",
        context_window: 128_000,
        capabilities: &["chat", "reasoning", "coding", "creative"],
    },
    ModelEntry {
        provider: "openai",
        model: "gpt-3.5-turbo",
        context_window: 16_384,
        capabilities: &["chat", "speed"],
    },
    ModelEntry {
        provider: "anthropic",
        model: "claude-3-opus-20240229",
        context_window: 200_000,
        capabilities: &["chat", "reasoning", "creative", "large_context"],
    },
    ModelEntry {
        provider: "gemini",
        model: "gemini-pro",
        context_window: 1_000_000,
        capabilities: &["chat", "multimodal", "large_context"],
    },
];

// Task preference order mirrors observed model strengths, best first.
const TASK_PREFERENCES: &[(&str, &[&str])] = &[
    ("coding", &["mixtral-8x7b-32768", "gpt-4", "llama3-70b-8192"]),
    ("reasoning", &["claude-3-opus-20240229", "gpt-4", "llama3-70b-8192"]),
    ("creative", &["claude-3-opus-20240229", "gpt-4"]),
    ("large_context", &["gemini-pro", "claude-3-opus-20240229"]),
    ("speed", &["llama3-8b-8192", "gpt-3.5-turbo"]),
];

/// Static model catalog
pub struct ModelCatalog;

impl ModelCatalog {
    /// All known models
    pub fn entries() -> &'static [ModelEntry] {
        CATALOG
    }

    /// Models served by one provider
    pub fn models_for(provider: &str) -> Vec<&'static ModelEntry> {
        CATALOG.iter().filter(|e| e.provider == provider).collect()
    }

    /// Look up a model by identifier
    pub fn get(model: &str) -> Option<&'static ModelEntry> {
        CATALOG.iter().find(|e| e.model == model)
    }

    /// Best known model for a task tag
    pub fn model_for_task(task: &str) -> Option<&'static ModelEntry> {
        let (_, preferred) = TASK_PREFERENCES.iter().find(|(t, _)| *t == task)?;
        preferred.iter().find_map(|model| Self::get(model))
    }

    /// Infer a task tag from prompt keywords
    pub fn infer_task(prompt: &str) -> Option<&'static str> {
        let prompt = prompt.to_lowercase();
        if ["code", "function", "api", "programming"]
            .iter()
            .any(|w| prompt.contains(w))
        {
            Some("coding")
        } else if ["reason", "math", "logic", "prove"]
            .iter()
            .any(|w| prompt.contains(w))
        {
            Some("reasoning")
        } else if ["write", "story", "creative", "poem"]
            .iter()
            .any(|w| prompt.contains(w))
        {
            Some("creative")
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_models_for_provider() {
        let groq = ModelCatalog::models_for("groq");
        assert_eq!(groq.len(), 3);
        assert!(groq.iter().all(|e| e.provider == "groq"));
        assert!(ModelCatalog::models_for("unknown").is_empty());
    }

    #[test]
    fn test_model_for_task() {
        let entry = ModelCatalog::model_for_task("coding").unwrap();
        assert_eq!(entry.model, "mixtral-8x7b-32768");

        let entry = ModelCatalog::model_for_task("large_context").unwrap();
        assert!(entry.context_window >= 200_000);

        assert!(ModelCatalog::model_for_task("juggling").is_none());
    }

    #[test]
    fn test_infer_task() {
        assert_eq!(
            ModelCatalog::infer_task("Write a Python function to sort a list"),
            Some("coding")
        );
        assert_eq!(
            ModelCatalog::infer_task("Solve this math puzzle"),
            Some("reasoning")
        );
        assert_eq!(ModelCatalog::infer_task("What's the capital of France?"), None);
    }
}
