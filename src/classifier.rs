//! Helpfulness classification for group messages
//!
//! The keyword matcher is a placeholder for a model-backed classifier; the
//! trait is the only thing the bot depends on.

use async_trait::async_trait;
use std::sync::Arc;

/// Phrases that mark a message as an attempt to help someone
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "you can",
    "you should",
    "try ",
    "here's how",
    "here is how",
    "solution",
    "fixed by",
    "the answer",
    "documentation",
    "docs",
    "guide",
    "tutorial",
    "for example",
    "step",
];

#[async_trait]
pub trait HelpfulnessClassifier: Send + Sync {
    /// Whether `text` reads as helpful
    async fn classify(&self, text: &str) -> bool;
}

#[async_trait]
impl<T: HelpfulnessClassifier + ?Sized> HelpfulnessClassifier for Arc<T> {
    async fn classify(&self, text: &str) -> bool {
        (**self).classify(text).await
    }
}

/// Case-insensitive substring match against a fixed keyword list
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    keywords: Vec<String>,
}

impl KeywordClassifier {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().to_lowercase())
            .filter(|k| !k.trim().is_empty())
            .collect();
        Self { keywords }
    }

    #[cfg(test)]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    fn matches(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.keywords.iter().any(|k| text.contains(k.as_str()))
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_KEYWORDS)
    }
}

#[async_trait]
impl HelpfulnessClassifier for KeywordClassifier {
    async fn classify(&self, text: &str) -> bool {
        self.matches(text)
    }
}
