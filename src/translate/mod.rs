// Translation architecture
//
// This module provides translation backends behind one trait:
// - Google: the public translate web endpoint (default)
// - Ollama: a locally served LLM prompted for JSON output

pub mod google;
pub mod ollama;

use async_trait::async_trait;

use crate::config::{TranslateConfig, TranslationBackend};
use crate::error::Result;
use crate::language::Language;

/// Source language value asking the backend to detect the language itself
pub const AUTO_DETECT: &str = "auto";

/// Main trait for translation operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` from `source` (a language code or "auto") into `target`
    async fn translate(&self, text: &str, source: &str, target: Language) -> Result<String>;
}

/// Factory for creating translator instances
pub struct TranslatorFactory;

impl TranslatorFactory {
    /// Create a translator for the configured backend
    pub fn create_translator(config: TranslateConfig) -> Result<Box<dyn Translator>> {
        Ok(match config.backend {
            TranslationBackend::Google => Box::new(google::GoogleTranslator::new(config)?),
            TranslationBackend::Ollama => Box::new(ollama::OllamaTranslator::new(config)?),
        })
    }
}

/// Split `text` into pieces of at most `max_chars` characters, preferring to cut
/// after sentence punctuation, then at whitespace.
pub fn split_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut rest = text.trim();

    while rest.chars().count() > max_chars {
        let limit = rest
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let window = &rest[..limit];

        let cut = window
            .char_indices()
            .filter(|(_, c)| matches!(c, '.' | '!' | '?' | '؟' | '\n'))
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .or_else(|| window.rfind(char::is_whitespace))
            .filter(|&i| i > 0)
            .unwrap_or(limit);

        let chunk = rest[..cut].trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }
        rest = rest[cut..].trim_start();
    }

    if !rest.is_empty() {
        chunks.push(rest.to_string());
    }
    chunks
}
