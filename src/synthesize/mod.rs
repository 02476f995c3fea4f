// Speech synthesis architecture
//
// Synthesizers receive a concrete voice id (resolved from the voice catalog by
// the caller) and write audio to a path the caller has already registered.

pub mod edge_tts;

use async_trait::async_trait;
use std::path::Path;

use crate::config::SynthesisConfig;
use crate::error::Result;

/// Main trait for text-to-speech operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Speak `text` with `voice_id`, writing the audio to `output_path`
    async fn synthesize(&self, text: &str, voice_id: &str, output_path: &Path) -> Result<()>;
}

/// Factory for creating synthesizer instances
pub struct SynthesizerFactory;

impl SynthesizerFactory {
    /// Create with default implementation (edge-tts CLI)
    pub fn create_default(config: SynthesisConfig) -> Box<dyn SpeechSynthesizer> {
        Box::new(edge_tts::EdgeTtsSynthesizer::new(config))
    }
}
