// Transcription architecture
//
// The pipeline only depends on the Transcriber trait. The default implementation
// drives the OpenAI Whisper command-line tool; other speech-to-text services can
// be added as further implementations selected by the factory.

pub mod whisper;

use async_trait::async_trait;
use std::path::Path;

use crate::config::TranscriberConfig;
use crate::error::Result;
use crate::models::Transcript;

/// Main trait for transcription operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe an audio file with the given model profile
    async fn transcribe(&self, audio_path: &Path, model: &str) -> Result<Transcript>;
}

/// Factory for creating transcriber instances
pub struct TranscriberFactory;

impl TranscriberFactory {
    /// Create with default implementation (OpenAI Whisper CLI)
    pub fn create_default(config: TranscriberConfig) -> Box<dyn Transcriber> {
        Box::new(whisper::WhisperTranscriber::new(config))
    }
}
