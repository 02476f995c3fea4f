// Modular media processing architecture
//
// This module provides a clean abstraction over the media operations of a dub run:
// - Processor: ffmpeg/ffprobe implementation of the trait
// - Commands: command builders and process execution
// - Probe: parsing of ffprobe output

pub mod commands;
pub mod probe;
pub mod processor;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use commands::*;
pub use processor::*;

use crate::config::MediaConfig;
use crate::error::Result;
use crate::models::MediaInfo;
use crate::reconcile::AudioAdjustment;

/// Codec and duration policy for the final mux
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MuxOptions {
    pub video_codec: String,
    pub audio_codec: String,
    pub extend_to_longest: bool,
}

impl From<&MediaConfig> for MuxOptions {
    fn from(config: &MediaConfig) -> Self {
        Self {
            video_codec: config.video_codec.clone(),
            audio_codec: config.audio_codec.clone(),
            extend_to_longest: config.extend_to_longest,
        }
    }
}

/// Main trait for media processing operations
#[async_trait]
pub trait MediaProcessorTrait: Send + Sync {
    /// Report container duration and stream layout
    async fn probe(&self, path: &Path) -> Result<MediaInfo>;

    /// Extract the audio track as 16 kHz mono PCM
    async fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> Result<()>;

    /// Re-render audio with leading trim and pitch-preserving tempo change
    async fn apply_tempo(
        &self,
        input_path: &Path,
        output_path: &Path,
        adjustment: &AudioAdjustment,
    ) -> Result<()>;

    /// Write a silent clip of the given length
    async fn render_silence(&self, output_path: &Path, seconds: f64) -> Result<()>;

    /// Combine the video stream of one file with the audio stream of another
    async fn mux(
        &self,
        video_path: &Path,
        audio_path: &Path,
        output_path: &Path,
        options: &MuxOptions,
    ) -> Result<()>;

    /// Check if media processor is available
    fn check_availability(&self) -> Result<()>;

    /// Get media processor version information
    async fn get_version_info(&self) -> Result<String>;
}

/// Factory for creating media processor instances
pub struct MediaProcessorFactory;

impl MediaProcessorFactory {
    /// Create the default media processor implementation (FFmpeg-based)
    pub fn create_processor(config: MediaConfig) -> Box<dyn MediaProcessorTrait> {
        Box::new(processor::MediaProcessorImpl::new(config))
    }
}
