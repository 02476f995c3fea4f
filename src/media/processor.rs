use async_trait::async_trait;
use std::path::Path;
use std::process::Command;
use tracing::{debug, info};

use crate::config::MediaConfig;
use crate::error::{DubError, Result};
use crate::models::MediaInfo;
use crate::reconcile::AudioAdjustment;
use super::probe::parse_probe_output;
use super::{MediaCommandBuilder, MediaProcessorTrait, MuxOptions};

/// Concrete implementation of media processor (FFmpeg-based)
pub struct MediaProcessorImpl {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
}

impl MediaProcessorImpl {
    /// Create a new media processor implementation
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.ffmpeg_path, &config.ffprobe_path);

        Self {
            config,
            command_builder,
        }
    }
}

#[async_trait]
impl MediaProcessorTrait for MediaProcessorImpl {
    async fn probe(&self, path: &Path) -> Result<MediaInfo> {
        debug!("Probing {}", path.display());

        if !path.exists() {
            return Err(DubError::Probe(format!("File not readable: {}", path.display())));
        }

        let json = self
            .command_builder
            .probe(path)
            .execute_capture(DubError::Probe)
            .await?;

        parse_probe_output(&json)
    }

    async fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> Result<()> {
        info!("Extracting audio from {} to {}", video_path.display(), audio_path.display());

        self.command_builder
            .extract_audio(video_path, audio_path)
            .execute(DubError::Extraction)
            .await?;

        info!("Audio extraction completed");
        Ok(())
    }

    async fn apply_tempo(
        &self,
        input_path: &Path,
        output_path: &Path,
        adjustment: &AudioAdjustment,
    ) -> Result<()> {
        info!(
            "Adjusting tempo of {} (playback rate {:.3}, filter {})",
            input_path.display(),
            adjustment.playback_rate,
            adjustment.filter_chain()
        );

        self.command_builder
            .apply_tempo(input_path, output_path, adjustment)
            .execute(DubError::Tempo)
            .await
    }

    async fn render_silence(&self, output_path: &Path, seconds: f64) -> Result<()> {
        debug!("Rendering {:.3}s of silence to {}", seconds, output_path.display());

        self.command_builder
            .render_silence(output_path, seconds)
            .execute(DubError::Synthesis)
            .await
    }

    async fn mux(
        &self,
        video_path: &Path,
        audio_path: &Path,
        output_path: &Path,
        options: &MuxOptions,
    ) -> Result<()> {
        info!(
            "Muxing video {} with audio {} -> {} (video {}, audio {})",
            video_path.display(),
            audio_path.display(),
            output_path.display(),
            options.video_codec,
            options.audio_codec
        );

        self.command_builder
            .mux(video_path, audio_path, output_path, options)
            .execute(DubError::Mux)
            .await?;

        info!("Mux completed successfully");
        Ok(())
    }

    /// Check that both ffmpeg and ffprobe can be executed
    fn check_availability(&self) -> Result<()> {
        for binary in [&self.config.ffmpeg_path, &self.config.ffprobe_path] {
            let output = Command::new(binary)
                .arg("-version")
                .output()
                .map_err(|e| DubError::Config(format!("Media tool '{}' not found: {}", binary, e)))?;

            if !output.status.success() {
                return Err(DubError::Config(format!("Media tool '{}' version check failed", binary)));
            }
        }

        info!("Media processor is available");
        Ok(())
    }

    async fn get_version_info(&self) -> Result<String> {
        let stdout = self
            .command_builder
            .version_check(self.command_builder.ffmpeg_path())
            .execute_capture(DubError::Config)
            .await?;

        // The first line carries the version
        Ok(stdout.lines().next().unwrap_or("Unknown version").to_string())
    }
}
