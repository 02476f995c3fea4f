// OpenAI Whisper command-line implementation

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::TranscriberConfig;
use crate::error::{DubError, Result};
use crate::models::Transcript;
use super::Transcriber;

/// Subset of the JSON written by `whisper --output_format json`
#[derive(Debug, Clone, Deserialize)]
struct WhisperJsonOutput {
    text: String,
    language: Option<String>,
}

pub struct WhisperTranscriber {
    config: TranscriberConfig,
}

impl WhisperTranscriber {
    pub fn new(config: TranscriberConfig) -> Self {
        Self { config }
    }

    /// Check if the whisper command is available
    pub async fn check_availability(&self) -> Result<()> {
        let output = Command::new(&self.config.binary_path)
            .arg("--help")
            .output()
            .await
            .map_err(|e| DubError::Transcription(format!("whisper command not found: {}", e)))?;

        if output.status.success() {
            info!("OpenAI Whisper command-line tool is available");
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(DubError::Transcription(format!(
                "OpenAI Whisper not available. Install with: pip install openai-whisper\nError: {}",
                stderr
            )))
        }
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, audio_path: &Path, model: &str) -> Result<Transcript> {
        info!("Transcribing {} with whisper model '{}'", audio_path.display(), model);

        let metadata = tokio::fs::metadata(audio_path)
            .await
            .map_err(|e| DubError::Transcription(format!("Cannot read audio {}: {}", audio_path.display(), e)))?;
        if metadata.len() == 0 {
            return Err(DubError::Transcription(format!("Audio file is empty: {}", audio_path.display())));
        }

        // Whisper writes its result files into this directory; removed on drop
        let temp_dir = tempfile::tempdir()
            .map_err(|e| DubError::Transcription(format!("Failed to create temp directory: {}", e)))?;
        let output_dir = temp_dir.path();

        let mut cmd = Command::new(&self.config.binary_path);
        cmd.arg(audio_path)
            .arg("--model").arg(model)
            .arg("--task").arg("transcribe")
            .arg("--output_dir").arg(output_dir)
            .arg("--output_format").arg("json")
            .args(&self.config.extra_args)
            .kill_on_drop(true);

        debug!("Executing whisper command: {:?}", cmd);

        let output = cmd
            .output()
            .await
            .map_err(|e| DubError::Transcription(format!("Failed to execute whisper command: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DubError::Transcription(format!(
                "Whisper transcription failed: {}",
                stderr.trim()
            )));
        }

        let audio_stem = audio_path
            .file_stem()
            .ok_or_else(|| DubError::Transcription("Invalid audio filename".to_string()))?;
        let json_file = output_dir.join(format!("{}.json", audio_stem.to_string_lossy()));

        let json_content = tokio::fs::read_to_string(&json_file)
            .await
            .map_err(|e| DubError::Transcription(format!("Failed to read whisper output: {}", e)))?;

        let transcript = parse_whisper_output(&json_content)?;
        info!(
            "Transcription completed: {} characters, detected language '{}'",
            transcript.text.chars().count(),
            transcript.language
        );
        Ok(transcript)
    }
}

pub fn parse_whisper_output(json: &str) -> Result<Transcript> {
    let output: WhisperJsonOutput = serde_json::from_str(json)
        .map_err(|e| DubError::Transcription(format!("Failed to parse whisper JSON: {}", e)))?;

    Ok(Transcript {
        text: output.text.trim().to_string(),
        language: output
            .language
            .map(|l| l.trim().to_lowercase())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| "unknown".to_string()),
    })
}
