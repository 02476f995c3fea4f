use async_trait::async_trait;
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::SynthesisConfig;
use crate::error::{DubError, Result};
use super::SpeechSynthesizer;

/// Synthesizer driving the `edge-tts` command-line tool
pub struct EdgeTtsSynthesizer {
    config: SynthesisConfig,
}

impl EdgeTtsSynthesizer {
    pub fn new(config: SynthesisConfig) -> Self {
        Self { config }
    }

    pub async fn check_availability(&self) -> Result<()> {
        let output = Command::new(&self.config.binary_path)
            .arg("--help")
            .output()
            .await
            .map_err(|e| DubError::Synthesis(format!("edge-tts command not found: {}", e)))?;

        if output.status.success() {
            info!("edge-tts command-line tool is available");
            Ok(())
        } else {
            Err(DubError::Synthesis(format!(
                "edge-tts availability check failed ({})",
                output.status
            )))
        }
    }

    fn build_command(&self, voice_id: &str, output_path: &Path) -> Command {
        let mut cmd = Command::new(&self.config.binary_path);
        cmd.arg("--voice").arg(voice_id)
            .arg("--file").arg("-")
            .arg("--write-media").arg(output_path);

        // The value may start with '-', so it has to be attached to the flag
        if let Some(rate) = &self.config.rate {
            cmd.arg(format!("--rate={}", rate));
        }

        cmd
    }
}

#[async_trait]
impl SpeechSynthesizer for EdgeTtsSynthesizer {
    async fn synthesize(&self, text: &str, voice_id: &str, output_path: &Path) -> Result<()> {
        info!(
            "Synthesizing {} characters with voice {}",
            text.chars().count(),
            voice_id
        );

        let cmd = self.build_command(voice_id, output_path);
        debug!("Executing edge-tts command: {:?}", cmd);

        let limit = Duration::from_secs(self.config.timeout_secs);
        let output = run_with_input(cmd, text, limit).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DubError::Synthesis(format!(
                "edge-tts failed ({}): {}",
                output.status,
                stderr.trim()
            )));
        }

        let written = tokio::fs::metadata(output_path)
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        if written == 0 {
            return Err(DubError::Synthesis(format!(
                "edge-tts produced no audio at {}",
                output_path.display()
            )));
        }

        info!("Speech synthesis completed ({} bytes)", written);
        Ok(())
    }
}

/// Spawn `cmd`, feed `input` on stdin and wait for it to exit within `limit`.
/// The child is killed if the limit elapses.
async fn run_with_input(mut cmd: Command, input: &str, limit: Duration) -> Result<Output> {
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let run = async {
        let mut child = cmd
            .spawn()
            .map_err(|e| DubError::Synthesis(format!("Failed to start synthesis command: {}", e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input.as_bytes())
                .await
                .map_err(|e| DubError::Synthesis(format!("Failed to send text to synthesizer: {}", e)))?;
        }

        child
            .wait_with_output()
            .await
            .map_err(|e| DubError::Synthesis(format!("Synthesis command failed: {}", e)))
    };

    tokio::time::timeout(limit, run)
        .await
        .map_err(|_| DubError::Synthesis(format!("Synthesis timed out after {}s", limit.as_secs_f64())))?
}
