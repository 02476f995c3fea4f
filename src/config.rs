use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{DubError, Result};
use crate::voice::{default_voices, VoiceProfile};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub workspace: WorkspaceConfig,
    pub media: MediaConfig,
    pub transcriber: TranscriberConfig,
    pub translate: TranslateConfig,
    pub synthesis: SynthesisConfig,
    /// Voice personas offered for selection
    pub voices: Vec<VoiceProfile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Directory under which per-run workspaces are created (system temp dir when unset)
    pub base_dir: Option<PathBuf>,
}

impl WorkspaceConfig {
    pub fn base_dir(&self) -> PathBuf {
        self.base_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub ffmpeg_path: String,
    /// Path to ffprobe binary
    pub ffprobe_path: String,
    /// Codec for the video stream of the dubbed file ("copy" keeps it bit-for-bit)
    pub video_codec: String,
    /// Codec for the synthesized audio stream
    pub audio_codec: String,
    /// Let the container run to the longer of the two streams instead of the shorter
    pub extend_to_longest: bool,
    /// Leading silence removed from synthesized speech on every formatting pass
    pub leading_trim_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriberConfig {
    /// Path to the whisper command-line tool
    pub binary_path: String,
    /// Model profile (tiny, base, small, medium, large)
    pub model: String,
    /// Additional arguments passed through to whisper
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationBackend {
    /// Google translate web endpoint
    Google,
    /// Local LLM served by Ollama
    Ollama,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateConfig {
    pub backend: TranslationBackend,
    /// Base URL of the Google translate endpoint
    pub google_endpoint: String,
    /// Ollama endpoint URL
    pub ollama_endpoint: String,
    /// LLM model to use with Ollama
    pub ollama_model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Longest text sent in a single request
    pub max_chunk_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Path to the edge-tts command-line tool
    pub binary_path: String,
    /// Speaking rate adjustment, e.g. "+10%"
    pub rate: Option<String>,
    /// Upper bound for one synthesis call in seconds
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: WorkspaceConfig::default(),
            media: MediaConfig::default(),
            transcriber: TranscriberConfig::default(),
            translate: TranslateConfig::default(),
            synthesis: SynthesisConfig::default(),
            voices: default_voices(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            video_codec: "copy".to_string(),
            audio_codec: "aac".to_string(),
            extend_to_longest: false,
            leading_trim_ms: 200,
        }
    }
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            binary_path: "whisper".to_string(),
            model: "base".to_string(),
            extra_args: Vec::new(),
        }
    }
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            backend: TranslationBackend::Google,
            google_endpoint: "https://translate.googleapis.com".to_string(),
            ollama_endpoint: "http://localhost:11434".to_string(),
            ollama_model: "llama3.2:3b".to_string(),
            timeout_secs: 60,
            max_chunk_chars: 4500,
        }
    }
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            binary_path: "edge-tts".to_string(),
            rate: None,
            timeout_secs: 120,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DubError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| DubError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| DubError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| DubError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}
