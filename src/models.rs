//! Entities passed between the stages of a dub run.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{DubError, Result};
use crate::language::{Language, LanguagePair};
use crate::reconcile::TempoDecision;

/// One stream as reported by the prober
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub index: u32,
    /// "video", "audio", "subtitle", ...
    pub codec_type: String,
    pub codec_name: Option<String>,
}

/// Container duration and stream layout of a media file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub duration: Option<f64>,
    pub streams: Vec<StreamInfo>,
}

impl MediaInfo {
    pub fn has_audio(&self) -> bool {
        self.streams.iter().any(|s| s.codec_type == "audio")
    }

    pub fn has_video(&self) -> bool {
        self.streams.iter().any(|s| s.codec_type == "video")
    }

    /// Duration that downstream stages can rely on, rejecting absent or non-positive values
    pub fn require_duration(&self) -> Result<f64> {
        match self.duration {
            Some(d) if d.is_finite() && d > 0.0 => Ok(d),
            Some(d) => Err(DubError::Probe(format!("Invalid container duration: {}", d))),
            None => Err(DubError::Probe("Container reports no duration".to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceVideo {
    pub path: PathBuf,
    pub duration: f64,
    pub info: MediaInfo,
}

#[derive(Debug, Clone)]
pub struct ExtractedAudio {
    pub path: PathBuf,
    pub duration: Option<f64>,
    pub sample_format: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    /// Language code as detected by the transcriber
    pub language: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub text: String,
    pub languages: LanguagePair,
}

#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    pub path: PathBuf,
    pub duration: f64,
    pub language: Language,
    pub voice_id: String,
}

#[derive(Debug, Clone)]
pub struct ReconciledAudio {
    pub path: PathBuf,
    pub duration: f64,
    pub decision: TempoDecision,
}

#[derive(Debug, Clone)]
pub struct FinalAsset {
    pub path: PathBuf,
    pub duration: Option<f64>,
    pub video_codec: String,
    pub audio_codec: String,
}
