//! Duration reconciliation between synthesized speech and the source video.
//!
//! The decision itself ([`plan_tempo`]) is a pure function of the two
//! durations. [`Reconciler`] turns a decision into audio by asking the media
//! processor for a single formatting pass, or hands the synthesized file
//! through untouched when no adjustment is allowed.

use std::time::Duration;
use tracing::{info, warn};

use crate::error::Result;
use crate::lifecycle::RunWorkspace;
use crate::media::MediaProcessorTrait;
use crate::models::{ReconciledAudio, SynthesizedAudio};

/// Smallest stretch ratio (video / speech) that stays intelligible
pub const MIN_SPEED_FACTOR: f64 = 0.5;
/// Largest stretch ratio (video / speech) that stays intelligible
pub const MAX_SPEED_FACTOR: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TempoDecision {
    /// Stretch the speech by `factor` (video / speech) so it spans the video
    Stretch { factor: f64 },
    /// The required stretch is outside the supported range; speech is used as-is
    OutOfRange { factor: f64 },
    /// Durations were unusable; speech is used as-is
    Degenerate,
}

impl TempoDecision {
    /// Stretch ratio actually applied to the speech (1.0 when untouched)
    pub fn applied_factor(&self) -> f64 {
        match self {
            Self::Stretch { factor } => *factor,
            Self::OutOfRange { .. } | Self::Degenerate => 1.0,
        }
    }

    /// Stretch ratio the durations asked for, if they were usable
    pub fn requested_factor(&self) -> Option<f64> {
        match self {
            Self::Stretch { factor } | Self::OutOfRange { factor } => Some(*factor),
            Self::Degenerate => None,
        }
    }

    pub fn is_adjusted(&self) -> bool {
        matches!(self, Self::Stretch { .. })
    }

    /// Rate handed to the tempo filter: speech longer than the video plays faster
    pub fn playback_rate(&self) -> Option<f64> {
        match self {
            Self::Stretch { factor } => Some(1.0 / factor),
            _ => None,
        }
    }
}

/// Decide how synthesized speech of `synth_duration` seconds is fitted to a
/// video of `video_duration` seconds. Bounds are inclusive.
pub fn plan_tempo(synth_duration: f64, video_duration: f64) -> TempoDecision {
    let usable = |d: f64| d.is_finite() && d > 0.0;
    if !usable(synth_duration) || !usable(video_duration) {
        return TempoDecision::Degenerate;
    }

    let factor = video_duration / synth_duration;
    if !factor.is_finite() {
        return TempoDecision::Degenerate;
    }

    if (MIN_SPEED_FACTOR..=MAX_SPEED_FACTOR).contains(&factor) {
        TempoDecision::Stretch { factor }
    } else {
        TempoDecision::OutOfRange { factor }
    }
}

/// User-facing explanation for a decision that leaves the speech untouched
pub fn fallback_warning(decision: &TempoDecision, synth_duration: f64, video_duration: f64) -> Option<String> {
    match decision {
        TempoDecision::Stretch { .. } => None,
        TempoDecision::OutOfRange { factor } => {
            let relation = if synth_duration > video_duration { "longer" } else { "shorter" };
            Some(format!(
                "Speed factor {:.3} is outside [{}, {}]; using synthesized audio as-is, \
                 the dubbed audio ({:.2}s) will be {} than the video ({:.2}s)",
                factor, MIN_SPEED_FACTOR, MAX_SPEED_FACTOR, synth_duration, relation, video_duration
            ))
        }
        TempoDecision::Degenerate => Some(format!(
            "Cannot compute a speed factor (speech {:.3}s, video {:.3}s); using synthesized audio as-is",
            synth_duration, video_duration
        )),
    }
}

/// Parameters of one formatting pass over synthesized speech
#[derive(Debug, Clone, PartialEq)]
pub struct AudioAdjustment {
    pub leading_trim: Duration,
    pub playback_rate: f64,
    /// Output is cut at this many seconds
    pub max_duration: Option<f64>,
}

impl AudioAdjustment {
    /// ffmpeg `-af` filter chain: optional leading trim, then atempo
    pub fn filter_chain(&self) -> String {
        let mut filters = Vec::new();
        if !self.leading_trim.is_zero() {
            filters.push(format!("atrim=start={:.3}", self.leading_trim.as_secs_f64()));
            filters.push("asetpts=PTS-STARTPTS".to_string());
        }
        filters.push(format!("atempo={:.6}", self.playback_rate));
        filters.join(",")
    }

    /// Duration the pass should produce for an input of `input_duration` seconds
    pub fn expected_duration(&self, input_duration: f64) -> f64 {
        let trimmed = (input_duration - self.leading_trim.as_secs_f64()).max(0.0);
        let stretched = trimmed / self.playback_rate;
        match self.max_duration {
            Some(limit) => stretched.min(limit),
            None => stretched,
        }
    }
}

pub struct Reconciler {
    leading_trim: Duration,
}

impl Reconciler {
    pub fn new(leading_trim: Duration) -> Self {
        Self { leading_trim }
    }

    pub async fn reconcile(
        &self,
        media: &dyn MediaProcessorTrait,
        workspace: &RunWorkspace,
        synthesized: &SynthesizedAudio,
        video_duration: f64,
    ) -> Result<ReconciledAudio> {
        let decision = plan_tempo(synthesized.duration, video_duration);

        let Some(playback_rate) = decision.playback_rate() else {
            if let Some(message) = fallback_warning(&decision, synthesized.duration, video_duration) {
                warn!("{}", message);
            }
            return Ok(ReconciledAudio {
                path: synthesized.path.clone(),
                duration: synthesized.duration,
                decision,
            });
        };

        info!(
            "Reconciling speech {:.3}s to video {:.3}s (speed factor {:.3})",
            synthesized.duration,
            video_duration,
            decision.applied_factor()
        );

        let adjustment = AudioAdjustment {
            leading_trim: self.leading_trim,
            playback_rate,
            max_duration: Some(video_duration),
        };

        let output = workspace.allocate("reconciled.wav");
        media.apply_tempo(&synthesized.path, &output, &adjustment).await?;

        let measured = media.probe(&output).await?.duration;
        let duration = measured.unwrap_or_else(|| adjustment.expected_duration(synthesized.duration));

        Ok(ReconciledAudio {
            path: output,
            duration,
            decision,
        })
    }
}
