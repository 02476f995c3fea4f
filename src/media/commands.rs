use std::path::Path;
use tokio::process::Command;
use tracing::debug;

use crate::error::{DubError, Result};
use crate::reconcile::AudioAdjustment;
use super::MuxOptions;

/// Abstract media processing command representation
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    /// Create a new media processing command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Select a stream for the output, e.g. "0:v:0"
    pub fn map<S: Into<String>>(self, specifier: S) -> Self {
        self.arg("-map").arg(specifier)
    }

    /// Set video codec
    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    /// Set audio codec
    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// Disable video
    pub fn no_video(self) -> Self {
        self.arg("-vn")
    }

    /// Set audio sample rate
    pub fn audio_sample_rate(self, rate: u32) -> Self {
        self.arg("-ar").arg(rate.to_string())
    }

    /// Set audio channels
    pub fn audio_channels(self, channels: u32) -> Self {
        self.arg("-ac").arg(channels.to_string())
    }

    /// Add audio filter
    pub fn audio_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-af").arg(filter)
    }

    /// Stop writing output after `seconds`
    pub fn duration_limit(self, seconds: f64) -> Self {
        self.arg("-t").arg(format!("{:.3}", seconds))
    }

    /// End the output with the shortest input stream
    pub fn shortest(self) -> Self {
        self.arg("-shortest")
    }

    async fn run(&self, to_error: fn(String) -> DubError) -> Result<std::process::Output> {
        debug!("Executing media processing command: {} {:?}", self.binary_path, self.args);
        debug!("Description: {}", self.description);

        let output = Command::new(&self.binary_path)
            .args(&self.args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| to_error(format!("Failed to execute {}: {}", self.binary_path, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(to_error(format!(
                "{} failed ({}): {}",
                self.description,
                output.status,
                stderr.trim()
            )));
        }

        Ok(output)
    }

    /// Execute the command, reporting failures as the error kind of the calling stage
    pub async fn execute(&self, to_error: fn(String) -> DubError) -> Result<()> {
        self.run(to_error).await.map(|_| ())
    }

    /// Execute the command and return its standard output
    pub async fn execute_capture(&self, to_error: fn(String) -> DubError) -> Result<String> {
        let output = self.run(to_error).await?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Builder for the media operations of a dub run
pub struct MediaCommandBuilder {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl MediaCommandBuilder {
    /// Create a new command builder
    pub fn new<S1: Into<String>, S2: Into<String>>(ffmpeg_path: S1, ffprobe_path: S2) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            ffprobe_path: ffprobe_path.into(),
        }
    }

    /// Build container/stream inspection command
    pub fn probe<P: AsRef<Path>>(&self, path: P) -> MediaCommand {
        MediaCommand::new(&self.ffprobe_path, "Media probe")
            .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
            .output(path)
    }

    /// Build audio extraction command (16 kHz mono PCM for transcription)
    pub fn extract_audio<P: AsRef<Path>>(&self, video_path: P, audio_path: P) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, "Audio extraction")
            .overwrite()
            .input(video_path)
            .no_video()
            .audio_codec("pcm_s16le")
            .audio_sample_rate(16000)
            .audio_channels(1)
            .output(audio_path)
    }

    /// Build tempo adjustment command
    pub fn apply_tempo<P: AsRef<Path>>(
        &self,
        input_path: P,
        output_path: P,
        adjustment: &AudioAdjustment,
    ) -> MediaCommand {
        let mut cmd = MediaCommand::new(&self.ffmpeg_path, "Tempo adjustment")
            .overwrite()
            .input(input_path)
            .no_video()
            .audio_filter(adjustment.filter_chain());

        if let Some(limit) = adjustment.max_duration {
            cmd = cmd.duration_limit(limit);
        }

        cmd.audio_codec("pcm_s16le").output(output_path)
    }

    /// Build a command rendering a silent mono clip
    pub fn render_silence<P: AsRef<Path>>(&self, output_path: P, seconds: f64) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, "Silence rendering")
            .overwrite()
            .args(["-f", "lavfi"])
            .input("anullsrc=r=24000:cl=mono")
            .duration_limit(seconds)
            .output(output_path)
    }

    /// Build the final mux: original video stream, new audio stream
    pub fn mux<P: AsRef<Path>>(
        &self,
        video_path: P,
        audio_path: P,
        output_path: P,
        options: &MuxOptions,
    ) -> MediaCommand {
        let mut cmd = MediaCommand::new(&self.ffmpeg_path, "Mux")
            .overwrite()
            .input(video_path)
            .input(audio_path)
            .map("0:v:0")
            .map("1:a:0")
            .video_codec(&options.video_codec)
            .audio_codec(&options.audio_codec);

        if !options.extend_to_longest {
            cmd = cmd.shortest();
        }

        cmd.output(output_path)
    }

    /// Build version check command
    pub fn version_check(&self, binary_path: &str) -> MediaCommand {
        MediaCommand::new(binary_path, "Version check").arg("-version")
    }

    pub fn ffmpeg_path(&self) -> &str {
        &self.ffmpeg_path
    }

    pub fn ffprobe_path(&self) -> &str {
        &self.ffprobe_path
    }
}
