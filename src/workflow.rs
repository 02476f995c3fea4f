use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{error, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{DubError, Result};
use crate::language::{is_coerced, LanguagePair};
use crate::lifecycle::{CleanupReport, RunWorkspace};
use crate::media::{MediaProcessorFactory, MediaProcessorTrait, MuxOptions};
use crate::models::{
    ExtractedAudio, FinalAsset, MediaInfo, ReconciledAudio, SourceVideo, SynthesizedAudio, Translation,
};
use crate::reconcile::{fallback_warning, Reconciler, TempoDecision};
use crate::synthesize::{SpeechSynthesizer, SynthesizerFactory};
use crate::transcribe::{Transcriber, TranscriberFactory};
use crate::translate::{Translator, TranslatorFactory, AUTO_DETECT};
use crate::voice::{VoiceCatalog, VoiceProfile};

/// Container formats accepted at ingestion
pub const SUPPORTED_VIDEO_EXTENSIONS: [&str; 4] = ["mp4", "mov", "avi", "mkv"];

/// Length of the clip rendered when there is no text to speak
const SILENT_CLIP_SECS: f64 = 0.05;

const DUBBED_SUFFIX: &str = "_dubbed";

#[derive(Debug, Clone)]
pub struct DubRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Persona key or display name
    pub persona: String,
}

#[derive(Debug, Clone)]
pub struct DubReport {
    pub run_id: Uuid,
    pub output: PathBuf,
    pub detected_language: String,
    pub languages: LanguagePair,
    pub voice_id: String,
    pub video_duration: f64,
    pub speech_duration: f64,
    pub reconciled_duration: f64,
    pub decision: TempoDecision,
    pub final_duration: Option<f64>,
    pub warnings: Vec<String>,
    pub cleanup: CleanupReport,
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub succeeded: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

pub struct Workflow {
    config: Config,
    voices: VoiceCatalog,
    media: Box<dyn MediaProcessorTrait>,
    transcriber: Box<dyn Transcriber>,
    translator: Box<dyn Translator>,
    synthesizer: Box<dyn SpeechSynthesizer>,
    reconciler: Reconciler,
}

impl Workflow {
    pub fn new(config: Config) -> Result<Self> {
        let media = MediaProcessorFactory::create_processor(config.media.clone());

        // Check dependencies
        media.check_availability()?;

        let transcriber = TranscriberFactory::create_default(config.transcriber.clone());
        let translator = TranslatorFactory::create_translator(config.translate.clone())?;
        let synthesizer = SynthesizerFactory::create_default(config.synthesis.clone());

        Self::with_components(config, media, transcriber, translator, synthesizer)
    }

    /// Assemble a workflow from explicit stage implementations
    pub fn with_components(
        config: Config,
        media: Box<dyn MediaProcessorTrait>,
        transcriber: Box<dyn Transcriber>,
        translator: Box<dyn Translator>,
        synthesizer: Box<dyn SpeechSynthesizer>,
    ) -> Result<Self> {
        let voices = VoiceCatalog::new(config.voices.clone())?;
        let reconciler = Reconciler::new(Duration::from_millis(config.media.leading_trim_ms));

        Ok(Self {
            config,
            voices,
            media,
            transcriber,
            translator,
            synthesizer,
            reconciler,
        })
    }

    pub fn voices(&self) -> &VoiceCatalog {
        &self.voices
    }

    /// Inspect a media file
    pub async fn probe(&self, path: &Path) -> Result<MediaInfo> {
        self.media.probe(path).await
    }

    /// Dub one video. Every temporary artifact of the run is removed before this returns.
    pub async fn dub(&self, request: &DubRequest) -> Result<DubReport> {
        let voice = self.voices.select(&request.persona)?;
        let extension = supported_extension(&request.input)?;

        if !request.input.exists() {
            return Err(DubError::FileNotFound(request.input.display().to_string()));
        }

        let workspace = RunWorkspace::create(&self.config.workspace.base_dir())?;
        let run_id = workspace.run_id();
        info!(
            "Starting dub run {} for {} with voice persona '{}'",
            run_id,
            request.input.display(),
            voice.key
        );

        let result = self.run_stages(&workspace, request, voice, &extension).await;

        let cleanup = workspace.release();
        if !cleanup.is_clean() {
            warn!(
                "Run {} left {} temporary artifact(s) behind",
                run_id,
                cleanup.failed.len()
            );
        }

        match result {
            Ok(mut report) => {
                report.cleanup = cleanup;
                info!("Dub run {} completed: {}", run_id, report.output.display());
                Ok(report)
            }
            Err(e) => {
                error!("Dub run {} failed: {}", run_id, e);
                Err(e)
            }
        }
    }

    async fn run_stages(
        &self,
        workspace: &RunWorkspace,
        request: &DubRequest,
        voice: &VoiceProfile,
        extension: &str,
    ) -> Result<DubReport> {
        let mut warnings = Vec::new();

        // Step 1: Ingest and probe the source video
        let source = self.ingest(workspace, &request.input, extension).await?;

        // Step 2: Extract the speech track
        let extracted = self.extract_audio(workspace, &source).await?;

        // Step 3: Transcribe
        let transcript = self
            .transcriber
            .transcribe(&extracted.path, &self.config.transcriber.model)
            .await?;
        if transcript.text.is_empty() {
            warn!("Transcript is empty; continuing with empty text");
            warnings.push("No speech was recognized in the source video".to_string());
        }

        let languages = LanguagePair::from_detected(&transcript.language);
        if is_coerced(&transcript.language) {
            let message = format!(
                "Detected language '{}' is not supported; treating the source as {}",
                transcript.language,
                languages.source.name()
            );
            warn!("{}", message);
            warnings.push(message);
        }
        info!(
            "Transcribed {} characters; dubbing {} -> {}",
            transcript.text.chars().count(),
            languages.source,
            languages.target
        );

        // Step 4: Translate
        let translation = Translation {
            text: self
                .translator
                .translate(&transcript.text, AUTO_DETECT, languages.target)
                .await?,
            languages,
        };
        info!("Translated into {} characters", translation.text.chars().count());

        // Step 5: Synthesize
        let synthesized = self.synthesize(workspace, &translation, voice).await?;

        // Step 6: Reconcile durations
        let reconciled = self
            .reconciler
            .reconcile(self.media.as_ref(), workspace, &synthesized, source.duration)
            .await?;
        if let Some(message) = fallback_warning(&reconciled.decision, synthesized.duration, source.duration) {
            warnings.push(message);
        }

        // Step 7: Mux and hand the result to the caller
        let final_asset = self.mux(workspace, &source, &reconciled, extension).await?;
        deliver(&final_asset.path, &request.output).await?;

        Ok(DubReport {
            run_id: workspace.run_id(),
            output: request.output.clone(),
            detected_language: transcript.language,
            languages,
            voice_id: synthesized.voice_id,
            video_duration: source.duration,
            speech_duration: synthesized.duration,
            reconciled_duration: reconciled.duration,
            decision: reconciled.decision,
            final_duration: final_asset.duration,
            warnings,
            cleanup: CleanupReport::default(),
        })
    }

    async fn ingest(&self, workspace: &RunWorkspace, input: &Path, extension: &str) -> Result<SourceVideo> {
        let path = workspace.allocate(&format!("source.{}", extension));
        fs::copy(input, &path).await?;

        let info = self.media.probe(&path).await?;
        if !info.has_video() {
            return Err(DubError::Probe(format!("No video stream in {}", input.display())));
        }
        let duration = info.require_duration()?;
        info!(
            "Source video: {:.3}s, {} stream(s)",
            duration,
            info.streams.len()
        );

        Ok(SourceVideo { path, duration, info })
    }

    async fn extract_audio(&self, workspace: &RunWorkspace, source: &SourceVideo) -> Result<ExtractedAudio> {
        if !source.info.has_audio() {
            return Err(DubError::Extraction("Source video has no audio stream".to_string()));
        }

        let path = workspace.allocate("extracted.wav");
        self.media.extract_audio(&source.path, &path).await?;
        let duration = self.media.probe(&path).await?.duration;

        Ok(ExtractedAudio {
            path,
            duration,
            sample_format: "pcm_s16le".to_string(),
        })
    }

    async fn synthesize(
        &self,
        workspace: &RunWorkspace,
        translation: &Translation,
        voice: &VoiceProfile,
    ) -> Result<SynthesizedAudio> {
        let language = translation.languages.target;
        let voice_id = voice.voice_id(language).to_string();
        let path = workspace.allocate("synthesized.mp3");

        if translation.text.trim().is_empty() {
            warn!("Nothing to speak; rendering a silent clip instead of calling the synthesizer");
            self.media.render_silence(&path, SILENT_CLIP_SECS).await?;
        } else {
            self.synthesizer.synthesize(&translation.text, &voice_id, &path).await?;
        }

        // Near-empty speech may carry no duration at all
        let duration = self.media.probe(&path).await?.duration.unwrap_or(0.0);
        info!("Synthesized speech: {:.3}s with voice {}", duration, voice_id);

        Ok(SynthesizedAudio {
            path,
            duration,
            language,
            voice_id,
        })
    }

    async fn mux(
        &self,
        workspace: &RunWorkspace,
        source: &SourceVideo,
        reconciled: &ReconciledAudio,
        extension: &str,
    ) -> Result<FinalAsset> {
        let options = MuxOptions::from(&self.config.media);
        let path = workspace.allocate(&format!("dubbed.{}", extension));

        self.media.mux(&source.path, &reconciled.path, &path, &options).await?;
        let duration = self.media.probe(&path).await?.duration;

        Ok(FinalAsset {
            path,
            duration,
            video_codec: options.video_codec,
            audio_codec: options.audio_codec,
        })
    }

    /// Dub every supported video under `input_dir`, one run at a time
    pub async fn process_directory(
        &self,
        input_dir: &Path,
        output_dir: Option<&Path>,
        persona: &str,
    ) -> Result<BatchSummary> {
        info!("Processing directory: {}", input_dir.display());

        if !input_dir.is_dir() {
            return Err(DubError::Config("Input path is not a directory".to_string()));
        }

        // Reject an unknown persona before touching any file
        self.voices.select(persona)?;

        let output_dir = output_dir.unwrap_or(input_dir);
        fs::create_dir_all(output_dir).await?;

        let mut video_files: Vec<PathBuf> = WalkDir::new(input_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| supported_extension(p).is_ok() && !is_dubbed_output(p))
            .collect();
        video_files.sort();

        info!("Found {} video files to process", video_files.len());

        let mut summary = BatchSummary::default();
        for video_path in video_files {
            let request = DubRequest {
                output: batch_output_path(&video_path, input_dir, output_dir),
                input: video_path.clone(),
                persona: persona.to_string(),
            };

            match self.dub(&request).await {
                Ok(report) => {
                    info!("Successfully processed: {}", video_path.display());
                    summary.succeeded.push(report.output);
                }
                Err(e) => {
                    warn!("Failed to process {}: {}", video_path.display(), e);
                    summary.failed.push((video_path, e.to_string()));
                }
            }
        }

        Ok(summary)
    }
}

/// Lowercased container extension of `path` if it is one we accept
pub fn supported_extension(path: &Path) -> Result<String> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if SUPPORTED_VIDEO_EXTENSIONS.contains(&extension.as_str()) {
        Ok(extension)
    } else {
        Err(DubError::UnsupportedFormat(format!(
            "{} (supported: {})",
            path.display(),
            SUPPORTED_VIDEO_EXTENSIONS.join(", ")
        )))
    }
}

/// `<dir>/<stem>_dubbed.<ext>` next to the input
pub fn default_output_path(input: &Path) -> PathBuf {
    let dir = input.parent().unwrap_or_else(|| Path::new(""));
    output_path_in(input, dir)
}

/// Mirror the input's location below `input_dir` under `output_dir`
fn batch_output_path(input: &Path, input_dir: &Path, output_dir: &Path) -> PathBuf {
    let relative_dir = input
        .parent()
        .and_then(|parent| parent.strip_prefix(input_dir).ok())
        .unwrap_or_else(|| Path::new(""));
    output_path_in(input, &output_dir.join(relative_dir))
}

fn output_path_in(input: &Path, dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    let file_name = match input.extension() {
        Some(ext) => format!("{}{}.{}", stem, DUBBED_SUFFIX, ext.to_string_lossy()),
        None => format!("{}{}", stem, DUBBED_SUFFIX),
    };
    dir.join(file_name)
}

fn is_dubbed_output(path: &Path) -> bool {
    path.file_stem()
        .map(|s| s.to_string_lossy().ends_with(DUBBED_SUFFIX))
        .unwrap_or(false)
}

/// Copy the finished asset to the caller's destination
async fn deliver(asset: &Path, destination: &Path) -> Result<()> {
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    if let Err(e) = fs::copy(asset, destination).await {
        // A partial copy is not a usable deliverable
        let _ = fs::remove_file(destination).await;
        return Err(e.into());
    }

    info!("Dubbed video written to {}", destination.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StreamInfo, Transcript};
    use crate::reconcile::AudioAdjustment;
    use crate::synthesize::MockSpeechSynthesizer;
    use crate::transcribe::MockTranscriber;
    use crate::translate::MockTranslator;
    use crate::language::Language;
    use assert_fs::TempDir;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum FailAt {
        Probe,
        Extract,
        Transcribe,
        Translate,
        Synthesize,
        Tempo,
        Mux,
    }

    #[derive(Debug, Default)]
    struct Calls {
        tempo: Vec<AudioAdjustment>,
        mux_audio: Vec<PathBuf>,
        silence: usize,
    }

    /// Media processor that writes placeholder files and reports scripted durations
    struct FakeMedia {
        video_duration: f64,
        synth_duration: f64,
        has_audio: bool,
        fail_at: Option<FailAt>,
        calls: Arc<Mutex<Calls>>,
    }

    impl FakeMedia {
        fn new(video_duration: f64, synth_duration: f64) -> Self {
            Self {
                video_duration,
                synth_duration,
                has_audio: true,
                fail_at: None,
                calls: Arc::new(Mutex::new(Calls::default())),
            }
        }

        fn failing(mut self, stage: FailAt) -> Self {
            self.fail_at = Some(stage);
            self
        }

        fn stream(index: u32, codec_type: &str) -> StreamInfo {
            StreamInfo {
                index,
                codec_type: codec_type.to_string(),
                codec_name: None,
            }
        }

        fn reconciled_duration(&self) -> f64 {
            let calls = self.calls.lock().unwrap();
            calls
                .tempo
                .last()
                .map(|a| a.expected_duration(self.synth_duration))
                .unwrap_or(self.synth_duration)
        }
    }

    #[async_trait]
    impl MediaProcessorTrait for FakeMedia {
        async fn probe(&self, path: &Path) -> Result<MediaInfo> {
            if !path.exists() {
                return Err(DubError::Probe(format!("missing {}", path.display())));
            }
            let stem = path.file_stem().unwrap().to_string_lossy().into_owned();
            if self.fail_at == Some(FailAt::Probe) && stem == "source" {
                return Err(DubError::Probe("moov atom not found".to_string()));
            }

            let (duration, streams) = match stem.as_str() {
                "source" => {
                    let mut streams = vec![Self::stream(0, "video")];
                    if self.has_audio {
                        streams.push(Self::stream(1, "audio"));
                    }
                    (self.video_duration, streams)
                }
                "extracted" => (self.video_duration, vec![Self::stream(0, "audio")]),
                "synthesized" => (self.synth_duration, vec![Self::stream(0, "audio")]),
                "reconciled" => (self.reconciled_duration(), vec![Self::stream(0, "audio")]),
                _ => (
                    self.video_duration,
                    vec![Self::stream(0, "video"), Self::stream(1, "audio")],
                ),
            };

            Ok(MediaInfo {
                duration: if duration > 0.0 { Some(duration) } else { None },
                streams,
            })
        }

        async fn extract_audio(&self, _video_path: &Path, audio_path: &Path) -> Result<()> {
            std::fs::write(audio_path, b"RIFF")?;
            if self.fail_at == Some(FailAt::Extract) {
                return Err(DubError::Extraction("Invalid data found when processing input".to_string()));
            }
            Ok(())
        }

        async fn apply_tempo(&self, _input: &Path, output: &Path, adjustment: &AudioAdjustment) -> Result<()> {
            std::fs::write(output, b"RIFF")?;
            if self.fail_at == Some(FailAt::Tempo) {
                return Err(DubError::Tempo("atempo failed".to_string()));
            }
            self.calls.lock().unwrap().tempo.push(adjustment.clone());
            Ok(())
        }

        async fn render_silence(&self, output: &Path, _seconds: f64) -> Result<()> {
            std::fs::write(output, b"ID3")?;
            self.calls.lock().unwrap().silence += 1;
            Ok(())
        }

        async fn mux(&self, _video: &Path, audio: &Path, output: &Path, _options: &MuxOptions) -> Result<()> {
            std::fs::write(output, b"dubbed video")?;
            if self.fail_at == Some(FailAt::Mux) {
                return Err(DubError::Mux("Could not write header".to_string()));
            }
            self.calls.lock().unwrap().mux_audio.push(audio.to_path_buf());
            Ok(())
        }

        fn check_availability(&self) -> Result<()> {
            Ok(())
        }

        async fn get_version_info(&self) -> Result<String> {
            Ok("fake".to_string())
        }
    }

    fn transcriber_returning(text: &str, language: &str) -> MockTranscriber {
        let transcript = Transcript {
            text: text.to_string(),
            language: language.to_string(),
        };
        let mut transcriber = MockTranscriber::new();
        transcriber
            .expect_transcribe()
            .returning(move |_, _| Ok(transcript.clone()));
        transcriber
    }

    fn echo_translator() -> MockTranslator {
        let mut translator = MockTranslator::new();
        translator
            .expect_translate()
            .returning(|text, _, target| Ok(format!("[{}] {}", target, text)));
        translator
    }

    fn writing_synthesizer() -> MockSpeechSynthesizer {
        let mut synthesizer = MockSpeechSynthesizer::new();
        synthesizer.expect_synthesize().returning(|_, _, output| {
            std::fs::write(output, b"ID3")?;
            Ok(())
        });
        synthesizer
    }

    struct Harness {
        work: TempDir,
        io: TempDir,
    }

    impl Harness {
        fn new() -> Self {
            let harness = Self {
                work: TempDir::new().unwrap(),
                io: TempDir::new().unwrap(),
            };
            std::fs::write(harness.input(), b"source video").unwrap();
            harness
        }

        fn input(&self) -> PathBuf {
            self.io.path().join("lecture.mp4")
        }

        fn output(&self) -> PathBuf {
            self.io.path().join("out").join("lecture_dubbed.mp4")
        }

        fn request(&self, persona: &str) -> DubRequest {
            DubRequest {
                input: self.input(),
                output: self.output(),
                persona: persona.to_string(),
            }
        }

        fn workflow(
            &self,
            media: FakeMedia,
            transcriber: MockTranscriber,
            translator: MockTranslator,
            synthesizer: MockSpeechSynthesizer,
        ) -> Workflow {
            let mut config = Config::default();
            config.workspace.base_dir = Some(self.work.path().to_path_buf());
            Workflow::with_components(
                config,
                Box::new(media),
                Box::new(transcriber),
                Box::new(translator),
                Box::new(synthesizer),
            )
            .unwrap()
        }

        fn work_entries(&self) -> Vec<PathBuf> {
            let mut entries: Vec<PathBuf> = std::fs::read_dir(self.work.path())
                .unwrap()
                .map(|e| e.unwrap().path())
                .collect();
            entries.sort();
            entries
        }
    }

    #[tokio::test]
    async fn test_matching_durations_pass_through_formatting() {
        let harness = Harness::new();
        let media = FakeMedia::new(10.0, 10.0);
        let calls = media.calls.clone();
        let workflow = harness.workflow(media, transcriber_returning("Hello and welcome", "en"), echo_translator(), writing_synthesizer());

        let report = workflow.dub(&harness.request("egyptian-female")).await.unwrap();

        assert_eq!(report.decision, TempoDecision::Stretch { factor: 1.0 });
        assert_eq!(report.languages.target, Language::Arabic);
        assert_eq!(report.voice_id, "ar-EG-SalmaNeural");
        assert!((report.final_duration.unwrap() - 10.0).abs() < 1e-6);
        assert!(report.warnings.is_empty());

        let calls = calls.lock().unwrap();
        assert_eq!(calls.tempo.len(), 1);
        assert_eq!(calls.tempo[0].playback_rate, 1.0);
        assert_eq!(calls.tempo[0].leading_trim, Duration::from_millis(200));

        assert_eq!(std::fs::read(harness.output()).unwrap(), b"dubbed video");
        assert!(harness.work_entries().is_empty());
        assert!(report.cleanup.is_clean());
    }

    #[tokio::test]
    async fn test_long_speech_is_used_as_is() {
        let harness = Harness::new();
        let media = FakeMedia::new(10.0, 25.0);
        let calls = media.calls.clone();
        let workflow = harness.workflow(media, transcriber_returning("Hello", "en"), echo_translator(), writing_synthesizer());

        let report = workflow.dub(&harness.request("saudi-male")).await.unwrap();

        assert!(!report.decision.is_adjusted());
        assert!((report.decision.requested_factor().unwrap() - 0.4).abs() < 1e-9);
        assert_eq!(report.reconciled_duration, 25.0);
        assert!(report.reconciled_duration > report.video_duration);
        assert!(report.warnings.iter().any(|w| w.contains("longer")));

        let calls = calls.lock().unwrap();
        assert!(calls.tempo.is_empty());
        assert_eq!(calls.mux_audio[0].file_name().unwrap(), "synthesized.mp3");
        assert!(harness.work_entries().is_empty());
    }

    #[tokio::test]
    async fn test_short_speech_is_stretched_to_video() {
        let harness = Harness::new();
        let media = FakeMedia::new(10.0, 6.0);
        let calls = media.calls.clone();
        let workflow = harness.workflow(media, transcriber_returning("مرحبا", "ar"), echo_translator(), writing_synthesizer());

        let report = workflow.dub(&harness.request("lebanese-female")).await.unwrap();

        assert!(report.decision.is_adjusted());
        assert!((report.decision.applied_factor() - 10.0 / 6.0).abs() < 1e-9);
        // Only the leading trim, stretched by the same factor, separates the result from the video
        let tolerance = 0.2 * 10.0 / 6.0 + 1e-6;
        assert!((report.reconciled_duration - 10.0).abs() <= tolerance);
        assert_eq!(report.voice_id, "en-US-EmmaMultilingualNeural");

        let calls = calls.lock().unwrap();
        assert!((calls.tempo[0].playback_rate - 0.6).abs() < 1e-9);
        assert_eq!(calls.tempo[0].max_duration, Some(10.0));
        assert_eq!(calls.mux_audio[0].file_name().unwrap(), "reconciled.wav");
    }

    #[tokio::test]
    async fn test_extraction_failure_stops_before_transcription() {
        let harness = Harness::new();

        let mut transcriber = MockTranscriber::new();
        transcriber.expect_transcribe().never();
        let mut translator = MockTranslator::new();
        translator.expect_translate().never();
        let mut synthesizer = MockSpeechSynthesizer::new();
        synthesizer.expect_synthesize().never();

        let workflow = harness.workflow(
            FakeMedia::new(10.0, 10.0).failing(FailAt::Extract),
            transcriber,
            translator,
            synthesizer,
        );

        let err = workflow.dub(&harness.request("egyptian-female")).await.unwrap_err();
        assert!(matches!(err, DubError::Extraction(_)));
        assert!(harness.work_entries().is_empty());
        assert!(!harness.output().exists());
    }

    #[tokio::test]
    async fn test_no_temporary_files_survive_a_failure_at_any_stage() {
        let stages = [
            FailAt::Probe,
            FailAt::Extract,
            FailAt::Transcribe,
            FailAt::Translate,
            FailAt::Synthesize,
            FailAt::Tempo,
            FailAt::Mux,
        ];

        for stage in stages {
            let harness = Harness::new();
            let before = harness.work_entries();

            let mut transcriber = MockTranscriber::new();
            if stage == FailAt::Transcribe {
                transcriber
                    .expect_transcribe()
                    .returning(|_, _| Err(DubError::Transcription("model failed to load".to_string())));
            } else {
                transcriber.expect_transcribe().returning(|_, _| {
                    Ok(Transcript {
                        text: "Hello".to_string(),
                        language: "en".to_string(),
                    })
                });
            }

            let mut translator = MockTranslator::new();
            if stage == FailAt::Translate {
                translator
                    .expect_translate()
                    .returning(|_, _, _| Err(DubError::Translation("connection reset".to_string())));
            } else {
                translator.expect_translate().returning(|t, _, _| Ok(t.to_string()));
            }

            let mut synthesizer = MockSpeechSynthesizer::new();
            let fail_synthesis = stage == FailAt::Synthesize;
            synthesizer.expect_synthesize().returning(move |_, _, output| {
                std::fs::write(output, b"ID3")?;
                if fail_synthesis {
                    return Err(DubError::Synthesis("503 Service Unavailable".to_string()));
                }
                Ok(())
            });

            // 6.0s of speech for a 10.0s video forces the tempo pass to run
            let media = FakeMedia::new(10.0, 6.0).failing(stage);
            let workflow = harness.workflow(media, transcriber, translator, synthesizer);

            let err = workflow.dub(&harness.request("saudi-female")).await.unwrap_err();
            let expected_kind = match (stage, &err) {
                (FailAt::Probe, DubError::Probe(_)) => true,
                (FailAt::Extract, DubError::Extraction(_)) => true,
                (FailAt::Transcribe, DubError::Transcription(_)) => true,
                (FailAt::Translate, DubError::Translation(_)) => true,
                (FailAt::Synthesize, DubError::Synthesis(_)) => true,
                (FailAt::Tempo, DubError::Tempo(_)) => true,
                (FailAt::Mux, DubError::Mux(_)) => true,
                _ => false,
            };
            assert!(expected_kind, "stage {:?} returned {:?}", stage, err);
            assert_eq!(harness.work_entries(), before, "stage {:?} leaked files", stage);
            assert!(!harness.output().exists(), "stage {:?} produced output", stage);
        }
    }

    #[tokio::test]
    async fn test_unknown_persona_is_rejected_before_the_run() {
        let harness = Harness::new();

        let mut transcriber = MockTranscriber::new();
        transcriber.expect_transcribe().never();
        let workflow = harness.workflow(FakeMedia::new(10.0, 10.0), transcriber, MockTranslator::new(), MockSpeechSynthesizer::new());

        let err = workflow.dub(&harness.request("robot")).await.unwrap_err();
        assert!(matches!(err, DubError::Config(_)));
        assert!(harness.work_entries().is_empty());
    }

    #[tokio::test]
    async fn test_video_without_audio_is_extraction_error() {
        let harness = Harness::new();
        let mut media = FakeMedia::new(10.0, 10.0);
        media.has_audio = false;

        let mut transcriber = MockTranscriber::new();
        transcriber.expect_transcribe().never();
        let workflow = harness.workflow(media, transcriber, MockTranslator::new(), MockSpeechSynthesizer::new());

        let err = workflow.dub(&harness.request("saudi-male")).await.unwrap_err();
        assert!(matches!(err, DubError::Extraction(_)));
        assert!(harness.work_entries().is_empty());
    }

    #[tokio::test]
    async fn test_empty_transcript_flows_through_as_silence() {
        let harness = Harness::new();
        let media = FakeMedia::new(10.0, 0.0);
        let calls = media.calls.clone();

        let mut translator = MockTranslator::new();
        translator.expect_translate().returning(|_, _, _| Ok(String::new()));
        let mut synthesizer = MockSpeechSynthesizer::new();
        synthesizer.expect_synthesize().never();

        let workflow = harness.workflow(media, transcriber_returning("", "en"), translator, synthesizer);
        let report = workflow.dub(&harness.request("algerian-male")).await.unwrap();

        assert_eq!(report.decision, TempoDecision::Degenerate);
        assert_eq!(report.speech_duration, 0.0);
        assert_eq!(calls.lock().unwrap().silence, 1);
        assert!(harness.output().exists());
        assert!(harness.work_entries().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_language_is_dubbed_into_arabic() {
        let harness = Harness::new();

        let mut translator = MockTranslator::new();
        translator
            .expect_translate()
            .withf(|_, source, target| source == AUTO_DETECT && *target == Language::Arabic)
            .returning(|_, _, _| Ok("بونجور".to_string()));
        let mut synthesizer = MockSpeechSynthesizer::new();
        synthesizer
            .expect_synthesize()
            .withf(|_, voice, _| voice == "ar-DZ-IsmaelNeural")
            .returning(|_, _, output| {
                std::fs::write(output, b"ID3")?;
                Ok(())
            });

        let workflow = harness.workflow(FakeMedia::new(10.0, 9.0), transcriber_returning("Bonjour", "fr"), translator, synthesizer);
        let report = workflow.dub(&harness.request("ذكر جزائري")).await.unwrap();

        assert_eq!(report.detected_language, "fr");
        assert_eq!(report.languages.source, Language::English);
        assert!(report.warnings.iter().any(|w| w.contains("'fr'")));
    }

    #[tokio::test]
    async fn test_unsupported_container_is_rejected() {
        let harness = Harness::new();
        let input = harness.io.path().join("clip.webm");
        std::fs::write(&input, b"webm").unwrap();

        let workflow = harness.workflow(FakeMedia::new(10.0, 10.0), MockTranscriber::new(), MockTranslator::new(), MockSpeechSynthesizer::new());
        let request = DubRequest {
            input,
            output: harness.output(),
            persona: "saudi-male".to_string(),
        };

        assert!(matches!(
            workflow.dub(&request).await,
            Err(DubError::UnsupportedFormat(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_runs_do_not_collide() {
        let harness = Harness::new();
        let workflow = harness.workflow(FakeMedia::new(10.0, 8.0), transcriber_returning("Hello", "en"), echo_translator(), writing_synthesizer());

        let first = DubRequest {
            output: harness.io.path().join("a.mp4"),
            ..harness.request("saudi-male")
        };
        let second = DubRequest {
            output: harness.io.path().join("b.mp4"),
            ..harness.request("saudi-female")
        };

        let (a, b) = tokio::join!(workflow.dub(&first), workflow.dub(&second));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_ne!(a.run_id, b.run_id);
        assert!(first.output.exists() && second.output.exists());
        assert!(harness.work_entries().is_empty());
    }

    #[tokio::test]
    async fn test_batch_processes_supported_videos() {
        let harness = Harness::new();
        let videos = harness.io.path().join("videos");
        std::fs::create_dir_all(videos.join("nested")).unwrap();
        std::fs::write(videos.join("one.mov"), b"v").unwrap();
        std::fs::write(videos.join("nested").join("two.MKV"), b"v").unwrap();
        std::fs::write(videos.join("notes.txt"), b"not a video").unwrap();
        std::fs::write(videos.join("old_dubbed.mp4"), b"already dubbed").unwrap();

        let workflow = harness.workflow(FakeMedia::new(10.0, 10.0), transcriber_returning("Hello", "en"), echo_translator(), writing_synthesizer());
        let out = harness.io.path().join("dubbed");

        let summary = workflow.process_directory(&videos, Some(&out), "saudi-male").await.unwrap();

        assert!(summary.failed.is_empty());
        assert_eq!(summary.succeeded.len(), 2);
        assert!(out.join("one_dubbed.mov").exists());
        assert!(out.join("nested").join("two_dubbed.MKV").exists());
        assert!(harness.work_entries().is_empty());
    }

    #[tokio::test]
    async fn test_batch_keeps_same_named_videos_apart() {
        let harness = Harness::new();
        let videos = harness.io.path().join("videos");
        for part in ["a", "b"] {
            std::fs::create_dir_all(videos.join(part)).unwrap();
            std::fs::write(videos.join(part).join("intro.mp4"), part.as_bytes()).unwrap();
        }

        let workflow = harness.workflow(FakeMedia::new(10.0, 10.0), transcriber_returning("Hello", "en"), echo_translator(), writing_synthesizer());
        let out = harness.io.path().join("dubbed");

        let summary = workflow.process_directory(&videos, Some(&out), "saudi-male").await.unwrap();

        assert_eq!(
            summary.succeeded,
            vec![
                out.join("a").join("intro_dubbed.mp4"),
                out.join("b").join("intro_dubbed.mp4"),
            ]
        );
        assert!(summary.succeeded.iter().all(|p| p.exists()));
    }

    #[tokio::test]
    async fn test_batch_writes_beside_inputs_by_default() {
        let harness = Harness::new();
        let videos = harness.io.path().join("videos");
        std::fs::create_dir_all(videos.join("week1")).unwrap();
        std::fs::write(videos.join("week1").join("intro.mp4"), b"v").unwrap();

        let workflow = harness.workflow(FakeMedia::new(10.0, 10.0), transcriber_returning("Hello", "en"), echo_translator(), writing_synthesizer());
        let summary = workflow.process_directory(&videos, None, "saudi-male").await.unwrap();

        assert_eq!(summary.succeeded, vec![videos.join("week1").join("intro_dubbed.mp4")]);
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("/videos/talk.mkv")),
            PathBuf::from("/videos/talk_dubbed.mkv")
        );
        assert_eq!(supported_extension(Path::new("a.MP4")).unwrap(), "mp4");
    }
}
