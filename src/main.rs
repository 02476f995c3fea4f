//! Redub - Automated Arabic/English Video Dubbing Workflow
//!
//! Main entry point: parses the command line, sets up logging and
//! dispatches to the dubbing workflow.

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use redub::cli::{Args, Commands};
use redub::config::Config;
use redub::media::MediaProcessorFactory;
use redub::synthesize::edge_tts::EdgeTtsSynthesizer;
use redub::transcribe::whisper::WhisperTranscriber;
use redub::voice::VoiceCatalog;
use redub::workflow::{default_output_path, DubReport, DubRequest, Workflow};

const DEFAULT_CONFIG_FILE: &str = "redub.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging to both console and file
    let _guard = setup_logging(args.verbose)?;
    info!("Starting Redub - Automated Video Dubbing Workflow");

    let config = load_config(args.config.as_deref())?;

    match args.command {
        Commands::Dub { input, voice, output } => {
            let workflow = Workflow::new(config)?;
            let request = DubRequest {
                output: output.unwrap_or_else(|| default_output_path(&input)),
                input,
                persona: voice,
            };

            let report = workflow.dub(&request).await?;
            print_report(&report);
        }
        Commands::Batch { input_dir, voice, output_dir } => {
            let workflow = Workflow::new(config)?;
            let summary = workflow
                .process_directory(&input_dir, output_dir.as_deref(), &voice)
                .await?;

            println!("\nDubbed {} file(s)", summary.succeeded.len());
            for path in &summary.succeeded {
                println!("  {}", path.display());
            }
            if !summary.failed.is_empty() {
                println!("\nFailed {} file(s)", summary.failed.len());
                for (path, reason) in &summary.failed {
                    println!("  {}: {}", path.display(), reason);
                }
            }
        }
        Commands::Voices => {
            let catalog = VoiceCatalog::new(config.voices)?;

            println!("\nAvailable Voice Personas:");
            println!("{:<18} {:<16} {:<24} {:<30}", "Key", "Name", "Arabic Voice", "English Voice");
            println!("{}", "-".repeat(88));
            for profile in catalog.profiles() {
                println!(
                    "{:<18} {:<16} {:<24} {:<30}",
                    profile.key, profile.display_name, profile.ar, profile.en
                );
            }
        }
        Commands::Probe { input } => {
            let media = MediaProcessorFactory::create_processor(config.media);
            let info = media.probe(&input).await?;

            println!("\n{}", input.display());
            match info.duration {
                Some(duration) => println!("Duration: {:.3}s", duration),
                None => println!("Duration: unknown"),
            }
            println!("{:<8} {:<10} {:<12}", "Index", "Type", "Codec");
            println!("{}", "-".repeat(30));
            for stream in &info.streams {
                println!(
                    "{:<8} {:<10} {:<12}",
                    stream.index,
                    stream.codec_type,
                    stream.codec_name.as_deref().unwrap_or("-")
                );
            }
        }
        Commands::Check => {
            let mut all_ok = true;

            let media = MediaProcessorFactory::create_processor(config.media.clone());
            match media.check_availability() {
                Ok(()) => {
                    let version = media.get_version_info().await.unwrap_or_else(|_| "unknown version".to_string());
                    println!("{:<10} ok ({})", "ffmpeg", version);
                }
                Err(e) => {
                    all_ok = false;
                    println!("{:<10} missing: {}", "ffmpeg", e);
                }
            }

            match WhisperTranscriber::new(config.transcriber.clone()).check_availability().await {
                Ok(()) => println!("{:<10} ok", "whisper"),
                Err(e) => {
                    all_ok = false;
                    println!("{:<10} missing: {}", "whisper", e);
                }
            }

            match EdgeTtsSynthesizer::new(config.synthesis.clone()).check_availability().await {
                Ok(()) => println!("{:<10} ok", "edge-tts"),
                Err(e) => {
                    all_ok = false;
                    println!("{:<10} missing: {}", "edge-tts", e);
                }
            }

            if !all_ok {
                anyhow::bail!("Some required tools are not available");
            }
        }
        Commands::InitConfig { output } => {
            if output.exists() {
                anyhow::bail!("{} already exists", output.display());
            }
            Config::default().save_to_file(&output)?;
            println!("Wrote default configuration to {}", output.display());
        }
    }

    info!("Redub completed successfully");
    Ok(())
}

/// `--config`, then `./redub.toml`, then built-in defaults
fn load_config(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        return Ok(Config::from_file(path)?);
    }

    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    if local.exists() {
        info!("Found {} in current directory, loading...", DEFAULT_CONFIG_FILE);
        return Ok(Config::from_file(&local)?);
    }

    Ok(Config::default())
}

fn print_report(report: &DubReport) {
    println!("\nDubbed video: {}", report.output.display());
    println!("Run:            {}", report.run_id);
    println!(
        "Languages:      {} -> {} (detected '{}')",
        report.languages.source, report.languages.target, report.detected_language
    );
    println!("Voice:          {}", report.voice_id);
    println!("Video length:   {:.2}s", report.video_duration);
    println!("Speech length:  {:.2}s", report.speech_duration);
    match report.decision.requested_factor() {
        Some(factor) if report.decision.is_adjusted() => {
            println!("Speed factor:   {:.3} (applied)", factor)
        }
        Some(factor) => println!("Speed factor:   {:.3} (out of range, not applied)", factor),
        None => println!("Speed factor:   n/a"),
    }
    println!("Dubbed length:  {:.2}s", report.reconciled_duration);

    for message in &report.warnings {
        println!("Warning: {}", message);
    }
    if !report.cleanup.is_clean() {
        warn!("Some temporary files could not be removed: {:?}", report.cleanup.failed);
    }
}

/// Setup logging to both console and file. The returned guard flushes the file log on drop.
fn setup_logging(verbose: bool) -> Result<WorkerGuard> {
    let log_dir = std::env::current_dir()?.join(".redub").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "redub.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_file(verbose)
        .with_line_number(verbose);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("redub.log").display()
    );

    Ok(guard)
}
