use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Dub a single video file
    Dub {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Voice persona (key or display name)
        #[arg(short, long)]
        voice: String,

        /// Output video file (defaults to <input>_dubbed.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Dub all video files in a directory
    Batch {
        /// Input directory containing video files
        #[arg(short, long)]
        input_dir: PathBuf,

        /// Voice persona (key or display name)
        #[arg(short, long)]
        voice: String,

        /// Output directory for dubbed files
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// List available voice personas
    Voices,

    /// Show duration and streams of a media file
    Probe {
        /// Media file to inspect
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Check that external tools are installed
    Check,

    /// Write a configuration file with default values
    InitConfig {
        /// Output configuration file
        #[arg(short, long, default_value = "redub.toml")]
        output: PathBuf,
    },
}
