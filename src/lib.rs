//! Redub - Automated Arabic/English Video Dubbing Workflow
//!
//! Replaces the spoken track of a video with a synthesized translation,
//! using whisper, a translation backend, edge-tts and ffmpeg.

pub mod cli;
pub mod config;
pub mod error;
pub mod language;
pub mod lifecycle;
pub mod media;
pub mod models;
pub mod reconcile;
pub mod synthesize;
pub mod transcribe;
pub mod translate;
pub mod voice;
pub mod workflow;
