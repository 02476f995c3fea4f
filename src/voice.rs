use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{DubError, Result};
use crate::language::Language;

/// A named voice persona with one synthetic voice per supported language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceProfile {
    /// Stable identifier used on the command line
    pub key: String,
    /// User-facing label
    pub display_name: String,
    /// Voice id used when speaking Arabic
    pub ar: String,
    /// Voice id used when speaking English
    pub en: String,
}

impl VoiceProfile {
    pub fn new(key: &str, display_name: &str, ar: &str, en: &str) -> Self {
        Self {
            key: key.to_string(),
            display_name: display_name.to_string(),
            ar: ar.to_string(),
            en: en.to_string(),
        }
    }

    pub fn voice_id(&self, language: Language) -> &str {
        match language {
            Language::Arabic => &self.ar,
            Language::English => &self.en,
        }
    }
}

pub fn default_voices() -> Vec<VoiceProfile> {
    vec![
        VoiceProfile::new("egyptian-female", "أنثى مصرية", "ar-EG-SalmaNeural", "en-US-JennyNeural"),
        VoiceProfile::new("algerian-male", "ذكر جزائري", "ar-DZ-IsmaelNeural", "en-US-EricNeural"),
        VoiceProfile::new("saudi-female", "أنثى سعودية", "ar-SA-ZariyahNeural", "en-US-EmmaMultilingualNeural"),
        VoiceProfile::new("saudi-male", "ذكر سعودي", "ar-SA-HamedNeural", "en-US-EricNeural"),
        VoiceProfile::new("lebanese-female", "أنثى لبنانية", "ar-LB-LaylaNeural", "en-US-EmmaMultilingualNeural"),
    ]
}

/// Read-only persona table, validated once at construction
#[derive(Debug, Clone)]
pub struct VoiceCatalog {
    profiles: Vec<VoiceProfile>,
}

impl VoiceCatalog {
    pub fn new(profiles: Vec<VoiceProfile>) -> Result<Self> {
        if profiles.is_empty() {
            return Err(DubError::Config("Voice catalog is empty".to_string()));
        }

        let mut keys = HashSet::new();
        for profile in &profiles {
            if profile.key.trim().is_empty() {
                return Err(DubError::Config(format!(
                    "Voice persona '{}' has an empty key",
                    profile.display_name
                )));
            }
            if !keys.insert(profile.key.as_str()) {
                return Err(DubError::Config(format!(
                    "Duplicate voice persona key '{}'",
                    profile.key
                )));
            }
            for language in [Language::Arabic, Language::English] {
                if profile.voice_id(language).trim().is_empty() {
                    return Err(DubError::Config(format!(
                        "Voice persona '{}' has no voice for language '{}'",
                        profile.key, language
                    )));
                }
            }
        }

        Ok(Self { profiles })
    }

    /// Look up a persona by key or display name
    pub fn select(&self, name: &str) -> Result<&VoiceProfile> {
        let name = name.trim();
        self.profiles
            .iter()
            .find(|p| p.key.eq_ignore_ascii_case(name) || p.display_name == name)
            .ok_or_else(|| {
                let known = self
                    .profiles
                    .iter()
                    .map(|p| p.key.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                DubError::Config(format!(
                    "Unknown voice persona '{}'. Available: {}",
                    name, known
                ))
            })
    }

    pub fn profiles(&self) -> &[VoiceProfile] {
        &self.profiles
    }
}
