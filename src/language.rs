use serde::{Deserialize, Serialize};
use std::fmt;

/// The two languages a dub run can move between
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "ar")]
    Arabic,
    #[serde(rename = "en")]
    English,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Arabic => "ar",
            Self::English => "en",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Arabic => "Arabic",
            Self::English => "English",
        }
    }

    /// The other language of the supported pair
    pub fn complement(&self) -> Self {
        match self {
            Self::Arabic => Self::English,
            Self::English => Self::Arabic,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Source and target language of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguagePair {
    pub source: Language,
    pub target: Language,
}

impl LanguagePair {
    /// Build the pair from the code reported by the transcriber
    pub fn from_detected(detected: &str) -> Self {
        let source = coerce_source_language(detected);
        Self {
            source,
            target: source.complement(),
        }
    }
}

/// Map a detected language code onto the supported pair.
///
/// Only "ar" is recognised as Arabic; every other code, including codes for
/// unsupported languages and "unknown", is treated as English.
pub fn coerce_source_language(detected: &str) -> Language {
    match detected.trim().to_lowercase().as_str() {
        "ar" => Language::Arabic,
        _ => Language::English,
    }
}

/// Whether `coerce_source_language` had to guess for this code
pub fn is_coerced(detected: &str) -> bool {
    !matches!(detected.trim().to_lowercase().as_str(), "ar" | "en")
}
