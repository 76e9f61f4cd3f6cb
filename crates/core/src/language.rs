//! Supported conversation languages
//!
//! English is the pivot language: every reply is generated in English and
//! translated for the other supported language.

use serde::{Deserialize, Serialize};

/// Supported languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Spanish,
}

impl Language {
    /// The pivot language used for generation
    pub const PIVOT: Language = Language::English;

    /// All supported languages
    pub fn all() -> &'static [Language] {
        &[Language::English, Language::Spanish]
    }

    /// Get ISO 639-1 code
    pub fn code(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Spanish => "es",
        }
    }

    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Spanish => "Spanish",
        }
    }

    /// Parse from an ISO code, tolerating case and surrounding whitespace
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_lowercase().as_str() {
            "en" | "eng" | "english" => Some(Self::English),
            "es" | "spa" | "spanish" | "español" => Some(Self::Spanish),
            _ => None,
        }
    }

    pub fn is_pivot(&self) -> bool {
        *self == Self::PIVOT
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip() {
        for lang in Language::all() {
            assert_eq!(Language::from_code(lang.code()), Some(*lang));
        }
    }

    #[test]
    fn test_from_code_is_lenient() {
        assert_eq!(Language::from_code(" ES\n"), Some(Language::Spanish));
        assert_eq!(Language::from_code("fr"), None);
    }

    #[test]
    fn test_pivot() {
        assert!(Language::English.is_pivot());
        assert!(!Language::Spanish.is_pivot());
        assert_eq!(Language::default(), Language::PIVOT);
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&Language::Spanish).unwrap();
        assert_eq!(json, "\"spanish\"");
    }
}
