//! Text cleanup before speech synthesis
//!
//! Display text carries stage directions (`*waves paw*`) and emoji that
//! should never be spoken. [`clean_for_speech`] strips them and tidies
//! punctuation; it is idempotent. [`add_speech_pauses`] is applied once,
//! after cleanup, for languages that sound rushed without extra pauses.

use once_cell::sync::Lazy;
use regex::Regex;
use snow_paws_core::Language;

/// `*...*` spans on a single line
static STAGE_DIRECTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*[^*\n]+\*").expect("valid stage direction regex"));

/// Emoji, pictographs, dingbats, variation selectors and joiners
static EMOJI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"[\x{1F000}-\x{1FAFF}\x{2600}-\x{27BF}\x{2B00}-\x{2BFF}\x{2300}-\x{23FF}\x{FE00}-\x{FE0F}\x{200D}\x{20E3}\x{E0020}-\x{E007F}]",
    )
    .expect("valid emoji regex")
});

/// Leftover markers that are not speakable
static STRAY_MARKERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[*•_~#]").expect("valid marker regex"));

static SPACE_BEFORE_PUNCT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+([,.!?;:])").expect("valid punctuation regex"));

/// Runs of the same mark (`!!!`, `¿¿`); mixed runs like `?!` are kept
static REPEATED_PUNCT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"!{2,}|\?{2,}|¡{2,}|¿{2,}|,{2,}|;{2,}|:{2,}").expect("valid repeat regex")
});

static LONG_ELLIPSIS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.{4,}").expect("valid ellipsis regex"));

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

static SENTENCE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([.!?]) (\S)").expect("valid sentence regex"));

/// Strip stage directions and emoji, then normalise punctuation and spacing
///
/// Inverted marks (`¡`, `¿`) are preserved.
pub fn clean_for_speech(text: &str) -> String {
    let text = STAGE_DIRECTION.replace_all(text, " ");
    let text = EMOJI.replace_all(&text, "");
    let text = STRAY_MARKERS.replace_all(&text, " ");
    let text = SPACE_BEFORE_PUNCT.replace_all(&text, "$1");
    let text = REPEATED_PUNCT.replace_all(&text, |caps: &regex::Captures| {
        caps[0].chars().next().map(String::from).unwrap_or_default()
    });
    let text = LONG_ELLIPSIS.replace_all(&text, "...");
    let text = WHITESPACE.replace_all(&text, " ");
    text.trim().to_string()
}

/// Insert light pause markers after sentence-ending punctuation
///
/// Only the non-pivot language gets pauses; English is returned unchanged.
pub fn add_speech_pauses(text: &str, language: Language) -> String {
    if language.is_pivot() {
        return text.to_string();
    }
    SENTENCE_END.replace_all(text, "$1 , $2").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_stage_directions_and_emoji() {
        let cleaned =
            clean_for_speech("*adjusts stethoscope* Hello! I'm Dr. Snow Paws! How are you feeling today? 🩺");
        assert_eq!(cleaned, "Hello! I'm Dr. Snow Paws! How are you feeling today?");
    }

    #[test]
    fn test_emoji_with_variation_selector() {
        assert_eq!(clean_for_speech("Stay warm ❄️ friend 🐾❤️"), "Stay warm friend");
    }

    #[test]
    fn test_preserves_inverted_punctuation() {
        let cleaned = clean_for_speech("*mueve la pata* ¡Hola, amiguito! ¿Cómo estás? 💝");
        assert_eq!(cleaned, "¡Hola, amiguito! ¿Cómo estás?");
    }

    #[test]
    fn test_collapses_punctuation_and_whitespace() {
        assert_eq!(clean_for_speech("Wow!!!   that is   great ??"), "Wow! that is great?");
        assert_eq!(clean_for_speech("Really ?!"), "Really?!");
        assert_eq!(clean_for_speech("Let me think......"), "Let me think...");
    }

    #[test]
    fn test_only_stage_directions_becomes_empty() {
        assert_eq!(clean_for_speech("*waves paw* 🐾"), "");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "*adjusts stethoscope* Hello! How are you? 🩺",
            "Hi ! ! there ,, friend",
            "• Emergency: Call 911\n• Child Help Hotline: 1-800-422-4453",
            "¡¡Hola!! ¿¿Qué tal??",
            "unbalanced * marker and **bold**",
            "Wait .... what",
        ];
        for sample in samples {
            let once = clean_for_speech(sample);
            let twice = clean_for_speech(&once);
            assert_eq!(once, twice, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn test_spanish_pauses() {
        assert_eq!(
            add_speech_pauses("¡Hola! ¿Cómo estás? Bien.", Language::Spanish),
            "¡Hola! , ¿Cómo estás? , Bien."
        );
    }

    #[test]
    fn test_english_has_no_pauses() {
        let text = "Hello! How are you?";
        assert_eq!(add_speech_pauses(text, Language::English), text);
    }
}
