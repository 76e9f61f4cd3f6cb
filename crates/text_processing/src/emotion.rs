//! Emotion tagging by fixed keyword priority
//!
//! Categories overlap in vocabulary, so the first category to match in
//! priority order wins: caring, happy, listening. Keywords are plain
//! case-insensitive substrings, so "hi" also fires on "this". Markers inside
//! `*stage directions*` are tried next, then `neutral`.

use once_cell::sync::Lazy;
use regex::Regex;

use snow_paws_core::Emotion;

static STAGE_DIRECTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*([^*\n]+)\*").expect("valid stage direction regex"));

/// Keywords and stage-direction markers for one emotion
struct Category {
    emotion: Emotion,
    /// Lowercase substrings
    keywords: &'static [&'static str],
    /// Substrings looked up inside stage directions
    markers: &'static [&'static str],
}

const PRIORITY: [Category; 3] = [
    Category {
        emotion: Emotion::Caring,
        keywords: &[
            "hurt", "pain", "sick", "scared", "afraid", "ouch", "worried", "nervous", "sorry",
            "duele", "enfermo", "miedo",
        ],
        markers: &[
            "softly", "gently", "gentle", "concerned", "hug", "pat", "comfort", "suave",
            "preocupad",
        ],
    },
    Category {
        emotion: Emotion::Happy,
        keywords: &[
            "great job", "well done", "brave", "excellent", "amazing", "fantastic", "happy",
            "excited", "great", "hello", "hi", "hola", "muy bien", "excelente", "valiente",
            "fantástico",
        ],
        markers: &[
            "waves", "smiles", "sparkle", "swishes", "excited", "happily", "bounces", "mueve",
            "sonríe", "feliz",
        ],
    },
    Category {
        emotion: Emotion::Listening,
        keywords: &["how", "what", "why", "when", "where", "?", "¿", "cómo", "qué"],
        markers: &[
            "listens", "tilts", "thought", "thinking", "ponders", "adjusts glasses", "escucha",
            "inclina", "pensativ",
        ],
    },
];

/// Maps chat text to one of the four emotion labels
#[derive(Debug, Clone, Copy, Default)]
pub struct EmotionClassifier;

impl EmotionClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Emotion for a reply on its own
    pub fn classify(&self, reply: &str) -> Emotion {
        self.classify_texts(&[reply])
    }

    /// Emotion for a whole exchange; the user's message is checked first
    pub fn classify_exchange(&self, user: &str, reply: &str) -> Emotion {
        self.classify_texts(&[user, reply])
    }

    fn classify_texts(&self, texts: &[&str]) -> Emotion {
        let lowered: Vec<String> = texts.iter().map(|t| t.to_lowercase()).collect();

        for category in &PRIORITY {
            let hit = lowered
                .iter()
                .any(|text| category.keywords.iter().any(|k| text.contains(k)));
            if hit {
                return category.emotion;
            }
        }

        let directions: Vec<String> = texts
            .iter()
            .flat_map(|t| STAGE_DIRECTION.captures_iter(t))
            .map(|caps| caps[1].to_lowercase())
            .collect();
        if directions.is_empty() {
            return Emotion::Neutral;
        }

        PRIORITY
            .iter()
            .find(|category| {
                directions
                    .iter()
                    .any(|d| category.markers.iter().any(|m| d.contains(m)))
            })
            .map(|category| category.emotion)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caring_beats_happy() {
        let classifier = EmotionClassifier::new();
        assert_eq!(classifier.classify("ouch that hurts"), Emotion::Caring);
        assert_eq!(
            classifier.classify("You are so brave, I'm sorry it hurts"),
            Emotion::Caring
        );
    }

    #[test]
    fn test_greeting_is_happy() {
        let classifier = EmotionClassifier::new();
        assert_eq!(classifier.classify("hello"), Emotion::Happy);
        assert_eq!(classifier.classify("¡Hola, amiguito!"), Emotion::Happy);
        assert_eq!(classifier.classify("Great job today"), Emotion::Happy);
    }

    #[test]
    fn test_question_is_listening() {
        let classifier = EmotionClassifier::new();
        assert_eq!(classifier.classify("Tell me more?"), Emotion::Listening);
        assert_eq!(classifier.classify("¿Y después"), Emotion::Listening);
    }

    #[test]
    fn test_keywords_match_inside_words() {
        let classifier = EmotionClassifier::new();
        assert_eq!(classifier.classify("a sickness came"), Emotion::Caring);
        assert_eq!(classifier.classify("It went painfully slow"), Emotion::Caring);
        // "this" contains "hi"
        assert_eq!(classifier.classify("this is a thing"), Emotion::Happy);
        assert_eq!(classifier.classify("SOMEHOW"), Emotion::Listening);
    }

    #[test]
    fn test_stage_direction_markers() {
        let classifier = EmotionClassifier::new();
        assert_eq!(
            classifier.classify("*ponders quietly* Let me see..."),
            Emotion::Listening
        );
        assert_eq!(
            classifier.classify("*swishes tail* The sky is blue."),
            Emotion::Happy
        );
        assert_eq!(
            classifier.classify("*gives a gentle hug* There there."),
            Emotion::Caring
        );
    }

    #[test]
    fn test_markers_outside_directions_ignored() {
        let classifier = EmotionClassifier::new();
        assert_eq!(classifier.classify("The river waves along."), Emotion::Neutral);
    }

    #[test]
    fn test_exchange_checks_user_text_first() {
        let classifier = EmotionClassifier::new();
        assert_eq!(
            classifier.classify_exchange("my tummy is sick", "Let's rest together."),
            Emotion::Caring
        );
        // Listening in the user text loses to happy in the reply
        assert_eq!(
            classifier.classify_exchange("what now?", "Amazing idea!"),
            Emotion::Happy
        );
    }

    #[test]
    fn test_default_is_neutral() {
        assert_eq!(EmotionClassifier::new().classify("The sky is blue."), Emotion::Neutral);
    }
}
