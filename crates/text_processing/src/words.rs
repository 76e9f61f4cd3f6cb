//! Word-level helpers shared by the heuristics

use unicode_segmentation::UnicodeSegmentation;

/// Lowercase words (letters, digits and apostrophes kept together)
pub(crate) fn words(text: &str) -> Vec<String> {
    text.unicode_words().map(|w| w.to_lowercase()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_split_punctuation() {
        assert_eq!(words("¡Hola, amigo!"), vec!["hola", "amigo"]);
        assert_eq!(words("I'll be OK"), vec!["i'll", "be", "ok"]);
    }
}
