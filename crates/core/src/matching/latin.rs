/// Punctuation allowed inside a Latin-alphabet title.
const ALLOWED_PUNCTUATION: &[char] = &[
    '-', '\'', '\u{2019}', ':', ',', '.', '!', '?', '&', '(', ')', '/', '+', '~', '"',
];

/// True if `text` is a plausible Latin-alphabet title.
///
/// Accepts ASCII letters, digits, whitespace and [`ALLOWED_PUNCTUATION`];
/// requires at least one letter. Anything from another script rejects the
/// whole string.
pub fn is_latin_alphabet_name(text: &str) -> bool {
    let mut has_letter = false;
    for c in text.chars() {
        if c.is_ascii_alphabetic() {
            has_letter = true;
        } else if !(c.is_ascii_digit() || c.is_whitespace() || ALLOWED_PUNCTUATION.contains(&c)) {
            return false;
        }
    }
    has_letter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_latin_titles() {
        assert!(is_latin_alphabet_name("Mo Huang Da Guan Jia"));
        assert!(is_latin_alphabet_name("Re: Monster"));
        assert!(is_latin_alphabet_name("Kaguya-sama: Love is War!"));
        assert!(is_latin_alphabet_name("86 (Eighty-Six)"));
        assert!(is_latin_alphabet_name("The Devil\u{2019}s Butler"));
    }

    #[test]
    fn test_rejects_other_scripts_and_symbols() {
        assert!(!is_latin_alphabet_name("魔皇大管家"));
        assert!(!is_latin_alphabet_name("Дьявольский дворецкий"));
        assert!(!is_latin_alphabet_name("악마 집사"));
        assert!(!is_latin_alphabet_name("Mo Huang 大管家"));
        assert!(!is_latin_alphabet_name("Title ★"));
        assert!(!is_latin_alphabet_name("Pokémon"));
    }

    #[test]
    fn test_requires_a_letter() {
        assert!(!is_latin_alphabet_name(""));
        assert!(!is_latin_alphabet_name("123"));
        assert!(!is_latin_alphabet_name(" - "));
    }
}
