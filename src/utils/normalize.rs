//! Offset-preserving text folding and tokenization
//!
//! Folding strips diacritics and lowercases, which can change how many chars a
//! piece of text occupies. Every folded char therefore remembers the range of
//! the original text it came from, and tokens are always reported against the
//! original text.

use std::ops::Range;
use unicode_normalization::char::{decompose_canonical, is_combining_mark};

/// Range of the original text a folded char was produced from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Origin {
    byte_start: usize,
    byte_end: usize,
    char_start: usize,
    char_end: usize,
}

/// Folded text with a back-mapping to the original
#[derive(Debug, Clone, Default)]
pub struct NormalizedText {
    folded: String,
    /// One entry per char of `folded`
    origins: Vec<Origin>,
}

impl NormalizedText {
    /// The folded text: lowercase, no diacritics, punctuation replaced by spaces
    pub fn as_str(&self) -> &str {
        &self.folded
    }

    pub fn is_empty(&self) -> bool {
        self.folded.is_empty()
    }

    fn push(&mut self, ch: char, origin: Origin) {
        self.folded.push(ch);
        self.origins.push(origin);
    }
}

/// A word of the input: its folded text plus where it sits in the original
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Folded token text
    pub text: String,
    /// Byte range in the original text
    pub span: Range<usize>,
    /// Char range in the original text
    pub chars: Range<usize>,
}

/// Fold `text` for matching.
///
/// Each original char is decomposed canonically, combining marks are dropped,
/// letters are lowercased and anything that is not alphanumeric becomes a
/// single space. A standalone combining mark (decomposed input) is folded into
/// the char preceding it, so spans still cover it.
pub fn normalize(text: &str) -> NormalizedText {
    let mut out = NormalizedText {
        folded: String::with_capacity(text.len()),
        origins: Vec::with_capacity(text.len()),
    };

    for (char_index, (byte_offset, ch)) in text.char_indices().enumerate() {
        let origin = Origin {
            byte_start: byte_offset,
            byte_end: byte_offset + ch.len_utf8(),
            char_start: char_index,
            char_end: char_index + 1,
        };

        if is_combining_mark(ch) {
            if let Some(last) = out.origins.last_mut() {
                last.byte_end = origin.byte_end;
                last.char_end = origin.char_end;
            }
            continue;
        }

        if ch.is_alphanumeric() {
            decompose_canonical(ch, |part| {
                if is_combining_mark(part) {
                    return;
                }
                for lower in part.to_lowercase() {
                    if !is_combining_mark(lower) {
                        out.push(lower, origin);
                    }
                }
            });
        } else {
            out.push(' ', origin);
        }
    }

    out
}

/// Split folded text into word tokens
pub fn tokenize(normalized: &NormalizedText) -> Vec<Token> {
    let mut tokens = Vec::new();
    tokenize_into(normalized, &mut tokens);
    tokens
}

/// Like [`tokenize`], reusing the capacity of `tokens`
pub fn tokenize_into(normalized: &NormalizedText, tokens: &mut Vec<Token>) {
    tokens.clear();

    let mut text = String::new();
    let mut first: Option<Origin> = None;
    let mut last: Option<Origin> = None;

    for (ch, origin) in normalized.folded.chars().zip(&normalized.origins) {
        if ch.is_alphanumeric() {
            first.get_or_insert(*origin);
            last = Some(*origin);
            text.push(ch);
        } else if let (Some(start), Some(end)) = (first.take(), last.take()) {
            tokens.push(make_token(std::mem::take(&mut text), start, end));
        }
    }

    if let (Some(start), Some(end)) = (first, last) {
        tokens.push(make_token(text, start, end));
    }
}

fn make_token(text: String, start: Origin, end: Origin) -> Token {
    Token {
        text,
        span: start.byte_start..end.byte_end,
        chars: start.char_start..end.char_end,
    }
}

/// Fold a single term (word-list entry, query word) to its matching form
pub fn fold_term(term: &str) -> String {
    normalize(term).as_str().trim().to_string()
}

/// A token can be indexed if it is non-empty and purely alphanumeric
pub fn is_indexable(token: &str) -> bool {
    !token.is_empty() && token.chars().all(char::is_alphanumeric)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(text: &str) -> Vec<String> {
        tokenize(&normalize(text)).into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn test_strips_diacritics_and_case() {
        assert_eq!(
            words("Désamorçage cardio-circulatoire"),
            vec!["desamorcage", "cardio", "circulatoire"]
        );
        assert_eq!(words("FIÈVRE Jaune"), vec!["fievre", "jaune"]);
    }

    #[test]
    fn test_punctuation_splits_tokens() {
        assert_eq!(
            words("douleur,thoracique...(intense)"),
            vec!["douleur", "thoracique", "intense"]
        );
        assert_eq!(words("d'après"), vec!["d", "apres"]);
    }

    #[test]
    fn test_precomposed_text_keeps_char_count() {
        let text = "Fièvre d'été!";
        let normalized = normalize(text);
        assert_eq!(normalized.as_str().chars().count(), text.chars().count());
        assert_eq!(normalized.as_str(), "fievre d ete ");
    }

    #[test]
    fn test_spans_index_original_text() {
        let text = "Une DOULEUR thoracique, très intense";
        for token in tokenize(&normalize(text)) {
            let original = &text[token.span.clone()];
            assert_eq!(fold_term(original), token.text);
            let by_chars: String = text
                .chars()
                .skip(token.chars.start)
                .take(token.chars.len())
                .collect();
            assert_eq!(by_chars, original);
        }
    }

    #[test]
    fn test_decomposed_marks_stay_inside_span() {
        // "cafe" + COMBINING ACUTE ACCENT, then " noir"
        let text = "cafe\u{301} noir";
        let tokens = tokenize(&normalize(text));
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].text, "cafe");
        assert_eq!(&text[tokens[0].span.clone()], "cafe\u{301}");
        assert_eq!(tokens[0].chars, 0..5);
        assert_eq!(tokens[1].text, "noir");
        assert_eq!(tokens[1].chars, 6..10);
    }

    #[test]
    fn test_multi_char_lowercase() {
        // U+0130 lowercases to "i" + COMBINING DOT ABOVE
        let tokens = tokenize(&normalize("İstanbul"));
        assert_eq!(tokens[0].text, "istanbul");
        assert_eq!(tokens[0].chars, 0..8);
    }

    #[test]
    fn test_empty_and_blank() {
        assert!(normalize("").is_empty());
        assert!(tokenize(&normalize("")).is_empty());
        assert!(tokenize(&normalize("  ... ,; ")).is_empty());
    }

    #[test]
    fn test_digits_are_words() {
        assert_eq!(words("sat 80%aa, v4v5"), vec!["sat", "80", "aa", "v4v5"]);
    }

    #[test]
    fn test_is_indexable() {
        assert!(is_indexable("douleur"));
        assert!(is_indexable("12"));
        assert!(!is_indexable(""));
        assert!(!is_indexable("c est"));
    }
}
