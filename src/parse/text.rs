// src/parse/text.rs
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static LINE_BREAK_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
static CODE_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{1,4}$").unwrap());

/// Decompose and drop combining marks: "Descrição" → "Descricao".
pub fn strip_accents(s: &str) -> String {
    s.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Comparison form: accents stripped, lower-cased, embedded `<br>` markup
/// flattened, whitespace collapsed to single spaces.
pub fn norm(s: &str) -> String {
    let flat = LINE_BREAK_TAG.replace_all(s, " ");
    let folded = strip_accents(&flat).to_lowercase();
    WHITESPACE.replace_all(folded.trim(), " ").into_owned()
}

/// Display form for pass-through metric headers: accents stripped,
/// title-cased, with the SUS acronym restored.
pub fn pretty(s: &str) -> String {
    let folded = strip_accents(s);
    let collapsed = WHITESPACE.replace_all(folded.trim(), " ");
    title_case(&collapsed).replace("Sus", "SUS")
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

/// True for the bounded numeric pattern that identifies item codes
/// (1–4 digits, nothing else).
pub fn looks_like_code(s: &str) -> bool {
    CODE_TOKEN.is_match(s)
}

/// Locale-tolerant count coercion.
///
/// Strips non-breaking spaces, plain spaces and "." thousands separators;
/// a "," is taken as the decimal separator and the fraction discarded.
/// "-", "NA", "N/A" and the empty string are explicit zero markers.
/// Returns `None` for anything else — callers decide between zero-filling
/// (known numeric metrics) and keeping the text.
pub fn coerce_count(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return Some(0);
    }
    let upper = trimmed.to_uppercase();
    if upper == "NA" || upper == "N/A" {
        return Some(0);
    }
    let cleaned: String = trimmed
        .chars()
        .filter(|c| !matches!(c, '\u{00A0}' | ' ' | '.'))
        .collect();
    let integral = cleaned.split(',').next().unwrap_or("");
    if integral.is_empty() {
        return None;
    }
    integral.parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn norm_strips_accents_and_markup() {
        assert_eq!(norm("Descrição"), "descricao");
        assert_eq!(norm("  Leitos<br/>Existentes  "), "leitos existentes");
        assert_eq!(norm("EM\u{a0} USO"), "em uso");
        assert_eq!(norm("Código"), "codigo");
    }

    #[test]
    fn pretty_restores_sus() {
        assert_eq!(pretty("quantidade sus"), "Quantidade SUS");
        assert_eq!(pretty("  em   uso "), "Em Uso");
    }

    #[test]
    fn code_tokens_are_bounded() {
        assert!(looks_like_code("1"));
        assert!(looks_like_code("1234"));
        assert!(!looks_like_code("12345"));
        assert!(!looks_like_code("12a"));
        assert!(!looks_like_code(""));
        assert!(!looks_like_code("Total"));
    }

    #[test]
    fn coercion_handles_locale_forms() {
        assert_eq!(coerce_count("1.234"), Some(1234));
        assert_eq!(coerce_count("1\u{a0}234"), Some(1234));
        assert_eq!(coerce_count("1 234"), Some(1234));
        assert_eq!(coerce_count("12,5"), Some(12));
        assert_eq!(coerce_count("-42"), Some(-42));
    }

    #[test]
    fn coercion_maps_missing_markers_to_zero() {
        assert_eq!(coerce_count(""), Some(0));
        assert_eq!(coerce_count("  "), Some(0));
        assert_eq!(coerce_count("-"), Some(0));
        assert_eq!(coerce_count("NA"), Some(0));
        assert_eq!(coerce_count("n/a"), Some(0));
    }

    #[test]
    fn coercion_rejects_garbage() {
        assert_eq!(coerce_count("abc"), None);
        assert_eq!(coerce_count("12abc"), None);
        assert_eq!(coerce_count(","), None);
    }
}
