//! Text normalization shared by match validation, search queries and
//! resume/dedup keys.
//!
//! CRITICAL: `track_key` decides which dataset rows count as "already done".
//! Changing it changes what a resumed run skips.

use any_ascii::any_ascii;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Parenthetical qualifiers stripped from search queries (applied in order).
/// Lyric sites file remixes and live cuts under the base song.
pub static QUALIFIER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // "(Remix)", "[Remix]", "(Club Remix)"
        Regex::new(r"(?i)\s*[\(\[](?:[^)\]]*\s)?remix[\)\]]").unwrap(),
        // "(Live)", "(Live at Wembley)", "[Live from Paris]"
        Regex::new(r"(?i)\s*[\(\[]live(?:\s+(?:at|from|in)\s+[^)\]]+)?[\)\]]").unwrap(),
        // "(Acoustic)", "(Acoustic Version)"
        Regex::new(r"(?i)\s*[\(\[]acoustic(?:\s+version)?[\)\]]").unwrap(),
        // "(2021 Remaster)", "(Remastered 2009)"
        Regex::new(r"(?i)\s*[\(\[](?:\d{4}\s+)?remaster(?:ed)?(?:\s+\d{4})?[\)\]]").unwrap(),
        // "(Radio Edit)", "(Single Version)"
        Regex::new(r"(?i)\s*[\(\[](?:radio\s+edit|single\s+version|album\s+version)[\)\]]").unwrap(),
    ]
});

/// Regex to collapse runs of whitespace into a single space
pub static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

// ============================================================================
// CHARACTER FOLDING
// ============================================================================

/// Check if a character is a Unicode combining mark (diacritical mark).
pub fn is_combining_mark(c: char) -> bool {
    matches!(c as u32, 0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0xFE20..=0xFE2F)
}

/// Fold Unicode text to lowercase ASCII: NFKD, drop combining marks, then
/// transliterate what is left.
/// e.g., "Beyoncé" → "beyonce", "Michael Bublé" → "michael buble"
pub fn fold_to_ascii(s: &str) -> String {
    let stripped: String = s.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    any_ascii(&stripped).to_lowercase()
}

/// Straighten curly quotes and spell out a standalone ampersand.
pub fn normalize_punctuation(s: &str) -> String {
    let result = s
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{00B4}', '\u{0060}'], "'")
        .replace('\u{00A0}', " ")
        .replace(" & ", " and ");
    MULTI_SPACE.replace_all(&result, " ").to_string()
}

// ============================================================================
// NORMALIZATION FUNCTIONS
// ============================================================================

/// Text used for similarity comparison: punctuation-normalized, ASCII-folded,
/// lowercase, single-spaced.
pub fn match_text(s: &str) -> String {
    let folded = fold_to_ascii(&normalize_punctuation(s));
    MULTI_SPACE.replace_all(folded.trim(), " ").to_string()
}

/// Search-friendly title with "(Remix)", "(Live)" and similar qualifiers removed.
/// Falls back to the trimmed input when stripping would leave nothing.
pub fn sanitize_title(title: &str) -> String {
    let mut result = title.to_string();
    for pattern in QUALIFIER_PATTERNS.iter() {
        result = pattern.replace_all(&result, "").to_string();
    }
    let result = result.trim();
    if result.is_empty() {
        title.trim().to_string()
    } else {
        result.to_string()
    }
}

/// Identity of a track across runs: (artist, title) after folding.
pub fn track_key(artist: &str, track_name: &str) -> (String, String) {
    (match_text(artist), match_text(track_name))
}

// ============================================================================
// TESTS
// ============================================================================
