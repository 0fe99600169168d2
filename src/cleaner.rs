//! Lyrics cleaning with an explicit confidence tier.
//!
//! Raw scraped text carries translation menus, promo blocks and embed
//! counters around the actual song. Cleaning either passes every checkpoint
//! (`Confidence::Clean`) or gives up and hands back the raw text untouched
//! (`Confidence::UnverifiedFallback`). Partially cleaned text never escapes.

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{CleanFailure, Confidence, ResolvedLyrics};
use crate::observe::{Event, Observer};
use crate::rules::{apply, first_match, Matcher, Rule, Verdict};

// ============================================================================
// Constants
// ============================================================================

pub const DEFAULT_MIN_CHARS: usize = 100;

/// Language names that appear in translation menus above the lyrics.
/// Includes the mangled forms scraped pages sometimes contain.
pub const LANGUAGE_DENYLIST: &[&str] = &[
    "Trke",
    "Español",
    "Português",
    "Italiano",
    "Deutsch",
    "Српски",
    "Franais",
    "Türkçe",
    "Ελληνικά",
    "Français",
    "فارسی",
    "العربية",
];

/// A bracketed section label: "[Verse 1]", "[Chorus: Artist]"
static STRUCTURAL_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\]\n]+\]").unwrap());

static LEADING_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[[^\]\n]+\]").unwrap());

// ============================================================================
// Rule Lists
// ============================================================================

/// Per-line rules, evaluated in order on every line after the first marker.
pub fn default_line_rules() -> Result<Vec<Rule>> {
    let mut rules = vec![Rule::drop("translations-menu", Matcher::prefix("Translations"))];
    for &lang in LANGUAGE_DENYLIST {
        rules.push(Rule::drop(lang, Matcher::contains(lang)));
    }
    rules.extend([
        Rule::drop("ticket-promo", Matcher::pattern(r"See .* LiveGet tickets as low as")?),
        Rule::drop("related-songs", Matcher::pattern(r"You might also like")?),
        Rule::strip("embed-counter", Matcher::pattern(r"\d+Embed")?),
        Rule::strip("contributor-counter", Matcher::pattern(r"\d+ Contributors")?),
    ]);
    Ok(rules)
}

/// Openers of chart and playlist pages that get returned in place of a song.
/// Matched at the start of any line, with or without a bracket.
pub fn default_listicle_rules() -> Result<Vec<Rule>> {
    Ok(vec![
        Rule::drop(
            "top-songs",
            Matcher::pattern(r"(?im)^\[?\s*top\s+(?:\d+\s+)?(?:canciones|songs|tracks)\s+(?:de|of)\b")?,
        ),
        Rule::drop("new-music-friday", Matcher::pattern(r"(?im)^\[?\s*new music friday")?),
    ])
}

// ============================================================================
// Cleaner
// ============================================================================

pub struct LyricsCleaner {
    line_rules: Vec<Rule>,
    listicle_rules: Vec<Rule>,
    min_chars: usize,
}

impl LyricsCleaner {
    pub fn new(min_chars: usize) -> Result<Self> {
        Ok(Self {
            line_rules: default_line_rules()?,
            listicle_rules: default_listicle_rules()?,
            min_chars,
        })
    }

    /// Run every checkpoint, returning the cleaned text or the first failure.
    pub fn check(&self, raw: &str) -> Result<String, CleanFailure> {
        let start = STRUCTURAL_MARKER
            .find(raw)
            .map(|m| m.start())
            .ok_or(CleanFailure::NoStructuralMarker)?;

        let mut kept: Vec<String> = Vec::new();
        for line in raw[start..].split('\n') {
            if let Verdict::Keep(text) = apply(&self.line_rules, line) {
                kept.push(text.into_owned());
            }
        }
        let cleaned = kept.join("\n").trim().to_string();

        if !LEADING_MARKER.is_match(&cleaned) {
            return Err(CleanFailure::MarkerRemoved);
        }
        if first_match(&self.listicle_rules, &cleaned).is_some() {
            return Err(CleanFailure::ListicleOpener);
        }
        if cleaned.chars().count() < self.min_chars {
            return Err(CleanFailure::TooShort);
        }
        Ok(cleaned)
    }

    /// Clean `raw`, falling back to it verbatim when any checkpoint fails.
    pub fn clean(&self, obs: &Observer, raw: &str) -> ResolvedLyrics {
        match self.check(raw) {
            Ok(text) => ResolvedLyrics {
                text,
                confidence: Confidence::Clean,
            },
            Err(reason) => {
                obs.record(Event::CleaningFallback { reason });
                ResolvedLyrics {
                    text: raw.to_string(),
                    confidence: Confidence::UnverifiedFallback,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cleaner() -> LyricsCleaner {
        LyricsCleaner::new(DEFAULT_MIN_CHARS).unwrap()
    }

    fn long_song() -> String {
        let mut raw = String::from("3 ContributorsTranslationsEspañolSome Song Lyrics\n");
        raw.push_str("[Verse 1]\n");
        for i in 0..6 {
            raw.push_str(&format!("This is lyric line number {}\n", i));
        }
        raw.push_str("You might also like\n");
        raw.push_str("[Chorus]\nSing it loud, sing it clear\n");
        raw.push_str("See Some Artist LiveGet tickets as low as $45\n");
        raw.push_str("Last line of the song12Embed\n");
        raw
    }

    #[test]
    fn test_short_result_returns_raw_unchanged() {
        let obs = Observer::capturing();
        let raw = "Some promo text\n[Verse 1]\nLine one\n12Embed\n";
        let result = cleaner().clean(&obs, raw);
        assert_eq!(result.text, raw);
        assert_eq!(result.confidence, Confidence::UnverifiedFallback);
        assert_eq!(
            obs.events(),
            vec![Event::CleaningFallback {
                reason: CleanFailure::TooShort
            }]
        );
    }

    #[test]
    fn test_short_result_cleans_with_low_threshold() {
        let c = LyricsCleaner::new(10).unwrap();
        let raw = "Some promo text\n[Verse 1]\nLine one\n12Embed\n";
        assert_eq!(c.check(raw), Ok("[Verse 1]\nLine one".to_string()));
    }

    #[test]
    fn test_long_song_is_clean() {
        let obs = Observer::new();
        let result = cleaner().clean(&obs, &long_song());
        assert_eq!(result.confidence, Confidence::Clean);
        assert!(result.text.starts_with("[Verse 1]\nThis is lyric line number 0"));
        assert!(result.text.ends_with("Last line of the song"));
        assert!(!result.text.contains("You might also like"));
        assert!(!result.text.contains("LiveGet tickets"));
        assert!(!result.text.contains("Embed"));
        assert!(!result.text.contains("Translations"));
        assert_eq!(obs.stats().cleaning_fallbacks, 0);
    }

    #[test]
    fn test_clean_is_idempotent() {
        let c = cleaner();
        let once = c.check(&long_song()).unwrap();
        assert_eq!(c.check(&once), Ok(once.clone()));
    }

    #[test]
    fn test_no_marker() {
        let raw = "just some words without any section labels at all";
        assert_eq!(cleaner().check(raw), Err(CleanFailure::NoStructuralMarker));
    }

    #[test]
    fn test_marker_line_dropped() {
        // The only marker sits on a translation-menu line
        let raw = "[Letra en Español]\nLine one\nLine two";
        assert_eq!(cleaner().check(raw), Err(CleanFailure::MarkerRemoved));
    }

    #[test]
    fn test_listicle_rejected() {
        let mut raw = String::from("[Top Canciones de 2023]\n");
        for i in 0..10 {
            raw.push_str(&format!("{}. Someone - Some Song Title\n", i + 1));
        }
        assert_eq!(cleaner().check(&raw), Err(CleanFailure::ListicleOpener));

        let mut raw = String::from("[Intro]\nNew Music Friday 03/15\n");
        raw.push_str(&"Artist - Track\n".repeat(10));
        assert_eq!(cleaner().check(&raw), Err(CleanFailure::ListicleOpener));
    }

    #[test]
    fn test_min_chars_counts_characters() {
        let c = LyricsCleaner::new(12).unwrap();
        // 12 characters, more bytes
        assert!(c.check("[V]\néééééééé").is_ok());
        assert_eq!(c.check("[V]\nééééééé"), Err(CleanFailure::TooShort));
    }
}
