//! Match validation for lyric-source search results.
//!
//! A candidate is accepted only when its URL is a song lyrics page AND both
//! its title and its artist are similar enough to what was asked for.
//! Title-only or artist-only agreement lets covers and same-name songs in.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{LyricCandidate, MatchDecision, MatchReason};
use crate::normalize::match_text;
use crate::rules::{first_match, Matcher, Rule};

// ============================================================================
// Thresholds
// ============================================================================

/// Minimum similarity (0.0 to 1.0) for title and artist alike
pub const DEFAULT_THRESHOLD: f64 = 0.8;

// ============================================================================
// Patterns
// ============================================================================

/// Separators between credited artists: "&", ",", "feat.", "ft.", "x", "with"
pub static ARTIST_SEPARATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*(?:[&/,•+×]|(?:\s+(?:x|vs\.?|and|with|feat\.?|ft\.?)\s+))\s*").unwrap()
});

/// Song pages end in "-lyrics" (or live under a /lyrics/ path).
static LYRICS_PAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(?:-lyrics/?$|/lyrics/)").unwrap());

/// Non-song resources a search may return instead of a song page.
fn default_url_rules() -> Vec<Rule> {
    vec![
        Rule::drop("artist-index", Matcher::contains("/artists/")),
        Rule::drop("album-page", Matcher::contains("/albums/")),
        Rule::drop("annotation", Matcher::contains("annotated")),
        Rule::drop("user-profile", Matcher::contains("/users/")),
        Rule::drop("discography", Matcher::contains("discography")),
        Rule::drop("article", Matcher::contains("/a/")),
    ]
}

// ============================================================================
// Similarity
// ============================================================================

/// Case-insensitive normalized similarity (0.0 to 1.0) after folding.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = match_text(a);
    let b = match_text(b);
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    strsim::normalized_levenshtein(&a, &b)
}

/// Best similarity of `expected` against the whole credited-artist string
/// and each individually credited artist.
pub fn artist_similarity(candidate_artist: &str, expected: &str) -> f64 {
    let whole = similarity(candidate_artist, expected);
    ARTIST_SEPARATOR
        .split(candidate_artist)
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(|a| similarity(a, expected))
        .fold(whole, f64::max)
}

/// Strip query string and fragment before inspecting a URL.
fn url_path(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}

// ============================================================================
// Validator
// ============================================================================

pub struct MatchValidator {
    threshold: f64,
    url_rules: Vec<Rule>,
}

impl Default for MatchValidator {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl MatchValidator {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            url_rules: default_url_rules(),
        }
    }

    pub fn is_lyrics_page(&self, url: &str) -> bool {
        let path = url_path(url);
        first_match(&self.url_rules, path).is_none() && LYRICS_PAGE.is_match(path)
    }

    /// Accept/reject from the two similarity scores alone.
    pub fn decide(&self, title_similarity: f64, artist_similarity: f64) -> MatchReason {
        let title_ok = title_similarity >= self.threshold;
        let artist_ok = artist_similarity >= self.threshold;
        match (title_ok, artist_ok) {
            (true, true) => MatchReason::Accepted,
            (false, true) => MatchReason::TitleMismatch,
            (true, false) => MatchReason::ArtistMismatch,
            (false, false) => MatchReason::BothMismatch,
        }
    }

    pub fn validate(
        &self,
        candidate: &LyricCandidate,
        expected_artist: &str,
        expected_title: &str,
    ) -> MatchDecision {
        if !self.is_lyrics_page(&candidate.url) {
            return MatchDecision {
                accepted: false,
                reason: MatchReason::WrongResourceKind,
                title_similarity: 0.0,
                artist_similarity: 0.0,
            };
        }

        let title_similarity = similarity(&candidate.title, expected_title);
        let artist_similarity = artist_similarity(&candidate.artist, expected_artist);
        let reason = self.decide(title_similarity, artist_similarity);

        MatchDecision {
            accepted: reason == MatchReason::Accepted,
            reason,
            title_similarity,
            artist_similarity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(title: &str, artist: &str, url: &str) -> LyricCandidate {
        LyricCandidate {
            title: title.to_string(),
            artist: artist.to_string(),
            url: url.to_string(),
            raw_lyrics: None,
        }
    }

    #[test]
    fn test_both_dimensions_required() {
        let v = MatchValidator::default();
        assert_eq!(v.decide(0.95, 0.5), MatchReason::ArtistMismatch);
        assert_eq!(v.decide(0.5, 0.95), MatchReason::TitleMismatch);
        assert_eq!(v.decide(0.5, 0.5), MatchReason::BothMismatch);
        assert_eq!(v.decide(0.8, 0.8), MatchReason::Accepted);
    }

    #[test]
    fn test_exact_match_accepted() {
        let v = MatchValidator::default();
        let c = candidate("Bad Romance", "Lady Gaga", "https://genius.com/Lady-gaga-bad-romance-lyrics");
        let d = v.validate(&c, "Lady Gaga", "Bad Romance");
        assert!(d.accepted);
        assert_eq!(d.reason, MatchReason::Accepted);
        assert_eq!(d.title_similarity, 1.0);
    }

    #[test]
    fn test_case_and_accent_insensitive() {
        let v = MatchValidator::default();
        let c = candidate("HALO", "Beyonce", "https://genius.com/Beyonce-halo-lyrics");
        assert!(v.validate(&c, "Beyoncé", "Halo").accepted);
    }

    #[test]
    fn test_same_title_other_artist_rejected() {
        let v = MatchValidator::default();
        let c = candidate("Hello", "Lionel Richie", "https://genius.com/Lionel-richie-hello-lyrics");
        let d = v.validate(&c, "Adele", "Hello");
        assert!(!d.accepted);
        assert_eq!(d.reason, MatchReason::ArtistMismatch);
        assert!(d.title_similarity >= 0.99);
    }

    #[test]
    fn test_credited_artist_counts() {
        let v = MatchValidator::default();
        let c = candidate(
            "One Kiss",
            "Calvin Harris & Dua Lipa",
            "https://genius.com/Calvin-harris-and-dua-lipa-one-kiss-lyrics",
        );
        assert!(v.validate(&c, "Dua Lipa", "One Kiss").accepted);
    }

    #[test]
    fn test_wrong_resource_kind() {
        let v = MatchValidator::default();
        for url in [
            "https://genius.com/artists/Adele",
            "https://genius.com/albums/Adele/25",
            "https://genius.com/12345/Adele-hello/annotated",
            "https://genius.com/Adele-hello-annotated",
            "https://genius.com/users/someone",
            "https://genius.com/Adele",
        ] {
            let d = v.validate(&candidate("Hello", "Adele", url), "Adele", "Hello");
            assert_eq!(d.reason, MatchReason::WrongResourceKind, "url: {}", url);
            assert!(!d.accepted);
        }
    }

    #[test]
    fn test_lyrics_page_ignores_query_string() {
        let v = MatchValidator::default();
        assert!(v.is_lyrics_page("https://genius.com/Adele-hello-lyrics?utm=x"));
        assert!(v.is_lyrics_page("https://example.com/lyrics/adele/hello"));
    }

    #[test]
    fn test_artist_similarity_max_over_credits() {
        assert_eq!(artist_similarity("Drake feat. Rihanna", "Rihanna"), 1.0);
        assert!(artist_similarity("Metallica", "Adele") < 0.5);
    }
}
