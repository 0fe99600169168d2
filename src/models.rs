//! Core data models for the lyrics dataset pipeline.
//!
//! This module contains the catalog input, the ephemeral lyric-source
//! candidate, the persisted dataset record, and run statistics.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Catalog Models
// ============================================================================

/// Catalog entry produced by the (external) acquisition step.
///
/// Only `artist` and `track_name` are required; the remaining fields fall back
/// to the placeholder values the acquisition step historically wrote.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct CatalogEntry {
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub track_name: String,
    #[serde(default = "default_album")]
    pub album: String,
    #[serde(default = "default_release_date")]
    pub release_date: String,
    #[serde(default = "default_song_length")]
    pub song_length: String, // mm:ss
    #[serde(default)]
    pub popularity: i64, // 0-100
    #[serde(default)]
    pub songwriters: Vec<String>, // Provisional, from the catalog only
}

fn default_album() -> String {
    "Unknown Album".to_string()
}

fn default_release_date() -> String {
    "Unknown Release Date".to_string()
}

fn default_song_length() -> String {
    "0:00".to_string()
}

impl CatalogEntry {
    pub fn new(artist: &str, track_name: &str) -> Self {
        Self {
            artist: artist.to_string(),
            track_name: track_name.to_string(),
            album: default_album(),
            release_date: default_release_date(),
            song_length: default_song_length(),
            popularity: 0,
            songwriters: Vec::new(),
        }
    }
}

// ============================================================================
// Lyric Source Models
// ============================================================================

/// Search result from the lyric-source provider.
/// Lives only for the duration of one resolution attempt.
#[derive(Clone, Debug)]
pub struct LyricCandidate {
    pub title: String,
    pub artist: String,
    pub url: String,
    /// Page text when the search already carried it; otherwise fetched
    /// from `url` only once the candidate is accepted
    pub raw_lyrics: Option<String>,
}

/// Why a candidate was rejected (or accepted) by the match validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchReason {
    Accepted,
    /// URL points at an artist index, annotation, profile, etc.
    WrongResourceKind,
    TitleMismatch,
    ArtistMismatch,
    /// Both title and artist fell below the threshold
    BothMismatch,
}

impl MatchReason {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchReason::Accepted => "accepted",
            MatchReason::WrongResourceKind => "wrong-resource-kind",
            MatchReason::TitleMismatch => "title-mismatch",
            MatchReason::ArtistMismatch => "artist-mismatch",
            MatchReason::BothMismatch => "title-and-artist-mismatch",
        }
    }
}

impl fmt::Display for MatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of the match validator. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchDecision {
    pub accepted: bool,
    pub reason: MatchReason,
    pub title_similarity: f64,
    pub artist_similarity: f64,
}

// ============================================================================
// Cleaning Models
// ============================================================================

/// How much the cleaner trusts its own output. Internal only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    Clean,
    /// Cleaning could not be confirmed; the text is the original raw lyrics
    UnverifiedFallback,
}

impl Confidence {
    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::Clean => "clean",
            Confidence::UnverifiedFallback => "unverified-fallback",
        }
    }
}

/// Checkpoint at which cleaning gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanFailure {
    NoStructuralMarker,
    MarkerRemoved,
    ListicleOpener,
    TooShort,
}

impl CleanFailure {
    pub fn as_str(self) -> &'static str {
        match self {
            CleanFailure::NoStructuralMarker => "no structural marker",
            CleanFailure::MarkerRemoved => "does not start with a structural marker after cleaning",
            CleanFailure::ListicleOpener => "matches a listicle opener",
            CleanFailure::TooShort => "too short after cleaning",
        }
    }
}

impl fmt::Display for CleanFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLyrics {
    pub text: String,
    pub confidence: Confidence,
}

// ============================================================================
// Output Models
// ============================================================================

/// One row of the persisted dataset.
///
/// Field order is the on-disk order; `lyrics` is serialized as `null` for
/// unresolved tracks rather than omitted.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct DatasetRecord {
    pub track_name: String,
    pub album: String,
    pub release_date: String,
    pub song_length: String,
    pub popularity: i64,
    pub songwriters: Vec<String>,
    pub artist: String,
    pub lyrics: Option<String>,
    pub genre: Vec<String>,
}

impl DatasetRecord {
    /// Compose a record from its catalog entry and resolution results.
    /// An empty credit list is replaced by the requesting artist.
    pub fn compose(
        entry: &CatalogEntry,
        lyrics: Option<String>,
        songwriters: Vec<String>,
        genre: Vec<String>,
    ) -> Self {
        Self {
            track_name: entry.track_name.clone(),
            album: entry.album.clone(),
            release_date: entry.release_date.clone(),
            song_length: entry.song_length.clone(),
            popularity: entry.popularity,
            songwriters: credits_or_artist(songwriters, &entry.artist),
            artist: entry.artist.clone(),
            lyrics,
            genre,
        }
    }
}

/// Substitute `[artist]` for an empty credit list.
pub fn credits_or_artist(credits: Vec<String>, artist: &str) -> Vec<String> {
    if credits.is_empty() {
        vec![artist.to_string()]
    } else {
        credits
    }
}

// ============================================================================
// Statistics (Instrumentation)
// ============================================================================

/// Per-run counters, updated by the observer as events are recorded.
#[derive(Default, Debug, Clone, Serialize)]
pub struct RunStats {
    pub catalog_entries: usize,
    pub processed: usize,

    // Resolution outcomes
    pub resolved_clean: usize,
    pub resolved_fallback: usize,
    pub unresolved: usize,

    // Skips
    pub skipped_existing: usize,
    pub skipped_duplicate: usize,
    pub skipped_invalid: usize,

    // Decisions and failures along the way
    pub search_misses: usize,
    pub match_rejections: usize,
    pub cleaning_fallbacks: usize,
    pub credit_fallbacks: usize,
    pub genre_failures: usize,

    // Network behaviour
    pub backoff_retries: usize,
    pub rate_limit_waits: usize,
    pub transient_failures: usize,
    pub permanent_failures: usize,

    pub store_recoveries: usize,

    pub elapsed_seconds: f64,
}

impl RunStats {
    /// Percentage of processed tracks that ended up with lyrics
    pub fn resolve_rate(&self) -> f64 {
        if self.processed == 0 {
            0.0
        } else {
            100.0 * (self.resolved_clean + self.resolved_fallback) as f64 / self.processed as f64
        }
    }

    /// Write stats to a JSON file
    pub fn write_to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
