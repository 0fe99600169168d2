//! Run-scoped observability.
//!
//! Every retry, rate-limit wait, rejection, cleaning fallback and credit
//! fallback goes through [`Observer::record`], which emits a structured
//! `tracing` line tagged with the track being processed and updates the
//! run's [`RunStats`]. The observer is constructed per run and handed to
//! each component; nothing here is process-global.

use anyhow::{Context, Result};
use std::cell::{Ref, RefCell};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::subscriber::DefaultGuard;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::models::{CleanFailure, Confidence, MatchReason, RunStats};

/// Install a subscriber for the lifetime of one run.
///
/// Lines go to `log_file` (appended, no ANSI colours) or to stderr. Dropping
/// the returned guard restores whatever subscriber was active before.
pub fn install_run_logger(log_file: Option<&Path>) -> Result<DefaultGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let guard = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {:?}", path))?;
            let subscriber = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .finish();
            tracing::subscriber::set_default(subscriber)
        }
        None => {
            let subscriber = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_default(subscriber)
        }
    };
    Ok(guard)
}

/// Stage of the credit fallback chain that was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditStage {
    /// No structural probe matched; names came from a credits heading
    HeadingFallback,
    /// Neither probes nor heading produced names
    NoCredits,
    /// The page itself could not be fetched
    FetchFailed,
}

impl CreditStage {
    pub fn as_str(self) -> &'static str {
        match self {
            CreditStage::HeadingFallback => "heading-fallback",
            CreditStage::NoCredits => "no-credits",
            CreditStage::FetchFailed => "fetch-failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyStored,
    Duplicate,
    MissingKey,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::AlreadyStored => "already in dataset",
            SkipReason::Duplicate => "duplicate catalog entry",
            SkipReason::MissingKey => "missing artist or track name",
        }
    }
}

/// Something worth a log line.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    RateLimitWait {
        operation: String,
        wait: Duration,
    },
    BackoffRetry {
        operation: String,
        attempt: u32,
        delay: Duration,
        reason: String,
    },
    CallFailed {
        operation: String,
        transient: bool,
        reason: String,
    },
    SearchMiss {
        query: String,
    },
    MatchRejected {
        query: String,
        candidate_title: String,
        candidate_artist: String,
        url: String,
        reason: MatchReason,
        title_similarity: f64,
        artist_similarity: f64,
    },
    CleaningFallback {
        reason: CleanFailure,
    },
    CreditFallback {
        url: String,
        stage: CreditStage,
    },
    TrackRetry {
        attempt: u32,
        reason: String,
    },
    TrackResolved {
        url: String,
        confidence: Confidence,
    },
    TrackUnresolved {
        attempts: u32,
    },
    GenreLookupFailed {
        reason: String,
    },
    StoreRecovered {
        path: PathBuf,
        backup: Option<PathBuf>,
        reason: String,
    },
    Skipped {
        reason: SkipReason,
    },
}

#[derive(Debug, Clone)]
struct TrackKey {
    artist: String,
    track: String,
}

/// Observability handle for one pipeline run.
#[derive(Default)]
pub struct Observer {
    current: RefCell<Option<TrackKey>>,
    stats: RefCell<RunStats>,
    captured: Option<RefCell<Vec<Event>>>,
}

impl Observer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observer that also keeps every recorded event in memory.
    pub fn capturing() -> Self {
        Self {
            captured: Some(RefCell::new(Vec::new())),
            ..Self::default()
        }
    }

    /// Tag subsequent events with this track until [`Observer::end_track`].
    pub fn begin_track(&self, artist: &str, track: &str) {
        *self.current.borrow_mut() = Some(TrackKey {
            artist: artist.to_string(),
            track: track.to_string(),
        });
    }

    pub fn end_track(&self) {
        *self.current.borrow_mut() = None;
    }

    pub fn stats(&self) -> Ref<'_, RunStats> {
        self.stats.borrow()
    }

    pub fn update_stats(&self, f: impl FnOnce(&mut RunStats)) {
        f(&mut self.stats.borrow_mut());
    }

    /// Snapshot of captured events (empty unless built with `capturing`).
    pub fn events(&self) -> Vec<Event> {
        self.captured
            .as_ref()
            .map(|c| c.borrow().clone())
            .unwrap_or_default()
    }

    pub fn record(&self, event: Event) {
        self.count(&event);
        self.emit(&event);
        if let Some(captured) = &self.captured {
            captured.borrow_mut().push(event);
        }
    }

    fn count(&self, event: &Event) {
        let mut s = self.stats.borrow_mut();
        match event {
            Event::RateLimitWait { .. } => s.rate_limit_waits += 1,
            Event::BackoffRetry { .. } => s.backoff_retries += 1,
            Event::CallFailed { transient: true, .. } => s.transient_failures += 1,
            Event::CallFailed { transient: false, .. } => s.permanent_failures += 1,
            Event::SearchMiss { .. } => s.search_misses += 1,
            Event::MatchRejected { .. } => s.match_rejections += 1,
            Event::CleaningFallback { .. } => s.cleaning_fallbacks += 1,
            Event::CreditFallback { .. } => s.credit_fallbacks += 1,
            Event::TrackRetry { .. } => {}
            Event::TrackResolved { confidence, .. } => match confidence {
                Confidence::Clean => s.resolved_clean += 1,
                Confidence::UnverifiedFallback => s.resolved_fallback += 1,
            },
            Event::TrackUnresolved { .. } => s.unresolved += 1,
            Event::GenreLookupFailed { .. } => s.genre_failures += 1,
            Event::StoreRecovered { .. } => s.store_recoveries += 1,
            Event::Skipped { reason } => match reason {
                SkipReason::AlreadyStored => s.skipped_existing += 1,
                SkipReason::Duplicate => s.skipped_duplicate += 1,
                SkipReason::MissingKey => s.skipped_invalid += 1,
            },
        }
    }

    fn emit(&self, event: &Event) {
        let current = self.current.borrow();
        let (artist, track) = match current.as_ref() {
            Some(k) => (k.artist.as_str(), k.track.as_str()),
            None => ("-", "-"),
        };

        match event {
            Event::RateLimitWait { operation, wait } => warn!(
                artist, track, operation = %operation, wait_secs = wait.as_secs_f64(),
                "rate limited, waiting"
            ),
            Event::BackoffRetry { operation, attempt, delay, reason } => warn!(
                artist, track, operation = %operation, attempt, delay_secs = delay.as_secs_f64(),
                reason = %reason, "transient failure, backing off"
            ),
            Event::CallFailed { operation, transient, reason } => error!(
                artist, track, operation = %operation, transient, reason = %reason,
                "provider call failed"
            ),
            Event::SearchMiss { query } => warn!(
                artist, track, query = %query, "no search result"
            ),
            Event::MatchRejected {
                query,
                candidate_title,
                candidate_artist,
                url,
                reason,
                title_similarity,
                artist_similarity,
            } => warn!(
                artist, track, query = %query, candidate_title = %candidate_title,
                candidate_artist = %candidate_artist, url = %url, reason = %reason,
                title_similarity, artist_similarity, "search result rejected"
            ),
            Event::CleaningFallback { reason } => warn!(
                artist, track, reason = %reason, "lyrics cleaning fell back to raw text"
            ),
            Event::CreditFallback { url, stage } => warn!(
                artist, track, url = %url, stage = stage.as_str(), "credit extraction fallback"
            ),
            Event::TrackRetry { attempt, reason } => warn!(
                artist, track, attempt, reason = %reason, "retrying track"
            ),
            Event::TrackResolved { url, confidence } => info!(
                artist, track, url = %url, confidence = confidence.as_str(), "lyrics resolved"
            ),
            Event::TrackUnresolved { attempts } => error!(
                artist, track, attempts, "lyrics unresolved"
            ),
            Event::GenreLookupFailed { reason } => error!(
                artist, track, reason = %reason, "genre lookup failed"
            ),
            Event::StoreRecovered { path, backup, reason } => error!(
                artist, track, path = %path.display(),
                backup = %backup.as_ref().map(|b| b.display().to_string()).unwrap_or_else(|| "-".to_string()),
                reason = %reason, "dataset file unreadable, starting from an empty array"
            ),
            Event::Skipped { reason } => info!(
                artist, track, reason = reason.as_str(), "skipping catalog entry"
            ),
        }
    }
}
