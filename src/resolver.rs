//! Per-track lyric resolution: search, validate, fetch lyrics, clean, credit.
//!
//! Each attempt ends in an explicit [`Step`]; the loop in
//! [`LyricsResolver::resolve`] only looks at that value. Search variants are
//! the sanitized title first, then the title as given. Every hit is validated
//! against the catalog title, whichever variant found it, and its page is
//! fetched only after it is accepted. A transient failure
//! retries the same variant after a fixed delay; a miss, a rejection or a
//! permanent failure moves on to the next variant. A track never aborts the
//! run: exhausting attempts or variants yields `(None, [artist])`.

use std::time::Duration;

use crate::cleaner::LyricsCleaner;
use crate::client::RateLimitedClient;
use crate::credits::CreditExtractor;
use crate::matching::MatchValidator;
use crate::models::{credits_or_artist, Confidence};
use crate::normalize::sanitize_title;
use crate::observe::{Event, Observer};
use crate::providers::{LyricSource, PageFetcher};

#[derive(Debug, Clone)]
pub struct ResolverSettings {
    /// Retries after the initial attempt
    pub retries: u32,
    /// Pause before retrying a variant after a transient failure
    pub retry_delay: Duration,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            retries: 3,
            retry_delay: Duration::from_secs(5),
        }
    }
}

/// Outcome of resolving one track.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub lyrics: Option<String>,
    /// Never empty: falls back to `[artist]`
    pub songwriters: Vec<String>,
    pub confidence: Option<Confidence>,
    pub url: Option<String>,
}

impl Resolution {
    fn unresolved(artist: &str) -> Self {
        Self {
            lyrics: None,
            songwriters: credits_or_artist(Vec::new(), artist),
            confidence: None,
            url: None,
        }
    }
}

/// How one attempt ended.
enum Step {
    Resolved(Resolution),
    /// Give up on this query variant
    NextVariant(String),
    /// Try the same variant again after the retry delay
    RetrySame(String),
}

pub struct LyricsResolver<'a> {
    client: &'a RateLimitedClient,
    source: &'a dyn LyricSource,
    pages: &'a dyn PageFetcher,
    validator: MatchValidator,
    cleaner: LyricsCleaner,
    credits: CreditExtractor,
    settings: ResolverSettings,
}

impl<'a> LyricsResolver<'a> {
    pub fn new(
        client: &'a RateLimitedClient,
        source: &'a dyn LyricSource,
        pages: &'a dyn PageFetcher,
        validator: MatchValidator,
        cleaner: LyricsCleaner,
        credits: CreditExtractor,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            client,
            source,
            pages,
            validator,
            cleaner,
            credits,
            settings,
        }
    }

    pub fn resolve(&self, obs: &Observer, artist: &str, title: &str) -> Resolution {
        let variants = [sanitize_title(title), title.to_string()];
        let max_attempts = self.settings.retries + 1;

        let mut attempt = 0;
        let mut variant = 0;
        while attempt < max_attempts && variant < variants.len() {
            attempt += 1;
            match self.attempt(obs, artist, title, &variants[variant]) {
                Step::Resolved(resolution) => return resolution,
                Step::NextVariant(reason) => {
                    variant += 1;
                    if attempt < max_attempts && variant < variants.len() {
                        obs.record(Event::TrackRetry { attempt, reason });
                    }
                }
                Step::RetrySame(reason) => {
                    if attempt < max_attempts {
                        obs.record(Event::TrackRetry { attempt, reason });
                        self.client.pause(self.settings.retry_delay);
                    }
                }
            }
        }

        obs.record(Event::TrackUnresolved { attempts: attempt });
        Resolution::unresolved(artist)
    }

    fn attempt(&self, obs: &Observer, artist: &str, title: &str, query: &str) -> Step {
        // SEARCH
        let found = self
            .client
            .call(obs, "lyrics search", || self.source.search(query, artist));
        let candidate = match found {
            Ok(Some(candidate)) => candidate,
            Ok(None) => {
                obs.record(Event::SearchMiss {
                    query: query.to_string(),
                });
                return Step::NextVariant("no search result".to_string());
            }
            Err(e) if e.is_transient() => return Step::RetrySame(e.to_string()),
            Err(e) => return Step::NextVariant(e.to_string()),
        };

        // VALIDATE
        let decision = self.validator.validate(&candidate, artist, title);
        if !decision.accepted {
            obs.record(Event::MatchRejected {
                query: query.to_string(),
                candidate_title: candidate.title,
                candidate_artist: candidate.artist,
                url: candidate.url,
                reason: decision.reason,
                title_similarity: decision.title_similarity,
                artist_similarity: decision.artist_similarity,
            });
            return Step::NextVariant(decision.reason.to_string());
        }

        // FETCH_LYRICS
        let raw = match candidate.raw_lyrics {
            Some(raw) => raw,
            None => match self
                .client
                .call(obs, "lyrics page", || self.source.fetch_lyrics(&candidate.url))
            {
                Ok(Some(raw)) => raw,
                Ok(None) => return Step::NextVariant(format!("no lyrics on {}", candidate.url)),
                Err(e) if e.is_transient() => return Step::RetrySame(e.to_string()),
                Err(e) => return Step::NextVariant(e.to_string()),
            },
        };

        // CLEAN + FETCH_CREDITS
        let lyrics = self.cleaner.clean(obs, &raw);
        let credits = self
            .credits
            .extract(obs, self.client, self.pages, &candidate.url);

        obs.record(Event::TrackResolved {
            url: candidate.url.clone(),
            confidence: lyrics.confidence,
        });
        Step::Resolved(Resolution {
            lyrics: Some(lyrics.text),
            songwriters: credits_or_artist(credits, artist),
            confidence: Some(lyrics.confidence),
            url: Some(candidate.url),
        })
    }
}
