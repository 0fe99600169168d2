//! Drives the catalog through resolve, genre lookup and persistence, one
//! track at a time and in submission order.
//!
//! Entries already in the dataset (by folded artist/title key) are skipped,
//! so re-running after an interruption picks up where the last run stopped.

use anyhow::Result;
use rustc_hash::FxHashSet;
use std::time::Instant;
use tracing::info;

use crate::client::RateLimitedClient;
use crate::models::{CatalogEntry, DatasetRecord, RunStats};
use crate::normalize::track_key;
use crate::observe::{Event, Observer, SkipReason};
use crate::progress::Progress;
use crate::providers::GenreSource;
use crate::resolver::LyricsResolver;
use crate::store::DatasetStore;

type TrackKey = (String, String);

pub struct Pipeline<'a> {
    resolver: LyricsResolver<'a>,
    client: &'a RateLimitedClient,
    genres: &'a dyn GenreSource,
    store: &'a DatasetStore,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        resolver: LyricsResolver<'a>,
        client: &'a RateLimitedClient,
        genres: &'a dyn GenreSource,
        store: &'a DatasetStore,
    ) -> Self {
        Self {
            resolver,
            client,
            genres,
            store,
        }
    }

    /// Process every catalog entry. Only store I/O errors stop the run.
    pub fn run(&self, obs: &Observer, catalog: &[CatalogEntry], progress: &Progress) -> Result<RunStats> {
        let start = Instant::now();
        obs.update_stats(|s| s.catalog_entries = catalog.len());

        let stored: FxHashSet<TrackKey> = self
            .store
            .load_all()?
            .iter()
            .map(|r| track_key(&r.artist, &r.track_name))
            .collect();
        info!(
            dataset = %self.store.path().display(),
            stored = stored.len(),
            catalog = catalog.len(),
            "starting run"
        );

        let mut submitted: FxHashSet<TrackKey> = FxHashSet::default();
        for entry in catalog {
            obs.begin_track(&entry.artist, &entry.track_name);
            progress.set_message(&format!("{} - {}", entry.artist, entry.track_name));

            let outcome = match self.admit(entry, &stored, &mut submitted) {
                Some(reason) => {
                    obs.record(Event::Skipped { reason });
                    Ok(())
                }
                None => self.process(obs, entry),
            };

            obs.end_track();
            progress.inc("lyrics");
            outcome?;
        }

        obs.update_stats(|s| s.elapsed_seconds = start.elapsed().as_secs_f64());
        let stats = obs.stats().clone();
        Ok(stats)
    }

    /// `None` if the entry should be processed, otherwise why not.
    fn admit(
        &self,
        entry: &CatalogEntry,
        stored: &FxHashSet<TrackKey>,
        submitted: &mut FxHashSet<TrackKey>,
    ) -> Option<SkipReason> {
        if entry.artist.trim().is_empty() || entry.track_name.trim().is_empty() {
            return Some(SkipReason::MissingKey);
        }
        let key = track_key(&entry.artist, &entry.track_name);
        if stored.contains(&key) {
            return Some(SkipReason::AlreadyStored);
        }
        if !submitted.insert(key) {
            return Some(SkipReason::Duplicate);
        }
        None
    }

    fn process(&self, obs: &Observer, entry: &CatalogEntry) -> Result<()> {
        let resolution = self.resolver.resolve(obs, &entry.artist, &entry.track_name);

        let genre = match self
            .client
            .call(obs, "genre lookup", || self.genres.lookup_genres(&entry.artist))
        {
            Ok(genres) => genres,
            Err(e) => {
                obs.record(Event::GenreLookupFailed { reason: e.to_string() });
                Vec::new()
            }
        };

        let record = DatasetRecord::compose(entry, resolution.lyrics, resolution.songwriters, genre);
        self.store.append(obs, &record)?;
        obs.update_stats(|s| s.processed += 1);
        Ok(())
    }
}
