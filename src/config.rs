//! Run configuration: an optional TOML file whose fields are all optional,
//! resolved against built-in defaults into [`Settings`].
//!
//! ```toml
//! [retry]
//! max_attempts = 3
//! backoff_base = 2.0
//!
//! [resolver]
//! retries = 3
//! match_threshold = 0.8
//!
//! [[credits.probes]]
//! name = "song-credits-section"
//! container = "section.SongCredits"
//! items = ["a.SongCredit__AArtistLink"]
//!
//! [artists]
//! "Adele" = "4dpARuHxo51G3z768sgnrY"
//! ```

use anyhow::{bail, Context, Result};
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::cleaner::DEFAULT_MIN_CHARS;
use crate::client::RetryPolicy;
use crate::credits::{default_probes, CreditProbe};
use crate::matching::DEFAULT_THRESHOLD;
use crate::normalize::match_text;
use crate::resolver::ResolverSettings;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

// ============================================================================
// File layer
// ============================================================================

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    pub retry: Option<RetryConfig>,
    pub resolver: Option<ResolverConfig>,
    pub cleaner: Option<CleanerConfig>,
    pub credits: Option<CreditsConfig>,
    /// Artist name -> catalog-provider artist id
    pub artists: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: Option<u32>,
    pub backoff_base: Option<f64>,
    pub max_backoff_secs: Option<u64>,
    pub default_rate_limit_wait_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ResolverConfig {
    pub retries: Option<u32>,
    pub retry_delay_secs: Option<u64>,
    pub match_threshold: Option<f64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct CleanerConfig {
    pub min_chars: Option<usize>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct CreditsConfig {
    /// Replaces the built-in probe list when present
    pub probes: Option<Vec<ProbeConfig>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProbeConfig {
    pub name: String,
    pub container: String,
    pub items: Vec<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

// ============================================================================
// Artist registry
// ============================================================================

/// Known artist ids for the genre lookup, keyed by folded artist name.
#[derive(Debug, Clone, Default)]
pub struct ArtistRegistry {
    ids: FxHashMap<String, String>,
}

impl ArtistRegistry {
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let ids = entries
            .into_iter()
            .map(|(name, id)| (match_text(name.as_ref()), id.into()))
            .collect();
        Self { ids }
    }

    pub fn id_for(&self, artist: &str) -> Option<&str> {
        self.ids.get(&match_text(artist)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

// ============================================================================
// Resolved settings
// ============================================================================

pub struct Settings {
    pub retry: RetryPolicy,
    pub request_timeout: Duration,
    pub resolver: ResolverSettings,
    pub match_threshold: f64,
    pub min_chars: usize,
    pub probes: Vec<CreditProbe>,
    pub registry: ArtistRegistry,
}

impl Settings {
    /// Apply file overrides on top of the defaults and validate the result.
    pub fn resolve(file: FileConfig) -> Result<Self> {
        let retry_cfg = file.retry.unwrap_or_default();
        let resolver_cfg = file.resolver.unwrap_or_default();
        let cleaner_cfg = file.cleaner.unwrap_or_default();
        let credits_cfg = file.credits.unwrap_or_default();

        let defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            max_attempts: retry_cfg.max_attempts.unwrap_or(defaults.max_attempts),
            backoff_base: retry_cfg.backoff_base.unwrap_or(defaults.backoff_base),
            max_backoff: retry_cfg
                .max_backoff_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.max_backoff),
            default_rate_limit_wait: retry_cfg
                .default_rate_limit_wait_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.default_rate_limit_wait),
        };
        if retry.max_attempts == 0 {
            bail!("retry.max_attempts must be at least 1");
        }
        if retry.backoff_base.is_nan() || retry.backoff_base < 1.0 {
            bail!("retry.backoff_base must be >= 1.0, got {}", retry.backoff_base);
        }

        let resolver_defaults = ResolverSettings::default();
        let resolver = ResolverSettings {
            retries: resolver_cfg.retries.unwrap_or(resolver_defaults.retries),
            retry_delay: resolver_cfg
                .retry_delay_secs
                .map(Duration::from_secs)
                .unwrap_or(resolver_defaults.retry_delay),
        };

        let match_threshold = resolver_cfg.match_threshold.unwrap_or(DEFAULT_THRESHOLD);
        if !(0.0..=1.0).contains(&match_threshold) {
            bail!("resolver.match_threshold must be within 0.0..=1.0, got {}", match_threshold);
        }

        let probes = match credits_cfg.probes {
            Some(list) if list.is_empty() => bail!("credits.probes is empty"),
            Some(list) => list
                .iter()
                .map(|p| CreditProbe::parse(&p.name, &p.container, &p.items))
                .collect::<Result<Vec<_>>>()?,
            None => default_probes()?,
        };

        Ok(Self {
            retry,
            request_timeout: Duration::from_secs(
                retry_cfg.request_timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
            resolver,
            match_threshold,
            min_chars: cleaner_cfg.min_chars.unwrap_or(DEFAULT_MIN_CHARS),
            probes,
            registry: ArtistRegistry::new(file.artists),
        })
    }

    /// Load `path` when given, otherwise run on defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings.retry.max_attempts, 3);
        assert_eq!(settings.retry.default_rate_limit_wait, Duration::from_secs(5));
        assert_eq!(settings.resolver.retries, 3);
        assert_eq!(settings.resolver.retry_delay, Duration::from_secs(5));
        assert_eq!(settings.match_threshold, 0.8);
        assert_eq!(settings.min_chars, 100);
        assert_eq!(settings.request_timeout, Duration::from_secs(15));
        assert_eq!(settings.probes.len(), 4);
        assert!(settings.registry.is_empty());
    }

    #[test]
    fn test_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.toml");
        std::fs::write(
            &path,
            r#"
[retry]
max_attempts = 5
default_rate_limit_wait_secs = 10

[resolver]
match_threshold = 0.9

[cleaner]
min_chars = 40

[[credits.probes]]
name = "writers"
container = "div.writers"
items = ["span"]

[artists]
"Beyoncé" = "6vWDO969PvNqNYHIOW5v0m"
"#,
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.retry.max_attempts, 5);
        assert_eq!(settings.retry.backoff_base, 2.0);
        assert_eq!(settings.retry.default_rate_limit_wait, Duration::from_secs(10));
        assert_eq!(settings.match_threshold, 0.9);
        assert_eq!(settings.min_chars, 40);
        assert_eq!(settings.probes.len(), 1);
        assert_eq!(settings.probes[0].name, "writers");
        assert_eq!(settings.registry.id_for("BEYONCE"), Some("6vWDO969PvNqNYHIOW5v0m"));
        assert_eq!(settings.registry.id_for("Adele"), None);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let bad_threshold: FileConfig = toml::from_str("[resolver]\nmatch_threshold = 1.5").unwrap();
        assert!(Settings::resolve(bad_threshold).is_err());

        let bad_selector: FileConfig =
            toml::from_str("[[credits.probes]]\nname = \"x\"\ncontainer = \"div[\"\nitems = [\"li\"]").unwrap();
        assert!(Settings::resolve(bad_selector).is_err());

        let zero_attempts: FileConfig = toml::from_str("[retry]\nmax_attempts = 0").unwrap();
        assert!(Settings::resolve(zero_attempts).is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(Settings::load(Some(Path::new("/nonexistent/run.toml"))).is_err());
    }
}
