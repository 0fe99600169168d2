//! Songwriter credit extraction from a lyric-source song page.
//!
//! Page markup drifts, so the probe list is ordered data: the first probe
//! that yields names wins, then a "Writing Credits" heading followed by a
//! list, then nothing. Extraction never fails; the caller substitutes the
//! requesting artist for an empty list.

use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::client::RateLimitedClient;
use crate::observe::{CreditStage, Event, Observer};
use crate::providers::PageFetcher;

static CREDITS_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)writing\s+credits").unwrap());

static HEADINGS: Lazy<Selector> = Lazy::new(|| Selector::parse("h1, h2, h3, h4, h5, h6").unwrap());

static LIST_ITEM: Lazy<Selector> = Lazy::new(|| Selector::parse("li").unwrap());

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("Invalid CSS selector {:?}: {:?}", css, e))
}

// ============================================================================
// Probes
// ============================================================================

/// One structural guess at where credits live: a container selector and
/// item selectors tried in order inside each container.
#[derive(Debug, Clone)]
pub struct CreditProbe {
    pub name: String,
    container: Selector,
    items: Vec<Selector>,
}

impl CreditProbe {
    pub fn parse(name: &str, container: &str, items: &[String]) -> Result<Self> {
        let items = items.iter().map(|s| parse_selector(s)).collect::<Result<Vec<_>>>()?;
        if items.is_empty() {
            return Err(anyhow!("Credit probe {:?} has no item selectors", name));
        }
        Ok(Self {
            name: name.to_string(),
            container: parse_selector(container)?,
            items,
        })
    }

    fn names(&self, document: &Html) -> Vec<String> {
        let mut names = Vec::new();
        for container in document.select(&self.container) {
            for item in &self.items {
                let found: Vec<String> = container.select(item).map(element_text).collect();
                if found.iter().any(|n| !n.is_empty()) {
                    names.extend(found);
                    break;
                }
            }
        }
        dedup_names(names)
    }
}

/// Probes for every credit layout the song pages have been seen with.
/// Hashed class suffixes are matched by prefix so a rebuild does not break them.
pub fn default_probes() -> Result<Vec<CreditProbe>> {
    let styled_link_then_li = ["a[class*=\"StyledLink\"]".to_string(), "li".to_string()];
    Ok(vec![
        CreditProbe::parse(
            "song-credits-section",
            "section.SongCredits",
            &["a.SongCredit__AArtistLink".to_string()],
        )?,
        CreditProbe::parse(
            "contributors-metadata",
            "div[class*=\"ContributorsCreditMetadataItem__Artists\"]",
            &styled_link_then_li,
        )?,
        CreditProbe::parse("song-info-block", "div[class*=\"SongInfo__InfoBlock\"]", &styled_link_then_li)?,
        CreditProbe::parse(
            "song-info-contributors",
            "div[class*=\"SongInfo__Contributors\"]",
            &styled_link_then_li,
        )?,
    ])
}

// ============================================================================
// Helpers
// ============================================================================

fn element_text(el: ElementRef<'_>) -> String {
    let text: String = el.text().collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drop empties and repeats, keeping first-seen order.
fn dedup_names(names: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in names {
        if !name.is_empty() && !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

/// List items of the first `<ul>` following a "Writing Credits" heading.
fn heading_names(document: &Html) -> Vec<String> {
    for heading in document.select(&HEADINGS) {
        if !CREDITS_HEADING.is_match(&element_text(heading)) {
            continue;
        }
        let list = heading
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "ul");
        if let Some(list) = list {
            let names = dedup_names(list.select(&LIST_ITEM).map(element_text).collect());
            if !names.is_empty() {
                return names;
            }
        }
    }
    Vec::new()
}

// ============================================================================
// Extractor
// ============================================================================

/// Where a credit list came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreditSource {
    Probe(String),
    Heading,
    Nothing,
}

pub struct CreditExtractor {
    probes: Vec<CreditProbe>,
}

impl CreditExtractor {
    pub fn new(probes: Vec<CreditProbe>) -> Self {
        Self { probes }
    }

    pub fn with_default_probes() -> Result<Self> {
        Ok(Self::new(default_probes()?))
    }

    /// Run the probe chain over an already fetched page.
    pub fn scan(&self, html: &str) -> (Vec<String>, CreditSource) {
        let document = Html::parse_document(html);
        for probe in &self.probes {
            let names = probe.names(&document);
            if !names.is_empty() {
                return (names, CreditSource::Probe(probe.name.clone()));
            }
        }
        let names = heading_names(&document);
        if names.is_empty() {
            (names, CreditSource::Nothing)
        } else {
            (names, CreditSource::Heading)
        }
    }

    /// Fetch `url` through the client and extract credits. Every fallback
    /// taken is recorded; errors end in an empty list.
    pub fn extract(
        &self,
        obs: &Observer,
        client: &RateLimitedClient,
        fetcher: &dyn PageFetcher,
        url: &str,
    ) -> Vec<String> {
        let html = match client.call(obs, "credits page", || fetcher.fetch_page(url)) {
            Ok(html) => html,
            Err(_) => {
                obs.record(Event::CreditFallback {
                    url: url.to_string(),
                    stage: CreditStage::FetchFailed,
                });
                return Vec::new();
            }
        };

        let (names, source) = self.scan(&html);
        match source {
            CreditSource::Probe(_) => {}
            CreditSource::Heading => obs.record(Event::CreditFallback {
                url: url.to_string(),
                stage: CreditStage::HeadingFallback,
            }),
            CreditSource::Nothing => obs.record(Event::CreditFallback {
                url: url.to_string(),
                stage: CreditStage::NoCredits,
            }),
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::instant_client;
    use crate::client::RetryPolicy;
    use crate::error::CallError;

    struct StaticPage(Result<String, CallError>);

    impl PageFetcher for StaticPage {
        fn fetch_page(&self, _url: &str) -> Result<String, CallError> {
            self.0.clone()
        }
    }

    fn extractor() -> CreditExtractor {
        CreditExtractor::with_default_probes().unwrap()
    }

    #[test]
    fn test_song_credits_section() {
        let html = r#"<section class="SongCredits">
            <a class="SongCredit__AArtistLink">Adele</a>
            <a class="SongCredit__AArtistLink"> Greg  Kurstin </a>
            <a class="SongCredit__AArtistLink">Adele</a>
        </section>"#;
        let (names, source) = extractor().scan(html);
        assert_eq!(names, vec!["Adele", "Greg Kurstin"]);
        assert_eq!(source, CreditSource::Probe("song-credits-section".into()));
    }

    #[test]
    fn test_hashed_class_probe_with_li_fallback() {
        let html = r#"<div class="SongInfo__Contributors-sc-1w2wxu2-4 xyz">
            <ul><li>Max Martin</li><li>Shellback</li></ul>
        </div>"#;
        let (names, source) = extractor().scan(html);
        assert_eq!(names, vec!["Max Martin", "Shellback"]);
        assert_eq!(source, CreditSource::Probe("song-info-contributors".into()));
    }

    #[test]
    fn test_first_probe_wins() {
        let html = r#"
            <div class="ContributorsCreditMetadataItem__Artists-sc-1cw8ns8-2">
                <a class="StyledLink-sc-3ea0mt-0">Writer One</a>
            </div>
            <div class="SongInfo__InfoBlock-sc-1w2wxu2-3">
                <a class="StyledLink-sc-3ea0mt-0">Someone Else</a>
            </div>"#;
        let (names, _) = extractor().scan(html);
        assert_eq!(names, vec!["Writer One"]);
    }

    #[test]
    fn test_heading_fallback() {
        let html = r#"<div>
            <h3>Writing Credits</h3>
            <p>by</p>
            <ul><li>Jane Doe</li><li>John Roe</li></ul>
        </div>"#;
        let (names, source) = extractor().scan(html);
        assert_eq!(names, vec!["Jane Doe", "John Roe"]);
        assert_eq!(source, CreditSource::Heading);
    }

    #[test]
    fn test_nothing_found_is_empty_not_error() {
        let (names, source) = extractor().scan("<html><body><p>No credits</p></body></html>");
        assert!(names.is_empty());
        assert_eq!(source, CreditSource::Nothing);
    }

    #[test]
    fn test_extract_records_fallbacks() {
        let (client, _) = instant_client(RetryPolicy::default());
        let obs = Observer::capturing();
        let page = StaticPage(Ok("<p>nothing</p>".into()));
        let names = extractor().extract(&obs, &client, &page, "https://genius.com/X-lyrics");
        assert!(names.is_empty());
        let stages: Vec<CreditStage> = obs
            .events()
            .into_iter()
            .filter_map(|e| match e {
                Event::CreditFallback { stage, .. } => Some(stage),
                _ => None,
            })
            .collect();
        assert_eq!(stages, vec![CreditStage::NoCredits]);
    }

    #[test]
    fn test_fetch_failure_yields_empty_list() {
        let (client, _) = instant_client(RetryPolicy::default());
        let obs = Observer::capturing();
        let page = StaticPage(Err(CallError::Permanent("HTTP 404".into())));
        let names = extractor().extract(&obs, &client, &page, "https://genius.com/X-lyrics");
        assert!(names.is_empty());
        assert!(obs.events().contains(&Event::CreditFallback {
            url: "https://genius.com/X-lyrics".into(),
            stage: CreditStage::FetchFailed,
        }));
    }

    #[test]
    fn test_custom_probe_and_bad_selector() {
        let probe = CreditProbe::parse("custom", "div.writers", &["span".to_string()]).unwrap();
        let extractor = CreditExtractor::new(vec![probe]);
        let (names, _) = extractor.scan(r#"<div class="writers"><span>A</span><span>B</span></div>"#);
        assert_eq!(names, vec!["A", "B"]);
        assert!(CreditProbe::parse("bad", "div[", &["li".to_string()]).is_err());
        assert!(CreditProbe::parse("no-items", "div", &[]).is_err());
    }
}
