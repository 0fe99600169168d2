//! Genius adapter: API search plus song-page scraping. Search returns
//! metadata only; the page is scraped once a hit has been accepted.

use std::time::Duration;

use anyhow::Result;
use once_cell::sync::Lazy;
use reqwest::blocking::Client;
use scraper::{ElementRef, Html, Node, Selector};
use serde::Deserialize;

use super::{get_json, get_text, http_client, LyricSource, PageFetcher};
use crate::error::CallError;
use crate::models::LyricCandidate;

const API_BASE: &str = "https://api.genius.com";

static LYRICS_CONTAINER: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"div[data-lyrics-container="true"]"#).unwrap());

// ============================================================================
// API payloads
// ============================================================================

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    response: SearchResponse,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "type")]
    kind: String,
    result: SongResult,
}

#[derive(Debug, Deserialize)]
struct SongResult {
    title: String,
    url: String,
    primary_artist: PrimaryArtist,
}

#[derive(Debug, Deserialize)]
struct PrimaryArtist {
    name: String,
}

fn first_song(hits: Vec<SearchHit>) -> Option<SongResult> {
    hits.into_iter().find(|h| h.kind == "song").map(|h| h.result)
}

impl From<SongResult> for LyricCandidate {
    fn from(song: SongResult) -> Self {
        Self {
            title: song.title,
            artist: song.primary_artist.name,
            url: song.url,
            raw_lyrics: None,
        }
    }
}

// ============================================================================
// Page scraping
// ============================================================================

/// Text of every lyrics container on a song page, `<br>` as newline.
/// `None` when the page has no container or only whitespace.
pub fn extract_lyrics(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let mut lyrics = String::new();

    for container in document.select(&LYRICS_CONTAINER) {
        push_text(container, &mut lyrics);
        lyrics.push('\n');
    }

    let lyrics = lyrics.trim_end();
    if lyrics.trim().is_empty() {
        None
    } else {
        Some(lyrics.to_string())
    }
}

fn push_text(element: ElementRef<'_>, out: &mut String) {
    for node in element.children() {
        match node.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) if el.name() == "br" => out.push('\n'),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(node) {
                    push_text(child, out);
                }
            }
            _ => {}
        }
    }
}

// ============================================================================
// Client
// ============================================================================

pub struct GeniusClient {
    http: Client,
    token: String,
}

impl GeniusClient {
    pub fn new(token: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: http_client(timeout)?,
            token: token.to_string(),
        })
    }
}

impl LyricSource for GeniusClient {
    fn search(&self, title: &str, artist: &str) -> Result<Option<LyricCandidate>, CallError> {
        let query = format!("{} {}", title, artist);
        let url = format!("{}/search?q={}", API_BASE, urlencoding::encode(&query));
        let envelope: SearchEnvelope = get_json(&self.http, &url, Some(&self.token), "genius search")?;

        Ok(first_song(envelope.response.hits).map(LyricCandidate::from))
    }

    fn fetch_lyrics(&self, url: &str) -> Result<Option<String>, CallError> {
        let html = self.fetch_page(url)?;
        Ok(extract_lyrics(&html))
    }
}

impl PageFetcher for GeniusClient {
    fn fetch_page(&self, url: &str) -> Result<String, CallError> {
        get_text(&self.http, url, None, "genius page")
    }
}
