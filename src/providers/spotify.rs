//! Spotify adapter: artist genre lookup.

use std::time::Duration;

use anyhow::Result;
use reqwest::blocking::Client;
use serde::Deserialize;

use super::{get_json, http_client, GenreSource};
use crate::config::ArtistRegistry;
use crate::error::CallError;

const API_BASE: &str = "https://api.spotify.com/v1";

#[derive(Debug, Deserialize)]
struct Artist {
    #[serde(default)]
    genres: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ArtistSearch {
    artists: ArtistPage,
}

#[derive(Debug, Deserialize)]
struct ArtistPage {
    #[serde(default)]
    items: Vec<Artist>,
}

fn search_url(artist: &str) -> String {
    let query = format!("artist:{}", artist);
    format!(
        "{}/search?q={}&type=artist&limit=1",
        API_BASE,
        urlencoding::encode(&query)
    )
}

pub struct SpotifyClient {
    http: Client,
    token: String,
    registry: ArtistRegistry,
}

impl SpotifyClient {
    pub fn new(token: &str, timeout: Duration, registry: ArtistRegistry) -> Result<Self> {
        Ok(Self {
            http: http_client(timeout)?,
            token: token.to_string(),
            registry,
        })
    }
}

impl GenreSource for SpotifyClient {
    /// Genres of the artist, by registry id when known, else by name search.
    fn lookup_genres(&self, artist: &str) -> Result<Vec<String>, CallError> {
        if let Some(id) = self.registry.id_for(artist) {
            let url = format!("{}/artists/{}", API_BASE, urlencoding::encode(id));
            let found: Artist = get_json(&self.http, &url, Some(&self.token), "spotify artist")?;
            return Ok(found.genres);
        }

        let found: ArtistSearch = get_json(&self.http, &search_url(artist), Some(&self.token), "spotify search")?;
        Ok(found
            .artists
            .items
            .into_iter()
            .next()
            .map(|a| a.genres)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url_is_encoded() {
        assert_eq!(
            search_url("Simon & Garfunkel"),
            "https://api.spotify.com/v1/search?q=artist%3ASimon%20%26%20Garfunkel&type=artist&limit=1"
        );
    }

    #[test]
    fn test_search_payload() {
        let body = r#"{"artists": {"items": [{"name": "Adele", "genres": ["british soul", "pop"]}]}}"#;
        let found: ArtistSearch = serde_json::from_str(body).unwrap();
        assert_eq!(found.artists.items[0].genres, vec!["british soul", "pop"]);

        let empty: ArtistSearch = serde_json::from_str(r#"{"artists": {"items": []}}"#).unwrap();
        assert!(empty.artists.items.is_empty());
    }
}
