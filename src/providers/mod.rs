//! Provider seams: the lyric source, its page fetcher and the genre source.
//!
//! Each operation classifies its outcome as a [`CallError`]. Retrying belongs
//! to `RateLimitedClient`, never to an adapter.

pub mod genius;
pub mod spotify;

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::RETRY_AFTER;

use crate::error::CallError;
use crate::models::LyricCandidate;

pub use genius::GeniusClient;
pub use spotify::SpotifyClient;

pub const USER_AGENT: &str = concat!("lyrics-dataset/", env!("CARGO_PKG_VERSION"));

pub trait LyricSource {
    /// Best search hit for (title, artist), or `None`.
    fn search(&self, title: &str, artist: &str) -> Result<Option<LyricCandidate>, CallError>;

    /// Raw lyrics on an accepted candidate's page; `None` if the page has none.
    fn fetch_lyrics(&self, url: &str) -> Result<Option<String>, CallError>;
}

pub trait PageFetcher {
    fn fetch_page(&self, url: &str) -> Result<String, CallError>;
}

pub trait GenreSource {
    fn lookup_genres(&self, artist: &str) -> Result<Vec<String>, CallError>;
}

// ============================================================================
// Shared HTTP plumbing
// ============================================================================

/// Blocking client shared by both adapters.
pub fn http_client(timeout: Duration) -> anyhow::Result<Client> {
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?;
    Ok(client)
}

/// Classify a transport-level failure (no HTTP status received).
pub fn classify_transport(err: reqwest::Error, context: &str) -> CallError {
    if let Some(status) = err.status() {
        return CallError::from_status(status.as_u16(), None, context);
    }
    if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
        CallError::Transient(format!("{}: {}", context, err))
    } else {
        CallError::Permanent(format!("{}: {}", context, err))
    }
}

/// Pass a successful response through; classify anything else by status.
pub fn check_status(response: Response, context: &str) -> Result<Response, CallError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let retry_after = parse_retry_after(
        response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok()),
    );
    Err(CallError::from_status(status.as_u16(), retry_after, context))
}

/// `Retry-After` in delta-seconds form. HTTP-date values are ignored.
pub fn parse_retry_after(value: Option<&str>) -> Option<Duration> {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
}

/// GET `url` and return the body text, classified on failure.
pub fn get_text(client: &Client, url: &str, bearer: Option<&str>, context: &str) -> Result<String, CallError> {
    let mut request = client.get(url);
    if let Some(token) = bearer {
        request = request.bearer_auth(token);
    }
    let response = request.send().map_err(|e| classify_transport(e, context))?;
    let response = check_status(response, context)?;
    response.text().map_err(|e| classify_transport(e, context))
}

/// GET `url` and decode a JSON body. An undecodable body is permanent.
pub fn get_json<T: serde::de::DeserializeOwned>(
    client: &Client,
    url: &str,
    bearer: Option<&str>,
    context: &str,
) -> Result<T, CallError> {
    let body = get_text(client, url, bearer, context)?;
    serde_json::from_str(&body)
        .map_err(|e| CallError::Permanent(format!("{}: malformed response: {}", context, e)))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Lyric source that replays scripted search responses, then reports no
    /// hit. Page lyrics are replayed the same way, then read as absent.
    #[derive(Default)]
    pub struct ScriptedSource {
        responses: RefCell<VecDeque<Result<Option<LyricCandidate>, CallError>>>,
        pages: RefCell<VecDeque<Result<Option<String>, CallError>>>,
        pub queries: RefCell<Vec<(String, String)>>,
        pub lyrics_fetches: RefCell<Vec<String>>,
    }

    impl ScriptedSource {
        pub fn new(responses: Vec<Result<Option<LyricCandidate>, CallError>>) -> Self {
            Self {
                responses: RefCell::new(responses.into()),
                ..Self::default()
            }
        }

        pub fn with_pages(self, pages: Vec<Result<Option<String>, CallError>>) -> Self {
            *self.pages.borrow_mut() = pages.into();
            self
        }

        pub fn titles_searched(&self) -> Vec<String> {
            self.queries.borrow().iter().map(|(t, _)| t.clone()).collect()
        }
    }

    impl LyricSource for ScriptedSource {
        fn search(&self, title: &str, artist: &str) -> Result<Option<LyricCandidate>, CallError> {
            self.queries.borrow_mut().push((title.to_string(), artist.to_string()));
            self.responses.borrow_mut().pop_front().unwrap_or(Ok(None))
        }

        fn fetch_lyrics(&self, url: &str) -> Result<Option<String>, CallError> {
            self.lyrics_fetches.borrow_mut().push(url.to_string());
            self.pages.borrow_mut().pop_front().unwrap_or(Ok(None))
        }
    }

    /// Serves the same HTML for every URL.
    pub struct StaticPages(pub String);

    impl PageFetcher for StaticPages {
        fn fetch_page(&self, _url: &str) -> Result<String, CallError> {
            Ok(self.0.clone())
        }
    }

    pub struct FixedGenres(pub Result<Vec<String>, CallError>);

    impl GenreSource for FixedGenres {
        fn lookup_genres(&self, _artist: &str) -> Result<Vec<String>, CallError> {
            self.0.clone()
        }
    }

    pub fn candidate(title: &str, artist: &str, url: &str, raw_lyrics: &str) -> LyricCandidate {
        LyricCandidate {
            raw_lyrics: Some(raw_lyrics.to_string()),
            ..search_hit(title, artist, url)
        }
    }

    /// A hit carrying only metadata, like a real API search result.
    pub fn search_hit(title: &str, artist: &str, url: &str) -> LyricCandidate {
        LyricCandidate {
            title: title.to_string(),
            artist: artist.to_string(),
            url: url.to_string(),
            raw_lyrics: None,
        }
    }

    /// Raw page text that passes every cleaning checkpoint.
    pub fn good_raw_lyrics() -> String {
        let mut raw = String::from("Test Song Lyrics\n[Verse 1]\n");
        for i in 0..5 {
            raw.push_str(&format!("Line {} of a song that is long enough\n", i));
        }
        raw.push_str("You might also like\n[Chorus]\nLa la la\n7Embed");
        raw
    }
}
