pub mod commands;
pub mod plugin;

use std::{
    fmt::Display,
    time::{Duration, Instant},
};

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info};

use crate::utils::config;

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const API_URL: &str = "https://api.spotify.com/v1";
const PAGE_FIELDS: &str = "items(track(name,is_local,artists(name))),next";

/// Tokens are refreshed this long before Spotify expires them.
const TOKEN_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug)]
pub enum SpotifyError {
    Request(reqwest::Error),
    Status(u16),
    Parse(String),
}

impl Display for SpotifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpotifyError::Request(err) => write!(f, "spotify request failed: {}", err),
            SpotifyError::Status(status) => write!(f, "spotify returned status {}", status),
            SpotifyError::Parse(message) => {
                write!(f, "unable to parse spotify response: {}", message)
            }
        }
    }
}

impl std::error::Error for SpotifyError {}

impl From<reqwest::Error> for SpotifyError {
    fn from(err: reqwest::Error) -> Self {
        SpotifyError::Request(err)
    }
}

#[derive(Deserialize)]
struct TokenJson {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct TracksPageJson {
    #[serde(default)]
    items: Vec<PlaylistItemJson>,
    next: Option<String>,
}

#[derive(Deserialize)]
struct PlaylistItemJson {
    track: Option<TrackJson>,
}

#[derive(Deserialize)]
struct TrackJson {
    #[serde(default)]
    name: String,
    #[serde(default)]
    artists: Vec<ArtistJson>,
    #[serde(default)]
    is_local: bool,
}

#[derive(Deserialize)]
struct ArtistJson {
    name: String,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SpotifyTrack {
    pub name: String,
    pub artists: Vec<String>,
}

impl SpotifyTrack {
    /// What to look the track up with on YouTube.
    pub fn search_query(&self) -> String {
        if self.artists.is_empty() {
            return self.name.clone();
        }

        format!("{} - {}", self.artists.join(", "), self.name)
    }
}

impl From<TrackJson> for SpotifyTrack {
    fn from(json: TrackJson) -> Self {
        SpotifyTrack {
            name: json.name,
            artists: json.artists.into_iter().map(|artist| artist.name).collect(),
        }
    }
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

/// Reads public playlists with the client credentials flow.
pub struct SpotifyClient {
    client_id: String,
    client_secret: String,
    http: Client,
    token: async_std::sync::Mutex<Option<AccessToken>>,
}

impl SpotifyClient {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        SpotifyClient {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            http: Client::new(),
            token: async_std::sync::Mutex::new(None),
        }
    }

    /// `None` unless both credentials are set.
    pub fn from_env() -> Option<Self> {
        let client_id = config::env::optional(config::env::SPOTIFY_CLIENT_ID)?;
        let client_secret = config::env::optional(config::env::SPOTIFY_CLIENT_SECRET)?;

        Some(SpotifyClient::new(client_id, client_secret))
    }

    async fn access_token(&self) -> Result<String, SpotifyError> {
        let mut token = self.token.lock().await;

        if let Some(token) = token.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.value.clone());
            }
        }

        debug!("[spotify] requesting access token");

        let response = self
            .http
            .post(TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SpotifyError::Status(response.status().as_u16()));
        }

        let json = parse_token(&response.text().await?)?;
        let lifetime = Duration::from_secs(json.expires_in).saturating_sub(TOKEN_MARGIN);

        *token = Some(AccessToken {
            value: json.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        Ok(json.access_token)
    }

    /// Up to `limit` playable tracks of a playlist, in playlist order.
    pub async fn playlist_tracks(
        &self,
        playlist_id: &str,
        limit: usize,
    ) -> Result<Vec<SpotifyTrack>, SpotifyError> {
        let token = self.access_token().await?;

        let mut tracks = Vec::new();
        let mut next_url = Some(format!(
            "{}/playlists/{}/tracks?limit=100&fields={}",
            API_URL, playlist_id, PAGE_FIELDS
        ));

        while let Some(url) = next_url {
            if tracks.len() >= limit {
                break;
            }

            let response = self.http.get(&url).bearer_auth(&token).send().await?;

            if response.status() != StatusCode::OK {
                return Err(SpotifyError::Status(response.status().as_u16()));
            }

            let (page, next) = parse_tracks_page(&response.text().await?)?;
            tracks.extend(page);
            next_url = next;
        }

        tracks.truncate(limit);
        info!(
            "[spotify] read {} tracks from playlist {}",
            tracks.len(),
            playlist_id
        );

        Ok(tracks)
    }
}

fn parse_token(body: &str) -> Result<TokenJson, SpotifyError> {
    serde_json::from_str(body).map_err(|err| SpotifyError::Parse(err.to_string()))
}

/// The playable tracks of one page and the url of the next page.
fn parse_tracks_page(body: &str) -> Result<(Vec<SpotifyTrack>, Option<String>), SpotifyError> {
    let json: TracksPageJson =
        serde_json::from_str(body).map_err(|err| SpotifyError::Parse(err.to_string()))?;

    let tracks = json
        .items
        .into_iter()
        .filter_map(|item| item.track)
        .filter(|track| !track.is_local && !track.name.is_empty())
        .map(SpotifyTrack::from)
        .collect();

    Ok((tracks, json.next))
}

/// The playlist id of a Spotify playlist link or uri.
pub fn playlist_id(url: &str) -> Option<&str> {
    let url = url.trim();

    let rest = url
        .strip_prefix("spotify:playlist:")
        .or_else(|| {
            let path = url
                .strip_prefix("https://")
                .or_else(|| url.strip_prefix("http://"))
                .unwrap_or(url);
            path.strip_prefix("open.spotify.com/playlist/")
        })?;

    let id = rest.split(['?', '/', '#']).next().unwrap_or_default();

    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }

    Some(id)
}
