/*
 *  spotify.rs
 *
 *  spotify-oled - now playing, at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Spotify Web API playback source, OAuth token cache and refresh
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use log::{debug, info, warn};
use reqwest::{header, Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::clock;
use crate::config::Credentials;
use crate::playback::{PlaybackError, PlaybackPosition, PlaybackResult, PlaybackSnapshot};
use crate::poller::PlaybackSource;
use crate::titles::strip_artists;

const AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize";
const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const PLAYER_URL: &str = "https://api.spotify.com/v1/me/player";
const SCOPE: &str = "user-read-playback-state user-modify-playback-state";
const VERSION: &str = concat!("spotify-oled/", env!("CARGO_PKG_VERSION"));

/// Refresh this long before the token actually runs out
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Error)]
pub enum SpotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Token cache I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Interactive login required")]
    AuthRequired,
    #[error("Authorization failed: {0}")]
    Auth(String),
    #[error("Unexpected response {status}: {body}")]
    Status { status: u16, body: String },
}

impl SpotifyError {
    /// Fold into the poll outcome shown on screen
    pub fn into_playback(self) -> PlaybackError {
        match self {
            SpotifyError::AuthRequired => PlaybackError::auth_required("Interactive login required"),
            SpotifyError::Auth(message) => PlaybackError::auth_required(message),
            SpotifyError::Status { status: 401, .. } => PlaybackError::auth_required("Access token rejected"),
            other => PlaybackError::unhandled(other.to_string()),
        }
    }
}

/// Token cache file contents
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenInfo {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub scope: Option<String>,
    /// Unix seconds
    #[serde(default)]
    pub expires_at: i64,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl TokenInfo {
    pub fn is_expired(&self, now_secs: i64) -> bool {
        self.expires_at - EXPIRY_MARGIN_SECS <= now_secs
    }

    /// Token endpoint responses carry `expires_in` only
    fn stamped(mut self, now_secs: i64, previous_refresh: Option<String>) -> Self {
        self.expires_at = now_secs + self.expires_in;
        if self.refresh_token.is_none() {
            self.refresh_token = previous_refresh;
        }
        self
    }
}

/// `GET /v1/me/player`, only the parts shown on screen
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentPlayback {
    pub is_playing: bool,
    #[serde(default)]
    pub progress_ms: Option<u64>,
    #[serde(default)]
    pub shuffle_state: bool,
    pub device: Device,
    #[serde(default)]
    pub item: Option<Item>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Device {
    #[serde(default)]
    pub volume_percent: Option<u8>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Item {
    pub name: String,
    pub duration_ms: u64,
    /// Absent for podcast episodes
    #[serde(default)]
    pub artists: Vec<Artist>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Artist {
    pub name: String,
}

/// Turn a player response into a snapshot, cleaning the featured artists out
/// of the title. A player without an item counts as stopped.
pub fn snapshot_from(playback: CurrentPlayback, now_ms: i64) -> PlaybackResult {
    let Some(item) = playback.item else {
        return Err(PlaybackError::stopped());
    };

    let artists: Vec<String> = item.artists.into_iter().map(|artist| artist.name).collect();
    let progress_ms = playback.progress_ms.unwrap_or(0);
    let position = if playback.is_playing {
        PlaybackPosition::Playing { started_at_ms: now_ms - progress_ms as i64 }
    } else {
        PlaybackPosition::Paused { progress_ms }
    };

    Ok(PlaybackSnapshot {
        track: strip_artists(&item.name, &artists),
        artists,
        duration_ms: item.duration_ms,
        position,
        shuffling: playback.shuffle_state,
        volume_percent: playback.device.volume_percent.unwrap_or(0),
    })
}

/// Pull the authorization code out of the URL the browser was redirected to.
/// A bare code is accepted as is.
pub fn code_from_redirect(input: &str) -> Result<String, SpotifyError> {
    let input = input.trim();
    let Ok(url) = Url::parse(input) else {
        if input.is_empty() {
            return Err(SpotifyError::Auth("no redirect URL given".to_string()));
        }
        return Ok(input.to_string());
    };

    let mut code = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "error" => return Err(SpotifyError::Auth(value.into_owned())),
            "code" => code = Some(value.into_owned()),
            _ => {}
        }
    }
    code.ok_or_else(|| SpotifyError::Auth("redirect URL carries no code".to_string()))
}

pub struct SpotifyClient {
    http: Client,
    credentials: Credentials,
    cache_path: PathBuf,
    token: Option<TokenInfo>,
}

impl SpotifyClient {
    pub fn new(credentials: &Credentials, timeout: Duration) -> Result<Self, SpotifyError> {
        let mut headers = header::HeaderMap::new();
        headers.insert("User-Agent", header::HeaderValue::from_static(VERSION));
        headers.insert("Accept", header::HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        let cache_path = credentials.cache_path();
        let token = read_token_cache(&cache_path);

        Ok(Self {
            http,
            credentials: credentials.clone(),
            cache_path,
            token,
        })
    }

    pub fn authorize_url(&self) -> Result<Url, SpotifyError> {
        Url::parse_with_params(AUTHORIZE_URL, &[
            ("client_id", self.credentials.client_id.as_str()),
            ("response_type", "code"),
            ("redirect_uri", self.credentials.redirect_uri.as_str()),
            ("scope", SCOPE),
        ])
        .map_err(|e| SpotifyError::Auth(format!("bad authorize URL: {}", e)))
    }

    /// Make sure a usable token is cached, asking on stdin for the redirect
    /// URL when there is none
    pub async fn authorize_interactive(&mut self) -> Result<(), SpotifyError> {
        if self.token.is_some() && self.access_token().await.is_ok() {
            info!("Cached token at {} is valid", self.cache_path.display());
            return Ok(());
        }

        println!("Open this URL in a browser and log in:\n\n{}\n", self.authorize_url()?);
        println!("Paste the URL you were redirected to:");

        let mut line = String::new();
        BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
        let code = code_from_redirect(&line)?;

        let redirect_uri = self.credentials.redirect_uri.clone();
        let token = self
            .request_token(&[
                ("grant_type", "authorization_code"),
                ("code", code.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
            ])
            .await?
            .stamped(Utc::now().timestamp(), None);
        self.store_token(token)?;
        info!("Token written to {}", self.cache_path.display());
        Ok(())
    }

    /// Current player state, `None` when nothing is playing
    pub async fn current_playback(&mut self) -> Result<Option<CurrentPlayback>, SpotifyError> {
        let access_token = self.access_token().await?;
        let response = self.http.get(PLAYER_URL).bearer_auth(access_token).send().await?;

        match response.status() {
            StatusCode::NO_CONTENT => Ok(None),
            StatusCode::UNAUTHORIZED => {
                // force a refresh on the next poll
                if let Some(token) = self.token.as_mut() {
                    token.expires_at = 0;
                }
                Err(SpotifyError::Status { status: 401, body: response.text().await.unwrap_or_default() })
            }
            status if status.is_success() => Ok(Some(response.json().await?)),
            status => Err(SpotifyError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }

    async fn access_token(&mut self) -> Result<String, SpotifyError> {
        let Some(token) = self.token.as_ref() else {
            return Err(SpotifyError::AuthRequired);
        };

        let now = Utc::now().timestamp();
        if !token.is_expired(now) {
            return Ok(token.access_token.clone());
        }

        let Some(refresh_token) = token.refresh_token.clone() else {
            return Err(SpotifyError::AuthRequired);
        };
        debug!("Access token expired, refreshing");

        let refreshed = self
            .request_token(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token.as_str())])
            .await?
            .stamped(now, Some(refresh_token));
        let access_token = refreshed.access_token.clone();
        self.store_token(refreshed)?;
        Ok(access_token)
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenInfo, SpotifyError> {
        let response = self
            .http
            .post(TOKEN_URL)
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            // invalid_grant and friends, only a new login helps
            let body = response.text().await.unwrap_or_default();
            return Err(SpotifyError::Auth(body));
        }
        if !status.is_success() {
            return Err(SpotifyError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(response.json().await?)
    }

    fn store_token(&mut self, token: TokenInfo) -> Result<(), SpotifyError> {
        fs::write(&self.cache_path, serde_json::to_string(&token)?)?;
        self.token = Some(token);
        Ok(())
    }
}

fn read_token_cache(path: &Path) -> Option<TokenInfo> {
    let raw = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(token) => Some(token),
        Err(e) => {
            warn!("Ignoring unreadable token cache {}: {}", path.display(), e);
            None
        }
    }
}

impl PlaybackSource for SpotifyClient {
    async fn poll(&mut self) -> PlaybackResult {
        match self.current_playback().await {
            Ok(Some(playback)) => snapshot_from(playback, clock::now_ms()),
            Ok(None) => Err(PlaybackError::stopped()),
            Err(e) => Err(e.into_playback()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::PlaybackErrorKind;

    const PLAYING: &str = r#"{
        "device": { "id": "abc", "name": "Kitchen", "volume_percent": 64 },
        "shuffle_state": true,
        "repeat_state": "off",
        "progress_ms": 30000,
        "is_playing": true,
        "item": {
            "name": "Song (feat. Guest)",
            "duration_ms": 200000,
            "artists": [ { "name": "Band" }, { "name": "Guest" } ]
        }
    }"#;

    fn parse(json: &str) -> CurrentPlayback {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_snapshot_from_playing() {
        let snapshot = snapshot_from(parse(PLAYING), 1_000_000).unwrap();
        assert_eq!(snapshot.track, "Song");
        assert_eq!(snapshot.artists, vec!["Band", "Guest"]);
        assert_eq!(snapshot.position, PlaybackPosition::Playing { started_at_ms: 970_000 });
        assert_eq!(snapshot.volume_percent, 64);
        assert!(snapshot.shuffling);
    }

    #[test]
    fn test_snapshot_from_paused() {
        let json = PLAYING.replace(r#""is_playing": true"#, r#""is_playing": false"#);
        let snapshot = snapshot_from(parse(&json), 1_000_000).unwrap();
        assert_eq!(snapshot.position, PlaybackPosition::Paused { progress_ms: 30_000 });
    }

    #[test]
    fn test_no_item_is_stopped() {
        let playback = parse(r#"{ "device": { "volume_percent": null }, "is_playing": false, "item": null }"#);
        let result = snapshot_from(playback, 0);
        assert!(matches!(result, Err(ref e) if e.kind == PlaybackErrorKind::Stopped));
    }

    #[test]
    fn test_token_cache_format() {
        let token: TokenInfo = serde_json::from_str(
            r#"{"access_token": "AT", "token_type": "Bearer", "expires_in": 3600,
                "scope": "user-read-playback-state", "expires_at": 1700003600, "refresh_token": "RT"}"#,
        )
        .unwrap();
        assert_eq!(token.refresh_token.as_deref(), Some("RT"));
        assert!(!token.is_expired(1_700_000_000));
        assert!(token.is_expired(1_700_003_550));
    }

    #[test]
    fn test_refreshed_token_keeps_refresh_token() {
        let refreshed: TokenInfo =
            serde_json::from_str(r#"{"access_token": "new", "token_type": "Bearer", "expires_in": 3600}"#).unwrap();
        let token = refreshed.stamped(100, Some("RT".to_string()));
        assert_eq!(token.expires_at, 3_700);
        assert_eq!(token.refresh_token.as_deref(), Some("RT"));
    }

    #[test]
    fn test_code_from_redirect() {
        assert_eq!(code_from_redirect("https://no-domain.invalid/?code=abc123\n").unwrap(), "abc123");
        assert_eq!(code_from_redirect("  abc123 ").unwrap(), "abc123");
        assert!(matches!(
            code_from_redirect("https://no-domain.invalid/?error=access_denied"),
            Err(SpotifyError::Auth(ref e)) if e == "access_denied"
        ));
        assert!(code_from_redirect("https://no-domain.invalid/").is_err());
        assert!(code_from_redirect("").is_err());
    }

    #[test]
    fn test_authorize_url() {
        let credentials = Credentials {
            client_id: "client".into(),
            username: "nobody".into(),
            cache_path: Some(PathBuf::from("/nonexistent/.cache-nobody")),
            ..Default::default()
        };
        let client = SpotifyClient::new(&credentials, Duration::from_secs(10)).unwrap();
        let url = client.authorize_url().unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("client_id".into(), "client".into())));
        assert!(pairs.contains(&("redirect_uri".into(), "https://no-domain.invalid/".into())));
        assert!(pairs.contains(&("scope".into(), SCOPE.into())));
    }

    #[tokio::test]
    async fn test_poll_without_token_needs_auth() {
        let credentials = Credentials {
            cache_path: Some(PathBuf::from("/nonexistent/.cache-nobody")),
            ..Default::default()
        };
        let mut client = SpotifyClient::new(&credentials, Duration::from_secs(10)).unwrap();
        let result = client.poll().await;
        assert_eq!(result, Err(PlaybackError::auth_required("Interactive login required")));
    }

    #[test]
    fn test_error_mapping() {
        assert_eq!(
            SpotifyError::Status { status: 401, body: String::new() }.into_playback().kind,
            PlaybackErrorKind::AuthRequired
        );
        assert_eq!(
            SpotifyError::Status { status: 502, body: "bad gateway".into() }.into_playback().kind,
            PlaybackErrorKind::Unhandled
        );
    }
}
