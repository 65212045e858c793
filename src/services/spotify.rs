// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Spotify "now playing", falling back to the most recently played track.

use crate::config::OAuthCredentials;
use crate::error::{AppError, Result};
use crate::models::SpotifyTrack;
use crate::services::upstream::{check_response, check_response_json, transport_error};
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Duration, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;

const PROVIDER: &str = "Spotify";
const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const API_BASE: &str = "https://api.spotify.com/v1";

/// Refresh this long before the token actually expires.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SpotifyService {
    http: reqwest::Client,
    base_url: String,
    credentials: Option<OAuthCredentials>,
    token: Arc<Mutex<Option<CachedToken>>>,
}

impl SpotifyService {
    pub fn new(http: reqwest::Client, credentials: Option<OAuthCredentials>) -> Self {
        Self {
            http,
            base_url: API_BASE.to_string(),
            credentials,
            token: Arc::new(Mutex::new(None)),
        }
    }

    /// What is playing now, or what played last. `None` if neither is known.
    pub async fn get_now_playing(&self) -> Result<Option<SpotifyTrack>> {
        let Some(credentials) = &self.credentials else {
            return Ok(None);
        };
        let access_token = self.get_valid_access_token(credentials).await?;

        let response = self
            .http
            .get(format!("{}/me/player/currently-playing", self.base_url))
            .bearer_auth(&access_token)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        // 204 means nothing is playing
        if response.status() == StatusCode::OK {
            let playing: CurrentlyPlaying = check_response_json(PROVIDER, response).await?;
            if let Some(track) = playing.into_track() {
                return Ok(Some(track));
            }
        } else {
            check_response(PROVIDER, response).await?;
        }

        tracing::debug!("Nothing playing on Spotify, using recently played");

        let response = self
            .http
            .get(format!("{}/me/player/recently-played", self.base_url))
            .bearer_auth(&access_token)
            .query(&[("limit", "1")])
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        let recent: RecentlyPlayed = check_response_json(PROVIDER, response).await?;
        Ok(recent.into_track())
    }

    async fn get_valid_access_token(&self, credentials: &OAuthCredentials) -> Result<String> {
        let mut cached = self.token.lock().await;
        let now = Utc::now();

        if let Some(token) = cached.as_ref() {
            if now + Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) < token.expires_at {
                return Ok(token.access_token.clone());
            }
        }

        let basic = STANDARD.encode(format!(
            "{}:{}",
            credentials.client_id, credentials.client_secret
        ));

        let response = self
            .http
            .post(TOKEN_URL)
            .header(reqwest::header::AUTHORIZATION, format!("Basic {}", basic))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", credentials.refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        let token: TokenResponse = check_response_json(PROVIDER, response).await?;
        if token.access_token.is_empty() {
            return Err(AppError::Upstream(
                "Spotify token response missing access token".to_string(),
            ));
        }

        let access_token = token.access_token.clone();
        *cached = Some(CachedToken {
            access_token: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        });
        Ok(access_token)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct CurrentlyPlaying {
    #[serde(default)]
    is_playing: bool,
    item: Option<SpotifyItem>,
}

impl CurrentlyPlaying {
    fn into_track(self) -> Option<SpotifyTrack> {
        let is_playing = self.is_playing;
        self.item.map(|item| item.into_track(is_playing, None))
    }
}

#[derive(Debug, Deserialize)]
struct RecentlyPlayed {
    #[serde(default)]
    items: Vec<PlayHistory>,
}

impl RecentlyPlayed {
    fn into_track(self) -> Option<SpotifyTrack> {
        self.items
            .into_iter()
            .next()
            .map(|play| play.track.into_track(false, Some(play.played_at)))
    }
}

#[derive(Debug, Deserialize)]
struct PlayHistory {
    track: SpotifyItem,
    played_at: String,
}

/// A track (or podcast episode, which has no artists).
#[derive(Debug, Deserialize)]
struct SpotifyItem {
    name: String,
    #[serde(default)]
    artists: Vec<NamedEntity>,
    #[serde(default)]
    album: Option<Album>,
    #[serde(default)]
    external_urls: ExternalUrls,
}

impl SpotifyItem {
    fn into_track(self, is_playing: bool, played_at: Option<String>) -> SpotifyTrack {
        let artist = self
            .artists
            .into_iter()
            .map(|a| a.name)
            .collect::<Vec<_>>()
            .join(", ");
        let album_art = self
            .album
            .and_then(|album| album.images.into_iter().next())
            .map(|image| image.url);

        SpotifyTrack {
            is_playing,
            title: self.name,
            artist,
            album_art,
            song_url: self.external_urls.spotify,
            played_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct NamedEntity {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Album {
    #[serde(default)]
    images: Vec<Image>,
}

#[derive(Debug, Deserialize)]
struct Image {
    url: String,
}

#[derive(Debug, Default, Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item() -> serde_json::Value {
        json!({
            "name": "Windowlicker",
            "artists": [{"name": "Aphex Twin"}, {"name": "Guest"}],
            "album": {"images": [
                {"url": "https://i.scdn.co/image/large", "height": 640},
                {"url": "https://i.scdn.co/image/small", "height": 64}
            ]},
            "external_urls": {"spotify": "https://open.spotify.com/track/abc"}
        })
    }

    #[test]
    fn test_currently_playing_track() {
        let playing: CurrentlyPlaying =
            serde_json::from_value(json!({"is_playing": true, "item": item()})).unwrap();
        let track = playing.into_track().unwrap();

        assert!(track.is_playing);
        assert_eq!(track.title, "Windowlicker");
        assert_eq!(track.artist, "Aphex Twin, Guest");
        assert_eq!(track.album_art.as_deref(), Some("https://i.scdn.co/image/large"));
        assert_eq!(
            track.song_url.as_deref(),
            Some("https://open.spotify.com/track/abc")
        );
        assert_eq!(track.played_at, None);
    }

    #[test]
    fn test_currently_playing_without_item_falls_through() {
        let playing: CurrentlyPlaying =
            serde_json::from_value(json!({"is_playing": false, "item": null})).unwrap();
        assert!(playing.into_track().is_none());
    }

    #[test]
    fn test_recently_played_is_not_playing() {
        let recent: RecentlyPlayed = serde_json::from_value(json!({
            "items": [{"track": item(), "played_at": "2025-06-01T10:00:00.000Z"}]
        }))
        .unwrap();
        let track = recent.into_track().unwrap();

        assert!(!track.is_playing);
        assert_eq!(track.played_at.as_deref(), Some("2025-06-01T10:00:00.000Z"));

        let json = serde_json::to_value(&track).unwrap();
        assert_eq!(json["isPlaying"], false);
        assert_eq!(json["playedAt"], "2025-06-01T10:00:00.000Z");
    }

    #[test]
    fn test_episode_without_artists_or_art() {
        let playing: CurrentlyPlaying = serde_json::from_value(json!({
            "is_playing": true,
            "item": {"name": "Episode 12"}
        }))
        .unwrap();
        let track = playing.into_track().unwrap();

        assert_eq!(track.artist, "");
        assert_eq!(track.album_art, None);
        assert_eq!(track.song_url, None);
    }

    #[test]
    fn test_empty_history() {
        let recent: RecentlyPlayed = serde_json::from_value(json!({"items": []})).unwrap();
        assert!(recent.into_track().is_none());
    }

    #[tokio::test]
    async fn test_unconfigured_has_nothing_to_show() {
        let service = SpotifyService::new(reqwest::Client::new(), None);
        assert!(service.get_now_playing().await.unwrap().is_none());
    }
}
