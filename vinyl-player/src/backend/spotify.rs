//! Spotify Web API session client backed by `ureq`
//!
//! Blocking by design: it is only ever called from the sequencer thread or
//! from `spawn_blocking`.

use super::remote::{RemoteDevice, RemoteError, RemotePlayback, RemoteSession};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};
use vinyl_common::config::SpotifyConfig;

pub const DEFAULT_API_BASE: &str = "https://api.spotify.com/v1";
pub const DEFAULT_ACCOUNTS_BASE: &str = "https://accounts.spotify.com";

/// Longest error body kept in a [`RemoteError::Status`] message
const MAX_ERROR_BODY: usize = 200;

pub struct SpotifyClient {
    agent: ureq::Agent,
    api_base: String,
    accounts_base: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    refresh_token: Option<String>,
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Present when the service rotates the refresh token
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DevicesResponse {
    #[serde(default)]
    devices: Vec<DeviceEntry>,
}

#[derive(Debug, Deserialize)]
struct DeviceEntry {
    id: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    is_active: bool,
}

#[derive(Debug, Deserialize)]
struct PlayerResponse {
    #[serde(default)]
    is_playing: bool,
    #[serde(default)]
    progress_ms: Option<u64>,
    #[serde(default)]
    item: Option<PlayerItem>,
}

#[derive(Debug, Deserialize)]
struct PlayerItem {
    #[serde(default)]
    duration_ms: u64,
}

fn trim_base(base: &str) -> String {
    base.trim().trim_end_matches('/').to_string()
}

fn parse_devices(body: Value) -> Result<Vec<RemoteDevice>, RemoteError> {
    let parsed: DevicesResponse =
        serde_json::from_value(body).map_err(|e| RemoteError::Decode(format!("devices: {}", e)))?;
    Ok(parsed
        .devices
        .into_iter()
        .filter_map(|d| {
            // Restricted devices come back without an id and cannot be targeted
            Some(RemoteDevice {
                id: d.id?,
                name: d.name,
                is_active: d.is_active,
            })
        })
        .collect())
}

fn parse_playback(body: Value) -> Result<RemotePlayback, RemoteError> {
    let parsed: PlayerResponse =
        serde_json::from_value(body).map_err(|e| RemoteError::Decode(format!("player: {}", e)))?;
    Ok(RemotePlayback {
        is_playing: parsed.is_playing,
        progress_ms: parsed.progress_ms.unwrap_or(0),
        duration_ms: parsed.item.map(|item| item.duration_ms).unwrap_or(0),
    })
}

fn map_ureq_error(err: ureq::Error) -> RemoteError {
    match err {
        ureq::Error::Status(code, response) => {
            // Bodies are often localized; cut on a char boundary
            let message = response
                .into_string()
                .unwrap_or_default()
                .chars()
                .take(MAX_ERROR_BODY)
                .collect();
            RemoteError::Status { code, message }
        }
        ureq::Error::Transport(transport) => RemoteError::Transport(transport.to_string()),
    }
}

impl SpotifyClient {
    pub fn new(config: &SpotifyConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(5))
            .timeout_read(Duration::from_secs(15))
            .timeout_write(Duration::from_secs(15))
            .build();
        Self {
            agent,
            api_base: trim_base(config.api_base.as_deref().unwrap_or(DEFAULT_API_BASE)),
            accounts_base: trim_base(config.accounts_base.as_deref().unwrap_or(DEFAULT_ACCOUNTS_BASE)),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            refresh_token: config.refresh_token.clone(),
            access_token: config.access_token.clone(),
        }
    }

    /// Client with no credentials; every call reports `NotConnected`
    pub fn disconnected() -> Self {
        Self::new(&SpotifyConfig::default())
    }

    pub fn is_configured(&self) -> bool {
        self.access_token.is_some() || self.can_refresh()
    }

    fn can_refresh(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some() && self.refresh_token.is_some()
    }

    fn token(&mut self) -> Result<String, RemoteError> {
        match &self.access_token {
            Some(token) => Ok(token.clone()),
            None => self.refresh(),
        }
    }

    fn refresh(&mut self) -> Result<String, RemoteError> {
        let (Some(client_id), Some(client_secret), Some(refresh_token)) =
            (&self.client_id, &self.client_secret, &self.refresh_token)
        else {
            return Err(RemoteError::NotConnected);
        };

        debug!("Refreshing Spotify access token");
        let response = self
            .agent
            .post(&format!("{}/api/token", self.accounts_base))
            .send_form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
            ])
            .map_err(|err| match err {
                ureq::Error::Status(code, _) if code == 400 || code == 401 => {
                    warn!("Spotify token refresh rejected (HTTP {})", code);
                    RemoteError::NotConnected
                }
                other => map_ureq_error(other),
            })?;

        let token: TokenResponse = response
            .into_json()
            .map_err(|e| RemoteError::Decode(format!("token: {}", e)))?;
        if let Some(rotated) = token.refresh_token {
            self.refresh_token = Some(rotated);
        }
        info!("Spotify access token refreshed");
        self.access_token = Some(token.access_token.clone());
        Ok(token.access_token)
    }

    fn execute(
        &self,
        method: &str,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
        token: &str,
    ) -> Result<ureq::Response, ureq::Error> {
        let mut request = self
            .agent
            .request(method, &format!("{}{}", self.api_base, path))
            .set("Authorization", &format!("Bearer {}", token));
        for (key, value) in query {
            request = request.query(key, value);
        }
        match body {
            Some(body) => request.send_json(body),
            None if method == "GET" => request.call(),
            // Player endpoints insist on a Content-Length for PUT
            None => request.send_string(""),
        }
    }

    /// Issue one API call, refreshing the token and retrying once on a 401
    fn send(
        &mut self,
        method: &str,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<Option<Value>, RemoteError> {
        let token = self.token()?;
        let response = match self.execute(method, path, query, body.as_ref(), &token) {
            Err(ureq::Error::Status(401, _)) if self.can_refresh() => {
                self.access_token = None;
                let token = self.refresh()?;
                self.execute(method, path, query, body.as_ref(), &token)
            }
            other => other,
        }
        .map_err(map_ureq_error)?;

        if response.status() == 204 {
            return Ok(None);
        }
        let text = response
            .into_string()
            .map_err(|e| RemoteError::Decode(format!("{} {}: {}", method, path, e)))?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| RemoteError::Decode(format!("{} {}: {}", method, path, e)))
    }
}

impl RemoteSession for SpotifyClient {
    fn devices(&mut self) -> Result<Vec<RemoteDevice>, RemoteError> {
        match self.send("GET", "/me/player/devices", &[], None)? {
            Some(body) => parse_devices(body),
            None => Ok(Vec::new()),
        }
    }

    fn start_playback(&mut self, device_id: &str, uri: &str, position_ms: u64) -> Result<(), RemoteError> {
        let body = json!({ "uris": [uri], "position_ms": position_ms });
        self.send("PUT", "/me/player/play", &[("device_id", device_id.to_string())], Some(body))
            .map(|_| ())
    }

    fn pause(&mut self) -> Result<(), RemoteError> {
        self.send("PUT", "/me/player/pause", &[], None).map(|_| ())
    }

    fn resume(&mut self) -> Result<(), RemoteError> {
        self.send("PUT", "/me/player/play", &[], None).map(|_| ())
    }

    fn seek(&mut self, position_ms: u64) -> Result<(), RemoteError> {
        self.send("PUT", "/me/player/seek", &[("position_ms", position_ms.to_string())], None)
            .map(|_| ())
    }

    fn set_volume(&mut self, percent: u8) -> Result<(), RemoteError> {
        self.send(
            "PUT",
            "/me/player/volume",
            &[("volume_percent", percent.min(100).to_string())],
            None,
        )
        .map(|_| ())
    }

    fn current_playback(&mut self) -> Result<Option<RemotePlayback>, RemoteError> {
        self.send("GET", "/me/player", &[], None)?
            .map(parse_playback)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_without_credentials_every_call_is_not_connected() {
        let mut client = SpotifyClient::disconnected();
        assert!(!client.is_configured());
        assert_eq!(client.devices().unwrap_err(), RemoteError::NotConnected);
        assert_eq!(client.pause().unwrap_err(), RemoteError::NotConnected);
        assert_eq!(client.current_playback().unwrap_err(), RemoteError::NotConnected);
    }

    #[test]
    fn test_configured_from_refresh_credentials() {
        let config = SpotifyConfig {
            client_id: Some("id".into()),
            client_secret: Some("secret".into()),
            refresh_token: Some("refresh".into()),
            api_base: Some("http://localhost:9/v1/".into()),
            ..Default::default()
        };
        let client = SpotifyClient::new(&config);
        assert!(client.is_configured());
        assert_eq!(client.api_base, "http://localhost:9/v1");
        assert_eq!(client.accounts_base, DEFAULT_ACCOUNTS_BASE);
    }

    #[test]
    fn test_parse_devices_skips_restricted() {
        let body = json!({
            "devices": [
                {"id": "abc", "name": "Desk", "is_active": false, "volume_percent": 40},
                {"id": null, "name": "Restricted TV", "is_active": true},
                {"id": "def", "name": "Phone", "is_active": true}
            ]
        });
        let devices = parse_devices(body).unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[1].id, "def");
        assert!(devices[1].is_active);
    }

    #[test]
    fn test_parse_playback_reading() {
        let body = json!({
            "is_playing": false,
            "progress_ms": 45000,
            "item": {"duration_ms": 210000, "name": "Song"}
        });
        let reading = parse_playback(body).unwrap();
        assert_eq!(
            reading,
            RemotePlayback {
                is_playing: false,
                progress_ms: 45_000,
                duration_ms: 210_000
            }
        );
    }

    #[test]
    fn test_error_body_truncated_on_char_boundary() {
        let body = format!("{}é and the rest of a long localized message", "x".repeat(MAX_ERROR_BODY - 1));
        let response = ureq::Response::new(500, "Internal Server Error", &body).unwrap();

        match map_ureq_error(ureq::Error::Status(500, response)) {
            RemoteError::Status { code, message } => {
                assert_eq!(code, 500);
                assert_eq!(message.chars().count(), MAX_ERROR_BODY);
                assert!(message.ends_with('é'));
            }
            other => panic!("expected a status error, got {:?}", other),
        }
    }

    #[test]
    fn test_short_error_body_kept_whole() {
        let response = ureq::Response::new(404, "Not Found", "Device not found").unwrap();
        assert_eq!(
            map_ureq_error(ureq::Error::Status(404, response)),
            RemoteError::Status {
                code: 404,
                message: "Device not found".to_string()
            }
        );
    }

    #[test]
    fn test_parse_playback_without_item() {
        let reading = parse_playback(json!({"is_playing": false, "progress_ms": null})).unwrap();
        assert_eq!(reading, RemotePlayback::default());
    }
}
