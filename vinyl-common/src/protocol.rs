//! Control channel wire protocol (inbound side)
//!
//! Clients send JSON envelopes of the form `{"action": "...", "payload": {...}}`.
//! The browser front end always attaches a payload object, even for actions
//! that take no arguments, so decoding goes through a loose envelope first and
//! only then into the typed [`ClientMessage`].
//!
//! Anything that cannot be turned into a command is reported as
//! [`Error::MalformedCommand`]; callers drop the message and keep the
//! connection open.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default volume applied when a VOLUME command carries no usable value
pub const DEFAULT_VOLUME_VALUE: f32 = 0.5;

/// Accent color used until the front end reports one
pub const DEFAULT_ACCENT_COLOR: &str = "#44aa88";

/// Decoded inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// Load a track and start it at `start_time` seconds
    Play(PlayRequest),
    /// Stop playback and forget the current track
    Stop,
    /// Toggle between playing and paused
    Pause,
    /// Set output volume, linear 0.0-1.0
    Volume { value: f32 },
    /// Restart the current track at `time` seconds
    Seek { time: f64 },
    /// Shallow-merge into the shared navigation state (never touches playback)
    UpdateNav(Map<String, Value>),
}

/// PLAY payload
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlayRequest {
    /// Filesystem path or streaming-service URI
    pub file_path: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    /// Start offset in seconds
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub start_time: f64,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    action: String,
    #[serde(default)]
    payload: Value,
}

impl ClientMessage {
    /// Decode a text frame
    pub fn decode(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| Error::MalformedCommand(format!("invalid JSON: {}", e)))?;
        Self::from_value(value)
    }

    /// Decode an already-parsed JSON value
    pub fn from_value(value: Value) -> Result<Self> {
        let envelope: Envelope = serde_json::from_value(value)
            .map_err(|e| Error::MalformedCommand(format!("invalid envelope: {}", e)))?;

        match envelope.action.to_ascii_uppercase().as_str() {
            "PLAY" => {
                let request: PlayRequest = serde_json::from_value(envelope.payload)
                    .map_err(|e| Error::MalformedCommand(format!("invalid PLAY payload: {}", e)))?;
                if request.file_path.trim().is_empty() {
                    return Err(Error::MalformedCommand("PLAY without file_path".to_string()));
                }
                Ok(ClientMessage::Play(request))
            }
            "STOP" => Ok(ClientMessage::Stop),
            "PAUSE" => Ok(ClientMessage::Pause),
            "VOLUME" => {
                let value = number_field(&envelope.payload, "value")
                    .map(|v| v as f32)
                    .unwrap_or(DEFAULT_VOLUME_VALUE);
                Ok(ClientMessage::Volume { value: value.clamp(0.0, 1.0) })
            }
            "SEEK" => {
                let time = number_field(&envelope.payload, "time").unwrap_or(0.0);
                Ok(ClientMessage::Seek { time: time.max(0.0) })
            }
            "UPDATE_NAV" => match envelope.payload {
                Value::Object(patch) => Ok(ClientMessage::UpdateNav(patch)),
                other => Err(Error::MalformedCommand(format!(
                    "UPDATE_NAV expects an object payload, got {}",
                    other
                ))),
            },
            other => Err(Error::MalformedCommand(format!("unknown action '{}'", other))),
        }
    }
}

/// Read a numeric field that may arrive as a JSON number or a numeric string
fn number_field(payload: &Value, key: &str) -> Option<f64> {
    let value = payload.get(key)?;
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

fn lenient_seconds<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let seconds = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    Ok(if seconds.is_finite() { seconds.max(0.0) } else { 0.0 })
}

/// Last-known front-end navigation state
///
/// Opaque to the server apart from its defaults; kept only so a reconnecting
/// client lands back on the same crate/album/disc.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NavigationState(Map<String, Value>);

impl NavigationState {
    /// Shallow-merge `patch` into the current state
    pub fn merge(&mut self, patch: Map<String, Value>) {
        for (key, value) in patch {
            self.0.insert(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

impl Default for NavigationState {
    fn default() -> Self {
        let mut map = Map::new();
        map.insert("sortMode".to_string(), Value::from("RAW"));
        map.insert("crateIndex".to_string(), Value::from(0));
        map.insert("albumId".to_string(), Value::Null);
        map.insert("discIndex".to_string(), Value::from(0));
        map.insert("viewState".to_string(), Value::from(0));
        map.insert("accentColor".to_string(), Value::from(DEFAULT_ACCENT_COLOR));
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_play_with_defaults() {
        let msg = ClientMessage::decode(r#"{"action":"PLAY","payload":{"file_path":"/music/a.flac"}}"#)
            .unwrap();
        assert_eq!(
            msg,
            ClientMessage::Play(PlayRequest {
                file_path: "/music/a.flac".to_string(),
                title: None,
                artist: None,
                start_time: 0.0,
            })
        );
    }

    #[test]
    fn test_decode_play_full_payload() {
        let msg = ClientMessage::from_value(json!({
            "action": "PLAY",
            "payload": {
                "file_path": "spotify:track:4uLU6hMCjMI75M1A2tKUQC",
                "title": "Song",
                "artist": "Band",
                "start_time": 12.5
            }
        }))
        .unwrap();

        match msg {
            ClientMessage::Play(req) => {
                assert_eq!(req.file_path, "spotify:track:4uLU6hMCjMI75M1A2tKUQC");
                assert_eq!(req.title.as_deref(), Some("Song"));
                assert_eq!(req.artist.as_deref(), Some("Band"));
                assert_eq!(req.start_time, 12.5);
            }
            other => panic!("expected Play, got {:?}", other),
        }
    }

    #[test]
    fn test_play_without_file_path_is_malformed() {
        let err = ClientMessage::decode(r#"{"action":"PLAY","payload":{"title":"x"}}"#).unwrap_err();
        assert!(matches!(err, Error::MalformedCommand(_)));

        let err = ClientMessage::decode(r#"{"action":"PLAY","payload":{"file_path":"  "}}"#).unwrap_err();
        assert!(matches!(err, Error::MalformedCommand(_)));
    }

    #[test]
    fn test_unit_actions_accept_empty_payload() {
        // The front end sends `payload: {}` for every action
        assert_eq!(
            ClientMessage::decode(r#"{"action":"STOP","payload":{}}"#).unwrap(),
            ClientMessage::Stop
        );
        assert_eq!(
            ClientMessage::decode(r#"{"action":"PAUSE"}"#).unwrap(),
            ClientMessage::Pause
        );
    }

    #[test]
    fn test_volume_defaults_and_clamps() {
        assert_eq!(
            ClientMessage::decode(r#"{"action":"VOLUME","payload":{}}"#).unwrap(),
            ClientMessage::Volume { value: 0.5 }
        );
        assert_eq!(
            ClientMessage::decode(r#"{"action":"VOLUME","payload":{"value":1.7}}"#).unwrap(),
            ClientMessage::Volume { value: 1.0 }
        );
        assert_eq!(
            ClientMessage::decode(r#"{"action":"VOLUME","payload":{"value":"0.25"}}"#).unwrap(),
            ClientMessage::Volume { value: 0.25 }
        );
    }

    #[test]
    fn test_seek_negative_time_clamped() {
        assert_eq!(
            ClientMessage::decode(r#"{"action":"SEEK","payload":{"time":-4}}"#).unwrap(),
            ClientMessage::Seek { time: 0.0 }
        );
    }

    #[test]
    fn test_garbage_is_malformed() {
        for text in ["not json", r#"{"payload":{}}"#, r#"{"action":"DANCE"}"#, r#"[1,2,3]"#] {
            let err = ClientMessage::decode(text).unwrap_err();
            assert!(matches!(err, Error::MalformedCommand(_)), "{} should be malformed", text);
        }
    }

    #[test]
    fn test_update_nav_requires_object() {
        assert!(ClientMessage::decode(r#"{"action":"UPDATE_NAV","payload":3}"#).is_err());

        let msg = ClientMessage::decode(r#"{"action":"UPDATE_NAV","payload":{"crateIndex":2}}"#).unwrap();
        assert!(matches!(msg, ClientMessage::UpdateNav(_)));
    }

    #[test]
    fn test_navigation_merge_is_shallow() {
        let mut nav = NavigationState::default();
        assert_eq!(nav.get("sortMode"), Some(&json!("RAW")));

        let patch = json!({"crateIndex": 3, "albumId": "abc"});
        if let Value::Object(map) = patch {
            nav.merge(map);
        }

        assert_eq!(nav.get("crateIndex"), Some(&json!(3)));
        assert_eq!(nav.get("albumId"), Some(&json!("abc")));
        assert_eq!(nav.get("accentColor"), Some(&json!(DEFAULT_ACCENT_COLOR)));
    }
}
