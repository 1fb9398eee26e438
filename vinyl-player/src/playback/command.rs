//! Playback commands
//!
//! Immutable once submitted; the sequencer applies them one at a time.

use vinyl_common::protocol::ClientMessage;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Play {
        /// Raw track reference (file path or streaming URI)
        track: String,
        start_offset_seconds: f64,
        /// Display metadata supplied by the client, if any
        title: Option<String>,
        artist: Option<String>,
    },
    Stop,
    /// Toggles between playing and paused
    Pause,
    SetVolume { level: f32 },
    Seek { offset_seconds: f64 },
}

impl Command {
    pub fn play(track: impl Into<String>, start_offset_seconds: f64) -> Self {
        Command::Play {
            track: track.into(),
            start_offset_seconds,
            title: None,
            artist: None,
        }
    }

    /// Playback command carried by an inbound message; `None` for messages
    /// that only touch navigation state.
    pub fn from_client_message(message: ClientMessage) -> Option<Self> {
        match message {
            ClientMessage::Play(request) => Some(Command::Play {
                track: request.file_path,
                start_offset_seconds: request.start_time.max(0.0),
                title: request.title,
                artist: request.artist,
            }),
            ClientMessage::Stop => Some(Command::Stop),
            ClientMessage::Pause => Some(Command::Pause),
            ClientMessage::Volume { value } => Some(Command::SetVolume {
                level: value.clamp(0.0, 1.0),
            }),
            ClientMessage::Seek { time } => Some(Command::Seek {
                offset_seconds: time.max(0.0),
            }),
            ClientMessage::UpdateNav(_) => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Play { .. } => "play",
            Command::Stop => "stop",
            Command::Pause => "pause",
            Command::SetVolume { .. } => "set_volume",
            Command::Seek { .. } => "seek",
        }
    }
}
