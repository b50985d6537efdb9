use kioskit_core::{DownloadProgress, StatusTag, UpdateStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::channel::{HostChannel, UiChannel};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed message envelope: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("unknown channel '{0}'")]
    UnknownChannel(String),

    #[error("channel '{channel}' does not take a payload")]
    UnexpectedPayload { channel: &'static str },

    #[error("invalid payload on '{channel}': {source}")]
    InvalidPayload {
        channel: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Deserialize)]
struct IncomingEnvelope {
    channel: String,
    #[serde(default)]
    payload: Value,
}

#[derive(Serialize)]
struct OutgoingEnvelope<'a, P: Serialize> {
    channel: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<&'a P>,
}

fn parse_envelope(line: &str) -> Result<IncomingEnvelope, DecodeError> {
    serde_json::from_str(line).map_err(DecodeError::Malformed)
}

fn encode_envelope<P: Serialize>(
    channel: &str,
    payload: Option<&P>,
) -> Result<String, serde_json::Error> {
    serde_json::to_string(&OutgoingEnvelope { channel, payload })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppInfo {
    pub name: String,
    pub version: String,
    pub ip: String,
}

/// Mirror of the host's update status as seen by the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateStatusPayload {
    pub status: StatusTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<DownloadProgress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&UpdateStatus> for UpdateStatusPayload {
    fn from(status: &UpdateStatus) -> Self {
        Self {
            status: status.tag(),
            progress: status.progress().copied(),
            error: status.error().map(ToString::to_string),
        }
    }
}

impl HostChannel {
    /// Encode a host-bound message. These channels never carry a payload.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn encode(self) -> Result<String, serde_json::Error> {
        encode_envelope::<()>(self.as_str(), None)
    }

    /// Decode a host-bound message line.
    ///
    /// # Errors
    /// Returns an error for malformed JSON, unknown channels, or a payload on a
    /// payload-less channel.
    pub fn decode(line: &str) -> Result<Self, DecodeError> {
        let envelope = parse_envelope(line)?;
        let channel = Self::from_name(&envelope.channel)
            .ok_or(DecodeError::UnknownChannel(envelope.channel))?;
        if !envelope.payload.is_null() {
            return Err(DecodeError::UnexpectedPayload {
                channel: channel.as_str(),
            });
        }
        Ok(channel)
    }
}

/// A message sent from the host to the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum UiMessage {
    AppInfoReady(AppInfo),
    DebugModeChanged(bool),
    UpdateStatusChanged(UpdateStatusPayload),
}

impl UiMessage {
    #[must_use]
    pub fn channel(&self) -> UiChannel {
        match self {
            Self::AppInfoReady(_) => UiChannel::AppInfoReady,
            Self::DebugModeChanged(_) => UiChannel::DebugModeChanged,
            Self::UpdateStatusChanged(_) => UiChannel::UpdateStatusChanged,
        }
    }

    #[must_use]
    pub fn update_status(status: &UpdateStatus) -> Self {
        Self::UpdateStatusChanged(status.into())
    }

    /// Encode as a single-line JSON envelope.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        let channel = self.channel().as_str();
        match self {
            Self::AppInfoReady(info) => encode_envelope(channel, Some(info)),
            Self::DebugModeChanged(enabled) => encode_envelope(channel, Some(enabled)),
            Self::UpdateStatusChanged(payload) => encode_envelope(channel, Some(payload)),
        }
    }

    /// Decode a UI-bound message line.
    ///
    /// # Errors
    /// Returns an error for malformed JSON, unknown channels, or a payload that
    /// does not match the channel.
    pub fn decode(line: &str) -> Result<Self, DecodeError> {
        let envelope = parse_envelope(line)?;
        let channel = UiChannel::from_name(&envelope.channel)
            .ok_or(DecodeError::UnknownChannel(envelope.channel))?;
        let invalid = |source| DecodeError::InvalidPayload {
            channel: channel.as_str(),
            source,
        };

        match channel {
            UiChannel::AppInfoReady => serde_json::from_value(envelope.payload)
                .map(Self::AppInfoReady)
                .map_err(invalid),
            UiChannel::DebugModeChanged => serde_json::from_value(envelope.payload)
                .map(Self::DebugModeChanged)
                .map_err(invalid),
            UiChannel::UpdateStatusChanged => serde_json::from_value(envelope.payload)
                .map(Self::UpdateStatusChanged)
                .map_err(invalid),
        }
    }
}
