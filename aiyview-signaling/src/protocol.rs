//! uv4l signaling protocol messages
//!
//! Every frame on the control channel is a JSON object whose `what` field
//! names the message. Payloads in `data` are themselves JSON documents, and
//! the server usually sends them pre-encoded as strings; both the encoded and
//! the plain form are accepted here.

use aiyview_core::{AiyViewError, AiyViewResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

/// Options sent with the `call` request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallOptions {
    /// Ask the server to use the hardware video encoder
    pub force_hw_vcodec: bool,
    /// uv4l video format code
    pub vformat: u32,
    /// Ask the server to trickle ICE candidates as they are gathered
    pub trickle_ice: bool,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            force_hw_vcodec: true,
            vformat: 55,
            trickle_ice: true,
        }
    }
}

/// Messages sent from the client to the signaling server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "what", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Start a call; the server answers with an offer
    Call {
        /// Codec and format preferences
        options: CallOptions,
    },
    /// Local description in response to the server's offer
    Answer {
        /// JSON-encoded [`SessionDescription`]
        data: String,
    },
    /// Ask the server to send its gathered candidates in one batch
    GenerateIceCandidates,
    /// End the call
    Hangup,
}

impl ClientMessage {
    /// Build an answer message carrying the given local description
    pub fn answer(description: &SessionDescription) -> AiyViewResult<Self> {
        let data = serde_json::to_string(description).map_err(|e| AiyViewError::ProtocolError {
            message: format!("failed to encode local description: {}", e),
        })?;
        Ok(ClientMessage::Answer { data })
    }

    /// Encode as a text frame
    pub fn to_json(&self) -> AiyViewResult<String> {
        serde_json::to_string(self).map_err(|e| AiyViewError::ProtocolError {
            message: format!("failed to encode client message: {}", e),
        })
    }

    /// The `what` discriminator of this message
    pub fn what(&self) -> &'static str {
        match self {
            ClientMessage::Call { .. } => "call",
            ClientMessage::Answer { .. } => "answer",
            ClientMessage::GenerateIceCandidates => "generateIceCandidates",
            ClientMessage::Hangup => "hangup",
        }
    }
}

/// Session description type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    /// Offer
    Offer,
    /// Provisional answer
    Pranswer,
    /// Answer
    Answer,
    /// Rollback
    Rollback,
}

/// Offer or answer describing the media session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDescription {
    /// Description type
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    /// SDP body
    pub sdp: String,
}

impl SessionDescription {
    /// Create an offer description
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    /// Create an answer description
    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

/// ICE candidate as it travels on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidateDescriptor {
    /// Index of the media description the candidate belongs to
    #[serde(rename = "sdpMLineIndex", default)]
    pub sdp_mline_index: Option<u16>,
    /// Media stream identification tag
    #[serde(rename = "sdpMid", default)]
    pub sdp_mid: Option<String>,
    /// Candidate attribute line
    pub candidate: String,
}

impl IceCandidateDescriptor {
    /// Create a descriptor for a candidate line
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            sdp_mline_index: None,
            sdp_mid: None,
            candidate: candidate.into(),
        }
    }

    /// Attach the media identification
    pub fn with_mid(mut self, mid: impl Into<String>, index: u16) -> Self {
        self.sdp_mid = Some(mid.into());
        self.sdp_mline_index = Some(index);
        self
    }
}

/// Messages received from the signaling server
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Remote offer
    Offer(SessionDescription),
    /// A single trickled candidate; `None` marks the end of gathering
    IceCandidate(Option<IceCandidateDescriptor>),
    /// A batch of candidates
    IceCandidates {
        /// Entries that decoded, in batch order
        candidates: Vec<IceCandidateDescriptor>,
        /// Entries that could not be decoded and were skipped
        malformed: usize,
    },
    /// Any message this client does not handle
    Unknown {
        /// The `what` value
        what: String,
        /// The full message
        message: Value,
    },
}

impl ServerMessage {
    /// Parse a text frame from the server
    pub fn parse(text: &str) -> AiyViewResult<Self> {
        let message: Value = serde_json::from_str(text).map_err(|e| AiyViewError::InvalidMessage {
            message: text.to_string(),
            source: e.into(),
        })?;

        let what = message
            .get("what")
            .and_then(Value::as_str)
            .filter(|what| !what.is_empty())
            .ok_or_else(|| AiyViewError::ProtocolError {
                message: format!("message without 'what': {}", text),
            })?
            .to_string();
        let data = message.get("data").cloned().unwrap_or(Value::Null);

        match what.as_str() {
            "offer" => decode_embedded(data)
                .map(ServerMessage::Offer)
                .map_err(|e| invalid(text, e)),
            "iceCandidate" => {
                if is_blank(&data) {
                    Ok(ServerMessage::IceCandidate(None))
                } else {
                    decode_embedded(data)
                        .map(|candidate| ServerMessage::IceCandidate(Some(candidate)))
                        .map_err(|e| invalid(text, e))
                }
            }
            "iceCandidates" => {
                let entries: Vec<Value> = if is_blank(&data) {
                    Vec::new()
                } else {
                    decode_embedded(data).map_err(|e| invalid(text, e))?
                };

                let mut candidates = Vec::with_capacity(entries.len());
                let mut malformed = 0;
                for (index, entry) in entries.into_iter().enumerate() {
                    match decode_embedded::<IceCandidateDescriptor>(entry) {
                        Ok(candidate) => candidates.push(candidate),
                        Err(e) => {
                            warn!("Skipping malformed candidate #{} in batch: {}", index, e);
                            malformed += 1;
                        }
                    }
                }
                Ok(ServerMessage::IceCandidates {
                    candidates,
                    malformed,
                })
            }
            _ => Ok(ServerMessage::Unknown { what, message }),
        }
    }

    /// Encode as a text frame, with payloads JSON-encoded into strings the
    /// way uv4l sends them
    pub fn to_json(&self) -> AiyViewResult<String> {
        let message = match self {
            ServerMessage::Offer(description) => {
                json!({ "what": "offer", "data": encode(description)? })
            }
            ServerMessage::IceCandidate(Some(candidate)) => {
                json!({ "what": "iceCandidate", "data": encode(candidate)? })
            }
            ServerMessage::IceCandidate(None) => json!({ "what": "iceCandidate", "data": "" }),
            ServerMessage::IceCandidates { candidates, .. } => {
                let entries = candidates
                    .iter()
                    .map(encode)
                    .collect::<AiyViewResult<Vec<String>>>()?;
                json!({ "what": "iceCandidates", "data": encode(&entries)? })
            }
            ServerMessage::Unknown { message, .. } => message.clone(),
        };
        Ok(message.to_string())
    }

    /// The `what` discriminator of this message
    pub fn what(&self) -> &str {
        match self {
            ServerMessage::Offer(_) => "offer",
            ServerMessage::IceCandidate(_) => "iceCandidate",
            ServerMessage::IceCandidates { .. } => "iceCandidates",
            ServerMessage::Unknown { what, .. } => what,
        }
    }
}

fn encode<T: Serialize>(value: &T) -> AiyViewResult<String> {
    serde_json::to_string(value).map_err(|e| AiyViewError::ProtocolError {
        message: format!("failed to encode server message: {}", e),
    })
}

fn is_blank(data: &Value) -> bool {
    match data {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn decode_embedded<T: DeserializeOwned>(data: Value) -> Result<T, serde_json::Error> {
    match data {
        Value::String(encoded) => serde_json::from_str(&encoded),
        other => serde_json::from_value(other),
    }
}

fn invalid(text: &str, error: serde_json::Error) -> AiyViewError {
    AiyViewError::InvalidMessage {
        message: text.to_string(),
        source: error.into(),
    }
}
