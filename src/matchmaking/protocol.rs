//! Messages exchanged between sessions over the shared broadcast channel.
//!
//! Every session receives every envelope, its own included; recipients filter
//! by `senderId`, match id and addressee.

use serde::{Deserialize, Serialize};

use crate::error::LobbyResult;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub sender_id: String,
    pub message: ChannelMessage,
}

impl Envelope {
    pub fn new(sender_id: impl Into<String>, message: ChannelMessage) -> Self {
        Self {
            sender_id: sender_id.into(),
            message,
        }
    }

    pub fn to_json(&self) -> LobbyResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> LobbyResult<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ChannelMessage {
    MatchJoin(MatchJoin),
    MatchConfirm(MatchConfirm),
    MatchCancel(MatchCancel),
    MatchReject(MatchReject),
    Move(RelayedMove),
    ResyncRequest(ResyncRequest),
    MoveLog(MoveLog),
}

impl ChannelMessage {
    pub fn match_id(&self) -> &str {
        match self {
            ChannelMessage::MatchJoin(m) => &m.match_id,
            ChannelMessage::MatchConfirm(m) => &m.match_id,
            ChannelMessage::MatchCancel(m) => &m.match_id,
            ChannelMessage::MatchReject(m) => &m.match_id,
            ChannelMessage::Move(m) => &m.match_id,
            ChannelMessage::ResyncRequest(m) => &m.match_id,
            ChannelMessage::MoveLog(m) => &m.match_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ChannelMessage::MatchJoin(_) => "match-join",
            ChannelMessage::MatchConfirm(_) => "match-confirm",
            ChannelMessage::MatchCancel(_) => "match-cancel",
            ChannelMessage::MatchReject(_) => "match-reject",
            ChannelMessage::Move(_) => "move",
            ChannelMessage::ResyncRequest(_) => "resync-request",
            ChannelMessage::MoveLog(_) => "move-log",
        }
    }
}

/// A guest asking to join `match_id`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MatchJoin {
    pub match_id: String,
    pub guest_id: String,
    pub guest_label: String,
}

/// Host accepting `guest_id`; only that guest acts on it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MatchConfirm {
    pub match_id: String,
    pub host_id: String,
    pub guest_id: String,
    pub host_label: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MatchCancel {
    pub match_id: String,
    pub reason: String,
}

/// Host turning a guest away because the match is already taken.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MatchReject {
    pub match_id: String,
    pub guest_id: String,
    pub reason: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RelayedMove {
    pub match_id: String,
    pub payload: MovePayload,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MovePayload {
    pub san: String,
    pub fen: String,
    /// Milliseconds since the Unix epoch at the sender
    pub timestamp: u64,
    pub sender_id: String,
    /// 1-based count of moves relayed in this match, both directions
    pub seq: u32,
}

/// Sent when a relayed move arrives out of sequence.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResyncRequest {
    pub match_id: String,
    pub requester_id: String,
    pub expected_seq: u32,
}

/// Full move list of a match, answering a [`ResyncRequest`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MoveLog {
    pub match_id: String,
    pub target_id: String,
    pub moves: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn move_envelope_wire_shape() {
        let envelope = Envelope::new(
            "s1",
            ChannelMessage::Move(RelayedMove {
                match_id: "m1".to_string(),
                payload: MovePayload {
                    san: "e4".to_string(),
                    fen: "fen".to_string(),
                    timestamp: 5,
                    sender_id: "s1".to_string(),
                    seq: 1,
                },
            }),
        );

        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            value,
            json!({
                "senderId": "s1",
                "message": {
                    "type": "move",
                    "matchId": "m1",
                    "payload": {"san": "e4", "fen": "fen", "timestamp": 5, "senderId": "s1", "seq": 1}
                }
            })
        );
    }

    #[test]
    fn parses_kebab_case_types() {
        let text = r#"{"senderId":"g","message":{"type":"match-join","matchId":"m","guestId":"g","guestLabel":"Guest"}}"#;
        let envelope = Envelope::from_json(text).unwrap();
        assert_eq!(envelope.message.kind(), "match-join");
        assert_eq!(envelope.message.match_id(), "m");
    }

    #[test]
    fn rejects_unknown_type() {
        let text = r#"{"senderId":"g","message":{"type":"match-steal","matchId":"m"}}"#;
        assert!(Envelope::from_json(text).is_err());
    }
}
