//! Wire types for the Bridge protocol (spec §6.2): UTF-8 JSON envelopes
//! exchanged with the game-client helper over a single WebSocket.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Closed set of message types the Bridge may send (spec §6.2 table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Hello,
    ServerInfo,
    CommandExecute,
    ScreenshotCapture,
    RegionScan,
    RegionHeightmap,
    PlayerContext,
    PlayerEntities,
    PaletteAnalyze,
    PaletteRegion,
    LightAnalyze,
    SymmetryCheck,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Hello => "hello",
            MessageType::ServerInfo => "server.info",
            MessageType::CommandExecute => "command.execute",
            MessageType::ScreenshotCapture => "screenshot.capture",
            MessageType::RegionScan => "region.scan",
            MessageType::RegionHeightmap => "region.heightmap",
            MessageType::PlayerContext => "player.context",
            MessageType::PlayerEntities => "player.entities",
            MessageType::PaletteAnalyze => "palette.analyze",
            MessageType::PaletteRegion => "palette.region",
            MessageType::LightAnalyze => "light.analyze",
            MessageType::SymmetryCheck => "symmetry.check",
        }
    }
}

/// Request envelope (spec §6.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeRequest {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub payload: Value,
}

/// Response envelope (spec §6.2). Exactly one per request.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeResponse {
    pub id: String,
    pub ok: bool,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl BridgeResponse {
    pub fn into_result(self) -> Result<Value, String> {
        if self.ok {
            Ok(self.result.unwrap_or(Value::Null))
        } else {
            Err(self.error.unwrap_or_else(|| "unknown peer error".to_string()))
        }
    }
}

/// Capability map returned at handshake time and cached for the connection's
/// lifetime (spec §3 "Capabilities").
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Capabilities {
    #[serde(default)]
    pub message_types: Vec<String>,
    #[serde(default)]
    pub worldedit_available: bool,
    #[serde(default)]
    pub worldedit_reason: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

impl Capabilities {
    pub fn supports(&self, message_type: &str) -> bool {
        self.message_types.is_empty() || self.message_types.iter().any(|m| m == message_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_ok_unwraps_result() {
        let r = BridgeResponse {
            id: "1".into(),
            ok: true,
            result: Some(serde_json::json!({"a": 1})),
            error: None,
        };
        assert_eq!(r.into_result().unwrap(), serde_json::json!({"a": 1}));
    }

    #[test]
    fn response_err_surfaces_peer_message() {
        let r = BridgeResponse {
            id: "1".into(),
            ok: false,
            result: None,
            error: Some("Authentication failed".into()),
        };
        assert_eq!(r.into_result().unwrap_err(), "Authentication failed");
    }

    #[test]
    fn capabilities_empty_list_means_unknown_so_default_allow() {
        let caps = Capabilities::default();
        assert!(caps.supports("command.execute"));
    }

    #[test]
    fn capabilities_nonempty_list_restricts() {
        let caps = Capabilities {
            message_types: vec!["hello".to_string(), "command.execute".to_string()],
            ..Default::default()
        };
        assert!(caps.supports("command.execute"));
        assert!(!caps.supports("region.scan"));
    }
}
