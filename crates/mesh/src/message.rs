//! Message types, typed payloads and packets.

use crate::error::{MeshError, MeshResult};
use crate::node::{GeoLocation, NodeId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Recipient string that marks a broadcast
pub const BROADCAST: &str = "BROADCAST";

/// Kind of message a node can send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    /// Routed unicast
    Direct,
    /// Emergency call for help
    Sos,
    /// Group chat line
    Chat,
    /// Safety status update
    Status,
    /// Request for supplies
    Resource,
    /// Position update
    Location,
    /// Operator alert
    BroadcastAlert,
}

impl MessageType {
    /// Every known type
    pub const ALL: [MessageType; 7] = [
        MessageType::Direct,
        MessageType::Sos,
        MessageType::Chat,
        MessageType::Status,
        MessageType::Resource,
        MessageType::Location,
        MessageType::BroadcastAlert,
    ];

    /// Flooded to every connected node instead of routed
    pub fn is_broadcast_class(self) -> bool {
        !matches!(self, MessageType::Direct)
    }

    /// Wire name
    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::Direct => "DIRECT",
            MessageType::Sos => "SOS",
            MessageType::Chat => "CHAT",
            MessageType::Status => "STATUS",
            MessageType::Resource => "RESOURCE",
            MessageType::Location => "LOCATION",
            MessageType::BroadcastAlert => "BROADCAST_ALERT",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = MeshError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MessageType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| MeshError::UnsupportedMessageType(s.to_string()))
    }
}

/// Free-text body used by DIRECT, SOS, CHAT and BROADCAST_ALERT
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    /// Message text
    #[serde(default)]
    pub text: String,
}

/// Self-reported safety state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SafetyStatus {
    /// Not in danger
    Safe,
    /// Needs assistance
    Help,
    /// Needs immediate assistance
    Emergency,
    /// Going dark
    Offline,
}

/// STATUS body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusContent {
    /// Reported state
    pub status_type: SafetyStatus,
    /// Sender-side timestamp (Unix epoch milliseconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

/// Requested supply category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceType {
    /// Drinking water
    Water,
    /// Food
    Food,
    /// Medical supplies
    Medical,
    /// Shelter
    Shelter,
    /// Electrical power
    Power,
    /// Radio or other comms gear
    Communication,
}

/// How urgent a resource request is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Urgency {
    /// Can wait
    Low,
    /// Soon
    Medium,
    /// Within the hour
    High,
    /// Now
    Critical,
}

/// RESOURCE body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContent {
    /// What is needed
    pub resource_type: ResourceType,
    /// How urgently
    pub urgency: Urgency,
    /// Sender-side timestamp (Unix epoch milliseconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

/// LOCATION body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationContent {
    /// Reported position; a LOCATION without one only announces presence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoLocation>,
    /// Sender-side timestamp (Unix epoch milliseconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

/// Message body, tagged by its message type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessagePayload {
    /// Routed text
    Direct(TextContent),
    /// Emergency broadcast
    Sos(TextContent),
    /// Chat broadcast
    Chat(TextContent),
    /// Safety status broadcast
    Status(StatusContent),
    /// Resource request broadcast
    Resource(ResourceContent),
    /// Position broadcast
    Location(LocationContent),
    /// Operator alert broadcast
    BroadcastAlert(TextContent),
}

impl MessagePayload {
    /// The message type this payload belongs to
    pub fn message_type(&self) -> MessageType {
        match self {
            MessagePayload::Direct(_) => MessageType::Direct,
            MessagePayload::Sos(_) => MessageType::Sos,
            MessagePayload::Chat(_) => MessageType::Chat,
            MessagePayload::Status(_) => MessageType::Status,
            MessagePayload::Resource(_) => MessageType::Resource,
            MessagePayload::Location(_) => MessageType::Location,
            MessagePayload::BroadcastAlert(_) => MessageType::BroadcastAlert,
        }
    }

    /// Position carried by a LOCATION payload
    pub fn location(&self) -> Option<GeoLocation> {
        match self {
            MessagePayload::Location(content) => content.location,
            _ => None,
        }
    }

    /// Shorthand for a DIRECT text payload
    pub fn direct(text: impl Into<String>) -> Self {
        MessagePayload::Direct(TextContent { text: text.into() })
    }

    /// Decode a payload from a wire type name and an untyped JSON body.
    ///
    /// Unknown type names yield [`MeshError::UnsupportedMessageType`]; bodies
    /// that do not fit the type's shape yield [`MeshError::InvalidPayload`].
    pub fn from_wire(type_name: &str, content: serde_json::Value) -> MeshResult<Self> {
        let message_type: MessageType = type_name.parse()?;
        let invalid = |e: serde_json::Error| MeshError::InvalidPayload {
            message_type: message_type.to_string(),
            reason: e.to_string(),
        };
        let payload = match message_type {
            MessageType::Direct => MessagePayload::Direct(text_body(content).map_err(invalid)?),
            MessageType::Sos => MessagePayload::Sos(text_body(content).map_err(invalid)?),
            MessageType::Chat => MessagePayload::Chat(text_body(content).map_err(invalid)?),
            MessageType::BroadcastAlert => {
                MessagePayload::BroadcastAlert(text_body(content).map_err(invalid)?)
            }
            MessageType::Status => {
                MessagePayload::Status(serde_json::from_value(content).map_err(invalid)?)
            }
            MessageType::Resource => {
                MessagePayload::Resource(serde_json::from_value(content).map_err(invalid)?)
            }
            MessageType::Location if content.is_null() => {
                MessagePayload::Location(LocationContent::default())
            }
            MessageType::Location => {
                MessagePayload::Location(serde_json::from_value(content).map_err(invalid)?)
            }
        };
        Ok(payload)
    }
}

// Text types also accept a bare JSON string
fn text_body(content: serde_json::Value) -> Result<TextContent, serde_json::Error> {
    match content {
        serde_json::Value::String(text) => Ok(TextContent { text }),
        serde_json::Value::Null => Ok(TextContent::default()),
        other => serde_json::from_value(other),
    }
}

/// Addressee of a message
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Recipient {
    /// Every connected node
    Broadcast,
    /// One node
    Node(NodeId),
}

impl Recipient {
    /// The target node, if unicast
    pub fn node_id(&self) -> Option<&str> {
        match self {
            Recipient::Broadcast => None,
            Recipient::Node(id) => Some(id),
        }
    }
}

impl From<String> for Recipient {
    fn from(value: String) -> Self {
        if value == BROADCAST {
            Recipient::Broadcast
        } else {
            Recipient::Node(value)
        }
    }
}

impl From<&str> for Recipient {
    fn from(value: &str) -> Self {
        Recipient::from(value.to_string())
    }
}

impl From<Recipient> for String {
    fn from(value: Recipient) -> Self {
        match value {
            Recipient::Broadcast => BROADCAST.to_string(),
            Recipient::Node(id) => id,
        }
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recipient::Broadcast => f.write_str(BROADCAST),
            Recipient::Node(id) => f.write_str(id),
        }
    }
}

/// Delivery state of a packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// Scheduled, not yet resolved
    Pending,
    /// Handed to the recipient
    Delivered,
    /// Recipient gone or unreachable
    Failed,
}

/// A message instance as published to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePacket {
    /// Unique message id
    pub id: String,
    /// Sender node
    pub from: NodeId,
    /// Addressee
    pub to: Recipient,
    /// Typed body; flattens to `type` and `content`
    #[serde(flatten)]
    pub payload: MessagePayload,
    /// Route taken; empty for broadcasts
    pub path: Vec<NodeId>,
    /// Creation time (Unix epoch milliseconds)
    pub timestamp: u64,
    /// Delivery state
    pub status: DeliveryStatus,
}

impl MessagePacket {
    /// The packet's message type
    pub fn message_type(&self) -> MessageType {
        self.payload.message_type()
    }
}
