//! Inbound commands to the application service.
//!
//! Operators issue commands by writing a `{command, commandId, payload}`
//! triple into the device document.  [`RemoteCommand::from_document`]
//! turns a snapshot of that document into a typed [`CommandKind`] that the
//! [`CommandChannel`](crate::remote::command::CommandChannel) dispatches.

use serde_json::Value;

use super::ports::Document;
use crate::remote::document::DeviceDocument;

/// Tag written back by every ack.  Means "nothing pending".
pub const IDLE_TAG: &str = "idle";

/// The fixed command vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    /// Lock the screen now.
    Sleep,
    /// Wake the screen now.
    Wake,
    /// Reload the pinned content.
    Reload,
    /// Navigate the content surface to `payload.url`.
    OpenUrl(Option<String>),
    /// Start an OTA update from `payload.url`, or the configured default.
    Update(Option<String>),
    /// Move this device to another tenant (company).
    SetTenant(Option<String>),
    /// Liveness check.
    Ping,
    /// Anything else.  Always acked negatively.
    Unknown(String),
}

impl CommandKind {
    /// Parse a command tag, pulling the arguments each kind needs from
    /// `payload`.
    pub fn parse(tag: &str, payload: &Document) -> Self {
        match tag {
            "sleep" => Self::Sleep,
            "wake" => Self::Wake,
            "reload" => Self::Reload,
            "open_url" => Self::OpenUrl(payload_str(payload, "url")),
            "update" | "update_now" => Self::Update(payload_str(payload, "url")),
            "set_company" | "switch_tenant" => Self::SetTenant(
                payload_str(payload, "newCompany").or_else(|| payload_str(payload, "company")),
            ),
            "ping" => Self::Ping,
            other => Self::Unknown(other.to_owned()),
        }
    }
}

/// A command pulled out of a device document snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCommand {
    /// Raw tag as written by the operator.
    pub tag: String,
    /// Opaque de-duplication token.
    pub id: String,
    pub payload: Document,
    pub kind: CommandKind,
}

impl RemoteCommand {
    /// Extract the pending command, if any.
    ///
    /// Returns `None` when `command` or `commandId` is missing or blank, and
    /// when the slot holds the neutral [`IDLE_TAG`].
    pub fn from_document(doc: &DeviceDocument) -> Option<Self> {
        let tag = doc.command.as_deref().map(str::trim).filter(|t| !t.is_empty())?;
        let id = doc.command_id.as_deref().filter(|id| !id.is_empty())?;
        if tag == IDLE_TAG {
            return None;
        }

        let mut payload = doc.payload.clone();
        // Older consoles put the tenant next to the command instead of in
        // the payload.
        if !payload.contains_key("newCompany") {
            if let Some(company) = doc.body.get("newCompany") {
                payload.insert("newCompany".into(), company.clone());
            }
        }

        let kind = CommandKind::parse(tag, &payload);
        Some(Self {
            tag: tag.to_owned(),
            id: id.to_owned(),
            payload,
            kind,
        })
    }
}

/// Non-blank string field of a payload.
fn payload_str(payload: &Document, key: &str) -> Option<String> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}
