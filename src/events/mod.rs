//! Inbound event shapes and their NDJSON decoding.
//!
//! This is the only module that knows what the wire looks like: one JSON
//! object per line, discriminated by `type`. Everything downstream works
//! on the decoded types.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Alert(AlertEvent),
    Asset(AssetEvent),
    /// Re-evaluate every tracked alert immediately.
    CheckNow,
    /// Stop the run loop; observed only between events.
    Terminate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEvent {
    pub rule: String,
    pub asset: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub description: String,
    /// Source timestamp (epoch seconds); values <= 0 mean "use ingestion
    /// time".
    #[serde(default)]
    pub time: i64,
    /// Free-text action token set, e.g. "EMAIL/SMS".
    #[serde(default)]
    pub actions: String,
}

impl AlertEvent {
    pub fn wants_email(&self) -> bool {
        contains_token(&self.actions, "EMAIL")
    }

    pub fn wants_sms(&self) -> bool {
        contains_token(&self.actions, "SMS")
    }
}

// Case-insensitive substring scan, matching how upstream publishers write
// the action list ("SMS/EMAIL", "email", ...).
fn contains_token(actions: &str, token: &str) -> bool {
    actions.to_ascii_uppercase().contains(token)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AssetOperation {
    Create,
    Update,
    Inventory,
    Delete,
    /// Anything this engine does not act on; logged and ignored.
    Unknown(String),
}

impl From<String> for AssetOperation {
    fn from(label: String) -> Self {
        match label.as_str() {
            "create" => AssetOperation::Create,
            "update" => AssetOperation::Update,
            "inventory" => AssetOperation::Inventory,
            "delete" => AssetOperation::Delete,
            _ => AssetOperation::Unknown(label),
        }
    }
}

impl From<AssetOperation> for String {
    fn from(operation: AssetOperation) -> Self {
        match operation {
            AssetOperation::Create => "create".to_string(),
            AssetOperation::Update => "update".to_string(),
            AssetOperation::Inventory => "inventory".to_string(),
            AssetOperation::Delete => "delete".to_string(),
            AssetOperation::Unknown(label) => label,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetEvent {
    pub name: String,
    pub operation: AssetOperation,
    /// Only meaningful for create/update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
}

/// Decode one NDJSON line into an event, rejecting events that are missing
/// mandatory identity fields. Callers log and drop rejected lines.
pub fn decode(line: &str) -> Result<Event> {
    let event: Event = serde_json::from_str(line).context("invalid event json")?;
    match &event {
        Event::Alert(alert) => {
            if alert.rule.is_empty() {
                bail!("alert event without a rule name");
            }
            if alert.asset.is_empty() {
                bail!("alert event without an asset identifier");
            }
        }
        Event::Asset(asset) => {
            if asset.name.is_empty() {
                bail!("asset event without an asset identifier");
            }
        }
        Event::CheckNow | Event::Terminate => {}
    }
    Ok(event)
}
