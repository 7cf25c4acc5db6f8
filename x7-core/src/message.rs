//! Request and reply records of the camera's TCP API.
//!
//! Both are flat JSON objects. Requests are built from typed fields;
//! replies are kept as a raw field map because the camera mixes value
//! types (`"param": "40"`, `"param": ["5"]`, `"rval": 0`, `"rval": "0"`).

use serde::Serialize;
use serde_json::{Map, Value};

use crate::command::{Command, SettingVerb};
use crate::error::X7Error;

/// Session token assigned by the camera on `SessionInit`.
pub type SessionToken = u32;

// ── Request ──────────────────────────────────────────────────────

/// A request record, serialized in wire field order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Request {
    pub token: SessionToken,
    pub msg_id: u32,
    /// Setting key, sent as `type`.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
    pub param_size: usize,
}

impl Request {
    /// A plain command without key or parameter.
    pub fn command(token: SessionToken, command: Command) -> Self {
        Self {
            token,
            msg_id: command.id(),
            key: None,
            param: None,
            param_size: 0,
        }
    }

    /// Read one setting from the camera.
    pub fn get_setting(token: SessionToken, key: &str) -> Self {
        Self {
            key: Some(key.to_string()),
            ..Self::command(token, SettingVerb::Get.command())
        }
    }

    /// Write one setting. Must be sent inside a setting bracket.
    pub fn set_setting(token: SessionToken, key: &str, value: &str) -> Self {
        Self {
            token,
            msg_id: SettingVerb::Set.command().id(),
            key: Some(key.to_string()),
            param: Some(value.to_string()),
            param_size: value.len(),
        }
    }

    pub fn command_kind(&self) -> Option<Command> {
        Command::try_from(self.msg_id).ok()
    }
}

// ── Reply ────────────────────────────────────────────────────────

/// A reply record as received from the camera.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    fields: Map<String, Value>,
}

impl Reply {
    /// Parse one reply record. Anything but a JSON object is a protocol error.
    pub fn parse(text: &str) -> Result<Self, X7Error> {
        match serde_json::from_str::<Value>(text)? {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(X7Error::Protocol(format!(
                "reply is not a JSON object: {other}"
            ))),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// A field rendered as text: strings verbatim, everything else as JSON.
    pub fn field_text(&self, field: &str) -> Option<String> {
        self.get(field).map(value_text)
    }

    /// The `rval` status code. Accepts numbers and numeric strings.
    pub fn rval(&self) -> Option<i64> {
        match self.get("rval")? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// The `param` field as text, if present and scalar.
    pub fn param(&self) -> Option<String> {
        match self.get("param")? {
            Value::Array(_) | Value::Object(_) | Value::Null => None,
            scalar => Some(value_text(scalar)),
        }
    }

    /// The `settable` capability string used during preview negotiation.
    pub fn settable(&self) -> Option<&str> {
        self.get("settable").and_then(Value::as_str)
    }

    /// The session token carried as the first element of `param`.
    pub fn session_token(&self) -> Result<SessionToken, X7Error> {
        let first = self
            .get("param")
            .and_then(Value::as_array)
            .and_then(|items| items.first())
            .ok_or(X7Error::Assertion("session token missing from param"))?;
        value_text(first)
            .trim()
            .parse()
            .map_err(|_| X7Error::Protocol(format!("invalid session token: {first}")))
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
