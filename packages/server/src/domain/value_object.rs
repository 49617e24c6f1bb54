//! Value objects for the collaboration domain.
//!
//! Every identifier that crosses the wire is validated here once, so the rest
//! of the crate can treat them as well-formed.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ValueObjectError;

/// Maximum length of a document id or user id.
pub const MAX_ID_LENGTH: usize = 128;

/// Maximum length of a single chat line.
pub const MAX_CHAT_TEXT_LENGTH: usize = 4000;

/// Fixed palette assigned to collaborators by join order.
pub const COLOR_PALETTE: [&str; 8] = [
    "#E53935", "#1E88E5", "#43A047", "#FB8C00", "#8E24AA", "#00ACC1", "#F4511E", "#3949AB",
];

fn validate_id(kind: &'static str, value: &str) -> Result<(), ValueObjectError> {
    if value.trim().is_empty() {
        return Err(ValueObjectError::EmptyId(kind));
    }
    if value.chars().count() > MAX_ID_LENGTH {
        return Err(ValueObjectError::IdTooLong {
            kind,
            max: MAX_ID_LENGTH,
        });
    }
    Ok(())
}

/// Identifier of a document whose session is hosted by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        validate_id("document id", &value)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Topic on the fan-out bus carrying this document's presence events.
    pub fn presence_topic(&self) -> String {
        format!("doc:{}:presence", self.0)
    }

    /// Key under which this document's chat history is stored.
    pub fn chat_history_key(&self) -> String {
        format!("chat:{}", self.0)
    }
}

impl TryFrom<String> for DocumentId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable identity of a user, as asserted by the token verifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        validate_id("user id", &value)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies one physical connection. Two connections of the same user
/// never share a `ConnectionId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Last known pointer position of a collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    pub x: f64,
    pub y: f64,
    #[serde(rename = "pagina")]
    pub page: u32,
}

/// Display color taken from [`COLOR_PALETTE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Color(&'static str);

impl Color {
    /// `palette[join_index mod palette_size]`
    pub fn of(join_index: usize) -> Self {
        Self(COLOR_PALETTE[join_index % COLOR_PALETTE.len()])
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

/// Validated body of a chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatText(String);

impl ChatText {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.trim().is_empty() {
            return Err(ValueObjectError::EmptyChatText);
        }
        if value.chars().count() > MAX_CHAT_TEXT_LENGTH {
            return Err(ValueObjectError::ChatTextTooLong {
                max: MAX_CHAT_TEXT_LENGTH,
            });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}
