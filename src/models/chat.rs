use chrono::{ DateTime, Utc };
use serde::{ Serialize, Deserialize };
use std::fmt;

/// Number of characters of content used as a display key when a message has no id.
const DISPLAY_KEY_LEN: usize = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::User => write!(f, "user"),
            Sender::Bot => write!(f, "bot"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub sender: Sender,
    /// Entrance animation has not played yet. Never persisted.
    #[serde(skip)]
    pub is_first_render: bool,
}

impl ChatMessage {
    pub fn new(content: impl Into<String>, sender: Sender) -> Self {
        Self {
            id: None,
            content: content.into(),
            created_at: Utc::now(),
            sender,
            is_first_render: sender == Sender::Bot,
        }
    }

    /// Key used by renderers to avoid replaying animations. Not an identity.
    pub fn display_key(&self) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => self.content.chars().take(DISPLAY_KEY_LEN).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            created_at: Utc::now(),
            messages: Vec::new(),
        }
    }
}

/// Whole-store snapshot: everything the session store persists.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatState {
    #[serde(default)]
    pub chats: Vec<ChatSession>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_chat_id: Option<String>,
}

impl ChatState {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_key_prefers_id() {
        let mut msg = ChatMessage::new("hello there", Sender::Bot);
        assert_eq!(msg.display_key(), "hello there");

        msg.id = Some("m-1".to_string());
        assert_eq!(msg.display_key(), "m-1");
    }

    #[test]
    fn display_key_truncates_long_content_on_char_boundary() {
        let content = "я".repeat(80);
        let msg = ChatMessage::new(content, Sender::Bot);
        assert_eq!(msg.display_key().chars().count(), 50);
    }

    #[test]
    fn only_bot_messages_start_unrendered() {
        assert!(ChatMessage::new("hi", Sender::Bot).is_first_render);
        assert!(!ChatMessage::new("hi", Sender::User).is_first_render);
    }

    #[test]
    fn snapshot_restores_timestamps_and_drops_render_flag() {
        let mut session = ChatSession::new("abc", "Test");
        session.messages.push(ChatMessage::new("reply", Sender::Bot));
        let state = ChatState {
            chats: vec![session.clone()],
            current_chat_id: Some("abc".to_string()),
        };

        let json = state.to_json().unwrap();
        assert!(json.contains("\"sender\":\"bot\""));
        assert!(json.contains("\"currentChatId\":\"abc\""));
        assert!(!json.contains("isFirstRender"));

        let restored = ChatState::from_json(&json).unwrap();
        let restored_session = &restored.chats[0];
        assert_eq!(restored_session.created_at, session.created_at);
        assert_eq!(restored_session.messages[0].created_at, session.messages[0].created_at);
        assert!(!restored_session.messages[0].is_first_render);
        assert_eq!(restored.current_chat_id.as_deref(), Some("abc"));
    }

    #[test]
    fn sender_displays_as_stored_name() {
        assert_eq!(Sender::User.to_string(), "user");
        assert_eq!(Sender::Bot.to_string(), "bot");
    }
}
