pub mod categorize;
pub mod snapshot;

use crate::models::chat::{ ChatMessage, ChatSession, ChatState, Sender };
use log::{ debug, info, warn };
use snapshot::{ MemorySnapshotStore, SnapshotError, SnapshotStore };
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

pub const CHAT_STORAGE_KEY: &str = "chat-storage";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Chat session '{0}' not found")]
    SessionNotFound(String),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error("Chat state JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Ordered collection of chat sessions plus the active session pointer.
///
/// Each mutation writes the whole [`ChatState`] snapshot through the
/// configured [`SnapshotStore`] before it becomes visible.
pub struct SessionStore {
    state: ChatState,
    backend: Arc<dyn SnapshotStore>,
    key: String,
}

impl SessionStore {
    /// Restores the persisted snapshot, or starts empty when none exists.
    pub fn open(backend: Arc<dyn SnapshotStore>) -> Result<Self, StoreError> {
        let state = match backend.load(CHAT_STORAGE_KEY)? {
            Some(json) => ChatState::from_json(&json)?,
            None => ChatState::default(),
        };
        info!("Loaded {} chat session(s)", state.chats.len());
        Ok(Self::with_state(state, backend))
    }

    pub fn with_state(state: ChatState, backend: Arc<dyn SnapshotStore>) -> Self {
        Self {
            state,
            backend,
            key: CHAT_STORAGE_KEY.to_string(),
        }
    }

    pub fn in_memory() -> Self {
        Self::with_state(ChatState::default(), Arc::new(MemorySnapshotStore::new()))
    }

    pub fn create_session(&mut self, title: &str) -> Result<String, StoreError> {
        let id = self.generate_id();
        let mut next = self.state.clone();
        next.chats.push(ChatSession::new(id.clone(), title));
        self.commit(next)?;
        debug!("Created chat session {} ('{}')", id, title);
        Ok(id)
    }

    pub fn append_message(
        &mut self,
        session_id: &str,
        content: &str,
        sender: Sender
    ) -> Result<(), StoreError> {
        let index = self
            .position(session_id)
            .ok_or_else(|| StoreError::SessionNotFound(session_id.to_string()))?;
        let mut next = self.state.clone();
        next.chats[index].messages.push(ChatMessage::new(content, sender));
        self.commit(next)
    }

    /// Returns whether a session was removed. Clears the active pointer when it
    /// referenced the removed session.
    pub fn delete_session(&mut self, session_id: &str) -> Result<bool, StoreError> {
        let Some(index) = self.position(session_id) else {
            return Ok(false);
        };
        let mut next = self.state.clone();
        next.chats.remove(index);
        if next.current_chat_id.as_deref() == Some(session_id) {
            next.current_chat_id = None;
        }
        self.commit(next)?;
        debug!("Deleted chat session {}", session_id);
        Ok(true)
    }

    /// Sets the active pointer. Unknown ids are not rejected.
    pub fn set_active_session(&mut self, session_id: &str) -> Result<(), StoreError> {
        if self.position(session_id).is_none() {
            warn!("Active session set to unknown id {}", session_id);
        }
        let mut next = self.state.clone();
        next.current_chat_id = Some(session_id.to_string());
        self.commit(next)
    }

    pub fn sessions(&self) -> &[ChatSession] {
        &self.state.chats
    }

    pub fn session(&self, session_id: &str) -> Option<&ChatSession> {
        self.state.chats.iter().find(|chat| chat.id == session_id)
    }

    pub fn active_session_id(&self) -> Option<&str> {
        self.state.current_chat_id.as_deref()
    }

    /// The active session, if the pointer is set and still resolves.
    pub fn active_session(&self) -> Option<&ChatSession> {
        self.active_session_id().and_then(|id| self.session(id))
    }

    fn generate_id(&self) -> String {
        loop {
            let id = Uuid::new_v4().simple().to_string();
            if self.session(&id).is_none() {
                return id;
            }
        }
    }

    fn position(&self, session_id: &str) -> Option<usize> {
        self.state.chats.iter().position(|chat| chat.id == session_id)
    }

    /// Writes `next` through the backend and only then makes it current, so a
    /// failed write leaves the in-memory state untouched.
    fn commit(&mut self, next: ChatState) -> Result<(), StoreError> {
        let json = next.to_json()?;
        self.backend.save(&self.key, &json)?;
        self.state = next;
        Ok(())
    }
}
