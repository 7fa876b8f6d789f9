use crate::gateway::{ GatewayError, MessageGateway };
use crate::history::{ SessionStore, StoreError };
use crate::models::auth::Credentials;
use crate::models::chat::{ ChatMessage, Sender };
use log::{ debug, error, info, warn };
use std::sync::Arc;
use std::sync::atomic::{ AtomicBool, Ordering };
use thiserror::Error;
use tokio::sync::{ watch, Mutex };

#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendState {
    Idle,
    Sending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    EmptyInput,
    NoActiveSession,
    SendInFlight,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Rejected(Rejection),
    Replied(ChatMessage),
}

/// Resets the in-flight flag and the loading signal however a send ends.
/// Observers are only notified when loading was actually raised.
struct SendingGuard<'a> {
    sending: &'a AtomicBool,
    loading: &'a watch::Sender<bool>,
}

impl Drop for SendingGuard<'_> {
    fn drop(&mut self) {
        self.sending.store(false, Ordering::SeqCst);
        self.loading.send_if_modified(|loading| std::mem::replace(loading, false));
    }
}

/// Drives the message thread of the active session: local append of user
/// input, one gateway round trip, append of the reply.
pub struct ChatController {
    store: Arc<Mutex<SessionStore>>,
    gateway: Arc<dyn MessageGateway>,
    credentials: Option<Credentials>,
    input: Mutex<String>,
    sending: AtomicBool,
    loading: watch::Sender<bool>,
}

impl ChatController {
    pub fn new(
        store: Arc<Mutex<SessionStore>>,
        gateway: Arc<dyn MessageGateway>,
        credentials: Option<Credentials>
    ) -> Self {
        let (loading, _) = watch::channel(false);
        Self {
            store,
            gateway,
            credentials,
            input: Mutex::new(String::new()),
            sending: AtomicBool::new(false),
            loading,
        }
    }

    pub fn store(&self) -> Arc<Mutex<SessionStore>> {
        self.store.clone()
    }

    pub fn state(&self) -> SendState {
        if self.sending.load(Ordering::SeqCst) { SendState::Sending } else { SendState::Idle }
    }

    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    pub async fn set_input(&self, text: &str) {
        *self.input.lock().await = text.to_string();
    }

    pub async fn input(&self) -> String {
        self.input.lock().await.clone()
    }

    /// Messages of the active session, oldest first.
    pub async fn messages(&self) -> Vec<ChatMessage> {
        let store = self.store.lock().await;
        store
            .active_session()
            .map(|session| session.messages.clone())
            .unwrap_or_default()
    }

    /// Creates a session locally, then registers it remotely. The remote call
    /// never affects local state; its failure is only logged.
    pub async fn create_chat(&self, title: &str) -> Result<String, ChatError> {
        let id = self.store.lock().await.create_session(title)?;
        info!("Created chat {} ('{}')", id, title);
        if let Err(e) = self.gateway.create_history(title, self.credentials.as_ref()).await {
            warn!("Remote history creation for chat {} failed: {}", id, e);
        }
        Ok(id)
    }

    /// Sends the pending input to the gateway on behalf of the active session.
    ///
    /// Rejections leave the controller untouched: no flag flip, no loading
    /// notification. The user message is appended before the round trip and
    /// stays appended if the gateway fails; no bot message is added in that case.
    pub async fn submit(&self) -> Result<Submission, ChatError> {
        if self.sending.load(Ordering::SeqCst) {
            debug!("Submission rejected: a message is already being sent");
            return Ok(Submission::Rejected(Rejection::SendInFlight));
        }

        let (session_id, content, _guard) = {
            let mut input = self.input.lock().await;
            if input.trim().is_empty() {
                debug!("Submission rejected: empty input");
                return Ok(Submission::Rejected(Rejection::EmptyInput));
            }

            let mut store = self.store.lock().await;
            let session_id = match store.active_session() {
                Some(session) => session.id.clone(),
                None => {
                    debug!("Submission rejected: no active session");
                    return Ok(Submission::Rejected(Rejection::NoActiveSession));
                }
            };

            if
                self.sending
                    .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                    .is_err()
            {
                debug!("Submission rejected: a message is already being sent");
                return Ok(Submission::Rejected(Rejection::SendInFlight));
            }
            let guard = SendingGuard {
                sending: &self.sending,
                loading: &self.loading,
            };

            store.append_message(&session_id, &input, Sender::User)?;
            (session_id, std::mem::take(&mut *input), guard)
        };
        self.loading.send_replace(true);

        let reply = match self.gateway.send(&content, self.credentials.as_ref()).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("Assistant request for chat {} failed: {}", session_id, e);
                return Err(e.into());
            }
        };

        let mut store = self.store.lock().await;
        store.append_message(&session_id, &reply.into_content(), Sender::Bot)?;
        let message = store
            .session(&session_id)
            .and_then(|session| session.messages.last().cloned())
            .ok_or_else(|| StoreError::SessionNotFound(session_id.clone()))?;
        Ok(Submission::Replied(message))
    }
}
