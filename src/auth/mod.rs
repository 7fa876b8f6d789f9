use crate::gateway::{ AssistantReply, GatewayError, MessageGateway };
use crate::history::snapshot::{ MemorySnapshotStore, SnapshotError, SnapshotStore };
use crate::models::auth::{ AuthState, Credentials };
use log::info;
use std::sync::Arc;
use thiserror::Error;

pub const AUTH_STORAGE_KEY: &str = "auth-storage";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error("Auth state JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Persisted login of the current user.
pub struct AuthStore {
    state: AuthState,
    backend: Arc<dyn SnapshotStore>,
}

impl AuthStore {
    pub fn open(backend: Arc<dyn SnapshotStore>) -> Result<Self, AuthError> {
        let state = match backend.load(AUTH_STORAGE_KEY)? {
            Some(json) => serde_json::from_str(&json)?,
            None => AuthState::default(),
        };
        Ok(Self { state, backend })
    }

    pub fn in_memory() -> Self {
        Self {
            state: AuthState::default(),
            backend: Arc::new(MemorySnapshotStore::new()),
        }
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.state.user.as_ref()
    }

    /// Checks `credentials` against the server and keeps them only if the
    /// server accepts the login.
    pub async fn sign_in(
        &mut self,
        gateway: &dyn MessageGateway,
        credentials: Credentials
    ) -> Result<AssistantReply, AuthError> {
        let reply = gateway.login(&credentials).await?;
        self.login(credentials)?;
        Ok(reply)
    }

    pub fn login(&mut self, credentials: Credentials) -> Result<(), AuthError> {
        let email = credentials.email.clone();
        self.commit(AuthState { user: Some(credentials) })?;
        info!("Logged in as {}", email);
        Ok(())
    }

    pub fn logout(&mut self) -> Result<(), AuthError> {
        let previous = self.state.user.as_ref().map(|user| user.email.clone());
        self.commit(AuthState { user: None })?;
        if let Some(email) = previous {
            info!("Logged out {}", email);
        }
        Ok(())
    }

    fn commit(&mut self, next: AuthState) -> Result<(), AuthError> {
        let json = serde_json::to_string(&next)?;
        self.backend.save(AUTH_STORAGE_KEY, &json)?;
        self.state = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Gateway whose login either succeeds or fails with a status.
    struct LoginGateway {
        accept: bool,
    }

    #[async_trait]
    impl MessageGateway for LoginGateway {
        async fn send(
            &self,
            _content: &str,
            _credentials: Option<&Credentials>
        ) -> Result<AssistantReply, GatewayError> {
            unimplemented!()
        }

        async fn create_history(
            &self,
            _title: &str,
            _credentials: Option<&Credentials>
        ) -> Result<AssistantReply, GatewayError> {
            unimplemented!()
        }

        async fn login(&self, _credentials: &Credentials) -> Result<AssistantReply, GatewayError> {
            if self.accept {
                Ok(AssistantReply::from_body("welcome"))
            } else {
                Err(GatewayError::Status { status: 401, message: "bad credentials".into() })
            }
        }

        async fn register(&self, _credentials: &Credentials) -> Result<AssistantReply, GatewayError> {
            unimplemented!()
        }
    }

    #[test]
    fn login_and_logout_round_trip_through_backend() {
        let backend: Arc<dyn SnapshotStore> = Arc::new(MemorySnapshotStore::new());

        let mut store = AuthStore::open(backend.clone()).unwrap();
        assert!(store.credentials().is_none());
        store.login(Credentials::new("a@b.c", "pw")).unwrap();

        let reopened = AuthStore::open(backend.clone()).unwrap();
        assert_eq!(reopened.credentials().map(|c| c.email.as_str()), Some("a@b.c"));

        store.logout().unwrap();
        let reopened = AuthStore::open(backend).unwrap();
        assert!(reopened.credentials().is_none());
    }

    #[test]
    fn logout_without_user_is_harmless() {
        let mut store = AuthStore::in_memory();
        store.logout().unwrap();
        assert!(store.credentials().is_none());
    }

    #[tokio::test]
    async fn rejected_login_stores_nothing() {
        let backend: Arc<dyn SnapshotStore> = Arc::new(MemorySnapshotStore::new());
        let mut store = AuthStore::open(backend.clone()).unwrap();

        let err = store
            .sign_in(&LoginGateway { accept: false }, Credentials::new("a@b.c", "wrong")).await
            .unwrap_err();
        assert!(matches!(err, AuthError::Gateway(GatewayError::Status { status: 401, .. })));
        assert!(store.credentials().is_none());
        assert!(backend.load(AUTH_STORAGE_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn accepted_login_is_persisted() {
        let backend: Arc<dyn SnapshotStore> = Arc::new(MemorySnapshotStore::new());
        let mut store = AuthStore::open(backend.clone()).unwrap();

        let reply = store
            .sign_in(&LoginGateway { accept: true }, Credentials::new("a@b.c", "pw")).await
            .unwrap();
        assert_eq!(reply.into_content(), "welcome");
        assert_eq!(store.credentials().map(|c| c.email.as_str()), Some("a@b.c"));

        let reopened = AuthStore::open(backend).unwrap();
        assert_eq!(reopened.credentials().map(|c| c.password.as_str()), Some("pw"));
    }
}
