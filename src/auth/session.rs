use std::sync::Arc;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde_json::json;
use tokio::sync::{Mutex, RwLock};

use crate::api::envelope::{decode, expect_success};
use crate::api::transport::{ApiRequest, HttpTransport};
use crate::error::{DeskError, Result};
use crate::model::session::{Session, TokenGrant};
use crate::model::User;
use crate::notify::Notifier;

/// Told when the session is destroyed, by logout or by a failed refresh.
#[async_trait]
pub trait SessionListener: Send + Sync {
    async fn on_logout(&self);
}

#[derive(Debug, Default)]
struct SessionState {
    session: Option<Arc<Session>>,
    /// Bumped on every login, refresh and logout. Lets a caller tell whether
    /// the token it used is still the current one.
    generation: u64,
}

/// Owner of the one piece of shared mutable state in the client: the token
/// pair. Reads go through snapshots; writes happen only in login, refresh
/// and logout.
pub struct SessionManager {
    transport: Arc<dyn HttpTransport>,
    state: RwLock<SessionState>,
    refresh_lock: Mutex<()>,
    listeners: Vec<Arc<dyn SessionListener>>,
    notifier: Notifier,
}

impl SessionManager {
    pub fn new(transport: Arc<dyn HttpTransport>, notifier: Notifier) -> Self {
        Self {
            transport,
            state: RwLock::new(SessionState::default()),
            refresh_lock: Mutex::new(()),
            listeners: Vec::new(),
            notifier,
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn SessionListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Exchange credentials for a token pair.
    pub async fn login(&self, username: &str, password: &str) -> Result<User> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(DeskError::Validation(
                "username and password are required".to_string(),
            ));
        }
        let request = ApiRequest::post("/auth/login")
            .public()
            .with_json(json!({ "username": username, "password": password }));
        let grant: TokenGrant = decode(self.transport.send(&request, None).await?)?;
        let session = Session::from(grant);
        let user = session.user.clone();

        let mut state = self.state.write().await;
        state.session = Some(Arc::new(session));
        state.generation += 1;
        tracing::info!(user_id = user.id, department_id = ?user.department_id, "Logged in");
        Ok(user)
    }

    /// Tell the server (best effort) and destroy the local session.
    pub async fn logout(&self) {
        let bearer = self.bearer().await;
        if let Some((token, _)) = bearer {
            let request = ApiRequest::post("/auth/logout");
            match self.transport.send(&request, Some(&token)).await {
                Ok(response) => {
                    if let Err(e) = expect_success(response) {
                        tracing::debug!(error = %e, "Server rejected logout");
                    }
                }
                Err(e) => tracing::debug!(error = %e, "Logout request failed"),
            }
        }
        self.destroy().await;
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.session.is_some()
    }

    pub async fn current_user(&self) -> Option<User> {
        self.state
            .read()
            .await
            .session
            .as_ref()
            .map(|s| s.user.clone())
    }

    pub async fn department_id(&self) -> Option<u64> {
        self.state
            .read()
            .await
            .session
            .as_ref()
            .and_then(|s| s.user.department_id)
    }

    /// Current access token and the generation it belongs to.
    pub async fn bearer(&self) -> Option<(String, u64)> {
        let state = self.state.read().await;
        state
            .session
            .as_ref()
            .map(|s| (s.access_token.expose_secret().to_string(), state.generation))
    }

    /// Obtain a token newer than `seen_generation`.
    ///
    /// Only one refresh runs at a time. A caller that waited behind another
    /// refresh finds the generation already advanced and gets the new token
    /// without a second call. A failed refresh destroys the session, so every
    /// waiter behind it fails with [`DeskError::Auth`].
    pub async fn refresh_after(&self, seen_generation: u64) -> Result<String> {
        let _guard = self.refresh_lock.lock().await;

        let refresh_token = {
            let state = self.state.read().await;
            match state.session {
                None => return Err(DeskError::Auth("session has ended".to_string())),
                Some(ref session) if state.generation != seen_generation => {
                    tracing::debug!(generation = state.generation, "Reusing refreshed token");
                    return Ok(session.access_token.expose_secret().to_string());
                }
                Some(ref session) => session.refresh_token.expose_secret().to_string(),
            }
        };

        tracing::info!(generation = seen_generation, "Refreshing access token");
        match self.call_refresh(&refresh_token).await {
            Ok(session) => {
                let token = session.access_token.expose_secret().to_string();
                let mut state = self.state.write().await;
                state.session = Some(Arc::new(session));
                state.generation += 1;
                Ok(token)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed, ending session");
                self.destroy().await;
                self.notifier
                    .warning("Your session has expired. Please log in again.");
                Err(DeskError::Auth(format!("token refresh failed: {}", e)))
            }
        }
    }

    async fn call_refresh(&self, refresh_token: &str) -> Result<Session> {
        let request = ApiRequest::post("/auth/refresh")
            .public()
            .with_json(json!({ "refreshToken": refresh_token }));
        let grant: TokenGrant = decode(self.transport.send(&request, None).await?)?;
        Ok(Session::from(grant))
    }

    async fn destroy(&self) {
        let had_session = {
            let mut state = self.state.write().await;
            state.generation += 1;
            state.session.take().is_some()
        };
        if had_session {
            tracing::info!("Session destroyed");
        }
        for listener in &self.listeners {
            listener.on_logout().await;
        }
    }
}
