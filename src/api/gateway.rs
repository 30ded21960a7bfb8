use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::api::envelope::{decode, expect_success};
use crate::api::transport::{ApiRequest, ApiResponse, HttpTransport};
use crate::auth::SessionManager;
use crate::error::{DeskError, Result};

/// Every REST call goes through here. Attaches the bearer token and recovers
/// from a 401 with one refresh and one retry.
pub struct ApiGateway {
    transport: Arc<dyn HttpTransport>,
    sessions: Arc<SessionManager>,
}

impl ApiGateway {
    pub fn new(transport: Arc<dyn HttpTransport>, sessions: Arc<SessionManager>) -> Self {
        Self {
            transport,
            sessions,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Send `request`, refreshing the session once if the server answers 401.
    ///
    /// Concurrent 401s share a single refresh (see
    /// [`SessionManager::refresh_after`]). Authenticated requests are not
    /// sent at all while logged out.
    pub async fn request(&self, request: ApiRequest) -> Result<ApiResponse> {
        if !request.authenticated {
            return self.transport.send(&request, None).await;
        }

        let (token, generation) = self
            .sessions
            .bearer()
            .await
            .ok_or_else(|| DeskError::Auth("not logged in".to_string()))?;

        let response = self.transport.send(&request, Some(&token)).await?;
        if !response.is_unauthorized() {
            return Ok(response);
        }

        tracing::debug!(method = %request.method, path = %request.path, "Unauthorized, refreshing session");
        let fresh = self.sessions.refresh_after(generation).await?;

        let retried = self.transport.send(&request, Some(&fresh)).await?;
        if retried.is_unauthorized() {
            tracing::warn!(method = %request.method, path = %request.path, "Still unauthorized after refresh");
            return Err(DeskError::Auth(
                "request rejected after token refresh".to_string(),
            ));
        }
        Ok(retried)
    }

    pub async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        decode(self.request(request).await?)
    }

    pub async fn execute(&self, request: ApiRequest) -> Result<()> {
        expect_success(self.request(request).await?)
    }
}
