//! Request gateway: authenticate, then dispatch.

use crate::ActionRouter;
use caller_auth::{AuthRequest, CallerAuthenticator};
use gatehouse_protocol_types::{ApiRequest, ApiResponse};
use tracing::{debug, info, warn};

/// Entry point for every inbound API request.
pub struct ApiGateway {
    authenticator: CallerAuthenticator,
    router: ActionRouter,
}

impl ApiGateway {
    pub fn new(authenticator: CallerAuthenticator, router: ActionRouter) -> Self {
        Self {
            authenticator,
            router,
        }
    }

    /// Handle a request. `peer_uid` is the caller uid reported by the
    /// transport, if it knows one; it always wins over identities written
    /// into the request.
    pub fn handle(&self, request: &ApiRequest, peer_uid: Option<i64>) -> ApiResponse {
        let auth = AuthRequest {
            action: &request.action,
            caller_package: request.caller_package.as_deref(),
            peer_uid,
            caller_id: request.caller_id.as_ref(),
        };

        match self.authenticator.verify(&auth) {
            Ok(path) => debug!(id = %request.id, ?path, "caller authenticated"),
            Err(e) => {
                warn!(id = %request.id, action = %request.action, error = %e, "caller rejected");
                return ApiResponse::failure(&request.id, e.to_string());
            }
        }

        match self
            .router
            .dispatch(&request.action, request.payload.as_deref())
        {
            Ok(()) => {
                info!(id = %request.id, action = %request.action, "request handled");
                ApiResponse::success(&request.id)
            }
            Err(e) => {
                info!(id = %request.id, action = %request.action, error = %e, "request failed");
                ApiResponse::failure(&request.id, e.to_string())
            }
        }
    }
}
