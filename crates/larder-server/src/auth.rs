//! Bearer-token authentication.
//!
//! Handlers receive the acting account as an explicit [`CurrentUser`]
//! argument resolved from the `Authorization` header; there is no ambient
//! "current user" state anywhere below this point.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use larder_store::User;

use crate::api::AppState;
use crate::error::ServerError;

/// The authenticated requester.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        let token = auth.strip_prefix("Bearer ").unwrap_or("");
        if token.is_empty() {
            return Err(ServerError::Auth);
        }

        let user = state.db()?.user_for_token(token)?;
        Ok(CurrentUser(user))
    }
}
