use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::validate_token_plaintext;
use crate::database::models::{Scope, User};
use crate::database::DatabaseError;
use crate::error::ApiError;
use crate::state::AppState;
use crate::validator::Validator;

/// Identity attached to every request by [`authenticate`].
#[derive(Clone, Debug)]
pub enum CurrentUser {
    Anonymous,
    Authenticated(User),
}

impl CurrentUser {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, CurrentUser::Anonymous)
    }
}

/// Resolves the bearer token, if any, into a [`CurrentUser`] extension.
///
/// A missing header is not an error; it yields `Anonymous` and leaves the
/// decision to the handler's guards. Every response varies on `Authorization`.
pub async fn authenticate(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let mut response = match resolve_user(&state, request.headers()).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    };

    response
        .headers_mut()
        .append(header::VARY, HeaderValue::from_static("Authorization"));
    response
}

async fn resolve_user(state: &AppState, headers: &HeaderMap) -> Result<CurrentUser, ApiError> {
    let Some(auth_header) = headers.get(header::AUTHORIZATION) else {
        return Ok(CurrentUser::Anonymous);
    };

    let token = extract_bearer(auth_header).ok_or_else(|| {
        tracing::warn!("Rejected malformed Authorization header");
        ApiError::invalid_authentication_token()
    })?;

    let mut v = Validator::new();
    validate_token_plaintext(&mut v, token);
    if !v.valid() {
        tracing::warn!("Rejected bearer token with invalid format");
        return Err(ApiError::invalid_authentication_token());
    }

    match state.models.users.get_for_token(Scope::Authentication, token).await {
        Ok(user) => Ok(CurrentUser::Authenticated(user)),
        Err(DatabaseError::NotFound) => {
            tracing::warn!("Rejected unknown or expired bearer token");
            Err(ApiError::invalid_authentication_token())
        }
        Err(err) => Err(err.into()),
    }
}

/// `Bearer <token>` with exactly one space and nothing else.
fn extract_bearer(value: &HeaderValue) -> Option<&str> {
    let value = value.to_str().ok()?;
    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) => Some(token),
        _ => None,
    }
}
