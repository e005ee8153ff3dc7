// handlers/public/tokens.rs - POST /v1/tokens/login handler

use axum::extract::State;
use chrono::Duration;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::verify_password;
use crate::database::models::{validate_email, validate_password_plaintext, Scope};
use crate::database::DatabaseError;
use crate::error::ApiError;
use crate::handlers::extract::JsonBody;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;
use crate::validator::Validator;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginInput {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// POST /v1/tokens/login - exchange credentials for a bearer token
pub async fn create_authentication_token(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<LoginInput>,
) -> ApiResult<Value> {
    let mut v = Validator::new();
    validate_email(&mut v, &input.email);
    validate_password_plaintext(&mut v, &input.password);
    v.finish().map_err(ApiError::failed_validation)?;

    let user = match state.models.users.get_by_email(&input.email).await {
        Ok(user) => user,
        Err(DatabaseError::NotFound) => {
            tracing::warn!("Login attempt for unknown email");
            return Err(ApiError::invalid_credentials());
        }
        Err(err) => return Err(err.into()),
    };

    let hash = user.password_hash.clone();
    let password = input.password;
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| {
            tracing::error!("Password verification task failed: {}", e);
            ApiError::server_error()
        })??;

    if !matches {
        tracing::warn!(user_id = user.id, "Login attempt with wrong password");
        return Err(ApiError::invalid_credentials());
    }

    let ttl = Duration::hours(state.config.security.authentication_token_ttl_hours);
    let token = state
        .models
        .tokens
        .new_token(user.id, ttl, Scope::Authentication)
        .await?;
    tracing::info!(user_id = user.id, "authentication token issued");

    Ok(ApiResponse::created(json!({ "authentication_token": token })))
}
