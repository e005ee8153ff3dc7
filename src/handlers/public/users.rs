// handlers/public/users.rs - account registration and activation

use axum::extract::State;
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{hash_password, validate_token_plaintext};
use crate::database::models::{validate_user, Scope, User};
use crate::database::DatabaseError;
use crate::error::ApiError;
use crate::handlers::extract::JsonBody;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;
use crate::validator::Validator;

/// Granted to every new account.
const DEFAULT_PERMISSION: &str = "read";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActivateInput {
    #[serde(default)]
    pub token: String,
}

/// POST /v1/users
///
/// Creates an inactive account with the `read` permission and issues an
/// activation token. Delivering that token is out of band; development
/// builds echo it in the response.
pub async fn register_user(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<RegisterInput>,
) -> ApiResult<Value> {
    let mut v = Validator::new();
    validate_user(&mut v, &input.name, &input.email, &input.password);
    v.finish().map_err(ApiError::failed_validation)?;

    let password = input.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| {
            tracing::error!("Password hashing task failed: {}", e);
            ApiError::server_error()
        })??;

    let mut user = User {
        id: 0,
        created_at: Utc::now(),
        name: input.name,
        email: input.email,
        password_hash,
        activated: false,
        version: 0,
    };

    let ttl = Duration::hours(state.config.security.activation_token_ttl_hours);
    let token = state
        .models
        .users
        .register(&mut user, &[DEFAULT_PERMISSION.to_string()], ttl)
        .await?;
    tracing::info!(user_id = user.id, "user registered");

    let body = if state.config.security.expose_activation_tokens {
        json!({ "user": user, "activation_token": token })
    } else {
        json!({ "user": user })
    };
    Ok(ApiResponse::accepted(body))
}

/// PUT /v1/users/activated
pub async fn activate_user(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<ActivateInput>,
) -> ApiResult<Value> {
    let mut v = Validator::new();
    validate_token_plaintext(&mut v, &input.token);
    v.finish().map_err(ApiError::failed_validation)?;

    let mut user = match state.models.users.get_for_token(Scope::Activation, &input.token).await {
        Ok(user) => user,
        Err(DatabaseError::NotFound) => {
            return Err(ApiError::field("token", "invalid or expired activation token"));
        }
        Err(err) => return Err(err.into()),
    };

    user.activated = true;
    state.models.users.update(&mut user).await?;
    state
        .models
        .tokens
        .delete_all_for_user(Scope::Activation, user.id)
        .await?;
    tracing::info!(user_id = user.id, "user activated");

    Ok(ApiResponse::success(json!({ "user": user })))
}
