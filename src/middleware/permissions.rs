//! Guards run at the top of protected handlers, in this order:
//! authenticated, activated, then holds the permission code.

use crate::database::models::User;
use crate::error::ApiError;
use crate::state::AppState;

use super::auth::CurrentUser;

pub fn require_authenticated(current: &CurrentUser) -> Result<&User, ApiError> {
    match current {
        CurrentUser::Anonymous => Err(ApiError::authentication_required()),
        CurrentUser::Authenticated(user) => Ok(user),
    }
}

pub fn require_activated(current: &CurrentUser) -> Result<&User, ApiError> {
    let user = require_authenticated(current)?;
    if !user.activated {
        return Err(ApiError::inactive_account());
    }
    Ok(user)
}

pub async fn require_permission<'a>(
    state: &AppState,
    current: &'a CurrentUser,
    code: &str,
) -> Result<&'a User, ApiError> {
    let user = require_activated(current)?;

    let permissions = state.models.permissions.get_all_for_user(user.id).await?;
    if !permissions.include(code) {
        tracing::warn!(user_id = user.id, permission = code, "Permission denied");
        return Err(ApiError::not_permitted());
    }
    Ok(user)
}
