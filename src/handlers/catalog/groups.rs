// handlers/catalog/groups.rs - /v1/groups handlers

use axum::extract::{Extension, Path, Query, State};
use serde::Deserialize;
use serde_json::{json, Value};

use super::albums::read_album_filter;
use crate::database::models::{validate_group, Group, GroupFilter, ALBUM_SORT_SAFELIST, GROUP_SORT_SAFELIST};
use crate::error::ApiError;
use crate::filter::validate_filters;
use crate::handlers::extract::{
    read_filters, read_id_param, read_optional_int, read_optional_string, JsonBody, QueryString,
};
use crate::middleware::{message, require_permission, ApiResponse, ApiResult, CurrentUser};
use crate::state::AppState;
use crate::validator::Validator;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub num_of_members: i32,
}

/// GET /v1/groups
pub async fn list_groups(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(qs): Query<QueryString>,
) -> ApiResult<Value> {
    require_permission(&state, &current, "read").await?;

    let mut v = Validator::new();
    let filter = GroupFilter {
        name: read_optional_string(&qs, "name"),
        num_of_members: read_optional_int(&qs, "num_of_members", &mut v),
    };
    let filters = read_filters(
        &qs,
        &mut v,
        state.config.api.default_page_size,
        "group_id",
        GROUP_SORT_SAFELIST,
    );
    validate_filters(&mut v, &filters);
    v.finish().map_err(ApiError::failed_validation)?;

    let (groups, metadata) = state.models.groups.get_all(&filter, &filters).await?;
    Ok(ApiResponse::success(json!({ "groups": groups, "metadata": metadata })))
}

/// POST /v1/groups
pub async fn create_group(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    JsonBody(input): JsonBody<GroupInput>,
) -> ApiResult<Value> {
    require_permission(&state, &current, "read").await?;

    let mut group = Group {
        id: 0,
        name: input.name,
        num_of_members: input.num_of_members,
    };

    let mut v = Validator::new();
    validate_group(&mut v, &group);
    v.finish().map_err(ApiError::failed_validation)?;

    state.models.groups.insert(&mut group).await?;
    tracing::info!(id = group.id, "group created");

    let location = format!("/v1/groups/{}", group.id);
    Ok(ApiResponse::created(json!({ "group": group })).with_location(location))
}

/// GET /v1/groups/:id
pub async fn show_group(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    require_permission(&state, &current, "read").await?;
    let id = read_id_param(&id)?;

    let group = state.models.groups.get(id).await?;
    Ok(ApiResponse::success(json!({ "group": group })))
}

/// PUT /v1/groups/:id
pub async fn update_group(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<GroupInput>,
) -> ApiResult<Value> {
    require_permission(&state, &current, "read").await?;
    let id = read_id_param(&id)?;

    let mut group = state.models.groups.get(id).await?;
    group.name = input.name;
    group.num_of_members = input.num_of_members;

    let mut v = Validator::new();
    validate_group(&mut v, &group);
    v.finish().map_err(ApiError::failed_validation)?;

    state.models.groups.update(&mut group).await?;
    Ok(ApiResponse::success(json!({ "group": group })))
}

/// DELETE /v1/groups/:id
pub async fn delete_group(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    require_permission(&state, &current, "write").await?;
    let id = read_id_param(&id)?;

    state.models.groups.delete(id).await?;
    tracing::info!(id, "group deleted");
    Ok(message("group successfully deleted"))
}

/// GET /v1/groups/:id/albums
pub async fn list_group_albums(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    Query(qs): Query<QueryString>,
) -> ApiResult<Value> {
    require_permission(&state, &current, "read").await?;
    let id = read_id_param(&id)?;

    let mut v = Validator::new();
    let filter = read_album_filter(&qs, &mut v);
    let filters = read_filters(
        &qs,
        &mut v,
        state.config.api.default_page_size,
        "album_id",
        ALBUM_SORT_SAFELIST,
    );
    validate_filters(&mut v, &filters);
    v.finish().map_err(ApiError::failed_validation)?;

    // Distinguish "no such group" from "group without albums".
    state.models.groups.get(id).await?;

    let (albums, metadata) = state.models.albums.get_all_by_group(id, &filter, &filters).await?;
    Ok(ApiResponse::success(json!({ "albums": albums, "metadata": metadata })))
}
