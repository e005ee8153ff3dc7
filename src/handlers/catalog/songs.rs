// handlers/catalog/songs.rs - /v1/songs handlers

use axum::extract::{Extension, Path, Query, State};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::models::{validate_song, Song, SongFilter, SONG_SORT_SAFELIST};
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
pub struct SongInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub length: i32,
    #[serde(default, rename = "albumId")]
    pub album_id: i64,
}

pub(crate) fn read_song_filter(qs: &QueryString, v: &mut Validator) -> SongFilter {
    SongFilter {
        title: read_optional_string(qs, "title"),
        length: read_optional_int(qs, "length", v),
    }
}

/// GET /v1/songs
pub async fn list_songs(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(qs): Query<QueryString>,
) -> ApiResult<Value> {
    require_permission(&state, &current, "read").await?;

    let mut v = Validator::new();
    let filter = read_song_filter(&qs, &mut v);
    let filters = read_filters(
        &qs,
        &mut v,
        state.config.api.default_page_size,
        "song_id",
        SONG_SORT_SAFELIST,
    );
    validate_filters(&mut v, &filters);
    v.finish().map_err(ApiError::failed_validation)?;

    let (songs, metadata) = state.models.songs.get_all(&filter, &filters).await?;
    Ok(ApiResponse::success(json!({ "songs": songs, "metadata": metadata })))
}

/// POST /v1/songs
pub async fn create_song(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    JsonBody(input): JsonBody<SongInput>,
) -> ApiResult<Value> {
    require_permission(&state, &current, "read").await?;

    let mut song = Song {
        id: 0,
        title: input.title,
        length: input.length,
        album_id: input.album_id,
    };

    let mut v = Validator::new();
    validate_song(&mut v, &song);
    v.finish().map_err(ApiError::failed_validation)?;

    state.models.songs.insert(&mut song).await?;
    tracing::info!(id = song.id, album_id = song.album_id, "song created");

    let location = format!("/v1/songs/{}", song.id);
    Ok(ApiResponse::created(json!({ "song": song })).with_location(location))
}

/// GET /v1/songs/:id
pub async fn show_song(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    require_permission(&state, &current, "read").await?;
    let id = read_id_param(&id)?;

    let song = state.models.songs.get(id).await?;
    Ok(ApiResponse::success(json!({ "song": song })))
}

/// PUT /v1/songs/:id
pub async fn update_song(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<SongInput>,
) -> ApiResult<Value> {
    require_permission(&state, &current, "read").await?;
    let id = read_id_param(&id)?;

    let mut song = state.models.songs.get(id).await?;
    song.title = input.title;
    song.length = input.length;
    song.album_id = input.album_id;

    let mut v = Validator::new();
    validate_song(&mut v, &song);
    v.finish().map_err(ApiError::failed_validation)?;

    state.models.songs.update(&mut song).await?;
    Ok(ApiResponse::success(json!({ "song": song })))
}

/// DELETE /v1/songs/:id
pub async fn delete_song(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    require_permission(&state, &current, "write").await?;
    let id = read_id_param(&id)?;

    state.models.songs.delete(id).await?;
    tracing::info!(id, "song deleted");
    Ok(message("song successfully deleted"))
}
