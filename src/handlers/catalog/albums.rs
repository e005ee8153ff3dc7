// handlers/catalog/albums.rs - /v1/albums handlers

use axum::extract::{Extension, Path, Query, State};
use serde::Deserialize;
use serde_json::{json, Value};

use super::songs::read_song_filter;
use crate::database::models::{validate_album, Album, AlbumFilter, ALBUM_SORT_SAFELIST, SONG_SORT_SAFELIST};
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
pub struct AlbumInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub tracks: i32,
    #[serde(default, rename = "groupId")]
    pub group_id: i64,
}

pub(crate) fn read_album_filter(qs: &QueryString, v: &mut Validator) -> AlbumFilter {
    AlbumFilter {
        title: read_optional_string(qs, "title"),
        genre: read_optional_string(qs, "genre"),
        tracks: read_optional_int(qs, "tracks", v),
    }
}

/// GET /v1/albums
pub async fn list_albums(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(qs): Query<QueryString>,
) -> ApiResult<Value> {
    require_permission(&state, &current, "read").await?;

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

    let (albums, metadata) = state.models.albums.get_all(&filter, &filters).await?;
    Ok(ApiResponse::success(json!({ "albums": albums, "metadata": metadata })))
}

/// POST /v1/albums
pub async fn create_album(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    JsonBody(input): JsonBody<AlbumInput>,
) -> ApiResult<Value> {
    require_permission(&state, &current, "read").await?;

    let mut album = Album {
        id: 0,
        title: input.title,
        genre: input.genre,
        tracks: input.tracks,
        group_id: input.group_id,
    };

    let mut v = Validator::new();
    validate_album(&mut v, &album);
    v.finish().map_err(ApiError::failed_validation)?;

    state.models.albums.insert(&mut album).await?;
    tracing::info!(id = album.id, group_id = album.group_id, "album created");

    let location = format!("/v1/albums/{}", album.id);
    Ok(ApiResponse::created(json!({ "album": album })).with_location(location))
}

/// GET /v1/albums/:id
pub async fn show_album(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    require_permission(&state, &current, "read").await?;
    let id = read_id_param(&id)?;

    let album = state.models.albums.get(id).await?;
    Ok(ApiResponse::success(json!({ "album": album })))
}

/// PUT /v1/albums/:id
pub async fn update_album(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<AlbumInput>,
) -> ApiResult<Value> {
    require_permission(&state, &current, "read").await?;
    let id = read_id_param(&id)?;

    let mut album = state.models.albums.get(id).await?;
    album.title = input.title;
    album.genre = input.genre;
    album.tracks = input.tracks;
    album.group_id = input.group_id;

    let mut v = Validator::new();
    validate_album(&mut v, &album);
    v.finish().map_err(ApiError::failed_validation)?;

    state.models.albums.update(&mut album).await?;
    Ok(ApiResponse::success(json!({ "album": album })))
}

/// DELETE /v1/albums/:id
pub async fn delete_album(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    require_permission(&state, &current, "write").await?;
    let id = read_id_param(&id)?;

    state.models.albums.delete(id).await?;
    tracing::info!(id, "album deleted");
    Ok(message("album successfully deleted"))
}

/// GET /v1/albums/:id/songs
pub async fn list_album_songs(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    Query(qs): Query<QueryString>,
) -> ApiResult<Value> {
    require_permission(&state, &current, "read").await?;
    let id = read_id_param(&id)?;

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

    state.models.albums.get(id).await?;

    let (songs, metadata) = state.models.songs.get_all_by_album(id, &filter, &filters).await?;
    Ok(ApiResponse::success(json!({ "songs": songs, "metadata": metadata })))
}
