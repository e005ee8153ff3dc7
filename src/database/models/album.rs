use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::validator::Validator;

pub const ALBUM_SORT_SAFELIST: &[&str] = &[
    "album_id",
    "title",
    "genre",
    "tracks",
    "-album_id",
    "-title",
    "-genre",
    "-tracks",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Album {
    #[sqlx(rename = "album_id")]
    pub id: i64,
    pub title: String,
    pub genre: String,
    pub tracks: i32,
    #[serde(rename = "groupId")]
    pub group_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlbumFilter {
    pub title: Option<String>,
    pub genre: Option<String>,
    pub tracks: Option<i32>,
}

pub fn validate_album(v: &mut Validator, album: &Album) {
    v.check(!album.title.is_empty(), "title", "must be provided");
    v.check(!album.genre.is_empty(), "genre", "must be provided");
    v.check(album.tracks != 0, "tracks", "must be greater than 0");
    v.check(album.group_id != 0, "groupId", "must be greater than 0");
}
