use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::validator::Validator;

pub const SONG_SORT_SAFELIST: &[&str] = &["song_id", "title", "length", "-song_id", "-title", "-length"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Song {
    #[sqlx(rename = "song_id")]
    pub id: i64,
    pub title: String,
    /// Seconds.
    pub length: i32,
    #[serde(rename = "albumId")]
    pub album_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SongFilter {
    pub title: Option<String>,
    pub length: Option<i32>,
}

pub fn validate_song(v: &mut Validator, song: &Song) {
    v.check(!song.title.is_empty(), "title", "must be provided");
    v.check(song.album_id != 0, "albumId", "must be greater than 0");
}
