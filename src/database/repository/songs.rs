use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Row};
use std::time::Duration;

use super::{text_filter, SongStore};
use crate::database::manager::{is_foreign_key_violation, DatabaseError};
use crate::database::models::{Song, SongFilter};
use crate::database::with_timeout;
use crate::filter::{Filters, Metadata};

#[derive(Clone)]
pub struct SongRepository {
    pool: PgPool,
    timeout: Duration,
}

impl SongRepository {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    async fn list(
        &self,
        album_id: Option<i64>,
        filter: &SongFilter,
        filters: &Filters,
    ) -> Result<(Vec<Song>, Metadata), DatabaseError> {
        let sql = format!(
            r#"
            SELECT count(*) OVER() AS total_records, song_id, title, length, album_id
            FROM songs
            WHERE (to_tsvector('simple', title) @@ plainto_tsquery('simple', $1) OR $1 IS NULL)
            AND (length = $2 OR $2 IS NULL)
            AND (album_id = $3 OR $3 IS NULL)
            {}
            LIMIT $4 OFFSET $5
            "#,
            filters.order_by("song_id")?
        );

        let query = sqlx::query(&sql)
            .bind(text_filter(&filter.title))
            .bind(filter.length)
            .bind(album_id)
            .bind(filters.limit())
            .bind(filters.offset())
            .fetch_all(&self.pool);
        let rows = with_timeout(self.timeout, query).await?;

        let mut total = 0;
        let mut songs = Vec::with_capacity(rows.len());
        for row in &rows {
            total = row.try_get::<i64, _>("total_records")?;
            songs.push(Song::from_row(row)?);
        }

        Ok((songs, Metadata::calculate(total, filters.page, filters.page_size)))
    }
}

fn map_write_error(err: DatabaseError) -> DatabaseError {
    match err {
        DatabaseError::Sqlx(ref e) if is_foreign_key_violation(e) => {
            DatabaseError::MissingReference("albumId")
        }
        other => other,
    }
}

#[async_trait]
impl SongStore for SongRepository {
    #[tracing::instrument(skip(self, song), fields(title = %song.title, album_id = song.album_id))]
    async fn insert(&self, song: &mut Song) -> Result<(), DatabaseError> {
        let query = sqlx::query_scalar::<_, i64>(
            "INSERT INTO songs (title, length, album_id) VALUES ($1, $2, $3) RETURNING song_id",
        )
        .bind(&song.title)
        .bind(song.length)
        .bind(song.album_id)
        .fetch_one(&self.pool);

        song.id = with_timeout(self.timeout, query).await.map_err(map_write_error)?;
        Ok(())
    }

    async fn get(&self, id: i64) -> Result<Song, DatabaseError> {
        if id < 1 {
            return Err(DatabaseError::NotFound);
        }

        let query = sqlx::query_as::<_, Song>(
            "SELECT song_id, title, length, album_id FROM songs WHERE song_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool);

        with_timeout(self.timeout, query)
            .await?
            .ok_or(DatabaseError::NotFound)
    }

    #[tracing::instrument(skip(self, song), fields(id = song.id))]
    async fn update(&self, song: &mut Song) -> Result<(), DatabaseError> {
        let query = sqlx::query_as::<_, Song>(
            r#"
            UPDATE songs SET title = $1, length = $2, album_id = $3
            WHERE song_id = $4
            RETURNING song_id, title, length, album_id
            "#,
        )
        .bind(&song.title)
        .bind(song.length)
        .bind(song.album_id)
        .bind(song.id)
        .fetch_optional(&self.pool);

        *song = with_timeout(self.timeout, query)
            .await
            .map_err(map_write_error)?
            .ok_or(DatabaseError::NotFound)?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), DatabaseError> {
        if id < 1 {
            return Err(DatabaseError::NotFound);
        }

        let query = sqlx::query("DELETE FROM songs WHERE song_id = $1")
            .bind(id)
            .execute(&self.pool);

        if with_timeout(self.timeout, query).await?.rows_affected() == 0 {
            return Err(DatabaseError::NotFound);
        }
        Ok(())
    }

    async fn get_all(
        &self,
        filter: &SongFilter,
        filters: &Filters,
    ) -> Result<(Vec<Song>, Metadata), DatabaseError> {
        self.list(None, filter, filters).await
    }

    async fn get_all_by_album(
        &self,
        album_id: i64,
        filter: &SongFilter,
        filters: &Filters,
    ) -> Result<(Vec<Song>, Metadata), DatabaseError> {
        self.list(Some(album_id), filter, filters).await
    }
}
