use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Row};
use std::time::Duration;

use super::{text_filter, AlbumStore};
use crate::database::manager::{is_foreign_key_violation, DatabaseError};
use crate::database::models::{Album, AlbumFilter};
use crate::database::with_timeout;
use crate::filter::{Filters, Metadata};

const COLUMNS: &str = "album_id, title, genre, tracks, group_id";

#[derive(Clone)]
pub struct AlbumRepository {
    pool: PgPool,
    timeout: Duration,
}

impl AlbumRepository {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// Shared list query. `group_id = None` lists across every group.
    async fn list(
        &self,
        group_id: Option<i64>,
        filter: &AlbumFilter,
        filters: &Filters,
    ) -> Result<(Vec<Album>, Metadata), DatabaseError> {
        let sql = format!(
            r#"
            SELECT count(*) OVER() AS total_records, {COLUMNS}
            FROM album
            WHERE (to_tsvector('simple', title) @@ plainto_tsquery('simple', $1) OR $1 IS NULL)
            AND (to_tsvector('simple', genre) @@ plainto_tsquery('simple', $2) OR $2 IS NULL)
            AND (tracks = $3 OR $3 IS NULL)
            AND (group_id = $4 OR $4 IS NULL)
            {}
            LIMIT $5 OFFSET $6
            "#,
            filters.order_by("album_id")?
        );

        let query = sqlx::query(&sql)
            .bind(text_filter(&filter.title))
            .bind(text_filter(&filter.genre))
            .bind(filter.tracks)
            .bind(group_id)
            .bind(filters.limit())
            .bind(filters.offset())
            .fetch_all(&self.pool);
        let rows = with_timeout(self.timeout, query).await?;

        let mut total = 0;
        let mut albums = Vec::with_capacity(rows.len());
        for row in &rows {
            total = row.try_get::<i64, _>("total_records")?;
            albums.push(Album::from_row(row)?);
        }

        Ok((albums, Metadata::calculate(total, filters.page, filters.page_size)))
    }
}

fn map_write_error(err: DatabaseError) -> DatabaseError {
    match err {
        DatabaseError::Sqlx(ref e) if is_foreign_key_violation(e) => {
            DatabaseError::MissingReference("groupId")
        }
        other => other,
    }
}

#[async_trait]
impl AlbumStore for AlbumRepository {
    #[tracing::instrument(skip(self, album), fields(title = %album.title, group_id = album.group_id))]
    async fn insert(&self, album: &mut Album) -> Result<(), DatabaseError> {
        let query = sqlx::query_scalar::<_, i64>(
            "INSERT INTO album (title, genre, tracks, group_id) VALUES ($1, $2, $3, $4) RETURNING album_id",
        )
        .bind(&album.title)
        .bind(&album.genre)
        .bind(album.tracks)
        .bind(album.group_id)
        .fetch_one(&self.pool);

        album.id = with_timeout(self.timeout, query).await.map_err(map_write_error)?;
        Ok(())
    }

    async fn get(&self, id: i64) -> Result<Album, DatabaseError> {
        if id < 1 {
            return Err(DatabaseError::NotFound);
        }

        let sql = format!("SELECT {COLUMNS} FROM album WHERE album_id = $1");
        let query = sqlx::query_as::<_, Album>(&sql).bind(id).fetch_optional(&self.pool);

        with_timeout(self.timeout, query)
            .await?
            .ok_or(DatabaseError::NotFound)
    }

    #[tracing::instrument(skip(self, album), fields(id = album.id))]
    async fn update(&self, album: &mut Album) -> Result<(), DatabaseError> {
        let sql = format!(
            r#"
            UPDATE album SET title = $1, genre = $2, tracks = $3, group_id = $4
            WHERE album_id = $5
            RETURNING {COLUMNS}
            "#
        );
        let query = sqlx::query_as::<_, Album>(&sql)
            .bind(&album.title)
            .bind(&album.genre)
            .bind(album.tracks)
            .bind(album.group_id)
            .bind(album.id)
            .fetch_optional(&self.pool);

        *album = with_timeout(self.timeout, query)
            .await
            .map_err(map_write_error)?
            .ok_or(DatabaseError::NotFound)?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), DatabaseError> {
        if id < 1 {
            return Err(DatabaseError::NotFound);
        }

        let query = sqlx::query("DELETE FROM album WHERE album_id = $1")
            .bind(id)
            .execute(&self.pool);

        if with_timeout(self.timeout, query).await?.rows_affected() == 0 {
            return Err(DatabaseError::NotFound);
        }
        Ok(())
    }

    async fn get_all(
        &self,
        filter: &AlbumFilter,
        filters: &Filters,
    ) -> Result<(Vec<Album>, Metadata), DatabaseError> {
        self.list(None, filter, filters).await
    }

    async fn get_all_by_group(
        &self,
        group_id: i64,
        filter: &AlbumFilter,
        filters: &Filters,
    ) -> Result<(Vec<Album>, Metadata), DatabaseError> {
        self.list(Some(group_id), filter, filters).await
    }
}
