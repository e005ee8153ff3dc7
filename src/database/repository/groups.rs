use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Row};
use std::time::Duration;

use super::{text_filter, GroupStore};
use crate::database::manager::DatabaseError;
use crate::database::models::{Group, GroupFilter};
use crate::database::with_timeout;
use crate::filter::{Filters, Metadata};

#[derive(Clone)]
pub struct GroupRepository {
    pool: PgPool,
    timeout: Duration,
}

impl GroupRepository {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[async_trait]
impl GroupStore for GroupRepository {
    #[tracing::instrument(skip(self, group), fields(name = %group.name))]
    async fn insert(&self, group: &mut Group) -> Result<(), DatabaseError> {
        let query = sqlx::query_scalar::<_, i64>(
            "INSERT INTO groups (name, num_of_members) VALUES ($1, $2) RETURNING group_id",
        )
        .bind(&group.name)
        .bind(group.num_of_members)
        .fetch_one(&self.pool);

        group.id = with_timeout(self.timeout, query).await?;
        Ok(())
    }

    async fn get(&self, id: i64) -> Result<Group, DatabaseError> {
        if id < 1 {
            return Err(DatabaseError::NotFound);
        }

        let query = sqlx::query_as::<_, Group>(
            "SELECT group_id, name, num_of_members FROM groups WHERE group_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool);

        with_timeout(self.timeout, query)
            .await?
            .ok_or(DatabaseError::NotFound)
    }

    #[tracing::instrument(skip(self, group), fields(id = group.id))]
    async fn update(&self, group: &mut Group) -> Result<(), DatabaseError> {
        let query = sqlx::query_as::<_, Group>(
            r#"
            UPDATE groups SET name = $1, num_of_members = $2
            WHERE group_id = $3
            RETURNING group_id, name, num_of_members
            "#,
        )
        .bind(&group.name)
        .bind(group.num_of_members)
        .bind(group.id)
        .fetch_optional(&self.pool);

        *group = with_timeout(self.timeout, query)
            .await?
            .ok_or(DatabaseError::NotFound)?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), DatabaseError> {
        if id < 1 {
            return Err(DatabaseError::NotFound);
        }

        let query = sqlx::query("DELETE FROM groups WHERE group_id = $1")
            .bind(id)
            .execute(&self.pool);

        if with_timeout(self.timeout, query).await?.rows_affected() == 0 {
            return Err(DatabaseError::NotFound);
        }
        Ok(())
    }

    async fn get_all(
        &self,
        filter: &GroupFilter,
        filters: &Filters,
    ) -> Result<(Vec<Group>, Metadata), DatabaseError> {
        let sql = format!(
            r#"
            SELECT count(*) OVER() AS total_records, group_id, name, num_of_members
            FROM groups
            WHERE (to_tsvector('simple', name) @@ plainto_tsquery('simple', $1) OR $1 IS NULL)
            AND (num_of_members = $2 OR $2 IS NULL)
            {}
            LIMIT $3 OFFSET $4
            "#,
            filters.order_by("group_id")?
        );

        let query = sqlx::query(&sql)
            .bind(text_filter(&filter.name))
            .bind(filter.num_of_members)
            .bind(filters.limit())
            .bind(filters.offset())
            .fetch_all(&self.pool);
        let rows = with_timeout(self.timeout, query).await?;

        let mut total = 0;
        let mut groups = Vec::with_capacity(rows.len());
        for row in &rows {
            total = row.try_get::<i64, _>("total_records")?;
            groups.push(Group::from_row(row)?);
        }

        Ok((groups, Metadata::calculate(total, filters.page, filters.page_size)))
    }
}
