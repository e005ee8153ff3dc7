use async_trait::async_trait;
use chrono::{Duration as TokenTtl, Utc};
use sqlx::{postgres::PgRow, PgExecutor, PgPool, Row};
use std::time::Duration;

use super::permissions::grant;
use super::tokens::insert_token;
use super::UserStore;
use crate::auth::{generate_token, hash_token};
use crate::database::manager::{is_unique_violation, DatabaseError};
use crate::database::models::{Scope, Token, User};
use crate::database::with_timeout;

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
    timeout: Duration,
}

impl UserRepository {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

fn map_email_conflict(err: DatabaseError) -> DatabaseError {
    match err {
        DatabaseError::Sqlx(ref e) if is_unique_violation(e) => DatabaseError::DuplicateEmail,
        other => other,
    }
}

async fn insert_user<'e, E>(executor: E, user: &User) -> Result<PgRow, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO users (name, email, password_hash, activated)
        VALUES ($1, $2, $3, $4)
        RETURNING id, created_at, version
        "#,
    )
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.activated)
    .fetch_one(executor)
    .await
}

fn read_inserted(user: &mut User, row: &PgRow) -> Result<(), DatabaseError> {
    user.id = row.try_get("id")?;
    user.created_at = row.try_get("created_at")?;
    user.version = row.try_get("version")?;
    Ok(())
}

#[async_trait]
impl UserStore for UserRepository {
    #[tracing::instrument(skip(self, user), fields(email = %user.email))]
    async fn insert(&self, user: &mut User) -> Result<(), DatabaseError> {
        let row = with_timeout(self.timeout, insert_user(&self.pool, user))
            .await
            .map_err(map_email_conflict)?;
        read_inserted(user, &row)
    }

    #[tracing::instrument(skip(self, user, permissions), fields(email = %user.email))]
    async fn register(
        &self,
        user: &mut User,
        permissions: &[String],
        activation_ttl: TokenTtl,
    ) -> Result<Token, DatabaseError> {
        let work = async {
            let mut tx = self.pool.begin().await?;

            let row = insert_user(&mut *tx, user).await?;
            let user_id: i64 = row.try_get("id")?;
            grant(&mut *tx, user_id, permissions).await?;

            let token = generate_token(user_id, activation_ttl, Scope::Activation);
            insert_token(&mut *tx, &token).await?;

            tx.commit().await?;
            Ok::<_, sqlx::Error>((row, token))
        };

        // A dropped transaction rolls back, so a timeout leaves nothing behind.
        let (row, token) = with_timeout(self.timeout, work)
            .await
            .map_err(map_email_conflict)?;
        read_inserted(user, &row)?;
        Ok(token)
    }

    async fn get_by_email(&self, email: &str) -> Result<User, DatabaseError> {
        let query = sqlx::query_as::<_, User>(
            r#"
            SELECT id, created_at, name, email, password_hash, activated, version
            FROM users
            WHERE lower(email) = lower($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool);

        with_timeout(self.timeout, query)
            .await?
            .ok_or(DatabaseError::NotFound)
    }

    #[tracing::instrument(skip(self, user), fields(id = user.id, version = user.version))]
    async fn update(&self, user: &mut User) -> Result<(), DatabaseError> {
        let query = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE users
            SET name = $1, email = $2, password_hash = $3, activated = $4, version = version + 1
            WHERE id = $5 AND version = $6
            RETURNING version
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.activated)
        .bind(user.id)
        .bind(user.version)
        .fetch_optional(&self.pool);

        user.version = with_timeout(self.timeout, query)
            .await
            .map_err(map_email_conflict)?
            .ok_or(DatabaseError::EditConflict)?;
        Ok(())
    }

    async fn get_for_token(&self, scope: Scope, plaintext: &str) -> Result<User, DatabaseError> {
        let hash = hash_token(plaintext);

        let query = sqlx::query_as::<_, User>(
            r#"
            SELECT users.id, users.created_at, users.name, users.email,
                   users.password_hash, users.activated, users.version
            FROM users
            INNER JOIN tokens ON users.id = tokens.user_id
            WHERE tokens.hash = $1
            AND tokens.scope = $2
            AND tokens.expiry > $3
            "#,
        )
        .bind(hash)
        .bind(scope.as_str())
        .bind(Utc::now())
        .fetch_optional(&self.pool);

        with_timeout(self.timeout, query)
            .await?
            .ok_or(DatabaseError::NotFound)
    }
}
