use async_trait::async_trait;
use chrono::Duration as TokenTtl;
use sqlx::{PgExecutor, PgPool};
use std::time::Duration;

use super::TokenStore;
use crate::auth::generate_token;
use crate::database::manager::DatabaseError;
use crate::database::models::{Scope, Token};
use crate::database::with_timeout;

#[derive(Clone)]
pub struct TokenRepository {
    pool: PgPool,
    timeout: Duration,
}

impl TokenRepository {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

pub(super) async fn insert_token<'e, E>(executor: E, token: &Token) -> Result<(), sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query("INSERT INTO tokens (hash, user_id, expiry, scope) VALUES ($1, $2, $3, $4)")
        .bind(&token.hash)
        .bind(token.user_id)
        .bind(token.expiry)
        .bind(token.scope.as_str())
        .execute(executor)
        .await?;
    Ok(())
}

#[async_trait]
impl TokenStore for TokenRepository {
    async fn new_token(&self, user_id: i64, ttl: TokenTtl, scope: Scope) -> Result<Token, DatabaseError> {
        let token = generate_token(user_id, ttl, scope);
        self.insert(&token).await?;
        Ok(token)
    }

    async fn insert(&self, token: &Token) -> Result<(), DatabaseError> {
        with_timeout(self.timeout, insert_token(&self.pool, token)).await
    }

    #[tracing::instrument(skip(self))]
    async fn delete_all_for_user(&self, scope: Scope, user_id: i64) -> Result<(), DatabaseError> {
        let query = sqlx::query("DELETE FROM tokens WHERE scope = $1 AND user_id = $2")
            .bind(scope.as_str())
            .bind(user_id)
            .execute(&self.pool);

        with_timeout(self.timeout, query).await?;
        Ok(())
    }
}
