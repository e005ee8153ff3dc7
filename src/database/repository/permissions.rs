use async_trait::async_trait;
use sqlx::{PgExecutor, PgPool};
use std::time::Duration;

use super::PermissionStore;
use crate::database::manager::DatabaseError;
use crate::database::models::Permissions;
use crate::database::with_timeout;

#[derive(Clone)]
pub struct PermissionRepository {
    pool: PgPool,
    timeout: Duration,
}

impl PermissionRepository {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

pub(super) async fn grant<'e, E>(executor: E, user_id: i64, codes: &[String]) -> Result<(), sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO users_permissions (user_id, permission_id)
        SELECT $1, permissions.id FROM permissions WHERE permissions.code = ANY($2)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(codes)
    .execute(executor)
    .await?;
    Ok(())
}

#[async_trait]
impl PermissionStore for PermissionRepository {
    async fn get_all_for_user(&self, user_id: i64) -> Result<Permissions, DatabaseError> {
        let query = sqlx::query_scalar::<_, String>(
            r#"
            SELECT permissions.code
            FROM permissions
            INNER JOIN users_permissions ON users_permissions.permission_id = permissions.id
            WHERE users_permissions.user_id = $1
            ORDER BY permissions.code
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool);

        Ok(Permissions::from(with_timeout(self.timeout, query).await?))
    }

    /// Unknown codes are ignored.
    async fn add_for_user(&self, user_id: i64, codes: &[String]) -> Result<(), DatabaseError> {
        with_timeout(self.timeout, grant(&self.pool, user_id, codes)).await
    }
}
