use async_trait::async_trait;
use deadpool_postgres::Pool;

use super::{Principal, PrincipalResolver, Role};
use crate::errors::AppError;

/// Resolves opaque bearer tokens through the `user_sessions` table.
pub(crate) struct PgSessionRepository {
    pool: Pool,
}

impl PgSessionRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PrincipalResolver for PgSessionRepository {
    async fn verify(&self, token: &str) -> Result<Option<Principal>, AppError> {
        let sql = r#"
            SELECT u.id, u.role
            FROM user_sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.token = $1 AND s.expires_at > now()
        "#;

        let client = self.pool.get().await?;
        let row = client.query_opt(sql, &[&token]).await?;

        Ok(row.map(|r| Principal {
            user_id: r.get(0),
            role: Role::parse(r.get::<_, &str>(1)),
        }))
    }
}
