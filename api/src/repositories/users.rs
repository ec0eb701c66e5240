use async_trait::async_trait;
use deadpool_postgres::Pool;

use super::UserLocationStore;
use crate::errors::AppError;
use crate::geo::GeoPoint;

pub(crate) struct PgUserLocationRepository {
    pool: Pool,
}

impl PgUserLocationRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserLocationStore for PgUserLocationRepository {
    async fn stored_location(&self, user_id: i64) -> Result<Option<GeoPoint>, AppError> {
        let sql = r#"
            SELECT ST_X(current_location), ST_Y(current_location)
            FROM users
            WHERE id = $1 AND current_location IS NOT NULL
        "#;

        let client = self.pool.get().await?;
        let row = client.query_opt(sql, &[&user_id]).await?;

        // Out-of-range stored values are treated as absent.
        Ok(row.and_then(|r| GeoPoint::new(r.get(0), r.get(1))))
    }

    async fn set_location(&self, user_id: i64, point: GeoPoint) -> Result<(), AppError> {
        let sql = r#"
            UPDATE users
            SET current_location = ST_SetSRID(ST_MakePoint($2, $3), 4326),
                location_updated_at = now()
            WHERE id = $1
        "#;

        let client = self.pool.get().await?;
        let updated = client
            .execute(sql, &[&user_id, &point.longitude, &point.latitude])
            .await?;
        if updated == 0 {
            return Err(AppError::NotFound(format!("User not found: {user_id}")));
        }
        Ok(())
    }
}
