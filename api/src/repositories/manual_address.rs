use async_trait::async_trait;
use deadpool_postgres::Pool;
use tokio_postgres::error::SqlState;
use tokio_postgres::Row;

use super::{ManualAddressChanges, ManualAddressRecord, ManualAddressStore, NewManualAddress};
use crate::errors::AppError;
use crate::geo::GeoPoint;

const COLUMNS: &str = "id, city, unique_code, state, country, \
    ST_X(location), ST_Y(location), is_active, created_at, updated_at";

pub(crate) struct PgManualAddressRepository {
    pool: Pool,
}

impl PgManualAddressRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    fn build_record(row: &Row) -> Result<ManualAddressRecord, AppError> {
        let id: i64 = row.get(0);
        let location = GeoPoint::new(row.get(5), row.get(6)).ok_or_else(|| {
            AppError::Database(format!("manual address {id} has an invalid location"))
        })?;

        Ok(ManualAddressRecord {
            id,
            city: row.get(1),
            unique_code: row.get(2),
            state: row.get(3),
            country: row.get(4),
            location,
            is_active: row.get(7),
            created_at: row.get(8),
            updated_at: row.get(9),
        })
    }

    fn returned(row: Option<Row>, id: i64) -> Result<ManualAddressRecord, AppError> {
        let row = row.ok_or_else(|| AppError::NotFound(format!("Manual address not found: {id}")))?;
        Self::build_record(&row)
    }
}

#[async_trait]
impl ManualAddressStore for PgManualAddressRepository {
    async fn find_by_code(&self, code: &str) -> Result<Option<ManualAddressRecord>, AppError> {
        let sql = format!("SELECT {COLUMNS} FROM manual_addresses WHERE unique_code = $1");

        let client = self.pool.get().await?;
        match client.query_opt(&sql, &[&code]).await? {
            Some(row) => Self::build_record(&row).map(Some),
            None => Ok(None),
        }
    }

    async fn nearest_distance(&self, anchor: GeoPoint, code: &str) -> Result<Option<f64>, AppError> {
        let sql = r#"
            SELECT ST_Distance(location::geography, ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography)
            FROM manual_addresses
            WHERE unique_code = $3
        "#;

        let client = self.pool.get().await?;
        let row = client
            .query_opt(sql, &[&anchor.longitude, &anchor.latitude, &code])
            .await?;
        Ok(row.map(|r| r.get(0)))
    }

    async fn code_exists(&self, code: &str) -> Result<bool, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "SELECT EXISTS(SELECT 1 FROM manual_addresses WHERE unique_code = $1)",
                &[&code],
            )
            .await?;
        Ok(row.get(0))
    }

    async fn insert(&self, code: &str, input: &NewManualAddress) -> Result<ManualAddressRecord, AppError> {
        let sql = format!(
            "INSERT INTO manual_addresses (city, unique_code, state, country, location) \
             VALUES ($1, $2, $3, $4, ST_SetSRID(ST_MakePoint($5, $6), 4326)) \
             RETURNING {COLUMNS}"
        );

        let client = self.pool.get().await?;
        let row = client
            .query_one(
                &sql,
                &[
                    &input.city,
                    &code,
                    &input.state,
                    &input.country,
                    &input.location.longitude,
                    &input.location.latitude,
                ],
            )
            .await
            .map_err(|err| {
                if err.code() == Some(&SqlState::UNIQUE_VIOLATION) {
                    AppError::Conflict(format!("Manual code already taken: {code}"))
                } else {
                    AppError::from(err)
                }
            })?;
        Self::build_record(&row)
    }

    async fn update(&self, id: i64, changes: &ManualAddressChanges) -> Result<ManualAddressRecord, AppError> {
        let sql = format!(
            "UPDATE manual_addresses SET \
                city = COALESCE($2, city), \
                state = COALESCE($3, state), \
                country = COALESCE($4, country), \
                location = CASE WHEN $5::float8 IS NULL THEN location \
                    ELSE ST_SetSRID(ST_MakePoint($5, $6), 4326) END, \
                is_active = COALESCE($7, is_active), \
                updated_at = now() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        let lng = changes.location.map(|p| p.longitude);
        let lat = changes.location.map(|p| p.latitude);

        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                &sql,
                &[&id, &changes.city, &changes.state, &changes.country, &lng, &lat, &changes.is_active],
            )
            .await?;
        Self::returned(row, id)
    }

    async fn deactivate(&self, id: i64) -> Result<ManualAddressRecord, AppError> {
        let sql = format!(
            "UPDATE manual_addresses SET is_active = false, updated_at = now() \
             WHERE id = $1 RETURNING {COLUMNS}"
        );

        let client = self.pool.get().await?;
        let row = client.query_opt(&sql, &[&id]).await?;
        Self::returned(row, id)
    }
}
