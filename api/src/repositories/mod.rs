//! Storage collaborators. Each seam is a trait so request handling can run
//! against PostGIS in production and in-memory stores in tests.

pub(crate) mod manual_address;
pub(crate) mod records;
pub(crate) mod sessions;
pub(crate) mod users;

pub(crate) use manual_address::PgManualAddressRepository;
pub(crate) use records::PgRecordRepository;
pub(crate) use sessions::PgSessionRepository;
pub(crate) use users::PgUserLocationRepository;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::assembler::Facet;
use crate::errors::AppError;
use crate::geo::{haversine_distance_meters, GeoPoint};
use crate::pipeline::{CountQuery, ProximityQueryPlan};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("admin") {
            Self::Admin
        } else {
            Self::User
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ManualAddressRecord {
    pub id: i64,
    pub city: String,
    pub unique_code: String,
    pub state: Option<String>,
    pub country: String,
    pub location: GeoPoint,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewManualAddress {
    pub city: String,
    pub state: Option<String>,
    pub country: String,
    pub location: GeoPoint,
}

/// Partial update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManualAddressChanges {
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub location: Option<GeoPoint>,
    pub is_active: Option<bool>,
}

#[async_trait]
pub trait PrincipalResolver: Send + Sync {
    /// `None` for unknown or expired credentials.
    async fn verify(&self, token: &str) -> Result<Option<Principal>, AppError>;
}

#[async_trait]
pub trait UserLocationStore: Send + Sync {
    async fn stored_location(&self, user_id: i64) -> Result<Option<GeoPoint>, AppError>;

    async fn set_location(&self, user_id: i64, point: GeoPoint) -> Result<(), AppError>;
}

#[async_trait]
pub trait ManualAddressStore: Send + Sync {
    async fn find_by_code(&self, code: &str) -> Result<Option<ManualAddressRecord>, AppError>;

    /// Meters between `anchor` and the place registered under `code`.
    async fn nearest_distance(&self, anchor: GeoPoint, code: &str) -> Result<Option<f64>, AppError> {
        Ok(self
            .find_by_code(code)
            .await?
            .map(|r| haversine_distance_meters(anchor, r.location)))
    }

    async fn code_exists(&self, code: &str) -> Result<bool, AppError>;

    async fn insert(&self, code: &str, input: &NewManualAddress) -> Result<ManualAddressRecord, AppError>;

    async fn update(&self, id: i64, changes: &ManualAddressChanges) -> Result<ManualAddressRecord, AppError>;

    async fn deactivate(&self, id: i64) -> Result<ManualAddressRecord, AppError>;
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Page and total in one round trip. `None` when the store yields no group.
    async fn fetch_facet(&self, plan: &ProximityQueryPlan) -> Result<Option<Facet>, AppError>;

    async fn fetch_page(&self, plan: &ProximityQueryPlan) -> Result<Vec<Value>, AppError>;

    async fn count(&self, query: &CountQuery) -> Result<u64, AppError>;
}
