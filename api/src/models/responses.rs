use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::assembler::PagedResult;
use crate::geo::GeoJsonPoint;
use crate::location::AnchorMode;
use crate::repositories::ManualAddressRecord;

#[derive(Serialize, ToSchema)]
pub struct HealthPayload {
    pub status: String,
}

/// Paged proximity search response.
#[derive(Debug, Serialize, ToSchema)]
pub struct NearbyPayload {
    pub success: bool,
    pub mode: AnchorMode,
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub pages: u64,
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<serde_json::Value>,
}

impl NearbyPayload {
    pub(crate) fn new(mode: AnchorMode, result: PagedResult) -> Self {
        Self {
            success: true,
            mode,
            page: result.page,
            limit: result.limit,
            total: result.total,
            pages: result.pages,
            data: result.items,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserLocationPayload {
    pub user_id: i64,
    pub location: GeoJsonPoint,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManualAddressPayload {
    pub id: i64,
    pub city: String,
    pub unique_code: String,
    pub state: Option<String>,
    pub country: String,
    pub location: GeoJsonPoint,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ManualAddressRecord> for ManualAddressPayload {
    fn from(r: ManualAddressRecord) -> Self {
        Self {
            id: r.id,
            city: r.city,
            unique_code: r.unique_code,
            state: r.state,
            country: r.country,
            location: r.location.to_geojson(),
            is_active: r.is_active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}
