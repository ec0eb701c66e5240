use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Raw proximity-search parameters. Everything arrives as text and is
/// normalized by `validation::normalize_query`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NearbyQuery {
    /// 1-based page number (default 1).
    pub page: Option<String>,
    /// Page size, 1..=100 (default 10).
    pub limit: Option<String>,
    /// Search radius in meters, clamped to 100000 (default 10000).
    pub radius: Option<String>,
    /// Case-insensitive substring filter.
    pub search: Option<String>,
    pub lat: Option<String>,
    pub lng: Option<String>,
    /// Manual place code, e.g. `DEL4821`.
    pub code: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LocationUpdate {
    #[validate(custom(function = "crate::validation::validate_lng"))]
    pub lng: f64,
    #[validate(custom(function = "crate::validation::validate_lat"))]
    pub lat: f64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateManualAddress {
    #[validate(length(min = 1, max = 100, message = "city must be 1-100 characters"))]
    pub city: String,
    pub state: Option<String>,
    pub country: Option<String>,
    #[validate(custom(function = "crate::validation::validate_lng"))]
    pub lng: f64,
    #[validate(custom(function = "crate::validation::validate_lat"))]
    pub lat: f64,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateManualAddress {
    #[validate(length(min = 1, max = 100, message = "city must be 1-100 characters"))]
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    #[validate(custom(function = "crate::validation::validate_lng"))]
    pub lng: Option<f64>,
    #[validate(custom(function = "crate::validation::validate_lat"))]
    pub lat: Option<f64>,
    pub is_active: Option<bool>,
}
