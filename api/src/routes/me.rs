use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};
use validator::Validate;

use crate::auth::require_principal;
use crate::errors::AppError;
use crate::geo::GeoPoint;
use crate::models::{LocationUpdate, UserLocationPayload};
use crate::response::ApiResponse;
use crate::state::AppState;

#[utoipa::path(
    put,
    path = "/me/location",
    tag = "Location",
    summary = "Store the caller's current location",
    request_body = LocationUpdate,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Location stored", body = UserLocationPayload),
        (status = 400, description = "Coordinates out of range"),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "User no longer exists")
    )
)]
pub(crate) async fn update_location(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<LocationUpdate>,
) -> ActixResult<HttpResponse> {
    let principal = require_principal(&state, &req).await?;
    body.validate().map_err(AppError::from)?;

    let point = GeoPoint::new(body.lng, body.lat)
        .ok_or_else(|| AppError::Validation("coordinates out of range".into()))?;
    state.users.set_location(principal.user_id, point).await?;
    log::debug!("user {} moved to ({}, {})", principal.user_id, point.longitude, point.latitude);

    Ok(ApiResponse::ok(UserLocationPayload {
        user_id: principal.user_id,
        location: point.to_geojson(),
    }))
}
