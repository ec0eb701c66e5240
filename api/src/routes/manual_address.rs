use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};
use validator::Validate;

use crate::auth::require_admin;
use crate::errors::AppError;
use crate::geo::GeoPoint;
use crate::location::create_manual_address;
use crate::models::{CreateManualAddress, ManualAddressPayload, UpdateManualAddress};
use crate::repositories::{ManualAddressChanges, NewManualAddress};
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::validation::normalize_manual_code;

fn parse_id(key: &str) -> Result<i64, AppError> {
    key.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::Validation(format!("invalid manual address id '{key}'")))
}

fn point(lng: f64, lat: f64) -> Result<GeoPoint, AppError> {
    GeoPoint::new(lng, lat).ok_or_else(|| AppError::Validation("coordinates out of range".into()))
}

#[utoipa::path(
    post,
    path = "/manual-addresses",
    tag = "Manual Addresses",
    summary = "Register a place under a generated code",
    request_body = CreateManualAddress,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Created", body = ManualAddressPayload),
        (status = 400, description = "Invalid city or coordinates"),
        (status = 401, description = "Admin token required"),
        (status = 409, description = "No free code could be allocated")
    )
)]
pub(crate) async fn create(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<CreateManualAddress>,
) -> ActixResult<HttpResponse> {
    require_admin(&state, &req).await?;
    body.validate().map_err(AppError::from)?;

    let body = body.into_inner();
    let input = NewManualAddress {
        location: point(body.lng, body.lat)?,
        city: body.city,
        state: body.state,
        country: body.country.unwrap_or_default(),
    };
    let record = create_manual_address(state.addresses.as_ref(), input).await?;
    Ok(ApiResponse::created(ManualAddressPayload::from(record)))
}

#[utoipa::path(
    get,
    path = "/manual-addresses/{key}",
    tag = "Manual Addresses",
    summary = "Look up a manual address by code",
    params(("key" = String, Path, description = "Manual code, case-insensitive")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Found", body = ManualAddressPayload),
        (status = 401, description = "Admin token required"),
        (status = 404, description = "Unknown code")
    )
)]
pub(crate) async fn get_by_code(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    require_admin(&state, &req).await?;
    let raw = path.into_inner();
    let not_found = || AppError::NotFound(format!("Manual address not found: {raw}"));

    let code = normalize_manual_code(&raw).ok_or_else(not_found)?;
    let record = state
        .addresses
        .find_by_code(&code)
        .await?
        .ok_or_else(not_found)?;
    Ok(ApiResponse::ok(ManualAddressPayload::from(record)))
}

#[utoipa::path(
    patch,
    path = "/manual-addresses/{key}",
    tag = "Manual Addresses",
    summary = "Edit a manual address",
    description = "Only supplied fields change. `lng` and `lat` must be sent together.",
    params(("key" = i64, Path, description = "Manual address id")),
    request_body = UpdateManualAddress,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Updated", body = ManualAddressPayload),
        (status = 400, description = "Invalid id or fields"),
        (status = 401, description = "Admin token required"),
        (status = 404, description = "Unknown id")
    )
)]
pub(crate) async fn update(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<UpdateManualAddress>,
) -> ActixResult<HttpResponse> {
    require_admin(&state, &req).await?;
    let id = parse_id(&path)?;
    body.validate().map_err(AppError::from)?;

    let body = body.into_inner();
    let location = match (body.lng, body.lat) {
        (Some(lng), Some(lat)) => Some(point(lng, lat)?),
        (None, None) => None,
        _ => return Err(AppError::Validation("lng and lat must be provided together".into()).into()),
    };
    let city = match body.city.as_deref().map(str::trim) {
        Some("") => return Err(AppError::Validation("city must not be empty".into()).into()),
        city => city.map(str::to_string),
    };
    let changes = ManualAddressChanges {
        city,
        state: body.state,
        country: body.country,
        location,
        is_active: body.is_active,
    };

    let record = state.addresses.update(id, &changes).await?;
    Ok(ApiResponse::ok(ManualAddressPayload::from(record)))
}

#[utoipa::path(
    delete,
    path = "/manual-addresses/{key}",
    tag = "Manual Addresses",
    summary = "Deactivate a manual address",
    description = "The row is kept; its code stops resolving.",
    params(("key" = i64, Path, description = "Manual address id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Deactivated", body = ManualAddressPayload),
        (status = 401, description = "Admin token required"),
        (status = 404, description = "Unknown id")
    )
)]
pub(crate) async fn deactivate(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    require_admin(&state, &req).await?;
    let id = parse_id(&path)?;
    let record = state.addresses.deactivate(id).await?;
    log::info!("deactivated manual address {}", record.unique_code);
    Ok(ApiResponse::ok(ManualAddressPayload::from(record)))
}
