use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};

use crate::assembler;
use crate::auth::optional_principal;
use crate::errors::AppError;
use crate::location::{resolve_anchor, ResolutionRequest};
use crate::models::{NearbyPayload, NearbyQuery};
use crate::pipeline::{build_plan, Collection};
use crate::state::AppState;
use crate::validation::normalize_query;

#[utoipa::path(
    get,
    path = "/malls/nearby",
    tag = "Proximity",
    summary = "Malls around the caller",
    description = "Resolves the search anchor from, in rising priority, the caller's stored \
        location, a manual place code (only when it is more than 100 km from the stored \
        location) and explicit `lat`/`lng`. With none of these the country default is used \
        with an unbounded radius. Results are sorted by distance, newest first on ties.",
    params(NearbyQuery),
    responses(
        (status = 200, description = "Page of malls", body = NearbyPayload),
        (status = 400, description = "Invalid paging, radius or coordinates"),
        (status = 500, description = "Storage failure")
    )
)]
pub(crate) async fn malls_nearby(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<NearbyQuery>,
) -> ActixResult<HttpResponse> {
    Ok(search_nearby(&state, &req, &query, Collection::Malls).await?)
}

#[utoipa::path(
    get,
    path = "/banners/nearby",
    tag = "Proximity",
    summary = "Banners around the caller",
    params(NearbyQuery),
    responses(
        (status = 200, description = "Page of banners", body = NearbyPayload),
        (status = 400, description = "Invalid paging, radius or coordinates"),
        (status = 500, description = "Storage failure")
    )
)]
pub(crate) async fn banners_nearby(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<NearbyQuery>,
) -> ActixResult<HttpResponse> {
    Ok(search_nearby(&state, &req, &query, Collection::Banners).await?)
}

async fn search_nearby(
    state: &AppState,
    req: &HttpRequest,
    query: &NearbyQuery,
    collection: Collection,
) -> Result<HttpResponse, AppError> {
    let normalized = normalize_query(query)?;
    let descriptor = &normalized.descriptor;

    let principal = optional_principal(state, req).await;
    let request = ResolutionRequest {
        user_id: principal.map(|p| p.user_id),
        manual_code: normalized.code.as_deref(),
        lng: normalized.lng,
        lat: normalized.lat,
        radius_meters: descriptor.radius_meters,
    };
    let anchor = resolve_anchor(&request, &state.location_sources()).await;

    let plan = build_plan(collection, &anchor, descriptor, state.execution_mode);
    let result = assembler::run(state.records.as_ref(), &plan, descriptor.page).await?;
    log::debug!(
        "{} nearby: mode={} total={} page={}/{}",
        collection.table(),
        anchor.mode.as_str(),
        result.total,
        result.page,
        result.pages
    );

    Ok(HttpResponse::Ok().json(NearbyPayload::new(anchor.mode, result)))
}
