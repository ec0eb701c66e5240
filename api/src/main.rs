mod assembler;
mod auth;
mod config;
mod db;
mod errors;
mod geo;
mod location;
mod models;
mod pipeline;
mod repositories;
mod response;
mod routes;
mod state;
#[cfg(test)]
mod testing;
mod validation;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::openapi::Server;
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::API_PREFIX;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "GeoAnchor API",
        description = "Proximity search for malls and banners around a resolved location anchor.\n\n\
            The anchor comes from, in rising priority: the caller's stored location, a manual \
            place code, explicit coordinates. Anonymous callers without hints fall back to a \
            configured country-level default.",
        version = "1.0.0"
    ),
    paths(
        routes::health::health,
        routes::nearby::malls_nearby,
        routes::nearby::banners_nearby,
        routes::me::update_location,
        routes::manual_address::create,
        routes::manual_address::get_by_code,
        routes::manual_address::update,
        routes::manual_address::deactivate,
    ),
    components(schemas(
        models::HealthPayload, models::NearbyPayload, location::AnchorMode,
        models::LocationUpdate, models::UserLocationPayload, geo::GeoJsonPoint,
        models::CreateManualAddress, models::UpdateManualAddress, models::ManualAddressPayload,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "System", description = "Health and status"),
        (name = "Proximity", description = "Location-anchored search"),
        (name = "Location", description = "Caller location"),
        (name = "Manual Addresses", description = "Admin-managed place codes"),
    )
)]
struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();
    let cfg = config::Config::from_env();

    let pool = db::build_pool(&cfg).map_err(|err| {
        log::error!("{err}");
        std::io::Error::other(err)
    })?;
    let state = AppState::postgres(pool, &cfg);
    log::info!(
        "Default anchor: ({}, {}), query mode: {:?}",
        cfg.default_anchor.longitude,
        cfg.default_anchor.latitude,
        cfg.execution_mode
    );

    let bind = format!("{}:{}", cfg.host, cfg.port);
    log::info!("Starting GeoAnchor API on {bind}");
    log::info!("Swagger UI: http://{bind}{API_PREFIX}/docs/");

    let mut openapi = ApiDoc::openapi();
    openapi.servers = Some(vec![Server::new(API_PREFIX)]);

    let openapi_url: &'static str = Box::leak(format!("{API_PREFIX}/openapi.json").into_boxed_str());
    let docs_path: &'static str = Box::leak(format!("{API_PREFIX}/docs/{{_:.*}}").into_boxed_str());

    HttpServer::new(move || {
        App::new()
            .wrap(
                Logger::new(r#"%a "%r" %s %b %Dms "%{User-Agent}i""#)
                    .exclude(format!("{API_PREFIX}/health")),
            )
            .wrap(Cors::permissive())
            .app_data(web::Data::new(state.clone()))
            .service(SwaggerUi::new(docs_path).url(openapi_url, openapi.clone()))
            .service(web::scope(API_PREFIX).configure(routes::configure))
    })
    .bind(&bind)?
    .run()
    .await
}
