pub(crate) mod health;
pub(crate) mod manual_address;
pub(crate) mod me;
pub(crate) mod nearby;

use actix_web::web;

/// Mounted under `API_PREFIX` by `main`; tests mount it the same way.
pub(crate) fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health::health))
        .route("/malls/nearby", web::get().to(nearby::malls_nearby))
        .route("/banners/nearby", web::get().to(nearby::banners_nearby))
        .route("/me/location", web::put().to(me::update_location))
        .route("/manual-addresses", web::post().to(manual_address::create))
        .service(
            web::resource("/manual-addresses/{key}")
                .route(web::get().to(manual_address::get_by_code))
                .route(web::patch().to(manual_address::update))
                .route(web::delete().to(manual_address::deactivate)),
        );
}
