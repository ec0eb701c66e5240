use std::sync::Arc;

use deadpool_postgres::Pool;

use crate::config::Config;
use crate::geo::GeoPoint;
use crate::location::LocationSources;
use crate::pipeline::ExecutionMode;
use crate::repositories::{
    ManualAddressStore, PgManualAddressRepository, PgRecordRepository, PgSessionRepository,
    PgUserLocationRepository, PrincipalResolver, RecordStore, UserLocationStore,
};

/// Shared, read-only application state handed to every handler.
#[derive(Clone)]
pub(crate) struct AppState {
    pub principals: Arc<dyn PrincipalResolver>,
    pub users: Arc<dyn UserLocationStore>,
    pub addresses: Arc<dyn ManualAddressStore>,
    pub records: Arc<dyn RecordStore>,
    pub default_anchor: GeoPoint,
    pub execution_mode: ExecutionMode,
}

impl AppState {
    pub fn postgres(pool: Pool, cfg: &Config) -> Self {
        Self {
            principals: Arc::new(PgSessionRepository::new(pool.clone())),
            users: Arc::new(PgUserLocationRepository::new(pool.clone())),
            addresses: Arc::new(PgManualAddressRepository::new(pool.clone())),
            records: Arc::new(PgRecordRepository::new(pool)),
            default_anchor: cfg.default_anchor,
            execution_mode: cfg.execution_mode,
        }
    }

    pub fn location_sources(&self) -> LocationSources<'_> {
        LocationSources {
            users: self.users.as_ref(),
            addresses: self.addresses.as_ref(),
            default_anchor: self.default_anchor,
        }
    }
}
