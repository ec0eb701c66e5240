//! Decides where a proximity query is anchored.
//!
//! Strategies run in a fixed order and a later strategy that resolves replaces
//! the anchor held so far. The default strategy is the exception: it only
//! fires when nothing else resolved, so the chain always ends with an anchor.

mod manual_code;
mod strategy;

pub use manual_code::create_manual_address;
pub use strategy::Strategy;

use serde::Serialize;
use utoipa::ToSchema;

use crate::geo::GeoPoint;
use crate::repositories::{ManualAddressStore, UserLocationStore};

/// Which strategy produced the final anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum AnchorMode {
    User,
    ManualCode,
    CustomLatLng,
    Default,
}

impl AnchorMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::ManualCode => "manualCode",
            Self::CustomLatLng => "customLatLng",
            Self::Default => "default",
        }
    }
}

/// Request-scoped centre of a proximity query. `effective_radius_meters` of
/// `None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationAnchor {
    pub point: GeoPoint,
    pub mode: AnchorMode,
    pub effective_radius_meters: Option<f64>,
}

/// Location hints carried by one request.
#[derive(Debug, Clone, Default)]
pub struct ResolutionRequest<'a> {
    pub user_id: Option<i64>,
    pub manual_code: Option<&'a str>,
    pub lng: Option<f64>,
    pub lat: Option<f64>,
    pub radius_meters: f64,
}

/// Read-only collaborators the strategies consult.
pub struct LocationSources<'a> {
    pub users: &'a dyn UserLocationStore,
    pub addresses: &'a dyn ManualAddressStore,
    pub default_anchor: GeoPoint,
}

/// Registration order; later entries override earlier ones.
pub const CHAIN: [Strategy; 4] = [
    Strategy::UserLocation,
    Strategy::ManualCode,
    Strategy::CustomLatLng,
    Strategy::Default,
];

/// Walk [`CHAIN`] and return the final anchor. Never fails: lookup errors and
/// unusable hints make a strategy decline.
pub async fn resolve_anchor(
    request: &ResolutionRequest<'_>,
    sources: &LocationSources<'_>,
) -> LocationAnchor {
    let mut held: Option<LocationAnchor> = None;

    for strategy in CHAIN {
        if strategy == Strategy::Default && held.is_some() {
            continue;
        }
        match strategy.resolve(held.as_ref(), request, sources).await {
            Some(anchor) => {
                log::debug!("{strategy:?} resolved anchor ({})", anchor.mode.as_str());
                held = Some(anchor);
            }
            None => log::debug!("{strategy:?} declined"),
        }
    }

    held.unwrap_or_else(|| Strategy::default_anchor(sources.default_anchor))
}
