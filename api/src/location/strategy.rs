use super::{AnchorMode, LocationAnchor, LocationSources, ResolutionRequest};
use crate::config::{MANUAL_OVERRIDE_DISTANCE_METERS, MAX_RADIUS_METERS};
use crate::geo::{haversine_distance_meters, GeoPoint};
use crate::validation::normalize_manual_code;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    UserLocation,
    ManualCode,
    CustomLatLng,
    Default,
}

impl Strategy {
    /// `Some` replaces the held anchor, `None` leaves it untouched.
    pub async fn resolve(
        self,
        prior: Option<&LocationAnchor>,
        request: &ResolutionRequest<'_>,
        sources: &LocationSources<'_>,
    ) -> Option<LocationAnchor> {
        match self {
            Self::UserLocation => user_location(request, sources).await,
            Self::ManualCode => manual_code(prior, request, sources).await,
            Self::CustomLatLng => custom_lat_lng(request),
            Self::Default => prior
                .is_none()
                .then(|| Self::default_anchor(sources.default_anchor)),
        }
    }

    pub(super) fn default_anchor(point: GeoPoint) -> LocationAnchor {
        LocationAnchor {
            point,
            mode: AnchorMode::Default,
            effective_radius_meters: None,
        }
    }
}

fn bounded_radius(requested: f64) -> Option<f64> {
    Some(requested.min(MAX_RADIUS_METERS))
}

async fn user_location(
    request: &ResolutionRequest<'_>,
    sources: &LocationSources<'_>,
) -> Option<LocationAnchor> {
    let user_id = request.user_id?;
    let point = match sources.users.stored_location(user_id).await {
        Ok(point) => point?,
        Err(err) => {
            log::warn!("stored location lookup failed for user {user_id}: {err}");
            return None;
        }
    };
    if point.is_origin() {
        return None;
    }

    Some(LocationAnchor {
        point,
        mode: AnchorMode::User,
        effective_radius_meters: bounded_radius(request.radius_meters),
    })
}

async fn manual_code(
    prior: Option<&LocationAnchor>,
    request: &ResolutionRequest<'_>,
    sources: &LocationSources<'_>,
) -> Option<LocationAnchor> {
    let code = normalize_manual_code(request.manual_code?)?;
    let record = match sources.addresses.find_by_code(&code).await {
        Ok(record) => record.filter(|r| r.is_active)?,
        Err(err) => {
            log::warn!("manual address lookup failed for {code}: {err}");
            return None;
        }
    };

    if let Some(prior) = prior {
        let distance = match sources.addresses.nearest_distance(prior.point, &code).await {
            Ok(Some(d)) => d,
            Ok(None) => return None,
            Err(err) => {
                log::warn!("distance lookup failed for {code}, using haversine: {err}");
                haversine_distance_meters(prior.point, record.location)
            }
        };
        log::debug!("manual code {code} is {distance:.0} m from the held anchor");
        if distance <= MANUAL_OVERRIDE_DISTANCE_METERS {
            return None;
        }
    }

    Some(LocationAnchor {
        point: record.location,
        mode: AnchorMode::ManualCode,
        effective_radius_meters: bounded_radius(request.radius_meters),
    })
}

fn custom_lat_lng(request: &ResolutionRequest<'_>) -> Option<LocationAnchor> {
    let point = GeoPoint::new(request.lng?, request.lat?)?;
    Some(LocationAnchor {
        point,
        mode: AnchorMode::CustomLatLng,
        effective_radius_meters: bounded_radius(request.radius_meters),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::fallback_anchor;
    use crate::testing::{MemoryManualAddressStore, MemoryUserLocationStore};

    #[actix_web::test]
    async fn default_only_fires_without_prior() {
        let users = MemoryUserLocationStore::default();
        let addresses = MemoryManualAddressStore::default();
        let sources = LocationSources {
            users: &users,
            addresses: &addresses,
            default_anchor: fallback_anchor(),
        };
        let request = ResolutionRequest::default();

        let fresh = Strategy::Default.resolve(None, &request, &sources).await;
        assert_eq!(fresh.map(|a| a.mode), Some(AnchorMode::Default));

        let held = LocationAnchor {
            point: GeoPoint::new(77.6, 12.9).unwrap(),
            mode: AnchorMode::CustomLatLng,
            effective_radius_meters: Some(1000.0),
        };
        assert_eq!(Strategy::Default.resolve(Some(&held), &request, &sources).await, None);
    }

    #[test]
    fn radius_is_capped() {
        assert_eq!(bounded_radius(5000.0), Some(5000.0));
        assert_eq!(bounded_radius(1e9), Some(MAX_RADIUS_METERS));
    }
}
