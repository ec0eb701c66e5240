use serde::Serialize;
use utoipa::ToSchema;

/// Mean Earth radius used for every great-circle computation.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A WGS84 coordinate. Only constructed through [`GeoPoint::new`], so a
/// value in hand is always in range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Option<Self> {
        is_valid_coordinate_pair(longitude, latitude).then_some(Self { longitude, latitude })
    }

    /// Stored locations default to `(0, 0)` when a client never reported one.
    pub fn is_origin(&self) -> bool {
        self.longitude == 0.0 && self.latitude == 0.0
    }

    pub fn to_geojson(self) -> GeoJsonPoint {
        GeoJsonPoint {
            kind: "Point".to_string(),
            coordinates: [self.longitude, self.latitude],
        }
    }
}

/// Storage-compatible tagged form: `{ "type": "Point", "coordinates": [lng, lat] }`.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct GeoJsonPoint {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: [f64; 2],
}

/// Both values finite, longitude in [-180, 180], latitude in [-90, 90].
pub fn is_valid_coordinate_pair(lng: f64, lat: f64) -> bool {
    lng.is_finite()
        && lat.is_finite()
        && (-180.0..=180.0).contains(&lng)
        && (-90.0..=90.0).contains(&lat)
}

/// Great-circle distance between two points, in meters.
#[inline]
pub fn haversine_distance_meters(p1: GeoPoint, p2: GeoPoint) -> f64 {
    let lat1 = p1.latitude.to_radians();
    let lat2 = p2.latitude.to_radians();
    let d_lat = (p2.latitude - p1.latitude).to_radians();
    let d_lon = (p2.longitude - p1.longitude).to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * a.sqrt().atan2((1.0 - a).sqrt())
}
