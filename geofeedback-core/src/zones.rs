use geofeedback_loader::{Coordinates, RiskLevel};
use serde::{Deserialize, Serialize};

/// Circular flood-risk area, radius in metres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskZone {
    pub lat: f64,
    pub lng: f64,
    pub level: RiskLevel,
    pub radius: f64,
}

impl RiskZone {
    pub fn new(lat: f64, lng: f64, level: RiskLevel, radius: f64) -> Self {
        Self {
            lat,
            lng,
            level,
            radius,
        }
    }

    pub fn center(&self) -> Coordinates {
        Coordinates::new(self.lng, self.lat)
    }

    /// Great-circle distance from the zone center, in metres.
    pub fn distance_to(&self, point: Coordinates) -> f64 {
        haversine_meters(self.center(), point)
    }

    pub fn contains(&self, point: Coordinates) -> bool {
        self.distance_to(point) <= self.radius
    }
}

/// Zones shown when the configuration does not provide any.
pub fn default_zones() -> Vec<RiskZone> {
    vec![
        RiskZone::new(-32.51, -71.45, RiskLevel::Medium, 800.0),
        RiskZone::new(-32.50, -71.44, RiskLevel::Medium, 600.0),
        RiskZone::new(-32.52, -71.46, RiskLevel::High, 500.0),
    ]
}

const EARTH_RADIUS_M: f64 = 6_371_008.8;

pub fn haversine_meters(a: Coordinates, b: Coordinates) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}
