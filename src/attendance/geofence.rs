use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::{ServiceError, ServiceResult};
use crate::model::office::Office;

const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// Device position reported with a punch.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, ToSchema)]
pub struct GeoPoint {
    #[schema(example = 18.9435)]
    pub latitude: f64,
    #[schema(example = 72.8382)]
    pub longitude: f64,
}

impl GeoPoint {
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Great-circle distance in meters.
pub fn haversine_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat1, lat2) = (a.latitude.to_radians(), b.latitude.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().min(1.0).asin()
}

/// Fails with `OutsideGeofence` when `at` lies beyond the office radius plus
/// `buffer_meters`. Returns the measured distance otherwise.
pub fn check(office: &Office, at: GeoPoint, buffer_meters: f64) -> ServiceResult<f64> {
    let centre = GeoPoint {
        latitude: office.latitude,
        longitude: office.longitude,
    };
    let distance_m = haversine_meters(centre, at);
    if distance_m > office.radius_meters + buffer_meters {
        return Err(ServiceError::OutsideGeofence {
            office: office.name.clone(),
            distance_m,
        });
    }
    Ok(distance_m)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csmt() -> Office {
        Office {
            name: "CSMT".into(),
            latitude: 18.94358,
            longitude: 72.83826,
            radius_meters: 350.0,
        }
    }

    #[test]
    fn distance_between_known_points() {
        let csmt = GeoPoint {
            latitude: 18.94358,
            longitude: 72.83826,
        };
        let thane = GeoPoint {
            latitude: 19.23636,
            longitude: 72.98720,
        };
        let d = haversine_meters(csmt, thane);
        assert!((35_500.0..36_500.0).contains(&d), "got {d}");
        assert_eq!(haversine_meters(csmt, csmt), 0.0);
    }

    #[test]
    fn buffer_extends_the_radius() {
        // 0.004 degrees of latitude is roughly 445 m
        let near = GeoPoint {
            latitude: 18.94358 + 0.004,
            longitude: 72.83826,
        };
        assert!(check(&csmt(), near, 150.0).is_ok());
        assert!(matches!(
            check(&csmt(), near, 0.0),
            Err(ServiceError::OutsideGeofence { .. })
        ));
    }

    #[test]
    fn rejects_impossible_coordinates() {
        assert!(!GeoPoint { latitude: 91.0, longitude: 0.0 }.is_valid());
        assert!(GeoPoint { latitude: -45.0, longitude: 179.9 }.is_valid());
    }
}
