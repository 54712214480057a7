//! Radius filtering for "nearby" queries

use crate::{Coordinates, Result};
use serde::{Deserialize, Serialize};

/// Search radius for nearby queries, in kilometres
pub const NEARBY_RADIUS_KM: f64 = 6.0;

/// Anything with a position that can appear in a nearby result
pub trait Located {
    /// Current position
    fn location(&self) -> Coordinates;

    /// Category used by the optional query filter (e.g. taxi type)
    fn category(&self) -> Option<&str> {
        None
    }
}

/// A candidate that passed the radius filter, with its distance
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Nearby<T> {
    #[serde(flatten)]
    pub item: T,
    pub distance_km: f64,
}

/// Query parameters accepted by the record services' nearby endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyQuery {
    pub lat: f64,
    pub lon: f64,
    #[serde(default, alias = "taxiType", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl NearbyQuery {
    /// Validated centre point of the query
    pub fn center(&self) -> Result<Coordinates> {
        Coordinates::checked(self.lat, self.lon)
    }

    /// Category filter, with blank values treated as "no filter"
    pub fn category_filter(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    /// Run this query against a candidate set
    pub fn apply<T, I>(&self, candidates: I) -> Result<Vec<Nearby<T>>>
    where
        T: Located,
        I: IntoIterator<Item = T>,
    {
        let center = self.center()?;
        Ok(nearby(center, candidates, self.category_filter()))
    }
}

/// Candidates within [`NEARBY_RADIUS_KM`] of `center`, closest first.
///
/// When `category` is given only candidates with exactly that category are
/// considered.
pub fn nearby<T, I>(center: Coordinates, candidates: I, category: Option<&str>) -> Vec<Nearby<T>>
where
    T: Located,
    I: IntoIterator<Item = T>,
{
    let filtered = candidates
        .into_iter()
        .filter(|c| category.is_none_or(|wanted| c.category() == Some(wanted)));
    nearby_within(center, filtered, NEARBY_RADIUS_KM)
}

/// Candidates within `radius_km` of `center`, sorted by ascending distance.
///
/// The boundary is inclusive. Ties keep their input order.
pub fn nearby_within<T, I>(center: Coordinates, candidates: I, radius_km: f64) -> Vec<Nearby<T>>
where
    T: Located,
    I: IntoIterator<Item = T>,
{
    let mut result: Vec<Nearby<T>> = candidates
        .into_iter()
        .filter_map(|item| {
            let distance_km = center.distance_km(&item.location());
            (distance_km <= radius_km).then_some(Nearby { item, distance_km })
        })
        .collect();

    result.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone, PartialEq, Serialize)]
    struct Driver {
        name: &'static str,
        taxi_type: &'static str,
        location: Coordinates,
    }

    impl Located for Driver {
        fn location(&self) -> Coordinates {
            self.location
        }

        fn category(&self) -> Option<&str> {
            Some(self.taxi_type)
        }
    }

    fn driver(name: &'static str, taxi_type: &'static str, lat: f64, lon: f64) -> Driver {
        Driver {
            name,
            taxi_type,
            location: Coordinates::new(lat, lon),
        }
    }

    #[test]
    fn test_filter_and_sort() {
        let center = Coordinates::new(41.0, 29.0);
        let drivers = vec![
            driver("near-2", "sari", 41.01, 29.01),
            driver("far", "sari", 42.0, 30.0),
            driver("near-1", "sari", 41.0001, 29.0001),
        ];

        let result = nearby(center, drivers, None);

        let names: Vec<_> = result.iter().map(|n| n.item.name).collect();
        assert_eq!(names, vec!["near-1", "near-2"]);
        assert!(result[0].distance_km < result[1].distance_km);
    }

    #[test]
    fn test_category_filter() {
        let center = Coordinates::new(41.0, 29.0);
        let drivers = vec![
            driver("yellow", "sari", 41.001, 29.0),
            driver("black", "siyah", 41.0005, 29.0),
        ];

        let result = nearby(center, drivers.clone(), Some("sari"));
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].item.name, "yellow");

        let all = nearby(center, drivers, None);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].item.name, "black");
    }

    #[test]
    fn test_radius_boundary() {
        let center = Coordinates::new(41.0, 29.0);
        // 0.05 degrees of latitude is about 5.56 km, 0.06 about 6.67 km
        let drivers = vec![
            driver("inside", "sari", 41.05, 29.0),
            driver("outside", "sari", 41.06, 29.0),
        ];

        let result = nearby(center, drivers, None);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].item.name, "inside");
    }

    #[test]
    fn test_query_blank_category_is_no_filter() {
        let query = NearbyQuery {
            lat: 41.0,
            lon: 29.0,
            category: Some("  ".to_string()),
        };
        assert_eq!(query.category_filter(), None);

        let result = query
            .apply(vec![driver("any", "siyah", 41.0, 29.0)])
            .unwrap();
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_query_rejects_bad_center() {
        let query = NearbyQuery {
            lat: 120.0,
            lon: 29.0,
            category: None,
        };
        assert!(query.apply(Vec::<Driver>::new()).is_err());
    }

    #[test]
    fn test_query_accepts_taxi_type_alias() {
        let query: NearbyQuery =
            serde_json::from_str(r#"{"lat":41.0,"lon":29.0,"taxiType":"sari"}"#).unwrap();
        assert_eq!(query.category_filter(), Some("sari"));
    }

    #[test]
    fn test_nearby_serializes_flat() {
        let n = Nearby {
            item: driver("a", "sari", 41.0, 29.0),
            distance_km: 1.5,
        };
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["name"], "a");
        assert_eq!(json["distanceKm"], 1.5);
    }

    proptest! {
        #[test]
        fn prop_results_within_radius_and_sorted(
            points in proptest::collection::vec((40.9f64..41.1, 28.9f64..29.1), 0..40)
        ) {
            let center = Coordinates::new(41.0, 29.0);
            let drivers: Vec<Driver> = points
                .iter()
                .map(|(lat, lon)| driver("p", "sari", *lat, *lon))
                .collect();

            let result = nearby(center, drivers, None);

            for n in &result {
                prop_assert!(n.distance_km <= NEARBY_RADIUS_KM);
                prop_assert!(center.distance_km(&n.item.location) <= NEARBY_RADIUS_KM);
            }
            for pair in result.windows(2) {
                prop_assert!(pair[0].distance_km <= pair[1].distance_km);
            }
        }
    }
}
