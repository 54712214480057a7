//! # TaxiHub Geo
//!
//! Proximity primitives behind the record services' "nearby" queries.
//!
//! This crate provides:
//! - **Haversine distance**: great-circle distance on a spherical Earth
//! - **Nearby filtering**: radius filter with ascending-distance ordering
//! - **Query parsing**: validated `lat`/`lon`/category query parameters
//!
//! The gateway never calls into this crate at request time; it relays the
//! upstream bodies untouched. The crate pins down the response contract the
//! upstreams are expected to honour.

pub mod distance;
pub mod error;
pub mod nearby;

pub use distance::{haversine_km, Coordinates, EARTH_RADIUS_KM};
pub use error::{GeoError, Result};
pub use nearby::{nearby, nearby_within, Located, Nearby, NearbyQuery, NEARBY_RADIUS_KM};
