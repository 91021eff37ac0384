//! Reverse-geocoding seam
//!
//! The real HTTP client lives outside the core; the core only depends on
//! this contract. Best-effort: a `None` result is normal operation, and
//! callers never block the pipeline on it. Implementations are expected to
//! respect provider etiquette (at most one request per second, descriptive
//! user agent).

use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAddress {
    pub street: Option<String>,
    pub city: Option<String>,
    pub county: Option<String>,
    pub state: Option<String>,
    pub zipcode: Option<String>,
    /// Provider-specific precision tier, recorded on the location.
    pub tier: Option<String>,
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn resolve(&self, lat: f64, lng: f64) -> Option<ResolvedAddress>;
}

/// Default when no client is wired in.
pub struct NoopGeocoder;

#[async_trait]
impl Geocoder for NoopGeocoder {
    async fn resolve(&self, _lat: f64, _lng: f64) -> Option<ResolvedAddress> {
        None
    }
}
