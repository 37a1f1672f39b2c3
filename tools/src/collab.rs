//! Collaborator traits consumed by dispatch handlers.
//!
//! Handlers are the only consumers of these interfaces; the session
//! client never touches them. Implementations live with the host
//! application (map view, property backend, zoning agent).

use async_trait::async_trait;

use crate::types::{
    CommercialFilter, CommercialProperty, DevelopmentSite, GeocodeResult, HomeFilter,
    HomeListing, PropertyDetail, SiteFilter,
};

/// Control surface of the host map view.
#[async_trait]
pub trait MapControl: Send + Sync {
    async fn fly_to(&self, lng: f64, lat: f64, zoom: f64) -> anyhow::Result<()>;
    async fn set_layer_visibility(&self, layer: &str, visible: bool) -> anyhow::Result<()>;
    async fn set_layer_opacity(&self, layer: &str, opacity: f64) -> anyhow::Result<()>;
    async fn reset_view(&self) -> anyhow::Result<()>;
    /// Captures the current viewport; returns a reference the host can
    /// later resolve (URL or handle), never image bytes.
    async fn capture_snapshot(&self) -> anyhow::Result<String>;
}

/// Read-only lookups against the property backend.
#[async_trait]
pub trait DataQuery: Send + Sync {
    async fn geocode(&self, address: &str) -> anyhow::Result<Option<GeocodeResult>>;
    async fn search_homes(&self, filter: &HomeFilter) -> anyhow::Result<Vec<HomeListing>>;
    async fn search_commercial(
        &self,
        filter: &CommercialFilter,
    ) -> anyhow::Result<Vec<CommercialProperty>>;
    async fn search_development_sites(
        &self,
        filter: &SiteFilter,
    ) -> anyhow::Result<Vec<DevelopmentSite>>;
    async fn property_by_id(&self, id: &str) -> anyhow::Result<Option<PropertyDetail>>;
}

/// Delegation to the text-based zoning-code agent.
#[async_trait]
pub trait ZoningOracle: Send + Sync {
    async fn answer(&self, question: &str) -> anyhow::Result<String>;
}
