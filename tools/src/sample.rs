//! In-memory collaborators with a small Milwaukee dataset.
//!
//! Used by the text-mode CLI and by tests; real deployments swap in
//! backend-backed implementations of the same traits.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::collab::{DataQuery, MapControl, ZoningOracle};
use crate::types::{
    CommercialFilter, CommercialProperty, DevelopmentSite, GeocodeResult, HomeFilter,
    HomeListing, PropertyDetail, SiteFilter,
};

/// One recorded map-control invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum MapCall {
    FlyTo { lng: f64, lat: f64, zoom: f64 },
    SetLayerVisibility { layer: String, visible: bool },
    SetLayerOpacity { layer: String, opacity: f64 },
    ResetView,
    CaptureSnapshot,
}

/// Map control that records every call instead of rendering anything.
#[derive(Debug, Default, Clone)]
pub struct RecordingMap {
    calls: Arc<Mutex<Vec<MapCall>>>,
}

impl RecordingMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls recorded so far, in invocation order.
    pub fn calls(&self) -> Vec<MapCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl MapControl for RecordingMap {
    async fn fly_to(&self, lng: f64, lat: f64, zoom: f64) -> anyhow::Result<()> {
        self.calls.lock().push(MapCall::FlyTo { lng, lat, zoom });
        Ok(())
    }

    async fn set_layer_visibility(&self, layer: &str, visible: bool) -> anyhow::Result<()> {
        self.calls.lock().push(MapCall::SetLayerVisibility {
            layer: layer.to_string(),
            visible,
        });
        Ok(())
    }

    async fn set_layer_opacity(&self, layer: &str, opacity: f64) -> anyhow::Result<()> {
        self.calls.lock().push(MapCall::SetLayerOpacity {
            layer: layer.to_string(),
            opacity,
        });
        Ok(())
    }

    async fn reset_view(&self) -> anyhow::Result<()> {
        self.calls.lock().push(MapCall::ResetView);
        Ok(())
    }

    async fn capture_snapshot(&self) -> anyhow::Result<String> {
        let mut calls = self.calls.lock();
        calls.push(MapCall::CaptureSnapshot);
        Ok(format!("snapshot-{}", calls.len()))
    }
}

/// Static property dataset spanning a few Milwaukee neighborhoods.
#[derive(Debug, Clone)]
pub struct SampleData {
    homes: Vec<HomeListing>,
    commercial: Vec<CommercialProperty>,
    sites: Vec<DevelopmentSite>,
}

impl Default for SampleData {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleData {
    pub fn new() -> Self {
        Self {
            homes: vec![
                HomeListing {
                    id: "home-001".into(),
                    address: "2734 N 1st St".into(),
                    neighborhood: "Harambee".into(),
                    price: 189_900,
                    bedrooms: 3,
                    bathrooms: 1.5,
                    sqft: 1480,
                    lng: -87.9095,
                    lat: 43.0707,
                },
                HomeListing {
                    id: "home-002".into(),
                    address: "2453 S Howell Ave".into(),
                    neighborhood: "Bay View".into(),
                    price: 334_500,
                    bedrooms: 4,
                    bathrooms: 2.0,
                    sqft: 2105,
                    lng: -87.9044,
                    lat: 43.0014,
                },
                HomeListing {
                    id: "home-003".into(),
                    address: "1632 N 21st St".into(),
                    neighborhood: "Lindsay Heights".into(),
                    price: 124_000,
                    bedrooms: 3,
                    bathrooms: 1.0,
                    sqft: 1320,
                    lng: -87.9397,
                    lat: 43.0528,
                },
                HomeListing {
                    id: "home-004".into(),
                    address: "3118 S Logan Ave".into(),
                    neighborhood: "Bay View".into(),
                    price: 289_000,
                    bedrooms: 3,
                    bathrooms: 1.5,
                    sqft: 1650,
                    lng: -87.8990,
                    lat: 42.9895,
                },
            ],
            commercial: vec![
                CommercialProperty {
                    id: "com-001".into(),
                    address: "2200 N Dr Martin Luther King Jr Dr".into(),
                    property_type: "mixed-use".into(),
                    price: 585_000,
                    sqft: 6400,
                    zoning: "LB2".into(),
                    lng: -87.9146,
                    lat: 43.0597,
                },
                CommercialProperty {
                    id: "com-002".into(),
                    address: "1035 W National Ave".into(),
                    property_type: "retail".into(),
                    price: 410_000,
                    sqft: 3800,
                    zoning: "C9F".into(),
                    lng: -87.9227,
                    lat: 43.0236,
                },
            ],
            sites: vec![
                DevelopmentSite {
                    id: "site-001".into(),
                    address: "408 W North Ave".into(),
                    lot_sqft: 9600,
                    zoning: "C9E".into(),
                    price: 1,
                    city_owned: true,
                    lng: -87.9152,
                    lat: 43.0605,
                },
                DevelopmentSite {
                    id: "site-002".into(),
                    address: "2847 N 12th St".into(),
                    lot_sqft: 4200,
                    zoning: "RT4".into(),
                    price: 2500,
                    city_owned: true,
                    lng: -87.9268,
                    lat: 43.0722,
                },
                DevelopmentSite {
                    id: "site-003".into(),
                    address: "170 S 2nd St".into(),
                    lot_sqft: 14500,
                    zoning: "C9F".into(),
                    price: 760_000,
                    city_owned: false,
                    lng: -87.9119,
                    lat: 43.0297,
                },
            ],
        }
    }

    fn all_details(&self) -> Vec<PropertyDetail> {
        let homes = self.homes.iter().map(|h| PropertyDetail {
            id: h.id.clone(),
            address: h.address.clone(),
            kind: "home".into(),
            price: h.price,
            zoning: "RT4".into(),
            description: format!(
                "{} bed / {} bath, {} sq ft in {}",
                h.bedrooms, h.bathrooms, h.sqft, h.neighborhood
            ),
            lng: h.lng,
            lat: h.lat,
        });
        let commercial = self.commercial.iter().map(|c| PropertyDetail {
            id: c.id.clone(),
            address: c.address.clone(),
            kind: "commercial".into(),
            price: c.price,
            zoning: c.zoning.clone(),
            description: format!("{} space, {} sq ft", c.property_type, c.sqft),
            lng: c.lng,
            lat: c.lat,
        });
        let sites = self.sites.iter().map(|s| PropertyDetail {
            id: s.id.clone(),
            address: s.address.clone(),
            kind: "development-site".into(),
            price: s.price,
            zoning: s.zoning.clone(),
            description: if s.city_owned {
                format!("City-owned lot, {} sq ft", s.lot_sqft)
            } else {
                format!("Development site, {} sq ft", s.lot_sqft)
            },
            lng: s.lng,
            lat: s.lat,
        });
        homes.chain(commercial).chain(sites).collect()
    }
}

#[async_trait]
impl DataQuery for SampleData {
    async fn geocode(&self, address: &str) -> anyhow::Result<Option<GeocodeResult>> {
        let needle = address.to_lowercase();
        Ok(self
            .all_details()
            .into_iter()
            .find(|d| d.address.to_lowercase().contains(&needle))
            .map(|d| GeocodeResult {
                address: d.address,
                lng: d.lng,
                lat: d.lat,
            }))
    }

    async fn search_homes(&self, filter: &HomeFilter) -> anyhow::Result<Vec<HomeListing>> {
        Ok(self
            .homes
            .iter()
            .filter(|h| {
                filter
                    .neighborhood
                    .as_ref()
                    .is_none_or(|n| h.neighborhood.eq_ignore_ascii_case(n))
            })
            .filter(|h| filter.max_price.is_none_or(|p| h.price <= p))
            .filter(|h| filter.min_bedrooms.is_none_or(|b| h.bedrooms >= b))
            .cloned()
            .collect())
    }

    async fn search_commercial(
        &self,
        filter: &CommercialFilter,
    ) -> anyhow::Result<Vec<CommercialProperty>> {
        Ok(self
            .commercial
            .iter()
            .filter(|c| {
                filter
                    .property_type
                    .as_ref()
                    .is_none_or(|t| c.property_type.eq_ignore_ascii_case(t))
            })
            .filter(|c| filter.max_price.is_none_or(|p| c.price <= p))
            .cloned()
            .collect())
    }

    async fn search_development_sites(
        &self,
        filter: &SiteFilter,
    ) -> anyhow::Result<Vec<DevelopmentSite>> {
        Ok(self
            .sites
            .iter()
            .filter(|s| {
                filter
                    .zoning
                    .as_ref()
                    .is_none_or(|z| s.zoning.eq_ignore_ascii_case(z))
            })
            .filter(|s| filter.city_owned.is_none_or(|c| s.city_owned == c))
            .filter(|s| filter.min_lot_sqft.is_none_or(|m| s.lot_sqft >= m))
            .cloned()
            .collect())
    }

    async fn property_by_id(&self, id: &str) -> anyhow::Result<Option<PropertyDetail>> {
        Ok(self.all_details().into_iter().find(|d| d.id == id))
    }
}

/// Canned zoning-code answers keyed by topic.
#[derive(Debug, Default, Clone)]
pub struct StaticZoning;

#[async_trait]
impl ZoningOracle for StaticZoning {
    async fn answer(&self, question: &str) -> anyhow::Result<String> {
        let q = question.to_lowercase();
        let answer = if q.contains("adu") || q.contains("accessory dwelling") {
            "Accessory dwelling units are permitted in most residential districts \
             citywide since the 2023 zoning code update, subject to owner-occupancy \
             and size limits."
        } else if q.contains("rt4") {
            "RT4 is a two-family residential district allowing duplexes and \
             single-family homes on lots of at least 2,400 square feet."
        } else if q.contains("duplex") || q.contains("two-family") {
            "Two-family dwellings are permitted in RT3 and RT4 districts, and \
             conditionally in some RS districts."
        } else {
            "That depends on the parcel's zoning district; search an address to \
             check its designation."
        };
        Ok(answer.to_string())
    }
}
