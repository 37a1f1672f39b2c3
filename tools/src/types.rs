//! Domain types shared by the dispatch handlers and their collaborators.

use serde::{Deserialize, Serialize};

/// A resolved street address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub address: String,
    pub lng: f64,
    pub lat: f64,
}

/// A home currently listed for sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeListing {
    pub id: String,
    pub address: String,
    pub neighborhood: String,
    pub price: u64,
    pub bedrooms: u32,
    pub bathrooms: f32,
    pub sqft: u32,
    pub lng: f64,
    pub lat: f64,
}

/// A commercial property listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommercialProperty {
    pub id: String,
    pub address: String,
    pub property_type: String,
    pub price: u64,
    pub sqft: u32,
    pub zoning: String,
    pub lng: f64,
    pub lat: f64,
}

/// A development site, including city-owned vacant lots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevelopmentSite {
    pub id: String,
    pub address: String,
    pub lot_sqft: u32,
    pub zoning: String,
    pub price: u64,
    pub city_owned: bool,
    pub lng: f64,
    pub lat: f64,
}

/// Full record for a single property lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDetail {
    pub id: String,
    pub address: String,
    pub kind: String,
    pub price: u64,
    pub zoning: String,
    pub description: String,
    pub lng: f64,
    pub lat: f64,
}

/// Search filter for homes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HomeFilter {
    pub neighborhood: Option<String>,
    pub max_price: Option<u64>,
    pub min_bedrooms: Option<u32>,
}

/// Search filter for commercial properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommercialFilter {
    pub property_type: Option<String>,
    pub max_price: Option<u64>,
}

/// Search filter for development sites.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteFilter {
    pub zoning: Option<String>,
    pub city_owned: Option<bool>,
    pub min_lot_sqft: Option<u32>,
}
