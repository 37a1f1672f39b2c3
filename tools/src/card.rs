//! Structured cards attached to chat entries.
//!
//! Cards are produced only by dispatch handlers, as a side channel next
//! to the textual result returned to the model. The host UI renders
//! them; this crate only defines their shapes.

use serde::{Deserialize, Serialize};

use crate::types::{CommercialProperty, DevelopmentSite, HomeListing, PropertyDetail};

/// A UI-renderable result produced by a function handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Card {
    /// A resolved address pinned on the map.
    AddressPin {
        address: String,
        lng: f64,
        lat: f64,
    },
    /// An answer from the zoning-code agent.
    ZoningAnswer { question: String, answer: String },
    /// Homes matching a search.
    HomeListings { homes: Vec<HomeListing> },
    /// Commercial properties matching a search.
    CommercialListings { properties: Vec<CommercialProperty> },
    /// Development sites matching a search.
    DevelopmentSites { sites: Vec<DevelopmentSite> },
    /// A single property record.
    PropertyDetail { property: PropertyDetail },
    /// A captured map snapshot reference.
    MapSnapshot { reference: String },
}

impl Card {
    /// Short label for logs and text-mode rendering.
    pub fn kind(&self) -> &'static str {
        match self {
            Card::AddressPin { .. } => "address_pin",
            Card::ZoningAnswer { .. } => "zoning_answer",
            Card::HomeListings { .. } => "home_listings",
            Card::CommercialListings { .. } => "commercial_listings",
            Card::DevelopmentSites { .. } => "development_sites",
            Card::PropertyDetail { .. } => "property_detail",
            Card::MapSnapshot { .. } => "map_snapshot",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_serde_tagging() {
        let card = Card::AddressPin {
            address: "2200 N Dr Martin Luther King Jr Dr".into(),
            lng: -87.9146,
            lat: 43.0597,
        };
        let value = serde_json::to_value(&card).unwrap();
        assert_eq!(value["type"], "address_pin");
        let back: Card = serde_json::from_value(value).unwrap();
        assert_eq!(back, card);
    }
}
