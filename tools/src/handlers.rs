//! The built-in function table of the zoning assistant.
//!
//! Arguments arrive model-generated and untrusted; every handler
//! validates before touching a collaborator, returns a bounded summary
//! for the model (never more than the first 5 items of a list), and may
//! attach a card for the chat transcript.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use crate::card::Card;
use crate::collab::{DataQuery, MapControl, ZoningOracle};
use crate::registry::{ToolRegistry, ToolReply};
use crate::types::{CommercialFilter, HomeFilter, SiteFilter};

/// Zoom used when flying to a single resolved location.
const DETAIL_ZOOM: f64 = 16.0;

/// Most list items a result payload may carry back to the model.
const MAX_RESULT_ITEMS: usize = 5;

/// Collaborators the built-in handlers mutate or query.
#[derive(Clone)]
pub struct ToolDeps {
    pub map: Arc<dyn MapControl>,
    pub data: Arc<dyn DataQuery>,
    pub zoning: Arc<dyn ZoningOracle>,
}

#[derive(Debug, JsonSchema, Deserialize)]
struct SearchAddressArgs {
    /// Street address to look up, e.g. "2200 N Dr Martin Luther King Jr Dr".
    address: String,
}

#[derive(Debug, JsonSchema, Deserialize)]
struct ZoningQuestionArgs {
    /// The zoning-code question to answer.
    question: String,
}

#[derive(Debug, JsonSchema, Deserialize)]
struct ToggleLayerArgs {
    /// Map layer id, e.g. "zoning" or "parcels".
    layer: String,
    /// Whether the layer should be visible.
    visible: bool,
}

#[derive(Debug, JsonSchema, Deserialize)]
struct LayerOpacityArgs {
    /// Map layer id.
    layer: String,
    /// Opacity between 0.0 and 1.0.
    opacity: f64,
}

#[derive(Debug, JsonSchema, Deserialize)]
struct NoArgs {}

#[derive(Debug, JsonSchema, Deserialize)]
struct SearchHomesArgs {
    /// Neighborhood to search in.
    neighborhood: Option<String>,
    /// Maximum asking price in dollars.
    max_price: Option<u64>,
    /// Minimum number of bedrooms.
    min_bedrooms: Option<u32>,
}

#[derive(Debug, JsonSchema, Deserialize)]
struct SearchCommercialArgs {
    /// Property type, e.g. "retail", "office", "mixed-use".
    property_type: Option<String>,
    /// Maximum asking price in dollars.
    max_price: Option<u64>,
}

#[derive(Debug, JsonSchema, Deserialize)]
struct SearchSitesArgs {
    /// Zoning designation, e.g. "RT4".
    zoning: Option<String>,
    /// Restrict to city-owned lots.
    city_owned: Option<bool>,
    /// Minimum lot size in square feet.
    min_lot_sqft: Option<u32>,
}

#[derive(Debug, JsonSchema, Deserialize)]
struct PropertyDetailsArgs {
    /// Listing id returned by a previous search.
    id: String,
}

/// Builds the full function table over the given collaborators.
pub fn builtin_registry(deps: ToolDeps) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    let d = deps.clone();
    registry.register::<SearchAddressArgs, _, _>(
        "search_address",
        "Look up a street address, fly the map to it, and pin it",
        move |args: SearchAddressArgs| {
            let d = d.clone();
            async move {
                let address = args.address.trim().to_string();
                if address.is_empty() {
                    return Ok(ToolReply::failure("Missing required argument: address"));
                }
                match d.data.geocode(&address).await? {
                    Some(hit) => {
                        d.map.fly_to(hit.lng, hit.lat, DETAIL_ZOOM).await?;
                        Ok(ToolReply::ok(json!({
                            "success": true,
                            "address": hit.address,
                            "lng": hit.lng,
                            "lat": hit.lat,
                        }))
                        .with_card(Card::AddressPin {
                            address: hit.address,
                            lng: hit.lng,
                            lat: hit.lat,
                        }))
                    }
                    None => Ok(ToolReply::failure(format!("Address not found: {address}"))),
                }
            }
        },
    );

    let d = deps.clone();
    registry.register::<ZoningQuestionArgs, _, _>(
        "answer_zoning_question",
        "Answer a question about the Milwaukee zoning code",
        move |args: ZoningQuestionArgs| {
            let d = d.clone();
            async move {
                let question = args.question.trim().to_string();
                if question.is_empty() {
                    return Ok(ToolReply::failure("Missing required argument: question"));
                }
                let answer = d.zoning.answer(&question).await?;
                Ok(
                    ToolReply::ok(json!({ "success": true, "answer": answer }))
                        .with_card(Card::ZoningAnswer { question, answer }),
                )
            }
        },
    );

    let d = deps.clone();
    registry.register::<ToggleLayerArgs, _, _>(
        "toggle_map_layer",
        "Show or hide a map layer",
        move |args: ToggleLayerArgs| {
            let d = d.clone();
            async move {
                if args.layer.trim().is_empty() {
                    return Ok(ToolReply::failure("Missing required argument: layer"));
                }
                d.map.set_layer_visibility(&args.layer, args.visible).await?;
                Ok(ToolReply::ok(json!({
                    "success": true,
                    "layer": args.layer,
                    "visible": args.visible,
                })))
            }
        },
    );

    let d = deps.clone();
    registry.register::<LayerOpacityArgs, _, _>(
        "set_layer_opacity",
        "Set the opacity of a map layer",
        move |args: LayerOpacityArgs| {
            let d = d.clone();
            async move {
                if args.layer.trim().is_empty() {
                    return Ok(ToolReply::failure("Missing required argument: layer"));
                }
                if !(0.0..=1.0).contains(&args.opacity) {
                    return Ok(ToolReply::failure(format!(
                        "Opacity must be between 0 and 1, got {}",
                        args.opacity
                    )));
                }
                d.map.set_layer_opacity(&args.layer, args.opacity).await?;
                Ok(ToolReply::ok(json!({
                    "success": true,
                    "layer": args.layer,
                    "opacity": args.opacity,
                })))
            }
        },
    );

    let d = deps.clone();
    registry.register::<NoArgs, _, _>(
        "reset_map_view",
        "Reset the map to the default citywide view",
        move |_args: NoArgs| {
            let d = d.clone();
            async move {
                d.map.reset_view().await?;
                Ok(ToolReply::ok(json!({ "success": true })))
            }
        },
    );

    let d = deps.clone();
    registry.register::<SearchHomesArgs, _, _>(
        "search_homes",
        "Search homes currently for sale",
        move |args: SearchHomesArgs| {
            let d = d.clone();
            async move {
                let filter = HomeFilter {
                    neighborhood: args.neighborhood,
                    max_price: args.max_price,
                    min_bedrooms: args.min_bedrooms,
                };
                let homes = d.data.search_homes(&filter).await?;
                if homes.is_empty() {
                    return Ok(ToolReply::ok(json!({
                        "success": true,
                        "count": 0,
                        "message": "No homes currently for sale matching those criteria.",
                    })));
                }
                let summaries: Vec<_> = homes
                    .iter()
                    .take(MAX_RESULT_ITEMS)
                    .map(|h| {
                        json!({
                            "id": h.id,
                            "address": h.address,
                            "neighborhood": h.neighborhood,
                            "price": h.price,
                            "bedrooms": h.bedrooms,
                        })
                    })
                    .collect();
                Ok(ToolReply::ok(json!({
                    "success": true,
                    "count": homes.len(),
                    "homes": summaries,
                }))
                .with_card(Card::HomeListings { homes }))
            }
        },
    );

    let d = deps.clone();
    registry.register::<SearchCommercialArgs, _, _>(
        "search_commercial_properties",
        "Search commercial properties for sale",
        move |args: SearchCommercialArgs| {
            let d = d.clone();
            async move {
                let filter = CommercialFilter {
                    property_type: args.property_type,
                    max_price: args.max_price,
                };
                let properties = d.data.search_commercial(&filter).await?;
                if properties.is_empty() {
                    return Ok(ToolReply::ok(json!({
                        "success": true,
                        "count": 0,
                        "message": "No commercial properties matching those criteria.",
                    })));
                }
                let summaries: Vec<_> = properties
                    .iter()
                    .take(MAX_RESULT_ITEMS)
                    .map(|p| {
                        json!({
                            "id": p.id,
                            "address": p.address,
                            "property_type": p.property_type,
                            "price": p.price,
                            "zoning": p.zoning,
                        })
                    })
                    .collect();
                Ok(ToolReply::ok(json!({
                    "success": true,
                    "count": properties.len(),
                    "properties": summaries,
                }))
                .with_card(Card::CommercialListings { properties }))
            }
        },
    );

    let d = deps.clone();
    registry.register::<SearchSitesArgs, _, _>(
        "search_development_sites",
        "Search development sites, including city-owned vacant lots",
        move |args: SearchSitesArgs| {
            let d = d.clone();
            async move {
                let filter = SiteFilter {
                    zoning: args.zoning,
                    city_owned: args.city_owned,
                    min_lot_sqft: args.min_lot_sqft,
                };
                let sites = d.data.search_development_sites(&filter).await?;
                if sites.is_empty() {
                    return Ok(ToolReply::ok(json!({
                        "success": true,
                        "count": 0,
                        "message": "No development sites matching those criteria.",
                    })));
                }
                let summaries: Vec<_> = sites
                    .iter()
                    .take(MAX_RESULT_ITEMS)
                    .map(|s| {
                        json!({
                            "id": s.id,
                            "address": s.address,
                            "zoning": s.zoning,
                            "lot_sqft": s.lot_sqft,
                            "city_owned": s.city_owned,
                        })
                    })
                    .collect();
                Ok(ToolReply::ok(json!({
                    "success": true,
                    "count": sites.len(),
                    "sites": summaries,
                }))
                .with_card(Card::DevelopmentSites { sites }))
            }
        },
    );

    let d = deps.clone();
    registry.register::<PropertyDetailsArgs, _, _>(
        "get_property_details",
        "Fetch the full record for a listing by id",
        move |args: PropertyDetailsArgs| {
            let d = d.clone();
            async move {
                let id = args.id.trim().to_string();
                if id.is_empty() {
                    return Ok(ToolReply::failure("Missing required argument: id"));
                }
                match d.data.property_by_id(&id).await? {
                    Some(property) => {
                        d.map
                            .fly_to(property.lng, property.lat, DETAIL_ZOOM)
                            .await?;
                        Ok(ToolReply::ok(json!({
                            "success": true,
                            "id": property.id,
                            "address": property.address,
                            "kind": property.kind,
                            "price": property.price,
                            "zoning": property.zoning,
                        }))
                        .with_card(Card::PropertyDetail { property }))
                    }
                    None => Ok(ToolReply::failure(format!("Property not found: {id}"))),
                }
            }
        },
    );

    let d = deps;
    registry.register::<NoArgs, _, _>(
        "capture_map_snapshot",
        "Capture the current map view for the conversation",
        move |_args: NoArgs| {
            let d = d.clone();
            async move {
                let reference = d.map.capture_snapshot().await?;
                Ok(
                    ToolReply::ok(json!({ "success": true, "reference": reference }))
                        .with_card(Card::MapSnapshot { reference }),
                )
            }
        },
    );

    registry
}
