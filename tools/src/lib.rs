//! Remote-invoked function dispatch for the voice session.
//!
//! The model calls local functions by name over the streaming
//! connection; this crate maps those names to typed handlers that
//! mutate the host map, query the property backend, and answer
//! zoning-code questions. Handlers return bounded structured results
//! for the model and may emit a [`Card`] for the chat transcript.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use mkedev_tools::{builtin_registry, RecordingMap, SampleData, StaticZoning, ToolDeps};
//!
//! # tokio_test::block_on(async {
//! let registry = builtin_registry(ToolDeps {
//!     map: Arc::new(RecordingMap::new()),
//!     data: Arc::new(SampleData::new()),
//!     zoning: Arc::new(StaticZoning),
//! });
//!
//! let reply = registry
//!     .dispatch("reset_map_view", serde_json::json!({}))
//!     .await;
//! assert_eq!(reply.result["success"], true);
//! # });
//! ```

pub mod card;
pub mod collab;
pub mod handlers;
pub mod registry;
pub mod sample;
pub mod types;

pub use card::Card;
pub use collab::{DataQuery, MapControl, ZoningOracle};
pub use handlers::{ToolDeps, builtin_registry};
pub use registry::{ToolRegistry, ToolReply, ToolSpec};
pub use sample::{MapCall, RecordingMap, SampleData, StaticZoning};
pub use types::{
    CommercialFilter, CommercialProperty, DevelopmentSite, GeocodeResult, HomeFilter,
    HomeListing, PropertyDetail, SiteFilter,
};
