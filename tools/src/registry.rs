//! Tool registry and dispatch.
//!
//! Each tool is a named descriptor: a JSON Schema for its arguments
//! (derived from the argument type) plus an async handler. Dispatch
//! validates model-generated arguments against the typed argument
//! struct before the handler runs, and converts every failure mode into
//! a structured `{success: false, error}` result. Nothing a handler
//! does can fail the session.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::warn;

use mkedev_live::FunctionDecl;

use crate::card::Card;

/// A boxed future that is Send.
type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type Handler = Arc<dyn Fn(Value) -> BoxFuture<'static, anyhow::Result<ToolReply>> + Send + Sync>;

/// What a handler produces: the result payload injected back into the
/// model's context, and optionally a card for the chat transcript.
#[derive(Debug, Clone)]
pub struct ToolReply {
    /// Structured result returned to the model. Kept small.
    pub result: Value,
    /// Optional UI card, independent of the textual result.
    pub card: Option<Card>,
}

impl ToolReply {
    /// A reply carrying the given result payload.
    pub fn ok(result: Value) -> Self {
        Self {
            result,
            card: None,
        }
    }

    /// Attaches a card to the reply.
    pub fn with_card(mut self, card: Card) -> Self {
        self.card = Some(card);
        self
    }

    /// A `{success: false, error}` reply.
    pub fn failure(error: impl std::fmt::Display) -> Self {
        Self {
            result: json!({ "success": false, "error": error.to_string() }),
            card: None,
        }
    }
}

/// One registered tool.
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema for the arguments object.
    pub parameters: Value,
    handler: Handler,
}

/// Registry mapping function names to tool descriptors.
///
/// Declaration order is preserved so the advertised function table is
/// stable.
#[derive(Default)]
pub struct ToolRegistry {
    order: Vec<String>,
    tools: HashMap<String, ToolSpec>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool with a typed argument struct.
    ///
    /// The JSON Schema is derived from `A`; arguments failing to parse
    /// as `A` become a `{success: false}` result without invoking the
    /// handler.
    pub fn register<A, F, Fut>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        handler: F,
    ) where
        A: JsonSchema + DeserializeOwned + Send + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<ToolReply>> + Send + 'static,
    {
        let name = name.into();
        let handler = Arc::new(handler);
        let spec = ToolSpec {
            name: name.clone(),
            description: description.into(),
            parameters: argument_schema::<A>(),
            handler: Arc::new(move |args: Value| {
                let handler = handler.clone();
                Box::pin(async move {
                    let parsed: A = match serde_json::from_value(args) {
                        Ok(parsed) => parsed,
                        Err(e) => {
                            return Ok(ToolReply::failure(format!("Invalid arguments: {e}")));
                        }
                    };
                    handler(parsed).await
                })
            }),
        };
        if self.tools.insert(name.clone(), spec).is_none() {
            self.order.push(name);
        }
    }

    /// Returns the registered tool, if any.
    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.tools.get(name)
    }

    /// Registered tool names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Function declarations for the setup envelope, in registration
    /// order.
    pub fn declarations(&self) -> Vec<FunctionDecl> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|spec| FunctionDecl {
                name: spec.name.clone(),
                description: spec.description.clone(),
                parameters: spec.parameters.clone(),
            })
            .collect()
    }

    /// Runs the named tool against model-generated arguments.
    ///
    /// Unknown names and handler errors come back as structured failure
    /// results; dispatch itself never errors.
    pub async fn dispatch(&self, name: &str, args: Value) -> ToolReply {
        let Some(spec) = self.tools.get(name) else {
            return ToolReply::failure(format!("Unknown function: {name}"));
        };
        match (spec.handler)(args).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("tool {} failed: {:#}", name, e);
                ToolReply::failure(e)
            }
        }
    }
}

/// Derives the argument schema for the function declaration. The
/// declaration format is an OpenAPI-style subset, so the meta fields
/// schemars emits are stripped.
fn argument_schema<A: JsonSchema>() -> Value {
    let schema = schemars::schema_for!(A);
    let mut value = serde_json::to_value(&schema).unwrap_or_default();
    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
    }
    value
}
