//! Configuration schema definitions.
//!
//! The normalized tree is three ordered declaration lists. Declaration
//! order is construction order within each section; the sections themselves
//! are built apps first, outbounds second, inbounds last.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Root configuration for the runtime.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Config {
    /// App declarations (dispatcher, metrics, ...), constructed first.
    pub apps: Vec<Declaration>,

    /// Outbound handler declarations.
    pub outbounds: Vec<Declaration>,

    /// Inbound handler declarations, constructed last so outbound capacity
    /// exists before any listener accepts traffic.
    pub inbounds: Vec<Declaration>,
}

/// One feature declaration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Declaration {
    /// Registered type identifier (e.g. "freedom", "tcp").
    #[serde(rename = "type")]
    pub type_tag: String,

    /// Optional instance tag for cross-references and logs.
    #[serde(default)]
    pub tag: Option<String>,

    /// Opaque settings payload, interpreted only by the matching
    /// constructor.
    #[serde(default)]
    pub settings: Value,
}
