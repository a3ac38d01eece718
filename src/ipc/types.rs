use serde::Deserialize;

use crate::whatif::Simulator;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Per-session sidecar state. The what-if simulator is the only thing the
/// daemon holds between requests; everything else arrives in params.
pub struct AppState {
    pub whatif: Option<Simulator>,
}
