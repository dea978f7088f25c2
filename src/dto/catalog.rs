use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Code accepted by the API and the label shown on transport buttons.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CatalogOption {
    pub code: String,
    pub label: String,
}

impl CatalogOption {
    /// Option with its API code and button label.
    pub fn new(code: &str, label: &str) -> Self {
        Self {
            code: code.to_owned(),
            label: label.to_owned(),
        }
    }
}

/// Closed sets the transport builds its keyboards from.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CatalogResponse {
    pub simulators: Vec<CatalogOption>,
    pub tracks: Vec<CatalogOption>,
    pub modes: Vec<CatalogOption>,
}
