//! API request and response types

use crate::catalog::Catalog;
use crate::gateway::InboundKind;
use serde::{Deserialize, Serialize};

/// Response for conversation creation
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateConversationResponse {
    pub conversation_id: String,
}

/// Request to send an inbound event
#[derive(Debug, Deserialize)]
pub struct SendEventRequest {
    pub kind: InboundKind,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub file_id: Option<String>,
}

/// Response for event submission
#[derive(Debug, Serialize, Deserialize)]
pub struct QueuedResponse {
    pub queued: bool,
}

/// Request for a one-shot estimate
#[derive(Debug, Deserialize)]
pub struct EstimateRequest {
    pub make: String,
    pub model: String,
    pub year: u16,
    pub mileage: u64,
}

/// Catalog with every price resolved
#[derive(Debug, Serialize, Deserialize)]
pub struct CatalogResponse {
    pub makes: Vec<CatalogMake>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CatalogMake {
    pub name: String,
    pub models: Vec<CatalogModel>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CatalogModel {
    pub name: String,
    pub base_price: u32,
    pub floor_price: u32,
}

impl From<&Catalog> for CatalogResponse {
    fn from(catalog: &Catalog) -> Self {
        let makes = catalog
            .makes()
            .iter()
            .map(|make| CatalogMake {
                name: make.name.clone(),
                models: make
                    .models
                    .iter()
                    .map(|model| CatalogModel {
                        name: model.name.clone(),
                        base_price: catalog.base_price(&make.name, &model.name),
                        floor_price: catalog.floor_price(&make.name, &model.name),
                    })
                    .collect(),
            })
            .collect();
        Self { makes }
    }
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
