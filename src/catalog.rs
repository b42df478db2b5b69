//! Vehicle catalog: known makes, their models, and market price tables
//!
//! The catalog is built once at startup and shared read-only. Prices live next
//! to the model they belong to, so every priced (make, model) pair is a listed
//! pair by construction.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Base price used when a (make, model) pair has no entry
pub const DEFAULT_BASE_PRICE: u32 = 8000;

/// Floor price used when a (make, model) pair has no entry
pub const DEFAULT_FLOOR_PRICE: u32 = 5000;

/// Date the built-in price data is valid as of
pub const DATA_VALID_AS_OF: &str = "02.12.2025";

/// Where the built-in price data was collected
pub const DATA_SOURCE: &str = "OLX.uz + Avtoelon.uz";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Catalog has no makes")]
    Empty,
    #[error("Empty name in catalog (make #{make_index})")]
    EmptyName { make_index: usize },
    #[error("Duplicate make: {0}")]
    DuplicateMake(String),
    #[error("Duplicate model {model} for make {make}")]
    DuplicateModel { make: String, model: String },
    #[error("Make {0} lists no models")]
    NoModels(String),
}

/// A model with its optional price entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_price: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor_price: Option<u32>,
}

/// A make and its ordered model list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MakeEntry {
    pub name: String,
    pub models: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    makes: Vec<MakeEntry>,
}

/// Immutable make/model catalog with price tables
#[derive(Debug, Clone, Serialize)]
pub struct Catalog {
    makes: Vec<MakeEntry>,
}

// (make, [(model, base price, floor price)])
type BuiltinTable = &'static [(&'static str, &'static [(&'static str, u32, Option<u32>)])];

const BUILTIN: BuiltinTable = &[
    (
        "Toyota",
        &[
            ("Corolla", 11_000, Some(7_500)),
            ("Camry", 16_000, None),
            ("RAV4", 20_000, None),
            ("Hilux", 23_000, None),
        ],
    ),
    (
        "Chevrolet",
        &[
            ("Cobalt", 9_400, Some(7_000)),
            ("Lacetti", 8_000, None),
            ("Nexia", 6_200, None),
            ("Gentra", 9_800, None),
        ],
    ),
    (
        "Hyundai",
        &[
            ("Solaris", 8_800, Some(5_500)),
            ("Elantra", 10_000, None),
            ("Creta", 13_500, None),
            ("Tucson", 14_000, None),
        ],
    ),
    (
        "Kia",
        &[
            ("Rio", 8_500, Some(6_000)),
            ("Cerato", 10_000, None),
            ("Sportage", 15_000, None),
        ],
    ),
    (
        "Honda",
        &[
            ("Civic", 11_500, Some(8_500)),
            ("Accord", 12_500, None),
            ("CR-V", 16_000, None),
        ],
    ),
];

impl Catalog {
    /// The catalog the service ships with
    pub fn builtin() -> Self {
        let makes = BUILTIN
            .iter()
            .map(|(make, models)| MakeEntry {
                name: (*make).to_string(),
                models: models
                    .iter()
                    .map(|(model, base, floor)| ModelEntry {
                        name: (*model).to_string(),
                        base_price: Some(*base),
                        floor_price: *floor,
                    })
                    .collect(),
            })
            .collect();
        Self { makes }
    }

    /// Build a catalog, rejecting entries that would make matching ambiguous
    pub fn from_makes(makes: Vec<MakeEntry>) -> Result<Self, CatalogError> {
        if makes.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen_makes = HashSet::new();
        for (make_index, make) in makes.iter().enumerate() {
            if normalize(&make.name).is_empty() {
                return Err(CatalogError::EmptyName { make_index });
            }
            if !seen_makes.insert(normalize(&make.name)) {
                return Err(CatalogError::DuplicateMake(make.name.clone()));
            }
            if make.models.is_empty() {
                return Err(CatalogError::NoModels(make.name.clone()));
            }

            let mut seen_models = HashSet::new();
            for model in &make.models {
                if normalize(&model.name).is_empty() {
                    return Err(CatalogError::EmptyName { make_index });
                }
                if !seen_models.insert(normalize(&model.name)) {
                    return Err(CatalogError::DuplicateModel {
                        make: make.name.clone(),
                        model: model.name.clone(),
                    });
                }
            }
        }

        Ok(Self { makes })
    }

    /// Parse a catalog document: `{ "makes": [{ "name", "models": [...] }] }`
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let doc: CatalogDocument = serde_json::from_str(json)?;
        Self::from_makes(doc.makes)
    }

    /// Load a catalog document from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn makes(&self) -> &[MakeEntry] {
        &self.makes
    }

    /// Make names in display order
    pub fn list_makes(&self) -> Vec<String> {
        self.makes.iter().map(|m| m.name.clone()).collect()
    }

    /// Model names for a make in display order, empty if the make is unknown
    pub fn list_models(&self, make: &str) -> Vec<String> {
        self.make_entry(make)
            .map(|m| m.models.iter().map(|model| model.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Match user text against known makes, returning the display form
    ///
    /// Matching trims surrounding whitespace and ignores case; anything else
    /// must match exactly.
    pub fn is_valid_make(&self, text: &str) -> Option<&str> {
        let wanted = normalize(text);
        self.makes
            .iter()
            .find(|m| normalize(&m.name) == wanted)
            .map(|m| m.name.as_str())
    }

    /// Match user text against one make's models, returning the display form
    pub fn is_valid_model(&self, make: &str, text: &str) -> Option<&str> {
        let wanted = normalize(text);
        self.make_entry(make)?
            .models
            .iter()
            .find(|m| normalize(&m.name) == wanted)
            .map(|m| m.name.as_str())
    }

    pub fn base_price(&self, make: &str, model: &str) -> u32 {
        self.model_entry(make, model)
            .and_then(|m| m.base_price)
            .unwrap_or(DEFAULT_BASE_PRICE)
    }

    pub fn floor_price(&self, make: &str, model: &str) -> u32 {
        self.model_entry(make, model)
            .and_then(|m| m.floor_price)
            .unwrap_or(DEFAULT_FLOOR_PRICE)
    }

    fn make_entry(&self, make: &str) -> Option<&MakeEntry> {
        self.makes.iter().find(|m| m.name == make)
    }

    fn model_entry(&self, make: &str, model: &str) -> Option<&ModelEntry> {
        self.make_entry(make)?.models.iter().find(|m| m.name == model)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}
