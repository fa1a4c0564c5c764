// ABOUTME: Component type definitions
// ABOUTME: Structures for inventory items, categories, and query filters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound on any single quantity field; guards against typo'd admin edits.
pub const MAX_QUANTITY: i64 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ComponentCategory {
    Microcontroller,
    Sensor,
    Actuator,
    Display,
    Communication,
    Power,
    Connector,
    Other,
}

impl ComponentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentCategory::Microcontroller => "microcontroller",
            ComponentCategory::Sensor => "sensor",
            ComponentCategory::Actuator => "actuator",
            ComponentCategory::Display => "display",
            ComponentCategory::Communication => "communication",
            ComponentCategory::Power => "power",
            ComponentCategory::Connector => "connector",
            ComponentCategory::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Available,
    Issued,
    Maintenance,
    Retired,
}

impl ComponentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentStatus::Available => "available",
            ComponentStatus::Issued => "issued",
            ComponentStatus::Maintenance => "maintenance",
            ComponentStatus::Retired => "retired",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: ComponentCategory,
    pub status: ComponentStatus,

    // Quantity accounting: available is a maintained aggregate, mutated only by
    // the lending lifecycle and direct admin edits. 0 <= available <= total.
    pub total_quantity: i64,
    pub available_quantity: i64,

    pub location: Option<String>,
    pub image_url: Option<String>,
    pub tags: Vec<String>,

    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Component {
    /// Available as a fraction of total is below 20%.
    pub fn is_low_stock(&self) -> bool {
        self.total_quantity > 0 && self.available_quantity * 5 < self.total_quantity
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCreateInput {
    pub name: String,
    pub description: Option<String>,
    pub category: ComponentCategory,
    pub total_quantity: i64,
    pub available_quantity: i64,
    pub location: Option<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentUpdateInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<ComponentCategory>,
    pub status: Option<ComponentStatus>,
    pub total_quantity: Option<i64>,
    pub available_quantity: Option<i64>,
    pub location: Option<String>,
    pub image_url: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Filter for querying components
#[derive(Debug, Clone, Default)]
pub struct ComponentFilter {
    pub category: Option<ComponentCategory>,
    pub status: Option<ComponentStatus>,
    pub search: Option<String>,
    pub in_stock_only: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryCount {
    pub category: ComponentCategory,
    pub count: i64,
}
