//! AQI category and display color lookup.

use serde::{Deserialize, Serialize};

pub const UNKNOWN_LABEL: &str = "Unknown";
pub const UNKNOWN_COLOR: &str = "#808080";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AqiCategory {
    Good,
    Fair,
    Moderate,
    Poor,
    VeryPoor,
}

impl AqiCategory {
    /// Map the upstream 1..=5 index; None outside that range.
    pub fn from_index(aqi: i64) -> Option<Self> {
        match aqi {
            1 => Some(AqiCategory::Good),
            2 => Some(AqiCategory::Fair),
            3 => Some(AqiCategory::Moderate),
            4 => Some(AqiCategory::Poor),
            5 => Some(AqiCategory::VeryPoor),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AqiCategory::Good => "Good",
            AqiCategory::Fair => "Fair",
            AqiCategory::Moderate => "Moderate",
            AqiCategory::Poor => "Poor",
            AqiCategory::VeryPoor => "Very Poor",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            AqiCategory::Good => "#00E400",
            AqiCategory::Fair => "#FFFF00",
            AqiCategory::Moderate => "#FF7E00",
            AqiCategory::Poor => "#FF0000",
            AqiCategory::VeryPoor => "#8F3F97",
        }
    }
}

pub fn category_of(aqi: i64) -> &'static str {
    AqiCategory::from_index(aqi).map_or(UNKNOWN_LABEL, |c| c.label())
}

pub fn color_of(aqi: i64) -> &'static str {
    AqiCategory::from_index(aqi).map_or(UNKNOWN_COLOR, |c| c.color())
}
