//! Place model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of bookmarked place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceType {
    Restaurant,
    KidsPlayground,
}

impl std::fmt::Display for PlaceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Restaurant => write!(f, "restaurant"),
            Self::KidsPlayground => write!(f, "kids_playground"),
        }
    }
}

impl std::str::FromStr for PlaceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "restaurant" => Ok(Self::Restaurant),
            "kids_playground" => Ok(Self::KidsPlayground),
            _ => Err(format!("Invalid place type: {}", s)),
        }
    }
}

/// Place entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Place {
    pub id: i64,
    pub name: String,
    pub place_type: PlaceType,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Input for creating a place
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePlaceInput {
    pub name: String,
    pub place_type: PlaceType,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// Input for updating a place; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePlaceInput {
    pub name: Option<String>,
    pub place_type: Option<PlaceType>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_place_type_roundtrip() {
        for t in [PlaceType::Restaurant, PlaceType::KidsPlayground] {
            assert_eq!(PlaceType::from_str(&t.to_string()).unwrap(), t);
        }
    }

    #[test]
    fn test_place_type_invalid() {
        assert!(PlaceType::from_str("museum").is_err());
    }
}
