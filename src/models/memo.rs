//! Memo model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rating attached to a memo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Good,
    Okay,
    Bad,
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Good => write!(f, "good"),
            Self::Okay => write!(f, "okay"),
            Self::Bad => write!(f, "bad"),
        }
    }
}

impl std::str::FromStr for Rating {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "good" => Ok(Self::Good),
            "okay" => Ok(Self::Okay),
            "bad" => Ok(Self::Bad),
            _ => Err(format!("Invalid rating: {}", s)),
        }
    }
}

/// Memo entity: a note about one item at a place
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memo {
    pub id: i64,
    pub place_id: i64,
    pub item_name: String,
    pub rating: Rating,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a memo
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMemoInput {
    pub item_name: String,
    pub rating: Rating,
    pub comment: Option<String>,
}

/// Input for updating a memo; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMemoInput {
    pub item_name: Option<String>,
    pub rating: Option<Rating>,
    pub comment: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_rating_roundtrip() {
        for r in [Rating::Good, Rating::Okay, Rating::Bad] {
            assert_eq!(Rating::from_str(&r.to_string()).unwrap(), r);
        }
    }
}
