use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::database::record::Document;
use crate::types::Collection;

/// Physical condition of a listed item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    #[serde(rename = "New", alias = "Новое")]
    New,
    #[serde(rename = "Like-New", alias = "Как новое")]
    LikeNew,
    #[serde(rename = "Used", alias = "Б/у")]
    Used,
}

impl Condition {
    pub const ALL: [Condition; 3] = [Condition::New, Condition::LikeNew, Condition::Used];

    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::New => "New",
            Condition::LikeNew => "Like-New",
            Condition::Used => "Used",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Condition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "New" | "Новое" => Ok(Condition::New),
            "Like-New" | "Like New" | "Как новое" => Ok(Condition::LikeNew),
            "Used" | "Б/у" | "Б/У" => Ok(Condition::Used),
            other => Err(format!(
                "Unknown condition '{}'; expected one of New, Like-New, Used",
                other
            )),
        }
    }
}

/// A listing. `price` is the exact decimal text the seller entered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub title: String,
    pub description: String,
    pub price: String,
    pub category: String,
    pub condition: Condition,
    #[serde(default)]
    pub images: Vec<String>,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for Product {
    const COLLECTION: Collection = Collection::Products;

    fn id(&self) -> &str {
        &self.id
    }
}
