//! Game (category) model.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A catalog game category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Game {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub box_art_url: String,
}

impl Game {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            box_art_url: String::new(),
        }
    }
}
