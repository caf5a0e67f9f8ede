//! Drink models
//!
//! Domain models for the drinks catalog and its request payloads.

use serde::{Deserialize, Serialize};

/// Longest title the catalog stores.
pub const MAX_TITLE_LEN: usize = 80;

/// One entry of a drink's recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub color: String,
    pub parts: i64,
}

impl Ingredient {
    pub fn new(name: impl Into<String>, color: impl Into<String>, parts: i64) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
            parts,
        }
    }
}

/// Ingredient as shown to anonymous callers: no name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientSummary {
    pub color: String,
    pub parts: i64,
}

/// A drink in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drink {
    pub id: Option<i64>,
    pub title: String,
    pub recipe: Vec<Ingredient>,
}

/// Public representation of a drink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrinkSummary {
    pub id: i64,
    pub title: String,
    pub recipe: Vec<IngredientSummary>,
}

/// Full representation of a drink, including ingredient names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrinkDetail {
    pub id: i64,
    pub title: String,
    pub recipe: Vec<Ingredient>,
}

impl Drink {
    /// Create a drink that has not been stored yet
    pub fn new(title: impl Into<String>, recipe: Vec<Ingredient>) -> Self {
        Self {
            id: None,
            title: title.into(),
            recipe,
        }
    }

    /// Summary without ingredient names
    pub fn short(&self) -> DrinkSummary {
        DrinkSummary {
            id: self.id.unwrap_or_default(),
            title: self.title.clone(),
            recipe: self
                .recipe
                .iter()
                .map(|i| IngredientSummary {
                    color: i.color.clone(),
                    parts: i.parts,
                })
                .collect(),
        }
    }

    /// Full detail
    pub fn long(&self) -> DrinkDetail {
        DrinkDetail {
            id: self.id.unwrap_or_default(),
            title: self.title.clone(),
            recipe: self.recipe.clone(),
        }
    }

    /// The drink seeded into a freshly reset catalog
    pub fn water() -> Self {
        Self::new("water", vec![Ingredient::new("water", "blue", 1)])
    }
}

/// Body of a create request.
///
/// `recipe` is kept as raw JSON because clients send either a single
/// ingredient object or a list of them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewDrink {
    pub title: Option<String>,
    pub recipe: Option<serde_json::Value>,
}

/// Body of an update request. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DrinkPatch {
    pub title: Option<String>,
    pub recipe: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mocha() -> Drink {
        let mut drink = Drink::new(
            "mocha",
            vec![
                Ingredient::new("espresso", "brown", 1),
                Ingredient::new("chocolate", "dark-brown", 1),
                Ingredient::new("milk", "white", 2),
            ],
        );
        drink.id = Some(3);
        drink
    }

    #[test]
    fn short_hides_ingredient_names() {
        let json = serde_json::to_value(mocha().short()).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["recipe"][2], serde_json::json!({"color": "white", "parts": 2}));
        assert!(json["recipe"][0].get("name").is_none());
    }

    #[test]
    fn long_keeps_full_recipe() {
        let detail = mocha().long();
        assert_eq!(detail.recipe.len(), 3);
        assert_eq!(detail.recipe[0].name, "espresso");
    }

    #[test]
    fn patch_fields_are_optional() {
        let patch: DrinkPatch = serde_json::from_str(r#"{"title": "flat white"}"#).unwrap();
        assert_eq!(patch.title.as_deref(), Some("flat white"));
        assert!(patch.recipe.is_none());
    }
}
