//! Drink service
//!
//! Business rules for the drinks catalog: input validation, recipe
//! normalization, and mapping of storage errors.

use std::sync::Arc;

use error::{AppError, DatabaseError};
use thiserror::Error;

use crate::models::{
    Drink, DrinkDetail, DrinkPatch, DrinkSummary, Ingredient, NewDrink, MAX_TITLE_LEN,
};
use crate::repository::{DrinkRepository, InMemoryRepository};

/// Service errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Drink {0} not found")]
    NotFound(i64),

    /// Malformed update input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Create input that cannot become a drink
    #[error("Unprocessable drink: {0}")]
    Unprocessable(String),

    #[error("A drink titled {0:?} already exists")]
    DuplicateTitle(String),

    #[error("Repository error: {0}")]
    Repository(#[from] DatabaseError),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(id) => AppError::NotFound(format!("drink {id}")),
            ServiceError::InvalidInput(msg) => AppError::Validation(msg),
            ServiceError::Unprocessable(msg) => AppError::Unprocessable(msg),
            ServiceError::DuplicateTitle(title) => {
                AppError::Unprocessable(format!("duplicate title {title:?}"))
            }
            ServiceError::Repository(e) => AppError::Database(e),
        }
    }
}

/// Drink service for catalog operations
#[derive(Clone)]
pub struct DrinkService {
    repository: Arc<dyn DrinkRepository>,
}

impl DrinkService {
    /// Create a drink service with an in-memory repository
    pub fn new() -> Self {
        Self::with_repository(Arc::new(InMemoryRepository::new()))
    }

    pub fn with_repository(repository: Arc<dyn DrinkRepository>) -> Self {
        Self { repository }
    }

    /// All drinks in their public form
    pub async fn list_summaries(&self) -> Result<Vec<DrinkSummary>, ServiceError> {
        let drinks = self.repository.find_all().await?;
        Ok(drinks.iter().map(Drink::short).collect())
    }

    /// All drinks with full recipes
    pub async fn list_details(&self) -> Result<Vec<DrinkDetail>, ServiceError> {
        let drinks = self.repository.find_all().await?;
        Ok(drinks.iter().map(Drink::long).collect())
    }

    /// Add a drink to the catalog
    pub async fn create(&self, input: NewDrink) -> Result<DrinkDetail, ServiceError> {
        let title = input
            .title
            .ok_or_else(|| ServiceError::Unprocessable("title is required".to_string()))?;
        validate_title(&title).map_err(ServiceError::Unprocessable)?;

        let recipe = input
            .recipe
            .ok_or_else(|| ServiceError::Unprocessable("recipe is required".to_string()))?;
        let recipe = parse_recipe(recipe, true).map_err(ServiceError::Unprocessable)?;
        if recipe.is_empty() {
            return Err(ServiceError::Unprocessable(
                "recipe needs at least one ingredient".to_string(),
            ));
        }

        let created = self
            .repository
            .create(&Drink::new(title, recipe))
            .await
            .map_err(duplicate_title)?;

        tracing::info!("Created drink {:?} ({:?})", created.id, created.title);
        Ok(created.long())
    }

    /// Change a drink's title and/or recipe
    pub async fn update(&self, id: i64, patch: DrinkPatch) -> Result<DrinkDetail, ServiceError> {
        let mut drink = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound(id))?;

        if let Some(title) = patch.title {
            validate_title(&title).map_err(ServiceError::InvalidInput)?;
            drink.title = title;
        }

        if let Some(recipe) = patch.recipe {
            drink.recipe = parse_recipe(recipe, false).map_err(ServiceError::InvalidInput)?;
        }

        let updated = self
            .repository
            .update(&drink)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound => ServiceError::NotFound(id),
                other => duplicate_title(other),
            })?;

        tracing::info!("Updated drink {}", id);
        Ok(updated.long())
    }

    /// Remove a drink, returning its id
    pub async fn delete(&self, id: i64) -> Result<i64, ServiceError> {
        self.repository.delete(id).await.map_err(|e| match e {
            DatabaseError::NotFound => ServiceError::NotFound(id),
            other => ServiceError::Repository(other),
        })?;

        tracing::info!("Deleted drink {}", id);
        Ok(id)
    }

    /// Check that storage is reachable
    pub async fn ping(&self) -> Result<(), ServiceError> {
        self.repository.ping().await?;
        Ok(())
    }
}

impl Default for DrinkService {
    fn default() -> Self {
        Self::new()
    }
}

fn duplicate_title(err: DatabaseError) -> ServiceError {
    match err {
        DatabaseError::DuplicateEntry(title) => ServiceError::DuplicateTitle(title),
        other => ServiceError::Repository(other),
    }
}

fn validate_title(title: &str) -> Result<(), String> {
    if title.trim().is_empty() {
        return Err("title must not be empty".to_string());
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(format!("title exceeds {MAX_TITLE_LEN} characters"));
    }
    Ok(())
}

/// Turn request JSON into a recipe.
///
/// A list of ingredients is always accepted; a single ingredient object only
/// when `allow_single` is set.
fn parse_recipe(value: serde_json::Value, allow_single: bool) -> Result<Vec<Ingredient>, String> {
    match value {
        serde_json::Value::Array(_) => {
            serde_json::from_value(value).map_err(|e| format!("invalid recipe: {e}"))
        }
        serde_json::Value::Object(_) if allow_single => serde_json::from_value(value)
            .map(|ingredient| vec![ingredient])
            .map_err(|e| format!("invalid ingredient: {e}")),
        _ => Err("recipe must be a list of ingredients".to_string()),
    }
}
