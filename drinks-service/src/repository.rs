//! Drink repository
//!
//! Storage operations for the drinks catalog.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use db::{map_sqlx_error, sqlx, DbPool, Row};
use error::DatabaseError;

use crate::models::{Drink, Ingredient};

type Result<T> = std::result::Result<T, DatabaseError>;

/// Drink repository trait for storage operations
#[async_trait]
pub trait DrinkRepository: Send + Sync {
    /// All drinks, ordered by id
    async fn find_all(&self) -> Result<Vec<Drink>>;

    /// Find a drink by id
    async fn find_by_id(&self, id: i64) -> Result<Option<Drink>>;

    /// Store a new drink and return it with its id
    async fn create(&self, drink: &Drink) -> Result<Drink>;

    /// Overwrite title and recipe of an existing drink
    async fn update(&self, drink: &Drink) -> Result<Drink>;

    /// Delete a drink
    async fn delete(&self, id: i64) -> Result<()>;

    /// Check that the backing store is reachable
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// In-memory repository for testing and development
pub struct InMemoryRepository {
    drinks: RwLock<Vec<Drink>>,
    next_id: AtomicI64,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            drinks: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }

    fn poisoned<T>(_: T) -> DatabaseError {
        DatabaseError::QueryFailed("in-memory store lock poisoned".to_string())
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DrinkRepository for InMemoryRepository {
    async fn find_all(&self) -> Result<Vec<Drink>> {
        let drinks = self.drinks.read().map_err(Self::poisoned)?;
        Ok(drinks.clone())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Drink>> {
        let drinks = self.drinks.read().map_err(Self::poisoned)?;
        Ok(drinks.iter().find(|d| d.id == Some(id)).cloned())
    }

    async fn create(&self, drink: &Drink) -> Result<Drink> {
        let mut drinks = self.drinks.write().map_err(Self::poisoned)?;
        if drinks.iter().any(|d| d.title == drink.title) {
            return Err(DatabaseError::DuplicateEntry(drink.title.clone()));
        }
        let mut new_drink = drink.clone();
        new_drink.id = Some(self.next_id.fetch_add(1, Ordering::SeqCst));
        drinks.push(new_drink.clone());
        Ok(new_drink)
    }

    async fn update(&self, drink: &Drink) -> Result<Drink> {
        let mut drinks = self.drinks.write().map_err(Self::poisoned)?;
        let id = drink.id.ok_or(DatabaseError::NotFound)?;
        if drinks
            .iter()
            .any(|d| d.id != Some(id) && d.title == drink.title)
        {
            return Err(DatabaseError::DuplicateEntry(drink.title.clone()));
        }
        let existing = drinks
            .iter_mut()
            .find(|d| d.id == Some(id))
            .ok_or(DatabaseError::NotFound)?;
        existing.title = drink.title.clone();
        existing.recipe = drink.recipe.clone();
        Ok(existing.clone())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut drinks = self.drinks.write().map_err(Self::poisoned)?;
        let len_before = drinks.len();
        drinks.retain(|d| d.id != Some(id));
        if drinks.len() == len_before {
            return Err(DatabaseError::NotFound);
        }
        Ok(())
    }
}

/// SQLite-backed repository. Recipes are stored as JSON text.
#[derive(Debug, Clone)]
pub struct SqliteDrinkRepository {
    pool: DbPool,
}

impl SqliteDrinkRepository {
    /// Wrap a pool, creating the `drink` table if it does not exist.
    pub async fn new(pool: DbPool) -> Result<Self> {
        let repo = Self { pool };
        repo.ensure_schema().await?;
        Ok(repo)
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS drink (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL UNIQUE,
                recipe TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    /// Drop every drink and start over with a single seeded drink.
    pub async fn reset(&self) -> Result<Drink> {
        tracing::warn!("Resetting drinks catalog");
        sqlx::query("DROP TABLE IF EXISTS drink")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        self.ensure_schema().await?;
        self.create(&Drink::water()).await
    }

    fn encode_recipe(recipe: &[Ingredient]) -> Result<String> {
        serde_json::to_string(recipe).map_err(|e| DatabaseError::QueryFailed(e.to_string()))
    }

    fn row_to_drink(row: &db::sqlx::sqlite::SqliteRow) -> Result<Drink> {
        let id: i64 = row.try_get("id").map_err(map_sqlx_error)?;
        let title: String = row.try_get("title").map_err(map_sqlx_error)?;
        let recipe: String = row.try_get("recipe").map_err(map_sqlx_error)?;
        let recipe = serde_json::from_str(&recipe).map_err(|e| {
            tracing::error!("Drink {} has an unreadable recipe: {}", id, e);
            DatabaseError::CorruptRecord(format!("drink {id}: {e}"))
        })?;

        Ok(Drink {
            id: Some(id),
            title,
            recipe,
        })
    }
}

#[async_trait]
impl DrinkRepository for SqliteDrinkRepository {
    async fn find_all(&self) -> Result<Vec<Drink>> {
        let rows = sqlx::query("SELECT id, title, recipe FROM drink ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        rows.iter().map(Self::row_to_drink).collect()
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Drink>> {
        let row = sqlx::query("SELECT id, title, recipe FROM drink WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        row.as_ref().map(Self::row_to_drink).transpose()
    }

    async fn create(&self, drink: &Drink) -> Result<Drink> {
        let recipe = Self::encode_recipe(&drink.recipe)?;
        let result = sqlx::query("INSERT INTO drink (title, recipe) VALUES (?, ?)")
            .bind(&drink.title)
            .bind(recipe)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let mut created = drink.clone();
        created.id = Some(result.last_insert_rowid());
        Ok(created)
    }

    async fn update(&self, drink: &Drink) -> Result<Drink> {
        let id = drink.id.ok_or(DatabaseError::NotFound)?;
        let recipe = Self::encode_recipe(&drink.recipe)?;
        let result = sqlx::query("UPDATE drink SET title = ?, recipe = ? WHERE id = ?")
            .bind(&drink.title)
            .bind(recipe)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound);
        }
        Ok(drink.clone())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM drink WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        db::health_check(&self.pool).await
    }
}
