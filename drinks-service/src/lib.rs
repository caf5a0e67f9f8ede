//! Drinks Service
//!
//! This crate provides the drinks catalog: models, storage and the
//! business rules the gateway calls in-process.

pub mod models;
pub mod repository;
pub mod service;

pub use models::{Drink, DrinkDetail, DrinkPatch, DrinkSummary, Ingredient, NewDrink};
pub use repository::{DrinkRepository, InMemoryRepository, SqliteDrinkRepository};
pub use service::{DrinkService, ServiceError};
