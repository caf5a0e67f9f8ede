//! HTTP routes
//!
//! Protected handlers call the guard before touching the catalog, so a
//! rejected request never reaches storage.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde_json::{json, Value};

use auth::{Claims, Permission};
use drinks_service::{DrinkPatch, NewDrink};

use crate::error::ApiError;
use crate::state::AppContext;

type ApiResult = Result<Json<Value>, ApiError>;

/// Build the gateway router
pub fn router(ctx: AppContext) -> Router {
    Router::new()
        .route("/drinks", get(list_drinks).post(create_drink))
        .route("/drinks-detail", get(list_drink_details))
        .route("/drinks/:id", patch(update_drink).delete(delete_drink))
        .route("/health", get(health))
        .fallback(not_found)
        .with_state(ctx)
}

async fn require(
    ctx: &AppContext,
    headers: &HeaderMap,
    scope: Permission,
) -> Result<Claims, ApiError> {
    let header = headers
        .get(header::AUTHORIZATION)
        .map(|value| value.to_str().unwrap_or_default());
    Ok(ctx.guard.authorize(header, scope.as_str()).await?)
}

fn drink_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::not_found(format!("drink {raw}")))
}

/// GET /drinks
async fn list_drinks(State(ctx): State<AppContext>) -> ApiResult {
    let drinks = ctx.drinks.list_summaries().await.map_err(|e| {
        tracing::error!("Failed to list drinks: {}", e);
        ApiError::unprocessable("listing failed")
    })?;

    Ok(Json(json!({ "success": true, "drinks": drinks })))
}

/// GET /drinks-detail
async fn list_drink_details(State(ctx): State<AppContext>, headers: HeaderMap) -> ApiResult {
    require(&ctx, &headers, Permission::GetDrinksDetail).await?;

    let drinks = ctx.drinks.list_details().await.map_err(|e| {
        tracing::error!("Failed to list drink details: {}", e);
        ApiError::unprocessable("listing failed")
    })?;

    Ok(Json(json!({ "success": true, "drinks": drinks })))
}

/// POST /drinks
async fn create_drink(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    body: Result<Json<NewDrink>, JsonRejection>,
) -> ApiResult {
    let claims = require(&ctx, &headers, Permission::PostDrinks).await?;

    let Json(input) = body.map_err(|e| ApiError::unprocessable(e.body_text()))?;
    let drink = ctx.drinks.create(input).await?;
    tracing::debug!("Drink {} created by {:?}", drink.id, claims.sub);

    Ok(Json(json!({ "success": true, "drinks": [drink] })))
}

/// PATCH /drinks/:id
async fn update_drink(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Result<Json<DrinkPatch>, JsonRejection>,
) -> ApiResult {
    require(&ctx, &headers, Permission::PatchDrinks).await?;

    let id = drink_id(&id)?;
    let Json(patch) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let drink = ctx.drinks.update(id, patch).await?;

    Ok(Json(json!({ "success": true, "drinks": [drink] })))
}

/// DELETE /drinks/:id
async fn delete_drink(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult {
    require(&ctx, &headers, Permission::DeleteDrinks).await?;

    let id = drink_id(&id)?;
    let deleted = ctx.drinks.delete(id).await?;

    Ok(Json(json!({ "success": true, "delete": deleted })))
}

/// GET /health
async fn health(State(ctx): State<AppContext>) -> ApiResult {
    ctx.drinks.ping().await?;
    Ok(Json(json!({ "success": true, "version": ctx.config.version })))
}

async fn not_found() -> ApiError {
    ApiError::not_found("route")
}
