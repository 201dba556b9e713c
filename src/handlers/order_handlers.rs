use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;

use crate::{
    error::{AppError, Result},
    models::order::Order,
    AppState,
};

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 500;

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub limit: Option<i64>,
}

pub async fn list_orders_handler(
    State(state): State<AppState>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<Order>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {}",
            MAX_LIMIT
        )));
    }

    let orders = state.order_repository.list_recent(limit).await?;
    Ok(Json(orders))
}

pub async fn get_order_handler(
    State(state): State<AppState>,
    Path(checkout_id): Path<String>,
) -> Result<Json<Order>> {
    state
        .order_repository
        .find_by_checkout_id(&checkout_id)
        .await?
        .map(Json)
        .ok_or(AppError::OrderNotFound)
}
