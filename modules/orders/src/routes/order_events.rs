//! Order event history route

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::OrdersError;
use crate::models::OrderEventView;
use crate::service::{self, AppState};

/// Query parameters for GET /orders/events
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEventsQuery {
    pub email: String,
    /// Full event type (e.g. `ORDER_DELETED`); omitted means the whole
    /// ORDER_ family
    pub event_type: Option<String>,
}

/// Handler for GET /orders/events?email[&eventType]
pub async fn get_order_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<OrderEventsQuery>,
) -> Result<Json<Vec<OrderEventView>>, OrdersError> {
    let events =
        service::get_order_events(&state, &params.email, params.event_type.as_deref()).await?;
    Ok(Json(events))
}
