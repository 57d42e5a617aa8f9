//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};

use orderflow_types::{AppError, EventPublisher, OrderId, OrderRepository};

use crate::service::{CreateOrderRequest, OrderService};

/// Application state shared across handlers.
pub struct AppState<R: OrderRepository, P: EventPublisher> {
    pub service: OrderService<R, P>,
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Unavailable(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message,
            "code": status.as_u16()
        });

        (status, Json(body)).into_response()
    }
}

/// Response for a created order.
#[derive(serde::Serialize)]
pub struct CreateOrderResponse {
    pub order_id: i64,
    pub created_at: DateTime<Utc>,
    pub message: String,
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

/// Create an order and announce it on the bus.
#[tracing::instrument(skip(state, req), fields(user_id = req.user_id))]
pub async fn create_order<R: OrderRepository, P: EventPublisher>(
    State(state): State<Arc<AppState<R, P>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state.service.create_order(req).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateOrderResponse {
            order_id: order.id.get(),
            created_at: order.created_at,
            message: "Order created and event published".into(),
        }),
    ))
}

/// List recent orders.
#[tracing::instrument(skip(state))]
pub async fn list_orders<R: OrderRepository, P: EventPublisher>(
    State(state): State<Arc<AppState<R, P>>>,
) -> Result<impl IntoResponse, ApiError> {
    let orders = state.service.list_orders().await?;
    Ok(Json(orders))
}

/// Get order by ID.
#[tracing::instrument(skip(state), fields(order_id = %id))]
pub async fn get_order<R: OrderRepository, P: EventPublisher>(
    State(state): State<Arc<AppState<R, P>>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state.service.get_order(OrderId::new(id)).await?;
    Ok(Json(order))
}
