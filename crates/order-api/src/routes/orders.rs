//! Order placement and lookup endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use common::{OrderNumber, SkuCode};
use domain::{CommittedOrder, DegradedCause, Money, PlacementOutcome};
use order_store::OrderRepository;
use placement::{LineItemRequest, PlaceOrderRequest};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

/// Message returned whenever inventory could not be consulted.
pub const FALLBACK_MESSAGE: &str = "Oops! Something went wrong, please order after some time!";

/// Message returned on a committed placement.
pub const PLACED_MESSAGE: &str = "Order Placed Successfully";

// -- Request types --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub order_line_items_dto_list: Vec<OrderLineItemDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineItemDto {
    pub sku_code: String,
    pub price: PriceInput,
    pub quantity: u32,
}

/// A price sent either as a JSON number (`10.5`) or a string (`"10.50"`).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PriceInput {
    Number(serde_json::Number),
    Text(String),
}

impl PriceInput {
    fn to_money(&self) -> Result<Money, ApiError> {
        let text = match self {
            PriceInput::Number(n) => n.to_string(),
            PriceInput::Text(s) => s.clone(),
        };
        Money::parse_decimal(&text).map_err(|e| ApiError::BadRequest(e.to_string()))
    }
}

impl OrderRequest {
    fn into_placement(self) -> Result<PlaceOrderRequest, ApiError> {
        let items = self
            .order_line_items_dto_list
            .into_iter()
            .map(|line| {
                Ok(LineItemRequest::new(
                    line.sku_code,
                    line.price.to_money()?,
                    line.quantity,
                ))
            })
            .collect::<Result<Vec<_>, ApiError>>()?;
        Ok(PlaceOrderRequest::new(items))
    }
}

// -- Response types --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPlacedResponse {
    pub order_number: OrderNumber,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRejectedResponse {
    pub order_number: OrderNumber,
    pub message: String,
    pub unavailable_skus: Vec<SkuCode>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceUnavailableResponse {
    pub message: &'static str,
    pub cause: DegradedCause,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub order_number: OrderNumber,
    pub state: String,
    pub line_items: Vec<OrderLineResponse>,
    pub total_amount: String,
    pub committed_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineResponse {
    pub sku_code: SkuCode,
    pub price: String,
    pub quantity: u32,
}

impl From<&CommittedOrder> for OrderResponse {
    fn from(order: &CommittedOrder) -> Self {
        Self {
            order_number: order.order_number(),
            state: order.state().to_string(),
            line_items: order
                .line_items()
                .iter()
                .map(|item| OrderLineResponse {
                    sku_code: item.sku.clone(),
                    price: item.unit_price.to_decimal_string(),
                    quantity: item.quantity,
                })
                .collect(),
            total_amount: order.total_amount().to_decimal_string(),
            committed_at: order.committed_at().to_rfc3339(),
        }
    }
}

fn outcome_to_response(outcome: PlacementOutcome) -> Response {
    match outcome {
        PlacementOutcome::Committed { order_number } => (
            StatusCode::CREATED,
            Json(OrderPlacedResponse {
                order_number,
                message: PLACED_MESSAGE,
            }),
        )
            .into_response(),
        PlacementOutcome::Rejected(reason) => (
            StatusCode::CONFLICT,
            Json(OrderRejectedResponse {
                order_number: reason.order_number,
                message: reason.to_string(),
                unavailable_skus: reason.unavailable,
            }),
        )
            .into_response(),
        PlacementOutcome::Unavailable(degraded) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ServiceUnavailableResponse {
                message: FALLBACK_MESSAGE,
                cause: degraded.cause,
            }),
        )
            .into_response(),
    }
}

// -- Handlers --

/// POST /api/order: places an order after checking inventory.
#[tracing::instrument(skip_all)]
pub async fn place(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<OrderRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let request = req.into_placement()?;

    let outcome = state.coordinator.place_async(request).await?;
    Ok(outcome_to_response(outcome))
}

/// GET /api/order/{orderNumber}: returns a committed order.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(order_number): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_number: OrderNumber = order_number
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid order number: {e}")))?;

    let order = state
        .coordinator
        .repository()
        .find(order_number)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order not found: {order_number}")))?;

    Ok(Json(OrderResponse::from(&order)))
}
