//! Stock lookup endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use common::SkuCode;
use domain::Availability;

use crate::stock::StockTable;

/// Query parameter carrying one sku. Repeated once per sku.
pub const SKU_PARAM: &str = "skuCode";

/// GET /api/inventory?skuCode=a&skuCode=b: reports which known skus are in stock.
#[tracing::instrument(skip_all)]
pub async fn is_in_stock(
    State(stock): State<Arc<StockTable>>,
    Query(params): Query<Vec<(String, String)>>,
) -> Json<Vec<Availability>> {
    let skus: Vec<SkuCode> = params
        .into_iter()
        .filter(|(key, _)| key == SKU_PARAM)
        .map(|(_, value)| SkuCode::new(value))
        .collect();

    let answer = stock.is_in_stock(&skus);
    metrics::counter!("inventory_lookups_total").increment(1);
    tracing::debug!(requested = skus.len(), known = answer.len(), "stock checked");

    Json(answer)
}
