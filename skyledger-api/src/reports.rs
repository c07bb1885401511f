use axum::{
    extract::{Query, State},
    routing::get,
    Extension, Json, Router,
};
use serde::Deserialize;

use skyledger_core::report::{FlightLoad, FlightRevenue, MonthlyRevenue, RouteVolume};

use crate::{error::AppError, middleware::Principal, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/reports/top-routes", get(top_routes))
        .route("/v1/reports/revenue-by-month", get(revenue_by_month))
        .route("/v1/reports/load-factor", get(load_factor))
        .route("/v1/reports/revenue-by-flight", get(revenue_by_flight))
}

#[derive(Debug, Deserialize)]
struct TopRoutesQuery {
    limit: Option<i64>,
}

async fn top_routes(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
    Query(query): Query<TopRoutesQuery>,
) -> Result<Json<Vec<RouteVolume>>, AppError> {
    Ok(Json(state.reports.top_routes(role, query.limit).await?))
}

async fn revenue_by_month(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
) -> Result<Json<Vec<MonthlyRevenue>>, AppError> {
    Ok(Json(state.reports.revenue_by_month(role).await?))
}

async fn load_factor(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
) -> Result<Json<Vec<FlightLoad>>, AppError> {
    Ok(Json(state.reports.load_factor(role).await?))
}

async fn revenue_by_flight(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
) -> Result<Json<Vec<FlightRevenue>>, AppError> {
    Ok(Json(state.reports.revenue_by_flight(role).await?))
}
