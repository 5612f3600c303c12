use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};

use super::application::ApplicationRequest;
use super::service::{
    ActiveLoans, BankStatusEnvelope, RefinanceService, SubmittedApplication, Suggestions,
};
use crate::error::ApiError;
use crate::upstream::external::BankHealthReport;
use crate::upstream::gateway::{CatalogGateway, LoanGateway};

/// Router builder exposing the loan and refinance endpoints.
pub fn refinance_router<L, C>(service: Arc<RefinanceService<L, C>>) -> Router
where
    L: LoanGateway + 'static,
    C: CatalogGateway + 'static,
{
    Router::new()
        .route("/api/loans/active", get(active_loans_handler::<L, C>))
        .route(
            "/api/refinance/suggestions",
            get(suggestions_handler::<L, C>),
        )
        .route(
            "/api/refinance/applications",
            post(submit_application_handler::<L, C>),
        )
        .route("/api/refinance/status", get(bank_status_handler::<L, C>))
        .route(
            "/api/refinance/banks/health",
            get(banks_health_handler::<L, C>),
        )
        .with_state(service)
}

/// The raw `Authorization` header, forwarded verbatim to upstreams.
fn auth_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
}

pub(crate) async fn active_loans_handler<L, C>(
    State(service): State<Arc<RefinanceService<L, C>>>,
    headers: HeaderMap,
) -> Result<Json<ActiveLoans>, ApiError>
where
    L: LoanGateway + 'static,
    C: CatalogGateway + 'static,
{
    Ok(Json(service.active_loans(auth_header(&headers)).await?))
}

pub(crate) async fn suggestions_handler<L, C>(
    State(service): State<Arc<RefinanceService<L, C>>>,
    headers: HeaderMap,
) -> Result<Json<Suggestions>, ApiError>
where
    L: LoanGateway + 'static,
    C: CatalogGateway + 'static,
{
    Ok(Json(service.suggestions(auth_header(&headers)).await?))
}

pub(crate) async fn submit_application_handler<L, C>(
    State(service): State<Arc<RefinanceService<L, C>>>,
    headers: HeaderMap,
    Json(request): Json<ApplicationRequest>,
) -> Result<(StatusCode, Json<SubmittedApplication>), ApiError>
where
    L: LoanGateway + 'static,
    C: CatalogGateway + 'static,
{
    let submitted = service
        .submit_application(auth_header(&headers), request)
        .await?;
    Ok((StatusCode::CREATED, Json(submitted)))
}

pub(crate) async fn bank_status_handler<L, C>(
    State(service): State<Arc<RefinanceService<L, C>>>,
    headers: HeaderMap,
) -> Result<Json<BankStatusEnvelope>, ApiError>
where
    L: LoanGateway + 'static,
    C: CatalogGateway + 'static,
{
    Ok(Json(service.bank_status(auth_header(&headers)).await?))
}

pub(crate) async fn banks_health_handler<L, C>(
    State(service): State<Arc<RefinanceService<L, C>>>,
) -> Json<Vec<BankHealthReport>>
where
    L: LoanGateway + 'static,
    C: CatalogGateway + 'static,
{
    Json(service.banks_health().await)
}
