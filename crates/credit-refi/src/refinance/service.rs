use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::application::{resolve_application, ApplicationRequest};
use super::catalog::CatalogProduct;
use super::obligation::Obligation;
use super::offer::{enrich_with_offers, EnrichedObligation, Offer};
use crate::error::ApiError;
use crate::upstream::external::{BankHealthReport, BankStatusSnapshot};
use crate::upstream::gateway::{CatalogGateway, LoanGateway};

/// Whether request handlers demand a bearer token before touching
/// upstreams. Sample deployments relax the check for read paths, since no
/// real consent is involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Required,
    OptionalForSampleData,
}

/// Service composing the loan aggregator, catalog resolver, offer engine,
/// and application resolver behind one request-facing facade.
pub struct RefinanceService<L, C> {
    loans: Arc<L>,
    catalog: Arc<C>,
    auth_mode: AuthMode,
}

impl<L, C> RefinanceService<L, C>
where
    L: LoanGateway + 'static,
    C: CatalogGateway + 'static,
{
    pub fn new(loans: Arc<L>, catalog: Arc<C>, auth_mode: AuthMode) -> Self {
        Self {
            loans,
            catalog,
            auth_mode,
        }
    }

    /// Balance-enriched internal loans. Always authenticated.
    pub async fn active_loans(&self, auth: Option<&str>) -> Result<ActiveLoans, ApiError> {
        let auth = require_auth(auth)?;
        let data = self.loans.active_loans(auth).await?;
        Ok(ActiveLoans {
            meta: CollectionMeta { total: data.len() },
            data,
        })
    }

    /// All obligations with their computed refinance offers.
    pub async fn suggestions(&self, auth: Option<&str>) -> Result<Suggestions, ApiError> {
        let auth = self.authorize(auth)?;
        let (obligations, catalog) = self.gather(auth).await?;

        let external_sources = obligations
            .iter()
            .filter(|obligation| obligation.is_external())
            .count();
        let data = enrich_with_offers(obligations, &catalog);

        Ok(Suggestions {
            meta: SuggestionsMeta {
                total: data.len(),
                bank_products_considered: catalog.len(),
                external_sources,
            },
            data,
        })
    }

    /// Resolve the request into one creation payload and issue exactly one
    /// downstream creation call.
    pub async fn submit_application(
        &self,
        auth: Option<&str>,
        request: ApplicationRequest,
    ) -> Result<SubmittedApplication, ApiError> {
        let agreement_id = request
            .agreement_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ApiError::validation("agreement_id is required"))?;

        let auth = self.authorize(auth)?;
        let (obligations, catalog) = self.gather(auth).await?;
        let enriched = enrich_with_offers(obligations, &catalog);

        let resolved = resolve_application(&agreement_id, &request, &enriched, &catalog)?;
        info!(
            %agreement_id,
            product_id = %resolved.payload.product_id,
            amount = resolved.payload.amount,
            term_months = resolved.payload.term_months,
            "creating refinance product agreement"
        );

        let created = self.loans.create_agreement(&auth, &resolved.payload).await?;

        Ok(SubmittedApplication {
            status: created.status,
            data: SubmittedAgreement {
                agreement: created.agreement,
            },
            meta: ApplicationMeta {
                agreement_id,
                product_id: resolved.payload.product_id,
                amount: resolved.payload.amount,
                term_months: resolved.payload.term_months,
                comment: request.comment,
                offer: resolved.loan_snapshot.refinance_offer.clone(),
                loan_snapshot: resolved.loan_snapshot,
            },
        })
    }

    /// Per-bank reachability, authenticated.
    pub async fn bank_status(&self, auth: Option<&str>) -> Result<BankStatusEnvelope, ApiError> {
        require_auth(auth)?;
        Ok(BankStatusEnvelope {
            data: BankStatusSnapshot {
                banks: self.loans.bank_health().await,
                last_checked: Utc::now(),
            },
        })
    }

    /// Unauthenticated reachability listing for dashboards.
    pub async fn banks_health(&self) -> Vec<BankHealthReport> {
        self.loans.bank_health().await
    }

    /// Aggregator and catalog resolver run concurrently; the internal
    /// ledger is the only required branch.
    async fn gather(&self, auth: &str) -> Result<(Vec<Obligation>, Vec<CatalogProduct>), ApiError> {
        let (obligations, catalog) = tokio::join!(
            self.loans.collect_obligations(auth),
            self.catalog.resolve_catalog()
        );
        Ok((obligations?, catalog))
    }

    fn authorize<'a>(&self, auth: Option<&'a str>) -> Result<&'a str, ApiError> {
        match self.auth_mode {
            AuthMode::Required => require_auth(auth),
            AuthMode::OptionalForSampleData => Ok(auth.unwrap_or_default()),
        }
    }
}

fn require_auth(auth: Option<&str>) -> Result<&str, ApiError> {
    auth.filter(|token| !token.trim().is_empty())
        .ok_or(ApiError::Unauthenticated)
}

#[derive(Debug, Serialize)]
pub struct CollectionMeta {
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct ActiveLoans {
    pub data: Vec<Obligation>,
    pub meta: CollectionMeta,
}

#[derive(Debug, Serialize)]
pub struct SuggestionsMeta {
    pub total: usize,
    pub bank_products_considered: usize,
    pub external_sources: usize,
}

#[derive(Debug, Serialize)]
pub struct Suggestions {
    pub data: Vec<EnrichedObligation>,
    pub meta: SuggestionsMeta,
}

#[derive(Debug, Serialize)]
pub struct SubmittedAgreement {
    pub agreement: Value,
}

#[derive(Debug, Serialize)]
pub struct ApplicationMeta {
    pub agreement_id: String,
    pub product_id: String,
    pub amount: f64,
    pub term_months: i64,
    pub comment: Option<String>,
    pub offer: Option<Offer>,
    pub loan_snapshot: EnrichedObligation,
}

#[derive(Debug, Serialize)]
pub struct SubmittedApplication {
    pub status: String,
    pub data: SubmittedAgreement,
    pub meta: ApplicationMeta,
}

#[derive(Debug, Serialize)]
pub struct BankStatusEnvelope {
    pub data: BankStatusSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::sample::{SampleCatalogGateway, SampleLoanGateway};

    fn sample_service() -> RefinanceService<SampleLoanGateway, SampleCatalogGateway> {
        RefinanceService::new(
            Arc::new(SampleLoanGateway),
            Arc::new(SampleCatalogGateway),
            AuthMode::OptionalForSampleData,
        )
    }

    fn strict_service() -> RefinanceService<SampleLoanGateway, SampleCatalogGateway> {
        RefinanceService::new(
            Arc::new(SampleLoanGateway),
            Arc::new(SampleCatalogGateway),
            AuthMode::Required,
        )
    }

    #[tokio::test]
    async fn active_loans_always_require_auth() {
        let error = sample_service()
            .active_loans(None)
            .await
            .expect_err("must fail");
        assert!(matches!(error, ApiError::Unauthenticated));
    }

    #[tokio::test]
    async fn suggestions_skip_auth_only_in_sample_mode() {
        let suggestions = sample_service()
            .suggestions(None)
            .await
            .expect("sample mode needs no token");
        assert_eq!(suggestions.meta.total, 2);
        assert_eq!(suggestions.meta.external_sources, 1);
        assert_eq!(suggestions.meta.bank_products_considered, 3);

        let error = strict_service()
            .suggestions(None)
            .await
            .expect_err("must fail");
        assert!(matches!(error, ApiError::Unauthenticated));
    }

    #[tokio::test]
    async fn suggestions_are_deterministic_over_sample_data() {
        let first = sample_service().suggestions(None).await.expect("builds");
        let second = sample_service().suggestions(None).await.expect("builds");

        let internal = &first.data[0];
        assert!(internal.refinance_offer.is_none());

        let external = first.data[1].refinance_offer.as_ref().expect("offer");
        assert_eq!(external.product_id.as_deref(), Some("sample-refi-9"));
        assert_eq!(external.suggested_rate, 9.0);
        // (9.2 - 9.0) * 900 000 * 96 / 1200
        assert_eq!(external.savings, 14_400.0);
        assert_eq!(
            second.data[1].refinance_offer.as_ref().expect("offer"),
            external
        );
    }

    #[tokio::test]
    async fn application_resolves_against_sample_offer() {
        let submitted = sample_service()
            .submit_application(
                None,
                ApplicationRequest {
                    agreement_id: Some("sample-loan-external-1".to_string()),
                    ..ApplicationRequest::default()
                },
            )
            .await
            .expect("application resolves");

        assert_eq!(submitted.meta.product_id, "sample-refi-9");
        assert_eq!(submitted.meta.amount, 900_000.0);
        // Offer product term (60) wins over the loan's remaining term.
        assert_eq!(submitted.meta.term_months, 60);
        assert_eq!(submitted.status, "sample-submitted");
        assert!(submitted.meta.offer.is_some());
    }

    #[tokio::test]
    async fn missing_agreement_id_is_a_validation_error() {
        let error = sample_service()
            .submit_application(None, ApplicationRequest::default())
            .await
            .expect_err("must fail");
        assert!(matches!(error, ApiError::Validation { .. }));
    }

    #[tokio::test]
    async fn bank_status_requires_auth_even_in_sample_mode() {
        let error = sample_service()
            .bank_status(None)
            .await
            .expect_err("must fail");
        assert!(matches!(error, ApiError::Unauthenticated));

        let envelope = sample_service()
            .bank_status(Some("Bearer sample"))
            .await
            .expect("status builds");
        assert_eq!(envelope.data.banks.len(), 3);
    }
}
