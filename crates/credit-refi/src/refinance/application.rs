use serde::{Deserialize, Serialize};
use serde_json::json;

use super::catalog::CatalogProduct;
use super::offer::{round2, EnrichedObligation, DEFAULT_FALLBACK_TERM_MONTHS};
use crate::error::ApiError;

/// Client-supplied application input; everything beyond the agreement id is
/// an optional override over engine-computed values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationRequest {
    pub agreement_id: Option<String>,
    pub desired_term_months: Option<f64>,
    pub product_id: Option<String>,
    pub amount: Option<f64>,
    pub offer_term_months: Option<f64>,
    pub comment: Option<String>,
}

/// The one creation call issued downstream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateAgreementPayload {
    pub product_id: String,
    pub amount: f64,
    pub term_months: i64,
}

/// A fully resolved application: the payload plus the decision inputs kept
/// for the audit trail.
#[derive(Debug, Clone)]
pub struct ResolvedApplication {
    pub payload: CreateAgreementPayload,
    pub loan_snapshot: EnrichedObligation,
}

/// Reconcile conflicting inputs into one valid creation payload.
///
/// Resolution precedence follows the request → offer → obligation → product
/// chain; the resolved amount is clamped into the product's finite bounds.
pub fn resolve_application(
    agreement_id: &str,
    request: &ApplicationRequest,
    loans: &[EnrichedObligation],
    catalog: &[CatalogProduct],
) -> Result<ResolvedApplication, ApiError> {
    let loan = loans
        .iter()
        .find(|entry| entry.obligation.id == agreement_id)
        .ok_or_else(|| {
            ApiError::NotFound("Loan agreement not found for refinance application".to_string())
        })?;

    let offer = loan.refinance_offer.as_ref();

    let target_product_id = request
        .product_id
        .clone()
        .or_else(|| offer.and_then(|offer| offer.product_id.clone()))
        .or_else(|| catalog.first().map(|product| product.product_id.clone()))
        .ok_or_else(|| {
            ApiError::Conflict("No refinance offer available to create a product".to_string())
        })?;

    let product = catalog
        .iter()
        .find(|product| product.product_id == target_product_id)
        .ok_or_else(|| {
            ApiError::NotFound(format!(
                "Product {target_product_id} not found in bank catalogue"
            ))
        })?;

    let term_months = [
        request.desired_term_months,
        request.offer_term_months,
        offer.and_then(|offer| offer.product_term_months),
        offer.map(|offer| offer.assumptions.term_months),
        loan.obligation.remaining_term_months,
        product.term_months,
    ]
    .into_iter()
    .flatten()
    .find(|value| value.is_finite() && *value > 0.0)
    .unwrap_or(DEFAULT_FALLBACK_TERM_MONTHS)
    .round() as i64;

    let amount_candidates: Vec<f64> = [
        request.amount,
        offer.map(|offer| offer.assumptions.principal),
        Some(loan.obligation.principal),
        product.min_amount,
    ]
    .into_iter()
    .flatten()
    .filter(|value| value.is_finite() && *value > 0.0)
    .collect();

    let mut amount = *amount_candidates.first().ok_or_else(|| ApiError::Validation {
        message: "Unable to determine refinance amount for product creation".to_string(),
        details: Some(json!({
            "candidate_amounts": &amount_candidates,
            "provided_amount": request.amount,
            "source_loan_amount": loan.obligation.principal,
            "offer": offer,
        })),
    })?;

    if let Some(min) = product.min_amount.filter(|min| min.is_finite()) {
        if amount < min {
            amount = min;
        }
    }
    if let Some(max) = product.max_amount.filter(|max| max.is_finite()) {
        if amount > max {
            amount = max;
        }
    }

    Ok(ResolvedApplication {
        payload: CreateAgreementPayload {
            product_id: target_product_id,
            amount: round2(amount),
            term_months,
        },
        loan_snapshot: loan.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refinance::obligation::Obligation;
    use crate::refinance::offer::enrich_with_offers;
    use serde_json::json;

    fn catalog() -> Vec<CatalogProduct> {
        vec![
            CatalogProduct {
                product_id: "refi-a".to_string(),
                product_name: "Refi A".to_string(),
                interest_rate: 9.5,
                min_amount: Some(100_000.0),
                max_amount: Some(2_000_000.0),
                term_months: Some(84.0),
            },
            CatalogProduct {
                product_id: "refi-b".to_string(),
                product_name: "Refi B".to_string(),
                interest_rate: 10.0,
                min_amount: None,
                max_amount: Some(1_500_000.0),
                term_months: Some(60.0),
            },
        ]
    }

    fn loans() -> Vec<EnrichedObligation> {
        let external = Obligation::from_external_loan(
            &json!({
                "agreement_id": "ext-1",
                "amount": 900_000,
                "interest_rate": 9.2,
                "term_months": 96,
                "remaining_term_months": 90,
            }),
            "vbank",
        )
        .expect("external loan normalizes");
        let internal = Obligation::from_internal_agreement(&json!({
            "agreement_id": "int-1",
            "product_type": "loan",
            "amount": 450_000,
            "interest_rate": 13.5,
        }))
        .expect("internal loan normalizes");

        enrich_with_offers(vec![internal, external], &catalog())
    }

    #[test]
    fn unknown_agreement_is_not_found() {
        let error = resolve_application("missing", &ApplicationRequest::default(), &loans(), &catalog())
            .expect_err("must fail");
        assert!(matches!(error, ApiError::NotFound(_)));
    }

    #[test]
    fn offer_product_and_terms_drive_the_payload() {
        let resolved =
            resolve_application("ext-1", &ApplicationRequest::default(), &loans(), &catalog())
                .expect("resolves");
        // The offer selected refi-a (lower rate); its product term wins the
        // precedence chain because no override is present.
        assert_eq!(resolved.payload.product_id, "refi-a");
        assert_eq!(resolved.payload.term_months, 84);
        assert_eq!(resolved.payload.amount, 900_000.0);
        assert!(resolved.loan_snapshot.refinance_offer.is_some());
    }

    #[test]
    fn explicit_overrides_win_over_offer_values() {
        let request = ApplicationRequest {
            product_id: Some("refi-b".to_string()),
            desired_term_months: Some(36.0),
            amount: Some(1_000_000.0),
            ..ApplicationRequest::default()
        };
        let resolved = resolve_application("ext-1", &request, &loans(), &catalog())
            .expect("resolves");
        assert_eq!(resolved.payload.product_id, "refi-b");
        assert_eq!(resolved.payload.term_months, 36);
        assert_eq!(resolved.payload.amount, 1_000_000.0);
    }

    #[test]
    fn amount_is_clamped_into_product_bounds() {
        let request = ApplicationRequest {
            amount: Some(5_000_000.0),
            ..ApplicationRequest::default()
        };
        let resolved = resolve_application("ext-1", &request, &loans(), &catalog())
            .expect("resolves");
        assert_eq!(resolved.payload.amount, 2_000_000.0, "clamped to max");

        let request = ApplicationRequest {
            amount: Some(50_000.0),
            ..ApplicationRequest::default()
        };
        let resolved = resolve_application("ext-1", &request, &loans(), &catalog())
            .expect("resolves");
        assert_eq!(resolved.payload.amount, 100_000.0, "raised to min");
    }

    #[test]
    fn unknown_product_override_is_not_found() {
        let request = ApplicationRequest {
            product_id: Some("refi-z".to_string()),
            ..ApplicationRequest::default()
        };
        let error = resolve_application("ext-1", &request, &loans(), &catalog())
            .expect_err("must fail");
        assert!(matches!(error, ApiError::NotFound(_)));
    }

    #[test]
    fn empty_catalog_without_offer_is_a_conflict() {
        let external = Obligation::from_external_loan(
            &json!({ "agreement_id": "ext-2", "amount": 100_000 }),
            "abank",
        )
        .expect("normalizes");
        let loans = enrich_with_offers(vec![external], &[]);
        let error = resolve_application("ext-2", &ApplicationRequest::default(), &loans, &[])
            .expect_err("must fail");
        assert!(matches!(error, ApiError::Conflict(_)));
    }

    #[test]
    fn internal_loan_without_offer_falls_back_to_first_catalog_product() {
        let resolved =
            resolve_application("int-1", &ApplicationRequest::default(), &loans(), &catalog())
                .expect("resolves");
        assert_eq!(resolved.payload.product_id, "refi-a");
        // Internal loan has no offer and no remaining term: product term wins.
        assert_eq!(resolved.payload.term_months, 84);
        assert_eq!(resolved.payload.amount, 450_000.0);
    }

    #[test]
    fn unresolvable_amount_is_a_validation_error() {
        let external = Obligation::from_external_loan(
            &json!({ "agreement_id": "ext-3", "amount": 0 }),
            "abank",
        )
        .expect("normalizes");
        let catalog = vec![CatalogProduct {
            product_id: "refi-c".to_string(),
            product_name: "Refi C".to_string(),
            interest_rate: 9.0,
            min_amount: None,
            max_amount: None,
            term_months: None,
        }];
        let loans = enrich_with_offers(vec![external], &catalog);
        let error = resolve_application("ext-3", &ApplicationRequest::default(), &loans, &catalog)
            .expect_err("must fail");
        assert!(matches!(error, ApiError::Validation { .. }));
    }
}
