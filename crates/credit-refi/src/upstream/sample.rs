//! Deterministic static sample providers.
//!
//! These implement the same gateway traits as the live clients so sample
//! mode exercises the real offer-engine and application-resolver paths.
//! Also the source of the built-in catalog used when every live catalog
//! source comes back empty.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use super::external::{BankHealthReport, BankStatus};
use super::gateway::{CatalogGateway, CreatedAgreement, LoanGateway};
use crate::error::UpstreamError;
use crate::refinance::application::CreateAgreementPayload;
use crate::refinance::catalog::{normalize_products, CatalogProduct};
use crate::refinance::obligation::Obligation;

static AGREEMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Raw catalog records in the legacy banker shape, so the fallback path
/// runs through the same normalizer as live data.
pub fn sample_product_records() -> Vec<Value> {
    vec![
        json!({
            "id": "sample-refi-9",
            "bank_code": "self",
            "name": "Wow Loan 9% (sample)",
            "min_rate": 9,
            "max_rate": 9,
            "term_months": { "min": 12, "max": 60 },
            "max_amount": 1_500_000,
            "processing_fee": 0,
        }),
        json!({
            "id": "sample-refi-1",
            "bank_code": "vbank",
            "name": "VBank Refinancing 9.5%",
            "min_rate": 9.5,
            "max_rate": 11,
            "term_months": { "min": 12, "max": 84 },
            "max_amount": 2_000_000,
            "processing_fee": 0.5,
        }),
        json!({
            "id": "sample-refi-2",
            "bank_code": "abank",
            "name": "ABank Cashback Loan",
            "min_rate": 10,
            "max_rate": 12,
            "term_months": { "min": 6, "max": 84 },
            "max_amount": 1_500_000,
            "processing_fee": 1.5,
        }),
    ]
}

/// The built-in catalog used when every live source comes back empty.
pub fn sample_catalog() -> Vec<CatalogProduct> {
    normalize_products(&sample_product_records())
}

/// One internal and one partner-bank loan, covering both offer paths.
pub fn sample_obligations() -> Vec<Obligation> {
    let records = [
        (
            json!({
                "agreement_id": "sample-loan-internal-1",
                "source": "internal",
                "product_type": "loan",
                "amount": 450_000,
                "currency": "RUB",
                "interest_rate": 13.5,
                "term_months": 40,
                "remaining_term_months": 40,
                "origin_bank": "self",
                "account_number": "40817810099910004312",
            }),
            "self",
        ),
        (
            json!({
                "agreement_id": "sample-loan-external-1",
                "source": "external",
                "product_type": "loan",
                "amount": 900_000,
                "currency": "RUB",
                "interest_rate": 9.2,
                "term_months": 96,
                "remaining_term_months": 96,
                "origin_bank": "vbank",
                "account_number": "40817810099910001234",
            }),
            "vbank",
        ),
    ];

    records
        .iter()
        .filter_map(|(record, bank)| Obligation::from_external_loan(record, bank))
        .collect()
}

/// Only the partner-bank side of the sample set, for deployments that
/// substitute external banks while keeping the internal ledger live.
pub fn sample_external_obligations() -> Vec<Obligation> {
    sample_obligations()
        .into_iter()
        .filter(Obligation::is_external)
        .collect()
}

fn sample_balance(amount: f64, currency: &str) -> Value {
    json!([{ "amount": amount, "currency": currency }])
}

pub fn sample_bank_health() -> Vec<BankHealthReport> {
    let entry = |code: &str, name: &str, status: BankStatus, http_status, message: Option<&str>| {
        let base_url = format!("http://{code}.sample.internal");
        BankHealthReport {
            code: code.to_string(),
            name: name.to_string(),
            health_url: format!("{base_url}/health"),
            base_url,
            status,
            http_status,
            message: message.map(str::to_string),
        }
    };

    vec![
        entry("vbank", "Virtual Bank", BankStatus::Up, Some(200), None),
        entry("abank", "Awesome Bank", BankStatus::Up, Some(200), None),
        entry(
            "sbank",
            "Smart Bank",
            BankStatus::Down,
            None,
            Some("Unreachable"),
        ),
    ]
}

/// Sample stand-in for the internal ledger and partner banks.
#[derive(Debug, Clone, Default)]
pub struct SampleLoanGateway;

#[async_trait]
impl LoanGateway for SampleLoanGateway {
    async fn active_loans(&self, _auth: &str) -> Result<Vec<Obligation>, UpstreamError> {
        Ok(sample_obligations()
            .into_iter()
            .map(|mut loan| {
                loan.account_id = loan.account_number.as_ref().map(|number| {
                    format!("acc-{}", &number[number.len().saturating_sub(4)..])
                });
                loan.balance = Some(sample_balance(loan.principal, "RUB"));
                loan
            })
            .collect())
    }

    async fn collect_obligations(&self, _auth: &str) -> Result<Vec<Obligation>, UpstreamError> {
        Ok(sample_obligations())
    }

    async fn create_agreement(
        &self,
        _auth: &str,
        payload: &CreateAgreementPayload,
    ) -> Result<CreatedAgreement, UpstreamError> {
        let sequence = AGREEMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Ok(CreatedAgreement {
            status: "sample-submitted".to_string(),
            agreement: json!({
                "agreement_id": format!("agr-sample-{sequence:06}"),
                "product_id": payload.product_id,
                "product_type": "loan",
                "amount": payload.amount,
                "term_months": payload.term_months,
                "status": "pending",
                "start_date": Utc::now().to_rfc3339(),
                "end_date": null,
                "account_number": null,
            }),
        })
    }

    async fn bank_health(&self) -> Vec<BankHealthReport> {
        sample_bank_health()
    }
}

/// Sample stand-in for the catalog sources.
#[derive(Debug, Clone, Default)]
pub struct SampleCatalogGateway;

#[async_trait]
impl CatalogGateway for SampleCatalogGateway {
    async fn resolve_catalog(&self) -> Vec<CatalogProduct> {
        sample_catalog()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refinance::obligation::Provenance;

    #[test]
    fn sample_catalog_survives_normalization() {
        let catalog = sample_catalog();
        assert_eq!(catalog.len(), 3);
        // Rates resolve to the range lower bound, terms to the upper.
        assert_eq!(catalog[0].interest_rate, 9.0);
        assert_eq!(catalog[0].term_months, Some(60.0));
        assert_eq!(catalog[1].max_amount, Some(2_000_000.0));
    }

    #[test]
    fn sample_obligations_cover_both_provenances() {
        let loans = sample_obligations();
        assert_eq!(loans.len(), 2);
        assert_eq!(loans[0].provenance, Provenance::Internal);
        assert_eq!(loans[1].provenance, Provenance::External);
        assert_eq!(loans[1].source_bank, "vbank");
    }

    #[tokio::test]
    async fn created_agreements_echo_the_payload() {
        let gateway = SampleLoanGateway;
        let created = gateway
            .create_agreement(
                "Bearer sample",
                &CreateAgreementPayload {
                    product_id: "sample-refi-1".to_string(),
                    amount: 900_000.0,
                    term_months: 84,
                },
            )
            .await
            .expect("sample creation succeeds");
        assert_eq!(created.status, "sample-submitted");
        assert_eq!(created.agreement["product_id"], "sample-refi-1");
        assert_eq!(created.agreement["amount"], 900_000.0);
    }
}
