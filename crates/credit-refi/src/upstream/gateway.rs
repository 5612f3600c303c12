//! Strategy seams between the engine and its upstreams.
//!
//! Two implementations exist per trait: the live clients in this module and
//! the static sample providers in [`super::sample`]. Which one a process
//! uses is decided once at startup from configuration, never per call site.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use tokio::try_join;

use super::bank_api::{array_at, BankApiClient};
use super::catalog::CatalogResolver;
use super::external::{BankHealthReport, ExternalBankClient};
use crate::error::{UpstreamDiagnostic, UpstreamError};
use crate::refinance::application::CreateAgreementPayload;
use crate::refinance::catalog::CatalogProduct;
use crate::refinance::obligation::Obligation;

/// Downstream acknowledgement of a creation call, passed through to the
/// API client.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedAgreement {
    pub status: String,
    pub agreement: Value,
}

/// Loan-side upstream operations: aggregation, balance enrichment, the
/// creation call, and partner-bank health.
#[async_trait]
pub trait LoanGateway: Send + Sync {
    /// Internal loan agreements enriched with account balances.
    async fn active_loans(&self, auth: &str) -> Result<Vec<Obligation>, UpstreamError>;

    /// Internal and partner-bank obligations for offer computation.
    /// Partner failures degrade to empty per bank; an internal failure is
    /// surfaced, since the internal ledger is a required dependency.
    async fn collect_obligations(&self, auth: &str) -> Result<Vec<Obligation>, UpstreamError>;

    /// Issue exactly one downstream creation call.
    async fn create_agreement(
        &self,
        auth: &str,
        payload: &CreateAgreementPayload,
    ) -> Result<CreatedAgreement, UpstreamError>;

    /// Reachability of every configured partner bank.
    async fn bank_health(&self) -> Vec<BankHealthReport>;
}

/// Catalog-side upstream operations.
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    /// Normalized, deduplicated products; never empty.
    async fn resolve_catalog(&self) -> Vec<CatalogProduct>;
}

/// Live gateway over the internal core-banking API and partner banks.
#[derive(Debug, Clone)]
pub struct LiveLoanGateway {
    bank_api: BankApiClient,
    external: ExternalBankClient,
    sample_external_loans: bool,
}

impl LiveLoanGateway {
    pub fn new(bank_api: BankApiClient, external: ExternalBankClient) -> Self {
        Self {
            bank_api,
            external,
            sample_external_loans: false,
        }
    }

    /// Substitute only the partner-bank loan fan-out with sample data,
    /// keeping the internal ledger and health probes live.
    pub fn with_sample_external_loans(mut self) -> Self {
        self.sample_external_loans = true;
        self
    }

    async fn external_loans(&self) -> Vec<Obligation> {
        if self.sample_external_loans {
            super::sample::sample_external_obligations()
        } else {
            self.external.collect_loans().await
        }
    }

    async fn enrich_balance(
        &self,
        auth: &str,
        mut loan: Obligation,
        account_ids: &HashMap<String, String>,
    ) -> Obligation {
        let account_id = loan
            .account_number
            .as_ref()
            .and_then(|number| account_ids.get(number));

        let Some(account_id) = account_id else {
            if loan.account_number.is_some() {
                loan.balance_error = Some(UpstreamDiagnostic::not_found(
                    "Account ID not found for provided account number",
                ));
            }
            return loan;
        };

        loan.account_id = Some(account_id.clone());
        match self.bank_api.account_balances(auth, account_id).await {
            Ok(balance) => loan.balance = Some(balance),
            Err(error) => loan.balance_error = Some(error.diagnostic()),
        }
        loan
    }
}

#[async_trait]
impl LoanGateway for LiveLoanGateway {
    async fn active_loans(&self, auth: &str) -> Result<Vec<Obligation>, UpstreamError> {
        let (agreements, accounts) = try_join!(
            self.bank_api.product_agreements(auth),
            self.bank_api.accounts(auth)
        )?;

        let account_ids = account_id_by_number(&accounts);
        let loans: Vec<Obligation> = agreements
            .iter()
            .filter_map(Obligation::from_internal_agreement)
            .collect();

        Ok(join_all(
            loans
                .into_iter()
                .map(|loan| self.enrich_balance(auth, loan, &account_ids)),
        )
        .await)
    }

    async fn collect_obligations(&self, auth: &str) -> Result<Vec<Obligation>, UpstreamError> {
        let (agreements, external) = tokio::join!(
            self.bank_api.product_agreements(auth),
            self.external_loans()
        );

        let mut obligations: Vec<Obligation> = agreements?
            .iter()
            .filter_map(Obligation::from_internal_agreement)
            .collect();
        obligations.extend(external);
        Ok(obligations)
    }

    async fn create_agreement(
        &self,
        auth: &str,
        payload: &CreateAgreementPayload,
    ) -> Result<CreatedAgreement, UpstreamError> {
        let body = self
            .bank_api
            .create_product_agreement(auth, payload)
            .await?;
        let status = body
            .pointer("/meta/message")
            .and_then(Value::as_str)
            .unwrap_or("created")
            .to_string();
        Ok(CreatedAgreement {
            status,
            agreement: body.get("data").cloned().unwrap_or(Value::Null),
        })
    }

    async fn bank_health(&self) -> Vec<BankHealthReport> {
        self.external.health().await
    }
}

/// Live catalog gateway over the prioritized source list.
#[derive(Debug, Clone)]
pub struct LiveCatalogGateway {
    resolver: CatalogResolver,
}

impl LiveCatalogGateway {
    pub fn new(resolver: CatalogResolver) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl CatalogGateway for LiveCatalogGateway {
    async fn resolve_catalog(&self) -> Vec<CatalogProduct> {
        self.resolver.resolve().await
    }
}

/// Map account numbers to account ids from the open-banking accounts
/// response (`data.account[].account[0].identification` → `accountId`).
fn account_id_by_number(accounts: &Value) -> HashMap<String, String> {
    array_at(accounts, &["data", "account"])
        .iter()
        .filter_map(|entry| {
            let number = entry
                .pointer("/account/0/identification")
                .and_then(Value::as_str)?;
            let id = entry.get("accountId").and_then(Value::as_str)?;
            Some((number.to_string(), id.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn account_map_is_built_from_open_banking_shape() {
        let accounts = json!({
            "data": {
                "account": [
                    {
                        "accountId": "acc-1",
                        "account": [{ "identification": "40817810099910004312" }],
                    },
                    { "accountId": "acc-2", "account": [] },
                    { "account": [{ "identification": "409999" }] },
                ],
            },
        });
        let map = account_id_by_number(&accounts);
        assert_eq!(map.len(), 1);
        assert_eq!(
            map.get("40817810099910004312").map(String::as_str),
            Some("acc-1")
        );
    }
}
