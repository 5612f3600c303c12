//! Partner-bank fan-out.
//!
//! Every partner call is independent: a down bank degrades to an empty
//! result (or a `down` health row) for that bank only and never aborts its
//! siblings or the enclosing request.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use reqwest::header::ACCEPT;
use serde::Serialize;
use serde_json::Value;

use super::bank_api::{array_at, decode_json};
use crate::config::ExternalBankEndpoint;
use crate::error::UpstreamError;
use crate::refinance::obligation::Obligation;

/// Reachability summary for one partner bank.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BankHealthReport {
    pub code: String,
    pub name: String,
    pub base_url: String,
    pub status: BankStatus,
    pub health_url: String,
    pub http_status: Option<u16>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BankStatus {
    Up,
    Down,
}

#[derive(Debug, Clone)]
pub struct ExternalBankClient {
    client: reqwest::Client,
    banks: Vec<ExternalBankEndpoint>,
}

impl ExternalBankClient {
    pub fn new(
        banks: Vec<ExternalBankEndpoint>,
        timeout: std::time::Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, banks })
    }

    /// Loans held at every configured partner bank, queried concurrently.
    pub async fn collect_loans(&self) -> Vec<Obligation> {
        let fetches = self.banks.iter().map(|bank| self.loans_for_bank(bank));
        join_all(fetches).await.into_iter().flatten().collect()
    }

    async fn loans_for_bank(&self, bank: &ExternalBankEndpoint) -> Vec<Obligation> {
        match self.try_fetch_loans(bank).await {
            Ok(loans) => loans,
            Err(error) => {
                tracing::warn!(
                    bank = %bank.code,
                    %error,
                    "failed to fetch partner-bank loans; treating as empty"
                );
                Vec::new()
            }
        }
    }

    async fn try_fetch_loans(
        &self,
        bank: &ExternalBankEndpoint,
    ) -> Result<Vec<Obligation>, UpstreamError> {
        let url = format!("{}/loans", bank.base_url.trim_end_matches('/'));
        let mut request = self.client.get(&url).header(ACCEPT, "application/json");
        if let Some(token) = &bank.token {
            request = request.bearer_auth(token);
        }

        let body: Value = decode_json(request.send().await?).await?;
        Ok(array_at(&body, &["data", "loans"])
            .iter()
            .filter_map(|loan| Obligation::from_external_loan(loan, &bank.code))
            .collect())
    }

    /// Probe every partner bank's health endpoint concurrently.
    pub async fn health(&self) -> Vec<BankHealthReport> {
        join_all(self.banks.iter().map(|bank| self.probe_bank(bank))).await
    }

    async fn probe_bank(&self, bank: &ExternalBankEndpoint) -> BankHealthReport {
        let health_url = format!("{}/health", bank.base_url.trim_end_matches('/'));
        match self.client.get(&health_url).send().await {
            Ok(response) => {
                let status = response.status();
                let message = if status.is_success() {
                    None
                } else {
                    Some(status.to_string())
                };
                health_report(
                    bank,
                    &health_url,
                    status.is_success(),
                    Some(status.as_u16()),
                    message,
                )
            }
            Err(error) => health_report(bank, &health_url, false, None, Some(error.to_string())),
        }
    }
}

fn health_report(
    bank: &ExternalBankEndpoint,
    health_url: &str,
    up: bool,
    http_status: Option<u16>,
    message: Option<String>,
) -> BankHealthReport {
    BankHealthReport {
        code: bank.code.clone(),
        name: bank.display_name.clone(),
        base_url: bank.base_url.clone(),
        status: if up { BankStatus::Up } else { BankStatus::Down },
        health_url: health_url.to_string(),
        http_status,
        message: if up { None } else { message },
    }
}

/// Envelope for the `/refinance/status` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct BankStatusSnapshot {
    pub banks: Vec<BankHealthReport>,
    pub last_checked: DateTime<Utc>,
}
