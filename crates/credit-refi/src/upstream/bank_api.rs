//! Client for the internal core-banking API.
//!
//! The bearer token arrives with the incoming request and is forwarded
//! verbatim; this client never mints or validates credentials.

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;

use crate::config::BankApiConfig;
use crate::error::UpstreamError;
use crate::refinance::application::CreateAgreementPayload;

#[derive(Debug, Clone)]
pub struct BankApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl BankApiClient {
    pub fn new(config: &BankApiConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// All product agreements held by the authenticated customer.
    pub async fn product_agreements(&self, auth: &str) -> Result<Vec<Value>, UpstreamError> {
        let body = self.get_json(auth, "/product-agreements").await?;
        Ok(array_at(&body, &["data"]))
    }

    /// The customer's accounts in open-banking form.
    pub async fn accounts(&self, auth: &str) -> Result<Value, UpstreamError> {
        self.get_json(auth, "/accounts").await
    }

    /// Balance entries for one account; the caller owns failure handling.
    pub async fn account_balances(
        &self,
        auth: &str,
        account_id: &str,
    ) -> Result<Value, UpstreamError> {
        let body = self
            .get_json(auth, &format!("/accounts/{account_id}/balances"))
            .await?;
        Ok(body
            .pointer("/data/balance")
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new())))
    }

    /// Issue the product-agreement creation call and return the raw
    /// response envelope for pass-through.
    pub async fn create_product_agreement(
        &self,
        auth: &str,
        payload: &CreateAgreementPayload,
    ) -> Result<Value, UpstreamError> {
        let url = format!("{}/product-agreements", self.base_url);
        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, auth)
            .header(CONTENT_TYPE, "application/json")
            .json(payload)
            .send()
            .await?;
        decode_json(response).await
    }

    async fn get_json(&self, auth: &str, path: &str) -> Result<Value, UpstreamError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, auth)
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        decode_json(response).await
    }
}

/// Decode a response, turning non-2xx statuses into a diagnostic-carrying
/// error with the upstream body excerpt preserved.
pub(crate) async fn decode_json(response: reqwest::Response) -> Result<Value, UpstreamError> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let body: Option<Value> = serde_json::from_str(&text).ok();
        let message = body
            .as_ref()
            .and_then(|value| value.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("upstream request failed with status {status}"));
        return Err(UpstreamError::Status {
            status: status.as_u16(),
            message,
            body,
        });
    }

    let text = response.text().await?;
    Ok(serde_json::from_str(&text)?)
}

/// Array at the given pointer path, or empty when the shape differs.
pub(crate) fn array_at(body: &Value, path: &[&str]) -> Vec<Value> {
    let mut cursor = body;
    for segment in path {
        match cursor.get(*segment) {
            Some(next) => cursor = next,
            None => return Vec::new(),
        }
    }
    cursor.as_array().cloned().unwrap_or_default()
}
