//! Prioritized product-catalog resolution.
//!
//! Sources are tried in configuration order; within a source the primary
//! open-banking endpoint is tried before the legacy banker endpoint. The
//! first source to contribute a product id wins conflicts, and a fully
//! empty sweep falls back to the built-in sample catalog so the offer
//! engine always has candidates.

use std::collections::HashSet;

use reqwest::header::ACCEPT;
use serde_json::Value;
use url::Url;

use super::bank_api::{array_at, decode_json};
use super::sample;
use crate::config::CatalogConfig;
use crate::error::UpstreamError;
use crate::refinance::catalog::{normalize_products, CatalogProduct};

/// Hosts that only resolve inside one machine; these get address-family
/// variants so the same configuration works both on-host and inside a
/// container.
const LOOPBACK_HOSTS: &[&str] = &["localhost", "127.0.0.1"];
const ALTERNATIVE_HOSTS: &[&str] = &["127.0.0.1", "host.docker.internal"];

#[derive(Debug, Clone)]
pub struct CatalogResolver {
    client: reqwest::Client,
    sources: Vec<String>,
}

impl CatalogResolver {
    pub fn new(
        config: &CatalogConfig,
        timeout: std::time::Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            sources: config.prioritized_sources(),
        })
    }

    /// Resolve the catalog across all sources. Never returns an empty list.
    pub async fn resolve(&self) -> Vec<CatalogProduct> {
        let expanded: Vec<String> = self
            .sources
            .iter()
            .flat_map(|source| expand_source_variants(source))
            .collect();

        let mut batches = Vec::with_capacity(expanded.len());
        for source in &expanded {
            batches.push(self.products_from_source(source).await);
        }
        let collected = dedup_first_wins(batches);

        if collected.is_empty() {
            tracing::warn!(
                sources = ?expanded,
                "no catalog source yielded products; using built-in sample catalog"
            );
            return sample::sample_catalog();
        }

        tracing::info!(
            sources = ?expanded,
            total = collected.len(),
            "loaded refinancing products"
        );
        collected
    }

    /// Products from one base URL: primary endpoint first, legacy second.
    async fn products_from_source(&self, base_url: &str) -> Vec<CatalogProduct> {
        let primary = self
            .fetch_products(base_url, "/products", &["data", "product"])
            .await;
        if !primary.is_empty() {
            return primary;
        }

        self.fetch_products(base_url, "/banker/products", &["products"])
            .await
    }

    async fn fetch_products(
        &self,
        base_url: &str,
        path: &str,
        array_path: &[&str],
    ) -> Vec<CatalogProduct> {
        let url = format!("{}{}", base_url.trim_end_matches('/'), path);
        match self.try_fetch(&url, array_path).await {
            Ok(products) => products,
            Err(error) => {
                tracing::warn!(%url, %error, "failed to load products from catalog source");
                Vec::new()
            }
        }
    }

    async fn try_fetch(
        &self,
        url: &str,
        array_path: &[&str],
    ) -> Result<Vec<CatalogProduct>, UpstreamError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        let body: Value = decode_json(response).await?;
        Ok(normalize_products(&array_at(&body, array_path)))
    }
}

/// Expand a source URL into the host variants worth trying.
///
/// Only loopback-style hosts expand; public hostnames pass through
/// untouched. An unparseable source is kept verbatim so a later fetch can
/// surface the real error.
pub fn expand_source_variants(source: &str) -> Vec<String> {
    let parsed = match Url::parse(source) {
        Ok(url) => url,
        Err(error) => {
            tracing::warn!(%source, %error, "unable to parse product catalog url");
            return vec![source.to_string()];
        }
    };

    let mut variants = vec![parsed.to_string()];
    let is_loopback = parsed
        .host_str()
        .is_some_and(|host| LOOPBACK_HOSTS.contains(&host));
    if is_loopback {
        for host in ALTERNATIVE_HOSTS {
            if parsed.host_str() == Some(*host) {
                continue;
            }
            let mut alternative = parsed.clone();
            if alternative.set_host(Some(host)).is_ok() {
                let rendered = alternative.to_string();
                if !variants.contains(&rendered) {
                    variants.push(rendered);
                }
            }
        }
    }

    variants
}

/// First-wins accumulation over per-source batches, kept separate from the
/// network path so the dedup policy is testable on its own.
pub fn dedup_first_wins(batches: Vec<Vec<CatalogProduct>>) -> Vec<CatalogProduct> {
    let mut collected = Vec::new();
    let mut seen = HashSet::new();
    for batch in batches {
        for product in batch {
            if seen.insert(product.product_id.clone()) {
                collected.push(product);
            }
        }
    }
    collected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_sources_expand_to_container_variants() {
        let variants = expand_source_variants("http://localhost:8080");
        assert_eq!(
            variants,
            vec![
                "http://localhost:8080/".to_string(),
                "http://127.0.0.1:8080/".to_string(),
                "http://host.docker.internal:8080/".to_string(),
            ]
        );
    }

    #[test]
    fn loopback_ip_does_not_repeat_itself() {
        let variants = expand_source_variants("http://127.0.0.1:9000");
        assert_eq!(
            variants,
            vec![
                "http://127.0.0.1:9000/".to_string(),
                "http://host.docker.internal:9000/".to_string(),
            ]
        );
    }

    #[test]
    fn public_hosts_pass_through_unexpanded() {
        let variants = expand_source_variants("https://api.bank.example/catalog");
        assert_eq!(variants, vec!["https://api.bank.example/catalog".to_string()]);
    }

    #[test]
    fn unparseable_source_is_kept_verbatim() {
        let variants = expand_source_variants("not a url");
        assert_eq!(variants, vec!["not a url".to_string()]);
    }

    #[test]
    fn earlier_source_wins_id_conflicts() {
        let a = CatalogProduct {
            product_id: "refi-1".to_string(),
            product_name: "Fresh".to_string(),
            interest_rate: 9.0,
            min_amount: None,
            max_amount: None,
            term_months: None,
        };
        let b = CatalogProduct {
            product_id: "refi-1".to_string(),
            product_name: "Stale".to_string(),
            interest_rate: 11.0,
            min_amount: None,
            max_amount: None,
            term_months: None,
        };
        let c = CatalogProduct {
            product_id: "refi-2".to_string(),
            product_name: "Other".to_string(),
            interest_rate: 10.0,
            min_amount: None,
            max_amount: None,
            term_months: None,
        };

        let merged = dedup_first_wins(vec![vec![a.clone()], vec![b, c.clone()]]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0], a, "earlier-priority rate is kept");
        assert_eq!(merged[1], c);
    }
}
