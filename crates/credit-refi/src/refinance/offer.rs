use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::amortization::monthly_payment;
use super::catalog::CatalogProduct;
use super::obligation::Obligation;

/// Term assumed when neither the obligation nor the product states one.
pub const DEFAULT_FALLBACK_TERM_MONTHS: f64 = 24.0;

/// Baseline originating rate assumed when an obligation carries none.
pub const ASSUMED_ORIGINAL_RATE_PERCENT: f64 = 15.0;

/// Name fragments marking promotional products, preferred on rate ties.
const PROMOTIONAL_NAME_KEYWORDS: &[&str] = &["tech mortgage"];

/// Where a suggested rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfferSource {
    #[serde(rename = "bank-product")]
    BankProduct,
    #[serde(rename = "fallback")]
    Fallback,
}

/// Inputs the engine assumed while pricing an offer, echoed for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferAssumptions {
    pub term_months: f64,
    pub principal: f64,
}

/// A computed refinance recommendation for one obligation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub loan_id: String,
    pub original_rate: Option<f64>,
    pub suggested_rate: f64,
    pub monthly_payment: f64,
    pub total_cost: f64,
    pub savings: f64,
    pub source: OfferSource,
    pub product_id: Option<String>,
    pub product_name: String,
    pub product_term_months: Option<f64>,
    pub assumptions: OfferAssumptions,
}

/// An obligation together with its computed offer, if any.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedObligation {
    #[serde(flatten)]
    pub obligation: Obligation,
    pub refinance_offer: Option<Offer>,
}

/// One offer slot per input obligation. Internal obligations are
/// refinance-ineligible by definition and always map to `None`.
pub fn build_offers(
    obligations: &[Obligation],
    products: &[CatalogProduct],
) -> Vec<Option<Offer>> {
    obligations
        .iter()
        .map(|obligation| {
            if obligation.is_external() {
                select_best_offer(obligation, products)
            } else {
                None
            }
        })
        .collect()
}

/// Pair each obligation with its offer for API responses.
pub fn enrich_with_offers(
    obligations: Vec<Obligation>,
    products: &[CatalogProduct],
) -> Vec<EnrichedObligation> {
    let offers = build_offers(&obligations, products);
    obligations
        .into_iter()
        .zip(offers)
        .map(|(obligation, refinance_offer)| EnrichedObligation {
            obligation,
            refinance_offer,
        })
        .collect()
}

/// Rank eligible products and build an offer from the winner.
///
/// When no catalog candidate exists at all, no offer is produced; the
/// engine never invents a synthetic rate.
pub fn select_best_offer(
    obligation: &Obligation,
    products: &[CatalogProduct],
) -> Option<Offer> {
    let eligible = filter_eligible(obligation, products);
    let candidates: Vec<&CatalogProduct> = if eligible.is_empty() {
        products.iter().collect()
    } else {
        eligible
    };

    let mut ranked = candidates;
    ranked.sort_by(|a, b| rank(a, b));
    let best = ranked.first()?;
    build_offer(obligation, best)
}

/// Products whose finite `max_amount` cannot cover the obligation are
/// excluded. A zero/unknown principal keeps every product eligible.
fn filter_eligible<'a>(
    obligation: &Obligation,
    products: &'a [CatalogProduct],
) -> Vec<&'a CatalogProduct> {
    let principal = obligation.principal;
    if principal <= 0.0 || !principal.is_finite() {
        return products.iter().collect();
    }

    products
        .iter()
        .filter(|product| match product.max_amount {
            Some(max) if max.is_finite() => principal <= max,
            _ => true,
        })
        .collect()
}

fn rank(a: &CatalogProduct, b: &CatalogProduct) -> Ordering {
    match a
        .interest_rate
        .partial_cmp(&b.interest_rate)
        .unwrap_or(Ordering::Equal)
    {
        Ordering::Equal => {}
        unequal => return unequal,
    }

    match promotional_priority(a).cmp(&promotional_priority(b)) {
        Ordering::Equal => {}
        unequal => return unequal,
    }

    let a_term = a.term_months.unwrap_or(DEFAULT_FALLBACK_TERM_MONTHS);
    let b_term = b.term_months.unwrap_or(DEFAULT_FALLBACK_TERM_MONTHS);
    a_term.partial_cmp(&b_term).unwrap_or(Ordering::Equal)
}

fn promotional_priority(product: &CatalogProduct) -> u8 {
    let name = product.product_name.to_lowercase();
    if PROMOTIONAL_NAME_KEYWORDS
        .iter()
        .any(|keyword| name.contains(keyword))
    {
        0
    } else {
        1
    }
}

fn build_offer(obligation: &Obligation, product: &CatalogProduct) -> Option<Offer> {
    let principal = obligation.principal;
    if principal <= 0.0 || !principal.is_finite() {
        return None;
    }

    let suggested_rate = product.interest_rate;
    let term_months = assumed_term_months(obligation, product);
    let payment = monthly_payment(principal, suggested_rate, term_months);

    let original_rate = obligation
        .interest_rate
        .filter(|rate| rate.is_finite() && *rate > 0.0);
    let baseline_rate = original_rate.unwrap_or(ASSUMED_ORIGINAL_RATE_PERCENT);
    let savings = if baseline_rate > suggested_rate {
        round2((baseline_rate - suggested_rate) * principal * term_months / 1200.0)
    } else {
        0.0
    };

    Some(Offer {
        loan_id: obligation.id.clone(),
        original_rate,
        suggested_rate: round2(suggested_rate),
        monthly_payment: round2(payment),
        total_cost: round2(payment * term_months),
        savings,
        source: OfferSource::BankProduct,
        product_id: Some(product.product_id.clone()),
        product_name: product.product_name.clone(),
        product_term_months: product.term_months,
        assumptions: OfferAssumptions {
            term_months,
            principal,
        },
    })
}

/// Remaining horizon for pricing: the obligation's own term, then the
/// product's, then the default constant.
fn assumed_term_months(obligation: &Obligation, product: &CatalogProduct) -> f64 {
    [obligation.term_months, product.term_months]
        .into_iter()
        .flatten()
        .find(|value| value.is_finite() && *value > 0.0)
        .unwrap_or(DEFAULT_FALLBACK_TERM_MONTHS)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
