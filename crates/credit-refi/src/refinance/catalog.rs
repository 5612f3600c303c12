use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::fields::{coerce_number, first_present, number_field, string_field};

/// Product name used when a catalog record carries none.
pub const DEFAULT_PRODUCT_NAME: &str = "Bank loan offer";

/// A refinancing product in canonical form.
///
/// Every product that reaches the offer engine went through
/// [`normalize_product`]; a record without a resolvable id or rate, or
/// explicitly typed as a non-loan product, never gets this far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogProduct {
    pub product_id: String,
    pub product_name: String,
    pub interest_rate: f64,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    pub term_months: Option<f64>,
}

const ID_ALIASES: &[&str] = &["productId", "product_id", "id"];
const TYPE_ALIASES: &[&str] = &["productType", "product_type", "type"];
const NAME_ALIASES: &[&str] = &["productName", "name"];
const RATE_ALIASES: &[&str] = &["interestRate", "interest_rate"];
const TERM_ALIASES: &[&str] = &["termMonths", "term_months"];
const MIN_AMOUNT_ALIASES: &[&str] = &["minAmount", "min_amount"];
const MAX_AMOUNT_ALIASES: &[&str] = &["maxAmount", "max_amount"];

/// Map one heterogeneous catalog record into the canonical schema.
///
/// Field resolution is first-present-wins over the alias lists above. The
/// rate falls back to the lower bound of a min/max range, then the upper; a
/// term range resolves to its upper bound, then its lower. Unresolvable id
/// or rate, or a resolved type other than `loan`, rejects the record.
pub fn normalize_product(record: &Value) -> Option<CatalogProduct> {
    let product_id = string_field(record, ID_ALIASES)?;

    let explicit_type = string_field(record, TYPE_ALIASES);
    let inferred_type = explicit_type.or_else(|| {
        let loan_shaped = number_field(record, &["min_rate"]).is_some()
            || number_field(record, &["max_rate"]).is_some()
            || first_present(record, &["term_months"]).is_some();
        loan_shaped.then(|| "loan".to_string())
    });
    if let Some(product_type) = inferred_type {
        if !product_type.eq_ignore_ascii_case("loan") {
            return None;
        }
    }

    let interest_rate = number_field(record, RATE_ALIASES)
        .or_else(|| number_field(record, &["min_rate"]))
        .or_else(|| number_field(record, &["max_rate"]))?;

    let term_months = number_field(record, TERM_ALIASES).or_else(|| {
        let range = first_present(record, &["term_months"])?;
        let upper = range.get("max").and_then(coerce_number);
        upper.or_else(|| range.get("min").and_then(coerce_number))
    });

    Some(CatalogProduct {
        product_id,
        product_name: string_field(record, NAME_ALIASES)
            .unwrap_or_else(|| DEFAULT_PRODUCT_NAME.to_string()),
        interest_rate,
        min_amount: number_field(record, MIN_AMOUNT_ALIASES),
        max_amount: number_field(record, MAX_AMOUNT_ALIASES),
        term_months,
    })
}

/// Normalize a batch, silently dropping rejected records.
pub fn normalize_products(records: &[Value]) -> Vec<CatalogProduct> {
    records.iter().filter_map(normalize_product).collect()
}
