use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::fields::{number_field, string_field};
use crate::error::UpstreamDiagnostic;

/// Symbolic bank code of the operator's own ledger.
pub const INTERNAL_BANK_CODE: &str = "self";

/// Whether an obligation originates from the operator's own ledger or a
/// partner bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Internal,
    External,
}

/// An existing debt the customer holds, normalized from upstream records.
///
/// Constructed per request and immutable afterwards; the engine never
/// persists obligations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obligation {
    #[serde(rename = "agreement_id")]
    pub id: String,
    #[serde(rename = "source")]
    pub provenance: Provenance,
    #[serde(rename = "origin_bank")]
    pub source_bank: String,
    #[serde(rename = "amount")]
    pub principal: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interest_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term_months: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_term_months: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_error: Option<UpstreamDiagnostic>,
}

const ID_ALIASES: &[&str] = &["agreement_id", "loan_id", "id"];
const AMOUNT_ALIASES: &[&str] = &["amount", "principal_amount", "principal"];
const RATE_ALIASES: &[&str] = &["interest_rate", "interestRate", "rate"];
const TERM_ALIASES: &[&str] = &["term_months", "termMonths"];
const REMAINING_TERM_ALIASES: &[&str] = &["remaining_term_months", "remainingTermMonths"];
const ACCOUNT_NUMBER_ALIASES: &[&str] = &["account_number", "accountNumber"];
const CURRENCY_ALIASES: &[&str] = &["currency"];
const BANK_ALIASES: &[&str] = &["origin_bank", "bank_code"];
const TYPE_ALIASES: &[&str] = &["product_type", "productType", "type"];

impl Obligation {
    /// Normalize one internal product-agreement row. Rows that are not loan
    /// agreements, or that carry no resolvable identifier, are skipped.
    pub fn from_internal_agreement(record: &Value) -> Option<Self> {
        let product_type = string_field(record, TYPE_ALIASES)?;
        if !product_type.eq_ignore_ascii_case("loan") {
            return None;
        }
        Self::from_record(record, INTERNAL_BANK_CODE, Provenance::Internal)
    }

    /// Normalize one partner-bank loan row, tagged with the originating
    /// bank code unless the record names one itself.
    pub fn from_external_loan(record: &Value, bank_code: &str) -> Option<Self> {
        Self::from_record(record, bank_code, Provenance::External)
    }

    fn from_record(record: &Value, default_bank: &str, default_provenance: Provenance) -> Option<Self> {
        let id = string_field(record, ID_ALIASES)?;
        let source_bank =
            string_field(record, BANK_ALIASES).unwrap_or_else(|| default_bank.to_string());

        // An explicit provenance tag wins; otherwise any bank other than our
        // own ledger is external.
        let provenance = match string_field(record, &["source"]).as_deref() {
            Some("internal") => Provenance::Internal,
            Some("external") => Provenance::External,
            _ if source_bank != INTERNAL_BANK_CODE => Provenance::External,
            _ => default_provenance,
        };

        Some(Self {
            id,
            provenance,
            source_bank,
            principal: number_field(record, AMOUNT_ALIASES).unwrap_or(0.0),
            currency: string_field(record, CURRENCY_ALIASES),
            interest_rate: number_field(record, RATE_ALIASES),
            term_months: number_field(record, TERM_ALIASES),
            remaining_term_months: number_field(record, REMAINING_TERM_ALIASES),
            account_number: string_field(record, ACCOUNT_NUMBER_ALIASES),
            account_id: None,
            balance: None,
            balance_error: None,
        })
    }

    pub fn is_external(&self) -> bool {
        self.provenance == Provenance::External
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn internal_agreement_requires_loan_type() {
        let deposit = json!({
            "agreement_id": "agr-1",
            "product_type": "deposit",
            "amount": 10_000,
        });
        assert!(Obligation::from_internal_agreement(&deposit).is_none());

        let loan = json!({
            "agreement_id": "agr-2",
            "product_type": "loan",
            "amount": 450_000,
            "interest_rate": 13.5,
            "term_months": 40,
            "account_number": "40817810099910004312",
            "currency": "RUB",
        });
        let obligation = Obligation::from_internal_agreement(&loan).expect("loan normalizes");
        assert_eq!(obligation.id, "agr-2");
        assert_eq!(obligation.provenance, Provenance::Internal);
        assert_eq!(obligation.source_bank, INTERNAL_BANK_CODE);
        assert_eq!(obligation.principal, 450_000.0);
        assert_eq!(obligation.interest_rate, Some(13.5));
        assert!(!obligation.is_external());
    }

    #[test]
    fn external_loan_is_tagged_with_bank_code() {
        let record = json!({
            "loan_id": "ext-1",
            "principal_amount": "900000",
            "rate": 9.2,
            "remaining_term_months": 96,
        });
        let obligation =
            Obligation::from_external_loan(&record, "vbank").expect("loan normalizes");
        assert_eq!(obligation.id, "ext-1");
        assert_eq!(obligation.source_bank, "vbank");
        assert_eq!(obligation.provenance, Provenance::External);
        assert_eq!(obligation.principal, 900_000.0);
        assert_eq!(obligation.interest_rate, Some(9.2));
        assert_eq!(obligation.remaining_term_months, Some(96.0));
    }

    #[test]
    fn foreign_bank_code_implies_external_without_explicit_tag() {
        let record = json!({
            "agreement_id": "agr-3",
            "product_type": "loan",
            "origin_bank": "abank",
            "amount": 100_000,
        });
        let obligation = Obligation::from_internal_agreement(&record).expect("normalizes");
        assert_eq!(obligation.provenance, Provenance::External);
    }

    #[test]
    fn explicit_provenance_tag_wins_over_bank_code() {
        let record = json!({
            "id": "agr-4",
            "source": "internal",
            "origin_bank": "abank",
            "amount": 100_000,
        });
        let obligation = Obligation::from_external_loan(&record, "abank").expect("normalizes");
        assert_eq!(obligation.provenance, Provenance::Internal);
    }

    #[test]
    fn record_without_identifier_is_dropped() {
        let record = json!({ "amount": 5_000, "product_type": "loan" });
        assert!(Obligation::from_internal_agreement(&record).is_none());
    }

    #[test]
    fn serialized_shape_uses_wire_names() {
        let record = json!({
            "agreement_id": "agr-5",
            "product_type": "loan",
            "amount": 250_000,
        });
        let obligation = Obligation::from_internal_agreement(&record).expect("normalizes");
        let wire = serde_json::to_value(&obligation).expect("serializes");
        assert_eq!(wire["agreement_id"], "agr-5");
        assert_eq!(wire["source"], "internal");
        assert_eq!(wire["origin_bank"], "self");
        assert_eq!(wire["amount"], 250_000.0);
        assert!(wire.get("interest_rate").is_none());
    }
}
