//! The refinance engine: amortization arithmetic, record normalization,
//! offer selection, and application resolution over aggregated upstreams.

pub mod amortization;
pub mod application;
pub mod catalog;
pub(crate) mod fields;
pub mod obligation;
pub mod offer;
pub mod router;
pub mod service;

pub use application::{ApplicationRequest, CreateAgreementPayload, ResolvedApplication};
pub use catalog::{normalize_product, normalize_products, CatalogProduct};
pub use obligation::{Obligation, Provenance, INTERNAL_BANK_CODE};
pub use offer::{build_offers, enrich_with_offers, select_best_offer, EnrichedObligation, Offer};
pub use router::refinance_router;
pub use service::{AuthMode, RefinanceService};
