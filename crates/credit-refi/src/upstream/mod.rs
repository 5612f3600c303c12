//! Upstream clients and the live/sample gateway strategies.

pub mod bank_api;
pub mod catalog;
pub mod external;
pub mod gateway;
pub mod sample;

pub use bank_api::BankApiClient;
pub use catalog::CatalogResolver;
pub use external::{BankHealthReport, BankStatus, ExternalBankClient};
pub use gateway::{CatalogGateway, CreatedAgreement, LiveCatalogGateway, LiveLoanGateway, LoanGateway};
pub use sample::{SampleCatalogGateway, SampleLoanGateway};
