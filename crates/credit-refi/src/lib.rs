//! Refinance-offer aggregation and resolution engine.
//!
//! Aggregates a customer's loan obligations from the internal core-banking
//! API and configured partner banks, resolves a refinancing-product catalog
//! from prioritized sources, computes ranked offers per external
//! obligation, and resolves user input into concrete application-creation
//! calls. Everything upstream-facing is behind the strategy traits in
//! [`upstream::gateway`], with live and static sample implementations.

pub mod config;
pub mod error;
pub mod refinance;
pub mod telemetry;
pub mod upstream;
