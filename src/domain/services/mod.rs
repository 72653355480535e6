//! Domain services: the variant and pricing engine plus catalog listing.
pub mod catalog;
pub mod combinations;
pub mod pricing;
pub mod reconciliation;
pub mod sku;
pub mod structure;
