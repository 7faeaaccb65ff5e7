pub mod types;          // endereços, royalties, snapshots
pub mod errors;         // Shim: reexports da API unificada de erro
pub mod guardrails;
pub mod curve;          // curva primitiva + segmentação temporal
pub mod roots;
pub mod pricing;
pub mod ref_golden;     // oráculo BigRational
pub mod ports;
pub mod retry;
pub mod hierarchy;
pub mod bonding_pricing;
pub mod router;

// módulos unificados de erro
pub mod error_catalog;
pub mod error;
pub mod error_map;
