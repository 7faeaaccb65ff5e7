//! Compat: reexporta o módulo de erros unificado.

pub use super::error::{BondingError, Result};
pub use super::error_catalog::{default_locale_message, BondingErrorCode};
pub use super::error_map::{from_trade_inputs, to_error};
