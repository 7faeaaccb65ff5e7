//! Mapeamento entre condições de domínio e códigos de erro do motor.
use crate::bonding::error::BondingError;
use crate::bonding::error_catalog::BondingErrorCode;
use crate::bonding::types::{RoyaltyPercentages, TradeSide};

/// Determina o código de erro para uma operação a partir dos inputs brutos.
/// `supply` só restringe vendas: não se vende mais do que circula.
pub fn from_trade_inputs(
    side: TradeSide,
    amount: f64,
    supply: f64,
    royalties: &RoyaltyPercentages,
) -> Option<BondingErrorCode> {
    if royalties.validate().is_err() {
        return Some(BondingErrorCode::ConfigValidationError);
    }
    if !amount.is_finite() || amount <= 0.0 {
        return Some(BondingErrorCode::ArithmeticDomainError);
    }
    if !supply.is_finite() || supply < 0.0 {
        return Some(BondingErrorCode::StateUnavailable);
    }
    match side {
        TradeSide::Buy => {
            if royalties.buy_base >= 100.0 || royalties.buy_target >= 100.0 {
                return Some(BondingErrorCode::ArithmeticDomainError);
            }
        }
        TradeSide::Sell => {
            let net = amount * (1.0 - royalties.sell_target / 100.0);
            if net > supply {
                return Some(BondingErrorCode::ArithmeticDomainError);
            }
        }
    }
    None
}

/// Constrói um [`BondingError`] diretamente de um código.
pub fn to_error(code: BondingErrorCode) -> BondingError {
    BondingError::new(code)
}
