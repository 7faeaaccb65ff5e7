//! Validações e helpers numéricos seguros para o motor de bonding.
//! Objetivo: entradas finitas, percentuais no intervalo e conversões bruto↔unidade.

use super::errors::{BondingErrorCode, Result};
use crate::{bonding_bail, bonding_err};

/// Tolerância relativa usada nas comparações em ponto flutuante.
pub const REL_EPSILON: f64 = 1e-9;

#[inline]
pub fn ensure_finite(name: &str, v: f64) -> Result<f64> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(bonding_err!(
            BondingErrorCode::ArithmeticDomainError,
            reason => format!("{name} não é finito ({v})")
        ))
    }
}

/// Quantidade negociada: finita e > 0.
#[inline]
pub fn ensure_positive_amount(name: &str, v: f64) -> Result<f64> {
    ensure_finite(name, v)?;
    if v <= 0.0 {
        bonding_bail!(
            BondingErrorCode::ArithmeticDomainError,
            reason => format!("{name} deve ser > 0 ({v})")
        );
    }
    Ok(v)
}

#[inline]
pub fn ensure_percentage(name: &str, pct: f64) -> Result<f64> {
    if !pct.is_finite() || !(0.0..=100.0).contains(&pct) {
        bonding_bail!(
            BondingErrorCode::ConfigValidationError,
            reason => format!("{name} fora de [0,100] ({pct})")
        );
    }
    Ok(pct)
}

/// Slippage como fração (0.05 = 5%), em [0, 1).
#[inline]
pub fn ensure_slippage(slippage: f64) -> Result<f64> {
    if !slippage.is_finite() || !(0.0..1.0).contains(&slippage) {
        bonding_bail!(
            BondingErrorCode::ConfigValidationError,
            reason => format!("slippage fora de [0,1) ({slippage})")
        );
    }
    Ok(slippage)
}

/// Fator que sobra após um royalty: `1 - pct/100`.
/// Royalty de 100% zera o fator; quem divide por ele precisa checar.
#[inline]
pub fn keep_factor(pct: f64) -> f64 {
    1.0 - pct / 100.0
}

/// Divide pelo fator de royalty, falhando se o royalty consome tudo.
#[inline]
pub fn gross_up(amount: f64, pct: f64) -> Result<f64> {
    let factor = keep_factor(pct);
    if factor <= 0.0 {
        bonding_bail!(
            BondingErrorCode::ArithmeticDomainError,
            reason => format!("royalty de {pct}% consome todo o montante")
        );
    }
    Ok(amount / factor)
}

/// Bruto → unidades inteiras (`raw / 10^decimals`).
#[inline]
pub fn to_units(raw: u64, decimals: u8) -> f64 {
    raw as f64 / 10f64.powi(i32::from(decimals))
}

/// Unidades → bruto com **floor**; satura em `u64::MAX`, negativo vira 0.
#[inline]
pub fn to_raw_floor(units: f64, decimals: u8) -> u64 {
    let scaled = units * 10f64.powi(i32::from(decimals));
    if !scaled.is_finite() || scaled <= 0.0 {
        return 0;
    }
    if scaled >= u64::MAX as f64 {
        return u64::MAX;
    }
    scaled.floor() as u64
}

/// Unidades → bruto com **ceil** (limites máximos de gasto).
#[inline]
pub fn to_raw_ceil(units: f64, decimals: u8) -> u64 {
    let scaled = units * 10f64.powi(i32::from(decimals));
    if !scaled.is_finite() || scaled <= 0.0 {
        return 0;
    }
    if scaled >= u64::MAX as f64 {
        return u64::MAX;
    }
    scaled.ceil() as u64
}

/// `a ≈ b` em tolerância relativa (com piso absoluto `REL_EPSILON`).
#[inline]
pub fn approx_eq(a: f64, b: f64, rel: f64) -> bool {
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= rel * scale
}

// -------------------------
// TESTES
// -------------------------
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_positive_amount() {
        assert!(ensure_positive_amount("x", 1.0).is_ok());
        assert!(ensure_positive_amount("x", 0.0).is_err());
        assert!(ensure_positive_amount("x", -2.0).is_err());
        let err = ensure_positive_amount("x", f64::INFINITY).unwrap_err();
        assert!(err.is(BondingErrorCode::ArithmeticDomainError));
    }

    #[test]
    fn t_slippage_bounds() {
        assert!(ensure_slippage(0.0).is_ok());
        assert!(ensure_slippage(0.99).is_ok());
        assert!(ensure_slippage(1.0).is_err());
        assert!(ensure_slippage(-0.1).is_err());
    }

    #[test]
    fn t_gross_up() {
        assert!(approx_eq(gross_up(9.0, 10.0).unwrap(), 10.0, REL_EPSILON));
        assert!(gross_up(1.0, 100.0).is_err());
    }

    #[test]
    fn t_units_conversion() {
        assert_eq!(to_units(1_500_000_000, 9), 1.5);
        assert_eq!(to_raw_floor(1.5, 9), 1_500_000_000);
        assert_eq!(to_raw_floor(0.0000000019, 9), 1);
        assert_eq!(to_raw_ceil(0.0000000011, 9), 2);
        assert_eq!(to_raw_floor(-3.0, 6), 0);
        assert_eq!(to_raw_floor(f64::MAX, 6), u64::MAX);
    }
}
