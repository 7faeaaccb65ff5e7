//! Referência exata ("goldens") em **BigRational** para curvas de expoente
//! inteiro (`pow % frac == 0`).
//!
//! Serve de oráculo independente para o motor em f64:
//! 1. custo exato de compra por target e resgate exato de venda;
//! 2. resíduo exato da inversão de compra com base: F(S0+Δ) - F(S0) - gasto.
//!
//! Não entra no caminho de produção; só testes e geração de goldens.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};

use super::curve::{NoTransitionFee, PrimitiveCurveConfig, TimeCurveConfig};
use super::errors::{BondingErrorCode, Result};
use super::pricing::PricingEngine;
use super::types::CurveContext;
use crate::{bonding_bail, bonding_err};

// -------------------------
// Helpers de conversão
// -------------------------
fn q(v: f64) -> Result<BigRational> {
    BigRational::from_float(v).ok_or_else(|| {
        bonding_err!(BondingErrorCode::ArithmeticDomainError, reason => format!("{v} sem forma racional"))
    })
}

fn q_pct_keep(pct: f64) -> Result<BigRational> {
    let keep = BigRational::one() - q(pct)? / BigRational::from_integer(BigInt::from(100));
    if !keep.is_positive() {
        bonding_bail!(BondingErrorCode::ArithmeticDomainError, reason => format!("royalty {pct}% sem sobra"));
    }
    Ok(keep)
}

fn rpow(x: &BigRational, e: u32) -> BigRational {
    let mut acc = BigRational::one();
    for _ in 0..e {
        acc = acc * x;
    }
    acc
}

fn to_f64(r: &BigRational) -> f64 {
    r.to_f64().unwrap_or(f64::NAN)
}

/// Erro relativo |engine - exato| / max(|exato|, 1).
pub fn rel_error(engine: f64, exact: &BigRational) -> f64 {
    let exact_f = to_f64(exact);
    (engine - exact_f).abs() / exact_f.abs().max(1.0)
}

/// (c, b, k) racionais; só expoentes inteiros têm antiderivada racional.
fn integer_terms(curve: &PrimitiveCurveConfig) -> Result<(BigRational, BigRational, u32)> {
    let PrimitiveCurveConfig::Exponential { c, b, pow, frac } = *curve;
    if pow % frac != 0 {
        bonding_bail!(
            BondingErrorCode::ArithmeticDomainError,
            reason => format!("expoente {pow}/{frac} não inteiro")
        );
    }
    Ok((q(c)?, q(b)?, u32::from(pow / frac)))
}

// -------------------------
// Exato
// -------------------------
/// F(s) exato.
pub fn exact_antiderivative(curve: &PrimitiveCurveConfig, s: &BigRational) -> Result<BigRational> {
    let (c, b, k) = integer_terms(curve)?;
    let k1 = BigRational::from_integer(BigInt::from(k + 1));
    Ok(c / k1 * rpow(s, k + 1) + b * s)
}

/// Integral exata sobre [s0, s0+Δ].
pub fn exact_integral(curve: &PrimitiveCurveConfig, s0: &BigRational, delta: &BigRational) -> Result<BigRational> {
    let end = s0 + delta;
    Ok(exact_antiderivative(curve, &end)? - exact_antiderivative(curve, s0)?)
}

/// Base exata para receber `desired` líquido (sem taxa de transição).
pub fn exact_buy_target_cost(
    curve: &PrimitiveCurveConfig,
    s0: f64,
    desired: f64,
    buy_base_pct: f64,
    buy_target_pct: f64,
) -> Result<BigRational> {
    let gross = q(desired)? / q_pct_keep(buy_target_pct)?;
    let cost = exact_integral(curve, &q(s0)?, &gross)?;
    Ok(cost / q_pct_keep(buy_base_pct)?)
}

/// Base exata resgatada ao vender `amount` (sem taxa de transição).
pub fn exact_sell_reclaim(
    curve: &PrimitiveCurveConfig,
    s0: f64,
    amount: f64,
    sell_base_pct: f64,
    sell_target_pct: f64,
) -> Result<BigRational> {
    let net = q(amount)? * q_pct_keep(sell_target_pct)?;
    let s0 = q(s0)?;
    if net > s0 {
        bonding_bail!(BondingErrorCode::ArithmeticDomainError, reason => "venda acima do supply");
    }
    let start = &s0 - &net;
    Ok(exact_integral(curve, &start, &net)? * q_pct_keep(sell_base_pct)?)
}

// -------------------------
// Estruturas de comparação (goldens)
// -------------------------
#[derive(Debug, Clone)]
pub struct GoldenQuote {
    pub engine: f64,
    pub exact: BigRational,
    pub rel_error: f64,
}

#[derive(Debug, Clone)]
pub struct GoldenInverse {
    /// Target líquido devolvido pelo motor.
    pub engine_target: f64,
    /// F(S0+Δ) - F(S0) exato no Δ do motor.
    pub spend_at_engine_delta: BigRational,
    /// |gasto exato - gasto pedido| / max(gasto pedido, 1).
    pub rel_residual: f64,
}

fn engine_for<'a>(curve: &'a TimeCurveConfig, s0: f64) -> PricingEngine<'a> {
    static NO_FEE: NoTransitionFee = NoTransitionFee;
    let ctx = CurveContext {
        reserve: 0.0,
        supply: s0,
        base_decimals: 9,
        target_decimals: 9,
        go_live_unix_time: 0,
        freeze_buy_unix_time: None,
        now_unix_time: 0,
    };
    PricingEngine::new(curve, ctx).with_fee_hook(&NO_FEE)
}

/// Compara `buy_target_amount` do motor com a referência exata.
pub fn golden_buy_target_amount(
    curve: &PrimitiveCurveConfig,
    s0: f64,
    desired: f64,
    buy_base_pct: f64,
    buy_target_pct: f64,
) -> Result<GoldenQuote> {
    let cfg = TimeCurveConfig::single(*curve)?;
    let engine = engine_for(&cfg, s0).buy_target_amount(desired, buy_base_pct, buy_target_pct)?;
    let exact = exact_buy_target_cost(curve, s0, desired, buy_base_pct, buy_target_pct)?;
    Ok(GoldenQuote { engine, rel_error: rel_error(engine, &exact), exact })
}

/// Compara `sell_target_amount` do motor com a referência exata.
pub fn golden_sell_target_amount(
    curve: &PrimitiveCurveConfig,
    s0: f64,
    amount: f64,
    sell_base_pct: f64,
    sell_target_pct: f64,
) -> Result<GoldenQuote> {
    let cfg = TimeCurveConfig::single(*curve)?;
    let engine = engine_for(&cfg, s0).sell_target_amount(amount, sell_base_pct, sell_target_pct)?;
    let exact = exact_sell_reclaim(curve, s0, amount, sell_base_pct, sell_target_pct)?;
    Ok(GoldenQuote { engine, rel_error: rel_error(engine, &exact), exact })
}

/// Resíduo exato da inversão de `buy_with_base_amount` (royalties zerados).
pub fn golden_buy_with_base(curve: &PrimitiveCurveConfig, s0: f64, base: f64) -> Result<GoldenInverse> {
    let cfg = TimeCurveConfig::single(*curve)?;
    let engine_target = engine_for(&cfg, s0).buy_with_base_amount(base, 0.0, 0.0)?;
    let spend = exact_integral(curve, &q(s0)?, &q(engine_target)?)?;
    let requested = q(base)?;
    let diff = (&spend - &requested).abs();
    let scale = if requested.abs() > BigRational::one() { requested.abs() } else { BigRational::one() };
    let rel_residual = if diff.is_zero() { 0.0 } else { to_f64(&(diff / scale)) };
    Ok(GoldenInverse { engine_target, spend_at_engine_delta: spend, rel_residual })
}
