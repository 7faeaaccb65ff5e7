//! Modelo de curva: preço e integral de uma curva primitiva, segmentação
//! temporal e hook de taxas de transição.
//!
//! price(S) = c·S^k + b, com k = pow/frac
//! F(S)     = c/(k+1)·S^(k+1) + b·S        (antiderivada)
//! custo de [S0, S0+Δ] = F(S0+Δ) - F(S0)

use serde::{Deserialize, Serialize};

use super::errors::{BondingErrorCode, Result};
use super::guardrails::ensure_percentage;
use super::types::TradeSide;
use crate::{bonding_bail, bonding_err};

/// Tipos de curva reconhecidos na forma serializada (`kind`).
pub const KNOWN_CURVE_KINDS: &[&str] = &["exponential"];

/// Curva primitiva. Novos tipos entram como nova variante.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PrimitiveCurveConfig {
    /// price(S) = c·S^(pow/frac) + b
    Exponential { c: f64, b: f64, pow: u8, frac: u8 },
}

impl PrimitiveCurveConfig {
    /// Constrói e valida uma curva exponencial.
    pub fn exponential(c: f64, b: f64, pow: u8, frac: u8) -> Result<Self> {
        let curve = PrimitiveCurveConfig::Exponential { c, b, pow, frac };
        curve.validate()?;
        Ok(curve)
    }

    pub fn validate(&self) -> Result<()> {
        match *self {
            PrimitiveCurveConfig::Exponential { c, b, pow: _, frac } => {
                if !c.is_finite() || !b.is_finite() {
                    bonding_bail!(
                        BondingErrorCode::ConfigValidationError,
                        reason => "c e b precisam ser finitos"
                    );
                }
                if frac == 0 {
                    bonding_bail!(BondingErrorCode::ConfigValidationError, reason => "frac deve ser > 0");
                }
                // integral fechada fica intratável com os dois termos positivos
                if c > 0.0 && b > 0.0 {
                    bonding_bail!(
                        BondingErrorCode::ConfigValidationError,
                        reason => "c e b não podem ser ambos positivos"
                    );
                }
                Ok(())
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PrimitiveCurveConfig::Exponential { .. } => "exponential",
        }
    }

    /// Expoente k = pow/frac.
    pub fn exponent(&self) -> f64 {
        match *self {
            PrimitiveCurveConfig::Exponential { pow, frac, .. } => f64::from(pow) / f64::from(frac),
        }
    }

    /// Preço marginal no supply `s`.
    pub fn price(&self, s: f64) -> f64 {
        match *self {
            PrimitiveCurveConfig::Exponential { c, b, pow, .. } => {
                if c == 0.0 {
                    return b;
                }
                if pow == 0 {
                    return c + b;
                }
                c * s.max(0.0).powf(self.exponent()) + b
            }
        }
    }

    /// F(s) = c/(k+1)·s^(k+1) + b·s
    pub fn antiderivative(&self, s: f64) -> f64 {
        match *self {
            PrimitiveCurveConfig::Exponential { c, b, .. } => {
                let s = s.max(0.0);
                let k1 = self.exponent() + 1.0;
                let curve_term = if c == 0.0 { 0.0 } else { c / k1 * s.powf(k1) };
                let linear_term = if b == 0.0 { 0.0 } else { b * s };
                curve_term + linear_term
            }
        }
    }

    /// Custo de mover o supply de `s0` para `s0 + delta`.
    pub fn integral(&self, s0: f64, delta: f64) -> f64 {
        match *self {
            PrimitiveCurveConfig::Exponential { c, b, .. } => {
                if c == 0.0 {
                    return b * delta;
                }
                let k1 = self.exponent() + 1.0;
                let curve_term = c / k1 * ((s0 + delta).max(0.0).powf(k1) - s0.max(0.0).powf(k1));
                curve_term + b * delta
            }
        }
    }
}

/// Taxa de transição de um segmento: `percentage` decai até 0 em `interval_secs`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionFee {
    pub percentage: f64,
    pub interval_secs: u64,
}

/// Segmento de uma curva temporal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeCurveSegment {
    pub offset_secs: u64,
    pub curve: PrimitiveCurveConfig,
    #[serde(default)]
    pub buy_transition_fee: Option<TransitionFee>,
    #[serde(default)]
    pub sell_transition_fee: Option<TransitionFee>,
}

impl TimeCurveSegment {
    pub fn new(offset_secs: u64, curve: PrimitiveCurveConfig) -> Self {
        Self {
            offset_secs,
            curve,
            buy_transition_fee: None,
            sell_transition_fee: None,
        }
    }

    pub fn with_transition_fees(
        mut self,
        buy: Option<TransitionFee>,
        sell: Option<TransitionFee>,
    ) -> Self {
        self.buy_transition_fee = buy;
        self.sell_transition_fee = sell;
        self
    }

    pub fn transition_fee(&self, side: TradeSide) -> Option<&TransitionFee> {
        match side {
            TradeSide::Buy => self.buy_transition_fee.as_ref(),
            TradeSide::Sell => self.sell_transition_fee.as_ref(),
        }
    }
}

/// Sequência de segmentos ordenada por offset. Sempre validada.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TimeCurveConfig {
    segments: Vec<TimeCurveSegment>,
}

impl TimeCurveConfig {
    /// Valida: não vazio, primeiro offset 0, offsets estritamente crescentes.
    pub fn new(segments: Vec<TimeCurveSegment>) -> Result<Self> {
        let Some(first) = segments.first() else {
            bonding_bail!(BondingErrorCode::ConfigValidationError, reason => "curva sem segmentos");
        };
        if first.offset_secs != 0 {
            bonding_bail!(
                BondingErrorCode::ConfigValidationError,
                reason => format!("primeiro offset deve ser 0 ({})", first.offset_secs)
            );
        }
        for pair in segments.windows(2) {
            if pair[1].offset_secs <= pair[0].offset_secs {
                bonding_bail!(
                    BondingErrorCode::ConfigValidationError,
                    reason => format!(
                        "offsets não crescentes ({} -> {})",
                        pair[0].offset_secs, pair[1].offset_secs
                    )
                );
            }
        }
        for segment in &segments {
            segment.curve.validate()?;
            for fee in [&segment.buy_transition_fee, &segment.sell_transition_fee]
                .into_iter()
                .flatten()
            {
                ensure_percentage("transition_fee", fee.percentage)?;
            }
        }
        Ok(Self { segments })
    }

    /// Curva de segmento único.
    pub fn single(curve: PrimitiveCurveConfig) -> Result<Self> {
        Self::new(vec![TimeCurveSegment::new(0, curve)])
    }

    pub fn segments(&self) -> &[TimeCurveSegment] {
        &self.segments
    }

    /// Índice do segmento ativo: o último com `offset <= elapsed`.
    pub fn active_index(&self, elapsed_secs: u64) -> usize {
        self.segments
            .iter()
            .rposition(|s| s.offset_secs <= elapsed_secs)
            .unwrap_or(0)
    }

    /// Segmento ativo e o tempo decorrido dentro dele.
    pub fn active_segment(&self, elapsed_secs: u64) -> ActiveSegment<'_> {
        let index = self.active_index(elapsed_secs);
        let segment = &self.segments[index];
        ActiveSegment {
            index,
            segment,
            local_elapsed_secs: elapsed_secs - segment.offset_secs,
        }
    }

    /// Decodifica a forma JSON: primitiva solta (`{"kind":...}`) ou
    /// `{"segments":[...]}`. Tipos desconhecidos viram `UnsupportedCurveKind`.
    pub fn from_json(raw: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(raw).map_err(|e| {
            bonding_err!(BondingErrorCode::ConfigValidationError, reason => format!("json: {e}"))
        })?;
        match value.get("segments") {
            Some(serde_json::Value::Array(items)) => {
                let mut segments = Vec::with_capacity(items.len());
                for item in items {
                    let curve_value = item.get("curve").cloned().unwrap_or(serde_json::Value::Null);
                    check_kind(&curve_value)?;
                    let segment: TimeCurveSegment = serde_json::from_value(item.clone()).map_err(|e| {
                        bonding_err!(BondingErrorCode::ConfigValidationError, reason => format!("segmento: {e}"))
                    })?;
                    segments.push(segment);
                }
                Self::new(segments)
            }
            Some(_) => Err(bonding_err!(
                BondingErrorCode::ConfigValidationError,
                reason => "segments deve ser uma lista"
            )),
            None => {
                check_kind(&value)?;
                let curve: PrimitiveCurveConfig = serde_json::from_value(value).map_err(|e| {
                    bonding_err!(BondingErrorCode::ConfigValidationError, reason => format!("curva: {e}"))
                })?;
                Self::single(curve)
            }
        }
    }
}

impl<'de> Deserialize<'de> for TimeCurveConfig {
    fn deserialize<D>(deserializer: D) -> core::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            segments: Vec<TimeCurveSegment>,
        }
        let raw = Raw::deserialize(deserializer)?;
        TimeCurveConfig::new(raw.segments).map_err(serde::de::Error::custom)
    }
}

fn check_kind(curve: &serde_json::Value) -> Result<()> {
    let kind = curve.get("kind").and_then(|k| k.as_str()).unwrap_or("");
    if !KNOWN_CURVE_KINDS.contains(&kind) {
        bonding_bail!(BondingErrorCode::UnsupportedCurveKind, kind => kind);
    }
    Ok(())
}

/// Segmento selecionado para um instante.
#[derive(Copy, Clone, Debug)]
pub struct ActiveSegment<'a> {
    pub index: usize,
    pub segment: &'a TimeCurveSegment,
    pub local_elapsed_secs: u64,
}

impl<'a> ActiveSegment<'a> {
    pub fn curve(&self) -> &'a PrimitiveCurveConfig {
        &self.segment.curve
    }
}

/// Percentual extra cobrado ao cruzar para um segmento recém-ativo.
pub trait TransitionFeeHook: Send + Sync {
    fn fee_percentage(&self, active: &ActiveSegment<'_>, side: TradeSide) -> f64;
}

/// Sem taxa de transição.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoTransitionFee;

impl TransitionFeeHook for NoTransitionFee {
    fn fee_percentage(&self, _active: &ActiveSegment<'_>, _side: TradeSide) -> f64 {
        0.0
    }
}

/// Decaimento linear: `percentage·(1 - local/interval)` enquanto `local < interval`.
/// O segmento inicial nunca cobra (não há transição no go-live).
#[derive(Copy, Clone, Debug, Default)]
pub struct LinearDecayTransitionFee;

impl TransitionFeeHook for LinearDecayTransitionFee {
    fn fee_percentage(&self, active: &ActiveSegment<'_>, side: TradeSide) -> f64 {
        if active.index == 0 {
            return 0.0;
        }
        let Some(fee) = active.segment.transition_fee(side) else {
            return 0.0;
        };
        if fee.interval_secs == 0 || active.local_elapsed_secs >= fee.interval_secs {
            return 0.0;
        }
        let remaining = 1.0 - active.local_elapsed_secs as f64 / fee.interval_secs as f64;
        fee.percentage * remaining
    }
}
