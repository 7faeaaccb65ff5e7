//! Tipos básicos do motor de bonding: endereços, royalties, snapshots de curva.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::{BondingErrorCode, Result};
use crate::bonding_err;

/// Endereço de conta (32 bytes), exibido em hex.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pubkey(pub [u8; 32]);

impl Pubkey {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Endereço determinístico para testes e demos: todos os bytes em `b`.
    pub const fn repeat(b: u8) -> Self {
        Self([b; 32])
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let full = hex::encode(self.0);
        write!(f, "Pubkey({}…)", &full[..8])
    }
}

impl FromStr for Pubkey {
    type Err = super::errors::BondingError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim()).map_err(|e| {
            bonding_err!(BondingErrorCode::ConfigValidationError, reason => format!("pubkey hex: {e}"))
        })?;
        let arr: [u8; 32] = bytes.try_into().map_err(|_| {
            bonding_err!(BondingErrorCode::ConfigValidationError, reason => "pubkey deve ter 32 bytes")
        })?;
        Ok(Pubkey(arr))
    }
}

impl TryFrom<String> for Pubkey {
    type Error = super::errors::BondingError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Pubkey> for String {
    fn from(value: Pubkey) -> Self {
        value.to_string()
    }
}

/// Lado de uma operação contra a curva.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Buy => f.write_str("buy"),
            TradeSide::Sell => f.write_str("sell"),
        }
    }
}

/// Royalties em percentual (0..=100), aplicados multiplicativamente.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RoyaltyPercentages {
    pub buy_base: f64,
    pub buy_target: f64,
    pub sell_base: f64,
    pub sell_target: f64,
}

impl RoyaltyPercentages {
    pub const ZERO: RoyaltyPercentages = RoyaltyPercentages {
        buy_base: 0.0,
        buy_target: 0.0,
        sell_base: 0.0,
        sell_target: 0.0,
    };

    pub fn new(buy_base: f64, buy_target: f64, sell_base: f64, sell_target: f64) -> Result<Self> {
        let r = Self { buy_base, buy_target, sell_base, sell_target };
        r.validate()?;
        Ok(r)
    }

    /// Todos os percentuais finitos e em [0, 100].
    pub fn validate(&self) -> Result<()> {
        for (name, pct) in [
            ("buy_base", self.buy_base),
            ("buy_target", self.buy_target),
            ("sell_base", self.sell_base),
            ("sell_target", self.sell_target),
        ] {
            super::guardrails::ensure_percentage(name, pct)?;
        }
        Ok(())
    }
}

/// Snapshot de estado usado por uma avaliação de preço.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurveContext {
    /// Reserva de base, em unidades inteiras do token base.
    pub reserve: f64,
    /// Supply circulante do target, em unidades inteiras.
    pub supply: f64,
    pub base_decimals: u8,
    pub target_decimals: u8,
    pub go_live_unix_time: i64,
    pub freeze_buy_unix_time: Option<i64>,
    pub now_unix_time: i64,
}

impl CurveContext {
    /// Segundos desde o go-live (nunca negativo).
    pub fn elapsed_secs(&self) -> u64 {
        self.now_unix_time.saturating_sub(self.go_live_unix_time).max(0) as u64
    }

    pub fn is_live(&self) -> bool {
        self.now_unix_time >= self.go_live_unix_time
    }

    pub fn buy_window_closed(&self) -> bool {
        matches!(self.freeze_buy_unix_time, Some(t) if t <= self.now_unix_time)
    }
}

/// Informações de um mint.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintInfo {
    pub decimals: u8,
    /// Supply bruto (menor unidade).
    pub supply: u64,
}

/// Snapshot imutável de uma curva de bonding on-ledger.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BondingCurveNode {
    pub address: Pubkey,
    pub base_mint: Pubkey,
    pub target_mint: Pubkey,
    pub curve_config: Pubkey,
    /// Reserva de base, bruta.
    pub reserve_raw: u64,
    /// Supply do target, bruto.
    pub supply_raw: u64,
    pub base_decimals: u8,
    pub target_decimals: u8,
    pub royalties: RoyaltyPercentages,
    pub go_live_unix_time: i64,
    pub freeze_buy_unix_time: Option<i64>,
    pub buy_frozen: bool,
    pub sell_frozen: bool,
    /// 0 = curva canônica do target mint.
    pub index: u16,
}

impl BondingCurveNode {
    pub fn is_canonical(&self) -> bool {
        self.index == 0
    }

    /// Monta o contexto de avaliação para o instante `now`.
    pub fn context_at(&self, now_unix_time: i64) -> CurveContext {
        CurveContext {
            reserve: super::guardrails::to_units(self.reserve_raw, self.base_decimals),
            supply: super::guardrails::to_units(self.supply_raw, self.target_decimals),
            base_decimals: self.base_decimals,
            target_decimals: self.target_decimals,
            go_live_unix_time: self.go_live_unix_time,
            freeze_buy_unix_time: self.freeze_buy_unix_time,
            now_unix_time,
        }
    }
}
