//! Configuração do roteador: endereços de deployment e política de releitura.
//!
//! Ordem de precedência: JSON explícito → variáveis `BND_*` → padrões.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::bonding::errors::{BondingErrorCode, Result};
use crate::bonding::guardrails::ensure_slippage;
use crate::bonding::retry::RetryPolicy;
use crate::bonding::types::Pubkey;
use crate::{bonding_bail, bonding_err};

pub const ENV_NATIVE_MINT: &str = "BND_NATIVE_MINT";
pub const ENV_WRAPPED_NATIVE_MINT: &str = "BND_WRAPPED_NATIVE_MINT";
pub const ENV_RETRY_ATTEMPTS: &str = "BND_BALANCE_RETRY_ATTEMPTS";
pub const ENV_RETRY_DELAY_MS: &str = "BND_BALANCE_RETRY_DELAY_MS";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub delay_ms: u64,
    pub backoff: f64,
    pub deadline_ms: Option<u64>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let p = RetryPolicy::default();
        Self {
            max_attempts: p.max_attempts,
            delay_ms: p.delay.as_millis() as u64,
            backoff: p.backoff,
            deadline_ms: p.deadline.map(|d| d.as_millis() as u64),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Mint do ativo nativo do ledger.
    pub native_mint: Pubkey,
    /// Forma embrulhada do nativo; é o que aparece como base nas curvas.
    pub wrapped_native_mint: Pubkey,
    pub balance_retry: RetrySettings,
    /// Slippage por hop quando o pedido não traz um (fração).
    pub default_slippage: f64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            native_mint: Pubkey::default(),
            wrapped_native_mint: Pubkey::default(),
            balance_retry: RetrySettings::default(),
            default_slippage: 0.05,
        }
    }
}

impl RouterConfig {
    pub fn from_json(raw: &str) -> Result<Self> {
        let cfg: RouterConfig = serde_json::from_str(raw).map_err(|e| {
            bonding_err!(BondingErrorCode::ConfigValidationError, reason => format!("router config: {e}"))
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Como `from_env`, mas com uma fonte de variáveis injetada.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = RouterConfig::default();
        if let Some(v) = lookup(ENV_NATIVE_MINT) {
            cfg.native_mint = v.parse()?;
        }
        if let Some(v) = lookup(ENV_WRAPPED_NATIVE_MINT) {
            cfg.wrapped_native_mint = v.parse()?;
        }
        if let Some(v) = lookup(ENV_RETRY_ATTEMPTS) {
            cfg.balance_retry.max_attempts = parse_env(ENV_RETRY_ATTEMPTS, &v)?;
        }
        if let Some(v) = lookup(ENV_RETRY_DELAY_MS) {
            cfg.balance_retry.delay_ms = parse_env(ENV_RETRY_DELAY_MS, &v)?;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        ensure_slippage(self.default_slippage)?;
        let backoff = self.balance_retry.backoff;
        if !backoff.is_finite() || backoff < 1.0 {
            bonding_bail!(
                BondingErrorCode::ConfigValidationError,
                reason => format!("backoff deve ser >= 1 ({backoff})")
            );
        }
        Ok(())
    }

    /// Troca o mint nativo pela forma embrulhada; demais mints passam direto.
    pub fn canonical_mint(&self, mint: &Pubkey) -> Pubkey {
        if *mint == self.native_mint {
            self.wrapped_native_mint
        } else {
            *mint
        }
    }

    pub fn is_native(&self, mint: &Pubkey) -> bool {
        *mint == self.native_mint || *mint == self.wrapped_native_mint
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let s = &self.balance_retry;
        RetryPolicy::fixed(s.max_attempts, Duration::from_millis(s.delay_ms))
            .with_backoff(s.backoff)
            .with_deadline(s.deadline_ms.map(Duration::from_millis))
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| {
        bonding_err!(BondingErrorCode::ConfigValidationError, reason => format!("{key}={raw}: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_retry_policy() {
        let cfg = RouterConfig::default();
        assert_eq!(cfg.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn env_overrides() {
        let native = Pubkey::repeat(1).to_string();
        let wrapped = Pubkey::repeat(2).to_string();
        let vars: HashMap<&str, String> = [
            (ENV_NATIVE_MINT, native),
            (ENV_WRAPPED_NATIVE_MINT, wrapped),
            (ENV_RETRY_ATTEMPTS, "2".to_string()),
            (ENV_RETRY_DELAY_MS, " 50 ".to_string()),
        ]
        .into_iter()
        .collect();
        let cfg = RouterConfig::from_lookup(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(cfg.canonical_mint(&Pubkey::repeat(1)), Pubkey::repeat(2));
        assert_eq!(cfg.canonical_mint(&Pubkey::repeat(7)), Pubkey::repeat(7));
        let p = cfg.retry_policy();
        assert_eq!(p.max_attempts, 2);
        assert_eq!(p.delay, Duration::from_millis(50));
    }

    #[test]
    fn env_rejects_garbage() {
        let err = RouterConfig::from_lookup(|k| (k == ENV_RETRY_ATTEMPTS).then(|| "muitas".to_string()))
            .unwrap_err();
        assert!(err.is(BondingErrorCode::ConfigValidationError));
    }

    #[test]
    fn json_partial_uses_defaults() {
        let cfg = RouterConfig::from_json(r#"{"default_slippage":0.01}"#).unwrap();
        assert_eq!(cfg.default_slippage, 0.01);
        assert_eq!(cfg.balance_retry.max_attempts, 4);
        assert!(RouterConfig::from_json(r#"{"default_slippage":2.0}"#).is_err());
    }
}
