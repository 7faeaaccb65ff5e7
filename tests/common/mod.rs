//! Fixture compartilhada: SOL(embrulhado) → X → Y num ledger em memória.
#![allow(dead_code)]

use std::sync::Arc;

use bonding_router::bonding::types::MintInfo;
use bonding_router::testing::InMemoryLedger;
use bonding_router::{
    BondingCurveNode, PrimitiveCurveConfig, Pubkey, RouterConfig, RoyaltyPercentages, SwapRouter, TimeCurveConfig,
};

pub const NOW: i64 = 1_700_000_000;
pub const DECIMALS: u8 = 6;
pub const ONE: u64 = 1_000_000;

pub fn native() -> Pubkey {
    Pubkey::repeat(1)
}
pub fn wrapped() -> Pubkey {
    Pubkey::repeat(2)
}
pub fn mint_x() -> Pubkey {
    Pubkey::repeat(3)
}
pub fn mint_y() -> Pubkey {
    Pubkey::repeat(4)
}
pub fn curve_a() -> Pubkey {
    Pubkey::repeat(0xa1)
}
pub fn curve_b() -> Pubkey {
    Pubkey::repeat(0xa2)
}
pub fn wallet() -> Pubkey {
    Pubkey::repeat(0xee)
}

pub fn config() -> RouterConfig {
    RouterConfig { native_mint: native(), wrapped_native_mint: wrapped(), ..RouterConfig::default() }
}

pub fn linear() -> TimeCurveConfig {
    TimeCurveConfig::single(PrimitiveCurveConfig::exponential(1.0, 0.0, 1, 1).unwrap()).unwrap()
}

pub fn node(address: Pubkey, base: Pubkey, target: Pubkey, config: Pubkey, supply_raw: u64) -> BondingCurveNode {
    BondingCurveNode {
        address,
        base_mint: base,
        target_mint: target,
        curve_config: config,
        reserve_raw: 0,
        supply_raw,
        base_decimals: DECIMALS,
        target_decimals: DECIMALS,
        royalties: RoyaltyPercentages::ZERO,
        go_live_unix_time: NOW - 3_600,
        freeze_buy_unix_time: None,
        buy_frozen: false,
        sell_frozen: false,
        index: 0,
    }
}

/// A: SOL → X ; B: X → Y. Ambas c=1, b=0 (preço = supply).
pub fn ledger_with_supplies(supply_x: u64, supply_y: u64) -> Arc<InMemoryLedger> {
    let ledger = InMemoryLedger::new(NOW).with_wrapped_native(wrapped());
    ledger.set_mint(wrapped(), MintInfo { decimals: DECIMALS, supply: 0 });
    ledger.add_curve(node(curve_a(), wrapped(), mint_x(), Pubkey::repeat(0xc1), supply_x), linear());
    ledger.add_curve(node(curve_b(), mint_x(), mint_y(), Pubkey::repeat(0xc2), supply_y), linear());
    ledger.set_native_balance(wallet(), 1_000 * ONE);
    Arc::new(ledger)
}

pub fn ledger() -> Arc<InMemoryLedger> {
    ledger_with_supplies(0, 0)
}

pub type MemRouter = SwapRouter<InMemoryLedger, InMemoryLedger, InMemoryLedger>;

pub fn router(ledger: &Arc<InMemoryLedger>) -> MemRouter {
    SwapRouter::new(ledger.clone(), ledger.clone(), ledger.clone(), config(), wallet())
}
