//! Cota uma compra e roda um swap de dois hops num ledger em memória.
//! Com `OTEL_EXPORTER_OTLP_ENDPOINT` definido exporta traces/métricas; senão só console.
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use bonding_router::bonding::types::MintInfo;
use bonding_router::obs::tracingx::init_fmt;
use bonding_router::testing::InMemoryLedger;
use bonding_router::{
    telemetry, BondingCurveNode, BondingPricing, BuyRequest, PricingEngine, PrimitiveCurveConfig, Pubkey,
    RouterConfig, RoyaltyPercentages, SwapRequest, SwapRouter, TimeCurveConfig,
};

const NOW: i64 = 1_700_000_000;
const DECIMALS: u8 = 6;
const ONE: u64 = 1_000_000;

fn node(address: Pubkey, base: Pubkey, target: Pubkey, config: Pubkey) -> BondingCurveNode {
    BondingCurveNode {
        address,
        base_mint: base,
        target_mint: target,
        curve_config: config,
        reserve_raw: 0,
        supply_raw: 0,
        base_decimals: DECIMALS,
        target_decimals: DECIMALS,
        royalties: RoyaltyPercentages::ZERO,
        go_live_unix_time: NOW - 60,
        freeze_buy_unix_time: None,
        buy_frozen: false,
        sell_frozen: false,
        index: 0,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let tel = if std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() {
        Some(telemetry::init("bonding-router")?)
    } else {
        init_fmt();
        None
    };

    let linear = TimeCurveConfig::single(PrimitiveCurveConfig::exponential(1.0, 0.0, 1, 1)?)?;

    // ---- Cotação isolada ----
    let ctx = node(Pubkey::repeat(0xa1), Pubkey::repeat(2), Pubkey::repeat(3), Pubkey::repeat(0xc1)).context_at(NOW);
    let engine = PricingEngine::new(&linear, ctx);
    let quote = engine.compute_buy(BuyRequest::ExactTarget(10.0), &RoyaltyPercentages::ZERO, 0.05)?;
    info!(target_amount = quote.target_amount, base_amount = quote.base_amount, max_price = quote.bound, "cotação de compra");

    // ---- Swap SOL → X → Y ----
    let (native, wrapped, x, y) = (Pubkey::repeat(1), Pubkey::repeat(2), Pubkey::repeat(3), Pubkey::repeat(4));
    let wallet = Pubkey::repeat(0xee);
    let ledger = InMemoryLedger::new(NOW).with_wrapped_native(wrapped);
    ledger.set_mint(wrapped, MintInfo { decimals: DECIMALS, supply: 0 });
    ledger.add_curve(node(Pubkey::repeat(0xa1), wrapped, x, Pubkey::repeat(0xc1)), linear.clone());
    ledger.add_curve(node(Pubkey::repeat(0xa2), x, y, Pubkey::repeat(0xc2)), linear);
    ledger.set_native_balance(wallet, 1_000 * ONE);
    let ledger = Arc::new(ledger);

    let config = RouterConfig { native_mint: native, wrapped_native_mint: wrapped, ..RouterConfig::default() };
    let router = SwapRouter::new(ledger.clone(), ledger.clone(), ledger.clone(), config, wallet);

    let hierarchy = router.resolve_route(&native, &y).await?;
    let expected = BondingPricing::new(&hierarchy, NOW).swap_target_amount(&wrapped, &y, 50.0)?;
    info!(hops = hierarchy.len(), expected_y = expected, "rota resolvida");

    let outcome = router
        .swap(SwapRequest { base_mint: native, target_mint: y, base_amount: 50 * ONE, per_hop_slippage: None })
        .await?;
    info!(
        state = ?outcome.state,
        held_mint = %outcome.held_mint,
        target_amount = outcome.target_amount,
        "swap finalizado"
    );

    if let Some(tel) = tel {
        tel.shutdown();
    }
    Ok(())
}
