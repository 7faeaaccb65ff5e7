mod common;

use std::time::Duration;

use bonding_router::bonding::retry::{cancel_pair, PollOutcome};
use bonding_router::bonding::router::AbortReason;
use bonding_router::testing::LedgerInstruction;
use bonding_router::{BondingErrorCode, SwapRequest, SwapState, TradeSide};
use common::*;

fn buy_y(amount: u64) -> SwapRequest {
    SwapRequest { base_mint: native(), target_mint: mint_y(), base_amount: amount, per_hop_slippage: Some(0.05) }
}

#[tokio::test(start_paused = true)]
async fn two_hop_buy_chains_observed_amounts() {
    let ledger = ledger();
    let router = router(&ledger);

    let out = router.swap(buy_y(50 * ONE)).await.unwrap();

    assert_eq!(out.state, SwapState::Completed);
    assert_eq!(out.hops.len(), 2);
    assert_eq!(ledger.submissions().len(), 2);
    assert_eq!(out.hops[0].curve, curve_a());
    assert_eq!(out.hops[1].curve, curve_b());
    assert!(out.hops.iter().all(|h| h.side == TradeSide::Buy));
    assert_eq!(out.hops[0].observed_output, 10 * ONE);
    assert_eq!(out.hops[1].input_amount, out.hops[0].observed_output);
    assert_eq!(out.held_mint, mint_y());
    assert_eq!(Some(out.target_amount), ledger.token_balance(&wallet(), &mint_y()));
    assert_eq!(ledger.native_balance(&wallet()), 950 * ONE);
}

#[tokio::test(start_paused = true)]
async fn next_hop_uses_observed_not_theoretical() {
    let ledger = ledger();
    ledger.skim_bps(100);
    let router = router(&ledger);

    let out = router.swap(buy_y(50 * ONE)).await.unwrap();

    assert!(out.is_completed());
    let first = &out.hops[0];
    assert_eq!(first.theoretical_output, 10 * ONE);
    assert_eq!(first.observed_output, 9_900_000);
    assert_eq!(out.hops[1].input_amount, 9_900_000);
    match &ledger.submissions()[1][0] {
        LedgerInstruction::Buy { args, .. } => match args {
            bonding_router::bonding::pricing::BuyArgs::WithBase { base_amount, .. } => {
                assert_eq!(*base_amount, 9_900_000)
            }
            other => panic!("args inesperados: {other:?}"),
        },
        other => panic!("instrução inesperada: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn lagging_reads_are_retried() {
    let ledger = ledger();
    ledger.lag_balance_reads(2);
    let router = router(&ledger);

    let started = tokio::time::Instant::now();
    let out = router.swap(buy_y(50 * ONE)).await.unwrap();

    assert!(out.is_completed());
    assert_eq!(out.hops[0].observed_output, 10 * ONE);
    assert_eq!(out.hops[0].observation, PollOutcome::Ready(10 * ONE));
    // duas esperas de 500 ms por hop
    assert!(started.elapsed() >= Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn unchanged_balance_aborts_with_zero() {
    let ledger = ledger();
    ledger.lag_balance_reads(10);
    let router = router(&ledger);

    let out = router.swap(buy_y(50 * ONE)).await.unwrap();

    assert_eq!(out.state, SwapState::Aborted(AbortReason::NoBalanceChange { hop: 0 }));
    assert_eq!(out.target_amount, 0);
    assert_eq!(out.held_mint, mint_x());
    assert_eq!(out.hops.len(), 1);
    assert_eq!(out.hops[0].observation, PollOutcome::Exhausted { attempts: 5 });
    assert_eq!(ledger.submissions().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn rejection_keeps_accumulated_amount() {
    let ledger = ledger();
    ledger.reject_submission(1);
    let router = router(&ledger);

    let out = router.swap(buy_y(50 * ONE)).await.unwrap();

    match &out.state {
        SwapState::Aborted(AbortReason::Rejected { hop, error }) => {
            assert_eq!(*hop, 1);
            assert!(error.is(BondingErrorCode::ExecutionRejected));
        }
        other => panic!("estado inesperado: {other:?}"),
    }
    assert_eq!(out.target_amount, 10 * ONE);
    assert_eq!(out.held_mint, mint_x());
    assert_eq!(ledger.token_balance(&wallet(), &mint_x()), Some(10 * ONE));
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_observation() {
    let ledger = ledger();
    ledger.lag_balance_reads(10);
    let router = router(&ledger);
    let (handle, signal) = cancel_pair();
    handle.cancel();

    let out = router.swap_with_cancel(buy_y(50 * ONE), Some(&signal)).await.unwrap();

    assert_eq!(out.state, SwapState::Aborted(AbortReason::Cancelled { hop: 0 }));
    assert_eq!(ledger.submissions().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn two_hop_sell_walks_toward_base() {
    let ledger = ledger_with_supplies(1_000 * ONE, 50 * ONE);
    ledger.set_token_balance(wallet(), mint_y(), 5 * ONE);
    let router = router(&ledger);
    let before = ledger.native_balance(&wallet());

    let req = SwapRequest { base_mint: mint_y(), target_mint: native(), base_amount: 5 * ONE, per_hop_slippage: None };
    let out = router.swap(req).await.unwrap();

    assert!(out.is_completed());
    assert_eq!(out.hops.len(), 2);
    assert_eq!(out.hops[0].curve, curve_b());
    assert_eq!(out.hops[1].curve, curve_a());
    assert!(out.hops.iter().all(|h| h.side == TradeSide::Sell));
    assert_eq!(out.hops[1].input_amount, out.hops[0].observed_output);
    assert_eq!(out.held_mint, wrapped());
    assert_eq!(ledger.native_balance(&wallet()), before + out.target_amount);
    assert_eq!(ledger.token_balance(&wallet(), &mint_y()), Some(0));
}

#[tokio::test(start_paused = true)]
async fn frozen_sell_fails_before_building() {
    let ledger = ledger_with_supplies(1_000 * ONE, 50 * ONE);
    let mut b = ledger.curve(&curve_b()).unwrap();
    b.sell_frozen = true;
    ledger.add_curve(b, linear());
    ledger.set_token_balance(wallet(), mint_y(), 5 * ONE);
    let router = router(&ledger);

    let req = SwapRequest { base_mint: mint_y(), target_mint: mint_x(), base_amount: ONE, per_hop_slippage: None };
    let err = router.swap(req).await.unwrap_err();

    assert!(err.is(BondingErrorCode::FrozenCurveError));
    assert!(ledger.submissions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn missing_source_account() {
    let ledger = ledger_with_supplies(1_000 * ONE, 50 * ONE);
    let router = router(&ledger);
    let req = SwapRequest { base_mint: mint_x(), target_mint: mint_y(), base_amount: ONE, per_hop_slippage: None };
    let err = router.swap(req).await.unwrap_err();
    assert!(err.is(BondingErrorCode::SourceAccountMissing));
}

#[tokio::test(start_paused = true)]
async fn unrelated_mints_have_no_route() {
    let ledger = ledger();
    let router = router(&ledger);
    let req = SwapRequest {
        base_mint: mint_x(),
        target_mint: bonding_router::Pubkey::repeat(0x77),
        base_amount: ONE,
        per_hop_slippage: None,
    };
    let err = router.swap(req).await.unwrap_err();
    assert!(err.is(BondingErrorCode::NoRouteFound));
    assert!(ledger.submissions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn broken_target_chain_falls_back_to_base_chain() {
    let ledger = ledger_with_supplies(1_000 * ONE, 50 * ONE);
    // X → SOL fecha um ciclo na cadeia que parte de X
    ledger.add_curve(
        node(bonding_router::Pubkey::repeat(0xa3), mint_x(), wrapped(), bonding_router::Pubkey::repeat(0xc3), 0),
        linear(),
    );
    ledger.set_token_balance(wallet(), mint_y(), 5 * ONE);
    let router = router(&ledger);

    let hierarchy = router.resolve_route(&mint_y(), &mint_x()).await.unwrap();
    assert_eq!(hierarchy.len(), 1);
    assert_eq!(hierarchy.to_array()[0].node.address, curve_b());

    let req = SwapRequest { base_mint: mint_y(), target_mint: mint_x(), base_amount: ONE, per_hop_slippage: None };
    let out = router.swap(req).await.unwrap();
    assert!(out.is_completed());
    assert_eq!(out.hops.len(), 1);
    assert_eq!(out.hops[0].curve, curve_b());
    assert_eq!(out.held_mint, mint_x());
}
