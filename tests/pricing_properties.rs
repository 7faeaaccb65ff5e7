use proptest::prelude::*;
use bonding_router::bonding::roots::root_estimates;
use bonding_router::{CurveContext, PricingEngine, PrimitiveCurveConfig, TimeCurveConfig};

fn ctx(supply: f64) -> CurveContext {
    CurveContext {
        reserve: 0.0,
        supply,
        base_decimals: 9,
        target_decimals: 9,
        go_live_unix_time: 0,
        freeze_buy_unix_time: None,
        now_unix_time: 0,
    }
}

#[inline]
fn rel(a: f64, b: f64) -> f64 {
    (a - b).abs() / a.abs().max(b.abs()).max(1e-12)
}

// expoente >= 1: com c >= 0.2 e S0 >= 10 o preço segue positivo mesmo com b<0
fn exponents() -> impl Strategy<Value = (u8, u8)> {
    prop_oneof![
        Just((1u8, 1u8)),
        Just((2, 1)),
        Just((3, 2)),
        Just((4, 2)),
        Just((2, 2)),
        Just((6, 4)),
        Just((5, 3)),
    ]
}

proptest! {
#![proptest_config(ProptestConfig { cases: 2_000, .. ProptestConfig::default() })]

// (P1) comprar Δ e depois gastar o custo devolve Δ
#[test]
fn buy_inverse_roundtrip(
    c in 0.2f64..10.0,
    b in -1.0f64..=0.0,
    (pow, frac) in exponents(),
    s0 in 10.0f64..1_000.0,
    delta in 0.1f64..500.0,
) {
    let cfg = TimeCurveConfig::single(PrimitiveCurveConfig::exponential(c, b, pow, frac).unwrap()).unwrap();
    let engine = PricingEngine::new(&cfg, ctx(s0));
    let cost = engine.buy_target_amount(delta, 0.0, 0.0).unwrap();
    prop_assume!(cost > 0.0);
    let back = engine.buy_with_base_amount(cost, 0.0, 0.0).unwrap();
    prop_assert!(rel(back, delta) < 1e-6, "Δ={} back={} cost={}", delta, back, cost);
}

// (P2) vender o que foi comprado com B, no supply pós-compra, devolve B
#[test]
fn sell_after_buy_returns_base(
    c in 0.01f64..1.0,
    (pow, frac) in exponents(),
    s0 in 0.0f64..1_000.0,
    base in 1.0f64..10_000.0,
) {
    let cfg = TimeCurveConfig::single(PrimitiveCurveConfig::exponential(c, 0.0, pow, frac).unwrap()).unwrap();
    let bought = PricingEngine::new(&cfg, ctx(s0)).buy_with_base_amount(base, 0.0, 0.0).unwrap();
    prop_assume!(bought > 1e-9);
    let after = PricingEngine::new(&cfg, ctx(s0 + bought));
    let reclaimed = after.sell_target_amount(bought, 0.0, 0.0).unwrap();
    prop_assert!(rel(reclaimed, base) < 1e-6, "B={} reclaimed={} bought={}", base, reclaimed, bought);
}

// (P3) royalties maiores nunca barateiam a compra nem aumentam o resgate
#[test]
fn royalty_monotonicity(
    c in 0.01f64..10.0,
    s0 in 1.0f64..1_000.0,
    amount in 0.1f64..100.0,
    p1 in 0.0f64..99.0,
    extra in 0.0f64..0.99,
) {
    let p2 = p1 + extra;
    let cfg = TimeCurveConfig::single(PrimitiveCurveConfig::exponential(c, 0.0, 1, 1).unwrap()).unwrap();
    let engine = PricingEngine::new(&cfg, ctx(s0 + amount));

    let lo = engine.buy_target_amount(amount, p1, p1).unwrap();
    let hi = engine.buy_target_amount(amount, p2, p2).unwrap();
    prop_assert!(hi >= lo * (1.0 - 1e-12), "buy cost fell: {} -> {}", lo, hi);

    let lo = engine.sell_target_amount(amount, p1, p1).unwrap();
    let hi = engine.sell_target_amount(amount, p2, p2).unwrap();
    prop_assert!(hi <= lo * (1.0 + 1e-12), "sell reclaim grew: {} -> {}", lo, hi);
}

// (P4) frac par com termos de sinais opostos: toda raiz devolvida satisfaz F(r) = K
#[test]
fn even_frac_roots_are_true_roots(
    c in prop_oneof![-5.0f64..-0.1, 0.1f64..5.0],
    b_mag in 0.1f64..10.0,
    pow in 1u8..=4,
    frac in prop_oneof![Just(2u8), Just(4u8)],
    x in 0.1f64..100.0,
    shift in -1.0f64..1.0,
) {
    // c e b nunca ambos positivos
    let b = if c > 0.0 { -b_mag } else { b_mag };
    let curve = PrimitiveCurveConfig::exponential(c, b, pow, frac).unwrap();
    let target = curve.antiderivative(x) + shift;
    let Ok(roots) = root_estimates(&curve, target) else {
        return Ok(());
    };
    for r in &roots {
        prop_assert!(*r >= 0.0, "raiz negativa {} com frac par", r);
        let linear = b * r;
        let scale = target.abs().max(linear.abs()).max((curve.antiderivative(*r) - linear).abs()).max(1.0);
        prop_assert!(
            (curve.antiderivative(*r) - target).abs() <= 1e-6 * scale,
            "r={} F(r)={} alvo={} raízes={:?}", r, curve.antiderivative(*r), target, roots
        );
    }
}
}
