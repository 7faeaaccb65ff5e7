//! Motor de preços: curva + snapshot de reserva/supply/royalties → montantes
//! de compra/venda, limites com slippage e estimativas de raiz.
//!
//! Política de royalties (multiplicativa):
//! - compra por target: bruto = desejado / (1 - tgt%) ; base = custo / (1 - base%)
//! - compra com base:   líquido = base · (1 - base%) ; target = Δ · (1 - tgt%)
//! - venda:             líquido = target · (1 - tgt%) ; base = resgate · (1 - base%)
//! Taxa de transição: sobretaxa na compra, desconto na venda.

use serde::{Deserialize, Serialize};

use super::curve::{ActiveSegment, LinearDecayTransitionFee, TimeCurveConfig, TransitionFeeHook};
use super::error_map::from_trade_inputs;
use super::errors::{BondingErrorCode, Result};
use super::guardrails::{ensure_positive_amount, ensure_slippage, gross_up, keep_factor, to_raw_ceil, to_raw_floor};
use super::roots::{first_root_at_or_above, last_root_at_or_below, root_estimates};
use super::types::{BondingCurveNode, CurveContext, Pubkey, RoyaltyPercentages, TradeSide};
use crate::{bonding_bail, bonding_err};

static DEFAULT_FEE_HOOK: LinearDecayTransitionFee = LinearDecayTransitionFee;

/// Pedido de compra: quantidade exata de target ou gasto fixo de base.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum BuyRequest {
    ExactTarget(f64),
    WithBase(f64),
}

/// Cotação de compra.
/// - `ExactTarget`: `bound` = base máxima aceita.
/// - `WithBase`: `bound` = target mínimo aceito.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BuyQuote {
    pub request: BuyRequest,
    pub target_amount: f64,
    pub base_amount: f64,
    pub bound: f64,
    pub root_estimates: Vec<f64>,
}

impl BuyQuote {
    /// Montante calculado (a contraparte do pedido).
    pub fn amount(&self) -> f64 {
        match self.request {
            BuyRequest::ExactTarget(_) => self.base_amount,
            BuyRequest::WithBase(_) => self.target_amount,
        }
    }

    /// Argumentos brutos para o construtor de instruções. `requested_raw` é o
    /// pedido já em unidades mínimas; `bound_decimals` escala o limite.
    pub fn to_args(&self, requested_raw: u64, bound_decimals: u8) -> BuyArgs {
        match self.request {
            BuyRequest::ExactTarget(_) => BuyArgs::ExactTarget {
                target_amount: requested_raw,
                maximum_price: to_raw_ceil(self.bound, bound_decimals),
                root_estimates: self.root_estimates.clone(),
            },
            BuyRequest::WithBase(_) => BuyArgs::WithBase {
                base_amount: requested_raw,
                minimum_target_amount: to_raw_floor(self.bound, bound_decimals),
                root_estimates: self.root_estimates.clone(),
            },
        }
    }
}

/// Cotação de venda; `minimum_bound` = base mínima aceita.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SellQuote {
    pub target_amount: f64,
    pub base_amount: f64,
    pub minimum_bound: f64,
    pub root_estimates: Vec<f64>,
}

impl SellQuote {
    pub fn to_args(&self, target_raw: u64, base_decimals: u8) -> SellArgs {
        SellArgs {
            target_amount: target_raw,
            minimum_price: to_raw_floor(self.minimum_bound, base_decimals),
            root_estimates: self.root_estimates.clone(),
        }
    }
}

/// Argumentos validados de compra, em unidades mínimas.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum BuyArgs {
    ExactTarget {
        target_amount: u64,
        maximum_price: u64,
        root_estimates: Vec<f64>,
    },
    WithBase {
        base_amount: u64,
        minimum_target_amount: u64,
        root_estimates: Vec<f64>,
    },
}

/// Argumentos validados de venda, em unidades mínimas.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SellArgs {
    pub target_amount: u64,
    pub minimum_price: u64,
    pub root_estimates: Vec<f64>,
}

#[derive(Copy, Clone, Debug)]
struct BuyBreakdown {
    gross_target: f64,
    curve_cost: f64,
    total_base: f64,
}

/// Avaliador puro sobre um snapshot. Barato de construir; um por requisição.
#[derive(Clone)]
pub struct PricingEngine<'a> {
    curve: &'a TimeCurveConfig,
    ctx: CurveContext,
    buy_frozen: bool,
    sell_frozen: bool,
    fees: &'a dyn TransitionFeeHook,
    address: Option<Pubkey>,
}

impl<'a> PricingEngine<'a> {
    pub fn new(curve: &'a TimeCurveConfig, ctx: CurveContext) -> Self {
        Self {
            curve,
            ctx,
            buy_frozen: false,
            sell_frozen: false,
            fees: &DEFAULT_FEE_HOOK,
            address: None,
        }
    }

    /// Motor para um nó on-ledger no instante `now`.
    pub fn for_node(node: &BondingCurveNode, curve: &'a TimeCurveConfig, now_unix_time: i64) -> Self {
        Self::new(curve, node.context_at(now_unix_time))
            .with_freeze(node.buy_frozen, node.sell_frozen)
            .with_address(node.address)
    }

    pub fn with_fee_hook(mut self, hook: &'a dyn TransitionFeeHook) -> Self {
        self.fees = hook;
        self
    }

    pub fn with_freeze(mut self, buy_frozen: bool, sell_frozen: bool) -> Self {
        self.buy_frozen = buy_frozen;
        self.sell_frozen = sell_frozen;
        self
    }

    pub fn with_address(mut self, address: Pubkey) -> Self {
        self.address = Some(address);
        self
    }

    pub fn context(&self) -> &CurveContext {
        &self.ctx
    }

    pub fn active(&self) -> ActiveSegment<'a> {
        self.curve.active_segment(self.ctx.elapsed_secs())
    }

    fn transition_fee_pct(&self, side: TradeSide) -> f64 {
        let active = self.active();
        self.fees.fee_percentage(&active, side).clamp(0.0, 100.0)
    }

    fn frozen(&self, side: TradeSide) -> crate::bonding::errors::BondingError {
        let curve = self.address.map(|a| a.to_string()).unwrap_or_else(|| "?".into());
        bonding_err!(BondingErrorCode::FrozenCurveError, curve => curve, side => side)
    }

    pub fn ensure_can_buy(&self) -> Result<()> {
        if self.buy_frozen || !self.ctx.is_live() || self.ctx.buy_window_closed() {
            return Err(self.frozen(TradeSide::Buy));
        }
        Ok(())
    }

    pub fn ensure_can_sell(&self) -> Result<()> {
        if self.sell_frozen || !self.ctx.is_live() {
            return Err(self.frozen(TradeSide::Sell));
        }
        Ok(())
    }

    fn preflight(&self, side: TradeSide, amount: f64, royalties: &RoyaltyPercentages) -> Result<()> {
        if let Some(code) = from_trade_inputs(side, amount, self.ctx.supply, royalties) {
            bonding_bail!(code, { "reason" => format!("{side} de {amount} com supply {}", self.ctx.supply) });
        }
        Ok(())
    }

    /// Preço marginal no supply atual.
    pub fn current_price(&self) -> f64 {
        self.active().curve().price(self.ctx.supply)
    }

    /// Preço marginal incluindo royalties e taxa de transição do lado.
    pub fn current_price_with_royalties(&self, side: TradeSide, royalties: &RoyaltyPercentages) -> f64 {
        let price = self.current_price();
        let fee = 1.0 + self.transition_fee_pct(side) / 100.0;
        match side {
            TradeSide::Buy => {
                price * fee / (keep_factor(royalties.buy_base) * keep_factor(royalties.buy_target))
            }
            TradeSide::Sell => {
                price * keep_factor(royalties.sell_base) * keep_factor(royalties.sell_target)
                    * (2.0 - fee)
            }
        }
    }

    fn buy_breakdown(&self, desired_target: f64, buy_base_pct: f64, buy_target_pct: f64) -> Result<BuyBreakdown> {
        self.ensure_can_buy()?;
        let royalties = RoyaltyPercentages { buy_base: buy_base_pct, buy_target: buy_target_pct, ..Default::default() };
        self.preflight(TradeSide::Buy, desired_target, &royalties)?;

        let gross_target = gross_up(desired_target, buy_target_pct)?;
        let curve_cost = self.active().curve().integral(self.ctx.supply, gross_target);
        let with_royalty = gross_up(curve_cost, buy_base_pct)?;
        let total_base = with_royalty * (1.0 + self.transition_fee_pct(TradeSide::Buy) / 100.0);
        Ok(BuyBreakdown { gross_target, curve_cost, total_base })
    }

    /// Base necessária para receber `desired_target` líquido.
    pub fn buy_target_amount(&self, desired_target: f64, buy_base_pct: f64, buy_target_pct: f64) -> Result<f64> {
        Ok(self.buy_breakdown(desired_target, buy_base_pct, buy_target_pct)?.total_base)
    }

    /// Gasto líquido de curva para um gasto bruto de base.
    fn net_curve_spend(&self, base_amount: f64, buy_base_pct: f64) -> f64 {
        base_amount * keep_factor(buy_base_pct) / (1.0 + self.transition_fee_pct(TradeSide::Buy) / 100.0)
    }

    /// Supply final S1 > S0 tal que integral(S0, S1-S0) = `net_spend`.
    fn invert_buy(&self, net_spend: f64) -> Result<(f64, Vec<f64>)> {
        let curve = self.active();
        let s0 = self.ctx.supply;
        let roots = self.buy_root_estimates(net_spend)?;
        let Some(s1) = first_root_at_or_above(&roots, s0) else {
            bonding_bail!(
                BondingErrorCode::ArithmeticDomainError,
                reason => format!("nenhuma raiz acima do supply {s0} ({} raízes, curva {})", roots.len(), curve.curve().kind())
            );
        };
        Ok(((s1 - s0).max(0.0), roots))
    }

    /// Target líquido obtido gastando `base_amount`.
    pub fn buy_with_base_amount(&self, base_amount: f64, buy_base_pct: f64, buy_target_pct: f64) -> Result<f64> {
        self.ensure_can_buy()?;
        let royalties = RoyaltyPercentages { buy_base: buy_base_pct, buy_target: buy_target_pct, ..Default::default() };
        self.preflight(TradeSide::Buy, base_amount, &royalties)?;

        let net = self.net_curve_spend(base_amount, buy_base_pct);
        let (delta, _) = self.invert_buy(net)?;
        Ok(delta * keep_factor(buy_target_pct))
    }

    /// Base resgatada ao vender `target_amount`.
    pub fn sell_target_amount(&self, target_amount: f64, sell_base_pct: f64, sell_target_pct: f64) -> Result<f64> {
        Ok(self.sell_breakdown(target_amount, sell_base_pct, sell_target_pct)?.1)
    }

    /// (resgate bruto da curva, base final)
    fn sell_breakdown(&self, target_amount: f64, sell_base_pct: f64, sell_target_pct: f64) -> Result<(f64, f64)> {
        self.ensure_can_sell()?;
        let royalties = RoyaltyPercentages { sell_base: sell_base_pct, sell_target: sell_target_pct, ..Default::default() };
        self.preflight(TradeSide::Sell, target_amount, &royalties)?;

        let net_sold = target_amount * keep_factor(sell_target_pct);
        let s0 = self.ctx.supply;
        let reclaim = self.active().curve().integral(s0 - net_sold, net_sold);
        let fee = self.transition_fee_pct(TradeSide::Sell) / 100.0;
        let total = reclaim * keep_factor(sell_base_pct) * (1.0 - fee);
        Ok((reclaim, total.max(0.0)))
    }

    /// Raízes de F(x) = F(S0) + gasto; a verdadeira fica acima de S0.
    pub fn buy_root_estimates(&self, curve_spend: f64) -> Result<Vec<f64>> {
        let curve = self.active();
        let target = curve.curve().antiderivative(self.ctx.supply) + curve_spend;
        root_estimates(curve.curve(), target)
    }

    /// Raízes de F(x) = F(S0) - resgate; a verdadeira fica abaixo de S0.
    pub fn sell_root_estimates(&self, curve_reclaim: f64) -> Result<Vec<f64>> {
        let curve = self.active();
        let target = curve.curve().antiderivative(self.ctx.supply) - curve_reclaim;
        root_estimates(curve.curve(), target)
    }

    /// Cotação completa de compra com limite de slippage.
    pub fn compute_buy(&self, request: BuyRequest, royalties: &RoyaltyPercentages, slippage: f64) -> Result<BuyQuote> {
        ensure_slippage(slippage)?;
        royalties.validate()?;
        match request {
            BuyRequest::ExactTarget(target) => {
                let b = self.buy_breakdown(target, royalties.buy_base, royalties.buy_target)?;
                let root_estimates = self.buy_root_estimates(b.curve_cost)?;
                tracing::trace!(gross = b.gross_target, cost = b.total_base, "buy exact target");
                Ok(BuyQuote {
                    request,
                    target_amount: target,
                    base_amount: b.total_base,
                    bound: b.total_base * (1.0 + slippage),
                    root_estimates,
                })
            }
            BuyRequest::WithBase(base) => {
                ensure_positive_amount("base_amount", base)?;
                self.ensure_can_buy()?;
                self.preflight(TradeSide::Buy, base, royalties)?;
                let net = self.net_curve_spend(base, royalties.buy_base);
                let (delta, root_estimates) = self.invert_buy(net)?;
                let target = delta * keep_factor(royalties.buy_target);
                Ok(BuyQuote {
                    request,
                    target_amount: target,
                    base_amount: base,
                    bound: target * (1.0 - slippage),
                    root_estimates,
                })
            }
        }
    }

    /// Cotação completa de venda com mínimo de base.
    pub fn compute_sell(&self, target_amount: f64, royalties: &RoyaltyPercentages, slippage: f64) -> Result<SellQuote> {
        ensure_slippage(slippage)?;
        royalties.validate()?;
        let (reclaim, base) = self.sell_breakdown(target_amount, royalties.sell_base, royalties.sell_target)?;
        let root_estimates = self.sell_root_estimates(reclaim)?;
        if last_root_at_or_below(&root_estimates, self.ctx.supply).is_none() {
            bonding_bail!(
                BondingErrorCode::ArithmeticDomainError,
                reason => format!("nenhuma raiz abaixo do supply {}", self.ctx.supply)
            );
        }
        Ok(SellQuote {
            target_amount,
            base_amount: base,
            minimum_bound: base * (1.0 - slippage),
            root_estimates,
        })
    }
}

impl core::fmt::Debug for PricingEngine<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PricingEngine")
            .field("ctx", &self.ctx)
            .field("segments", &self.curve.segments().len())
            .field("buy_frozen", &self.buy_frozen)
            .field("sell_frozen", &self.sell_frozen)
            .finish()
    }
}
