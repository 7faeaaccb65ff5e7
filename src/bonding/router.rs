//! Roteador multi-hop.
//!
//! Resolve a cadeia entre dois mints e executa um trade por elo. A entrada de
//! cada hop é o delta de saldo **observado** no hop anterior, nunca a saída
//! teórica da curva.
//!
//! Estados: `Routing → Hopping(i) → {Hopping(i+1) | Aborted | Completed}`.
//! O envio de um trade nunca é repetido; só a leitura de saldo.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn, Instrument};

use super::errors::{BondingError, BondingErrorCode, Result};
use super::guardrails::{ensure_slippage, to_raw_floor, to_units};
use super::hierarchy::{Hierarchy, HierarchyLink};
use super::ports::{AccountStore, InstructionBuilder, TransactionExecutor};
use super::pricing::BuyRequest;
use super::retry::{CancelSignal, PollOutcome, RetryPolicy};
use super::types::{Pubkey, TradeSide};
use crate::config::RouterConfig;
use crate::telemetry::make_info_span;
use crate::{bonding_bail, bonding_err, obs};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SwapRequest {
    pub base_mint: Pubkey,
    pub target_mint: Pubkey,
    /// Quantidade bruta de `base_mint` a gastar.
    pub base_amount: u64,
    /// Fração aplicada a cada hop; `None` usa `RouterConfig::default_slippage`.
    pub per_hop_slippage: Option<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AbortReason {
    /// Saldo de destino não mudou após todas as releituras.
    NoBalanceChange { hop: usize },
    /// Observação interrompida pelo sinal de cancelamento.
    Cancelled { hop: usize },
    /// Executor recusou o trade.
    Rejected { hop: usize, error: BondingError },
    /// Cotação ou montagem falhou depois de hops já executados.
    HopFailed { hop: usize, error: BondingError },
}

#[derive(Clone, Debug, PartialEq)]
pub enum SwapState {
    Routing,
    Hopping(usize),
    Completed,
    Aborted(AbortReason),
}

#[derive(Clone, Debug, PartialEq)]
pub struct HopReceipt {
    pub curve: Pubkey,
    pub side: TradeSide,
    pub input_mint: Pubkey,
    pub output_mint: Pubkey,
    pub input_amount: u64,
    pub theoretical_output: u64,
    pub observed_output: u64,
    pub observation: PollOutcome<u64>,
    pub signature: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SwapOutcome {
    /// Quantidade bruta de `held_mint` acumulada ao final.
    pub target_amount: u64,
    pub held_mint: Pubkey,
    pub hops: Vec<HopReceipt>,
    pub state: SwapState,
}

impl SwapOutcome {
    pub fn is_completed(&self) -> bool {
        self.state == SwapState::Completed
    }
}

enum HopError {
    /// Nada foi enviado.
    Failed(BondingError),
    Rejected(BondingError),
}

pub struct SwapRouter<S, B, E> {
    store: Arc<S>,
    builder: Arc<B>,
    executor: Arc<E>,
    config: RouterConfig,
    wallet: Pubkey,
    policy: RetryPolicy,
}

impl<S, B, E> SwapRouter<S, B, E>
where
    S: AccountStore,
    B: InstructionBuilder,
    E: TransactionExecutor<B::Instruction>,
{
    pub fn new(store: Arc<S>, builder: Arc<B>, executor: Arc<E>, config: RouterConfig, wallet: Pubkey) -> Self {
        let policy = config.retry_policy();
        Self { store, builder, executor, config, wallet, policy }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Monta as duas cadeias candidatas (a partir do target parando na base,
    /// e a partir da base parando no target) e fica com a que contém ambos.
    pub async fn resolve_route(&self, base_mint: &Pubkey, target_mint: &Pubkey) -> Result<Hierarchy> {
        let base = self.config.canonical_mint(base_mint);
        let target = self.config.canonical_mint(target_mint);
        if base != target {
            for (start, stop) in [(target, base), (base, target)] {
                let Some(key) = self.store.canonical_curve_for(&start).await? else {
                    continue;
                };
                // cadeia quebrada num candidato não descarta o outro
                let hierarchy = match Hierarchy::build(self.store.as_ref(), &self.config, &key, Some(&stop)).await {
                    Ok(h) => h,
                    Err(error) => {
                        debug!(start = %start, error = %error, "candidato de rota descartado");
                        continue;
                    }
                };
                if hierarchy.contains(&base, &target) {
                    return Ok(hierarchy);
                }
            }
        }
        Err(bonding_err!(BondingErrorCode::NoRouteFound, base => base_mint, target => target_mint))
    }

    pub async fn swap(&self, request: SwapRequest) -> Result<SwapOutcome> {
        self.swap_with_cancel(request, None).await
    }

    pub async fn swap_with_cancel(&self, request: SwapRequest, cancel: Option<&CancelSignal>) -> Result<SwapOutcome> {
        if request.base_amount == 0 {
            bonding_bail!(BondingErrorCode::ArithmeticDomainError, reason => "base_amount = 0");
        }
        let slippage = ensure_slippage(request.per_hop_slippage.unwrap_or(self.config.default_slippage))?;

        let mut state = SwapState::Routing;
        debug!(?state, base = %request.base_mint, target = %request.target_mint, "roteando");
        let base = self.config.canonical_mint(&request.base_mint);
        let target = self.config.canonical_mint(&request.target_mint);
        let hierarchy = self.resolve_route(&request.base_mint, &request.target_mint).await?;
        let (path, is_buy) = hierarchy.path_between(&base, &target).ok_or_else(|| {
            bonding_err!(BondingErrorCode::NoRouteFound, base => request.base_mint, target => request.target_mint)
        })?;
        let side = if is_buy { TradeSide::Buy } else { TradeSide::Sell };
        let hops: Vec<&HierarchyLink> = if is_buy { path.iter().collect() } else { path.iter().rev().collect() };

        if !self.config.is_native(&base)
            && self.store.fetch_token_balance(&self.wallet, &base).await?.is_none()
        {
            bonding_bail!(BondingErrorCode::SourceAccountMissing, mint => base);
        }

        let now = self.store.fetch_unix_timestamp().await?;
        let mut running = request.base_amount;
        let mut held = base;
        let mut receipts: Vec<HopReceipt> = Vec::with_capacity(hops.len());

        for (i, link) in hops.into_iter().enumerate() {
            state = SwapState::Hopping(i);
            debug!(?state, "hop");
            let span = make_info_span("hop", i as u32, "router");
            let hop = self.execute_hop(link, side, running, slippage, now, cancel).instrument(span).await;

            let reason = match hop {
                Ok(receipt) if receipt.observed_output > 0 => {
                    running = receipt.observed_output;
                    held = receipt.output_mint;
                    receipts.push(receipt);
                    continue;
                }
                Ok(receipt) => {
                    held = receipt.output_mint;
                    running = 0;
                    let reason = match receipt.observation {
                        PollOutcome::Cancelled => AbortReason::Cancelled { hop: i },
                        _ => AbortReason::NoBalanceChange { hop: i },
                    };
                    receipts.push(receipt);
                    reason
                }
                Err(HopError::Rejected(error)) => AbortReason::Rejected { hop: i, error },
                Err(HopError::Failed(error)) if receipts.is_empty() => return Err(error),
                Err(HopError::Failed(error)) => AbortReason::HopFailed { hop: i, error },
            };
            warn!(hop = i, ?reason, held = running, "swap abortado");
            return Ok(SwapOutcome { target_amount: running, held_mint: held, hops: receipts, state: SwapState::Aborted(reason) });
        }

        info!(hops = receipts.len(), amount = running, "swap concluído");
        Ok(SwapOutcome { target_amount: running, held_mint: held, hops: receipts, state: SwapState::Completed })
    }

    async fn execute_hop(
        &self,
        link: &HierarchyLink,
        side: TradeSide,
        input_raw: u64,
        slippage: f64,
        now: i64,
        cancel: Option<&CancelSignal>,
    ) -> core::result::Result<HopReceipt, HopError> {
        let started = Instant::now();
        let node = &link.node;
        let (input_mint, input_decimals, output_mint, output_decimals) = match side {
            TradeSide::Buy => (node.base_mint, node.base_decimals, node.target_mint, node.target_decimals),
            TradeSide::Sell => (node.target_mint, node.target_decimals, node.base_mint, node.base_decimals),
        };
        let engine = link.pricing(now);
        let units = to_units(input_raw, input_decimals);

        let (instructions, theoretical) = obs::wrap::time("hop_quote", || -> Result<_> {
            match side {
                TradeSide::Buy => {
                    let quote = engine.compute_buy(BuyRequest::WithBase(units), &node.royalties, slippage)?;
                    let args = quote.to_args(input_raw, output_decimals);
                    let ixs = self.builder.build_buy(node, &args, &self.wallet)?;
                    Ok((ixs, to_raw_floor(quote.target_amount, output_decimals)))
                }
                TradeSide::Sell => {
                    let quote = engine.compute_sell(units, &node.royalties, slippage)?;
                    let args = quote.to_args(input_raw, output_decimals);
                    let ixs = self.builder.build_sell(node, &args, &self.wallet)?;
                    Ok((ixs, to_raw_floor(quote.base_amount, output_decimals)))
                }
            }
        })
        .map_err(HopError::Failed)?;

        let native = self.config.is_native(&output_mint);
        let store: &S = self.store.as_ref();
        let wallet = self.wallet;
        let pre = read_balance(store, &wallet, &output_mint, native)
            .await
            .map_err(HopError::Failed)?
            .unwrap_or(0);

        info!(curve = %node.address, %side, input = input_raw, theoretical, "enviando hop");
        let confirmation = self.executor.submit(instructions).await.map_err(|e| {
            warn!(error = %e.to_log_json(), "trade recusado");
            HopError::Rejected(e)
        })?;

        let observation = self
            .policy
            .poll(cancel, move |attempt| async move {
                match read_balance(store, &wallet, &output_mint, native).await {
                    Ok(balance) => {
                        let post = balance.unwrap_or(0);
                        if post > pre {
                            Some(post - pre)
                        } else {
                            debug!(attempt, pre, post, "saldo inalterado");
                            None
                        }
                    }
                    Err(e) => {
                        debug!(attempt, error = %e, "falha lendo saldo");
                        None
                    }
                }
            })
            .await;
        let observed_output = match &observation {
            PollOutcome::Ready(delta) => *delta,
            other => {
                warn!(?other, "nenhuma mudança de saldo observada");
                0
            }
        };

        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        obs::wrap::record_hop(if side == TradeSide::Buy { "buy" } else { "sell" }, latency_ms, theoretical, observed_output);
        info!(observed = observed_output, theoretical, signature = %confirmation.signature, "hop confirmado");

        Ok(HopReceipt {
            curve: node.address,
            side,
            input_mint,
            output_mint,
            input_amount: input_raw,
            theoretical_output: theoretical,
            observed_output,
            observation,
            signature: confirmation.signature,
        })
    }
}

async fn read_balance<S>(store: &S, owner: &Pubkey, mint: &Pubkey, native: bool) -> Result<Option<u64>>
where
    S: AccountStore + ?Sized,
{
    if native {
        store.fetch_native_balance(owner).await.map(Some)
    } else {
        store.fetch_token_balance(owner, mint).await
    }
}
