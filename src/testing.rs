//! Utilitários de teste: um ledger em memória que implementa as três portas.
//!
//! Os trades são liquidados pelo próprio `PricingEngine`, então o que o
//! roteador observa é consistente com as cotações. Botões para simular
//! atraso de propagação, recusa de envio e perda de valor por hop.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::bonding::curve::TimeCurveConfig;
use crate::bonding::errors::{BondingErrorCode, Result};
use crate::bonding::guardrails::{keep_factor, to_raw_ceil, to_raw_floor, to_units};
use crate::bonding::ports::{AccountStore, Confirmation, InstructionBuilder, TransactionExecutor};
use crate::bonding::pricing::{BuyArgs, PricingEngine, SellArgs};
use crate::bonding::types::{BondingCurveNode, MintInfo, Pubkey};
use crate::{bonding_bail, bonding_err};

/// Instrução opaca produzida pelo ledger em memória.
#[derive(Clone, Debug, PartialEq)]
pub enum LedgerInstruction {
    Buy { curve: Pubkey, payer: Pubkey, args: BuyArgs },
    Sell { curve: Pubkey, payer: Pubkey, args: SellArgs },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
enum BalanceKey {
    Token(Pubkey, Pubkey),
    Native(Pubkey),
}

#[derive(Clone, Debug, Default)]
struct LedgerState {
    curves: HashMap<Pubkey, BondingCurveNode>,
    canonical: HashMap<Pubkey, Pubkey>,
    configs: HashMap<Pubkey, TimeCurveConfig>,
    mints: HashMap<Pubkey, MintInfo>,
    balances: HashMap<BalanceKey, u64>,
    now: i64,
    wrapped_native: Option<Pubkey>,
    /// Leituras atrasadas restantes: (restantes, valor antigo).
    stale: HashMap<BalanceKey, (u32, u64)>,
    lag_reads: u32,
    reject_at: Option<usize>,
    skim_bps: u64,
    submissions: Vec<Vec<LedgerInstruction>>,
}

/// Ledger em memória. Seguro entre threads; cada chamada trava um `Mutex`.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    pub fn new(now_unix_time: i64) -> Self {
        let ledger = Self::default();
        ledger.lock().now = now_unix_time;
        ledger
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Mint cuja conta é o saldo nativo do dono.
    pub fn with_wrapped_native(self, mint: Pubkey) -> Self {
        self.lock().wrapped_native = Some(mint);
        self
    }

    pub fn set_now(&self, now_unix_time: i64) {
        self.lock().now = now_unix_time;
    }

    pub fn set_mint(&self, mint: Pubkey, info: MintInfo) {
        self.lock().mints.insert(mint, info);
    }

    /// Registra a curva e sua configuração. Índice 0 vira a canônica do
    /// target; o mint do target é criado com o supply do nó se ainda não existir.
    pub fn add_curve(&self, node: BondingCurveNode, config: TimeCurveConfig) {
        let mut st = self.lock();
        if node.is_canonical() {
            st.canonical.insert(node.target_mint, node.address);
        }
        st.mints
            .entry(node.target_mint)
            .or_insert(MintInfo { decimals: node.target_decimals, supply: node.supply_raw });
        st.mints
            .entry(node.base_mint)
            .or_insert(MintInfo { decimals: node.base_decimals, supply: 0 });
        st.configs.insert(node.curve_config, config);
        st.curves.insert(node.address, node);
    }

    pub fn curve(&self, address: &Pubkey) -> Option<BondingCurveNode> {
        self.lock().curves.get(address).cloned()
    }

    pub fn set_token_balance(&self, owner: Pubkey, mint: Pubkey, amount: u64) {
        self.lock().balances.insert(BalanceKey::Token(owner, mint), amount);
    }

    pub fn set_native_balance(&self, owner: Pubkey, amount: u64) {
        self.lock().balances.insert(BalanceKey::Native(owner), amount);
    }

    pub fn token_balance(&self, owner: &Pubkey, mint: &Pubkey) -> Option<u64> {
        self.lock().balances.get(&BalanceKey::Token(*owner, *mint)).copied()
    }

    pub fn native_balance(&self, owner: &Pubkey) -> u64 {
        self.lock().balances.get(&BalanceKey::Native(*owner)).copied().unwrap_or(0)
    }

    /// Após cada envio, as próximas `reads` leituras do saldo creditado ainda
    /// mostram o valor anterior.
    pub fn lag_balance_reads(&self, reads: u32) {
        self.lock().lag_reads = reads;
    }

    /// Recusa o envio de índice `index` (0-based) sem liquidar nada.
    pub fn reject_submission(&self, index: usize) {
        self.lock().reject_at = Some(index);
    }

    /// Retém `bps` da saída de cada trade (taxa/arredondamento fora da curva).
    pub fn skim_bps(&self, bps: u64) {
        self.lock().skim_bps = bps.min(10_000);
    }

    pub fn submissions(&self) -> Vec<Vec<LedgerInstruction>> {
        self.lock().submissions.clone()
    }

    fn read(st: &mut LedgerState, key: BalanceKey) -> Option<u64> {
        if let Some((remaining, old)) = st.stale.get_mut(&key) {
            if *remaining > 0 {
                *remaining -= 1;
                return Some(*old);
            }
        }
        st.balances.get(&key).copied()
    }
}

impl LedgerState {
    fn key_for(&self, owner: Pubkey, mint: Pubkey) -> BalanceKey {
        if self.wrapped_native == Some(mint) {
            BalanceKey::Native(owner)
        } else {
            BalanceKey::Token(owner, mint)
        }
    }

    fn debit(&mut self, owner: Pubkey, mint: Pubkey, amount: u64) -> Result<()> {
        let key = self.key_for(owner, mint);
        let balance = self.balances.get(&key).copied().unwrap_or(0);
        let Some(left) = balance.checked_sub(amount) else {
            bonding_bail!(
                BondingErrorCode::ExecutionRejected,
                hop => format!("saldo insuficiente de {mint}: {balance} < {amount}")
            );
        };
        self.balances.insert(key, left);
        Ok(())
    }

    /// Credita e devolve a chave tocada.
    fn credit(&mut self, owner: Pubkey, mint: Pubkey, amount: u64) -> BalanceKey {
        let key = self.key_for(owner, mint);
        let entry = self.balances.entry(key).or_insert(0);
        *entry = entry.saturating_add(amount);
        key
    }

    fn skim(&self, amount: u64) -> u64 {
        ((u128::from(amount) * u128::from(10_000 - self.skim_bps)) / 10_000) as u64
    }

    fn curve_pair(&self, address: &Pubkey) -> Result<(BondingCurveNode, TimeCurveConfig)> {
        let node = self
            .curves
            .get(address)
            .cloned()
            .ok_or_else(|| bonding_err!(BondingErrorCode::StateUnavailable, account => address))?;
        let config = self
            .configs
            .get(&node.curve_config)
            .cloned()
            .ok_or_else(|| bonding_err!(BondingErrorCode::StateUnavailable, account => node.curve_config))?;
        Ok((node, config))
    }

    fn move_supply(&mut self, node: &mut BondingCurveNode, supply_raw: u64, reserve_raw: u64) {
        node.supply_raw = supply_raw;
        node.reserve_raw = reserve_raw;
        if let Some(info) = self.mints.get_mut(&node.target_mint) {
            info.supply = supply_raw;
        }
        self.curves.insert(node.address, node.clone());
    }

    fn reject(reason: String) -> crate::bonding::errors::BondingError {
        bonding_err!(BondingErrorCode::ExecutionRejected, hop => reason)
    }

    /// Liquida uma instrução; devolve as chaves creditadas.
    fn settle(&mut self, ix: &LedgerInstruction) -> Result<Vec<BalanceKey>> {
        match ix {
            LedgerInstruction::Buy { curve, payer, args } => {
                let (mut node, config) = self.curve_pair(curve)?;
                let engine = PricingEngine::for_node(&node, &config, self.now);
                let r = node.royalties;
                let (base_raw, target_raw, gross_raw) = match args {
                    BuyArgs::WithBase { base_amount, minimum_target_amount, .. } => {
                        let units = to_units(*base_amount, node.base_decimals);
                        let out = engine.buy_with_base_amount(units, r.buy_base, r.buy_target)?;
                        let gross = to_raw_floor(out / keep_factor(r.buy_target), node.target_decimals);
                        let out_raw = self.skim(to_raw_floor(out, node.target_decimals));
                        if out_raw < *minimum_target_amount {
                            return Err(Self::reject(format!("saída {out_raw} < mínimo {minimum_target_amount}")));
                        }
                        (*base_amount, out_raw, gross)
                    }
                    BuyArgs::ExactTarget { target_amount, maximum_price, .. } => {
                        let units = to_units(*target_amount, node.target_decimals);
                        let cost = engine.buy_target_amount(units, r.buy_base, r.buy_target)?;
                        let cost_raw = to_raw_ceil(cost, node.base_decimals);
                        if cost_raw > *maximum_price {
                            return Err(Self::reject(format!("custo {cost_raw} > máximo {maximum_price}")));
                        }
                        let gross = to_raw_floor(units / keep_factor(r.buy_target), node.target_decimals);
                        (cost_raw, self.skim(*target_amount), gross)
                    }
                };
                self.debit(*payer, node.base_mint, base_raw)?;
                let key = self.credit(*payer, node.target_mint, target_raw);
                let supply = node.supply_raw.saturating_add(gross_raw);
                let reserve = node.reserve_raw.saturating_add(base_raw);
                self.move_supply(&mut node, supply, reserve);
                Ok(vec![key])
            }
            LedgerInstruction::Sell { curve, payer, args } => {
                let (mut node, config) = self.curve_pair(curve)?;
                let engine = PricingEngine::for_node(&node, &config, self.now);
                let r = node.royalties;
                let units = to_units(args.target_amount, node.target_decimals);
                let base = engine.sell_target_amount(units, r.sell_base, r.sell_target)?;
                let base_raw = self.skim(to_raw_floor(base, node.base_decimals));
                if base_raw < args.minimum_price {
                    return Err(Self::reject(format!("resgate {base_raw} < mínimo {}", args.minimum_price)));
                }
                self.debit(*payer, node.target_mint, args.target_amount)?;
                let key = self.credit(*payer, node.base_mint, base_raw);
                let burned = to_raw_floor(units * keep_factor(r.sell_target), node.target_decimals);
                let supply = node.supply_raw.saturating_sub(burned);
                let reserve = node.reserve_raw.saturating_sub(base_raw);
                self.move_supply(&mut node, supply, reserve);
                Ok(vec![key])
            }
        }
    }
}

#[async_trait]
impl AccountStore for InMemoryLedger {
    async fn fetch_curve(&self, address: &Pubkey) -> Result<Option<BondingCurveNode>> {
        Ok(self.lock().curves.get(address).cloned())
    }

    async fn canonical_curve_for(&self, mint: &Pubkey) -> Result<Option<Pubkey>> {
        Ok(self.lock().canonical.get(mint).copied())
    }

    async fn fetch_curve_config(&self, address: &Pubkey) -> Result<Option<TimeCurveConfig>> {
        Ok(self.lock().configs.get(address).cloned())
    }

    async fn fetch_mint(&self, mint: &Pubkey) -> Result<Option<MintInfo>> {
        Ok(self.lock().mints.get(mint).copied())
    }

    async fn fetch_token_balance(&self, owner: &Pubkey, mint: &Pubkey) -> Result<Option<u64>> {
        let mut st = self.lock();
        Ok(Self::read(&mut st, BalanceKey::Token(*owner, *mint)))
    }

    async fn fetch_native_balance(&self, owner: &Pubkey) -> Result<u64> {
        let mut st = self.lock();
        Ok(Self::read(&mut st, BalanceKey::Native(*owner)).unwrap_or(0))
    }

    async fn fetch_unix_timestamp(&self) -> Result<i64> {
        Ok(self.lock().now)
    }
}

impl InstructionBuilder for InMemoryLedger {
    type Instruction = LedgerInstruction;

    fn build_buy(&self, node: &BondingCurveNode, args: &BuyArgs, payer: &Pubkey) -> Result<Vec<LedgerInstruction>> {
        Ok(vec![LedgerInstruction::Buy { curve: node.address, payer: *payer, args: args.clone() }])
    }

    fn build_sell(&self, node: &BondingCurveNode, args: &SellArgs, payer: &Pubkey) -> Result<Vec<LedgerInstruction>> {
        Ok(vec![LedgerInstruction::Sell { curve: node.address, payer: *payer, args: args.clone() }])
    }
}

#[async_trait]
impl TransactionExecutor<LedgerInstruction> for InMemoryLedger {
    async fn submit(&self, instructions: Vec<LedgerInstruction>) -> Result<Confirmation> {
        let mut st = self.lock();
        let index = st.submissions.len();
        st.submissions.push(instructions.clone());
        if st.reject_at == Some(index) {
            bonding_bail!(BondingErrorCode::ExecutionRejected, hop => index);
        }

        // tudo ou nada: liquida numa cópia
        let mut next = st.clone();
        let mut touched = Vec::new();
        for ix in &instructions {
            touched.extend(next.settle(ix)?);
        }
        for key in touched {
            let old = st.balances.get(&key).copied().unwrap_or(0);
            if next.lag_reads > 0 {
                next.stale.insert(key, (next.lag_reads, old));
            }
        }
        *st = next;
        Ok(Confirmation { signature: format!("mem-{index}") })
    }
}
