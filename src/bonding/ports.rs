//! Portas externas do roteador.
//!
//! Decodificação de contas, formato de instrução, assinatura e envio ficam do
//! lado de fora; o roteador só conversa com estes traits. Implementações
//! precisam ser `Send + Sync`: o roteador consulta as portas a partir de
//! contextos assíncronos arbitrários.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::curve::TimeCurveConfig;
use super::errors::Result;
use super::pricing::{BuyArgs, SellArgs};
use super::types::{BondingCurveNode, MintInfo, Pubkey};

/// Leitura de estado do ledger.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Nó de curva no endereço `address`, se existir.
    async fn fetch_curve(&self, address: &Pubkey) -> Result<Option<BondingCurveNode>>;

    /// Endereço da curva canônica (índice 0) cujo target é `mint`.
    async fn canonical_curve_for(&self, mint: &Pubkey) -> Result<Option<Pubkey>>;

    /// Configuração de curva referenciada por `BondingCurveNode::curve_config`.
    async fn fetch_curve_config(&self, address: &Pubkey) -> Result<Option<TimeCurveConfig>>;

    async fn fetch_mint(&self, mint: &Pubkey) -> Result<Option<MintInfo>>;

    /// Saldo bruto da conta de token de `owner` para `mint`; `None` se a
    /// conta não existe.
    async fn fetch_token_balance(&self, owner: &Pubkey, mint: &Pubkey) -> Result<Option<u64>>;

    /// Saldo nativo bruto de `owner`.
    async fn fetch_native_balance(&self, owner: &Pubkey) -> Result<u64>;

    /// Relógio do ledger (unix, segundos).
    async fn fetch_unix_timestamp(&self) -> Result<i64>;
}

/// Monta instruções opacas para uma troca contra um nó.
pub trait InstructionBuilder: Send + Sync {
    type Instruction: Send + Sync + 'static;

    fn build_buy(&self, node: &BondingCurveNode, args: &BuyArgs, payer: &Pubkey) -> Result<Vec<Self::Instruction>>;

    fn build_sell(&self, node: &BondingCurveNode, args: &SellArgs, payer: &Pubkey) -> Result<Vec<Self::Instruction>>;
}

/// Confirmação devolvida pelo executor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    pub signature: String,
}

/// Assina e envia. Chamado uma vez por hop; nunca repetido pelo roteador.
#[async_trait]
pub trait TransactionExecutor<I: Send + Sync + 'static>: Send + Sync {
    async fn submit(&self, instructions: Vec<I>) -> Result<Confirmation>;
}
