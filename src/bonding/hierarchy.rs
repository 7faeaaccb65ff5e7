//! Cadeia de curvas de um target até a sua base mais distante.
//!
//! Imutável depois de montada; pai/filho vêm da posição. As fronteiras da
//! cadeia são `base_mint()` seguido do target de cada elo.

use std::collections::{HashMap, HashSet};

use super::curve::TimeCurveConfig;
use super::errors::{BondingErrorCode, Result};
use super::ports::AccountStore;
use super::pricing::PricingEngine;
use super::types::{BondingCurveNode, Pubkey};
use crate::config::RouterConfig;
use crate::{bonding_bail, bonding_err};

/// Um nó da cadeia com a configuração de curva já resolvida.
#[derive(Clone, Debug, PartialEq)]
pub struct HierarchyLink {
    pub node: BondingCurveNode,
    pub curve: TimeCurveConfig,
}

impl HierarchyLink {
    pub fn pricing(&self, now_unix_time: i64) -> PricingEngine<'_> {
        PricingEngine::for_node(&self.node, &self.curve, now_unix_time)
    }

    pub fn base_mint(&self) -> Pubkey {
        self.node.base_mint
    }

    pub fn target_mint(&self) -> Pubkey {
        self.node.target_mint
    }
}

#[derive(Clone, Debug)]
pub struct Hierarchy {
    links: Vec<HierarchyLink>,
    by_target: HashMap<Pubkey, usize>,
}

impl Hierarchy {
    /// Sobe a partir de `node_key` pelos pais canônicos até não haver pai ou
    /// até a base atingir `stop_at_mint`.
    pub async fn build<S>(
        store: &S,
        config: &RouterConfig,
        node_key: &Pubkey,
        stop_at_mint: Option<&Pubkey>,
    ) -> Result<Hierarchy>
    where
        S: AccountStore + ?Sized,
    {
        let stop = stop_at_mint.map(|m| config.canonical_mint(m));
        let mut chain: Vec<HierarchyLink> = Vec::new();
        let mut seen: HashSet<Pubkey> = HashSet::new();
        let mut current = load_link(store, config, node_key).await?;

        loop {
            if !seen.insert(current.target_mint()) {
                bonding_bail!(
                    BondingErrorCode::ConfigValidationError,
                    reason => format!("ciclo na cadeia em {}", current.target_mint())
                );
            }
            let base = current.base_mint();
            chain.push(current);
            if stop == Some(base) {
                break;
            }
            let Some(parent_key) = store.canonical_curve_for(&base).await? else {
                break;
            };
            current = load_link(store, config, &parent_key).await?;
        }

        chain.reverse();
        tracing::debug!(len = chain.len(), start = %node_key, "hierarquia montada");
        Hierarchy::from_links(chain)
    }

    /// Valida encadeamento (target de um elo = base do próximo) e unicidade.
    pub fn from_links(links: Vec<HierarchyLink>) -> Result<Hierarchy> {
        if links.is_empty() {
            bonding_bail!(BondingErrorCode::ConfigValidationError, reason => "hierarquia vazia");
        }
        for pair in links.windows(2) {
            if pair[0].target_mint() != pair[1].base_mint() {
                bonding_bail!(
                    BondingErrorCode::ConfigValidationError,
                    reason => format!("elo quebrado: {} != {}", pair[0].target_mint(), pair[1].base_mint())
                );
            }
        }
        let mut by_target = HashMap::with_capacity(links.len());
        for (i, link) in links.iter().enumerate() {
            if by_target.insert(link.target_mint(), i).is_some() || link.target_mint() == links[0].base_mint() {
                bonding_bail!(
                    BondingErrorCode::ConfigValidationError,
                    reason => format!("mint repetido na cadeia: {}", link.target_mint())
                );
            }
        }
        Ok(Hierarchy { links, by_target })
    }

    /// Elos da base mais distante até o target.
    pub fn to_array(&self) -> &[HierarchyLink] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn base_mint(&self) -> Pubkey {
        self.links[0].base_mint()
    }

    pub fn target_mint(&self) -> Pubkey {
        self.links[self.links.len() - 1].target_mint()
    }

    /// Posição de um mint entre as fronteiras: base → 0, target do elo i → i+1.
    pub fn boundary_index(&self, mint: &Pubkey) -> Option<usize> {
        if *mint == self.base_mint() {
            return Some(0);
        }
        self.by_target.get(mint).map(|i| i + 1)
    }

    pub fn contains(&self, a: &Pubkey, b: &Pubkey) -> bool {
        self.boundary_index(a).is_some() && self.boundary_index(b).is_some()
    }

    /// Elo cujo target é `mint`.
    pub fn node_for_target(&self, mint: &Pubkey) -> Option<&HierarchyLink> {
        self.by_target.get(mint).map(|&i| &self.links[i])
    }

    /// Elo mais perto da base.
    pub fn parent_of(&self, index: usize) -> Option<&HierarchyLink> {
        index.checked_sub(1).and_then(|i| self.links.get(i))
    }

    /// Elo mais perto do target.
    pub fn child_of(&self, index: usize) -> Option<&HierarchyLink> {
        self.links.get(index.checked_add(1)?)
    }

    /// Elos entre dois mints de fronteira, em ordem base → target, e se o
    /// sentido `from → to` é de compra.
    pub fn path_between(&self, from: &Pubkey, to: &Pubkey) -> Option<(&[HierarchyLink], bool)> {
        let i = self.boundary_index(from)?;
        let j = self.boundary_index(to)?;
        match i.cmp(&j) {
            std::cmp::Ordering::Less => Some((&self.links[i..j], true)),
            std::cmp::Ordering::Greater => Some((&self.links[j..i], false)),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// Carrega um nó, normaliza mints e atualiza supply/decimais pelos mints.
async fn load_link<S>(store: &S, config: &RouterConfig, key: &Pubkey) -> Result<HierarchyLink>
where
    S: AccountStore + ?Sized,
{
    let mut node = store
        .fetch_curve(key)
        .await?
        .ok_or_else(|| bonding_err!(BondingErrorCode::StateUnavailable, account => key))?;
    node.base_mint = config.canonical_mint(&node.base_mint);
    node.target_mint = config.canonical_mint(&node.target_mint);

    let curve = store
        .fetch_curve_config(&node.curve_config)
        .await?
        .ok_or_else(|| bonding_err!(BondingErrorCode::StateUnavailable, account => node.curve_config))?;

    let target = store
        .fetch_mint(&node.target_mint)
        .await?
        .ok_or_else(|| bonding_err!(BondingErrorCode::StateUnavailable, account => node.target_mint))?;
    let base = store
        .fetch_mint(&node.base_mint)
        .await?
        .ok_or_else(|| bonding_err!(BondingErrorCode::StateUnavailable, account => node.base_mint))?;
    node.supply_raw = target.supply;
    node.target_decimals = target.decimals;
    node.base_decimals = base.decimals;

    Ok(HierarchyLink { node, curve })
}
