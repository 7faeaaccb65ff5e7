//! Preço efetivo de uma hierarquia inteira, compondo os preços por elo.
//! Só estimativa: a execução real usa deltas observados no router.

use super::errors::{BondingErrorCode, Result};
use super::hierarchy::{Hierarchy, HierarchyLink};
use super::types::{Pubkey, TradeSide};
use crate::bonding_err;

#[derive(Clone, Copy, Debug)]
pub struct BondingPricing<'h> {
    hierarchy: &'h Hierarchy,
    now_unix_time: i64,
}

impl<'h> BondingPricing<'h> {
    pub fn new(hierarchy: &'h Hierarchy, now_unix_time: i64) -> Self {
        Self { hierarchy, now_unix_time }
    }

    /// Elos do `base_mint` até o target da hierarquia.
    fn links_from(&self, base_mint: &Pubkey) -> Result<&'h [HierarchyLink]> {
        let hierarchy: &'h Hierarchy = self.hierarchy;
        let start = hierarchy.boundary_index(base_mint).ok_or_else(|| {
            bonding_err!(BondingErrorCode::NoRouteFound, base => base_mint, target => hierarchy.target_mint())
        })?;
        let links = &hierarchy.to_array()[start..];
        if links.is_empty() {
            return Err(bonding_err!(
                BondingErrorCode::NoRouteFound,
                base => base_mint,
                target => hierarchy.target_mint()
            ));
        }
        Ok(links)
    }

    /// Preço do target da hierarquia em unidades de `base_mint`.
    pub fn current_price(&self, base_mint: &Pubkey) -> Result<f64> {
        Ok(self
            .links_from(base_mint)?
            .iter()
            .map(|l| l.pricing(self.now_unix_time).current_price())
            .product())
    }

    /// Como `current_price`, com royalties e taxas de transição de cada elo.
    pub fn current_price_with_royalties(&self, base_mint: &Pubkey, side: TradeSide) -> Result<f64> {
        Ok(self
            .links_from(base_mint)?
            .iter()
            .map(|l| l.pricing(self.now_unix_time).current_price_with_royalties(side, &l.node.royalties))
            .product())
    }

    /// Base necessária para comprar `target_amount` do target da hierarquia.
    pub fn buy_target_amount(&self, target_amount: f64, base_mint: &Pubkey) -> Result<f64> {
        let mut required = target_amount;
        for link in self.links_from(base_mint)?.iter().rev() {
            let r = &link.node.royalties;
            required = link.pricing(self.now_unix_time).buy_target_amount(required, r.buy_base, r.buy_target)?;
        }
        Ok(required)
    }

    /// Target obtido gastando `base_amount` de `base_mint`.
    pub fn buy_with_base_amount(&self, base_amount: f64, base_mint: &Pubkey) -> Result<f64> {
        chain_buy(self.links_from(base_mint)?, base_amount, self.now_unix_time)
    }

    /// `base_mint` obtido vendendo `target_amount` do target da hierarquia.
    pub fn sell_target_amount(&self, target_amount: f64, base_mint: &Pubkey) -> Result<f64> {
        chain_sell(self.links_from(base_mint)?, target_amount, self.now_unix_time)
    }

    /// Estimativa de troca entre dois mints de fronteira, em qualquer sentido.
    pub fn swap_target_amount(&self, from_mint: &Pubkey, to_mint: &Pubkey, amount: f64) -> Result<f64> {
        let (links, is_buy) = self
            .hierarchy
            .path_between(from_mint, to_mint)
            .ok_or_else(|| bonding_err!(BondingErrorCode::NoRouteFound, base => from_mint, target => to_mint))?;
        if is_buy {
            chain_buy(links, amount, self.now_unix_time)
        } else {
            chain_sell(links, amount, self.now_unix_time)
        }
    }
}

fn chain_buy(links: &[HierarchyLink], amount: f64, now: i64) -> Result<f64> {
    let mut running = amount;
    for link in links {
        let r = &link.node.royalties;
        running = link.pricing(now).buy_with_base_amount(running, r.buy_base, r.buy_target)?;
    }
    Ok(running)
}

fn chain_sell(links: &[HierarchyLink], amount: f64, now: i64) -> Result<f64> {
    let mut running = amount;
    for link in links.iter().rev() {
        let r = &link.node.royalties;
        running = link.pricing(now).sell_target_amount(running, r.sell_base, r.sell_target)?;
    }
    Ok(running)
}
