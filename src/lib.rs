//! Motor de preços para curvas de bonding encadeadas e roteador multi-hop.

pub mod bonding;
pub mod config;
pub mod obs;
pub mod telemetry;
pub mod testing;

pub use bonding::bonding_pricing::BondingPricing;
pub use bonding::curve::{PrimitiveCurveConfig, TimeCurveConfig, TimeCurveSegment, TransitionFee};
pub use bonding::errors::{BondingError, BondingErrorCode, Result};
pub use bonding::hierarchy::{Hierarchy, HierarchyLink};
pub use bonding::pricing::{BuyQuote, BuyRequest, PricingEngine, SellQuote};
pub use bonding::router::{SwapOutcome, SwapRequest, SwapRouter, SwapState};
pub use bonding::types::{BondingCurveNode, CurveContext, Pubkey, RoyaltyPercentages, TradeSide};
pub use config::RouterConfig;
