// Port definitions for the enrichment layer.
// Every provider answers "try resolve": Ok(Some) on success, Ok(None) when it simply
// has no data for the mint, Err on I/O or decode failure. Resolvers walk them in order.

use async_trait::async_trait;
use migration_core::{MarketMetrics, PairInfo, SourceConfig, TokenIdentity, TokenProfile};
use solana_sdk::pubkey::Pubkey;

use crate::error::ProviderError;

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Source of name, symbol and socials for a mint.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn fetch_identity(&self, mint: &Pubkey) -> ProviderResult<Option<TokenIdentity>>;
}

/// A trading venue as listed by a market-data aggregator.
#[derive(Debug, Clone, PartialEq)]
pub struct PairSummary {
    pub pair: PairInfo,
    pub liquidity_usd: f64,
}

/// Market-data aggregator: venue listing plus per-pair detail.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn token_pairs(&self, mint: &Pubkey) -> ProviderResult<Vec<PairSummary>>;
    async fn pair_metrics(&self, pair: &PairInfo) -> ProviderResult<Option<MarketMetrics>>;
}

#[async_trait]
pub trait PriceProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn price_usd(&self, mint: &Pubkey) -> ProviderResult<Option<f64>>;
}

/// Circulating supply in UI units (decimals already applied).
#[async_trait]
pub trait SupplyProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn circulating_supply(&self, mint: &Pubkey) -> ProviderResult<Option<f64>>;
}

#[async_trait]
pub trait ValuationProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn fully_diluted_value(&self, mint: &Pubkey) -> ProviderResult<Option<f64>>;
}

/// One token account and its raw balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAccountBalance {
    pub owner: String,
    pub amount: u64,
}

/// Paginated "token accounts by mint" endpoint. Pages are 1-based.
#[async_trait]
pub trait HolderProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn token_accounts(&self, mint: &Pubkey, page: u32, limit: u32) -> ProviderResult<Vec<TokenAccountBalance>>;
}

/// Port the pipeline uses to turn a mint into a full profile.
#[async_trait]
pub trait ProfileResolver: Send + Sync {
    async fn resolve(&self, mint: &Pubkey, source: &SourceConfig) -> anyhow::Result<TokenProfile>;
}
